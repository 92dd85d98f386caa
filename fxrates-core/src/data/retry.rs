//! Retry policy with bounded exponential backoff.
//!
//! The wait after failed attempt `n` (1-based) is
//! `clamp(multiplier * 2^(n-1), min_delay, max_delay)`, plus optional jitter.
//! Only errors for which `DataError::is_transient` holds are retried.

use super::provider::{DataError, RateSource};
use crate::currency::Currency;
use chrono::NaiveDate;
use rand::Rng;
use std::time::Duration;
use tracing::{debug, warn};

/// Inspectable retry policy, independent of any network I/O.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Base of the exponential schedule.
    pub multiplier: Duration,
    pub min_delay: Duration,
    pub max_delay: Duration,
    /// Extra random wait as a percentage of the computed delay (0 disables).
    pub jitter_percent: u32,
}

impl Default for RetryPolicy {
    /// 5 attempts, waits of 4s, 4s, 4s, 8s between them, capped at 60s.
    fn default() -> Self {
        Self {
            max_attempts: 5,
            multiplier: Duration::from_secs(1),
            min_delay: Duration::from_secs(4),
            max_delay: Duration::from_secs(60),
            jitter_percent: 0,
        }
    }
}

impl RetryPolicy {
    /// A policy that retries without waiting. Used by tests and mocks.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            multiplier: Duration::ZERO,
            min_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            jitter_percent: 0,
        }
    }

    /// Backoff before the attempt following failed attempt `attempt` (1-based), without jitter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1);
        let factor = 2u32.saturating_pow(exponent);
        self.multiplier
            .saturating_mul(factor)
            .min(self.max_delay)
            .max(self.min_delay)
    }

    /// Whether `err` after `attempt` attempts warrants another try.
    pub fn should_retry(&self, err: &DataError, attempt: u32) -> bool {
        err.is_transient() && attempt < self.max_attempts
    }

    fn with_jitter(&self, base: Duration) -> Duration {
        if self.jitter_percent == 0 || base.is_zero() {
            return base;
        }
        let base_ms = base.as_millis() as u64;
        let range = std::cmp::max(1, base_ms.saturating_mul(u64::from(self.jitter_percent)) / 100);
        let extra = rand::thread_rng().gen_range(0..range);
        base + Duration::from_millis(extra)
    }

    /// Run `op` under this policy, sleeping the calling thread between attempts.
    pub fn execute<T>(&self, op: impl FnMut(u32) -> Result<T, DataError>) -> Result<T, DataError> {
        self.execute_with(op, std::thread::sleep)
    }

    /// Run `op` under this policy with a caller-supplied sleep function.
    ///
    /// `op` receives the 1-based attempt number. The last error is returned
    /// once attempts are exhausted or a non-transient error occurs.
    pub fn execute_with<T>(
        &self,
        mut op: impl FnMut(u32) -> Result<T, DataError>,
        mut sleep: impl FnMut(Duration),
    ) -> Result<T, DataError> {
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(value) => return Ok(value),
                Err(e) if self.should_retry(&e, attempt) => {
                    let delay = self.with_jitter(self.delay_for(attempt));
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "transient failure, retrying"
                    );
                    sleep(delay);
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// A `RateSource` wrapped in a `RetryPolicy`.
pub struct RetryingFetcher<'a> {
    source: &'a dyn RateSource,
    policy: RetryPolicy,
}

impl<'a> RetryingFetcher<'a> {
    pub fn new(source: &'a dyn RateSource, policy: RetryPolicy) -> Self {
        Self { source, policy }
    }

    /// Fetch the raw document for `currency` from `start`, retrying transport failures.
    pub fn fetch(&self, currency: Currency, start: NaiveDate) -> Result<Vec<u8>, DataError> {
        self.policy.execute(|attempt| {
            debug!(%currency, %start, attempt, source = self.source.name(), "requesting observations");
            self.source.request(currency, start)
        })
    }
}
