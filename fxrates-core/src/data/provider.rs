//! Rate source trait and structured error types.
//!
//! A `RateSource` issues exactly one request for one currency. Retry lives a
//! layer above (see `retry`), so sources stay trivial to mock in tests.

use crate::currency::Currency;
use chrono::NaiveDate;
use thiserror::Error;

/// Errors from fetching or parsing one currency's observations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("HTTP {status} for {currency}")]
    HttpStatus { currency: Currency, status: u16 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("invalid rate '{value}' on {date}")]
    InvalidRate { date: NaiveDate, value: String },
}

impl DataError {
    /// Transport-level failures are worth retrying; malformed payloads are not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DataError::NetworkUnreachable(_) | DataError::Timeout(_) | DataError::HttpStatus { .. }
        )
    }
}

/// A single-request source of raw observation documents.
pub trait RateSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Request the observation series for `currency` from `start` (inclusive)
    /// through whatever the service considers the present. Returns the raw
    /// response body.
    fn request(&self, currency: Currency, start: NaiveDate) -> Result<Vec<u8>, DataError>;
}
