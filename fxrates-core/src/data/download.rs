//! Download orchestrator: fetches every currency of a set, one at a time.
//!
//! A currency that fails (transport errors after retries, or a malformed
//! payload) contributes an empty series; the others carry on.

use super::provider::DataError;
use super::retry::RetryingFetcher;
use super::sdmx::parse_series;
use crate::currency::{Currency, CurrencySet};
use crate::domain::CurrencySeries;
use chrono::NaiveDate;
use tracing::{info, warn};

/// Progress callback for multi-currency fetches.
pub trait FetchProgress {
    /// Called when starting to fetch a currency from `start`.
    fn on_start(&self, currency: Currency, start: NaiveDate, index: usize, total: usize);

    /// Called when a currency fetch completes, with the number of observations
    /// or the error that caused it to be skipped.
    fn on_complete(
        &self,
        currency: Currency,
        index: usize,
        total: usize,
        result: Result<usize, &DataError>,
    );
}

/// Progress reporter that emits `tracing` events.
pub struct LogProgress;

impl FetchProgress for LogProgress {
    fn on_start(&self, currency: Currency, start: NaiveDate, index: usize, total: usize) {
        info!("[{}/{}] fetching {currency} from {start}", index + 1, total);
    }

    fn on_complete(
        &self,
        currency: Currency,
        _index: usize,
        _total: usize,
        result: Result<usize, &DataError>,
    ) {
        match result {
            Ok(n) => info!(%currency, observations = n, "fetched"),
            Err(e) => warn!(%currency, error = %e, "failed to fetch, continuing with empty series"),
        }
    }
}

/// Fetch and parse one currency, propagating any failure.
pub fn try_fetch_currency_series(
    fetcher: &RetryingFetcher<'_>,
    currency: Currency,
    start: NaiveDate,
) -> Result<CurrencySeries, DataError> {
    let body = fetcher.fetch(currency, start)?;
    parse_series(currency, &body)
}

/// Fetch and parse one currency. Failures are logged and yield an empty series.
pub fn fetch_currency_series(
    fetcher: &RetryingFetcher<'_>,
    currency: Currency,
    start: NaiveDate,
) -> CurrencySeries {
    try_fetch_currency_series(fetcher, currency, start).unwrap_or_else(|e| {
        warn!(%currency, error = %e, "failed to fetch, continuing with empty series");
        CurrencySeries::empty(currency)
    })
}

/// Result of fetching a whole currency set.
#[derive(Debug)]
pub struct FetchSummary {
    /// One series per requested currency, in code order. Failed ones are empty.
    pub series: Vec<CurrencySeries>,
    /// Currencies that failed, with the error that caused it.
    pub failures: Vec<(Currency, DataError)>,
}

impl FetchSummary {
    pub fn failed_currencies(&self) -> Vec<Currency> {
        self.failures.iter().map(|(c, _)| *c).collect()
    }

    pub fn total_observations(&self) -> usize {
        self.series.iter().map(CurrencySeries::len).sum()
    }
}

/// Fetch every currency of `currencies` from `start`, sequentially in code order.
pub fn fetch_all(
    fetcher: &RetryingFetcher<'_>,
    currencies: &CurrencySet,
    start: NaiveDate,
    progress: &dyn FetchProgress,
) -> FetchSummary {
    let total = currencies.len();
    let mut series = Vec::with_capacity(total);
    let mut failures = Vec::new();

    for (i, currency) in currencies.iter().enumerate() {
        progress.on_start(currency, start, i, total);

        match try_fetch_currency_series(fetcher, currency, start) {
            Ok(s) => {
                progress.on_complete(currency, i, total, Ok(s.len()));
                series.push(s);
            }
            Err(e) => {
                progress.on_complete(currency, i, total, Err(&e));
                failures.push((currency, e));
                series.push(CurrencySeries::empty(currency));
            }
        }
    }

    FetchSummary { series, failures }
}
