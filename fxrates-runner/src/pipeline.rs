//! Incremental update pipeline.
//!
//! load persisted → pick start date → fetch every currency → align → merge → write.
//!
//! The fetch window restarts at the last persisted date (inclusive), so a late
//! revision to that day's rate replaces the stored value. A run that fetches
//! nothing leaves the persisted file untouched.

use chrono::NaiveDate;
use fxrates_core::data::{
    align_series, fetch_all, merge_report, merge_tables, FetchProgress, LogProgress, RateSource,
    RateStore, RetryPolicy, RetryingFetcher, StoreError,
};
use fxrates_core::{Currency, CurrencySet, RateTable};
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

/// Fatal pipeline errors. Per-currency fetch failures never surface here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no start date: nothing is persisted yet and no initial start date was given")]
    NoStartDate,

    #[error("storage error: {0}")]
    Store(#[from] StoreError),
}

/// Everything a single update run needs apart from its I/O endpoints.
#[derive(Debug, Clone)]
pub struct UpdateRequest {
    pub currencies: CurrencySet,
    /// Start of the fetch window when nothing is persisted.
    pub initial_start_date: Option<NaiveDate>,
    pub retry: RetryPolicy,
}

/// Summary of a run that wrote data.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateSummary {
    pub path: PathBuf,
    pub start_date: NaiveDate,
    pub rows: usize,
    pub columns: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub new_dates: usize,
    pub revised_values: usize,
    pub failed_currencies: Vec<Currency>,
}

/// How a run ended when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOutcome {
    /// The merged table was persisted.
    Written(UpdateSummary),
    /// Every currency came back empty; nothing was written.
    NoNewData {
        start_date: NaiveDate,
        failed_currencies: Vec<Currency>,
    },
}

impl UpdateOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, UpdateOutcome::Written(_))
    }
}

/// Where the next fetch window starts.
///
/// The latest persisted date when there is one, otherwise `initial`.
pub fn fetch_start_date(
    persisted: Option<&RateTable>,
    initial: Option<NaiveDate>,
) -> Result<NaiveDate, PipelineError> {
    persisted
        .and_then(RateTable::last_date)
        .or(initial)
        .ok_or(PipelineError::NoStartDate)
}

/// Run one update with progress reported through `tracing`.
pub fn run_update(
    request: &UpdateRequest,
    source: &dyn RateSource,
    store: &RateStore,
) -> Result<UpdateOutcome, PipelineError> {
    run_update_with_progress(request, source, store, &LogProgress)
}

/// Run one update.
pub fn run_update_with_progress(
    request: &UpdateRequest,
    source: &dyn RateSource,
    store: &RateStore,
    progress: &dyn FetchProgress,
) -> Result<UpdateOutcome, PipelineError> {
    let persisted = store.load()?;
    let start_date = fetch_start_date(persisted.as_ref(), request.initial_start_date)?;

    info!(
        start = %start_date,
        currencies = request.currencies.len(),
        source = source.name(),
        "fetching forex data"
    );

    let fetcher = RetryingFetcher::new(source, request.retry.clone());
    let fetched = fetch_all(&fetcher, &request.currencies, start_date, progress);
    let failed_currencies = fetched.failed_currencies();
    let fresh = align_series(&request.currencies, fetched.series);

    if fresh.is_empty() {
        info!(start = %start_date, failed = failed_currencies.len(), "no new data available");
        return Ok(UpdateOutcome::NoNewData {
            start_date,
            failed_currencies,
        });
    }

    let report = merge_report(persisted.as_ref(), &fresh);
    let merged = merge_tables(persisted, fresh);
    store.write(&merged)?;

    let summary = UpdateSummary {
        path: store.rates_path(),
        start_date,
        rows: merged.len(),
        columns: merged.column_count(),
        first_date: merged.first_date(),
        last_date: merged.last_date(),
        new_dates: report.new_dates,
        revised_values: report.revised_values,
        failed_currencies,
    };

    info!(
        path = %summary.path.display(),
        rows = summary.rows,
        columns = summary.columns,
        new_dates = summary.new_dates,
        revised = summary.revised_values,
        "data saved"
    );

    Ok(UpdateOutcome::Written(summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn start_date_without_persisted_is_initial() {
        assert_eq!(
            fetch_start_date(None, Some(d("2020-01-01"))).unwrap(),
            d("2020-01-01")
        );
    }

    #[test]
    fn start_date_restarts_at_last_persisted_date() {
        let mut t = RateTable::default();
        t.set(d("2024-01-03"), Currency::USD, 1.09);
        t.set(d("2024-01-05"), Currency::USD, 1.10);
        t.set(d("2024-01-04"), Currency::JPY, 160.0);

        // Inclusive: the boundary date is fetched again.
        assert_eq!(
            fetch_start_date(Some(&t), Some(d("2020-01-01"))).unwrap(),
            d("2024-01-05")
        );
        assert_eq!(fetch_start_date(Some(&t), None).unwrap(), d("2024-01-05"));
    }

    #[test]
    fn empty_persisted_table_falls_back_to_initial() {
        let t = RateTable::with_columns([Currency::USD]);
        assert_eq!(
            fetch_start_date(Some(&t), Some(d("2021-06-01"))).unwrap(),
            d("2021-06-01")
        );
    }

    #[test]
    fn no_start_date_is_fatal() {
        assert!(matches!(
            fetch_start_date(None, None),
            Err(PipelineError::NoStartDate)
        ));
    }
}
