//! Integration tests for the update pipeline.
//!
//! These run the full load → fetch → align → merge → write cycle against an
//! in-memory source and a temporary data directory.

use chrono::NaiveDate;
use fxrates_core::data::{DataError, RateSource, RateStore, RetryPolicy};
use fxrates_core::{Currency, CurrencySet, RateTable};
use fxrates_runner::{run_update, PipelineError, UpdateOutcome, UpdateRequest};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;

fn d(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn sdmx_body(points: &[(&str, f64)]) -> Vec<u8> {
    if points.is_empty() {
        return br#"{"header": {}, "dataSets": []}"#.to_vec();
    }
    let values: Vec<_> = points.iter().map(|(date, _)| json!({ "id": date })).collect();
    let observations: serde_json::Map<String, serde_json::Value> = points
        .iter()
        .enumerate()
        .map(|(i, (_, v))| (i.to_string(), json!([v, 0, 0, null, null])))
        .collect();
    json!({
        "dataSets": [{ "series": { "0:0:0:0:0": { "observations": observations } } }],
        "structure": { "dimensions": { "observation": [
            { "id": "TIME_PERIOD", "role": "time", "values": values }
        ] } }
    })
    .to_string()
    .into_bytes()
}

/// Serves a fixed body per currency; currencies without one are unreachable.
#[derive(Default)]
struct StaticSource {
    bodies: HashMap<Currency, Vec<u8>>,
    calls: Mutex<Vec<(Currency, NaiveDate)>>,
}

impl StaticSource {
    fn with(mut self, currency: Currency, points: &[(&str, f64)]) -> Self {
        self.bodies.insert(currency, sdmx_body(points));
        self
    }

    fn start_dates(&self) -> Vec<NaiveDate> {
        self.calls.lock().unwrap().iter().map(|(_, s)| *s).collect()
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl RateSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    fn request(&self, currency: Currency, start: NaiveDate) -> Result<Vec<u8>, DataError> {
        self.calls.lock().unwrap().push((currency, start));
        self.bodies
            .get(&currency)
            .cloned()
            .ok_or_else(|| DataError::NetworkUnreachable(format!("no route for {currency}")))
    }
}

fn request(currencies: &[Currency], initial: Option<&str>) -> UpdateRequest {
    UpdateRequest {
        currencies: CurrencySet::new(currencies.iter().copied()),
        initial_start_date: initial.map(d),
        retry: RetryPolicy::immediate(2),
    }
}

fn seed_usd_jan_1_to_5(store: &RateStore) {
    let mut t = RateTable::with_columns([Currency::USD]);
    for day in 1..=5 {
        t.set(NaiveDate::from_ymd_opt(2024, 1, day).unwrap(), Currency::USD, 1.10);
    }
    store.write(&t).unwrap();
}

#[test]
fn first_run_fetches_from_initial_date_and_writes() {
    let dir = tempfile::tempdir().unwrap();
    let store = RateStore::new(dir.path());
    let source = StaticSource::default().with(Currency::USD, &[("2020-01-02", 1.1193)]);

    let outcome = run_update(&request(&[Currency::USD], Some("2020-01-01")), &source, &store).unwrap();

    assert_eq!(source.start_dates(), vec![d("2020-01-01")]);
    match outcome {
        UpdateOutcome::Written(summary) => {
            assert_eq!(summary.rows, 1);
            assert_eq!(summary.columns, 1);
            assert_eq!(summary.start_date, d("2020-01-01"));
            assert_eq!(summary.first_date, Some(d("2020-01-02")));
            assert_eq!(summary.path, store.rates_path());
        }
        other => panic!("expected Written, got {other:?}"),
    }
    let saved = store.load().unwrap().unwrap();
    assert_eq!(saved.get(d("2020-01-02"), Currency::USD), Some(1.1193));
}

#[test]
fn incremental_run_overlaps_last_date_and_newest_wins() {
    let dir = tempfile::tempdir().unwrap();
    let store = RateStore::new(dir.path());
    seed_usd_jan_1_to_5(&store);

    let source = StaticSource::default()
        .with(Currency::USD, &[("2024-01-05", 1.11), ("2024-01-06", 1.12)]);

    let outcome = run_update(&request(&[Currency::USD], Some("2020-01-01")), &source, &store).unwrap();

    // Restart from the last persisted date, not the initial date, not the day after.
    assert_eq!(source.start_dates(), vec![d("2024-01-05")]);

    let UpdateOutcome::Written(summary) = outcome else {
        panic!("expected Written");
    };
    assert_eq!(summary.rows, 6);
    assert_eq!(summary.new_dates, 1);
    assert_eq!(summary.revised_values, 1);
    assert_eq!(summary.first_date, Some(d("2024-01-01")));
    assert_eq!(summary.last_date, Some(d("2024-01-06")));

    let saved = store.load().unwrap().unwrap();
    let dates: Vec<NaiveDate> = saved.dates().collect();
    assert_eq!(dates.len(), 6);
    assert!(dates.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(saved.get(d("2024-01-05"), Currency::USD), Some(1.11));
    assert_eq!(saved.get(d("2024-01-06"), Currency::USD), Some(1.12));
    assert_eq!(saved.get(d("2024-01-04"), Currency::USD), Some(1.10));
}

#[test]
fn empty_fetch_leaves_file_byte_for_byte_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let store = RateStore::new(dir.path());
    seed_usd_jan_1_to_5(&store);
    let before = std::fs::read(store.rates_path()).unwrap();
    let meta_before = std::fs::read(store.meta_path()).unwrap();

    let source = StaticSource::default()
        .with(Currency::USD, &[])
        .with(Currency::JPY, &[]);

    let outcome = run_update(
        &request(&[Currency::USD, Currency::JPY], None),
        &source,
        &store,
    )
    .unwrap();

    assert_eq!(
        outcome,
        UpdateOutcome::NoNewData {
            start_date: d("2024-01-05"),
            failed_currencies: vec![],
        }
    );
    assert!(!outcome.is_written());
    assert_eq!(std::fs::read(store.rates_path()).unwrap(), before);
    assert_eq!(std::fs::read(store.meta_path()).unwrap(), meta_before);
}

#[test]
fn all_currencies_failing_is_no_new_data_not_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let store = RateStore::new(dir.path());
    let source = StaticSource::default();

    let outcome = run_update(
        &request(&[Currency::GBP, Currency::USD], Some("2024-01-01")),
        &source,
        &store,
    )
    .unwrap();

    assert_eq!(
        outcome,
        UpdateOutcome::NoNewData {
            start_date: d("2024-01-01"),
            failed_currencies: vec![Currency::GBP, Currency::USD],
        }
    );
    assert!(!store.exists());
    // Two attempts each under the test retry policy
    assert_eq!(source.call_count(), 4);
}

#[test]
fn failing_currency_is_isolated() {
    let dir = tempfile::tempdir().unwrap();
    let store = RateStore::new(dir.path());
    let source = StaticSource::default()
        .with(Currency::USD, &[("2024-01-02", 1.0956), ("2024-01-03", 1.0919)]);

    let outcome = run_update(
        &request(&[Currency::USD, Currency::JPY], Some("2024-01-01")),
        &source,
        &store,
    )
    .unwrap();

    let UpdateOutcome::Written(summary) = outcome else {
        panic!("expected Written");
    };
    assert_eq!(summary.failed_currencies, vec![Currency::JPY]);
    assert_eq!(summary.columns, 2);

    let saved = store.load().unwrap().unwrap();
    assert_eq!(saved.len(), 2);
    assert!(saved.columns().contains(&Currency::JPY));
    assert!(saved.column(Currency::JPY).is_empty());
    assert_eq!(saved.get(d("2024-01-03"), Currency::USD), Some(1.0919));
}

#[test]
fn currency_failing_on_boundary_date_is_missing_there_after_merge() {
    let dir = tempfile::tempdir().unwrap();
    let store = RateStore::new(dir.path());
    let mut seeded = RateTable::with_columns([Currency::JPY, Currency::USD]);
    for (date, usd, jpy) in [("2024-01-04", 1.09, 158.0), ("2024-01-05", 1.10, 159.0)] {
        seeded.set(d(date), Currency::USD, usd);
        seeded.set(d(date), Currency::JPY, jpy);
    }
    store.write(&seeded).unwrap();

    // JPY has no route this run.
    let source = StaticSource::default()
        .with(Currency::USD, &[("2024-01-05", 1.11), ("2024-01-06", 1.12)]);

    let outcome = run_update(
        &request(&[Currency::USD, Currency::JPY], None),
        &source,
        &store,
    )
    .unwrap();

    let UpdateOutcome::Written(summary) = outcome else {
        panic!("expected Written");
    };
    assert_eq!(summary.failed_currencies, vec![Currency::JPY]);
    assert_eq!(summary.rows, 3);

    let saved = store.load().unwrap().unwrap();
    assert_eq!(saved.get(d("2024-01-05"), Currency::USD), Some(1.11));
    assert_eq!(saved.get(d("2024-01-05"), Currency::JPY), None);
    assert_eq!(saved.get(d("2024-01-04"), Currency::JPY), Some(158.0));
    assert!(saved.columns().contains(&Currency::JPY));
}

#[test]
fn rerunning_same_fetch_is_idempotent_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let store = RateStore::new(dir.path());
    seed_usd_jan_1_to_5(&store);
    let source = StaticSource::default()
        .with(Currency::USD, &[("2024-01-05", 1.11), ("2024-01-06", 1.12)]);
    let req = request(&[Currency::USD], None);

    run_update(&req, &source, &store).unwrap();
    let first = std::fs::read(store.rates_path()).unwrap();

    // Second run starts at 2024-01-06 but the source replays the same rows.
    run_update(&req, &source, &store).unwrap();
    let second = std::fs::read(store.rates_path()).unwrap();

    assert_eq!(first, second);
    assert!(store.verify().unwrap());
}

#[test]
fn missing_start_date_fails_before_any_request() {
    let dir = tempfile::tempdir().unwrap();
    let store = RateStore::new(dir.path());
    let source = StaticSource::default().with(Currency::USD, &[("2024-01-02", 1.0)]);

    let err = run_update(&request(&[Currency::USD], None), &source, &store).unwrap_err();

    assert!(matches!(err, PipelineError::NoStartDate));
    assert_eq!(source.call_count(), 0);
}

#[test]
fn corrupt_persisted_file_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let store = RateStore::new(dir.path());
    std::fs::write(store.rates_path(), "date,USD\n2024-01-02,not-a-rate\n").unwrap();
    let source = StaticSource::default().with(Currency::USD, &[("2024-01-02", 1.0)]);

    let err = run_update(&request(&[Currency::USD], Some("2024-01-01")), &source, &store)
        .unwrap_err();

    assert!(matches!(err, PipelineError::Store(_)));
    assert_eq!(source.call_count(), 0);
}
