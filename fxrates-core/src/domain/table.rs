//! Date-indexed multi-currency rate table.

use crate::currency::Currency;
use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

/// One table row: the rates observed on a date. A currency with no entry is
/// missing for that date.
pub type RateRow = BTreeMap<Currency, f64>;

/// Rows keyed by observation date, one column per currency.
///
/// Rows are unique and ascending by date. The column set may include
/// currencies that have no value on any row (e.g. a currency whose fetch
/// failed). A table with columns but no rows is empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    columns: BTreeSet<Currency>,
    rows: BTreeMap<NaiveDate, RateRow>,
}

impl RateTable {
    /// Create an empty table with the given columns.
    pub fn with_columns(columns: impl IntoIterator<Item = Currency>) -> Self {
        Self {
            columns: columns.into_iter().collect(),
            rows: BTreeMap::new(),
        }
    }

    pub fn columns(&self) -> &BTreeSet<Currency> {
        &self.columns
    }

    /// Set one cell, creating the row and column if needed.
    pub fn set(&mut self, date: NaiveDate, currency: Currency, rate: f64) {
        self.columns.insert(currency);
        self.rows.entry(date).or_default().insert(currency, rate);
    }

    /// Replace the row for `date` wholesale. Currencies in the row become columns.
    pub fn insert_row(&mut self, date: NaiveDate, row: RateRow) {
        self.columns.extend(row.keys().copied());
        self.rows.insert(date, row);
    }

    pub fn get(&self, date: NaiveDate, currency: Currency) -> Option<f64> {
        self.rows.get(&date).and_then(|r| r.get(&currency)).copied()
    }

    pub fn row(&self, date: NaiveDate) -> Option<&RateRow> {
        self.rows.get(&date)
    }

    /// Rows in ascending date order.
    pub fn rows(&self) -> impl DoubleEndedIterator<Item = (NaiveDate, &RateRow)> + '_ {
        self.rows.iter().map(|(d, r)| (*d, r))
    }

    pub fn into_rows(self) -> impl Iterator<Item = (NaiveDate, RateRow)> {
        self.rows.into_iter()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.rows.keys().copied()
    }

    /// Observed (date, rate) pairs for one currency, ascending. Missing cells are skipped.
    pub fn column(&self, currency: Currency) -> Vec<(NaiveDate, f64)> {
        self.rows
            .iter()
            .filter_map(|(d, r)| r.get(&currency).map(|v| (*d, *v)))
            .collect()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rows.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rows.keys().next_back().copied()
    }
}
