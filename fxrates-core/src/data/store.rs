//! CSV persistence for the rate table.
//!
//! Layout: `{data_dir}/forex_rates.csv` with a `date` key column followed by
//! one column per currency in code order, and a metadata sidecar
//! `{data_dir}/forex_rates.meta.json`.
//!
//! - Atomic writes (write to .tmp, rename into place)
//! - Lossless floats: written with shortest round-trip formatting
//! - Empty field = missing value
//! - Strict load: unknown columns, bad dates, bad rates and duplicate dates fail

use crate::currency::Currency;
use crate::domain::{RateRow, RateTable};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const RATES_FILE: &str = "forex_rates.csv";
pub const META_FILE: &str = "forex_rates.meta.json";
pub const DATE_COLUMN: &str = "date";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed header: {0}")]
    MalformedHeader(String),

    #[error("unknown currency column '{0}'")]
    UnknownCurrency(String),

    #[error("invalid date '{value}' at line {line}")]
    InvalidDate { line: u64, value: String },

    #[error("invalid rate '{value}' for {currency} at line {line}")]
    InvalidRate {
        line: u64,
        currency: Currency,
        value: String,
    },

    #[error("duplicate date {date} at line {line}")]
    DuplicateDate { line: u64, date: NaiveDate },

    #[error("metadata error: {0}")]
    Meta(String),
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> StoreError + '_ {
    move |source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Metadata sidecar describing the last successful write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMeta {
    pub row_count: usize,
    pub currencies: Vec<Currency>,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    /// BLAKE3 of the CSV bytes as written.
    pub data_hash: String,
    pub written_at: chrono::NaiveDateTime,
}

/// The persisted dataset in a data directory.
#[derive(Debug, Clone)]
pub struct RateStore {
    data_dir: PathBuf,
}

impl RateStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn rates_path(&self) -> PathBuf {
        self.data_dir.join(RATES_FILE)
    }

    pub fn meta_path(&self) -> PathBuf {
        self.data_dir.join(META_FILE)
    }

    pub fn exists(&self) -> bool {
        self.rates_path().is_file()
    }

    /// Load the persisted table, or `None` if nothing has been written yet.
    pub fn load(&self) -> Result<Option<RateTable>, StoreError> {
        let path = self.rates_path();
        if !path.exists() {
            return Ok(None);
        }
        let file = fs::File::open(&path).map_err(io_err(&path))?;
        table_from_csv(file).map(Some)
    }

    /// Atomically replace the persisted table and refresh the sidecar.
    pub fn write(&self, table: &RateTable) -> Result<DatasetMeta, StoreError> {
        fs::create_dir_all(&self.data_dir).map_err(io_err(&self.data_dir))?;

        let bytes = table_to_csv(table)?;
        atomic_write(&self.rates_path(), &bytes)?;

        let meta = DatasetMeta {
            row_count: table.len(),
            currencies: table.columns().iter().copied().collect(),
            first_date: table.first_date(),
            last_date: table.last_date(),
            data_hash: blake3::hash(&bytes).to_hex().to_string(),
            written_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_vec_pretty(&meta)
            .map_err(|e| StoreError::Meta(format!("serialization: {e}")))?;
        atomic_write(&self.meta_path(), &meta_json)?;

        Ok(meta)
    }

    /// Read the sidecar, if present and well-formed.
    pub fn read_meta(&self) -> Option<DatasetMeta> {
        let content = fs::read(self.meta_path()).ok()?;
        serde_json::from_slice(&content).ok()
    }

    /// Whether the sidecar hash still matches the CSV on disk.
    pub fn verify(&self) -> Result<bool, StoreError> {
        let meta = self
            .read_meta()
            .ok_or_else(|| StoreError::Meta("no readable metadata sidecar".into()))?;
        let path = self.rates_path();
        let bytes = fs::read(&path).map_err(io_err(&path))?;
        Ok(blake3::hash(&bytes).to_hex().to_string() == meta.data_hash)
    }
}

fn atomic_write(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    fs::write(&tmp_path, bytes).map_err(io_err(&tmp_path))?;
    fs::rename(&tmp_path, path).map_err(|e| {
        let _ = fs::remove_file(&tmp_path);
        StoreError::Io {
            path: path.to_path_buf(),
            source: e,
        }
    })
}

// ── CSV encoding ────────────────────────────────────────────────────

/// Serialize a table to CSV bytes.
pub fn table_to_csv(table: &RateTable) -> Result<Vec<u8>, StoreError> {
    let columns: Vec<Currency> = table.columns().iter().copied().collect();
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header = vec![DATE_COLUMN.to_string()];
    header.extend(columns.iter().map(|c| c.code().to_string()));
    wtr.write_record(&header)?;

    for (date, row) in table.rows() {
        let mut record = Vec::with_capacity(columns.len() + 1);
        record.push(date.format(DATE_FORMAT).to_string());
        for c in &columns {
            // f64 Display is the shortest string that parses back to the same value.
            record.push(row.get(c).map(|v| v.to_string()).unwrap_or_default());
        }
        wtr.write_record(&record)?;
    }

    wtr.into_inner()
        .map_err(|e| StoreError::Csv(e.into_error().into()))
}

/// Parse a table from CSV.
pub fn table_from_csv(reader: impl Read) -> Result<RateTable, StoreError> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(reader);

    let headers = rdr.headers()?.clone();
    let mut fields = headers.iter().map(str::trim);
    match fields.next() {
        Some(DATE_COLUMN) => {}
        other => {
            return Err(StoreError::MalformedHeader(format!(
                "first column must be '{DATE_COLUMN}', found {other:?}"
            )))
        }
    }

    let mut columns: Vec<Currency> = Vec::new();
    for name in fields {
        let currency: Currency = name
            .parse()
            .map_err(|_| StoreError::UnknownCurrency(name.to_string()))?;
        if columns.contains(&currency) {
            return Err(StoreError::MalformedHeader(format!(
                "duplicate column '{currency}'"
            )));
        }
        columns.push(currency);
    }

    let mut table = RateTable::with_columns(columns.iter().copied());

    for result in rdr.records() {
        let record = result?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);

        let raw_date = record.get(0).unwrap_or("").trim();
        let date = NaiveDate::parse_from_str(raw_date, DATE_FORMAT).map_err(|_| {
            StoreError::InvalidDate {
                line,
                value: raw_date.to_string(),
            }
        })?;
        if table.row(date).is_some() {
            return Err(StoreError::DuplicateDate { line, date });
        }

        let mut row = RateRow::new();
        for (currency, raw) in columns.iter().zip(record.iter().skip(1)) {
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }
            let rate = raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| StoreError::InvalidRate {
                    line,
                    currency: *currency,
                    value: raw.to_string(),
                })?;
            row.insert(*currency, rate);
        }
        table.insert_row(date, row);
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn sample_table() -> RateTable {
        let mut t = RateTable::with_columns([Currency::USD, Currency::JPY, Currency::GBP]);
        t.set(d("2024-01-02"), Currency::USD, 1.0956);
        t.set(d("2024-01-02"), Currency::JPY, 155.73);
        t.set(d("2024-01-03"), Currency::USD, 1.0919);
        t.set(d("2024-01-03"), Currency::GBP, 0.86170);
        t
    }

    #[test]
    fn csv_has_date_then_sorted_codes() {
        let bytes = table_to_csv(&sample_table()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("date,GBP,JPY,USD"));
        assert_eq!(lines.next(), Some("2024-01-02,,155.73,1.0956"));
        assert_eq!(lines.next(), Some("2024-01-03,0.8617,,1.0919"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn floats_survive_write_and_read_exactly() {
        let awkward = [
            0.1 + 0.2,
            1.0 / 3.0,
            1e-9,
            123456789.123456789,
            f64::MIN_POSITIVE,
            16021.77,
        ];
        let mut t = RateTable::with_columns([Currency::IDR]);
        for (i, v) in awkward.iter().enumerate() {
            t.set(d("2024-01-01") + chrono::Duration::days(i as i64), Currency::IDR, *v);
        }

        let back = table_from_csv(table_to_csv(&t).unwrap().as_slice()).unwrap();
        for (i, v) in awkward.iter().enumerate() {
            let got = back
                .get(d("2024-01-01") + chrono::Duration::days(i as i64), Currency::IDR)
                .unwrap();
            assert_eq!(got.to_bits(), v.to_bits());
        }
        assert_eq!(back, t);
    }

    #[test]
    fn reads_columns_in_any_order() {
        let csv = "date,USD,AUD\n2024-01-02,1.09,1.61\n2024-01-03,,1.62\n";
        let t = table_from_csv(csv.as_bytes()).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.get(d("2024-01-02"), Currency::AUD), Some(1.61));
        assert_eq!(t.get(d("2024-01-03"), Currency::USD), None);
    }

    #[test]
    fn row_with_all_cells_missing_is_kept() {
        let csv = "date,USD\n2024-01-02,\n2024-01-03,1.09\n";
        let t = table_from_csv(csv.as_bytes()).unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.first_date(), Some(d("2024-01-02")));
    }

    #[test]
    fn rejects_bad_inputs() {
        assert!(matches!(
            table_from_csv("day,USD\n".as_bytes()),
            Err(StoreError::MalformedHeader(_))
        ));
        assert!(matches!(
            table_from_csv("date,EUR\n".as_bytes()),
            Err(StoreError::UnknownCurrency(c)) if c == "EUR"
        ));
        assert!(matches!(
            table_from_csv("date,USD\n02/01/2024,1.1\n".as_bytes()),
            Err(StoreError::InvalidDate { .. })
        ));
        assert!(matches!(
            table_from_csv("date,USD\n2024-01-02,abc\n".as_bytes()),
            Err(StoreError::InvalidRate { currency: Currency::USD, .. })
        ));
        assert!(matches!(
            table_from_csv("date,USD\n2024-01-02,1.1\n2024-01-02,1.2\n".as_bytes()),
            Err(StoreError::DuplicateDate { .. })
        ));
    }

    #[test]
    fn store_roundtrip_and_meta() {
        let dir = tempfile::tempdir().unwrap();
        let store = RateStore::new(dir.path().join("data"));

        assert!(store.load().unwrap().is_none());
        assert!(!store.exists());

        let table = sample_table();
        let meta = store.write(&table).unwrap();
        assert!(store.exists());
        assert_eq!(meta.row_count, 2);
        assert_eq!(
            meta.currencies,
            vec![Currency::GBP, Currency::JPY, Currency::USD]
        );
        assert_eq!(meta.first_date, Some(d("2024-01-02")));
        assert_eq!(meta.last_date, Some(d("2024-01-03")));

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded, table);
        assert_eq!(store.read_meta().unwrap(), meta);
        assert!(store.verify().unwrap());

        // No temp files left behind
        let leftovers: Vec<_> = fs::read_dir(store.data_dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn verify_detects_tampering() {
        let dir = tempfile::tempdir().unwrap();
        let store = RateStore::new(dir.path());
        store.write(&sample_table()).unwrap();

        fs::write(store.rates_path(), "date,USD\n2024-01-02,9.99\n").unwrap();
        assert!(!store.verify().unwrap());
    }
}
