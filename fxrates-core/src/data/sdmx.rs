//! SDMX-JSON data message parser.
//!
//! Observations sit at `dataSets[].series[<key>].observations[<idx>]`, where
//! `<idx>` indexes the values of the time dimension under
//! `structure.dimensions.observation`. The first element of each observation
//! array is the rate; `null` means no observation for that period.

use super::provider::DataError;
use crate::currency::Currency;
use crate::domain::CurrencySeries;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
struct DataMessage {
    #[serde(rename = "dataSets", default)]
    data_sets: Vec<DataSet>,
    #[serde(default)]
    structure: Option<Structure>,
}

#[derive(Debug, Deserialize)]
struct DataSet {
    #[serde(default)]
    series: BTreeMap<String, SeriesData>,
}

#[derive(Debug, Deserialize)]
struct SeriesData {
    #[serde(default)]
    observations: BTreeMap<String, Vec<Value>>,
}

#[derive(Debug, Deserialize)]
struct Structure {
    dimensions: Dimensions,
}

#[derive(Debug, Deserialize)]
struct Dimensions {
    #[serde(default)]
    observation: Vec<Dimension>,
}

#[derive(Debug, Deserialize)]
struct Dimension {
    id: String,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    values: Vec<DimensionValue>,
}

#[derive(Debug, Deserialize)]
struct DimensionValue {
    id: String,
}

/// Parse one currency's SDMX-JSON response into a series.
///
/// A well-formed message without data sets or observations yields an empty
/// series. Malformed documents, unknown period indices and non-numeric rates
/// are errors.
pub fn parse_series(currency: Currency, body: &[u8]) -> Result<CurrencySeries, DataError> {
    let msg: DataMessage = serde_json::from_slice(body).map_err(|e| {
        DataError::ResponseFormatChanged(format!("failed to parse response for {currency}: {e}"))
    })?;

    let has_observations = msg
        .data_sets
        .iter()
        .flat_map(|ds| ds.series.values())
        .any(|s| !s.observations.is_empty());
    if !has_observations {
        return Ok(CurrencySeries::empty(currency));
    }

    let periods = time_periods(msg.structure.as_ref())?;
    let mut observations = BTreeMap::new();

    for series in msg.data_sets.iter().flat_map(|ds| ds.series.values()) {
        for (key, obs) in &series.observations {
            let idx: usize = key
                .split(':')
                .next()
                .and_then(|k| k.parse().ok())
                .ok_or_else(|| {
                    DataError::ResponseFormatChanged(format!("invalid observation key '{key}'"))
                })?;
            let date = *periods.get(idx).ok_or_else(|| {
                DataError::ResponseFormatChanged(format!(
                    "observation index {idx} out of range ({} periods)",
                    periods.len()
                ))
            })?;

            if let Some(rate) = observation_value(date, obs.first())? {
                observations.insert(date, rate);
            }
        }
    }

    Ok(CurrencySeries::new(currency, observations))
}

/// Dates of the time dimension, in index order.
fn time_periods(structure: Option<&Structure>) -> Result<Vec<NaiveDate>, DataError> {
    let structure = structure
        .ok_or_else(|| DataError::ResponseFormatChanged("missing structure section".into()))?;

    let dim = structure
        .dimensions
        .observation
        .iter()
        .find(|d| d.role.as_deref() == Some("time") || d.id == "TIME_PERIOD")
        .ok_or_else(|| DataError::ResponseFormatChanged("no time dimension".into()))?;

    dim.values
        .iter()
        .map(|v| {
            NaiveDate::parse_from_str(&v.id, "%Y-%m-%d").map_err(|e| {
                DataError::ResponseFormatChanged(format!("invalid period '{}': {e}", v.id))
            })
        })
        .collect()
}

fn observation_value(date: NaiveDate, raw: Option<&Value>) -> Result<Option<f64>, DataError> {
    let invalid = |v: &Value| DataError::InvalidRate {
        date,
        value: v.to_string(),
    };

    let Some(v) = raw else {
        return Ok(None);
    };
    let rate = match v {
        Value::Null => return Ok(None),
        Value::Number(n) => n.as_f64().ok_or_else(|| invalid(v))?,
        Value::String(s) => s.trim().parse::<f64>().map_err(|_| invalid(v))?,
        _ => return Err(invalid(v)),
    };

    if !rate.is_finite() {
        return Err(DataError::InvalidRate {
            date,
            value: rate.to_string(),
        });
    }
    Ok(Some(rate))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    const SAMPLE: &str = r#"{
        "header": {"id": "abc", "test": false},
        "dataSets": [{
            "action": "Replace",
            "series": {
                "0:0:0:0:0": {
                    "attributes": [0, null, 0],
                    "observations": {
                        "0": [1.0956, 0, 0, null, null],
                        "1": [1.0919, 0, 0, null, null],
                        "2": ["1.0953", 0, 0, null, null],
                        "3": [null, 0, 0, null, null]
                    }
                }
            }
        }],
        "structure": {
            "dimensions": {
                "series": [{"id": "FREQ", "values": [{"id": "D"}]}],
                "observation": [{
                    "id": "TIME_PERIOD",
                    "role": "time",
                    "values": [
                        {"id": "2024-01-02", "name": "2024-01-02"},
                        {"id": "2024-01-03", "name": "2024-01-03"},
                        {"id": "2024-01-04", "name": "2024-01-04"},
                        {"id": "2024-01-05", "name": "2024-01-05"}
                    ]
                }]
            }
        }
    }"#;

    #[test]
    fn parses_observations_by_period_index() {
        let s = parse_series(Currency::USD, SAMPLE.as_bytes()).unwrap();
        assert_eq!(s.currency, Currency::USD);
        assert_eq!(s.len(), 3);
        assert_eq!(s.observations[&d("2024-01-02")], 1.0956);
        assert_eq!(s.observations[&d("2024-01-03")], 1.0919);
        assert_eq!(s.observations[&d("2024-01-04")], 1.0953);
        // null value is a missing observation, not zero
        assert!(!s.observations.contains_key(&d("2024-01-05")));
    }

    #[test]
    fn no_datasets_is_empty_series() {
        let s = parse_series(Currency::JPY, br#"{"header": {}, "dataSets": []}"#).unwrap();
        assert!(s.is_empty());
        assert_eq!(s.currency, Currency::JPY);
    }

    #[test]
    fn malformed_document_is_format_error() {
        let err = parse_series(Currency::USD, b"<html>maintenance</html>").unwrap_err();
        assert!(matches!(err, DataError::ResponseFormatChanged(_)));

        let err = parse_series(Currency::USD, b"").unwrap_err();
        assert!(matches!(err, DataError::ResponseFormatChanged(_)));
    }

    #[test]
    fn non_numeric_rate_is_invalid() {
        let body = SAMPLE.replace("\"1.0953\"", "\"n/a\"");
        let err = parse_series(Currency::USD, body.as_bytes()).unwrap_err();
        match err {
            DataError::InvalidRate { date, .. } => assert_eq!(date, d("2024-01-04")),
            other => panic!("expected InvalidRate, got {other:?}"),
        }
    }

    #[test]
    fn index_out_of_range_is_format_error() {
        let body = SAMPLE.replace("\"3\": [null", "\"9\": [1.2");
        let err = parse_series(Currency::USD, body.as_bytes()).unwrap_err();
        assert!(matches!(err, DataError::ResponseFormatChanged(_)));
    }

    #[test]
    fn observations_without_structure_are_rejected() {
        let body = r#"{"dataSets": [{"series": {"0": {"observations": {"0": [1.1]}}}}]}"#;
        let err = parse_series(Currency::USD, body.as_bytes()).unwrap_err();
        assert!(matches!(err, DataError::ResponseFormatChanged(_)));
    }
}
