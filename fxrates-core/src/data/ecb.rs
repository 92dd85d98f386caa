//! ECB statistical data service source.
//!
//! Requests the `EXR` dataflow, series key `D.{CUR}.EUR.SP00.A` (daily spot
//! reference rate, currency per euro), in SDMX-JSON format. Only the start of
//! the window is sent; the service decides the upper bound.

use super::provider::{DataError, RateSource};
use crate::currency::Currency;
use chrono::NaiveDate;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://data-api.ecb.europa.eu/service/data";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking HTTP client against the ECB SDMX REST API.
pub struct EcbSource {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl EcbSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("fxrates/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DataError::NetworkUnreachable(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Default endpoint with a 30-second request timeout.
    pub fn with_defaults() -> Result<Self, DataError> {
        Self::new(DEFAULT_BASE_URL, DEFAULT_TIMEOUT)
    }

    /// Series URL for a currency, without query parameters.
    pub fn series_url(&self, currency: Currency) -> String {
        format!("{}/EXR/D.{}.EUR.SP00.A", self.base_url, currency.code())
    }
}

fn classify(err: reqwest::Error) -> DataError {
    if err.is_timeout() {
        DataError::Timeout(err.to_string())
    } else {
        DataError::NetworkUnreachable(err.to_string())
    }
}

impl RateSource for EcbSource {
    fn name(&self) -> &str {
        "ecb"
    }

    fn request(&self, currency: Currency, start: NaiveDate) -> Result<Vec<u8>, DataError> {
        let start_period = start.format("%Y-%m-%d").to_string();
        let resp = self
            .client
            .get(self.series_url(currency))
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&[("startPeriod", start_period.as_str()), ("format", "jsondata")])
            .send()
            .map_err(classify)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                currency,
                status: status.as_u16(),
            });
        }

        let body = resp.bytes().map_err(classify)?;
        Ok(body.to_vec())
    }
}
