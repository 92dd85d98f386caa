//! Chart definitions for the visualization platform, and sinks that publish them.
//!
//! One line chart per currency column, carrying the full (date, rate) history.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use fxrates_core::{Currency, RateTable};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

const ICON_URL: &str = "https://storage.googleapis.com/subsets-public-assets/source_logos/ecb.png";
const PROVIDER_URL: &str = "https://www.ecb.europa.eu/stats/policy_and_exchange_rates/euro_reference_exchange_rates/html/index.en.html";
const INTEGRATION_URL: &str = "https://github.com/nathansnellaert/ecb-forex-rates";
const LINE_COLOR: &str = "#2563eb";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDefinition {
    pub metadata: ChartMetadata,
    pub tags: ChartTags,
    pub source: ChartSource,
    /// `[date, rate]` pairs, ascending by date.
    pub data: Vec<(NaiveDate, f64)>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartMetadata {
    #[serde(rename = "type")]
    pub chart_type: String,
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub icon: String,
    pub dataset_configs: Vec<DatasetConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetConfig {
    pub label: String,
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartTags {
    pub id: String,
    pub source: String,
    pub currency: Currency,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSource {
    pub name: String,
    pub data_provider_url: String,
    pub integration_url: String,
    pub license: String,
}

/// Build the chart for one currency from the table's column.
pub fn build_chart(currency: Currency, table: &RateTable) -> ChartDefinition {
    let code = currency.code();
    let name = currency.name();
    ChartDefinition {
        metadata: ChartMetadata {
            chart_type: "line".into(),
            title: format!("EUR/{code} - European Central Bank Reference Rate"),
            subtitle: format!("Euro to {name} Daily Exchange Rates"),
            description: format!(
                "Historical exchange rate data for {name} to Euro, sourced from the European Central Bank."
            ),
            icon: ICON_URL.into(),
            dataset_configs: vec![DatasetConfig {
                label: format!("EUR/{code}"),
                color: LINE_COLOR.into(),
            }],
        },
        tags: ChartTags {
            id: currency.chart_tag(),
            source: "ecb".into(),
            currency,
        },
        source: ChartSource {
            name: "European Central Bank".into(),
            data_provider_url: PROVIDER_URL.into(),
            integration_url: INTEGRATION_URL.into(),
            license: "CC BY 4.0".into(),
        },
        data: table.column(currency),
    }
}

/// One chart per column, in code order.
pub fn build_charts(table: &RateTable) -> Vec<ChartDefinition> {
    table
        .columns()
        .iter()
        .map(|c| build_chart(*c, table))
        .collect()
}

/// Destination for chart definitions.
pub trait ChartSink {
    fn name(&self) -> &str;

    /// Publish all charts, returning how many were accepted.
    fn publish(&self, charts: &[ChartDefinition]) -> Result<usize>;
}

/// Writes the chart array as pretty JSON to a file.
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ChartSink for JsonFileSink {
    fn name(&self) -> &str {
        "json_file"
    }

    fn publish(&self, charts: &[ChartDefinition]) -> Result<usize> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(charts)?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("write {}", self.path.display()))?;
        Ok(charts.len())
    }
}

/// POSTs the chart array as JSON to an HTTP endpoint with a bearer API key.
pub struct HttpSink {
    client: reqwest::blocking::Client,
    endpoint: String,
    api_key: String,
}

impl HttpSink {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        })
    }
}

impl ChartSink for HttpSink {
    fn name(&self) -> &str {
        "http"
    }

    fn publish(&self, charts: &[ChartDefinition]) -> Result<usize> {
        self.client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(charts)
            .send()
            .with_context(|| format!("POST {}", self.endpoint))?
            .error_for_status()
            .with_context(|| format!("{} rejected charts", self.endpoint))?;
        Ok(charts.len())
    }
}

/// Build charts from `table` and hand them to `sink`.
pub fn publish_table(table: &RateTable, sink: &dyn ChartSink) -> Result<usize> {
    let charts = build_charts(table);
    let count = sink.publish(&charts)?;
    info!(sink = sink.name(), charts = count, "synced charts");
    Ok(count)
}
