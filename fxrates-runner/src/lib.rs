//! FX Rates Runner: update orchestration, configuration, chart publishing.
//!
//! This crate builds on `fxrates-core` to provide:
//! - TOML configuration with environment overrides
//! - The incremental update pipeline (start date, fetch, align, merge, write)
//! - Chart definitions and the sinks that publish them

pub mod charts;
pub mod config;
pub mod pipeline;

pub use charts::{
    build_chart, build_charts, publish_table, ChartDefinition, ChartSink, HttpSink, JsonFileSink,
};
pub use config::{ConfigError, FxConfig};
pub use pipeline::{
    fetch_start_date, run_update, run_update_with_progress, PipelineError, UpdateOutcome,
    UpdateRequest, UpdateSummary,
};
