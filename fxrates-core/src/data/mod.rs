//! Fetching, parsing, aligning, merging and persisting rate data.

pub mod align;
pub mod download;
pub mod ecb;
pub mod merge;
pub mod provider;
pub mod retry;
pub mod sdmx;
pub mod store;

pub use align::align_series;
pub use download::{
    fetch_all, fetch_currency_series, try_fetch_currency_series, FetchProgress, FetchSummary,
    LogProgress,
};
pub use ecb::EcbSource;
pub use merge::{merge_report, merge_tables, MergeReport};
pub use provider::{DataError, RateSource};
pub use retry::{RetryPolicy, RetryingFetcher};
pub use sdmx::parse_series;
pub use store::{DatasetMeta, RateStore, StoreError};
