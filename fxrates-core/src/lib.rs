//! FX Rates Core: currency catalogue, retrying fetcher, parser, aligner,
//! merge engine and CSV store.
//!
//! This crate contains the incremental fetch-and-merge machinery:
//! - The closed set of supported currencies and their display metadata
//! - Per-currency series and the date-indexed rate table
//! - A single-request `RateSource` trait with an ECB implementation
//! - An explicit retry policy with bounded exponential backoff
//! - SDMX-JSON parsing, outer-join alignment, newest-wins merging
//! - Atomic CSV persistence with a metadata sidecar

pub mod currency;
pub mod data;
pub mod domain;

pub use currency::{Currency, CurrencySet, UnknownCurrency};
pub use domain::{CurrencySeries, RateRow, RateTable};
