//! Domain types: per-currency series and the aligned rate table.

pub mod series;
pub mod table;

pub use series::CurrencySeries;
pub use table::{RateRow, RateTable};
