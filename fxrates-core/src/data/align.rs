//! Multi-currency time alignment.
//!
//! Given one series per currency, build a single table on the union of all
//! observed dates. Missing combinations stay missing (no fill, no zero).

use crate::currency::CurrencySet;
use crate::domain::{CurrencySeries, RateTable};
use tracing::warn;

/// Outer-join per-currency series into a date-indexed table.
///
/// Columns are exactly the currencies of `order`, so a currency whose series
/// came back empty still appears as an all-missing column. Series are consumed
/// in `order`; a series for a currency outside `order` is dropped.
pub fn align_series(order: &CurrencySet, series: Vec<CurrencySeries>) -> RateTable {
    let mut table = RateTable::with_columns(order.iter());

    let mut by_currency = series;
    by_currency.sort_by_key(|s| s.currency);

    for s in by_currency {
        if !order.contains(s.currency) {
            warn!(currency = %s.currency, "dropping series outside the requested currency set");
            continue;
        }
        for (date, rate) in s.observations {
            table.set(date, s.currency, rate);
        }
    }

    table
}
