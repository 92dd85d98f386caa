//! Single-currency observation series.

use crate::currency::Currency;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Date → rate observations for one currency (units of currency per euro).
///
/// Dates are unique and ascending by construction. An empty series is a
/// legitimate value: it stands for a failed fetch or a window with no data.
#[derive(Debug, Clone, PartialEq)]
pub struct CurrencySeries {
    pub currency: Currency,
    pub observations: BTreeMap<NaiveDate, f64>,
}

impl CurrencySeries {
    pub fn new(currency: Currency, observations: BTreeMap<NaiveDate, f64>) -> Self {
        Self {
            currency,
            observations,
        }
    }

    pub fn empty(currency: Currency) -> Self {
        Self::new(currency, BTreeMap::new())
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.observations.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.observations.keys().next_back().copied()
    }
}
