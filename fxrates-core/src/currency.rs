//! Supported currency catalogue.
//!
//! The ECB publishes euro reference rates for a fixed list of currencies.
//! `Currency` is that closed set; anything else fails to parse and is never
//! fetched. Variants are declared in lexicographic order so the derived `Ord`
//! matches the code order used for column layout and fetch order.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A currency quoted against the euro.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Currency {
    AUD,
    BGN,
    BRL,
    CAD,
    CHF,
    CNY,
    CZK,
    DKK,
    GBP,
    HKD,
    HUF,
    IDR,
    ILS,
    INR,
    ISK,
    JPY,
    KRW,
    MXN,
    MYR,
    NOK,
    NZD,
    PHP,
    PLN,
    RON,
    SEK,
    SGD,
    THB,
    TRY,
    USD,
    ZAR,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unsupported currency code '{0}'")]
pub struct UnknownCurrency(pub String);

impl Currency {
    /// Every supported currency, in code order.
    pub const ALL: [Currency; 30] = [
        Currency::AUD,
        Currency::BGN,
        Currency::BRL,
        Currency::CAD,
        Currency::CHF,
        Currency::CNY,
        Currency::CZK,
        Currency::DKK,
        Currency::GBP,
        Currency::HKD,
        Currency::HUF,
        Currency::IDR,
        Currency::ILS,
        Currency::INR,
        Currency::ISK,
        Currency::JPY,
        Currency::KRW,
        Currency::MXN,
        Currency::MYR,
        Currency::NOK,
        Currency::NZD,
        Currency::PHP,
        Currency::PLN,
        Currency::RON,
        Currency::SEK,
        Currency::SGD,
        Currency::THB,
        Currency::TRY,
        Currency::USD,
        Currency::ZAR,
    ];

    /// ISO 4217 code.
    pub fn code(self) -> &'static str {
        match self {
            Currency::AUD => "AUD",
            Currency::BGN => "BGN",
            Currency::BRL => "BRL",
            Currency::CAD => "CAD",
            Currency::CHF => "CHF",
            Currency::CNY => "CNY",
            Currency::CZK => "CZK",
            Currency::DKK => "DKK",
            Currency::GBP => "GBP",
            Currency::HKD => "HKD",
            Currency::HUF => "HUF",
            Currency::IDR => "IDR",
            Currency::ILS => "ILS",
            Currency::INR => "INR",
            Currency::ISK => "ISK",
            Currency::JPY => "JPY",
            Currency::KRW => "KRW",
            Currency::MXN => "MXN",
            Currency::MYR => "MYR",
            Currency::NOK => "NOK",
            Currency::NZD => "NZD",
            Currency::PHP => "PHP",
            Currency::PLN => "PLN",
            Currency::RON => "RON",
            Currency::SEK => "SEK",
            Currency::SGD => "SGD",
            Currency::THB => "THB",
            Currency::TRY => "TRY",
            Currency::USD => "USD",
            Currency::ZAR => "ZAR",
        }
    }

    /// Display name used in chart titles and descriptions.
    pub fn name(self) -> &'static str {
        match self {
            Currency::AUD => "Australian Dollar",
            Currency::BGN => "Bulgarian Lev",
            Currency::BRL => "Brazilian Real",
            Currency::CAD => "Canadian Dollar",
            Currency::CHF => "Swiss Franc",
            Currency::CNY => "Chinese Yuan",
            Currency::CZK => "Czech Koruna",
            Currency::DKK => "Danish Krone",
            Currency::GBP => "British Pound Sterling",
            Currency::HKD => "Hong Kong Dollar",
            Currency::HUF => "Hungarian Forint",
            Currency::IDR => "Indonesian Rupiah",
            Currency::ILS => "Israeli New Shekel",
            Currency::INR => "Indian Rupee",
            Currency::ISK => "Icelandic Króna",
            Currency::JPY => "Japanese Yen",
            Currency::KRW => "South Korean Won",
            Currency::MXN => "Mexican Peso",
            Currency::MYR => "Malaysian Ringgit",
            Currency::NOK => "Norwegian Krone",
            Currency::NZD => "New Zealand Dollar",
            Currency::PHP => "Philippine Peso",
            Currency::PLN => "Polish Złoty",
            Currency::RON => "Romanian Leu",
            Currency::SEK => "Swedish Krona",
            Currency::SGD => "Singapore Dollar",
            Currency::THB => "Thai Baht",
            Currency::TRY => "Turkish Lira",
            Currency::USD => "United States Dollar",
            Currency::ZAR => "South African Rand",
        }
    }

    /// Stable identifying tag for the published chart, e.g. `forex-rates-usd`.
    pub fn chart_tag(self) -> String {
        format!("forex-rates-{}", self.code().to_ascii_lowercase())
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = UnknownCurrency;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Currency::ALL
            .iter()
            .copied()
            .find(|c| c.code() == upper)
            .ok_or_else(|| UnknownCurrency(s.to_string()))
    }
}

impl TryFrom<String> for Currency {
    type Error = UnknownCurrency;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Currency> for String {
    fn from(c: Currency) -> Self {
        c.code().to_string()
    }
}

/// An ordered, duplicate-free selection of currencies.
///
/// Iteration is always lexicographic by code. The fetch loop and the aligner
/// both take their order from here, so logs and column layout are reproducible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencySet(Vec<Currency>);

impl CurrencySet {
    pub fn new(currencies: impl IntoIterator<Item = Currency>) -> Self {
        let mut v: Vec<Currency> = currencies.into_iter().collect();
        v.sort();
        v.dedup();
        Self(v)
    }

    /// All 30 supported currencies.
    pub fn all() -> Self {
        Self(Currency::ALL.to_vec())
    }

    /// Parse a list of codes such as `["usd", "JPY"]`.
    pub fn parse<S: AsRef<str>>(codes: &[S]) -> Result<Self, UnknownCurrency> {
        let parsed = codes
            .iter()
            .map(|c| c.as_ref().parse())
            .collect::<Result<Vec<Currency>, _>>()?;
        Ok(Self::new(parsed))
    }

    pub fn iter(&self) -> impl Iterator<Item = Currency> + '_ {
        self.0.iter().copied()
    }

    pub fn contains(&self, currency: Currency) -> bool {
        self.0.binary_search(&currency).is_ok()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[Currency] {
        &self.0
    }
}

impl Default for CurrencySet {
    fn default() -> Self {
        Self::all()
    }
}
