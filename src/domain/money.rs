use crate::error::{CheckoutError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

static CURRENCY_IN_TEXT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Z]{3}").expect("currency pattern is valid"));

/// A monetary value as seeded by the server.
///
/// Wraps `rust_decimal::Decimal`; display rounding to cents happens only when
/// the value is projected into the page, never when it is stored.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Money(pub Decimal);

impl Money {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(amount: Decimal) -> Self {
        Self(amount)
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn abs(&self) -> Self {
        Self(self.0.abs())
    }

    /// Rounds to two decimal places, half away from zero.
    pub fn to_cents(&self) -> Decimal {
        self.0
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }
}

impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Money {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl From<Decimal> for Money {
    fn from(value: Decimal) -> Self {
        Self(value)
    }
}

/// ISO-4217 style code: exactly three uppercase ASCII letters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    pub fn new(code: &str) -> Result<Self> {
        let code = code.trim();
        if code.len() == 3 && code.bytes().all(|b| b.is_ascii_uppercase()) {
            Ok(Self(code.to_string()))
        } else {
            Err(CheckoutError::ValidationError(format!(
                "Invalid currency code: {code:?}"
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn symbol(&self) -> Option<&'static str> {
        match self.0.as_str() {
            "USD" => Some("$"),
            "EUR" => Some("€"),
            "GBP" => Some("£"),
            "JPY" => Some("¥"),
            "INR" => Some("₹"),
            _ => None,
        }
    }
}

impl Default for CurrencyCode {
    fn default() -> Self {
        Self("USD".to_string())
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = CheckoutError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

/// Where the currency marker goes when an amount is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CurrencyDisplay {
    /// `90.00 USD`
    #[default]
    CodeSuffix,
    /// `$90.00`, falling back to the code suffix for currencies without a known symbol.
    SymbolPrefix,
}

impl CurrencyDisplay {
    pub fn format(&self, amount: Money, currency: &CurrencyCode) -> String {
        let cents = amount.to_cents();
        match self {
            CurrencyDisplay::SymbolPrefix => match currency.symbol() {
                Some(symbol) if cents.is_sign_negative() => format!("-{symbol}{:.2}", cents.abs()),
                Some(symbol) => format!("{symbol}{cents:.2}"),
                None => format!("{cents:.2} {currency}"),
            },
            CurrencyDisplay::CodeSuffix => format!("{cents:.2} {currency}"),
        }
    }
}

impl FromStr for CurrencyDisplay {
    type Err = CheckoutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "code" | "code-suffix" => Ok(Self::CodeSuffix),
            "symbol" | "symbol-prefix" => Ok(Self::SymbolPrefix),
            other => Err(CheckoutError::Config(format!(
                "unknown currency display {other:?}, expected \"code\" or \"symbol\""
            ))),
        }
    }
}

/// Parses a displayed price such as `"90.00 USD"`, `"$90.00"` or `"-10.00 EUR"`.
///
/// Everything except digits, `.` and `-` is dropped before parsing the amount.
/// The currency is the first run of three uppercase letters, if any.
pub fn parse_display_amount(text: &str) -> Option<(Money, Option<CurrencyCode>)> {
    let numeric: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    let amount = Decimal::from_str(&numeric).ok()?;
    let currency = CURRENCY_IN_TEXT
        .find(text)
        .and_then(|m| CurrencyCode::new(m.as_str()).ok());
    Some((Money(amount), currency))
}
