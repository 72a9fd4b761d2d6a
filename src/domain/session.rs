use super::money::{CurrencyCode, Money};
use crate::error::{CheckoutError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One stage of the booking wizard: 1 = details, 2 = payment, 3 = confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Step(u8);

impl Step {
    pub const DETAILS: Self = Self(1);
    pub const PAYMENT: Self = Self(2);
    pub const CONFIRMATION: Self = Self(3);

    pub const COUNT: u8 = 3;

    pub fn new(n: u8) -> Result<Self> {
        if (1..=Self::COUNT).contains(&n) {
            Ok(Self(n))
        } else {
            Err(CheckoutError::ValidationError(format!(
                "Step {n} is outside 1..={}",
                Self::COUNT
            )))
        }
    }

    pub fn number(&self) -> u8 {
        self.0
    }

    /// Width of the linear progress indicator: `((n - 1) / 2) * 100`.
    pub fn progress_percent(&self) -> u8 {
        (self.0 - 1) * 100 / (Self::COUNT - 1)
    }
}

impl Default for Step {
    fn default() -> Self {
        Self::DETAILS
    }
}

impl TryFrom<u8> for Step {
    type Error = CheckoutError;

    fn try_from(value: u8) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Step> for u8 {
    fn from(step: Step) -> Self {
        step.0
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier rendered by the server into `data-booking-id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(String);

impl BookingId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(CheckoutError::ValidationError(
                "Booking id must not be empty".to_string(),
            ));
        }
        Ok(Self(id.trim().to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BookingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PriceRole {
    Subtotal,
    Discount,
    Total,
}

impl PriceRole {
    pub const ALL: [PriceRole; 3] = [PriceRole::Subtotal, PriceRole::Discount, PriceRole::Total];

    pub fn as_str(&self) -> &'static str {
        match self {
            PriceRole::Subtotal => "subtotal",
            PriceRole::Discount => "discount",
            PriceRole::Total => "total",
        }
    }
}

/// Read-only projection of the price fields of a [`BookingSession`].
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSnapshot {
    pub subtotal: Money,
    pub discount_amount: Money,
    pub total: Money,
    pub currency_code: CurrencyCode,
}

impl PriceSnapshot {
    pub fn amount(&self, role: PriceRole) -> Money {
        match role {
            PriceRole::Subtotal => self.subtotal,
            PriceRole::Discount => self.discount_amount,
            PriceRole::Total => self.total,
        }
    }
}

/// In-memory UI state of one booking tab.
///
/// Prices are seeded by the server on page load and never recomputed here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingSession {
    pub current_step: Step,
    pub total_price: Money,
    pub subtotal: Money,
    pub discount_amount: Money,
    pub currency_code: CurrencyCode,
    pub transaction_id: Option<String>,
    pub is_processing: bool,
}

impl BookingSession {
    pub fn new(currency_code: CurrencyCode) -> Self {
        Self {
            current_step: Step::DETAILS,
            total_price: Money::ZERO,
            subtotal: Money::ZERO,
            discount_amount: Money::ZERO,
            currency_code,
            transaction_id: None,
            is_processing: false,
        }
    }

    pub fn with_prices(mut self, subtotal: Money, discount_amount: Money, total: Money) -> Self {
        self.subtotal = subtotal;
        self.discount_amount = discount_amount;
        self.total_price = total;
        self
    }

    /// True once the server has rendered a non-zero total into the session.
    pub fn has_server_prices(&self) -> bool {
        !self.total_price.is_zero()
    }

    pub fn price_snapshot(&self) -> PriceSnapshot {
        PriceSnapshot {
            subtotal: self.subtotal,
            discount_amount: self.discount_amount,
            total: self.total_price,
            currency_code: self.currency_code.clone(),
        }
    }
}

impl Default for BookingSession {
    fn default() -> Self {
        Self::new(CurrencyCode::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_step_bounds() {
        assert!(Step::new(0).is_err());
        assert!(Step::new(4).is_err());
        assert_eq!(Step::new(2).unwrap(), Step::PAYMENT);
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(Step::DETAILS.progress_percent(), 0);
        assert_eq!(Step::PAYMENT.progress_percent(), 50);
        assert_eq!(Step::CONFIRMATION.progress_percent(), 100);
    }

    #[test]
    fn test_snapshot_projects_prices() {
        let session = BookingSession::default().with_prices(
            Money::new(dec!(100.00)),
            Money::new(dec!(10.00)),
            Money::new(dec!(90.00)),
        );
        let snapshot = session.price_snapshot();
        assert_eq!(snapshot.amount(PriceRole::Total), Money::new(dec!(90.00)));
        assert_eq!(snapshot.amount(PriceRole::Discount), Money::new(dec!(10.00)));
        assert!(session.has_server_prices());
        assert!(!BookingSession::default().has_server_prices());
    }

    #[test]
    fn test_session_serde_rejects_bad_step() {
        let mut value = serde_json::to_value(BookingSession::default()).unwrap();
        value["current_step"] = serde_json::json!(7);
        assert!(serde_json::from_value::<BookingSession>(value).is_err());
    }
}
