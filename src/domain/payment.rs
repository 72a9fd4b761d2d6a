use crate::error::CheckoutError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    PayPal,
    Card,
    Bank,
}

impl PaymentMethod {
    pub const ALL: [PaymentMethod; 3] = [PaymentMethod::PayPal, PaymentMethod::Card, PaymentMethod::Bank];

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::PayPal => "paypal",
            PaymentMethod::Card => "card",
            PaymentMethod::Bank => "bank",
        }
    }

    /// Message shown when the backend fails without saying why.
    pub fn default_failure_message(&self) -> &'static str {
        match self {
            PaymentMethod::PayPal => "Payment failed",
            PaymentMethod::Card => {
                "Failed to process payment. Please check your card details and try again."
            }
            PaymentMethod::Bank => {
                "Failed to initiate bank transfer. Please try again or contact support."
            }
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = CheckoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "paypal" => Ok(Self::PayPal),
            "card" => Ok(Self::Card),
            "bank" => Ok(Self::Bank),
            other => Err(CheckoutError::Config(format!(
                "unknown payment method {other:?}"
            ))),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Succeeded,
    Failed,
    /// Abandoned by the user at the gateway; not an error.
    Cancelled,
}

/// One activation of a payment trigger. Never retried automatically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentAttempt {
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    pub error_message: Option<String>,
    pub transaction_id: Option<String>,
}

impl PaymentAttempt {
    pub fn pending(method: PaymentMethod) -> Self {
        Self {
            method,
            status: PaymentStatus::Pending,
            error_message: None,
            transaction_id: None,
        }
    }

    pub fn succeed(&mut self, transaction_id: impl Into<String>) {
        self.status = PaymentStatus::Succeeded;
        self.transaction_id = Some(transaction_id.into());
        self.error_message = None;
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.status = PaymentStatus::Failed;
        self.error_message = Some(message.into());
    }

    pub fn cancel(&mut self) {
        self.status = PaymentStatus::Cancelled;
    }
}

/// Server-created, not yet confirmed payment request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IntentId(pub String);

impl IntentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IntentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Card fields as typed by the user. Serialized with the backend's field names.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct CardDetails {
    #[serde(rename = "card_number")]
    pub number: String,
    #[serde(rename = "card_expiry")]
    pub expiry: String,
    #[serde(rename = "card_cvc")]
    pub cvc: String,
    #[serde(rename = "card_holder_name")]
    pub holder_name: String,
}

impl CardDetails {
    /// Copy with whitespace removed from the card number, as the backend expects.
    pub fn normalized(&self) -> Self {
        Self {
            number: self.number.chars().filter(|c| !c.is_whitespace()).collect(),
            expiry: self.expiry.trim().to_string(),
            cvc: self.cvc.trim().to_string(),
            holder_name: self.holder_name.trim().to_string(),
        }
    }
}

// Never print the PAN or CVC into logs.
impl fmt::Debug for CardDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits: String = self.number.chars().filter(|c| c.is_ascii_digit()).collect();
        let last4 = &digits[digits.len().saturating_sub(4)..];
        f.debug_struct("CardDetails")
            .field("number", &format_args!("****{last4}"))
            .field("expiry", &self.expiry)
            .field("cvc", &"***")
            .field("holder_name", &self.holder_name)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PayPalApproval {
    /// The buyer approved the order with this gateway-assigned id. Blank
    /// means the order this payment created.
    Approved { order_id: String },
    Cancelled,
}

/// Method-specific input handed to [`crate::domain::ports::PaymentGateway::confirm`].
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentDetails {
    PayPal(PayPalApproval),
    Card(CardDetails),
    Bank,
}

impl PaymentDetails {
    pub fn method(&self) -> PaymentMethod {
        match self {
            PaymentDetails::PayPal(_) => PaymentMethod::PayPal,
            PaymentDetails::Card(_) => PaymentMethod::Card,
            PaymentDetails::Bank => PaymentMethod::Bank,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    Transaction,
    /// Bank transfers settle later; the backend hands out a reference number instead.
    BankReference,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Confirmation {
    pub reference: String,
    pub kind: ReferenceKind,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_round_trips_through_str() {
        for method in PaymentMethod::ALL {
            assert_eq!(method.as_str().parse::<PaymentMethod>().unwrap(), method);
        }
        assert!("crypto".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_card_payload_uses_backend_field_names() {
        let card = CardDetails {
            number: "4242 4242 4242 4242".into(),
            expiry: "12/30".into(),
            cvc: "123".into(),
            holder_name: " Ada Lovelace ".into(),
        }
        .normalized();
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["card_number"], "4242424242424242");
        assert_eq!(json["card_holder_name"], "Ada Lovelace");
        assert!(json.get("number").is_none());
    }

    #[test]
    fn test_card_debug_masks_sensitive_fields() {
        let card = CardDetails {
            number: "4242424242424242".into(),
            expiry: "12/30".into(),
            cvc: "987".into(),
            holder_name: "Ada".into(),
        };
        let debug = format!("{card:?}");
        assert!(debug.contains("****4242"));
        assert!(!debug.contains("987"));
        assert!(!debug.contains("42424242"));
    }

    #[test]
    fn test_attempt_transitions() {
        let mut attempt = PaymentAttempt::pending(PaymentMethod::Card);
        assert_eq!(attempt.status, PaymentStatus::Pending);
        attempt.fail("declined");
        assert_eq!(attempt.status, PaymentStatus::Failed);
        assert_eq!(attempt.error_message.as_deref(), Some("declined"));
    }
}
