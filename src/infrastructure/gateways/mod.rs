//! [`PaymentGateway`](crate::domain::ports::PaymentGateway) variants. Which
//! ones exist on a page is decided by [`CheckoutConfig`], not by which script
//! happened to load.

pub mod bank;
pub mod card;
pub mod paypal;
pub mod simulated;

use crate::config::{CheckoutConfig, GatewayMode};
use crate::domain::payment::PaymentMethod;
use crate::domain::ports::{Document, DocumentRef, GatewayRef, HttpReply, Selector, TransportRef};
use crate::error::{CheckoutError, Result};
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

pub use bank::BankTransferGateway;
pub use card::CardGateway;
pub use paypal::PayPalGateway;
pub use simulated::SimulatedGateway;

pub fn payment_path(booking_id: &str, method: PaymentMethod, action: &str) -> String {
    format!("/booking/{booking_id}/payment/{}/{action}/", method.as_str())
}

/// Builds one gateway per configured method.
pub fn build_gateways(
    config: &CheckoutConfig,
    transport: TransportRef,
    document: DocumentRef,
) -> Vec<GatewayRef> {
    config
        .methods
        .iter()
        .map(|method| -> GatewayRef {
            match (config.gateway_mode, method) {
                (GatewayMode::Simulated, _) => {
                    Arc::new(SimulatedGateway::new(*method, config.card_validation))
                }
                (GatewayMode::Live, PaymentMethod::PayPal) => {
                    Arc::new(PayPalGateway::new(transport.clone(), document.clone()))
                }
                (GatewayMode::Live, PaymentMethod::Card) => Arc::new(CardGateway::new(
                    transport.clone(),
                    document.clone(),
                    config.card_validation,
                )),
                (GatewayMode::Live, PaymentMethod::Bank) => {
                    Arc::new(BankTransferGateway::new(transport.clone(), document.clone()))
                }
            }
        })
        .collect()
}

/// Turns a backend reply into its JSON body or a user-facing failure.
///
/// Server-supplied text is used verbatim; the method's default message is only
/// used when the server said nothing.
pub(crate) fn interpret_reply(method: PaymentMethod, reply: HttpReply) -> Result<Value> {
    if let Some(message) = non_empty_str(&reply.body, "error") {
        return Err(CheckoutError::Gateway(message));
    }

    let declined = reply.body.get("success").and_then(Value::as_bool) == Some(false);
    if declined || !reply.is_success() {
        let message = non_empty_str(&reply.body, "message")
            .unwrap_or_else(|| method.default_failure_message().to_string());
        return Err(CheckoutError::Gateway(message));
    }

    Ok(reply.body)
}

/// First present, non-empty string among `keys`.
pub(crate) fn first_str(body: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| non_empty_str(body, key))
}

fn non_empty_str(body: &Value, key: &str) -> Option<String> {
    match body.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Re-enables the method's trigger button. False when the page has none.
pub(crate) fn mount_trigger(document: &dyn Document, method: PaymentMethod) -> bool {
    let triggers = document.query_all(&Selector::attr_eq("data-payment-method", method.as_str()));
    if triggers.is_empty() {
        warn!(%method, "payment trigger not found on page");
        return false;
    }
    for node in triggers {
        document.set_disabled(node, false);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reply(status: u16, body: Value) -> HttpReply {
        HttpReply { status, body }
    }

    #[test]
    fn test_server_error_text_is_verbatim() {
        let err = interpret_reply(PaymentMethod::Card, reply(200, json!({"error": "Card declined"})))
            .unwrap_err();
        assert_eq!(err.to_string(), "Card declined");
    }

    #[test]
    fn test_silent_failure_uses_method_default() {
        let err = interpret_reply(PaymentMethod::Bank, reply(500, Value::Null)).unwrap_err();
        assert_eq!(err.to_string(), PaymentMethod::Bank.default_failure_message());

        let err = interpret_reply(PaymentMethod::PayPal, reply(200, json!({"success": false})))
            .unwrap_err();
        assert_eq!(err.to_string(), "Payment failed");
    }

    #[test]
    fn test_success_passes_body_through() {
        let body = interpret_reply(
            PaymentMethod::Card,
            reply(200, json!({"transaction_id": "T-1"})),
        )
        .unwrap();
        assert_eq!(first_str(&body, &["transaction_id"]).as_deref(), Some("T-1"));
    }

    #[test]
    fn test_payment_path() {
        assert_eq!(
            payment_path("12", PaymentMethod::PayPal, "capture"),
            "/booking/12/payment/paypal/capture/"
        );
    }
}
