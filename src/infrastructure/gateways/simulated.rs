use super::mount_trigger;
use super::paypal::BUTTON_CONTAINER_ID;
use crate::domain::payment::{
    Confirmation, IntentId, PayPalApproval, PaymentDetails, PaymentMethod, ReferenceKind,
};
use crate::domain::ports::{Document, PaymentGateway, Selector};
use crate::domain::session::BookingId;
use crate::domain::validation::{ValidationMode, summarize, validate_card};
use crate::error::{CheckoutError, Result};
use async_trait::async_trait;
use tracing::{info, warn};
use uuid::Uuid;

pub const TEST_MODE_NOTICE: &str =
    "PayPal SDK not loaded. The system is running in test mode: payments are simulated.";

/// Test-mode gateway: always succeeds with a `TEST-` reference, talks to no backend
/// and needs no anti-forgery token. Buyer cancellation and card shape checks
/// behave as in live mode.
pub struct SimulatedGateway {
    method: PaymentMethod,
    card_validation: ValidationMode,
}

impl SimulatedGateway {
    pub fn new(method: PaymentMethod, card_validation: ValidationMode) -> Self {
        Self {
            method,
            card_validation,
        }
    }

    fn reference() -> String {
        let id = Uuid::new_v4().simple().to_string();
        format!("TEST-{}", id[..8].to_ascii_uppercase())
    }
}

#[async_trait]
impl PaymentGateway for SimulatedGateway {
    fn method(&self) -> PaymentMethod {
        self.method
    }

    fn mount(&self, document: &dyn Document) -> bool {
        if self.method != PaymentMethod::PayPal {
            return mount_trigger(document, self.method);
        }
        let Some(container) = document.query(&Selector::id(BUTTON_CONTAINER_ID)) else {
            warn!("PayPal button container not found");
            return false;
        };
        document.set_text(container, TEST_MODE_NOTICE);
        document.set_style(container, "display", "block");
        true
    }

    async fn create_intent(&self, booking_id: &BookingId) -> Result<IntentId> {
        Ok(IntentId(format!("TEST-ORDER-{booking_id}")))
    }

    async fn confirm(
        &self,
        booking_id: &BookingId,
        _intent: &IntentId,
        details: &PaymentDetails,
    ) -> Result<Confirmation> {
        if details.method() != self.method {
            return Err(CheckoutError::ValidationError(format!(
                "{} gateway cannot confirm {} details",
                self.method,
                details.method()
            )));
        }
        match details {
            PaymentDetails::PayPal(PayPalApproval::Cancelled) => {
                return Err(CheckoutError::Cancelled);
            }
            PaymentDetails::Card(card) if self.card_validation == ValidationMode::Blocking => {
                let issues = validate_card(card);
                if !issues.is_empty() {
                    return Err(CheckoutError::ValidationError(summarize(&issues)));
                }
            }
            _ => {}
        }

        let reference = Self::reference();
        info!(%booking_id, %reference, method = %self.method, "simulated payment succeeded");
        Ok(Confirmation {
            reference,
            kind: match self.method {
                PaymentMethod::Bank => ReferenceKind::BankReference,
                _ => ReferenceKind::Transaction,
            },
        })
    }
}
