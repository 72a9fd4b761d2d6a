use super::{first_str, interpret_reply, payment_path};
use crate::domain::csrf::CsrfResolver;
use crate::domain::payment::{
    Confirmation, IntentId, PayPalApproval, PaymentDetails, PaymentMethod, ReferenceKind,
};
use crate::domain::ports::{Document, DocumentRef, PaymentGateway, Selector, TransportRef};
use crate::domain::session::BookingId;
use crate::error::{CheckoutError, Result};
use async_trait::async_trait;
use serde_json::json;
use tracing::{info, instrument, warn};

pub const BUTTON_CONTAINER_ID: &str = "paypal-button-container";

/// Orders are created and captured by the backend; approval happens in the
/// buyer's PayPal window and arrives here as [`PayPalApproval`].
pub struct PayPalGateway {
    transport: TransportRef,
    document: DocumentRef,
}

impl PayPalGateway {
    pub fn new(transport: TransportRef, document: DocumentRef) -> Self {
        Self {
            transport,
            document,
        }
    }
}

#[async_trait]
impl PaymentGateway for PayPalGateway {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::PayPal
    }

    fn mount(&self, document: &dyn Document) -> bool {
        let Some(container) = document.query(&Selector::id(BUTTON_CONTAINER_ID)) else {
            warn!("PayPal button container not found");
            return false;
        };
        document.set_text(container, "");
        document.set_style(container, "display", "block");
        document.set_style(container, "min-height", "200px");
        true
    }

    #[instrument(skip_all, fields(booking_id = %booking_id))]
    async fn create_intent(&self, booking_id: &BookingId) -> Result<IntentId> {
        let token = CsrfResolver::resolve(self.document.as_ref())?;
        let reply = self
            .transport
            .post_json(
                &payment_path(booking_id.as_str(), PaymentMethod::PayPal, "create"),
                &token,
                None,
            )
            .await?;
        let body = interpret_reply(PaymentMethod::PayPal, reply)?;

        let order_id = first_str(&body, &["id"]).ok_or_else(|| {
            CheckoutError::Gateway("PayPal did not return an order id".to_string())
        })?;
        info!(%order_id, "PayPal order created");
        Ok(IntentId(order_id))
    }

    #[instrument(skip_all, fields(booking_id = %booking_id, intent = %intent))]
    async fn confirm(
        &self,
        booking_id: &BookingId,
        intent: &IntentId,
        details: &PaymentDetails,
    ) -> Result<Confirmation> {
        let order_id = match details {
            PaymentDetails::PayPal(PayPalApproval::Approved { order_id })
                if !order_id.trim().is_empty() =>
            {
                order_id.as_str()
            }
            PaymentDetails::PayPal(PayPalApproval::Approved { .. }) => intent.as_str(),
            PaymentDetails::PayPal(PayPalApproval::Cancelled) => {
                info!("PayPal payment cancelled by buyer");
                return Err(CheckoutError::Cancelled);
            }
            other => {
                return Err(CheckoutError::ValidationError(format!(
                    "PayPal cannot confirm {} details",
                    other.method()
                )));
            }
        };
        if order_id != intent.as_str() {
            warn!(%order_id, "approved order differs from created intent");
        }

        let token = CsrfResolver::resolve(self.document.as_ref())?;
        let reply = self
            .transport
            .post_json(
                &payment_path(booking_id.as_str(), PaymentMethod::PayPal, "capture"),
                &token,
                Some(json!({ "order_id": order_id })),
            )
            .await?;
        let body = interpret_reply(PaymentMethod::PayPal, reply)?;

        // Older capture responses only echo the order.
        let reference = first_str(&body, &["transaction_id", "capture_id"])
            .unwrap_or_else(|| order_id.to_string());
        info!(%reference, "PayPal payment captured");
        Ok(Confirmation {
            reference,
            kind: ReferenceKind::Transaction,
        })
    }
}
