use super::{first_str, interpret_reply, mount_trigger, payment_path};
use crate::domain::csrf::CsrfResolver;
use crate::domain::payment::{Confirmation, IntentId, PaymentDetails, PaymentMethod, ReferenceKind};
use crate::domain::ports::{Document, DocumentRef, PaymentGateway, TransportRef};
use crate::domain::session::BookingId;
use crate::domain::validation::{ValidationMode, summarize, validate_card};
use crate::error::{CheckoutError, Result};
use async_trait::async_trait;
use tracing::{info, instrument, warn};

/// Posts typed card fields to the backend processor.
pub struct CardGateway {
    transport: TransportRef,
    document: DocumentRef,
    validation: ValidationMode,
}

impl CardGateway {
    pub fn new(transport: TransportRef, document: DocumentRef, validation: ValidationMode) -> Self {
        Self {
            transport,
            document,
            validation,
        }
    }
}

#[async_trait]
impl PaymentGateway for CardGateway {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Card
    }

    fn mount(&self, document: &dyn Document) -> bool {
        mount_trigger(document, PaymentMethod::Card)
    }

    /// Card payments have no separate server-side draft; the intent is local.
    async fn create_intent(&self, booking_id: &BookingId) -> Result<IntentId> {
        Ok(IntentId(format!("card-{booking_id}")))
    }

    #[instrument(skip_all, fields(booking_id = %booking_id, intent = %intent))]
    async fn confirm(
        &self,
        booking_id: &BookingId,
        intent: &IntentId,
        details: &PaymentDetails,
    ) -> Result<Confirmation> {
        let PaymentDetails::Card(card) = details else {
            return Err(CheckoutError::ValidationError(format!(
                "Card gateway cannot confirm {} details",
                details.method()
            )));
        };

        let issues = validate_card(card);
        if !issues.is_empty() {
            match self.validation {
                ValidationMode::Blocking => {
                    return Err(CheckoutError::ValidationError(summarize(&issues)));
                }
                ValidationMode::Advisory => {
                    warn!(issues = issues.len(), "card details look malformed, submitting anyway");
                }
            }
        }

        let token = CsrfResolver::resolve(self.document.as_ref())?;
        let payload = serde_json::to_value(card.normalized())?;
        let reply = self
            .transport
            .post_json(
                &payment_path(booking_id.as_str(), PaymentMethod::Card, "process"),
                &token,
                Some(payload),
            )
            .await?;
        let body = interpret_reply(PaymentMethod::Card, reply)?;

        let reference = first_str(&body, &["transaction_id"]).ok_or_else(|| {
            CheckoutError::Gateway(PaymentMethod::Card.default_failure_message().to_string())
        })?;
        info!(%reference, "card payment processed");
        Ok(Confirmation {
            reference,
            kind: ReferenceKind::Transaction,
        })
    }
}
