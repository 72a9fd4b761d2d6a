use super::{first_str, interpret_reply, mount_trigger, payment_path};
use crate::domain::csrf::CsrfResolver;
use crate::domain::payment::{Confirmation, IntentId, PaymentDetails, PaymentMethod, ReferenceKind};
use crate::domain::ports::{Document, DocumentRef, PaymentGateway, TransportRef};
use crate::domain::session::BookingId;
use crate::error::{CheckoutError, Result};
use async_trait::async_trait;
use tracing::{info, instrument};

/// Registers a bank transfer; the backend answers with a reference number
/// the customer quotes on the transfer.
pub struct BankTransferGateway {
    transport: TransportRef,
    document: DocumentRef,
}

impl BankTransferGateway {
    pub fn new(transport: TransportRef, document: DocumentRef) -> Self {
        Self {
            transport,
            document,
        }
    }
}

#[async_trait]
impl PaymentGateway for BankTransferGateway {
    fn method(&self) -> PaymentMethod {
        PaymentMethod::Bank
    }

    fn mount(&self, document: &dyn Document) -> bool {
        mount_trigger(document, PaymentMethod::Bank)
    }

    async fn create_intent(&self, booking_id: &BookingId) -> Result<IntentId> {
        Ok(IntentId(format!("bank-{booking_id}")))
    }

    #[instrument(skip_all, fields(booking_id = %booking_id, intent = %intent))]
    async fn confirm(
        &self,
        booking_id: &BookingId,
        intent: &IntentId,
        details: &PaymentDetails,
    ) -> Result<Confirmation> {
        if !matches!(details, PaymentDetails::Bank) {
            return Err(CheckoutError::ValidationError(format!(
                "Bank transfer cannot confirm {} details",
                details.method()
            )));
        }

        let token = CsrfResolver::resolve(self.document.as_ref())?;
        let reply = self
            .transport
            .post_json(
                &payment_path(booking_id.as_str(), PaymentMethod::Bank, "process"),
                &token,
                None,
            )
            .await?;
        let body = interpret_reply(PaymentMethod::Bank, reply)?;

        let reference = first_str(&body, &["reference_number"]).ok_or_else(|| {
            CheckoutError::Gateway(PaymentMethod::Bank.default_failure_message().to_string())
        })?;
        info!(%reference, "bank transfer registered");
        Ok(Confirmation {
            reference,
            kind: ReferenceKind::BankReference,
        })
    }
}
