use super::session_store::SessionStore;
use super::steps::StepController;
use crate::domain::payment::{PaymentAttempt, PaymentDetails, PaymentMethod};
use crate::domain::ports::{Document, DocumentRef, GatewayRef, Selector};
use crate::domain::session::{BookingId, Step};
use crate::error::{CheckoutError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

pub const ERROR_BANNER_ATTR: &str = "data-payment-error";
pub const NOTICE_BANNER_ATTR: &str = "data-payment-notice";
pub const TRIGGER_ATTR: &str = "data-payment-method";
pub const HIDDEN_CLASS: &str = "hidden";

pub const CANCELLED_NOTICE: &str = "Payment cancelled. You can try again when you're ready.";
pub const TOKEN_MISSING_MESSAGE: &str =
    "Your session security token is missing. Please refresh the page and try again.";

/// Runs one payment at a time through the configured gateways and reports the
/// outcome to the page and the step controller.
pub struct CheckoutFlow {
    booking_id: BookingId,
    store: SessionStore,
    document: DocumentRef,
    steps: Arc<StepController>,
    gateways: HashMap<PaymentMethod, GatewayRef>,
    attempts: Mutex<Vec<PaymentAttempt>>,
}

impl CheckoutFlow {
    pub fn new(
        booking_id: BookingId,
        store: SessionStore,
        document: DocumentRef,
        steps: Arc<StepController>,
        gateways: Vec<GatewayRef>,
    ) -> Self {
        let gateways = gateways
            .into_iter()
            .map(|gateway| (gateway.method(), gateway))
            .collect();
        Self {
            booking_id,
            store,
            document,
            steps,
            gateways,
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// Reads the booking id the server rendered into `[data-booking-id]`.
    pub fn booking_id_from_page(document: &dyn Document) -> Result<BookingId> {
        let id = document
            .query_all(&Selector::attr("data-booking-id"))
            .into_iter()
            .find_map(|node| document.attribute(node, "data-booking-id"))
            .ok_or_else(|| {
                CheckoutError::ValidationError("No data-booking-id on page".to_string())
            })?;
        BookingId::new(id)
    }

    pub fn booking_id(&self) -> &BookingId {
        &self.booking_id
    }

    pub fn methods(&self) -> Vec<PaymentMethod> {
        let mut methods: Vec<_> = self.gateways.keys().copied().collect();
        methods.sort();
        methods
    }

    /// Every attempt made on this page, oldest first.
    pub fn attempts(&self) -> Vec<PaymentAttempt> {
        self.attempts.lock().clone()
    }

    /// Creates an intent and confirms it with the method's gateway.
    ///
    /// Fails only when the payment could not start (unknown method or one
    /// already in flight). Gateway outcomes are reported in the returned
    /// attempt and on the page; failures leave the trigger usable again and
    /// never advance the step.
    #[instrument(skip_all, fields(booking_id = %self.booking_id, method = %details.method()))]
    pub async fn pay(&self, details: PaymentDetails) -> Result<PaymentAttempt> {
        let method = details.method();
        let gateway = self
            .gateways
            .get(&method)
            .cloned()
            .ok_or(CheckoutError::GatewayNotConfigured(method))?;

        if !self.store.try_begin_processing() {
            warn!("payment already in progress, ignoring duplicate submission");
            return Err(CheckoutError::AlreadyProcessing);
        }

        self.set_trigger_enabled(method, false);
        self.clear_banner(ERROR_BANNER_ATTR);
        self.clear_banner(NOTICE_BANNER_ATTR);

        let mut attempt = PaymentAttempt::pending(method);
        let outcome = async {
            let intent = gateway.create_intent(&self.booking_id).await?;
            gateway.confirm(&self.booking_id, &intent, &details).await
        }
        .await;

        match outcome {
            Ok(confirmation) => {
                self.store.update(|session| {
                    session.transaction_id = Some(confirmation.reference.clone());
                    session.is_processing = false;
                });
                attempt.succeed(confirmation.reference.clone());
                info!(reference = %confirmation.reference, kind = ?confirmation.kind, "payment confirmed");
                self.steps.go_to_step(Step::CONFIRMATION.number()).await;
            }
            Err(e) => {
                self.store.finish_processing();
                self.set_trigger_enabled(method, true);
                self.report_failure(method, e, &mut attempt);
            }
        }

        self.attempts.lock().push(attempt.clone());
        Ok(attempt)
    }

    fn report_failure(&self, method: PaymentMethod, err: CheckoutError, attempt: &mut PaymentAttempt) {
        match err {
            CheckoutError::Cancelled => {
                info!("payment cancelled, awaiting retry");
                attempt.cancel();
                self.show_banner(NOTICE_BANNER_ATTR, CANCELLED_NOTICE);
            }
            CheckoutError::TokenMissing => {
                error!("payment blocked: anti-forgery token missing");
                attempt.fail(TOKEN_MISSING_MESSAGE);
                self.show_banner(ERROR_BANNER_ATTR, TOKEN_MISSING_MESSAGE);
            }
            CheckoutError::Gateway(message) | CheckoutError::ValidationError(message) => {
                warn!(%message, "payment failed");
                self.show_banner(ERROR_BANNER_ATTR, &message);
                attempt.fail(message);
            }
            other => {
                error!(error = %other, "payment request failed");
                let message = method.default_failure_message();
                attempt.fail(message);
                self.show_banner(ERROR_BANNER_ATTR, message);
            }
        }
    }

    fn set_trigger_enabled(&self, method: PaymentMethod, enabled: bool) {
        for node in self
            .document
            .query_all(&Selector::attr_eq(TRIGGER_ATTR, method.as_str()))
        {
            self.document.set_disabled(node, !enabled);
        }
    }

    fn show_banner(&self, attr: &str, message: &str) {
        let banners = self.document.query_all(&Selector::attr(attr));
        if banners.is_empty() {
            warn!(banner = attr, %message, "no banner on page to show message");
        }
        for node in banners {
            self.document.set_text(node, message);
            self.document.remove_class(node, HIDDEN_CLASS);
        }
    }

    fn clear_banner(&self, attr: &str) {
        for node in self.document.query_all(&Selector::attr(attr)) {
            self.document.set_text(node, "");
            self.document.add_class(node, HIDDEN_CLASS);
        }
    }
}
