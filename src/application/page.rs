use super::checkout::CheckoutFlow;
use super::price_sync::PriceSyncService;
use super::session_store::SessionStore;
use super::steps::StepController;
use crate::config::CheckoutConfig;
use crate::domain::ports::{DocumentRef, TransportRef};
use crate::domain::session::BookingSession;
use crate::error::Result;
use crate::infrastructure::gateways::build_gateways;
use std::sync::Arc;
use tracing::info;

/// The checkout components of one booking page, wired to a shared session.
pub struct BookingPage {
    pub store: SessionStore,
    pub prices: Arc<PriceSyncService>,
    pub steps: Arc<StepController>,
    pub checkout: CheckoutFlow,
}

impl BookingPage {
    /// Wires the controllers for the page in `document`, seeded with the
    /// server-rendered `session`, and renders the initial step and prices.
    pub fn mount(
        config: &CheckoutConfig,
        document: DocumentRef,
        session: BookingSession,
        transport: TransportRef,
    ) -> Result<Self> {
        let booking_id = CheckoutFlow::booking_id_from_page(document.as_ref())?;
        let initial_step = session.current_step;
        let store = SessionStore::new(session);
        let gateways = build_gateways(config, transport, document.clone());

        let prices = Arc::new(PriceSyncService::new(
            store.clone(),
            document.clone(),
            config.currency_display,
        ));
        let steps = Arc::new(StepController::new(
            store.clone(),
            document.clone(),
            prices.clone(),
            gateways.clone(),
        ));
        let checkout = CheckoutFlow::new(booking_id, store.clone(), document, steps.clone(), gateways);

        steps.render(initial_step);
        prices.refresh();
        info!(booking_id = %checkout.booking_id(), methods = ?checkout.methods(), "booking page mounted");

        Ok(Self {
            store,
            prices,
            steps,
            checkout,
        })
    }
}
