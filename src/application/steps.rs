use super::price_sync::PriceSyncService;
use super::session_store::SessionStore;
use crate::domain::ports::{DocumentRef, GatewayRef, Selector};
use crate::domain::session::Step;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub const STEP_CLASS: &str = "progress-step";
pub const PROGRESS_BAR_CLASS: &str = "progress-bar-fill";
pub const COMPLETED_CLASS: &str = "completed";
pub const ACTIVE_CLASS: &str = "active";
pub const SUCCESS_CLASS: &str = "success-animation";
pub const COMPLETED_GLYPH: &str = "✓";

/// Owns the wizard position and keeps the progress indicator in line with it.
pub struct StepController {
    store: SessionStore,
    document: DocumentRef,
    prices: Arc<PriceSyncService>,
    gateways: Vec<GatewayRef>,
}

impl StepController {
    pub fn new(
        store: SessionStore,
        document: DocumentRef,
        prices: Arc<PriceSyncService>,
        gateways: Vec<GatewayRef>,
    ) -> Self {
        Self {
            store,
            document,
            prices,
            gateways,
        }
    }

    pub fn current_step(&self) -> Step {
        self.store.snapshot().current_step
    }

    /// Moves the wizard to step `n`. Out-of-range steps are logged and ignored.
    ///
    /// The new index is recorded even when the page lacks the indicator nodes.
    /// Entering the payment step yields once so the step's markup is painted
    /// before the payment widgets mount into it.
    #[instrument(skip(self))]
    pub async fn go_to_step(&self, n: u8) -> bool {
        let step = match Step::new(n) {
            Ok(step) => step,
            Err(e) => {
                warn!(error = %e, "step transition ignored");
                return false;
            }
        };

        self.store.update(|session| session.current_step = step);
        self.render(step);
        self.prices.refresh();
        self.document.scroll_to_top();

        if step == Step::PAYMENT {
            tokio::task::yield_now().await;
            let mounted = self.mount_gateways();
            debug!(mounted, configured = self.gateways.len(), "payment widgets mounted");
        }

        info!(step = step.number(), "step changed");
        true
    }

    /// Applies the step marks and progress width for `step`.
    pub fn render(&self, step: Step) {
        let steps = self.document.query_all(&Selector::class(STEP_CLASS));
        if steps.is_empty() {
            warn!("progress steps not found, skipping step indicator update");
        }
        for (index, node) in steps.into_iter().enumerate() {
            let number = index + 1;
            let current = usize::from(step.number());
            if number < current {
                self.document.add_class(node, COMPLETED_CLASS);
                self.document.remove_class(node, ACTIVE_CLASS);
                self.document.set_text(node, COMPLETED_GLYPH);
            } else if number == current {
                self.document.add_class(node, ACTIVE_CLASS);
                self.document.remove_class(node, COMPLETED_CLASS);
                self.document.set_text(node, &number.to_string());
            } else {
                self.document.remove_class(node, ACTIVE_CLASS);
                self.document.remove_class(node, COMPLETED_CLASS);
                self.document.set_text(node, &number.to_string());
            }
        }

        match self.document.query(&Selector::class(PROGRESS_BAR_CLASS)) {
            Some(bar) => {
                self.document
                    .set_style(bar, "width", &format!("{}%", step.progress_percent()));
                if step == Step::CONFIRMATION {
                    self.document.add_class(bar, SUCCESS_CLASS);
                } else {
                    self.document.remove_class(bar, SUCCESS_CLASS);
                }
            }
            None => warn!("progress bar not found, skipping width update"),
        }
    }

    /// Mounts every configured gateway's widget. Returns how many mounted.
    pub fn mount_gateways(&self) -> usize {
        self.gateways
            .iter()
            .filter(|gateway| {
                let mounted = gateway.mount(self.document.as_ref());
                if !mounted {
                    warn!(method = %gateway.method(), "payment widget container missing");
                }
                mounted
            })
            .count()
    }
}
