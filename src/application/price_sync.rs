use super::fragment_cache::LocalFragmentCache;
use super::session_store::SessionStore;
use crate::domain::money::{CurrencyDisplay, parse_display_amount};
use crate::domain::ports::{DocumentRef, NodeRef, Selector};
use crate::domain::session::PriceRole;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Keys under which displayed prices travel from the tour page to checkout.
pub const STASH_KEYS: [(PriceRole, &str); 3] = [
    (PriceRole::Subtotal, "tour_subtotal"),
    (PriceRole::Discount, "tour_discount"),
    (PriceRole::Total, "tour_total"),
];

/// Projects the session's prices into every tagged node on the page.
///
/// Never computes prices; the server-seeded values in the session are the only input.
pub struct PriceSyncService {
    store: SessionStore,
    document: DocumentRef,
    display: CurrencyDisplay,
}

impl PriceSyncService {
    pub fn new(store: SessionStore, document: DocumentRef, display: CurrencyDisplay) -> Self {
        Self {
            store,
            document,
            display,
        }
    }

    /// `[data-price=role]`, `#role` and `#payment-role`.
    pub fn role_selectors(role: PriceRole) -> [Selector; 3] {
        [
            Selector::attr_eq("data-price", role.as_str()),
            Selector::id(role.as_str()),
            Selector::id(&format!("payment-{}", role.as_str())),
        ]
    }

    /// Display string for `role` given the current session.
    pub fn formatted(&self, role: PriceRole) -> String {
        let snapshot = self.store.snapshot().price_snapshot();
        self.display
            .format(snapshot.amount(role), &snapshot.currency_code)
    }

    /// Rewrites every price node from the session. Idempotent. Returns the
    /// number of nodes written.
    pub fn refresh(&self) -> usize {
        let snapshot = self.store.snapshot().price_snapshot();
        let mut written = 0;

        for role in PriceRole::ALL {
            let text = self
                .display
                .format(snapshot.amount(role), &snapshot.currency_code);
            let nodes = self.nodes_for(role);
            if nodes.is_empty() {
                debug!(role = role.as_str(), "no price nodes on page");
                continue;
            }
            for node in nodes {
                self.document.set_text(node, &text);
                self.document.set_style(node, "display", "inline-block");
                self.document.set_style(node, "min-width", "80px");
                self.document.set_style(node, "text-align", "right");
                written += 1;
            }
        }

        debug!(written, "prices refreshed");
        written
    }

    /// Re-renders the prices after every session change. The task runs until
    /// aborted or the runtime shuts down.
    pub fn follow(self: Arc<Self>) -> JoinHandle<()> {
        let mut changes = self.store.subscribe();
        tokio::spawn(async move {
            while changes.changed().await.is_ok() {
                self.refresh();
            }
        })
    }

    /// Saves the displayed prices so the next page can show them before its
    /// own data arrives.
    pub fn stash(&self, cache: &LocalFragmentCache) -> bool {
        STASH_KEYS
            .iter()
            .map(|(role, key)| cache.set(key, &self.formatted(*role)))
            .fold(true, |all, stored| all && stored)
    }

    /// Seeds the session from stashed prices when the server rendered none.
    ///
    /// Returns whether anything was applied.
    pub fn restore(&self, cache: &LocalFragmentCache) -> bool {
        if self.store.snapshot().has_server_prices() {
            debug!("server prices present, ignoring stashed prices");
            return false;
        }

        let [subtotal, discount, total] =
            STASH_KEYS.map(|(_, key)| cache.get::<String>(key).and_then(|t| parse_display_amount(&t)));

        let Some((total, currency)) = total else {
            debug!("no stashed total to restore");
            return false;
        };
        if total.is_zero() {
            warn!("stashed total is zero, not restoring");
            return false;
        }

        self.store.update(|session| {
            session.total_price = total;
            if let Some((amount, _)) = subtotal {
                session.subtotal = amount;
            }
            if let Some((amount, _)) = discount {
                session.discount_amount = amount.abs();
            }
            if let Some(code) = currency {
                session.currency_code = code;
            }
        });
        info!("prices restored from fragment cache");
        self.refresh();
        true
    }

    fn nodes_for(&self, role: PriceRole) -> BTreeSet<NodeRef> {
        Self::role_selectors(role)
            .iter()
            .flat_map(|selector| self.document.query_all(selector))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::money::{CurrencyCode, Money};
    use crate::domain::session::BookingSession;
    use crate::infrastructure::in_memory::{Element, InMemoryDocument};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    #[test]
    fn test_node_matching_two_selectors_is_written_once() {
        let doc = Arc::new(
            InMemoryDocument::new().with_element(Element::new("span").id("total").attr("data-price", "total")),
        );
        let session = BookingSession::new(CurrencyCode::new("EUR").unwrap()).with_prices(
            Money::new(dec!(10)),
            Money::ZERO,
            Money::new(dec!(10)),
        );
        let service = PriceSyncService::new(SessionStore::new(session), doc.clone(), CurrencyDisplay::CodeSuffix);

        assert_eq!(service.refresh(), 1);
        assert_eq!(doc.texts(&Selector::id("total")), vec!["10.00 EUR".to_string()]);
    }
}
