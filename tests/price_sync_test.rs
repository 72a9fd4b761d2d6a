mod common;

use common::{MockTransport, mounted_page, session};
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;
use tourcheckout::application::fragment_cache::LocalFragmentCache;
use tourcheckout::application::price_sync::PriceSyncService;
use tourcheckout::application::session_store::SessionStore;
use tourcheckout::config::GatewayMode;
use tourcheckout::domain::money::{CurrencyCode, CurrencyDisplay, Money};
use tourcheckout::domain::ports::{Document, Selector};
use tourcheckout::domain::session::{BookingSession, PriceRole};
use tourcheckout::infrastructure::in_memory::{Element, InMemoryDocument, InMemoryStorage, ManualClock};

fn cache() -> LocalFragmentCache {
    LocalFragmentCache::new(
        Arc::new(InMemoryStorage::new()),
        Arc::new(ManualClock::new(0)),
        "tourism_cache_",
        Duration::from_secs(1_800),
    )
}

#[tokio::test]
async fn test_every_tagged_node_shows_server_total() {
    let (doc, _page) = mounted_page(
        GatewayMode::Simulated,
        Arc::new(MockTransport::new()),
        session(Money::new(dec!(100)), Money::new(dec!(10)), Money::new(dec!(90)), "USD"),
    );

    for selector in [Selector::attr_eq("data-price", "total"), Selector::id("payment-total")] {
        assert_eq!(doc.texts(&selector), vec!["90.00 USD".to_string()]);
    }
    assert_eq!(doc.texts(&Selector::id("payment-subtotal")), vec!["100.00 USD".to_string()]);
    assert_eq!(doc.texts(&Selector::id("payment-discount")), vec!["10.00 USD".to_string()]);
}

#[tokio::test]
async fn test_refresh_is_idempotent_and_sets_layout() {
    let (doc, page) = mounted_page(
        GatewayMode::Simulated,
        Arc::new(MockTransport::new()),
        session(Money::new(dec!(100)), Money::ZERO, Money::new(dec!(100)), "EUR"),
    );

    let first = page.prices.refresh();
    let snapshot: Vec<_> = doc
        .query_all(&Selector::attr("data-price"))
        .into_iter()
        .filter_map(|node| doc.element(node))
        .collect();
    let second = page.prices.refresh();
    let again: Vec<_> = doc
        .query_all(&Selector::attr("data-price"))
        .into_iter()
        .filter_map(|node| doc.element(node))
        .collect();

    assert_eq!(first, second);
    assert_eq!(snapshot, again);
    let total = &snapshot[2];
    assert_eq!(total.styles.get("display").map(String::as_str), Some("inline-block"));
    assert_eq!(total.styles.get("min-width").map(String::as_str), Some("80px"));
    assert_eq!(total.styles.get("text-align").map(String::as_str), Some("right"));
}

#[tokio::test]
async fn test_follower_rerenders_after_session_change() {
    let (doc, page) = mounted_page(
        GatewayMode::Simulated,
        Arc::new(MockTransport::new()),
        session(Money::new(dec!(100)), Money::new(dec!(10)), Money::new(dec!(90)), "USD"),
    );
    let follower = page.prices.clone().follow();

    page.store.update(|s| s.total_price = Money::new(dec!(75)));
    for _ in 0..100 {
        if doc.texts(&Selector::id("payment-total")) == ["75.00 USD"] {
            break;
        }
        tokio::task::yield_now().await;
    }

    assert_eq!(doc.texts(&Selector::id("payment-total")), vec!["75.00 USD".to_string()]);
    follower.abort();
}

#[test]
fn test_symbol_prefix_display() {
    let doc = Arc::new(InMemoryDocument::new().with_element(Element::new("span").id("total")));
    let session = BookingSession::new(CurrencyCode::new("USD").unwrap()).with_prices(
        Money::new(dec!(90)),
        Money::ZERO,
        Money::new(dec!(90)),
    );
    let service = PriceSyncService::new(SessionStore::new(session), doc.clone(), CurrencyDisplay::SymbolPrefix);

    service.refresh();
    assert_eq!(doc.texts(&Selector::id("total")), vec!["$90.00".to_string()]);
}

#[test]
fn test_stashed_prices_seed_an_unpriced_page() {
    let cache = cache();

    let tour_page = PriceSyncService::new(
        SessionStore::new(
            BookingSession::new(CurrencyCode::new("EUR").unwrap()).with_prices(
                Money::new(dec!(120)),
                Money::new(dec!(20)),
                Money::new(dec!(100)),
            ),
        ),
        Arc::new(InMemoryDocument::new()),
        CurrencyDisplay::CodeSuffix,
    );
    assert!(tour_page.stash(&cache));

    let doc = Arc::new(InMemoryDocument::booking_page("7"));
    let store = SessionStore::new(BookingSession::default());
    let checkout_page = PriceSyncService::new(store.clone(), doc.clone(), CurrencyDisplay::CodeSuffix);

    assert!(checkout_page.restore(&cache));
    let session = store.snapshot();
    assert_eq!(session.total_price, Money::new(dec!(100)));
    assert_eq!(session.subtotal, Money::new(dec!(120)));
    assert_eq!(session.discount_amount, Money::new(dec!(20)));
    assert_eq!(session.currency_code.as_str(), "EUR");
    assert_eq!(doc.texts(&Selector::id("payment-total")), vec!["100.00 EUR".to_string()]);
}

#[test]
fn test_server_prices_win_over_stash() {
    let cache = cache();
    cache.set("tour_total", &"999.00 USD");

    let store = SessionStore::new(
        BookingSession::default().with_prices(Money::new(dec!(90)), Money::ZERO, Money::new(dec!(90))),
    );
    let service = PriceSyncService::new(store.clone(), Arc::new(InMemoryDocument::new()), CurrencyDisplay::CodeSuffix);

    assert!(!service.restore(&cache));
    assert_eq!(store.snapshot().price_snapshot().amount(PriceRole::Total), Money::new(dec!(90)));
}

#[test]
fn test_nothing_to_restore() {
    let store = SessionStore::new(BookingSession::default());
    let service = PriceSyncService::new(store.clone(), Arc::new(InMemoryDocument::new()), CurrencyDisplay::CodeSuffix);
    assert!(!service.restore(&cache()));
    assert!(store.snapshot().total_price.is_zero());
}
