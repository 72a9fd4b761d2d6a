use crate::domain::ports::{Clock, Document, KeyValueStorage, NodeRef, Selector};
use crate::error::{CheckoutError, Result};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicI64, Ordering};

/// A node of the in-memory page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub tag: String,
    pub id: Option<String>,
    pub classes: BTreeSet<String>,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
    pub styles: BTreeMap<String, String>,
    pub disabled: bool,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Self::default()
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn class(mut self, class: &str) -> Self {
        self.classes.insert(class.to_string());
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn matches(&self, selector: &Selector) -> bool {
        match selector {
            Selector::Id(id) => self.id.as_deref() == Some(id.as_str()),
            Selector::Class(class) => self.classes.contains(class),
            Selector::Attr { name, value } => match (self.attributes.get(name), value) {
                (Some(_), None) => true,
                (Some(actual), Some(expected)) => actual == expected,
                (None, _) => false,
            },
            Selector::Tag(tag) => self.tag.eq_ignore_ascii_case(tag),
        }
    }
}

#[derive(Debug, Default)]
struct PageState {
    elements: Vec<Element>,
    cookies: Vec<(String, String)>,
    location: String,
    scroll_count: usize,
}

/// Flat, document-ordered page model used by tests and the CLI.
#[derive(Debug, Default)]
pub struct InMemoryDocument {
    state: Mutex<PageState>,
}

impl InMemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_element(self, element: Element) -> Self {
        self.push(element);
        self
    }

    pub fn with_cookie(self, name: &str, value: &str) -> Self {
        self.put_cookie(name, value);
        self
    }

    pub fn with_location(self, location: &str) -> Self {
        self.state.lock().location = location.to_string();
        self
    }

    pub fn push(&self, element: Element) -> NodeRef {
        let mut state = self.state.lock();
        state.elements.push(element);
        NodeRef(state.elements.len() - 1)
    }

    pub fn element(&self, node: NodeRef) -> Option<Element> {
        self.state.lock().elements.get(node.0).cloned()
    }

    /// Text of every node matching `selector`, in document order.
    pub fn texts(&self, selector: &Selector) -> Vec<String> {
        let state = self.state.lock();
        state
            .elements
            .iter()
            .filter(|el| el.matches(selector))
            .map(|el| el.text.clone())
            .collect()
    }

    pub fn scroll_count(&self) -> usize {
        self.state.lock().scroll_count
    }

    pub fn set_location(&self, location: &str) {
        self.state.lock().location = location.to_string();
    }

    /// The confirmation-wizard page as the server renders it: three progress
    /// steps, a progress bar, two price summaries, payment triggers and banners.
    pub fn booking_page(booking_id: &str) -> Self {
        let doc = Self::new()
            .with_location(&format!("/booking/{booking_id}/steps/"))
            .with_element(Element::new("body"))
            .with_element(
                Element::new("div")
                    .attr("x-data", "bookingConfirmation()")
                    .attr("data-booking-id", booking_id),
            );
        for n in 1..=3 {
            doc.push(
                Element::new("div")
                    .class("progress-step")
                    .text(&n.to_string()),
            );
        }
        doc.push(Element::new("div").class("progress-bar-fill"));
        for role in ["subtotal", "discount", "total"] {
            doc.push(Element::new("span").attr("data-price", role));
            doc.push(Element::new("span").id(&format!("payment-{role}")));
        }
        doc.push(Element::new("div").id("paypal-button-container"));
        for method in ["paypal", "card", "bank"] {
            doc.push(Element::new("button").attr("data-payment-method", method));
        }
        doc.push(Element::new("div").attr("data-payment-error", ""));
        doc.push(Element::new("div").attr("data-payment-notice", ""));
        doc
    }

    fn put_cookie(&self, name: &str, value: &str) {
        let mut state = self.state.lock();
        match state.cookies.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => state.cookies.push((name.to_string(), value.to_string())),
        }
    }

    fn with_node<F: FnOnce(&mut Element)>(&self, node: NodeRef, f: F) {
        if let Some(el) = self.state.lock().elements.get_mut(node.0) {
            f(el);
        }
    }
}

impl Document for InMemoryDocument {
    fn query_all(&self, selector: &Selector) -> Vec<NodeRef> {
        let state = self.state.lock();
        state
            .elements
            .iter()
            .enumerate()
            .filter(|(_, el)| el.matches(selector))
            .map(|(i, _)| NodeRef(i))
            .collect()
    }

    fn text(&self, node: NodeRef) -> Option<String> {
        self.state.lock().elements.get(node.0).map(|el| el.text.clone())
    }

    fn set_text(&self, node: NodeRef, text: &str) {
        self.with_node(node, |el| el.text = text.to_string());
    }

    fn attribute(&self, node: NodeRef, name: &str) -> Option<String> {
        self.state
            .lock()
            .elements
            .get(node.0)
            .and_then(|el| el.attributes.get(name).cloned())
    }

    fn has_class(&self, node: NodeRef, class: &str) -> bool {
        self.state
            .lock()
            .elements
            .get(node.0)
            .is_some_and(|el| el.classes.contains(class))
    }

    fn add_class(&self, node: NodeRef, class: &str) {
        self.with_node(node, |el| {
            el.classes.insert(class.to_string());
        });
    }

    fn remove_class(&self, node: NodeRef, class: &str) {
        self.with_node(node, |el| {
            el.classes.remove(class);
        });
    }

    fn set_style(&self, node: NodeRef, property: &str, value: &str) {
        // An empty value clears the inline property, as in the DOM.
        self.with_node(node, |el| {
            if value.is_empty() {
                el.styles.remove(property);
            } else {
                el.styles.insert(property.to_string(), value.to_string());
            }
        });
    }

    fn set_disabled(&self, node: NodeRef, disabled: bool) {
        self.with_node(node, |el| el.disabled = disabled);
    }

    fn scroll_to_top(&self) {
        self.state.lock().scroll_count += 1;
    }

    fn cookie_string(&self) -> String {
        self.state
            .lock()
            .cookies
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("; ")
    }

    fn set_cookie(&self, cookie: &str) {
        let mut parts = cookie.split(';').map(str::trim);
        let Some((name, value)) = parts.next().and_then(|pair| pair.split_once('=')) else {
            return;
        };
        let expired = parts.any(|attr| attr.eq_ignore_ascii_case("max-age=0"));
        if expired {
            self.state.lock().cookies.retain(|(n, _)| n != name);
        } else {
            self.put_cookie(name, value);
        }
    }

    fn location(&self) -> String {
        self.state.lock().location.clone()
    }
}

/// Browser-storage stand-in. An item limit simulates quota pressure.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    items: Mutex<BTreeMap<String, String>>,
    item_limit: Option<usize>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that refuses to hold more than `limit` keys.
    pub fn with_item_limit(limit: usize) -> Self {
        Self {
            items: Mutex::new(BTreeMap::new()),
            item_limit: Some(limit),
        }
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl KeyValueStorage for InMemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.lock();
        if let Some(limit) = self.item_limit
            && !items.contains_key(key)
            && items.len() >= limit
        {
            return Err(CheckoutError::QuotaExceeded);
        }
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items.lock().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(self.items.lock().keys().cloned().collect())
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    pub fn new(start_millis: i64) -> Self {
        Self {
            now: AtomicI64::new(start_millis),
        }
    }

    pub fn advance(&self, millis: i64) {
        self.now.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
