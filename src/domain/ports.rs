use super::payment::{Confirmation, IntentId, PaymentDetails, PaymentMethod};
use super::session::BookingId;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// How a script finds nodes in the rendered page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// `#id`
    Id(String),
    /// `.class`
    Class(String),
    /// `[name]` or `[name="value"]`
    Attr { name: String, value: Option<String> },
    /// `body`, `meta`, ...
    Tag(String),
}

impl Selector {
    pub fn id(id: &str) -> Self {
        Self::Id(id.to_string())
    }

    pub fn class(class: &str) -> Self {
        Self::Class(class.to_string())
    }

    pub fn attr(name: &str) -> Self {
        Self::Attr {
            name: name.to_string(),
            value: None,
        }
    }

    pub fn attr_eq(name: &str, value: &str) -> Self {
        Self::Attr {
            name: name.to_string(),
            value: Some(value.to_string()),
        }
    }

    pub fn tag(tag: &str) -> Self {
        Self::Tag(tag.to_string())
    }
}

/// Opaque handle to a node returned by [`Document::query_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeRef(pub usize);

/// The rendered page. Calls run on the UI thread and never block on the network.
///
/// Mutators on a stale handle are no-ops, matching what a detached DOM node does.
pub trait Document: Send + Sync {
    /// Matching nodes in document order.
    fn query_all(&self, selector: &Selector) -> Vec<NodeRef>;
    fn text(&self, node: NodeRef) -> Option<String>;
    fn set_text(&self, node: NodeRef, text: &str);
    fn attribute(&self, node: NodeRef, name: &str) -> Option<String>;
    fn has_class(&self, node: NodeRef, class: &str) -> bool;
    fn add_class(&self, node: NodeRef, class: &str);
    fn remove_class(&self, node: NodeRef, class: &str);
    fn set_style(&self, node: NodeRef, property: &str, value: &str);
    fn set_disabled(&self, node: NodeRef, disabled: bool);
    fn scroll_to_top(&self);
    /// `document.cookie` as a single `name=value; name=value` string.
    fn cookie_string(&self) -> String;
    /// Equivalent of assigning to `document.cookie`.
    fn set_cookie(&self, cookie: &str);
    fn location(&self) -> String;

    fn query(&self, selector: &Selector) -> Option<NodeRef> {
        self.query_all(selector).into_iter().next()
    }
}

/// `localStorage` / `sessionStorage` shaped key-value store.
pub trait KeyValueStorage: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>>;
    /// Fails with [`crate::error::CheckoutError::QuotaExceeded`] when the store is full.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;
    fn remove_item(&self, key: &str) -> Result<()>;
    fn keys(&self) -> Result<Vec<String>>;
}

pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;
}

/// Decoded response of a backend call.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpReply {
    pub status: u16,
    pub body: serde_json::Value,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// POSTs JSON to a backend path with the anti-forgery header attached.
    async fn post_json(
        &self,
        path: &str,
        csrf_token: &str,
        body: Option<serde_json::Value>,
    ) -> Result<HttpReply>;

    /// Asks the backend to issue a fresh `csrftoken` cookie and returns its value.
    async fn fetch_csrf_cookie(&self) -> Result<Option<String>>;
}

/// One payment method's integration with the backend.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn method(&self) -> PaymentMethod;

    /// Prepares the method's widget once the payment step is on screen.
    /// Returns false when the widget's container is missing.
    fn mount(&self, document: &dyn Document) -> bool;

    async fn create_intent(&self, booking_id: &BookingId) -> Result<IntentId>;

    async fn confirm(
        &self,
        booking_id: &BookingId,
        intent: &IntentId,
        details: &PaymentDetails,
    ) -> Result<Confirmation>;
}

pub type DocumentRef = Arc<dyn Document>;
pub type StorageRef = Arc<dyn KeyValueStorage>;
pub type ClockRef = Arc<dyn Clock>;
pub type TransportRef = Arc<dyn HttpTransport>;
pub type GatewayRef = Arc<dyn PaymentGateway>;
