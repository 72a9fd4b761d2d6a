#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tourcheckout::application::page::BookingPage;
use tourcheckout::config::{CheckoutConfig, GatewayMode};
use tourcheckout::domain::money::{CurrencyCode, Money};
use tourcheckout::domain::ports::{HttpReply, HttpTransport};
use tourcheckout::domain::session::BookingSession;
use tourcheckout::error::{CheckoutError, Result};
use tourcheckout::infrastructure::in_memory::InMemoryDocument;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub path: String,
    pub csrf_token: String,
    pub body: Option<Value>,
}

pub enum Scripted {
    Reply(u16, Value),
    NetworkError,
}

/// Backend stand-in: replays scripted replies in order and records every call.
#[derive(Default)]
pub struct MockTransport {
    replies: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<RecordedCall>>,
    csrf_cookie: Mutex<Option<String>>,
    csrf_fetches: Mutex<usize>,
    delay: Option<Duration>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn reply(self, status: u16, body: Value) -> Self {
        self.replies.lock().push_back(Scripted::Reply(status, body));
        self
    }

    pub fn network_error(self) -> Self {
        self.replies.lock().push_back(Scripted::NetworkError);
        self
    }

    pub fn issuing_csrf_cookie(self, token: &str) -> Self {
        *self.csrf_cookie.lock() = Some(token.to_string());
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn csrf_fetches(&self) -> usize {
        *self.csrf_fetches.lock()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn post_json(
        &self,
        path: &str,
        csrf_token: &str,
        body: Option<Value>,
    ) -> Result<HttpReply> {
        self.calls.lock().push(RecordedCall {
            path: path.to_string(),
            csrf_token: csrf_token.to_string(),
            body,
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.replies.lock().pop_front();
        match next {
            Some(Scripted::Reply(status, body)) => Ok(HttpReply { status, body }),
            Some(Scripted::NetworkError) => Err(connection_error()),
            None => Ok(HttpReply {
                status: 500,
                body: Value::Null,
            }),
        }
    }

    async fn fetch_csrf_cookie(&self) -> Result<Option<String>> {
        *self.csrf_fetches.lock() += 1;
        Ok(self.csrf_cookie.lock().clone())
    }
}

/// A transport-level `reqwest` failure; the URL never parses, so nothing is sent.
fn connection_error() -> CheckoutError {
    match reqwest::Client::new().get("http://[::1").build() {
        Err(e) => CheckoutError::Http(e),
        Ok(_) => unreachable!("malformed URL must not build a request"),
    }
}

pub fn config(mode: GatewayMode) -> CheckoutConfig {
    CheckoutConfig {
        gateway_mode: mode,
        ..CheckoutConfig::default()
    }
}

pub fn session(subtotal: Money, discount: Money, total: Money, currency: &str) -> BookingSession {
    BookingSession::new(CurrencyCode::new(currency).unwrap()).with_prices(subtotal, discount, total)
}

/// Booking page "42" with a csrftoken cookie, mounted on `transport`.
pub fn mounted_page(
    mode: GatewayMode,
    transport: Arc<MockTransport>,
    session: BookingSession,
) -> (Arc<InMemoryDocument>, BookingPage) {
    let doc = Arc::new(InMemoryDocument::booking_page("42").with_cookie("csrftoken", "tok-123"));
    let page = BookingPage::mount(&config(mode), doc.clone(), session, transport).unwrap();
    (doc, page)
}
