use crate::domain::ports::{HttpReply, HttpTransport};
use crate::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{CONTENT_TYPE, SET_COOKIE};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

pub const CSRF_HEADER: &str = "X-CSRFToken";
pub const CSRF_REFRESH_PATH: &str = "/csrf/";

/// Backend client on `reqwest`. Every mutation carries the anti-forgery header.
#[derive(Clone)]
pub struct ReqwestTransport {
    http: Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    #[instrument(skip_all, fields(path = %path), level = "debug")]
    async fn post_json(
        &self,
        path: &str,
        csrf_token: &str,
        body: Option<Value>,
    ) -> Result<HttpReply> {
        let mut request = self
            .http
            .post(self.url(path))
            .header(CSRF_HEADER, csrf_token)
            .header("X-Requested-With", "XMLHttpRequest")
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;

        // Error pages are often HTML; keep them as a string so callers fall back
        // to their own message instead of failing on decode.
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        debug!(status, "backend replied");
        Ok(HttpReply { status, body })
    }

    #[instrument(skip(self), level = "debug")]
    async fn fetch_csrf_cookie(&self) -> Result<Option<String>> {
        let response = self.http.get(self.url(CSRF_REFRESH_PATH)).send().await?;

        let token = response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .filter_map(|cookie| cookie.split(';').next())
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == "csrftoken")
            .map(|(_, value)| value.to_string());

        debug!(found = token.is_some(), "csrf cookie refresh finished");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joins_without_double_slash() {
        let transport = ReqwestTransport::new("http://localhost:8000/", Duration::from_secs(1)).unwrap();
        assert_eq!(
            transport.url("/booking/7/payment/bank/process/"),
            "http://localhost:8000/booking/7/payment/bank/process/"
        );
        assert_eq!(transport.url("csrf/"), "http://localhost:8000/csrf/");
    }
}
