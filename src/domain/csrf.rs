use super::ports::{Document, HttpTransport, Selector};
use crate::error::{CheckoutError, Result};
use percent_encoding::percent_decode_str;
use tracing::{error, info, warn};

pub const CSRF_COOKIE: &str = "csrftoken";
pub const CSRF_META_NAME: &str = "csrf-token";
pub const LANGUAGE_COOKIE: &str = "django_language";
/// One year, the lifetime the language switcher gives its cookie.
pub const LANGUAGE_COOKIE_MAX_AGE_SECS: u64 = 365 * 24 * 60 * 60;

/// Parsed `document.cookie`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CookieJar {
    pairs: Vec<(String, String)>,
}

impl CookieJar {
    pub fn parse(cookie_string: &str) -> Self {
        let pairs = cookie_string
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .map(|(name, value)| {
                (
                    name.trim().to_string(),
                    percent_decode_str(value.trim())
                        .decode_utf8_lossy()
                        .into_owned(),
                )
            })
            .collect();
        Self { pairs }
    }

    /// First value for `name`, as the browser lists the most specific path first.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Cookie,
    MetaTag,
    Refreshed,
}

/// Finds the anti-forgery token for state-changing requests.
#[derive(Debug, Default, Clone, Copy)]
pub struct CsrfResolver;

impl CsrfResolver {
    /// Cookie first, then `<meta name="csrf-token" content="...">`.
    pub fn lookup(document: &dyn Document) -> Option<(String, TokenSource)> {
        let jar = CookieJar::parse(&document.cookie_string());
        if let Some(token) = jar.get(CSRF_COOKIE).filter(|t| !t.is_empty()) {
            return Some((token.to_string(), TokenSource::Cookie));
        }

        document
            .query_all(&Selector::attr_eq("name", CSRF_META_NAME))
            .into_iter()
            .filter_map(|node| document.attribute(node, "content"))
            .find(|content| !content.trim().is_empty())
            .map(|content| (content.trim().to_string(), TokenSource::MetaTag))
    }

    pub fn resolve(document: &dyn Document) -> Result<String> {
        match Self::lookup(document) {
            Some((token, _)) => Ok(token),
            None => {
                error!("CSRF token not found in cookie or meta tag");
                Err(CheckoutError::TokenMissing)
            }
        }
    }

    /// Like [`Self::resolve`], but performs one refresh round trip when the
    /// token is absent and stores the issued cookie on the page.
    pub async fn ensure(document: &dyn Document, transport: &dyn HttpTransport) -> Result<String> {
        if let Some((token, _)) = Self::lookup(document) {
            return Ok(token);
        }

        warn!("CSRF token absent, requesting a fresh cookie");
        match transport.fetch_csrf_cookie().await {
            Ok(Some(token)) if !token.is_empty() => {
                document.set_cookie(&format!("{CSRF_COOKIE}={token}; path=/; SameSite=Lax"));
                info!(source = ?TokenSource::Refreshed, "CSRF cookie refreshed");
                Ok(token)
            }
            Ok(_) => {
                error!("CSRF refresh returned no token");
                Err(CheckoutError::TokenMissing)
            }
            Err(e) => {
                error!(error = %e, "CSRF refresh failed");
                Err(CheckoutError::TokenMissing)
            }
        }
    }
}

/// `Set-Cookie`-style assignment for the locale cookie read by the backend.
pub fn language_cookie(language: &str, max_age_secs: u64) -> String {
    format!("{LANGUAGE_COOKIE}={language}; path=/; max-age={max_age_secs}; SameSite=Lax")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::in_memory::{Element, InMemoryDocument};

    #[test]
    fn test_cookie_jar_decodes_values() {
        let jar = CookieJar::parse("sessionid=abc; csrftoken=a%2Bb%3D; theme=dark");
        assert_eq!(jar.get("csrftoken"), Some("a+b="));
        assert_eq!(jar.get("theme"), Some("dark"));
        assert_eq!(jar.get("missing"), None);
    }

    #[test]
    fn test_cookie_wins_over_meta() {
        let doc = InMemoryDocument::new()
            .with_cookie("csrftoken", "from-cookie")
            .with_element(
                Element::new("meta")
                    .attr("name", "csrf-token")
                    .attr("content", "from-meta"),
            );
        assert_eq!(
            CsrfResolver::lookup(&doc),
            Some(("from-cookie".to_string(), TokenSource::Cookie))
        );
    }

    #[test]
    fn test_meta_fallback_and_missing() {
        let doc = InMemoryDocument::new().with_element(
            Element::new("meta")
                .attr("name", "csrf-token")
                .attr("content", "from-meta"),
        );
        assert_eq!(CsrfResolver::resolve(&doc).unwrap(), "from-meta");

        let empty = InMemoryDocument::new().with_cookie("csrftoken", "");
        assert!(matches!(
            CsrfResolver::resolve(&empty),
            Err(CheckoutError::TokenMissing)
        ));
    }

    #[test]
    fn test_language_cookie_attributes() {
        assert_eq!(
            language_cookie("es", LANGUAGE_COOKIE_MAX_AGE_SECS),
            "django_language=es; path=/; max-age=31536000; SameSite=Lax"
        );
    }
}
