use crate::domain::payment::PaymentMethod;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CheckoutError>;

#[derive(Error, Debug)]
pub enum CheckoutError {
    /// Client-side shape check failed. Advisory in most flows.
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Anti-forgery token missing: no csrftoken cookie and no csrf-token meta tag")]
    TokenMissing,
    #[error("{0}")]
    Gateway(String),
    #[error("Payment cancelled by user")]
    Cancelled,
    #[error("A payment is already being processed")]
    AlreadyProcessing,
    #[error("No gateway configured for {0}")]
    GatewayNotConfigured(PaymentMethod),
    #[error("Storage quota exceeded")]
    QuotaExceeded,
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for CheckoutError {
    fn from(err: rocksdb::Error) -> Self {
        CheckoutError::Storage(err.to_string())
    }
}
