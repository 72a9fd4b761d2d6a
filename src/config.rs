use crate::domain::money::CurrencyDisplay;
use crate::domain::payment::PaymentMethod;
use crate::domain::validation::ValidationMode;
use crate::error::{CheckoutError, Result};
use std::str::FromStr;
use std::time::Duration;

pub const ENV_BASE_URL: &str = "TOURCHECKOUT_BASE_URL";
pub const ENV_GATEWAY_MODE: &str = "TOURCHECKOUT_GATEWAY_MODE";
pub const ENV_METHODS: &str = "TOURCHECKOUT_METHODS";
pub const ENV_CACHE_TTL_SECS: &str = "TOURCHECKOUT_CACHE_TTL_SECS";
pub const ENV_CURRENCY_DISPLAY: &str = "TOURCHECKOUT_CURRENCY_DISPLAY";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "TOURCHECKOUT_HTTP_TIMEOUT_SECS";
pub const ENV_CARD_VALIDATION: &str = "TOURCHECKOUT_CARD_VALIDATION";
pub const ENV_FORM_VALIDATION: &str = "TOURCHECKOUT_FORM_VALIDATION";

/// Which gateway implementations back the configured methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GatewayMode {
    /// Real backend endpoints.
    #[default]
    Live,
    /// Test mode: every payment succeeds locally with a `TEST-` reference.
    Simulated,
}

impl FromStr for GatewayMode {
    type Err = CheckoutError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "live" => Ok(Self::Live),
            "simulated" | "test" => Ok(Self::Simulated),
            other => Err(CheckoutError::Config(format!(
                "unknown gateway mode {other:?}, expected \"live\" or \"simulated\""
            ))),
        }
    }
}

#[derive(Clone, Debug)]
pub struct CheckoutConfig {
    /// Origin of the booking backend, e.g. `https://tours.example.com`.
    pub base_url: String,

    pub gateway_mode: GatewayMode,

    /// Payment methods offered on the payment step, in display order.
    pub methods: Vec<PaymentMethod>,

    // =========================
    // Fragment cache
    // =========================
    /// Disabled caches answer every read with `None` and drop writes.
    pub cache_enabled: bool,

    /// Every cache key is stored under this prefix, so sweeps never touch
    /// unrelated storage keys.
    pub cache_prefix: String,

    /// TTL applied when `set` is called without one.
    pub cache_ttl: Duration,

    // =========================
    // Presentation and validation
    // =========================
    pub currency_display: CurrencyDisplay,

    /// Card shape checks stop the payment before any request is sent.
    pub card_validation: ValidationMode,

    /// Login/signup/contact checks are reported but do not stop submission.
    pub form_validation: ValidationMode,

    pub http_timeout: Duration,
}

impl Default for CheckoutConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            gateway_mode: GatewayMode::Live,
            methods: PaymentMethod::ALL.to_vec(),
            cache_enabled: true,
            cache_prefix: "tourism_cache_".to_string(),
            cache_ttl: Duration::from_secs(30 * 60),
            currency_display: CurrencyDisplay::CodeSuffix,
            card_validation: ValidationMode::Blocking,
            form_validation: ValidationMode::Advisory,
            http_timeout: Duration::from_secs(15),
        }
    }
}

impl CheckoutConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for the `TOURCHECKOUT_*` keys.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.trim().is_empty()) {
            config.base_url = url.trim().to_string();
        }
        if let Some(mode) = lookup(ENV_GATEWAY_MODE) {
            config.gateway_mode = mode.parse()?;
        }
        if let Some(methods) = lookup(ENV_METHODS) {
            config.methods = parse_methods(&methods)?;
        }
        if let Some(ttl) = lookup(ENV_CACHE_TTL_SECS) {
            config.cache_ttl = Duration::from_secs(parse_secs(ENV_CACHE_TTL_SECS, &ttl)?);
        }
        if let Some(display) = lookup(ENV_CURRENCY_DISPLAY) {
            config.currency_display = display.parse()?;
        }
        if let Some(timeout) = lookup(ENV_HTTP_TIMEOUT_SECS) {
            config.http_timeout = Duration::from_secs(parse_secs(ENV_HTTP_TIMEOUT_SECS, &timeout)?);
        }
        if let Some(mode) = lookup(ENV_CARD_VALIDATION) {
            config.card_validation = mode.parse()?;
        }
        if let Some(mode) = lookup(ENV_FORM_VALIDATION) {
            config.form_validation = mode.parse()?;
        }

        Ok(config)
    }
}

/// Comma-separated list such as `"paypal,card"`. Duplicates are dropped.
pub fn parse_methods(value: &str) -> Result<Vec<PaymentMethod>> {
    let mut methods = Vec::new();
    for part in value.split(',').filter(|p| !p.trim().is_empty()) {
        let method: PaymentMethod = part.parse()?;
        if !methods.contains(&method) {
            methods.push(method);
        }
    }
    if methods.is_empty() {
        return Err(CheckoutError::Config(
            "at least one payment method must be enabled".to_string(),
        ));
    }
    Ok(methods)
}

fn parse_secs(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| CheckoutError::Config(format!("{key} must be a whole number of seconds")))
}
