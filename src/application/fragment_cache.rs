use crate::config::CheckoutConfig;
use crate::domain::ports::{ClockRef, StorageRef};
use crate::error::CheckoutError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Share of entries dropped when the storage reports it is full.
const EVICTION_FRACTION: f64 = 0.2;

/// Stored form of one entry: `{"data": ..., "expiry": <epoch ms>}`.
#[derive(Serialize, Deserialize)]
struct CacheEntry<T> {
    data: T,
    expiry: i64,
}

#[derive(Deserialize)]
struct ExpiryOnly {
    expiry: i64,
}

/// Expiring key-value cache over browser-style storage.
///
/// Guarantees:
/// - every key lives under `prefix`; sweeps and `clear_all` never touch other keys
/// - reads never fail: expired or corrupt entries are evicted and read as `None`;
///   an entry read as the wrong type is `None` but kept
/// - a full store triggers one eviction round and exactly one retry
pub struct LocalFragmentCache {
    storage: StorageRef,
    clock: ClockRef,
    prefix: String,
    default_ttl: Duration,
    enabled: bool,
}

impl LocalFragmentCache {
    pub fn new(storage: StorageRef, clock: ClockRef, prefix: &str, default_ttl: Duration) -> Self {
        Self {
            storage,
            clock,
            prefix: prefix.to_string(),
            default_ttl,
            enabled: true,
        }
    }

    pub fn from_config(config: &CheckoutConfig, storage: StorageRef, clock: ClockRef) -> Self {
        let mut cache = Self::new(storage, clock, &config.cache_prefix, config.cache_ttl);
        cache.enabled = config.cache_enabled;
        if !cache.enabled {
            info!("fragment cache disabled by configuration");
        }
        cache
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn storage_key(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    /// Returns the value, or `None` when absent, expired (`now >= expiry`),
    /// unreadable or not a `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if !self.enabled {
            return None;
        }
        let storage_key = self.storage_key(key);
        let raw = match self.storage.get_item(&storage_key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key, error = %e, "cache read failed");
                return None;
            }
        };

        let entry = match serde_json::from_str::<CacheEntry<serde_json::Value>>(&raw) {
            Ok(entry) if self.clock.now_millis() < entry.expiry => entry,
            Ok(_) => {
                debug!(key, "cache entry expired");
                self.delete(&storage_key);
                return None;
            }
            Err(e) => {
                warn!(key, error = %e, "corrupt cache entry evicted");
                self.delete(&storage_key);
                return None;
            }
        };

        // The entry stays for readers expecting its actual shape.
        match serde_json::from_value(entry.data) {
            Ok(data) => Some(data),
            Err(e) => {
                debug!(key, error = %e, "cache entry has a different shape");
                None
            }
        }
    }

    /// Stores `value` for the default TTL. See [`Self::set_with_ttl`].
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> bool {
        self.set_with_ttl(key, value, self.default_ttl)
    }

    /// Stores `value` until `ttl` elapses. Returns whether the write landed;
    /// failures are logged, never raised.
    #[instrument(skip(self, value, ttl), target = "cache")]
    pub fn set_with_ttl<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        if !self.enabled {
            return false;
        }
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let entry = CacheEntry {
            data: value,
            expiry: self.clock.now_millis().saturating_add(ttl_ms),
        };
        let payload = match serde_json::to_string(&entry) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "cache value not serializable");
                return false;
            }
        };

        let storage_key = self.storage_key(key);
        match self.storage.set_item(&storage_key, &payload) {
            Ok(()) => true,
            Err(CheckoutError::QuotaExceeded) => {
                let evicted = self.evict_oldest();
                warn!(evicted, "storage full, retrying cache write once");
                match self.storage.set_item(&storage_key, &payload) {
                    Ok(()) => true,
                    Err(e) => {
                        warn!(error = %e, "cache write failed after clearing space");
                        false
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "cache write failed");
                false
            }
        }
    }

    pub fn remove(&self, key: &str) {
        if self.enabled {
            self.delete(&self.storage_key(key));
        }
    }

    /// Removes every entry under the prefix. Returns how many were removed.
    pub fn clear_all(&self) -> usize {
        if !self.enabled {
            return 0;
        }
        let keys = self.prefixed_keys();
        for key in &keys {
            self.delete(key);
        }
        info!(count = keys.len(), "fragment cache cleared");
        keys.len()
    }

    /// Evicts expired and unreadable entries. Returns how many were removed.
    #[instrument(skip(self), target = "cache")]
    pub fn clear_expired(&self) -> usize {
        if !self.enabled {
            return 0;
        }
        let now = self.clock.now_millis();
        let mut removed = 0;
        for key in self.prefixed_keys() {
            match self.expiry_of(&key) {
                Some(expiry) if now < expiry => {}
                _ => {
                    self.delete(&key);
                    removed += 1;
                }
            }
        }
        debug!(removed, "expired cache entries swept");
        removed
    }

    /// Drops the oldest-expiring fifth of the entries (at least one when any
    /// exist). Unreadable entries are dropped too but do not count.
    pub fn evict_oldest(&self) -> usize {
        let mut entries: Vec<(String, i64)> = Vec::new();
        for key in self.prefixed_keys() {
            match self.expiry_of(&key) {
                Some(expiry) => entries.push((key, expiry)),
                None => self.delete(&key),
            }
        }
        if entries.is_empty() {
            return 0;
        }

        entries.sort_by_key(|(_, expiry)| *expiry);
        let count = ((entries.len() as f64 * EVICTION_FRACTION).floor() as usize).max(1);
        for (key, _) in entries.iter().take(count) {
            self.delete(key);
        }
        count
    }

    /// Unprefixed keys currently stored, expired or not.
    pub fn keys(&self) -> Vec<String> {
        self.prefixed_keys()
            .into_iter()
            .filter_map(|key| key.strip_prefix(&self.prefix).map(str::to_string))
            .collect()
    }

    fn prefixed_keys(&self) -> Vec<String> {
        match self.storage.keys() {
            Ok(keys) => keys
                .into_iter()
                .filter(|key| key.starts_with(&self.prefix))
                .collect(),
            Err(e) => {
                warn!(error = %e, "listing storage keys failed");
                Vec::new()
            }
        }
    }

    fn expiry_of(&self, storage_key: &str) -> Option<i64> {
        let raw = self.storage.get_item(storage_key).ok()??;
        serde_json::from_str::<ExpiryOnly>(&raw)
            .ok()
            .map(|entry| entry.expiry)
    }

    fn delete(&self, storage_key: &str) {
        if let Err(e) = self.storage.remove_item(storage_key) {
            warn!(key = storage_key, error = %e, "cache eviction failed");
        }
    }
}
