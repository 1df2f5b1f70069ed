//! In-memory TTL cache fronting upstream reads.
//!
//! Expiry is lazy: every read checks the entry's deadline and evicts stale
//! data on the spot, so nothing past its TTL is ever returned even if the
//! periodic cleanup is delayed or disabled. Values are stored as JSON, the
//! same shape they would take in a shared cache.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::limiter::now_ms;

pub mod keys;

/// TTL tiers. Pick the tier matching how fast the data goes stale:
/// aurora/weather reads SHORT, listings MEDIUM, sponsor records LONG.
pub mod ttl {
    use std::time::Duration;

    pub const SHORT: Duration = Duration::from_secs(60);
    pub const MEDIUM: Duration = Duration::from_secs(5 * 60);
    pub const LONG: Duration = Duration::from_secs(30 * 60);
    pub const VERY_LONG: Duration = Duration::from_secs(60 * 60);
    pub const DAY: Duration = Duration::from_secs(24 * 60 * 60);
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: serde_json::Value,
    pub stored_at_ms: u64,
    pub expires_at_ms: u64,
}

/// Process-local key/value cache with per-entry expiry. Construct one per
/// process (or per test) and share it behind an `Arc`; a multi-instance
/// deployment caches independently on each instance.
pub struct TtlCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    default_ttl: Duration,
}

impl TtlCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            default_ttl,
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    /// Returns the cached value, or `None` on a miss. A hit past its
    /// deadline deletes the entry and reports a miss; so does a value that
    /// no longer deserializes as `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let now = now_ms();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        let entry = entries.get(key)?;
        if entry.expires_at_ms <= now {
            entries.remove(key);
            return None;
        }
        match serde_json::from_value(entry.data.clone()) {
            Ok(value) => Some(value),
            Err(err) => {
                debug!("cached value under {} no longer deserializes: {}", key, err);
                entries.remove(key);
                None
            }
        }
    }

    /// Inserts or overwrites unconditionally. A value that fails to
    /// serialize is skipped with a warning rather than erroring: the next
    /// read simply misses.
    pub fn set<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let data = match serde_json::to_value(value) {
            Ok(data) => data,
            Err(err) => {
                warn!("refusing to cache unserializable value under {}: {}", key, err);
                return;
            }
        };
        let now = now_ms();
        let entry = CacheEntry {
            data,
            stored_at_ms: now,
            expires_at_ms: now + ttl.as_millis() as u64,
        };
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), entry);
    }

    pub fn set_default<T: Serialize>(&self, key: &str, value: &T) {
        self.set(key, value, self.default_ttl);
    }

    /// Expiry-aware presence check with the same eviction behavior as `get`.
    pub fn has(&self, key: &str) -> bool {
        let now = now_ms();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        match entries.get(key) {
            Some(entry) if entry.expires_at_ms > now => true,
            Some(_) => {
                entries.remove(key);
                false
            }
            None => false,
        }
    }

    pub fn remove(&self, key: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key)
            .is_some()
    }

    /// Drops every entry whose key starts with `prefix`. Write handlers use
    /// this to invalidate the query-shaped keys their writes affect.
    pub fn remove_prefix(&self, prefix: &str) -> usize {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(prefix));
        before - entries.len()
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cache-or-fetch: a hit returns immediately; a miss awaits `fetch`,
    /// stores the result, and returns it. Fetch errors propagate uncached.
    ///
    /// Concurrent misses for the same key are not deduplicated, so two
    /// in-flight requests may both hit the upstream. Accepted for the
    /// idempotent, read-mostly workloads this fronts.
    pub async fn get_or_fetch<T, E, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get::<T>(key) {
            return Ok(cached);
        }
        let value = fetch().await?;
        self.set(key, &value, ttl);
        Ok(value)
    }

    /// Full sweep of expired entries, returning how many were removed.
    /// Purely a memory bound; reads stay correct without it.
    pub fn cleanup(&self) -> usize {
        let now = now_ms();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at_ms > now);
        before - entries.len()
    }
}

/// Aborts the periodic cleanup task when dropped.
pub struct CleanupHandle(tokio::task::JoinHandle<()>);

impl Drop for CleanupHandle {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub fn spawn_cleanup(cache: Arc<TtlCache>, interval: Duration) -> CleanupHandle {
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = cache.cleanup();
            if removed > 0 {
                debug!("cache cleanup removed {} expired entries", removed);
            }
        }
    });
    CleanupHandle(handle)
}
