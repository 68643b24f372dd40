//! Short-lived cache of GET response bodies.
//!
//! Every [`ResponseCache::clear`] starts a new epoch. A response fetched
//! before a clear is not stored after it, so bodies fetched under a previous
//! credential never reappear.

use serde_json::Value;
use std::{
    collections::HashMap,
    sync::Mutex,
    time::{Duration, Instant},
};

/// Per-request caching policy for GET calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    /// How long a stored body stays fresh.
    pub ttl: Duration,
    /// Skip any stored body and refetch; the fresh body replaces the entry.
    pub force_refresh: bool,
}

impl CacheOptions {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            force_refresh: false,
        }
    }

    #[must_use]
    pub fn force_refresh(mut self, force_refresh: bool) -> Self {
        self.force_refresh = force_refresh;
        self
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    body: Value,
    stored_at: Instant,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    epoch: u64,
}

/// Decoded GET bodies keyed by URL.
#[derive(Debug, Default)]
pub struct ResponseCache {
    state: Mutex<CacheState>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh body for `key`, if one was stored less than `ttl` ago.
    pub fn get(&self, key: &str, ttl: Duration) -> Option<Value> {
        self.get_at(key, ttl, Instant::now())
    }

    fn get_at(&self, key: &str, ttl: Duration, now: Instant) -> Option<Value> {
        let mut state = self.state.lock().ok()?;
        let entry = state.entries.get(key)?;
        if now.saturating_duration_since(entry.stored_at) < ttl {
            return Some(entry.body.clone());
        }
        state.entries.remove(key);
        None
    }

    /// Current epoch; record it before issuing a request whose body may be cached.
    pub fn epoch(&self) -> u64 {
        self.state.lock().map(|state| state.epoch).unwrap_or(0)
    }

    pub fn insert(&self, key: impl Into<String>, body: Value) {
        self.insert_at(key.into(), body, Instant::now());
    }

    /// Store `body` only if no [`ResponseCache::clear`] happened since `epoch`.
    /// Returns whether the body was stored.
    pub fn insert_if_epoch(&self, epoch: u64, key: impl Into<String>, body: Value) -> bool {
        let Ok(mut state) = self.state.lock() else {
            return false;
        };
        if state.epoch != epoch {
            return false;
        }
        state.entries.insert(
            key.into(),
            CacheEntry {
                body,
                stored_at: Instant::now(),
            },
        );
        true
    }

    fn insert_at(&self, key: String, body: Value, stored_at: Instant) {
        if let Ok(mut state) = self.state.lock() {
            state.entries.insert(key, CacheEntry { body, stored_at });
        }
    }

    /// Drop every entry and start a new epoch.
    pub fn clear(&self) {
        if let Ok(mut state) = self.state.lock() {
            state.entries.clear();
            state.epoch += 1;
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().map(|state| state.entries.len()).unwrap_or(0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TTL: Duration = Duration::from_secs(30);

    #[test]
    fn fresh_entry_is_served() {
        let cache = ResponseCache::new();
        cache.insert("http://api/auth/profile", json!({ "user": { "id": 1 } }));

        assert_eq!(
            cache.get("http://api/auth/profile", TTL),
            Some(json!({ "user": { "id": 1 } }))
        );
        assert_eq!(cache.get("http://api/other", TTL), None);
    }

    #[test]
    fn expired_entry_is_evicted() {
        let cache = ResponseCache::new();
        let stored_at = Instant::now();
        cache.insert_at("key".to_string(), json!(1), stored_at);

        assert_eq!(
            cache.get_at("key", TTL, stored_at + Duration::from_secs(29)),
            Some(json!(1))
        );
        assert_eq!(cache.get_at("key", TTL, stored_at + TTL), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn zero_ttl_never_hits() {
        let cache = ResponseCache::new();
        cache.insert("key", json!(1));
        assert_eq!(cache.get("key", Duration::ZERO), None);
    }

    #[test]
    fn clear_drops_everything() {
        let cache = ResponseCache::new();
        cache.insert("a", json!(1));
        cache.insert("b", json!(2));
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn insert_after_clear_is_refused() {
        let cache = ResponseCache::new();
        let before = cache.epoch();
        cache.clear();

        assert!(!cache.insert_if_epoch(before, "key", json!("previous user")));
        assert_eq!(cache.get("key", TTL), None);

        assert!(cache.insert_if_epoch(cache.epoch(), "key", json!("current user")));
        assert_eq!(cache.get("key", TTL), Some(json!("current user")));
    }

    #[test]
    fn options_builder() {
        let options = CacheOptions::new(TTL).force_refresh(true);
        assert_eq!(options.ttl, TTL);
        assert!(options.force_refresh);
    }
}
