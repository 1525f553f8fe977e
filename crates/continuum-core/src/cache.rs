//! Tenant-namespaced cache (spec §4.5).
//!
//! The only implementation shipped today is the in-memory LRU fallback; the
//! [`Cache`] trait is the seam a networked provider (keyed off
//! `Config::cache_host`/`cache_port`) would implement without touching
//! callers. Every lookup failure degrades to a cache miss rather than
//! propagating — a cold cache must never make `recall` fail.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use lru::LruCache;

/// A tenant-scoped, TTL-aware cache. Implementations must treat any internal
/// failure as a miss (see `error::ContinuumError::CacheUnavailable`) rather
/// than bubbling an error up to the caller.
pub trait Cache: Send + Sync {
    fn get(&self, tenant_id: &str, key: &str) -> Option<String>;
    fn put(&self, tenant_id: &str, key: &str, value: String, ttl: Duration);
    fn invalidate(&self, tenant_id: &str, key: &str);
    /// Drop every entry for `tenant_id`. Used after a `learn` call, since a
    /// new edge can change what `recall` would return for cached queries.
    fn invalidate_tenant(&self, tenant_id: &str);
}

/// Builds the `(tenant, key)` namespacing every [`Cache`] implementation
/// should use, so two tenants never share an entry.
fn namespaced(tenant_id: &str, key: &str) -> String {
    format!("{tenant_id}\u{0}{key}")
}

struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process LRU cache. Used directly when `Config::cache_enabled` is
/// false or no networked provider is configured, and as the always-on
/// fallback when one is.
pub struct InMemoryCache {
    entries: Mutex<LruCache<String, Entry>>,
}

impl InMemoryCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(1).unwrap());
        Self { entries: Mutex::new(LruCache::new(capacity)) }
    }
}

impl Cache for InMemoryCache {
    fn get(&self, tenant_id: &str, key: &str) -> Option<String> {
        let mut entries = self.entries.lock().ok()?;
        let namespaced_key = namespaced(tenant_id, key);
        match entries.get(&namespaced_key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.pop(&namespaced_key);
                None
            }
            None => None,
        }
    }

    fn put(&self, tenant_id: &str, key: &str, value: String, ttl: Duration) {
        let Ok(mut entries) = self.entries.lock() else { return };
        entries.put(namespaced(tenant_id, key), Entry { value, expires_at: Instant::now() + ttl });
    }

    fn invalidate(&self, tenant_id: &str, key: &str) {
        let Ok(mut entries) = self.entries.lock() else { return };
        entries.pop(&namespaced(tenant_id, key));
    }

    fn invalidate_tenant(&self, tenant_id: &str) {
        let Ok(mut entries) = self.entries.lock() else { return };
        let prefix = format!("{tenant_id}\u{0}");
        let stale: Vec<String> = entries
            .iter()
            .filter(|(k, _)| k.starts_with(&prefix))
            .map(|(k, _)| k.clone())
            .collect();
        for key in stale {
            entries.pop(&key);
        }
    }
}

/// No-op cache used when `Config::cache_enabled` is false.
pub struct NullCache;

impl Cache for NullCache {
    fn get(&self, _tenant_id: &str, _key: &str) -> Option<String> {
        None
    }
    fn put(&self, _tenant_id: &str, _key: &str, _value: String, _ttl: Duration) {}
    fn invalidate(&self, _tenant_id: &str, _key: &str) {}
    fn invalidate_tenant(&self, _tenant_id: &str) {}
}

/// Builds the cache implementation selected by `Config::cache_enabled`.
pub fn build(config: &crate::config::Config) -> Box<dyn Cache> {
    if config.cache_enabled {
        Box::new(InMemoryCache::new(config.cache_capacity))
    } else {
        Box::new(NullCache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_are_tenant_isolated() {
        let cache = InMemoryCache::new(10);
        cache.put("tenant-a", "q", "hits-a".to_string(), Duration::from_secs(60));
        assert_eq!(cache.get("tenant-a", "q"), Some("hits-a".to_string()));
        assert_eq!(cache.get("tenant-b", "q"), None);
    }

    #[test]
    fn expired_entries_are_treated_as_misses() {
        let cache = InMemoryCache::new(10);
        cache.put("tenant-a", "q", "stale".to_string(), Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(cache.get("tenant-a", "q"), None);
    }

    #[test]
    fn invalidate_tenant_only_clears_that_tenant() {
        let cache = InMemoryCache::new(10);
        cache.put("tenant-a", "q1", "v1".to_string(), Duration::from_secs(60));
        cache.put("tenant-b", "q1", "v2".to_string(), Duration::from_secs(60));
        cache.invalidate_tenant("tenant-a");
        assert_eq!(cache.get("tenant-a", "q1"), None);
        assert_eq!(cache.get("tenant-b", "q1"), Some("v2".to_string()));
    }

    #[test]
    fn null_cache_never_stores_anything() {
        let cache = NullCache;
        cache.put("tenant-a", "q", "v".to_string(), Duration::from_secs(60));
        assert_eq!(cache.get("tenant-a", "q"), None);
    }
}
