use std::any::Any;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tracing::debug;

use crate::constants::cache::DEFAULT_CACHE_TTL;
use crate::errors::AtlasError;
use crate::hash::stable_hash_tagged;
use crate::types::CacheKey;

/// Derive a cache key from a type tag and the arguments that built the value.
pub fn memo_key<A: Hash + ?Sized>(type_tag: &str, args: &A) -> CacheKey {
    stable_hash_tagged(type_tag, args)
}

/// Keyed memoization store with an on/off switch.
///
/// Values are type-erased; a lookup with the wrong type behaves like a miss.
/// The store itself (`get`/`put`/`delete`/`flush`) works regardless of the
/// switch; only `fetch_or_try_insert_with` honors it.
pub struct MemoCache {
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    enabled: AtomicBool,
    default_ttl: Option<Duration>,
}

/// Internal cache entry plus optional expiry instant.
struct CacheEntry {
    value: Arc<dyn Any + Send + Sync>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|deadline| now >= deadline)
    }
}

impl Default for MemoCache {
    fn default() -> Self {
        Self::new(true, Some(DEFAULT_CACHE_TTL))
    }
}

impl MemoCache {
    /// Create a cache; `default_ttl` applies to callers that ask for it.
    pub fn new(enabled: bool, default_ttl: Option<Duration>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            enabled: AtomicBool::new(enabled),
            default_ttl,
        }
    }

    /// Whether memoization is currently active.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Resume memoization.
    pub fn enable(&self) {
        self.enabled.store(true, Ordering::Relaxed);
    }

    /// Stop memoizing; stored entries stay in place.
    pub fn disable(&self) {
        self.enabled.store(false, Ordering::Relaxed);
    }

    /// Lifetime configured for memoized record sets.
    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    /// Fetch a live entry of type `T`. Expired entries are evicted.
    pub fn get<T: Any + Send + Sync>(&self, key: CacheKey) -> Option<Arc<T>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(&key) {
                None => return None,
                Some(entry) if !entry.is_expired(now) => {
                    return Arc::clone(&entry.value).downcast::<T>().ok();
                }
                Some(_) => {}
            }
        }
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key);
        None
    }

    /// Store `value` under `key`; `ttl = None` never expires.
    pub fn put<T: Any + Send + Sync>(&self, key: CacheKey, value: Arc<T>, ttl: Option<Duration>) {
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, CacheEntry { value, expires_at });
    }

    /// Remove `key`; returns whether an entry was present.
    pub fn delete(&self, key: CacheKey) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&key)
            .is_some()
    }

    /// Remove every entry.
    pub fn flush(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// True if a live entry exists under `key`, whatever its type.
    pub fn contains(&self, key: CacheKey) -> bool {
        let now = Instant::now();
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .is_some_and(|entry| !entry.is_expired(now))
    }

    /// Number of stored entries, expired ones included until next touched.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return the memoized value for `key`, computing and storing it on a miss.
    ///
    /// While disabled, `init` runs on every call and nothing is stored. A
    /// failing `init` caches nothing.
    pub fn fetch_or_try_insert_with<T, F>(
        &self,
        key: CacheKey,
        ttl: Option<Duration>,
        init: F,
    ) -> Result<Arc<T>, AtlasError>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Result<T, AtlasError>,
    {
        let enabled = self.is_enabled();
        if enabled {
            if let Some(hit) = self.get::<T>(key) {
                debug!("[geoatlas:cache] hit for key {:016x}", key);
                return Ok(hit);
            }
            debug!("[geoatlas:cache] miss for key {:016x}", key);
        }
        let value = Arc::new(init()?);
        if enabled {
            self.put(key, Arc::clone(&value), ttl);
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn memo_keys_depend_on_tag_and_args() {
        assert_eq!(memo_key("EntityMap", "Country"), memo_key("EntityMap", "Country"));
        assert_ne!(memo_key("EntityMap", "Country"), memo_key("EntityMap", "Region"));
        assert_ne!(memo_key("EntityMap", "Country"), memo_key("RecordSet", "Country"));
    }

    #[test]
    fn fetch_computes_once_while_enabled() {
        let cache = MemoCache::default();
        let calls = Cell::new(0);
        let init = || {
            calls.set(calls.get() + 1);
            Ok::<_, AtlasError>(String::from("value"))
        };
        let first = cache.fetch_or_try_insert_with(1, None, init).unwrap();
        let second = cache
            .fetch_or_try_insert_with(1, None, || {
                calls.set(calls.get() + 1);
                Ok::<_, AtlasError>(String::from("other"))
            })
            .unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn disabled_cache_recomputes_and_stores_nothing() {
        let cache = MemoCache::new(false, None);
        let first = cache
            .fetch_or_try_insert_with(7, None, || Ok::<_, AtlasError>(42_u32))
            .unwrap();
        let second = cache
            .fetch_or_try_insert_with(7, None, || Ok::<_, AtlasError>(42_u32))
            .unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(cache.is_empty());

        cache.enable();
        assert!(cache.is_enabled());
        cache
            .fetch_or_try_insert_with(7, None, || Ok::<_, AtlasError>(42_u32))
            .unwrap();
        assert!(cache.contains(7));
    }

    #[test]
    fn failed_init_caches_nothing() {
        let cache = MemoCache::default();
        let result = cache.fetch_or_try_insert_with::<u32, _>(3, None, || {
            Err(AtlasError::UnknownOperator("nope".into()))
        });
        assert!(result.is_err());
        assert!(!cache.contains(3));
    }

    #[test]
    fn expired_entries_behave_as_misses() {
        let cache = MemoCache::default();
        cache.put(9, Arc::new(1_u8), Some(Duration::ZERO));
        assert!(!cache.contains(9));
        assert!(cache.get::<u8>(9).is_none());
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn wrong_type_is_a_miss_and_delete_flush_work() {
        let cache = MemoCache::default();
        cache.put(5, Arc::new(String::from("x")), None);
        assert!(cache.get::<u32>(5).is_none());
        assert_eq!(cache.get::<String>(5).as_deref().map(String::as_str), Some("x"));
        assert!(cache.delete(5));
        assert!(!cache.delete(5));

        cache.put(6, Arc::new(1_u8), None);
        cache.put(8, Arc::new(2_u8), None);
        cache.flush();
        assert!(cache.is_empty());
    }
}
