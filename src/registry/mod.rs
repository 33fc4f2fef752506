//! Shared resource registry
//!
//! Tracks loaded external resources, single-flights in-progress loads so a
//! resource is never loaded twice, and holds the TTL'd cached-value store
//! used by the fallback chain. Constructed once by the composition root and
//! shared via `Arc`; no module-level globals.

pub mod init_guard;
pub use init_guard::InitializationGuard;

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use log::{debug, warn};
use serde_json::Value;

use crate::error::Result;

type LoadFuture = Shared<BoxFuture<'static, bool>>;

/// A cached value with its expiry metadata
struct CacheEntry {
    value: Value,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }
}

struct RegistryInner {
    loaded: Mutex<HashSet<String>>,
    loading: Mutex<HashMap<String, LoadFuture>>,
    cache: Mutex<HashMap<String, CacheEntry>>,
}

/// Registry of loaded resources, in-flight loads and cached values
pub struct ResourceRegistry {
    inner: Arc<RegistryInner>,
    default_ttl: Duration,
}

impl ResourceRegistry {
    /// Create a registry whose cache entries default to the given TTL
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                loaded: Mutex::new(HashSet::new()),
                loading: Mutex::new(HashMap::new()),
                cache: Mutex::new(HashMap::new()),
            }),
            default_ttl,
        }
    }

    /// Whether a resource has completed loading
    pub fn is_loaded(&self, id: &str) -> bool {
        self.inner.loaded.lock().unwrap().contains(id)
    }

    /// Mark a resource as loaded. Monotonic: nothing un-loads a resource
    /// except the test-only `reset`.
    pub fn mark_loaded(&self, id: &str) {
        self.inner.loaded.lock().unwrap().insert(id.to_string());
    }

    /// Whether a load for this resource is currently in flight
    pub fn is_loading(&self, id: &str) -> bool {
        self.inner.loading.lock().unwrap().contains_key(id)
    }

    /// Load a side-effecting resource at most once.
    ///
    /// Already loaded: resolves `true` immediately without invoking the
    /// loader. Currently loading: every caller awaits the same in-flight
    /// future. Otherwise the loader runs; success marks the resource loaded,
    /// failure clears the in-flight slot so a later call may retry.
    pub async fn load_once<F, Fut>(&self, id: &str, loader: F) -> bool
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        if self.is_loaded(id) {
            return true;
        }

        let fut = {
            let mut loading = self.inner.loading.lock().unwrap();
            if let Some(existing) = loading.get(id) {
                existing.clone()
            } else {
                let inner = Arc::clone(&self.inner);
                let id_owned = id.to_string();
                let load = loader();
                let fut = async move {
                    // A racing mark_loaded may have beaten our registration
                    if inner.loaded.lock().unwrap().contains(&id_owned) {
                        inner.loading.lock().unwrap().remove(&id_owned);
                        return true;
                    }

                    let ok = match load.await {
                        Ok(()) => true,
                        Err(e) => {
                            warn!("resource '{}' failed to load: {}", id_owned, e);
                            false
                        }
                    };

                    if ok {
                        inner.loaded.lock().unwrap().insert(id_owned.clone());
                        debug!("resource '{}' loaded", id_owned);
                    }
                    inner.loading.lock().unwrap().remove(&id_owned);
                    ok
                }
                .boxed()
                .shared();

                loading.insert(id.to_string(), fut.clone());
                fut
            }
        };

        fut.await
    }

    /// Look up a cached value. Expired entries are treated as absent and
    /// evicted here.
    pub fn cached(&self, id: &str) -> Option<Value> {
        let mut cache = self.inner.cache.lock().unwrap();
        match cache.get(id) {
            Some(entry) if !entry.is_expired() => Some(entry.value.clone()),
            Some(_) => {
                cache.remove(id);
                None
            }
            None => None,
        }
    }

    /// Cache a value under the default TTL
    pub fn set_cached(&self, id: &str, value: Value) {
        self.set_cached_with_ttl(id, value, self.default_ttl);
    }

    /// Cache a value with an explicit TTL
    pub fn set_cached_with_ttl(&self, id: &str, value: Value, ttl: Duration) {
        let mut cache = self.inner.cache.lock().unwrap();
        cache.insert(
            id.to_string(),
            CacheEntry {
                value,
                created_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Number of live cache entries (expired entries may still be counted
    /// until their next lookup)
    pub fn cache_len(&self) -> usize {
        self.inner.cache.lock().unwrap().len()
    }

    /// Clear all state. Test isolation only.
    #[cfg(any(test, feature = "test-util"))]
    pub fn reset(&self) {
        self.inner.loaded.lock().unwrap().clear();
        self.inner.loading.lock().unwrap().clear();
        self.inner.cache.lock().unwrap().clear();
    }
}

impl Default for ResourceRegistry {
    fn default() -> Self {
        Self::new(Duration::from_secs(300))
    }
}
