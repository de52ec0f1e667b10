use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

use crate::config::RuntimeAuthConfig;
use crate::error::AuthResult;
use crate::key_resolver::{key_store_url, KeyResolver};

#[derive(Clone)]
struct CachedKey {
    spki: String,
    fetched_at: Instant,
}

/// Short-lived store for fetched public keys, keyed by endpoint and kid.
#[derive(Clone, Default)]
pub struct KeyCache {
    inner: Arc<RwLock<HashMap<(String, String), CachedKey>>>,
}

impl KeyCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn get_fresh(&self, url: &str, kid: &str, ttl: Duration) -> Option<String> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .get(&(url.to_string(), kid.to_string()))
            .filter(|entry| entry.fetched_at.elapsed() < ttl)
            .map(|entry| entry.spki.clone())
    }

    fn insert(&self, url: &str, kid: &str, spki: String) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.insert(
            (url.to_string(), kid.to_string()),
            CachedKey {
                spki,
                fetched_at: Instant::now(),
            },
        );
    }

    fn evict(&self, url: &str, kid: &str) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.remove(&(url.to_string(), kid.to_string()));
    }

    pub fn contains(&self, url: &str, kid: &str) -> bool {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard.contains_key(&(url.to_string(), kid.to_string()))
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Serves keys from a [`KeyCache`] for `ttl`, falling back to `inner`.
///
/// A failed fetch evicts whatever was cached for that kid.
pub struct CachingKeyResolver<R> {
    inner: R,
    cache: KeyCache,
    ttl: Duration,
}

impl<R: KeyResolver> CachingKeyResolver<R> {
    pub fn new(inner: R, ttl: Duration) -> Self {
        Self {
            inner,
            cache: KeyCache::new(),
            ttl,
        }
    }

    pub fn cache(&self) -> &KeyCache {
        &self.cache
    }
}

#[async_trait]
impl<R: KeyResolver> KeyResolver for CachingKeyResolver<R> {
    async fn fetch_public_key(&self, kid: &str, config: &RuntimeAuthConfig) -> AuthResult<String> {
        let url = key_store_url(config).to_string();
        if let Some(spki) = self.cache.get_fresh(&url, kid, self.ttl) {
            debug!(kid, "public key served from cache");
            return Ok(spki);
        }

        match self.inner.fetch_public_key(kid, config).await {
            Ok(spki) => {
                self.cache.insert(&url, kid, spki.clone());
                Ok(spki)
            }
            Err(err) => {
                self.cache.evict(&url, kid);
                Err(err)
            }
        }
    }
}
