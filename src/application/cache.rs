// Cache-aside access over an optional key-value store
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const ALL_STATIONS_KEY: &str = "stations:all";
pub const LATEST_AIR_QUALITY_KEY: &str = "air_quality:latest";
pub const DASHBOARD_OVERVIEW_KEY: &str = "dashboard:overview";
pub const MAP_STATIONS_KEY: &str = "map:stations";

pub const ALL_STATIONS_TTL: Duration = Duration::from_secs(5 * 60);
pub const STATION_TTL: Duration = Duration::from_secs(5 * 60);
pub const LATEST_AIR_QUALITY_TTL: Duration = Duration::from_secs(2 * 60);
pub const DASHBOARD_OVERVIEW_TTL: Duration = Duration::from_secs(3 * 60);
pub const MAP_STATIONS_TTL: Duration = Duration::from_secs(60);

pub fn station_key(id: i64) -> String {
    format!("station:{id}")
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {message}")]
    Backend { message: String },
}

impl CacheError {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), CacheError>;

    /// Removing a key that does not exist succeeds
    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Read-through / write-invalidate wrapper shared by the services.
///
/// Every cache operation is best-effort: failures are logged and the caller
/// falls back to the loader. With no store configured the accessor simply
/// runs the loader each time.
#[derive(Clone, Default)]
pub struct CacheAside {
    store: Option<Arc<dyn CacheStore>>,
}

impl CacheAside {
    pub fn new(store: Option<Arc<dyn CacheStore>>) -> Self {
        Self { store }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.store.is_some()
    }

    /// Return the cached value for `key`, or run `loader` and cache its result for `ttl`.
    ///
    /// Loader errors are returned as is and nothing is written.
    pub async fn fetch<T, E, F, Fut>(&self, key: &str, ttl: Duration, loader: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Some(store) = self.store.as_deref() else {
            return loader().await;
        };

        if let Some(hit) = lookup(store, key).await {
            return Ok(hit);
        }

        let value = loader().await?;
        populate(store, key, &value, ttl).await;
        Ok(value)
    }

    /// Run `write`, then evict `keys` whatever its outcome. The write's result
    /// is returned unchanged.
    pub async fn invalidating<T, E, Fut>(&self, keys: &[String], write: Fut) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        let result = write.await;
        self.invalidate(keys).await;
        result
    }

    pub async fn invalidate(&self, keys: &[String]) {
        let Some(store) = self.store.as_deref() else {
            return;
        };
        for key in keys {
            if let Err(e) = store.delete(key).await {
                tracing::warn!(key = %key, error = %e, "cache invalidation failed");
            }
        }
    }
}

async fn lookup<T: DeserializeOwned>(store: &dyn CacheStore, key: &str) -> Option<T> {
    match store.get(key).await {
        Ok(Some(bytes)) => match serde_json::from_slice(&bytes) {
            Ok(value) => {
                tracing::debug!(key, "cache hit");
                Some(value)
            }
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding undecodable cache entry");
                None
            }
        },
        Ok(None) => {
            tracing::debug!(key, "cache miss");
            None
        }
        Err(e) => {
            tracing::warn!(key, error = %e, "cache read failed, loading from store");
            None
        }
    }
}

async fn populate<T: Serialize>(store: &dyn CacheStore, key: &str, value: &T, ttl: Duration) {
    let payload = match serde_json::to_vec(value) {
        Ok(payload) => payload,
        Err(e) => {
            tracing::warn!(key, error = %e, "could not encode value for cache");
            return;
        }
    };
    if let Err(e) = store.set(key, payload, ttl).await {
        tracing::warn!(key, error = %e, "cache write failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::testing::RecordingCache;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn counted(calls: &AtomicUsize, value: Vec<String>) -> Result<Vec<String>, String> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(value)
    }

    #[tokio::test]
    async fn test_second_fetch_is_a_hit() {
        let cache = Arc::new(RecordingCache::default());
        let accessor = CacheAside::new(Some(cache.clone()));
        let calls = AtomicUsize::new(0);

        let first = accessor
            .fetch("k", ALL_STATIONS_TTL, || counted(&calls, vec!["a".into()]))
            .await
            .unwrap();
        let second = accessor
            .fetch("k", ALL_STATIONS_TTL, || counted(&calls, vec!["b".into()]))
            .await
            .unwrap();

        assert_eq!(first, vec!["a".to_string()]);
        assert_eq!(second, first);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.last_ttl("k"), Some(ALL_STATIONS_TTL));
    }

    #[tokio::test]
    async fn test_without_cache_always_loads() {
        let accessor = CacheAside::disabled();
        let calls = AtomicUsize::new(0);

        for i in 0..3 {
            let value = accessor
                .fetch("k", MAP_STATIONS_TTL, || counted(&calls, vec![i.to_string()]))
                .await
                .unwrap();
            assert_eq!(value, vec![i.to_string()]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(!accessor.is_enabled());
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_a_miss() {
        let cache = Arc::new(RecordingCache::default());
        cache.insert_raw("k", b"{not json".to_vec());
        let accessor = CacheAside::new(Some(cache.clone()));
        let calls = AtomicUsize::new(0);

        let value = accessor
            .fetch("k", MAP_STATIONS_TTL, || counted(&calls, vec!["fresh".into()]))
            .await
            .unwrap();

        assert_eq!(value, vec!["fresh".to_string()]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.raw("k"), Some(br#"["fresh"]"#.to_vec()));
    }

    #[tokio::test]
    async fn test_cache_failures_do_not_fail_reads() {
        let cache = Arc::new(RecordingCache::failing());
        let accessor = CacheAside::new(Some(cache));
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let value = accessor
                .fetch("k", MAP_STATIONS_TTL, || counted(&calls, vec!["x".into()]))
                .await
                .unwrap();
            assert_eq!(value, vec!["x".to_string()]);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_loader_error_is_not_cached() {
        let cache = Arc::new(RecordingCache::default());
        let accessor = CacheAside::new(Some(cache.clone()));

        let result: Result<Vec<String>, String> = accessor
            .fetch("k", MAP_STATIONS_TTL, || async { Err("db down".to_string()) })
            .await;

        assert_eq!(result.unwrap_err(), "db down");
        assert_eq!(cache.raw("k"), None);
    }

    #[tokio::test]
    async fn test_invalidating_evicts_and_keeps_write_error() {
        let cache = Arc::new(RecordingCache::default());
        cache.insert_raw(ALL_STATIONS_KEY, b"[]".to_vec());
        let accessor = CacheAside::new(Some(cache.clone()));
        let keys = vec![ALL_STATIONS_KEY.to_string(), station_key(9)];

        let result: Result<(), String> = accessor
            .invalidating(&keys, async { Err("constraint violated".to_string()) })
            .await;

        assert_eq!(result.unwrap_err(), "constraint violated");
        assert_eq!(cache.raw(ALL_STATIONS_KEY), None);
        assert_eq!(cache.deleted(), keys);
    }

    #[tokio::test]
    async fn test_invalidate_without_cache_is_noop() {
        let accessor = CacheAside::disabled();
        let result: Result<u8, String> = accessor
            .invalidating(&[DASHBOARD_OVERVIEW_KEY.to_string()], async { Ok(4) })
            .await;
        assert_eq!(result, Ok(4));
    }
}
