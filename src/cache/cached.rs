//! Cached-Call Wrapper
//!
//! Shared response cache handle with get-or-populate helpers, invalidation
//! and preloading.

use std::collections::HashMap;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use futures_util::future::{join_all, BoxFuture, Shared};
use futures_util::FutureExt;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::cache::{CacheStats, TtlCache};
use crate::config::Config;
use crate::error::{ClientError, Result};

type Population = Shared<BoxFuture<'static, Result<Value>>>;
type InFlight = Mutex<HashMap<String, Population>>;

// == Response Cache ==
/// Process-wide response cache, created once by the composition root and
/// cloned into every caller.
///
/// Values are held as JSON so one table can serve every endpoint; typed
/// access goes through serde on the way in and out.
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<RwLock<TtlCache<Value>>>,
    in_flight: Arc<InFlight>,
}

impl ResponseCache {
    /// Creates a cache with the given capacity and default TTL.
    pub fn new(max_entries: usize, default_ttl: Duration) -> Self {
        Self {
            store: Arc::new(RwLock::new(TtlCache::new(max_entries, default_ttl))),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Creates a cache from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.cache_max_entries, config.default_ttl())
    }

    /// The underlying table, for sweep tasks and direct inspection.
    pub fn store(&self) -> Arc<RwLock<TtlCache<Value>>> {
        Arc::clone(&self.store)
    }

    // == Typed Access ==
    /// Reads `key` as `T`. A stored value that does not decode as `T` is
    /// reported as absent.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        // Write lock: expired entries are removed on read
        let value = self.store.write().await.get(key)?;
        match serde_json::from_value(value) {
            Ok(data) => Some(data),
            Err(err) => {
                debug!(key, error = %err, "cached value has a different shape");
                None
            }
        }
    }

    /// Stores `data` under `key`. Values that cannot be encoded as JSON are
    /// skipped.
    pub async fn set<T: Serialize>(&self, key: &str, data: &T, ttl: Option<Duration>) {
        match serde_json::to_value(data) {
            Ok(value) => self.store.write().await.set(key, value, ttl),
            Err(err) => warn!(key, error = %err, "value not cacheable"),
        }
    }

    pub async fn has(&self, key: &str) -> bool {
        self.store.write().await.has(key)
    }

    pub async fn delete(&self, key: &str) -> bool {
        self.store.write().await.delete(key)
    }

    pub async fn clear(&self) {
        self.store.write().await.clear();
    }

    /// Sweeps expired entries once. Returns how many were removed.
    pub async fn cleanup(&self) -> usize {
        self.store.write().await.cleanup()
    }

    pub async fn stats(&self) -> CacheStats {
        self.store.read().await.stats()
    }

    // == With Cache ==
    /// Returns the cached value for `key`, or runs `producer`, caches its
    /// result and returns it.
    ///
    /// Producer errors are returned unchanged and nothing is cached. Two
    /// callers that miss on the same key before either producer finishes
    /// will both run their producer; use
    /// [`with_cache_coalesced`](Self::with_cache_coalesced) to share one.
    pub async fn with_cache<T, E, F, Fut>(
        &self,
        producer: F,
        key: &str,
        ttl: Option<Duration>,
    ) -> std::result::Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        if let Some(hit) = self.get::<T>(key).await {
            debug!(key, "cache hit");
            return Ok(hit);
        }

        debug!(key, "cache miss");
        let data = producer().await?;
        self.set(key, &data, ttl).await;
        Ok(data)
    }

    // == With Cache Coalesced ==
    /// Like [`with_cache`](Self::with_cache), but concurrent misses on the
    /// same key share a single producer run.
    ///
    /// The first caller's producer is started and every caller that misses
    /// while it is pending awaits that same run. The in-flight slot is
    /// cleared once the run settles, after a success has been stored.
    pub async fn with_cache_coalesced<T, F, Fut>(
        &self,
        producer: F,
        key: &str,
        ttl: Option<Duration>,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        if let Some(hit) = self.get::<T>(key).await {
            debug!(key, "cache hit");
            return Ok(hit);
        }

        let population = {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            match in_flight.get(key) {
                Some(pending) => {
                    debug!(key, "joining in-flight population");
                    pending.clone()
                }
                None => {
                    let population = self.populate(key.to_string(), producer(), ttl);
                    in_flight.insert(key.to_string(), population.clone());
                    population
                }
            }
        };

        let value = population.await?;
        serde_json::from_value(value).map_err(|err| ClientError::Decode(err.to_string()))
    }

    fn populate<T, Fut>(&self, key: String, producer: Fut, ttl: Option<Duration>) -> Population
    where
        T: Serialize + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let in_flight: Weak<InFlight> = Arc::downgrade(&self.in_flight);

        async move {
            let result = producer.await.and_then(|data| {
                serde_json::to_value(&data).map_err(|err| ClientError::Decode(err.to_string()))
            });
            if let Ok(value) = &result {
                store.write().await.set(key.clone(), value.clone(), ttl);
            }
            if let Some(in_flight) = in_flight.upgrade() {
                in_flight
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .remove(&key);
            }
            result
        }
        .boxed()
        .shared()
    }

    // == Invalidation ==
    /// Clears the whole cache.
    ///
    /// `pattern` is accepted for call-site compatibility but ignored: every
    /// call empties the table. Use
    /// [`invalidate_matching`](Self::invalidate_matching) to remove only some keys.
    pub async fn invalidate_cache(&self, pattern: Option<&str>) {
        if let Some(pattern) = pattern {
            debug!(pattern, "pattern ignored, clearing whole cache");
        }
        self.clear().await;
    }

    /// Removes only the keys matching the regular expression `pattern`.
    ///
    /// Returns the number of entries removed.
    pub async fn invalidate_matching(&self, pattern: &str) -> Result<usize> {
        let regex = Regex::new(pattern)?;
        let removed = self
            .store
            .write()
            .await
            .remove_matching(|key| regex.is_match(key));
        debug!(pattern, removed, "invalidated matching keys");
        Ok(removed)
    }

    // == Preload ==
    /// Runs every request's producer concurrently and caches each success.
    ///
    /// Failures are logged and skipped. Returns how many entries were stored.
    pub async fn preload_cache(&self, requests: Vec<PreloadRequest<'_>>) -> usize {
        let results = join_all(requests.into_iter().map(|request| async move {
            let outcome = request.producer.await;
            (request.key, request.ttl, outcome)
        }))
        .await;

        let mut stored = 0;
        let mut store = self.store.write().await;
        for (key, ttl, outcome) in results {
            match outcome {
                Ok(value) => {
                    store.set(key, value, ttl);
                    stored += 1;
                }
                Err(err) => warn!(key = %key, error = %err, "failed to preload cache"),
            }
        }
        stored
    }
}

// == Preload Request ==
/// One entry of a [`ResponseCache::preload_cache`] batch.
pub struct PreloadRequest<'a> {
    key: String,
    ttl: Option<Duration>,
    producer: BoxFuture<'a, std::result::Result<Value, String>>,
}

impl<'a> PreloadRequest<'a> {
    /// Wraps a pending producer whose result will be cached under `key`.
    pub fn new<T, E, Fut>(key: impl Into<String>, producer: Fut) -> Self
    where
        T: Serialize + 'a,
        E: Display + 'a,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'a,
    {
        let producer = async move {
            let data = producer.await.map_err(|err| err.to_string())?;
            serde_json::to_value(&data).map_err(|err| err.to_string())
        };
        Self {
            key: key.into(),
            ttl: None,
            producer: producer.boxed(),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::advance;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Item {
        id: u32,
        title: String,
    }

    fn items() -> Vec<Item> {
        vec![
            Item {
                id: 1,
                title: "Ownership".to_string(),
            },
            Item {
                id: 2,
                title: "Lifetimes".to_string(),
            },
        ]
    }

    fn test_cache() -> ResponseCache {
        ResponseCache::new(100, Duration::from_secs(300))
    }

    #[tokio::test]
    async fn test_with_cache_runs_producer_once() {
        let cache = test_cache();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let result: std::result::Result<Vec<Item>, ClientError> = cache
                .with_cache(
                    || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        Ok(items())
                    },
                    "knowledge?page=1",
                    None,
                )
                .await;
            assert_eq!(result.unwrap(), items());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_cache_does_not_cache_errors() {
        let cache = test_cache();

        let first: std::result::Result<u32, ClientError> = cache
            .with_cache(
                || async { Err(ClientError::Network("offline".to_string())) },
                "flaky",
                None,
            )
            .await;
        assert!(first.is_err());

        let second: std::result::Result<u32, ClientError> =
            cache.with_cache(|| async { Ok(7) }, "flaky", None).await;
        assert_eq!(second.unwrap(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_with_cache_respects_ttl() {
        let cache = test_cache();
        let calls = AtomicUsize::new(0);
        let produce = || async {
            Ok::<_, ClientError>(calls.fetch_add(1, Ordering::SeqCst))
        };

        cache
            .with_cache(produce, "counter", Some(Duration::from_millis(100)))
            .await
            .unwrap();
        advance(Duration::from_millis(150)).await;
        let second = cache
            .with_cache(produce, "counter", Some(Duration::from_millis(100)))
            .await
            .unwrap();

        assert_eq!(second, 1);
    }

    #[tokio::test]
    async fn test_concurrent_misses_both_run_producer() {
        let cache = test_cache();
        let calls = Arc::new(AtomicUsize::new(0));

        let run = |calls: Arc<AtomicUsize>| {
            let cache = cache.clone();
            async move {
                cache
                    .with_cache(
                        || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::task::yield_now().await;
                            Ok::<_, ClientError>(1)
                        },
                        "race",
                        None,
                    )
                    .await
            }
        };

        let (a, b) = tokio::join!(run(calls.clone()), run(calls.clone()));
        assert_eq!(a.unwrap(), 1);
        assert_eq!(b.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_coalesced_misses_share_one_producer() {
        let cache = test_cache();
        let calls = Arc::new(AtomicUsize::new(0));

        let run = |calls: Arc<AtomicUsize>| {
            let cache = cache.clone();
            async move {
                cache
                    .with_cache_coalesced(
                        move || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::time::sleep(Duration::from_millis(10)).await;
                            Ok(items())
                        },
                        "knowledge",
                        None,
                    )
                    .await
            }
        };

        let results = join_all((0..5).map(|_| run(calls.clone()))).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        for result in results {
            assert_eq!(result.unwrap(), items());
        }
        assert!(cache.has("knowledge").await);
        assert!(cache.in_flight.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_coalesced_failure_clears_slot() {
        let cache = test_cache();

        let failed: Result<u32> = cache
            .with_cache_coalesced(
                || async { Err(ClientError::api(500, None)) },
                "broken",
                None,
            )
            .await;
        assert!(failed.is_err());
        assert!(!cache.has("broken").await);

        let retried: Result<u32> = cache
            .with_cache_coalesced(|| async { Ok(3) }, "broken", None)
            .await;
        assert_eq!(retried.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_get_with_wrong_shape_is_absent() {
        let cache = test_cache();
        cache.set("n", &42u32, None).await;

        assert_eq!(cache.get::<String>("n").await, None);
        assert_eq!(cache.get::<u32>("n").await, Some(42));
    }

    #[tokio::test]
    async fn test_invalidate_cache_ignores_pattern() {
        let cache = test_cache();
        cache.set("knowledge?page=1", &items(), None).await;
        cache.set("unrelated-key", &"kept?", None).await;

        cache.invalidate_cache(Some("knowledge")).await;

        assert_eq!(cache.get::<String>("unrelated-key").await, None);
        assert_eq!(cache.stats().await.size, 0);
    }

    #[tokio::test]
    async fn test_invalidate_cache_without_pattern() {
        let cache = test_cache();
        cache.set("a", &1, None).await;

        cache.invalidate_cache(None).await;

        assert!(!cache.has("a").await);
    }

    #[tokio::test]
    async fn test_invalidate_matching_is_selective() {
        let cache = test_cache();
        cache.set("/knowledge?{\"page\":1}", &1, None).await;
        cache.set("/knowledge/42", &2, None).await;
        cache.set("/users/me", &3, None).await;

        let removed = cache.invalidate_matching("^/knowledge").await.unwrap();

        assert_eq!(removed, 2);
        assert!(cache.has("/users/me").await);
    }

    #[tokio::test]
    async fn test_invalidate_matching_rejects_bad_pattern() {
        let cache = test_cache();
        let result = cache.invalidate_matching("(unclosed").await;
        assert!(matches!(result, Err(ClientError::InvalidPattern(_))));
    }

    #[tokio::test]
    async fn test_preload_caches_successes_only() {
        let cache = test_cache();

        let stored = cache
            .preload_cache(vec![
                PreloadRequest::new("tags", async { Ok::<_, ClientError>(json!(["rust"])) }),
                PreloadRequest::new("broken", async {
                    Err::<Value, _>(ClientError::Network("down".to_string()))
                }),
                PreloadRequest::new("categories", async { Ok::<_, ClientError>(vec![1, 2]) })
                    .with_ttl(Duration::from_secs(60)),
            ])
            .await;

        assert_eq!(stored, 2);
        assert_eq!(cache.get::<Vec<String>>("tags").await, Some(vec!["rust".to_string()]));
        assert_eq!(cache.get::<Vec<u32>>("categories").await, Some(vec![1, 2]));
        assert!(!cache.has("broken").await);
    }
}
