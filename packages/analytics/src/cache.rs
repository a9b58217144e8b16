//! Per-recipe memoization of finished results.
//!
//! A [`ResultCache`] maps a recipe's semantic parameters to its output for
//! the lifetime of the cache object. Each key owns a
//! [`tokio::sync::OnceCell`], so concurrent callers asking for the same key
//! share a single producer run. A producer that fails stores nothing and the
//! next caller retries.
//!
//! Entries never expire. Memory is bounded only by the number of distinct
//! parameter combinations callers use, which the configured parameter ranges
//! keep small. Widening those ranges widens the bound.

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::OnceCell;

/// Hit and miss counters for one cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Lookups answered from a stored result.
    pub hits: u64,
    /// Lookups that ran the producer.
    pub misses: u64,
    /// Stored results.
    pub entries: usize,
}

#[derive(Debug)]
struct CacheEntry<V> {
    value: Arc<V>,
    inserted_at: DateTime<Utc>,
}

type Slot<V> = Arc<OnceCell<CacheEntry<V>>>;

/// A single-flight, non-expiring result cache.
#[derive(Debug)]
pub struct ResultCache<K, V> {
    name: &'static str,
    slots: Mutex<BTreeMap<K, Slot<V>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K: Ord + Clone + Debug, V> ResultCache<K, V> {
    /// Creates an empty cache. `name` appears in log lines.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            slots: Mutex::new(BTreeMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn slots(&self) -> MutexGuard<'_, BTreeMap<K, Slot<V>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the stored result for `key`, running `producer` to compute it
    /// if absent.
    ///
    /// # Errors
    ///
    /// Returns the producer's error unchanged. Nothing is stored in that case.
    #[allow(clippy::future_not_send)]
    pub async fn get_or_compute<F, Fut, E>(&self, key: K, producer: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        let slot = Arc::clone(self.slots().entry(key.clone()).or_default());

        let ran = AtomicBool::new(false);
        let result = slot
            .get_or_try_init(|| async {
                ran.store(true, Ordering::Relaxed);
                log::info!("{} cache miss for {key:?}", self.name);
                let value = producer().await?;
                Ok::<_, E>(CacheEntry {
                    value: Arc::new(value),
                    inserted_at: Utc::now(),
                })
            })
            .await;

        match result {
            Ok(entry) => {
                if ran.load(Ordering::Relaxed) {
                    self.misses.fetch_add(1, Ordering::Relaxed);
                } else {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    log::debug!(
                        "{} cache hit for {key:?} (stored {})",
                        self.name,
                        entry.inserted_at.to_rfc3339()
                    );
                }
                Ok(Arc::clone(&entry.value))
            }
            Err(e) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                let mut slots = self.slots();
                if let Some(current) = slots.get(&key)
                    && Arc::ptr_eq(current, &slot)
                    && !current.initialized()
                {
                    slots.remove(&key);
                }
                drop(slots);
                Err(e)
            }
        }
    }

    /// The stored result for `key`, without computing it.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.slots()
            .get(key)
            .and_then(|slot| slot.get())
            .map(|entry| Arc::clone(&entry.value))
    }

    /// When the result for `key` was stored.
    #[must_use]
    pub fn inserted_at(&self, key: &K) -> Option<DateTime<Utc>> {
        self.slots()
            .get(key)
            .and_then(|slot| slot.get())
            .map(|entry| entry.inserted_at)
    }

    /// Number of stored results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots().values().filter(|slot| slot.initialized()).count()
    }

    /// Whether nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current counters.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }

    /// Drops every stored result. Counters are kept.
    pub fn clear(&self) {
        self.slots().clear();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    #[tokio::test]
    async fn computes_once_per_key() {
        let cache: ResultCache<(i32, u32), String> = ResultCache::new("test");
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let value = cache
                .get_or_compute((2021, 10), || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>("value".to_string())
                })
                .await
                .unwrap();
            assert_eq!(*value, "value");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 2,
                misses: 1,
                entries: 1
            }
        );
        assert!(cache.inserted_at(&(2021, 10)).is_some());
    }

    #[tokio::test]
    async fn distinct_keys_are_distinct_entries() {
        let cache: ResultCache<i32, i32> = ResultCache::new("test");
        let a = cache
            .get_or_compute(1, || async { Ok::<_, ()>(10) })
            .await
            .unwrap();
        let b = cache
            .get_or_compute(2, || async { Ok::<_, ()>(20) })
            .await
            .unwrap();
        assert_eq!((*a, *b), (10, 20));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&1).as_deref(), Some(&10));
        assert_eq!(cache.get(&3), None);
    }

    #[tokio::test]
    async fn failures_are_not_stored() {
        let cache: ResultCache<i32, i32> = ResultCache::new("test");

        let err = cache
            .get_or_compute(1, || async { Err::<i32, _>("boom") })
            .await
            .unwrap_err();
        assert_eq!(err, "boom");
        assert!(cache.is_empty());

        let value = cache
            .get_or_compute(1, || async { Ok::<_, &str>(5) })
            .await
            .unwrap();
        assert_eq!(*value, 5);
        assert_eq!(cache.stats().misses, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_identical_requests_share_one_run() {
        let cache = Arc::new(ResultCache::<i32, i32>::new("test"));
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let calls = Arc::clone(&calls);
                tokio::spawn(async move {
                    cache
                        .get_or_compute(7, || async move {
                            calls.fetch_add(1, Ordering::SeqCst);
                            tokio::task::yield_now().await;
                            Ok::<_, ()>(49)
                        })
                        .await
                })
            })
            .collect();

        for task in tasks {
            assert_eq!(*task.await.unwrap().unwrap(), 49);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn lookup_future_is_send_for_send_inputs() {
        fn assert_send<T: Send>(_: &T) {}

        let cache: ResultCache<(i32, u32), String> = ResultCache::new("test");
        let lookup = cache.get_or_compute((2021, 5), || async { Ok::<_, ()>(String::new()) });
        assert_send(&lookup);
    }

    #[tokio::test]
    async fn clear_forgets_results() {
        let cache: ResultCache<i32, i32> = ResultCache::new("test");
        cache
            .get_or_compute(1, || async { Ok::<_, ()>(1) })
            .await
            .unwrap();
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get(&1), None);
    }
}
