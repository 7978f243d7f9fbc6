//! Single-flight in-memory cache with a freshness window and a hard expiry.
//!
//! Each key holds at most one value. A value younger than the freshness
//! window is served as-is. An older one is recomputed on the next request,
//! and every caller that arrives while that recomputation runs awaits the
//! same result instead of starting its own. Values older than the hard
//! expiry are dropped.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use dashmap::DashMap;
use futures::future::{BoxFuture, FutureExt, Shared};
use tokio::task::JoinError;
use tokio::time::Instant;

type Flight<V, E> = Shared<BoxFuture<'static, Result<V, Arc<E>>>>;

struct Stored<V> {
    value: V,
    computed_at: Instant,
}

struct SlotState<V, E> {
    stored: Option<Stored<V>>,
    in_flight: Option<Flight<V, E>>,
}

struct Slot<V, E> {
    state: Mutex<SlotState<V, E>>,
}

impl<V, E> Default for Slot<V, E> {
    fn default() -> Self {
        Self {
            state: Mutex::new(SlotState {
                stored: None,
                in_flight: None,
            }),
        }
    }
}

impl<V, E> Slot<V, E> {
    fn lock(&self) -> MutexGuard<'_, SlotState<V, E>> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Thread-safe cache that runs at most one computation per key at a time.
///
/// Computations run on a spawned tokio task, so a caller that gives up
/// waiting does not cancel the refresh for the others. Errors are handed to
/// every waiting caller as the same `Arc` and are never stored: the previous
/// value stays in place and the next request tries again.
pub struct SingleFlightCache<V, E> {
    slots: DashMap<String, Arc<Slot<V, E>>>,
    fresh_for: Duration,
    expire_after: Duration,
}

impl<V, E> SingleFlightCache<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: From<JoinError> + Send + Sync + 'static,
{
    /// Creates a cache whose values are fresh for `fresh_for` and dropped
    /// after `expire_after`. The expiry is never shorter than the freshness window.
    pub fn new(fresh_for: Duration, expire_after: Duration) -> Self {
        Self {
            slots: DashMap::new(),
            fresh_for,
            expire_after: expire_after.max(fresh_for),
        }
    }

    /// Returns the value for `key` if it is still fresh. Never computes.
    pub fn get(&self, key: &str) -> Option<V> {
        let slot = self.slots.get(key)?;
        let state = slot.lock();
        state
            .stored
            .as_ref()
            .filter(|stored| stored.computed_at.elapsed() < self.fresh_for)
            .map(|stored| stored.value.clone())
    }

    /// Returns the fresh value for `key`, or computes it.
    ///
    /// `compute` is called before any lock is taken, so it may use this
    /// cache. The future it returns is only run when no fresh value exists
    /// and no computation for `key` is already running; otherwise it is
    /// dropped unpolled.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F) -> Result<V, Arc<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let fut = compute();
        let flight = {
            // Holding the map entry keeps `purge_expired` off this slot until
            // the in-flight marker is set.
            let entry = self.slots.entry(key.to_string()).or_default();
            let slot = Arc::clone(entry.value());
            let mut state = slot.lock();

            if let Some(stored) = &state.stored {
                let age = stored.computed_at.elapsed();
                if age < self.fresh_for {
                    tracing::trace!(key, "cache hit");
                    return Ok(stored.value.clone());
                }
                if age >= self.expire_after {
                    tracing::debug!(key, "dropping expired cache value");
                    state.stored = None;
                }
            }

            match &state.in_flight {
                Some(flight) => {
                    tracing::debug!(key, "joining in-flight refresh");
                    flight.clone()
                }
                None => {
                    tracing::debug!(key, "cache miss, starting refresh");
                    let flight = launch(key, &slot, fut);
                    state.in_flight = Some(flight.clone());
                    flight
                }
            }
        };
        flight.await
    }

    /// Whether a value, fresh or stale, is stored for `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        let Some(slot) = self.slots.get(key) else {
            return false;
        };
        let stored = slot.lock().stored.is_some();
        stored
    }

    /// Drops every value older than the hard expiry that is not being
    /// refreshed. Returns how many keys were removed.
    pub fn purge_expired(&self) -> usize {
        let mut removed = 0;
        self.slots.retain(|_, slot| {
            let state = slot.lock();
            let keep = state.in_flight.is_some()
                || state
                    .stored
                    .as_ref()
                    .is_some_and(|stored| stored.computed_at.elapsed() < self.expire_after);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Removes all entries from the cache.
    pub fn clear(&self) {
        self.slots.clear();
    }

    /// Number of keys currently tracked, fresh or not.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Clears the slot's in-flight marker when the refresh task ends without
/// reaching its own bookkeeping, i.e. when it panics or is dropped.
struct FlightGuard<V, E> {
    slot: Arc<Slot<V, E>>,
    armed: bool,
}

impl<V, E> Drop for FlightGuard<V, E> {
    fn drop(&mut self) {
        if self.armed {
            self.slot.lock().in_flight = None;
        }
    }
}

fn launch<V, E, Fut>(key: &str, slot: &Arc<Slot<V, E>>, fut: Fut) -> Flight<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: From<JoinError> + Send + Sync + 'static,
    Fut: Future<Output = Result<V, E>> + Send + 'static,
{
    let mut guard = FlightGuard {
        slot: Arc::clone(slot),
        armed: true,
    };
    let key = key.to_string();
    let handle = tokio::spawn(async move {
        let started = Instant::now();
        let result = fut.await;
        let mut state = guard.slot.lock();
        state.in_flight = None;
        let result = match result {
            Ok(value) => {
                state.stored = Some(Stored {
                    value: value.clone(),
                    computed_at: Instant::now(),
                });
                tracing::debug!(
                    key = %key,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "cache refreshed"
                );
                Ok(value)
            }
            Err(err) => {
                tracing::debug!(key = %key, "refresh failed, previous value kept");
                Err(Arc::new(err))
            }
        };
        drop(state);
        guard.armed = false;
        result
    });

    async move {
        match handle.await {
            Ok(result) => result,
            Err(join_err) => {
                tracing::warn!("cache refresh task aborted: {}", join_err);
                Err(Arc::new(E::from(join_err)))
            }
        }
    }
    .boxed()
    .shared()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, PartialEq)]
    enum TestError {
        Upstream,
        Aborted,
    }

    impl From<JoinError> for TestError {
        fn from(_: JoinError) -> Self {
            TestError::Aborted
        }
    }

    type TestCache = SingleFlightCache<u32, TestError>;

    const FRESH: Duration = Duration::from_secs(100 * 60);
    const EXPIRE: Duration = Duration::from_secs(120 * 60);

    fn counting(
        calls: &Arc<AtomicUsize>,
        value: u32,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<u32, TestError>> {
        let calls = Arc::clone(calls);
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok(value)
            }
            .boxed()
        }
    }

    fn failing(
        calls: &Arc<AtomicUsize>,
    ) -> impl FnOnce() -> BoxFuture<'static, Result<u32, TestError>> {
        let calls = Arc::clone(calls);
        move || {
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(50)).await;
                Err(TestError::Upstream)
            }
            .boxed()
        }
    }

    fn stored_value(cache: &TestCache, key: &str) -> Option<u32> {
        let slot = cache.slots.get(key)?;
        let state = slot.lock();
        state.stored.as_ref().map(|s| s.value)
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_value_is_served_without_recompute() {
        let cache = TestCache::new(FRESH, EXPIRE);
        let calls = Arc::new(AtomicUsize::new(0));

        assert_eq!(cache.get_or_compute("items", counting(&calls, 1)).await, Ok(1));
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(cache.get_or_compute("items", counting(&calls, 2)).await, Ok(1));
        assert_eq!(cache.get("items"), Some(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_value_is_recomputed_once() {
        let cache = TestCache::new(FRESH, EXPIRE);
        let calls = Arc::new(AtomicUsize::new(0));

        cache.get_or_compute("items", counting(&calls, 1)).await.unwrap();
        tokio::time::advance(FRESH + Duration::from_secs(1)).await;
        assert_eq!(cache.get("items"), None);

        assert_eq!(cache.get_or_compute("items", counting(&calls, 2)).await, Ok(2));
        assert_eq!(cache.get_or_compute("items", counting(&calls, 3)).await, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_share_one_computation() {
        let cache = Arc::new(TestCache::new(FRESH, EXPIRE));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for i in 0..16 {
            let cache = Arc::clone(&cache);
            let compute = counting(&calls, 100 + i);
            handles.push(tokio::spawn(async move {
                cache.get_or_compute("items", compute).await
            }));
        }
        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap().unwrap());
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results.iter().all(|v| *v == results[0]));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_callers_on_stale_value_share_one_refresh() {
        let cache = Arc::new(TestCache::new(FRESH, EXPIRE));
        let calls = Arc::new(AtomicUsize::new(0));
        cache.get_or_compute("items", counting(&calls, 1)).await.unwrap();
        tokio::time::advance(FRESH + Duration::from_secs(1)).await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = Arc::clone(&cache);
            let compute = counting(&calls, 2);
            handles.push(tokio::spawn(async move {
                cache.get_or_compute("items", compute).await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), Ok(2));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn error_is_shared_and_not_cached() {
        let cache = Arc::new(TestCache::new(FRESH, EXPIRE));
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let cache = Arc::clone(&cache);
            let compute = failing(&calls);
            handles.push(tokio::spawn(async move {
                cache.get_or_compute("items", compute).await
            }));
        }
        let mut errors = Vec::new();
        for handle in handles {
            errors.push(handle.await.unwrap().unwrap_err());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(*errors[0], TestError::Upstream);
        assert!(errors.iter().all(|e| Arc::ptr_eq(e, &errors[0])));

        assert_eq!(cache.get_or_compute("items", counting(&calls, 7)).await, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_refresh_keeps_previous_value() {
        let cache = TestCache::new(FRESH, EXPIRE);
        let calls = Arc::new(AtomicUsize::new(0));
        cache.get_or_compute("items", counting(&calls, 1)).await.unwrap();
        tokio::time::advance(FRESH + Duration::from_secs(1)).await;

        let err = cache.get_or_compute("items", failing(&calls)).await.unwrap_err();
        assert_eq!(*err, TestError::Upstream);
        assert_eq!(stored_value(&cache, "items"), Some(1));
        // Stale, so it is not served.
        assert_eq!(cache.get("items"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_caller_does_not_cancel_refresh() {
        let cache = Arc::new(TestCache::new(FRESH, EXPIRE));
        let calls = Arc::new(AtomicUsize::new(0));

        let first = {
            let cache = Arc::clone(&cache);
            let compute = counting(&calls, 5);
            tokio::spawn(async move { cache.get_or_compute("items", compute).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        first.abort();

        assert_eq!(cache.get_or_compute("items", counting(&calls, 6)).await, Ok(5));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_computation_surfaces_error_and_recovers() {
        let cache = TestCache::new(FRESH, EXPIRE);
        let err = cache
            .get_or_compute("items", || async {
                if true {
                    panic!("boom");
                }
                Ok(0)
            })
            .await
            .unwrap_err();
        assert_eq!(*err, TestError::Aborted);

        let calls = Arc::new(AtomicUsize::new(0));
        assert_eq!(cache.get_or_compute("items", counting(&calls, 3)).await, Ok(3));
    }

    #[tokio::test(start_paused = true)]
    async fn panic_with_no_waiter_does_not_wedge_the_key() {
        let cache = Arc::new(TestCache::new(FRESH, EXPIRE));
        let first = {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move {
                cache
                    .get_or_compute("items", || async {
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        if true {
                            panic!("boom");
                        }
                        Ok(0)
                    })
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        first.abort();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(cache.purge_expired(), 1);

        let calls = Arc::new(AtomicUsize::new(0));
        assert_eq!(cache.get_or_compute("items", counting(&calls, 7)).await, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn compute_may_read_the_same_cache() {
        let cache = TestCache::new(FRESH, EXPIRE);
        let calls = Arc::new(AtomicUsize::new(0));

        let mut seen_len = None;
        let first = cache
            .get_or_compute("items", || {
                seen_len = Some(cache.len());
                counting(&calls, 1)()
            })
            .await;
        assert_eq!(first, Ok(1));
        assert_eq!(seen_len, Some(0));

        let mut seen = None;
        let second = cache
            .get_or_compute("items", || {
                seen = cache.get("items");
                counting(&calls, 2)()
            })
            .await;
        assert_eq!(second, Ok(1));
        assert_eq!(seen, Some(1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn expired_value_is_purged() {
        let cache = TestCache::new(FRESH, EXPIRE);
        let calls = Arc::new(AtomicUsize::new(0));
        cache.get_or_compute("items", counting(&calls, 1)).await.unwrap();

        tokio::time::advance(FRESH).await;
        assert_eq!(cache.purge_expired(), 0);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains_key("items"));

        tokio::time::advance(EXPIRE - FRESH + Duration::from_secs(1)).await;
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
        assert!(!cache.contains_key("items"));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_value_is_dropped_on_access() {
        let cache = TestCache::new(FRESH, EXPIRE);
        let calls = Arc::new(AtomicUsize::new(0));
        cache.get_or_compute("items", counting(&calls, 1)).await.unwrap();
        tokio::time::advance(EXPIRE + Duration::from_secs(1)).await;

        let err = cache.get_or_compute("items", failing(&calls)).await.unwrap_err();
        assert_eq!(*err, TestError::Upstream);
        assert_eq!(stored_value(&cache, "items"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn keys_are_independent() {
        let cache = TestCache::new(FRESH, EXPIRE);
        let calls = Arc::new(AtomicUsize::new(0));
        assert_eq!(cache.get_or_compute("a", counting(&calls, 1)).await, Ok(1));
        assert_eq!(cache.get_or_compute("b", counting(&calls, 2)).await, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn expiry_is_never_shorter_than_freshness() {
        let cache = TestCache::new(Duration::from_secs(10), Duration::from_secs(5));
        assert_eq!(cache.expire_after, Duration::from_secs(10));
    }
}
