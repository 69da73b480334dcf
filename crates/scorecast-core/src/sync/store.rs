// Cache-backed resource access.
//
// A `ResourceStore` is the process-wide service for one resource kind: it
// owns the cache and the per-key generation counters. Callers open a
// `ResourceHandle` per key, subscribe to its `ResourceState`, and drive it
// with `load`, `refetch` and `refresh_silently`. A fetch commits only if
// no newer fetch for the key has started and its own handle is still open.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::{debug, warn};

use super::cache::{CachePolicy, Lookup, ResourceCache};
use super::generation::{Generation, GenerationCounter};
use crate::error::FetchError;

// ---------------------------------------------------------------------------
// Supporting types
// ---------------------------------------------------------------------------

/// The three cached resource kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    GameDetail,
    Flow,
    GameList,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::GameDetail => "game_detail",
            ResourceKind::Flow => "flow",
            ResourceKind::GameList => "game_list",
        }
    }
}

/// Loads one resource from upstream.
#[async_trait]
pub trait Fetcher<K, V>: Send + Sync
where
    K: Send + Sync,
    V: Send,
{
    async fn fetch(&self, key: &K) -> Result<V, FetchError>;
}

/// What a view renders: current data, whether a visible fetch is running,
/// and the display string of the last failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceState<V> {
    pub data: Option<V>,
    pub loading: bool,
    pub error: Option<String>,
}

impl<V> Default for ResourceState<V> {
    fn default() -> Self {
        Self {
            data: None,
            loading: false,
            error: None,
        }
    }
}

/// Result of a single fetch attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<V> {
    /// Fetched and written to the cache.
    Committed(V),
    /// The fetch failed; the cache was left untouched.
    Failed(FetchError),
    /// A newer fetch for the key superseded this one, or the handle that
    /// started it was closed; the result was thrown away.
    Discarded,
}

// ---------------------------------------------------------------------------
// ResourceStore
// ---------------------------------------------------------------------------

/// Shared cache service for one resource kind.
pub struct ResourceStore<K, V> {
    kind: ResourceKind,
    cache: Mutex<ResourceCache<K, V>>,
    generations: Mutex<HashMap<K, GenerationCounter>>,
    fetcher: Arc<dyn Fetcher<K, V>>,
}

impl<K, V> ResourceStore<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(
        kind: ResourceKind,
        policy: CachePolicy,
        fetcher: Arc<dyn Fetcher<K, V>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            kind,
            cache: Mutex::new(ResourceCache::new(policy)),
            generations: Mutex::new(HashMap::new()),
            fetcher,
        })
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Cached value for `key` if it has not expired.
    pub fn cached(&self, key: &K) -> Option<V> {
        self.cache().get(key)
    }

    pub fn lookup(&self, key: &K) -> Lookup<V> {
        self.cache().lookup(key)
    }

    /// Open a handle for `key`. Handles for the same key share one
    /// generation counter, so a fetch started through any of them
    /// supersedes fetches started through the others. Closing a handle
    /// only discards its own fetches.
    pub fn open(self: &Arc<Self>, key: K) -> ResourceHandle<K, V> {
        let generation = self.generation_counter(&key);
        let teardown = GenerationCounter::new();
        let open = teardown.advance();
        let initial = ResourceState {
            data: self.cached(&key),
            ..ResourceState::default()
        };
        let (state, _rx) = watch::channel(initial);
        ResourceHandle {
            store: Arc::clone(self),
            key,
            generation,
            teardown,
            open,
            latest: AtomicU64::new(0),
            state,
        }
    }

    fn generation_counter(&self, key: &K) -> GenerationCounter {
        let mut generations = self
            .generations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Counters nobody holds any more carry no state worth keeping.
        generations.retain(|_, counter| counter.in_use());
        generations.entry(key.clone()).or_default().clone()
    }

    fn cache(&self) -> MutexGuard<'_, ResourceCache<K, V>> {
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fetch `key` and commit to the cache only if `token` is still current
    /// and the requesting handle is still `open` once the response arrives.
    async fn fetch_into_cache(
        &self,
        key: &K,
        token: &Generation,
        open: &Generation,
    ) -> FetchOutcome<V> {
        let result = self.fetcher.fetch(key).await;

        if !token.is_current() || !open.is_current() {
            debug!(
                kind = self.kind.as_str(),
                ?key,
                generation = token.value(),
                "discarding stale fetch result"
            );
            return FetchOutcome::Discarded;
        }

        match result {
            Ok(value) => {
                if let Some(evicted) = self.cache().set(key.clone(), value.clone()) {
                    debug!(kind = self.kind.as_str(), ?evicted, "evicted oldest cache entry");
                }
                FetchOutcome::Committed(value)
            }
            Err(err) => FetchOutcome::Failed(err),
        }
    }
}

// ---------------------------------------------------------------------------
// ResourceHandle
// ---------------------------------------------------------------------------

/// A view's connection to one cached resource.
pub struct ResourceHandle<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    store: Arc<ResourceStore<K, V>>,
    key: K,
    /// Shared by every handle on `key`.
    generation: GenerationCounter,
    /// Private to this handle; invalidated on drop.
    teardown: GenerationCounter,
    open: Generation,
    /// Value of the newest token this handle issued.
    latest: AtomicU64,
    state: watch::Sender<ResourceState<V>>,
}

impl<K, V> ResourceHandle<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn key(&self) -> &K {
        &self.key
    }

    pub fn subscribe(&self) -> watch::Receiver<ResourceState<V>> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ResourceState<V> {
        self.state.borrow().clone()
    }

    /// Serve from cache where possible.
    ///
    /// - fresh: publish the cached value, no network call
    /// - stale: publish the cached value, then refresh silently
    /// - absent: show loading and block on the fetch
    pub async fn load(&self) -> ResourceState<V> {
        match self.store.lookup(&self.key) {
            Lookup::Fresh(value) => {
                self.publish_data(value);
            }
            Lookup::Stale(value) => {
                self.publish_data(value);
                self.refresh_silently().await;
            }
            Lookup::Absent => {
                self.fetch_visible().await;
            }
        }
        self.snapshot()
    }

    /// User-initiated reload. Shows the loading indicator and surfaces
    /// failures; data already on screen stays there.
    pub async fn refetch(&self) -> FetchOutcome<V> {
        self.fetch_visible().await
    }

    /// Background reload without a loading indicator. Failures are logged
    /// and swallowed. Returns the fresh value when one was committed.
    pub async fn refresh_silently(&self) -> Option<V> {
        let token = self.begin();
        match self.store.fetch_into_cache(&self.key, &token, &self.open).await {
            FetchOutcome::Committed(value) => {
                self.publish_data(value.clone());
                Some(value)
            }
            FetchOutcome::Failed(err) => {
                warn!(
                    kind = self.store.kind.as_str(),
                    key = ?self.key,
                    "background refresh failed: {err}"
                );
                None
            }
            FetchOutcome::Discarded => None,
        }
    }

    fn begin(&self) -> Generation {
        let token = self.generation.advance();
        self.latest.store(token.value(), Ordering::SeqCst);
        token
    }

    async fn fetch_visible(&self) -> FetchOutcome<V> {
        let token = self.begin();
        self.state.send_modify(|s| s.loading = true);

        let outcome = self.store.fetch_into_cache(&self.key, &token, &self.open).await;
        match &outcome {
            FetchOutcome::Committed(value) => self.publish_data(value.clone()),
            FetchOutcome::Failed(err) => {
                warn!(
                    kind = self.store.kind.as_str(),
                    key = ?self.key,
                    "fetch failed: {err}"
                );
                let fallback = self.store.cached(&self.key);
                let message = err.display_message();
                self.state.send_modify(|s| {
                    s.loading = false;
                    s.error = Some(message);
                    if s.data.is_none() {
                        s.data = fallback;
                    }
                });
            }
            // A newer fetch on this handle owns the loading flag. One started
            // through another handle never settles this view, so settle it
            // here with whatever the cache holds.
            FetchOutcome::Discarded => {
                if self.latest.load(Ordering::SeqCst) == token.value() {
                    let cached = self.store.cached(&self.key);
                    self.state.send_modify(|s| {
                        s.loading = false;
                        if cached.is_some() {
                            s.data = cached;
                        }
                    });
                }
            }
        }
        outcome
    }

    fn publish_data(&self, value: V) {
        self.state.send_modify(|s| {
            s.data = Some(value);
            s.loading = false;
            s.error = None;
        });
    }
}

impl<K, V> Drop for ResourceHandle<K, V>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.teardown.invalidate();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Returns "{key}#{call}" and can hold one call until released or fail
    /// on a chosen call.
    #[derive(Default)]
    struct ScriptedFetcher {
        calls: AtomicUsize,
        gated_call: Option<usize>,
        fail_on: Option<usize>,
        gate: Notify,
    }

    #[async_trait]
    impl Fetcher<u32, String> for ScriptedFetcher {
        async fn fetch(&self, key: &u32) -> Result<String, FetchError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if self.gated_call == Some(n) {
                self.gate.notified().await;
            }
            if self.fail_on == Some(n) {
                return Err(FetchError::Network("connection reset".into()));
            }
            Ok(format!("{key}#{n}"))
        }
    }

    fn store_with(
        fetcher: Arc<ScriptedFetcher>,
        policy: CachePolicy,
    ) -> Arc<ResourceStore<u32, String>> {
        ResourceStore::new(ResourceKind::GameDetail, policy, fetcher)
    }

    #[tokio::test]
    async fn absent_entry_blocks_on_fetch() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let store = store_with(fetcher.clone(), CachePolicy::game_detail());
        let handle = store.open(7);

        let state = handle.load().await;
        assert_eq!(state.data.as_deref(), Some("7#1"));
        assert!(!state.loading);
        assert!(state.error.is_none());
        assert_eq!(store.cached(&7).as_deref(), Some("7#1"));
    }

    #[tokio::test]
    async fn fresh_entry_skips_network() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let store = store_with(fetcher.clone(), CachePolicy::game_list());

        store.open(1).load().await;
        let state = store.open(1).load().await;

        assert_eq!(state.data.as_deref(), Some("1#1"));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn stale_entry_is_served_then_refreshed() {
        tokio::time::pause();
        let fetcher = Arc::new(ScriptedFetcher::default());
        let store = store_with(fetcher.clone(), CachePolicy::game_list());
        store.open(1).load().await;

        tokio::time::advance(Duration::from_secs(50)).await;
        let handle = store.open(1);
        assert_eq!(handle.snapshot().data.as_deref(), Some("1#1"));

        let state = handle.load().await;
        assert_eq!(state.data.as_deref(), Some("1#2"));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_initial_fetch_surfaces_error() {
        let fetcher = Arc::new(ScriptedFetcher {
            fail_on: Some(1),
            ..Default::default()
        });
        let store = store_with(fetcher, CachePolicy::game_detail());
        let handle = store.open(3);

        let state = handle.load().await;
        assert!(state.data.is_none());
        assert!(!state.loading);
        assert_eq!(
            state.error.as_deref(),
            Some("Unable to reach the server. Check your connection.")
        );
        assert!(store.cached(&3).is_none());
    }

    #[tokio::test]
    async fn failed_refetch_keeps_prior_value() {
        let fetcher = Arc::new(ScriptedFetcher {
            fail_on: Some(2),
            ..Default::default()
        });
        let store = store_with(fetcher, CachePolicy::game_detail());
        let handle = store.open(3);
        handle.load().await;

        let outcome = handle.refetch().await;
        assert!(matches!(outcome, FetchOutcome::Failed(FetchError::Network(_))));

        let state = handle.snapshot();
        assert_eq!(state.data.as_deref(), Some("3#1"));
        assert!(state.error.is_some());
        assert_eq!(store.cached(&3).as_deref(), Some("3#1"));
    }

    #[tokio::test]
    async fn failed_silent_refresh_is_swallowed() {
        let fetcher = Arc::new(ScriptedFetcher {
            fail_on: Some(2),
            ..Default::default()
        });
        let store = store_with(fetcher, CachePolicy::game_detail());
        let handle = store.open(3);
        handle.load().await;

        assert!(handle.refresh_silently().await.is_none());
        let state = handle.snapshot();
        assert_eq!(state.data.as_deref(), Some("3#1"));
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn superseded_fetch_is_discarded() {
        let fetcher = Arc::new(ScriptedFetcher {
            gated_call: Some(1),
            ..Default::default()
        });
        let store = store_with(fetcher.clone(), CachePolicy::game_detail());
        let handle = store.open(5);

        let (first, second) = tokio::join!(handle.refetch(), async {
            tokio::task::yield_now().await;
            let outcome = handle.refetch().await;
            fetcher.gate.notify_one();
            outcome
        });

        assert_eq!(first, FetchOutcome::Discarded);
        assert_eq!(second, FetchOutcome::Committed("5#2".to_string()));
        assert_eq!(handle.snapshot().data.as_deref(), Some("5#2"));
        assert_eq!(store.cached(&5).as_deref(), Some("5#2"));
    }

    #[tokio::test]
    async fn closing_a_sibling_handle_does_not_cancel_the_open_view() {
        let fetcher = Arc::new(ScriptedFetcher {
            gated_call: Some(1),
            ..Default::default()
        });
        let store = store_with(fetcher.clone(), CachePolicy::game_detail());
        let handle = Arc::new(store.open(9));

        let task = {
            let handle = Arc::clone(&handle);
            tokio::spawn(async move { handle.load().await })
        };
        tokio::task::yield_now().await;

        // Another view on the same key closes while the fetch is pending.
        drop(store.open(9));
        fetcher.gate.notify_one();

        let state = task.await.unwrap();
        assert!(!state.loading);
        assert_eq!(state.data.as_deref(), Some("9#1"));
        assert_eq!(store.cached(&9).as_deref(), Some("9#1"));
    }

    #[tokio::test]
    async fn fetch_superseded_by_sibling_settles_the_waiting_view() {
        let fetcher = Arc::new(ScriptedFetcher {
            gated_call: Some(1),
            ..Default::default()
        });
        let store = store_with(fetcher.clone(), CachePolicy::game_detail());
        let waiting = store.open(4);
        let sibling = store.open(4);

        let (first, second) = tokio::join!(waiting.refetch(), async {
            tokio::task::yield_now().await;
            let outcome = sibling.refetch().await;
            fetcher.gate.notify_one();
            outcome
        });

        assert_eq!(first, FetchOutcome::Discarded);
        assert_eq!(second, FetchOutcome::Committed("4#2".to_string()));
        let state = waiting.snapshot();
        assert!(!state.loading);
        assert_eq!(state.data.as_deref(), Some("4#2"));
    }

    #[tokio::test]
    async fn fetch_from_closed_handle_is_discarded() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let store = store_with(fetcher.clone(), CachePolicy::game_detail());
        let teardown = GenerationCounter::new();
        let open = teardown.advance();
        let token = store.generation_counter(&6).advance();

        teardown.invalidate();
        let outcome = store.fetch_into_cache(&6, &token, &open).await;

        assert_eq!(outcome, FetchOutcome::Discarded);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert!(store.cached(&6).is_none());
    }

    #[tokio::test]
    async fn unused_generation_counters_are_pruned() {
        let fetcher = Arc::new(ScriptedFetcher::default());
        let store = store_with(fetcher, CachePolicy::game_detail());
        for key in 0..50 {
            store.open(key).load().await;
        }
        let kept = store.open(1000);

        let tracked = store.generations.lock().unwrap().len();
        assert_eq!(tracked, 1);
        drop(kept);
    }

    #[tokio::test]
    async fn subscribers_see_loading_transition() {
        let fetcher = Arc::new(ScriptedFetcher {
            gated_call: Some(1),
            ..Default::default()
        });
        let store = store_with(fetcher.clone(), CachePolicy::game_detail());
        let handle = store.open(2);
        let rx = handle.subscribe();

        tokio::join!(handle.load(), async {
            tokio::task::yield_now().await;
            assert!(rx.borrow().loading);
            fetcher.gate.notify_one();
        });

        let state = rx.borrow().clone();
        assert!(!state.loading);
        assert_eq!(state.data.as_deref(), Some("2#1"));
    }
}
