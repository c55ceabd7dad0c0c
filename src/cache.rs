//! Query cache with request de-duplication and stale-while-revalidate
//!
//! Every remote query is keyed by its inputs. An entry moves through
//! empty -> loading -> success/error, becomes stale after a freshness
//! window, and is garbage-collected once it goes unused. At most one
//! request per key is ever in flight: concurrent callers collapse onto the
//! same fetch and observe its result. Stale entries keep serving the
//! last-known-good value while a background revalidation runs.
//!
//! Because results are stored under the key that issued them, a response
//! for a superseded context (say, another coin's detail page) can never
//! overwrite a different key's state.

use crate::{
    constants::{CACHE_IDLE_EVICT_SECS, INITIAL_BACKOFF_MS, MAX_BACKOFF_MS, MAX_RETRY_ATTEMPTS, STALE_AFTER_SECS},
    error::ApiError,
};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::OwnedMutexGuard;
use tokio::time::sleep;

/// Freshness and retry configuration for a cache
#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    /// How long fetched data counts as fresh
    pub fresh_for: Duration,
    /// Maximum attempts for a retryable failure
    pub max_attempts: u32,
    /// Delay before the first retry, doubled on each subsequent one
    pub initial_backoff: Duration,
    /// Upper bound on the backoff delay
    pub max_backoff: Duration,
    /// Entries unused for this long are dropped by [`QueryCache::evict_idle`]
    pub evict_after: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            fresh_for: Duration::from_secs(STALE_AFTER_SECS),
            max_attempts: MAX_RETRY_ATTEMPTS,
            initial_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
            max_backoff: Duration::from_millis(MAX_BACKOFF_MS),
            evict_after: Duration::from_secs(CACHE_IDLE_EVICT_SECS),
        }
    }
}

/// Uniform view of a cache entry handed to the render surface.
///
/// Loading, error, and empty are three distinct observable conditions:
/// `is_loading` while a fetch is pending, `is_error` once one has failed,
/// and all-fields-empty when nothing was ever requested.
#[derive(Debug, Clone)]
pub struct QuerySnapshot<T> {
    /// Last-known-good data, possibly stale
    pub data: Option<T>,
    pub is_loading: bool,
    pub is_error: bool,
    pub error: Option<ApiError>,
}

impl<T> QuerySnapshot<T> {
    /// Snapshot of a key that was never fetched
    pub fn empty() -> Self {
        Self {
            data: None,
            is_loading: false,
            is_error: false,
            error: None,
        }
    }

    /// True when there is no data, no pending fetch, and no error
    pub fn is_empty(&self) -> bool {
        self.data.is_none() && !self.is_loading && !self.is_error
    }
}

struct EntryState<V> {
    data: Option<V>,
    fetched_at: Option<Instant>,
    error: Option<ApiError>,
    is_loading: bool,
    last_accessed: Instant,
    /// Bumped on every fetch completion; lets a caller that waited on the
    /// fetch lock tell whether the in-flight request finished meanwhile
    generation: u64,
}

impl<V: Clone> EntryState<V> {
    fn new() -> Self {
        Self {
            data: None,
            fetched_at: None,
            error: None,
            is_loading: false,
            last_accessed: Instant::now(),
            generation: 0,
        }
    }

    fn snapshot(&self) -> QuerySnapshot<V> {
        QuerySnapshot {
            data: self.data.clone(),
            is_loading: self.is_loading,
            is_error: self.error.is_some(),
            error: self.error.clone(),
        }
    }

    fn is_fresh(&self, fresh_for: Duration) -> bool {
        self.data.is_some()
            && self
                .fetched_at
                .map(|at| at.elapsed() < fresh_for)
                .unwrap_or(false)
    }

    fn apply(&mut self, result: Result<V, ApiError>) {
        self.is_loading = false;
        self.generation += 1;
        match result {
            Ok(value) => {
                self.data = Some(value);
                self.fetched_at = Some(Instant::now());
                self.error = None;
            }
            Err(e) => {
                self.error = Some(e);
            }
        }
    }
}

struct EntrySlot<V> {
    state: Mutex<EntryState<V>>,
    /// Held for the duration of a fetch; de-duplicates per-key requests
    fetch_lock: Arc<tokio::sync::Mutex<()>>,
}

impl<V: Clone> EntrySlot<V> {
    fn new() -> Self {
        Self {
            state: Mutex::new(EntryState::new()),
            fetch_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }
}

/// Cache of remote query results keyed by query identity
pub struct QueryCache<K, V> {
    entries: Mutex<HashMap<K, Arc<EntrySlot<V>>>>,
    policy: CachePolicy,
}

impl<K, V> QueryCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + Send + 'static,
{
    /// Creates a cache with the default policy
    pub fn new() -> Self {
        Self::with_policy(CachePolicy::default())
    }

    /// Creates a cache with an explicit policy
    pub fn with_policy(policy: CachePolicy) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            policy,
        }
    }

    fn slot(&self, key: &K) -> Arc<EntrySlot<V>> {
        let mut entries = self.entries.lock().unwrap();
        entries
            .entry(key.clone())
            .or_insert_with(|| Arc::new(EntrySlot::new()))
            .clone()
    }

    /// Returns the cached value for `key`, fetching when needed.
    ///
    /// Fresh data returns immediately. Stale data is returned as-is while a
    /// background revalidation runs. A miss fetches inline with the retry
    /// policy; concurrent callers for the same key wait on the in-flight
    /// request instead of issuing their own.
    pub async fn fetch<F, Fut>(&self, key: K, fetch_fn: F) -> QuerySnapshot<V>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        let slot = self.slot(&key);

        let generation_before = {
            let mut state = slot.state.lock().unwrap();
            state.last_accessed = Instant::now();

            if state.is_fresh(self.policy.fresh_for) {
                return state.snapshot();
            }

            if state.data.is_some() {
                // Stale hit: serve the old value, revalidate in the background
                // unless a refresh is already in flight.
                if let Ok(guard) = slot.fetch_lock.clone().try_lock_owned() {
                    state.is_loading = true;
                    let snapshot = state.snapshot();
                    drop(state);
                    self.spawn_revalidate(slot.clone(), guard, fetch_fn);
                    return snapshot;
                }
                return state.snapshot();
            }

            state.generation
        };

        // Miss: wait our turn on the fetch lock. If the request that held it
        // completed while we waited, its outcome is our outcome.
        let _guard = slot.fetch_lock.lock().await;
        {
            let state = slot.state.lock().unwrap();
            if state.generation != generation_before {
                return state.snapshot();
            }
        }

        slot.state.lock().unwrap().is_loading = true;
        let result = fetch_with_retry(&fetch_fn, &self.policy).await;

        let mut state = slot.state.lock().unwrap();
        state.apply(result);
        state.snapshot()
    }

    fn spawn_revalidate<F, Fut>(
        &self,
        slot: Arc<EntrySlot<V>>,
        guard: OwnedMutexGuard<()>,
        fetch_fn: F,
    ) where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        let policy = self.policy;
        tokio::spawn(async move {
            let result = fetch_with_retry(&fetch_fn, &policy).await;
            if let Err(e) = &result {
                tracing::warn!(error = %e, "Background revalidation failed");
            }
            slot.state.lock().unwrap().apply(result);
            drop(guard);
        });
    }

    /// Fetches `key` unconditionally, bypassing the freshness window.
    ///
    /// Used by the periodic refresh: the coin list is refetched on a fixed
    /// interval to keep prices current while the user sits on the page.
    /// Still de-duplicated against other in-flight requests for the key.
    pub async fn refetch<F, Fut>(&self, key: K, fetch_fn: F) -> QuerySnapshot<V>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<V, ApiError>> + Send + 'static,
    {
        let slot = self.slot(&key);
        slot.state.lock().unwrap().last_accessed = Instant::now();

        let _guard = slot.fetch_lock.lock().await;
        slot.state.lock().unwrap().is_loading = true;
        let result = fetch_with_retry(&fetch_fn, &self.policy).await;

        let mut state = slot.state.lock().unwrap();
        state.apply(result);
        state.snapshot()
    }

    /// Whether `key` lacks data or its data has outlived the freshness
    /// window. Unknown keys are stale.
    pub fn is_stale(&self, key: &K) -> bool {
        let entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(slot) => !slot.state.lock().unwrap().is_fresh(self.policy.fresh_for),
            None => true,
        }
    }

    /// Current view of `key` without triggering a fetch
    pub fn snapshot(&self, key: &K) -> QuerySnapshot<V> {
        let entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(slot) => slot.state.lock().unwrap().snapshot(),
            None => QuerySnapshot::empty(),
        }
    }

    /// Marks `key` as no longer fresh so the next fetch goes to the network
    pub fn invalidate(&self, key: &K) {
        let entries = self.entries.lock().unwrap();
        if let Some(slot) = entries.get(key) {
            slot.state.lock().unwrap().fetched_at = None;
        }
    }

    /// Drops entries that have not been accessed within the policy's idle
    /// bound. Entries with a fetch in flight are kept.
    pub fn evict_idle(&self) {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        let evict_after = self.policy.evict_after;
        entries.retain(|_, slot| {
            let state = slot.state.lock().unwrap();
            state.is_loading || state.last_accessed.elapsed() < evict_after
        });
        let dropped = before - entries.len();
        if dropped > 0 {
            tracing::debug!(dropped, remaining = entries.len(), "Evicted idle cache entries");
        }
    }

    /// Number of live cache entries
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// True when no entries are cached
    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

impl<K, V> Default for QueryCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `fetch_fn` under the retry policy: transient failures back off and
/// retry up to the attempt bound, permanent ones surface immediately.
async fn fetch_with_retry<F, Fut, V>(fetch_fn: &F, policy: &CachePolicy) -> Result<V, ApiError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<V, ApiError>>,
{
    let mut backoff = policy.initial_backoff;
    let mut attempt = 1;

    loop {
        match fetch_fn().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                if !e.is_retryable() || attempt >= policy.max_attempts {
                    return Err(e);
                }
                tracing::warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %e,
                    "Fetch failed, retrying"
                );
                sleep(backoff).await;
                backoff = (backoff * 2).min(policy.max_backoff);
                attempt += 1;
            }
        }
    }
}
