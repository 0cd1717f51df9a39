//! Keyed query cache with request coalescing and stale-while-revalidate.
//!
//! # Design
//! `QueryCache<T>` is the sole owner of response data. It maps a `QueryKey`
//! to the last outcome for that key and keeps at most one request in flight
//! per key: callers arriving while a request is pending await the same
//! `Shared` future instead of issuing their own.
//!
//! `QueryObserver<T>` is what a view holds. It tracks the key the view is
//! currently interested in, publishes a `QueryState<T>` over a `watch`
//! channel, and drops responses for keys that were superseded before they
//! resolved. With `keep_previous_data` the last good data stays visible while
//! the next key loads.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use serde_json::{json, Value};
use tokio::sync::{broadcast, watch, Mutex};
use tokio::time::Instant;
use tracing::debug;

use crate::error::{FetchError, Resource};
use crate::types::{ListParams, SortKey};

/// Errors are shared between every caller that awaited the same request.
pub type QueryError = Arc<FetchError>;
pub type QueryResult<T> = Result<T, QueryError>;

type SharedFetch<T> = Shared<BoxFuture<'static, QueryResult<T>>>;

/// Resource name plus request parameters, compared by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryKey {
    resource: Resource,
    params: Value,
}

impl QueryKey {
    pub fn new(resource: Resource, params: Value) -> Self {
        Self { resource, params }
    }

    /// Key for a resource that takes no parameters.
    pub fn singleton(resource: Resource) -> Self {
        Self::new(resource, Value::Null)
    }

    pub fn detail(resource: Resource, id: i64) -> Self {
        Self::new(resource, json!({ "id": id }))
    }

    /// Key for a listing, optionally scoped to a parent (e.g. a group).
    pub fn list<K: SortKey>(resource: Resource, scope: Option<i64>, params: &ListParams<K>) -> Self {
        Self::new(
            resource,
            json!({
                "scope": scope,
                "page": params.page,
                "per_page": params.per_page,
                "sort_by": params.sort_by.as_str(),
                "order": params.order.as_str(),
            }),
        )
    }

    pub fn resource(&self) -> Resource {
        self.resource
    }

    pub fn params(&self) -> &Value {
        &self.params
    }
}

impl Hash for QueryKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.resource.hash(state);
        // Objects serialize with sorted keys, so equal values render equally.
        self.params.to_string().hash(state);
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.resource, self.params)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
    Loading,
    Success,
    Error,
}

/// Snapshot of one cache entry.
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub data: Option<T>,
    pub error: Option<QueryError>,
    pub updated_at: Option<Instant>,
    pub is_fetching: bool,
    invalidated: bool,
    last_used: Option<Instant>,
}

impl<T> Default for CacheEntry<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            updated_at: None,
            is_fetching: false,
            invalidated: false,
            last_used: None,
        }
    }
}

impl<T> CacheEntry<T> {
    pub fn status(&self) -> QueryStatus {
        if self.error.is_some() {
            QueryStatus::Error
        } else if self.data.is_some() {
            QueryStatus::Success
        } else {
            QueryStatus::Loading
        }
    }

    fn is_fresh(&self, stale_time: Duration) -> bool {
        !self.invalidated
            && self.error.is_none()
            && self
                .updated_at
                .is_some_and(|at| at.elapsed() < stale_time)
    }
}

/// Published to every observer of a cache.
#[derive(Clone)]
enum CacheEvent<T> {
    /// A request for the key finished.
    Settled(QueryKey, QueryResult<T>),
    /// Entries of the resource (or only the given key) were marked stale.
    Invalidated(Resource, Option<QueryKey>),
}

struct CacheInner<T> {
    entries: HashMap<QueryKey, CacheEntry<T>>,
    inflight: HashMap<QueryKey, SharedFetch<T>>,
}

impl<T> CacheInner<T> {
    /// Drop idle entries that nobody has read or fetched for `cache_time`.
    fn evict_unused(&mut self, cache_time: Duration) {
        self.entries.retain(|key, entry| {
            let keep = entry.is_fetching
                || entry.last_used.map_or(true, |at| at.elapsed() < cache_time);
            if !keep {
                debug!(%key, "evicting unused entry");
            }
            keep
        });
    }
}

/// How long an idle entry is kept before it is evicted.
pub const DEFAULT_CACHE_TIME: Duration = Duration::from_secs(600);

const EVENT_CAPACITY: usize = 64;

pub struct QueryCache<T> {
    inner: Arc<Mutex<CacheInner<T>>>,
    events: broadcast::Sender<CacheEvent<T>>,
    stale_time: Duration,
    cache_time: Duration,
}

impl<T> Clone for QueryCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            events: self.events.clone(),
            stale_time: self.stale_time,
            cache_time: self.cache_time,
        }
    }
}

impl<T: Clone + Send + Sync + 'static> QueryCache<T> {
    pub fn new(stale_time: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(CacheInner {
                entries: HashMap::new(),
                inflight: HashMap::new(),
            })),
            events,
            stale_time,
            cache_time: DEFAULT_CACHE_TIME,
        }
    }

    /// Set the idle time after which entries are evicted. Never shorter than
    /// the stale time.
    pub fn with_cache_time(mut self, cache_time: Duration) -> Self {
        self.cache_time = cache_time.max(self.stale_time);
        self
    }

    pub fn stale_time(&self) -> Duration {
        self.stale_time
    }

    pub fn cache_time(&self) -> Duration {
        self.cache_time
    }

    fn subscribe(&self) -> broadcast::Receiver<CacheEvent<T>> {
        self.events.subscribe()
    }

    /// Resolve `key`, calling `fetcher` only if no usable data exists and no
    /// request for the key is already pending.
    ///
    /// Stale data is returned immediately and refreshed in the background.
    /// Must be called from within a tokio runtime.
    pub async fn fetch<F, Fut>(&self, key: QueryKey, fetcher: F) -> QueryResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let pending = {
            let mut inner = self.inner.lock().await;
            inner.evict_unused(self.cache_time);
            if let Some(entry) = inner.entries.get_mut(&key) {
                entry.last_used = Some(Instant::now());
                if let Some(data) = entry.data.clone() {
                    if entry.is_fresh(self.stale_time) {
                        debug!(%key, "cache hit");
                        return Ok(data);
                    }
                    debug!(%key, "serving stale data while revalidating");
                    let revalidation = self.start(&mut inner, key, fetcher);
                    tokio::spawn(revalidation);
                    return Ok(data);
                }
            }
            self.start(&mut inner, key, fetcher)
        };
        pending.await
    }

    fn start<F, Fut>(&self, inner: &mut CacheInner<T>, key: QueryKey, fetcher: F) -> SharedFetch<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        if let Some(pending) = inner.inflight.get(&key) {
            debug!(%key, "joining in-flight request");
            return pending.clone();
        }

        let cache = Arc::clone(&self.inner);
        let events = self.events.clone();
        let request = fetcher();
        let task_key = key.clone();
        let pending = async move {
            let result = request.await.map_err(Arc::new);
            let mut inner = cache.lock().await;
            inner.inflight.remove(&task_key);
            let entry = inner.entries.entry(task_key.clone()).or_default();
            entry.is_fetching = false;
            entry.last_used = Some(Instant::now());
            match &result {
                Ok(data) => {
                    entry.data = Some(data.clone());
                    entry.error = None;
                    entry.updated_at = Some(Instant::now());
                    entry.invalidated = false;
                }
                Err(error) => entry.error = Some(Arc::clone(error)),
            }
            // No receivers just means no view is mounted.
            let _ = events.send(CacheEvent::Settled(task_key, result.clone()));
            result
        }
        .boxed()
        .shared();

        inner.inflight.insert(key.clone(), pending.clone());
        let entry = inner.entries.entry(key).or_default();
        entry.is_fetching = true;
        entry.last_used = Some(Instant::now());
        pending
    }

    /// Fresh data for `key`, without waiting on the lock.
    pub fn peek_fresh(&self, key: &QueryKey) -> Option<T> {
        let mut inner = self.inner.try_lock().ok()?;
        let entry = inner.entries.get_mut(key)?;
        if !entry.is_fresh(self.stale_time) {
            return None;
        }
        entry.last_used = Some(Instant::now());
        entry.data.clone()
    }

    pub async fn entry(&self, key: &QueryKey) -> Option<CacheEntry<T>> {
        self.inner.lock().await.entries.get(key).cloned()
    }

    pub async fn entry_count(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    /// Mark `key` stale. Observers showing it refetch.
    pub async fn invalidate(&self, key: &QueryKey) {
        if let Some(entry) = self.inner.lock().await.entries.get_mut(key) {
            entry.invalidated = true;
        }
        let _ = self
            .events
            .send(CacheEvent::Invalidated(key.resource, Some(key.clone())));
    }

    /// Mark every entry of `resource` stale. Observers showing one refetch.
    pub async fn invalidate_resource(&self, resource: Resource) {
        {
            let mut inner = self.inner.lock().await;
            for (key, entry) in inner.entries.iter_mut() {
                if key.resource == resource {
                    entry.invalidated = true;
                }
            }
        }
        let _ = self.events.send(CacheEvent::Invalidated(resource, None));
    }

    pub async fn clear(&self) {
        self.inner.lock().await.entries.clear();
    }
}

/// What a view renders from.
#[derive(Debug, Clone)]
pub struct QueryState<T> {
    pub key: Option<QueryKey>,
    pub status: QueryStatus,
    pub data: Option<T>,
    pub error: Option<QueryError>,
    /// `data` belongs to a previous key and is shown while `key` loads.
    pub is_placeholder: bool,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            key: None,
            status: QueryStatus::Loading,
            data: None,
            error: None,
            is_placeholder: false,
        }
    }
}

impl<T> QueryState<T> {
    pub fn is_loading(&self) -> bool {
        self.status == QueryStatus::Loading
    }

    pub fn is_success(&self) -> bool {
        self.status == QueryStatus::Success
    }

    pub fn is_error(&self) -> bool {
        self.status == QueryStatus::Error
    }

    pub fn is_settled_for(&self, key: &QueryKey) -> bool {
        self.key.as_ref() == Some(key) && !self.is_loading()
    }
}

/// A view's subscription to one query at a time.
pub struct QueryObserver<T> {
    cache: QueryCache<T>,
    keep_previous_data: bool,
    generation: Arc<AtomicU64>,
    state: Arc<watch::Sender<QueryState<T>>>,
}

impl<T: Clone + Send + Sync + 'static> QueryObserver<T> {
    pub fn new(cache: QueryCache<T>, keep_previous_data: bool) -> Self {
        let (state, _) = watch::channel(QueryState::default());
        Self {
            cache,
            keep_previous_data,
            generation: Arc::new(AtomicU64::new(0)),
            state: Arc::new(state),
        }
    }

    pub fn cache(&self) -> &QueryCache<T> {
        &self.cache
    }

    pub fn state(&self) -> QueryState<T> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<QueryState<T>> {
        self.state.subscribe()
    }

    /// Point the observer at `key`.
    ///
    /// The state switches to the new key before this returns. Until the next
    /// `set_query`, every later result for `key` is applied, including
    /// background revalidations, and invalidating `key` calls `fetcher`
    /// again.
    pub fn set_query<F, Fut>(&self, key: QueryKey, fetcher: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let events = self.cache.subscribe();

        let fresh = self.cache.peek_fresh(&key);
        let fetch_now = fresh.is_none();
        match fresh {
            Some(data) => self.state.send_modify(|state| {
                state.key = Some(key.clone());
                state.status = QueryStatus::Success;
                state.data = Some(data);
                state.error = None;
                state.is_placeholder = false;
            }),
            None => {
                let keep_previous_data = self.keep_previous_data;
                self.state.send_modify(|state| {
                    state.key = Some(key.clone());
                    state.status = QueryStatus::Loading;
                    state.error = None;
                    if keep_previous_data {
                        state.is_placeholder = state.data.is_some();
                    } else {
                        state.data = None;
                        state.is_placeholder = false;
                    }
                });
            }
        }

        let follower = Follower {
            cache: self.cache.clone(),
            key,
            generation,
            active: Arc::clone(&self.generation),
            state: Arc::clone(&self.state),
        };
        tokio::spawn(follower.run(events, fetcher, fetch_now));
    }
}

impl<T> Drop for QueryObserver<T> {
    fn drop(&mut self) {
        // Retires the follower task at its next event.
        self.generation.fetch_add(1, Ordering::SeqCst);
    }
}

/// Background task that keeps one observer in step with one key.
struct Follower<T> {
    cache: QueryCache<T>,
    key: QueryKey,
    generation: u64,
    active: Arc<AtomicU64>,
    state: Arc<watch::Sender<QueryState<T>>>,
}

impl<T: Clone + Send + Sync + 'static> Follower<T> {
    fn is_current(&self) -> bool {
        self.active.load(Ordering::SeqCst) == self.generation
    }

    /// Publish `result`; false once the observer has moved on.
    fn apply(&self, result: QueryResult<T>) -> bool {
        self.state.send_if_modified(|state| {
            if !self.is_current() {
                debug!(key = %self.key, "discarding response for superseded query");
                return false;
            }
            match result {
                Ok(data) => {
                    state.status = QueryStatus::Success;
                    state.data = Some(data);
                    state.error = None;
                    state.is_placeholder = false;
                }
                Err(error) => {
                    state.status = QueryStatus::Error;
                    state.error = Some(error);
                }
            }
            true
        })
    }

    async fn run<F, Fut>(self, mut events: broadcast::Receiver<CacheEvent<T>>, fetcher: F, fetch_now: bool)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    {
        if fetch_now {
            let result = self.cache.fetch(self.key.clone(), &fetcher).await;
            if !self.apply(result) {
                return;
            }
        }

        loop {
            match events.recv().await {
                Ok(CacheEvent::Settled(key, result)) if key == self.key => {
                    if !self.apply(result) {
                        return;
                    }
                }
                Ok(CacheEvent::Invalidated(resource, key))
                    if resource == self.key.resource
                        && key.as_ref().map_or(true, |k| *k == self.key) =>
                {
                    if !self.is_current() {
                        return;
                    }
                    debug!(key = %self.key, "refetching invalidated query");
                    // The outcome arrives as a `Settled` event.
                    let _ = self.cache.fetch(self.key.clone(), &fetcher).await;
                }
                Ok(_) => {
                    if !self.is_current() {
                        return;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(key = %self.key, skipped, "observer lagged behind cache events");
                }
                Err(broadcast::error::RecvError::Closed) => return,
            }
        }
    }
}
