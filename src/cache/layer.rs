//! The query cache: keyed results, staleness, in-flight deduplication and
//! change notification.

use futures::FutureExt;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::time::{Duration, Instant};
use tracing::{debug, warn};

use super::entry::{AnyValue, CacheEntry, InFlightRequest, QueryResult, QueryStatus, SharedFetch};
use super::key::QueryKey;
use super::subscription::{CacheEvent, ChangeKind, Listeners, Subscription};
use crate::config::CacheConfig;
use crate::error::{FetchError, GatewayError};

/// Per-read options.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
  /// Overrides the TTL configured for the key's kind
  pub ttl: Option<Duration>,
}

impl ReadOptions {
  pub fn with_ttl(ttl: Duration) -> Self {
    Self { ttl: Some(ttl) }
  }
}

struct State {
  entries: HashMap<QueryKey, CacheEntry>,
  /// Fetches still running for keys that were evicted mid-flight. A new
  /// fetch for the same key waits for these before calling its fetcher.
  orphans: HashMap<QueryKey, InFlightRequest>,
  /// Monotonic counter shared by fetch ids, writes and invalidation marks
  epoch: u64,
}

struct Inner {
  config: CacheConfig,
  state: Mutex<State>,
  listeners: Arc<Mutex<Listeners>>,
}

/// Keyed cache of query results.
///
/// Cloning is cheap and every clone shares the same entries. Construct one
/// per view tree (or per test) and pass it down.
///
/// Reads that need the network spawn the fetch onto the current tokio
/// runtime, so `read` and `fetch` must be called from within one.
#[derive(Clone)]
pub struct QueryCache {
  inner: Arc<Inner>,
}

impl QueryCache {
  pub fn new(config: CacheConfig) -> Self {
    Self {
      inner: Arc::new(Inner {
        config,
        state: Mutex::new(State {
          entries: HashMap::new(),
          orphans: HashMap::new(),
          epoch: 0,
        }),
        listeners: Arc::new(Mutex::new(Listeners::default())),
      }),
    }
  }

  pub fn config(&self) -> &CacheConfig {
    &self.inner.config
  }

  /// Snapshot of `key`, starting a fetch when the entry is missing, stale or
  /// failed and nothing is in flight yet.
  ///
  /// Never fails: fetch errors land in the entry and reach subscribers.
  pub fn read<T, F, Fut>(&self, key: &QueryKey, fetcher: F, options: ReadOptions) -> QueryResult<T>
  where
    T: Send + Sync + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, GatewayError>> + Send + 'static,
  {
    let ttl = self.ttl_for(key, options);
    let (snapshot, started) = {
      let mut state = self.lock_state();
      let now = Instant::now();
      let entry = entry_mut(&mut state, key, ttl);

      if entry.in_flight.is_some() {
        debug!(key = %key, "attaching to in-flight fetch");
        (entry.snapshot(now), false)
      } else if !entry.needs_fetch(now) {
        debug!(key = %key, "cache hit");
        (entry.snapshot(now), false)
      } else {
        self.start_fetch(&mut state, key, fetcher);
        let snapshot = state
          .entries
          .get(key)
          .map(|entry| entry.snapshot(now))
          .unwrap_or_else(QueryResult::idle);
        (snapshot, true)
      }
    };

    if started {
      self.notify(key, QueryStatus::Fetching, ChangeKind::Updated);
    }
    snapshot
  }

  /// Like [`read`](Self::read), but waits for the value.
  ///
  /// Returns the cached value when fresh, otherwise joins the in-flight fetch
  /// for `key` (starting one if needed).
  pub async fn fetch<T, F, Fut>(
    &self,
    key: &QueryKey,
    fetcher: F,
    options: ReadOptions,
  ) -> Result<Arc<T>, FetchError>
  where
    T: Send + Sync + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, GatewayError>> + Send + 'static,
  {
    let ttl = self.ttl_for(key, options);
    let (pending, started) = {
      let mut state = self.lock_state();
      let now = Instant::now();
      let entry = entry_mut(&mut state, key, ttl);

      if let Some(request) = &entry.in_flight {
        debug!(key = %key, "attaching to in-flight fetch");
        (request.future.clone(), false)
      } else {
        let fresh = if entry.needs_fetch(now) {
          None
        } else {
          entry.data.clone()
        };
        match fresh.map(|value| value.downcast::<T>()) {
          Some(Ok(value)) => {
            debug!(key = %key, "cache hit");
            return Ok(value);
          }
          Some(Err(_)) => return Err(type_mismatch(key)),
          None => (self.start_fetch(&mut state, key, fetcher), true),
        }
      }
    };

    if started {
      self.notify(key, QueryStatus::Fetching, ChangeKind::Updated);
    }
    let value = pending.await?;
    value.downcast::<T>().map_err(|_| type_mismatch(key))
  }

  /// Snapshot of `key` without side effects.
  pub fn peek<T: Send + Sync + 'static>(&self, key: &QueryKey) -> QueryResult<T> {
    let state = self.lock_state();
    state
      .entries
      .get(key)
      .map(|entry| entry.snapshot(Instant::now()))
      .unwrap_or_else(QueryResult::idle)
  }

  /// Mark every entry at or under `prefix` stale, keeping its data.
  ///
  /// A fetch already in flight for a matching key still settles into the
  /// entry, but leaves it stale so the next read goes to the network again.
  pub fn invalidate(&self, prefix: &QueryKey) -> usize {
    let touched: Vec<(QueryKey, QueryStatus)> = {
      let mut state = self.lock_state();
      state.epoch += 1;
      let epoch = state.epoch;
      state
        .entries
        .iter_mut()
        .filter(|(key, _)| key.starts_with(prefix))
        .map(|(key, entry)| {
          entry.invalidated = true;
          entry.invalidated_epoch = epoch;
          (key.clone(), entry.status)
        })
        .collect()
    };

    debug!(prefix = %prefix, count = touched.len(), "invalidated");
    for (key, status) in &touched {
      self.notify(key, *status, ChangeKind::Invalidated);
    }
    touched.len()
  }

  /// Evict every entry at or under `prefix`.
  ///
  /// In-flight fetches for evicted keys still run to completion for whoever
  /// awaits them, but their results are not written back. The next fetch
  /// for such a key starts its fetcher only once the evicted one is done.
  pub fn remove(&self, prefix: &QueryKey) -> usize {
    let removed: Vec<QueryKey> = {
      let mut state = self.lock_state();
      let keys: Vec<QueryKey> = state
        .entries
        .keys()
        .filter(|key| key.starts_with(prefix))
        .cloned()
        .collect();
      for key in &keys {
        let in_flight = state.entries.remove(key).and_then(|entry| entry.in_flight);
        if let Some(request) = in_flight {
          state.orphans.insert(key.clone(), request);
        }
      }
      keys
    };

    debug!(prefix = %prefix, count = removed.len(), "removed");
    for key in &removed {
      self.notify(key, QueryStatus::Idle, ChangeKind::Removed);
    }
    removed.len()
  }

  /// Overwrite the entry for `key` with a fresh value.
  ///
  /// A fetch that started before the write may still settle over it, but
  /// leaves the entry stale so the next read goes to the network again.
  pub fn write<T: Send + Sync + 'static>(&self, key: &QueryKey, value: T) {
    let ttl = self.ttl_for(key, ReadOptions::default());
    {
      let mut state = self.lock_state();
      state.epoch += 1;
      let epoch = state.epoch;
      let entry = entry_mut(&mut state, key, ttl);
      entry.written_epoch = epoch;
      entry.data = Some(Arc::new(value));
      entry.fetched_at = Some(Instant::now());
      entry.status = QueryStatus::Success;
      entry.error = None;
      entry.invalidated = false;
    }
    debug!(key = %key, fingerprint = %key.fingerprint(), "written");
    self.notify(key, QueryStatus::Success, ChangeKind::Updated);
  }

  /// Call `listener` whenever the entry for `key` changes.
  pub fn subscribe<L>(&self, key: &QueryKey, listener: L) -> Subscription
  where
    L: Fn(&CacheEvent) + Send + Sync + 'static,
  {
    let id = self
      .inner
      .listeners
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .add(key.clone(), Arc::new(listener));
    Subscription::new(key.clone(), id, &self.inner.listeners)
  }

  pub fn contains(&self, key: &QueryKey) -> bool {
    self.lock_state().entries.contains_key(key)
  }

  pub fn len(&self) -> usize {
    self.lock_state().entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn is_fetching(&self, key: &QueryKey) -> bool {
    self
      .lock_state()
      .entries
      .get(key)
      .is_some_and(|entry| entry.in_flight.is_some())
  }

  /// `None` if the key has no entry.
  pub fn is_stale(&self, key: &QueryKey) -> Option<bool> {
    self
      .lock_state()
      .entries
      .get(key)
      .map(|entry| entry.is_stale(Instant::now()))
  }

  pub fn listener_count(&self, key: &QueryKey) -> usize {
    self
      .inner
      .listeners
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .count(key)
  }

  fn ttl_for(&self, key: &QueryKey, options: ReadOptions) -> Duration {
    options
      .ttl
      .unwrap_or_else(|| self.inner.config.ttl_for(key.kind()))
  }

  fn lock_state(&self) -> MutexGuard<'_, State> {
    self
      .inner
      .state
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
  }

  /// Register an in-flight request for `key` and drive it on a spawned task.
  fn start_fetch<T, F, Fut>(&self, state: &mut State, key: &QueryKey, fetcher: F) -> SharedFetch
  where
    T: Send + Sync + 'static,
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, GatewayError>> + Send + 'static,
  {
    state.epoch += 1;
    let id = state.epoch;
    let cache = Arc::downgrade(&self.inner);
    let settle_key = key.clone();
    let evicted = state.orphans.get(key).map(|request| request.future.clone());

    let future = async move {
      if let Some(evicted) = evicted {
        // Its outcome belongs to the evicted entry
        let _ = evicted.await;
      }
      let result = fetcher()
        .await
        .map(|value| Arc::new(value) as AnyValue)
        .map_err(FetchError::new);
      settle(&cache, &settle_key, id, &result);
      result
    }
    .boxed()
    .shared();

    if let Some(entry) = state.entries.get_mut(key) {
      entry.status = QueryStatus::Fetching;
      entry.in_flight = Some(InFlightRequest {
        id,
        future: future.clone(),
      });
    }

    debug!(key = %key, fingerprint = %key.fingerprint(), id, "fetch started");
    tokio::spawn(future.clone());
    future
  }

  fn notify(&self, key: &QueryKey, status: QueryStatus, change: ChangeKind) {
    notify(&self.inner, key, status, change);
  }
}

fn entry_mut<'a>(state: &'a mut State, key: &QueryKey, ttl: Duration) -> &'a mut CacheEntry {
  let entry = state
    .entries
    .entry(key.clone())
    .or_insert_with(|| CacheEntry::new(ttl));
  entry.ttl = ttl;
  entry
}

fn type_mismatch(key: &QueryKey) -> FetchError {
  FetchError::new(GatewayError::TypeMismatch {
    key: key.to_string(),
  })
}

/// Apply a finished fetch to its entry, unless the entry was evicted or the
/// request is no longer the registered one.
fn settle(cache: &Weak<Inner>, key: &QueryKey, id: u64, result: &Result<AnyValue, FetchError>) {
  let Some(inner) = cache.upgrade() else {
    return;
  };

  let status = {
    let mut state = inner.state.lock().unwrap_or_else(PoisonError::into_inner);
    if state.orphans.get(key).is_some_and(|request| request.id == id) {
      state.orphans.remove(key);
    }
    let Some(entry) = state.entries.get_mut(key) else {
      debug!(key = %key, id, "discarding result for evicted key");
      return;
    };
    if entry.in_flight.as_ref().map(|request| request.id) != Some(id) {
      debug!(key = %key, id, "discarding result of superseded fetch");
      return;
    }
    entry.in_flight = None;

    match result {
      Ok(value) => {
        entry.data = Some(Arc::clone(value));
        entry.fetched_at = Some(Instant::now());
        entry.status = QueryStatus::Success;
        entry.error = None;
        entry.invalidated = entry.invalidated_epoch > id || entry.written_epoch > id;
      }
      Err(err) => {
        warn!(key = %key, error = %err, "fetch failed");
        entry.status = QueryStatus::Error;
        entry.error = Some(err.clone());
      }
    }
    entry.status
  };

  notify(&inner, key, status, ChangeKind::Updated);
}

fn notify(inner: &Inner, key: &QueryKey, status: QueryStatus, change: ChangeKind) {
  let listeners = inner
    .listeners
    .lock()
    .unwrap_or_else(PoisonError::into_inner)
    .for_key(key);
  if listeners.is_empty() {
    return;
  }
  let event = CacheEvent {
    key: key.clone(),
    status,
    change,
  };
  for listener in listeners {
    listener(&event);
  }
}
