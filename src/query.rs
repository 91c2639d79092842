//! Bound query handles.
//!
//! A `Query<T>` ties together a [`QueryCache`], the [`QueryKey`] it reads
//! and the fetcher that produces a fresh value. Views hold on to queries and
//! call them on every render or tick:
//!
//! ```ignore
//! let query = trips.detail("t-1");
//! let _sub = query.subscribe(|event| redraw(event));
//!
//! match query.read() {
//!     r if r.is_loading() && r.data().is_none() => render_spinner(),
//!     r if r.is_error() => render_error(r.error()),
//!     r => render_trip(r.data()),
//! }
//! ```

use futures::future::BoxFuture;
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheEvent, QueryCache, QueryKey, QueryResult, ReadOptions, Subscription};
use crate::error::{FetchError, GatewayError};

/// Produces one fetch per call.
type FetcherFn<T> = Arc<dyn Fn() -> BoxFuture<'static, Result<T, GatewayError>> + Send + Sync>;

/// A cached query bound to its key and fetcher.
///
/// Cloning is cheap; clones share the cache entry.
pub struct Query<T> {
  cache: QueryCache,
  key: QueryKey,
  fetcher: FetcherFn<T>,
  options: ReadOptions,
}

impl<T: Send + Sync + 'static> Query<T> {
  /// The fetcher is called each time the cache decides to go to the
  /// network for `key`.
  pub fn new<F, Fut>(cache: QueryCache, key: QueryKey, fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, GatewayError>> + Send + 'static,
  {
    Self {
      cache,
      key,
      fetcher: Arc::new(move || fetcher().boxed()),
      options: ReadOptions::default(),
    }
  }

  /// Use `ttl` instead of the TTL configured for the key's kind.
  pub fn with_stale_time(mut self, ttl: Duration) -> Self {
    self.options = ReadOptions::with_ttl(ttl);
    self
  }

  pub fn key(&self) -> &QueryKey {
    &self.key
  }

  /// Current snapshot; starts a background fetch when the entry needs one.
  pub fn read(&self) -> QueryResult<T> {
    let fetcher = Arc::clone(&self.fetcher);
    self.cache.read(&self.key, move || fetcher(), self.options)
  }

  /// Current snapshot without touching the network.
  pub fn peek(&self) -> QueryResult<T> {
    self.cache.peek(&self.key)
  }

  /// Wait for a fresh value.
  pub async fn fetch(&self) -> Result<Arc<T>, FetchError> {
    let fetcher = Arc::clone(&self.fetcher);
    self.cache.fetch(&self.key, move || fetcher(), self.options).await
  }

  /// Mark the entry stale, then wait for a fresh value.
  ///
  /// Joins a fetch that is already running instead of starting another.
  pub async fn refetch(&self) -> Result<Arc<T>, FetchError> {
    self.cache.invalidate(&self.key);
    self.fetch().await
  }

  pub fn is_stale(&self) -> bool {
    self.cache.is_stale(&self.key).unwrap_or(true)
  }

  pub fn subscribe<L>(&self, listener: L) -> Subscription
  where
    L: Fn(&CacheEvent) + Send + Sync + 'static,
  {
    self.cache.subscribe(&self.key, listener)
  }
}

impl<T> Clone for Query<T> {
  fn clone(&self) -> Self {
    Self {
      cache: self.cache.clone(),
      key: self.key.clone(),
      fetcher: Arc::clone(&self.fetcher),
      options: self.options,
    }
  }
}

impl<T> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("key", &self.key)
      .field("options", &self.options)
      .finish_non_exhaustive()
  }
}
