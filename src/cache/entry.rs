//! Cache entries and the snapshots handed out to readers.

use futures::future::{BoxFuture, Shared};
use std::any::Any;
use std::sync::Arc;
use tokio::time::{Duration, Instant};

use crate::error::FetchError;

/// Type-erased cached value. The cache never looks inside.
pub(crate) type AnyValue = Arc<dyn Any + Send + Sync>;

/// A fetch shared by every caller attached to it.
pub(crate) type SharedFetch = Shared<BoxFuture<'static, Result<AnyValue, FetchError>>>;

/// Lifecycle status of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryStatus {
  /// No data and nothing running
  Idle,
  /// A fetch is in flight (data from an earlier fetch may still be present)
  Fetching,
  /// The last fetch or write succeeded
  Success,
  /// The last fetch failed; earlier data is kept for display
  Error,
}

/// The currently executing fetch for one key.
pub(crate) struct InFlightRequest {
  /// Epoch at which the fetch started, also its identity
  pub id: u64,
  pub future: SharedFetch,
}

/// Per-key state, owned exclusively by the cache.
pub(crate) struct CacheEntry {
  pub data: Option<AnyValue>,
  pub fetched_at: Option<Instant>,
  pub ttl: Duration,
  pub status: QueryStatus,
  pub error: Option<FetchError>,
  /// Set by explicit invalidation, cleared by a fetch started afterwards
  pub invalidated: bool,
  pub invalidated_epoch: u64,
  /// Epoch of the last direct write
  pub written_epoch: u64,
  pub in_flight: Option<InFlightRequest>,
}

impl CacheEntry {
  pub fn new(ttl: Duration) -> Self {
    Self {
      data: None,
      fetched_at: None,
      ttl,
      status: QueryStatus::Idle,
      error: None,
      invalidated: false,
      invalidated_epoch: 0,
      written_epoch: 0,
      in_flight: None,
    }
  }

  /// `now - fetched_at >= ttl`, or explicitly invalidated, or never fetched.
  pub fn is_stale(&self, now: Instant) -> bool {
    if self.invalidated {
      return true;
    }
    match self.fetched_at {
      Some(fetched_at) => now.saturating_duration_since(fetched_at) >= self.ttl,
      None => true,
    }
  }

  /// Whether a read has to go to the network.
  pub fn needs_fetch(&self, now: Instant) -> bool {
    self.data.is_none() || self.status == QueryStatus::Error || self.is_stale(now)
  }

  /// Typed view of this entry.
  pub fn snapshot<T: Send + Sync + 'static>(&self, now: Instant) -> QueryResult<T> {
    let data = self
      .data
      .clone()
      .and_then(|value| value.downcast::<T>().ok());
    QueryResult {
      status: self.status,
      data,
      error: self.error.clone(),
      is_stale: self.is_stale(now),
      fetched_at: self.fetched_at,
    }
  }
}

/// What a reader sees for one key.
#[derive(Debug)]
pub struct QueryResult<T> {
  pub status: QueryStatus,
  /// Last successful value, kept across later failures
  pub data: Option<Arc<T>>,
  pub error: Option<FetchError>,
  pub is_stale: bool,
  pub fetched_at: Option<Instant>,
}

impl<T> QueryResult<T> {
  /// Result for a key the cache has never seen.
  pub fn idle() -> Self {
    Self {
      status: QueryStatus::Idle,
      data: None,
      error: None,
      is_stale: true,
      fetched_at: None,
    }
  }

  pub fn is_loading(&self) -> bool {
    self.status == QueryStatus::Fetching
  }

  pub fn is_success(&self) -> bool {
    self.status == QueryStatus::Success
  }

  pub fn is_error(&self) -> bool {
    self.status == QueryStatus::Error
  }

  pub fn data(&self) -> Option<&T> {
    self.data.as_deref()
  }

  pub fn error(&self) -> Option<&FetchError> {
    self.error.as_ref()
  }
}

impl<T> Clone for QueryResult<T> {
  fn clone(&self) -> Self {
    Self {
      status: self.status,
      data: self.data.clone(),
      error: self.error.clone(),
      is_stale: self.is_stale,
      fetched_at: self.fetched_at,
    }
  }
}
