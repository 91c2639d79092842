//! Per-key change notification.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use super::entry::QueryStatus;
use super::key::QueryKey;

/// What happened to an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
  /// Value or status changed
  Updated,
  /// Marked stale, data retained
  Invalidated,
  /// Evicted
  Removed,
}

/// Delivered to listeners after every change to a subscribed key.
#[derive(Debug, Clone)]
pub struct CacheEvent {
  pub key: QueryKey,
  pub status: QueryStatus,
  pub change: ChangeKind,
}

pub type Listener = Arc<dyn Fn(&CacheEvent) + Send + Sync>;

#[derive(Default)]
pub(crate) struct Listeners {
  next_id: u64,
  by_key: HashMap<QueryKey, Vec<(u64, Listener)>>,
}

impl Listeners {
  pub fn add(&mut self, key: QueryKey, listener: Listener) -> u64 {
    self.next_id += 1;
    let id = self.next_id;
    self.by_key.entry(key).or_default().push((id, listener));
    id
  }

  pub fn remove(&mut self, key: &QueryKey, id: u64) {
    if let Some(list) = self.by_key.get_mut(key) {
      list.retain(|(listener_id, _)| *listener_id != id);
      if list.is_empty() {
        self.by_key.remove(key);
      }
    }
  }

  pub fn for_key(&self, key: &QueryKey) -> Vec<Listener> {
    self
      .by_key
      .get(key)
      .map(|list| list.iter().map(|(_, l)| Arc::clone(l)).collect())
      .unwrap_or_default()
  }

  pub fn count(&self, key: &QueryKey) -> usize {
    self.by_key.get(key).map_or(0, Vec::len)
  }
}

/// Keeps a listener registered until dropped.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
  key: QueryKey,
  id: u64,
  registry: Weak<Mutex<Listeners>>,
}

impl Subscription {
  pub(crate) fn new(key: QueryKey, id: u64, registry: &Arc<Mutex<Listeners>>) -> Self {
    Self {
      key,
      id,
      registry: Arc::downgrade(registry),
    }
  }

  pub fn key(&self) -> &QueryKey {
    &self.key
  }

  /// Release the listener now rather than at end of scope.
  pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
  fn drop(&mut self) {
    if let Some(registry) = self.registry.upgrade() {
      registry
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .remove(&self.key, self.id);
    }
  }
}

impl std::fmt::Debug for Subscription {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subscription")
      .field("key", &self.key)
      .field("id", &self.id)
      .finish()
  }
}
