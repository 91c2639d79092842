//! Client-side query cache sitting between the views and the remote store.
//!
//! This module is store-agnostic. It:
//! - Keeps the last result of every query under a structured [`QueryKey`]
//! - Tracks staleness per entry using a TTL chosen by the key's [`QueryKind`]
//! - Runs at most one fetch per key, attaching later readers to it
//! - Keeps previous data when a refetch fails (stale-while-error)
//! - Notifies subscribers whenever an entry changes

mod entry;
mod key;
mod layer;
mod subscription;

pub use entry::{QueryResult, QueryStatus};
pub use key::{QueryKey, QueryKind};
pub use layer::{QueryCache, ReadOptions};
pub use subscription::{CacheEvent, ChangeKind, Listener, Subscription};
