use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;
use tripdeck::cache::CacheEvent;

/// Dashboard events
#[derive(Debug)]
pub enum Event {
  /// A subscribed cache entry changed
  Cache(CacheEvent),
  /// Periodic tick; re-reading on it lets TTL expiry trigger refetches
  Tick,
  /// Ctrl-C
  Quit,
}

/// Merges cache notifications, a tick timer and Ctrl-C into one stream
pub struct EventHandler {
  tx: mpsc::UnboundedSender<Event>,
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler with the given tick rate
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    let tick_tx = tx.clone();
    tokio::spawn(async move {
      let mut interval = tokio::time::interval(tick_rate);
      // The first tick completes immediately
      interval.tick().await;
      loop {
        interval.tick().await;
        if tick_tx.send(Event::Tick).is_err() {
          break;
        }
      }
    });

    let quit_tx = tx.clone();
    tokio::spawn(async move {
      if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c");
        return;
      }
      let _ = quit_tx.send(Event::Quit);
    });

    Self { tx, rx }
  }

  /// A cache listener that forwards every event into this handler
  pub fn cache_listener(&self) -> impl Fn(&CacheEvent) + Send + Sync + 'static {
    let tx = self.tx.clone();
    move |event: &CacheEvent| {
      // Receiver gone means the dashboard is shutting down
      let _ = tx.send(Event::Cache(event.clone()));
    }
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use tripdeck::cache::{ChangeKind, QueryKey, QueryStatus};

  #[tokio::test(start_paused = true)]
  async fn test_ticks_follow_rate() {
    let mut events = EventHandler::new(Duration::from_secs(5));
    tokio::time::advance(Duration::from_secs(5)).await;
    assert!(matches!(events.next().await, Some(Event::Tick)));
  }

  #[tokio::test]
  async fn test_cache_events_are_forwarded() {
    let mut events = EventHandler::new(Duration::from_secs(3600));
    let listener = events.cache_listener();
    listener(&CacheEvent {
      key: QueryKey::new("trips"),
      status: QueryStatus::Success,
      change: ChangeKind::Updated,
    });

    match events.next().await {
      Some(Event::Cache(event)) => assert_eq!(event.key, QueryKey::new("trips")),
      other => panic!("unexpected event {other:?}"),
    }
  }
}
