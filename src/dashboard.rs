//! Live dashboard: recent trips, the first page of the list and stats,
//! redrawn whenever one of their cache entries changes.

use color_eyre::Result;
use std::time::Duration;
use tracing::{debug, info};

use crate::app::App;
use crate::event::{Event, EventHandler};
use crate::format;
use tripdeck::cache::QueryResult;
use tripdeck::query::Query;
use tripdeck::trips::keys::DEFAULT_RECENT_LIMIT;
use tripdeck::trips::{PaginatedResult, Pagination, Trip, TripFilters, TripStats};

struct Panels {
  list: Query<PaginatedResult<Trip>>,
  stats: Query<TripStats>,
  recent: Query<Vec<Trip>>,
}

/// Snapshot of a panel. Only `refresh` may start fetches, so a failing
/// query is retried once per tick rather than on every redraw.
fn snapshot<T: Send + Sync + 'static>(query: &Query<T>, refresh: bool) -> QueryResult<T> {
  if refresh {
    query.read()
  } else {
    query.peek()
  }
}

impl Panels {
  fn render(&self, refresh: bool) -> String {
    let mut out = String::from("\x1b[2J\x1b[H");
    out.push_str(&format::section(
      "Recent trips",
      &snapshot(&self.recent, refresh),
      |trips| format::trip_list(trips),
    ));
    out.push('\n');
    out.push_str(&format::section("Trips", &snapshot(&self.list, refresh), format::trip_page));
    out.push('\n');
    out.push_str(&format::section("Stats", &snapshot(&self.stats, refresh), format::stats));
    out.push_str("\nCtrl-C to quit\n");
    out
  }
}

pub async fn run(app: &App, refresh: Duration, company: Option<String>) -> Result<()> {
  let filters = TripFilters {
    company_id: company.clone(),
    ..Default::default()
  };
  let panels = Panels {
    list: app
      .trips
      .list(filters, Pagination::new(1, app.config.default_page_size)),
    stats: app.trips.stats(company.as_deref()),
    recent: app.trips.recent(DEFAULT_RECENT_LIMIT),
  };

  let mut events = EventHandler::new(refresh);
  let _subscriptions = [
    panels.list.subscribe(events.cache_listener()),
    panels.stats.subscribe(events.cache_listener()),
    panels.recent.subscribe(events.cache_listener()),
  ];

  info!(refresh_secs = refresh.as_secs(), "dashboard started");
  print!("{}", panels.render(true));

  while let Some(event) = events.next().await {
    match event {
      Event::Cache(change) => {
        debug!(key = %change.key, status = ?change.status, change = ?change.change, "redraw");
        print!("{}", panels.render(false));
      }
      Event::Tick => {
        // Reading re-checks TTLs; any refetch shows up as cache events
        print!("{}", panels.render(true));
      }
      Event::Quit => break,
    }
  }

  info!("dashboard stopped");
  Ok(())
}
