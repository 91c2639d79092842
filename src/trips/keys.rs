//! Cache keys for trip queries.

use serde_json::Value;

use super::filters::TripFilters;
use super::types::{Pagination, TripStatus};
use crate::cache::{QueryKey, QueryKind};

pub const NAMESPACE: &str = "trips";

/// Number of trips shown by the recent-trips query when none is given.
pub const DEFAULT_RECENT_LIMIT: u32 = 5;

/// Every cached trip query.
#[derive(Clone, Debug, PartialEq)]
pub enum TripQuery {
  /// One page of the filtered list
  List {
    filters: TripFilters,
    page: Pagination,
  },
  /// A single trip with all relations
  Detail { id: String },
  /// Aggregates, optionally for one company
  Stats { company_id: Option<String> },
  /// The most recently created trips
  Recent { limit: u32 },
  /// One page of trips in a status
  ByStatus {
    status: TripStatus,
    page: Pagination,
  },
}

impl TripQuery {
  pub fn kind(&self) -> QueryKind {
    match self {
      Self::List { .. } => QueryKind::List,
      Self::Detail { .. } => QueryKind::Detail,
      Self::Stats { .. } => QueryKind::Stats,
      Self::Recent { .. } => QueryKind::Recent,
      Self::ByStatus { .. } => QueryKind::ByStatus,
    }
  }

  pub fn key(&self) -> QueryKey {
    let base = QueryKey::new(NAMESPACE).kind_segment(self.kind());
    match self {
      Self::List { filters, page } => base.push(filters.key_segment()).push(page.key_segment()),
      Self::Detail { id } => base.push(id.as_str()),
      Self::Stats { company_id } => base.push(
        company_id
          .as_deref()
          .map(Value::from)
          .unwrap_or(Value::Null),
      ),
      Self::Recent { limit } => base.push(*limit),
      Self::ByStatus { status, page } => base.push(status.as_str()).push(page.key_segment()),
    }
  }

  /// Human-readable label used in logs and the dashboard.
  pub fn description(&self) -> String {
    match self {
      Self::List { page, .. } => format!("trips page {}", page.page),
      Self::Detail { id } => format!("trip {}", id),
      Self::Stats { company_id } => match company_id {
        Some(id) => format!("trip stats for company {}", id),
        None => "trip stats".to_string(),
      },
      Self::Recent { limit } => format!("{} most recent trips", limit),
      Self::ByStatus { status, page } => format!("{} trips page {}", status, page.page),
    }
  }
}

impl From<&TripQuery> for QueryKey {
  fn from(query: &TripQuery) -> Self {
    query.key()
  }
}

/// Prefixes used for bulk invalidation.
pub mod trip_keys {
  use super::NAMESPACE;
  use crate::cache::{QueryKey, QueryKind};

  pub fn all() -> QueryKey {
    QueryKey::new(NAMESPACE)
  }

  pub fn lists() -> QueryKey {
    all().kind_segment(QueryKind::List)
  }

  pub fn details() -> QueryKey {
    all().kind_segment(QueryKind::Detail)
  }

  pub fn detail(id: &str) -> QueryKey {
    details().push(id)
  }

  pub fn stats() -> QueryKey {
    all().kind_segment(QueryKind::Stats)
  }

  pub fn recent() -> QueryKey {
    all().kind_segment(QueryKind::Recent)
  }

  pub fn by_status() -> QueryKey {
    all().kind_segment(QueryKind::ByStatus)
  }
}
