//! Client-side aggregation of trip statistics.

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;

use super::types::{TripStats, TripStatus};

/// Columns selected for the stats query.
pub const STATS_PROJECTION: &str = "status,total_budget,actual_cost,purpose,priority,start_date";

/// The slice of a trip the aggregation needs. Every column may be absent.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StatsRow {
  pub status: Option<String>,
  pub total_budget: Option<f64>,
  pub actual_cost: Option<f64>,
  pub purpose: Option<String>,
  pub priority: Option<String>,
  pub start_date: Option<NaiveDate>,
}

impl TripStats {
  /// Aggregate `rows` as seen on `today`.
  ///
  /// A trip starting after `today` is upcoming; otherwise it counts as
  /// completed when its status says so. The average cost is taken over
  /// trips that actually cost something.
  pub fn from_rows(rows: &[StatsRow], today: NaiveDate) -> Self {
    let mut stats = TripStats {
      total_trips: rows.len() as u64,
      ..Default::default()
    };

    for row in rows {
      stats.total_budget += row.total_budget.unwrap_or(0.0);
      stats.total_spent += row.actual_cost.unwrap_or(0.0);

      bump(&mut stats.by_status, row.status.as_deref());
      bump(&mut stats.by_purpose, row.purpose.as_deref());
      bump(&mut stats.by_priority, row.priority.as_deref());

      if let Some(start) = row.start_date {
        if start > today {
          stats.upcoming_trips += 1;
        } else if row.status.as_deref() == Some(TripStatus::Completed.as_str()) {
          stats.completed_trips += 1;
        }
      }
    }

    let with_cost = rows
      .iter()
      .filter(|row| row.actual_cost.is_some_and(|cost| cost > 0.0))
      .count();
    if with_cost > 0 {
      stats.average_cost = stats.total_spent / with_cost as f64;
    }

    stats
  }
}

fn bump(counts: &mut BTreeMap<String, u64>, value: Option<&str>) {
  if let Some(value) = value.filter(|v| !v.is_empty()) {
    *counts.entry(value.to_string()).or_insert(0) += 1;
  }
}
