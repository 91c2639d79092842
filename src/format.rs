//! Plain-text rendering of trips, pages and stats.

use std::collections::BTreeMap;
use std::fmt::Write;

use tripdeck::cache::QueryResult;
use tripdeck::trips::types::{Company, User};
use tripdeck::trips::{PaginatedResult, Trip, TripStats};

pub fn money(amount: Option<f64>) -> String {
  match amount {
    Some(value) => format!("{:.2}", value),
    None => "-".to_string(),
  }
}

/// One line per trip: id, status, dates, destination and title.
pub fn trip_line(trip: &Trip) -> String {
  format!(
    "{:<12} {:<11} {} -> {}  {}, {}  {}",
    trip.id,
    trip.status,
    trip.start_date,
    trip.end_date,
    trip.destination_city,
    trip.destination_country,
    trip.title
  )
}

pub fn trip_page(page: &PaginatedResult<Trip>) -> String {
  let mut out = String::new();
  if page.items.is_empty() {
    out.push_str("No trips found.\n");
  }
  for trip in &page.items {
    let _ = writeln!(out, "{}", trip_line(trip));
  }
  let _ = writeln!(
    out,
    "page {}/{} ({} trips){}{}",
    page.page,
    page.total_pages.max(1),
    page.total,
    if page.has_prev { "  [prev]" } else { "" },
    if page.has_next { "  [next]" } else { "" },
  );
  out
}

pub fn trip_list(trips: &[Trip]) -> String {
  if trips.is_empty() {
    return "No recent trips.\n".to_string();
  }
  trips.iter().map(|t| format!("{}\n", trip_line(t))).collect()
}

pub fn trip_detail(trip: &Trip) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "{} ({})", trip.title, trip.id);
  let _ = writeln!(out, "  status:      {}", trip.status);
  let _ = writeln!(out, "  purpose:     {}", trip.purpose);
  let _ = writeln!(out, "  priority:    {}", trip.priority);
  let _ = writeln!(
    out,
    "  destination: {}, {}",
    trip.destination_city, trip.destination_country
  );
  let _ = writeln!(out, "  dates:       {} -> {}", trip.start_date, trip.end_date);
  let _ = writeln!(
    out,
    "  budget:      {} (spent {})",
    money(trip.total_budget),
    money(trip.actual_cost)
  );
  if let Some(user) = &trip.user {
    let _ = writeln!(out, "  traveller:   {} {}", user.full_name, user.email);
  }
  if let Some(company) = &trip.company {
    let _ = writeln!(out, "  company:     {}", company.name);
  }
  if let Some(notes) = &trip.approval_notes {
    let _ = writeln!(out, "  notes:       {}", notes);
  }

  for stay in &trip.accommodations {
    let _ = writeln!(
      out,
      "  hotel:       {} {} -> {} [{}]",
      stay.hotel_name, stay.check_in, stay.check_out, stay.status
    );
  }
  for leg in &trip.transportation {
    let _ = writeln!(
      out,
      "  {:<12} {} -> {} [{}]",
      format!("{}:", leg.transport_type),
      leg.from_location,
      leg.to_location,
      leg.status
    );
  }
  if !trip.expenses.is_empty() {
    let total: f64 = trip.expenses.iter().map(|e| e.amount).sum();
    let _ = writeln!(out, "  expenses:    {} items, {:.2}", trip.expenses.len(), total);
  }
  for approval in &trip.trip_approvals {
    let approver = approval
      .approver
      .as_ref()
      .map(|u| u.full_name.as_str())
      .unwrap_or("unknown");
    let _ = writeln!(out, "  approval:    {} by {}", approval.status, approver);
  }
  out
}

fn counts(title: &str, values: &BTreeMap<String, u64>) -> String {
  let parts: Vec<String> = values.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
  format!("  {:<12} {}\n", title, parts.join(" "))
}

pub fn stats(stats: &TripStats) -> String {
  let mut out = String::new();
  let _ = writeln!(
    out,
    "  trips:       {} ({} upcoming, {} completed)",
    stats.total_trips, stats.upcoming_trips, stats.completed_trips
  );
  let _ = writeln!(
    out,
    "  budget:      {:.2} (spent {:.2}, avg {:.2})",
    stats.total_budget, stats.total_spent, stats.average_cost
  );
  out.push_str(&counts("by status:", &stats.by_status));
  out.push_str(&counts("by purpose:", &stats.by_purpose));
  out.push_str(&counts("by priority:", &stats.by_priority));
  out
}

pub fn companies(companies: &[Company]) -> String {
  companies
    .iter()
    .map(|c| format!("{:<12} {:<24} {}\n", c.id, c.name, c.domain))
    .collect()
}

pub fn company_detail(company: &Company) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "{} ({})", company.name, company.id);
  let _ = writeln!(out, "  domain:      {}", company.domain);
  let _ = writeln!(out, "  budget:      {:.2}", company.travel_budget);
  if let Some(policy) = &company.policy {
    let _ = writeln!(
      out,
      "  policy:      flights <= {:.2}, hotels <= {:.2}/night, approval above {:.2}",
      policy.max_flight_cost, policy.max_hotel_per_night, policy.requires_approval_above
    );
  }
  out
}

pub fn users(users: &[User]) -> String {
  users
    .iter()
    .map(|u| {
      let grade = u.travel_grade.map(|g| g.as_str()).unwrap_or("-");
      format!("{:<12} {:<24} {:<16} {}\n", u.id, u.full_name, u.department, grade)
    })
    .collect()
}

/// Section of the dashboard for one query: its body, or why there is none.
pub fn section<T>(title: &str, result: &QueryResult<T>, body: impl Fn(&T) -> String) -> String {
  let mut header = title.to_string();
  if result.is_loading() {
    header.push_str(" (refreshing)");
  } else if result.is_stale && result.data().is_some() {
    header.push_str(" (stale)");
  }

  let mut out = format!("== {} ==\n", header);
  match (result.data(), result.error()) {
    (Some(data), error) => {
      out.push_str(&body(data));
      if let Some(error) = error {
        let _ = writeln!(out, "  last refresh failed: {}", error.cause());
      }
    }
    (None, Some(error)) => {
      let _ = writeln!(out, "  error: {}", error.cause());
    }
    (None, None) => out.push_str("  loading...\n"),
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use tripdeck::trips::TripStatus;

  fn trip() -> Trip {
    serde_json::from_value(serde_json::json!({
      "id": "t-1",
      "title": "Berlin offsite",
      "description": null,
      "user_id": "u-1",
      "company_id": "c-1",
      "destination_city": "Berlin",
      "destination_country": "DE",
      "purpose": "business",
      "start_date": "2024-05-01",
      "end_date": "2024-05-03",
      "total_budget": 1500.0,
      "actual_cost": null,
      "status": "approved",
      "priority": "high",
      "approval_notes": null,
      "created_at": "2024-04-01T10:00:00+00:00",
      "updated_at": "2024-04-01T10:00:00+00:00"
    }))
    .unwrap()
  }

  #[test]
  fn test_trip_line() {
    let line = trip_line(&trip());
    assert!(line.starts_with("t-1"));
    assert!(line.contains("approved"));
    assert!(line.contains("2024-05-01 -> 2024-05-03"));
    assert!(line.ends_with("Berlin offsite"));
  }

  #[test]
  fn test_page_footer() {
    let page = PaginatedResult::new(vec![trip()], 1, 1, 3);
    let text = trip_page(&page);
    assert!(text.contains("page 1/3 (3 trips)  [next]"));
    assert!(!text.contains("[prev]"));
  }

  #[test]
  fn test_detail_shows_budget() {
    let text = trip_detail(&trip());
    assert!(text.contains("budget:      1500.00 (spent -)"));
    assert_eq!(trip().status, TripStatus::Approved);
  }

  #[test]
  fn test_company_detail_without_policy() {
    let company = Company {
      id: "c-1".to_string(),
      name: "Acme".to_string(),
      domain: "acme.test".to_string(),
      travel_budget: 50000.0,
      ..Default::default()
    };
    assert_eq!(
      company_detail(&company),
      "Acme (c-1)\n  domain:      acme.test\n  budget:      50000.00\n"
    );
  }

  #[test]
  fn test_section_without_data() {
    let result = QueryResult::<TripStats>::idle();
    let text = section("Stats", &result, stats);
    assert_eq!(text, "== Stats ==\n  loading...\n");
  }
}
