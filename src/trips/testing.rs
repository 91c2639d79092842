//! In-memory `TripStore` for tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use super::filters::TripFilters;
use super::gateway::TripStore;
use super::stats::StatsRow;
use super::types::{
  PaginatedResult, Pagination, Trip, TripForm, TripPatch, TripPriority, TripPurpose, TripStats,
  TripStatus,
};
use crate::error::{GatewayError, RemoteError};

pub fn sample_trip(id: &str, status: TripStatus) -> Trip {
  Trip {
    id: id.to_string(),
    title: format!("Trip {}", id),
    description: None,
    user_id: "u-1".to_string(),
    company_id: "c-1".to_string(),
    destination_city: "Berlin".to_string(),
    destination_country: "DE".to_string(),
    purpose: TripPurpose::Business,
    start_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
    end_date: NaiveDate::from_ymd_opt(2024, 5, 3).unwrap(),
    total_budget: Some(1000.0),
    actual_cost: Some(0.0),
    status,
    priority: TripPriority::Medium,
    approval_notes: None,
    created_at: "2024-04-01T00:00:00+00:00".to_string(),
    updated_at: "2024-04-01T00:00:00+00:00".to_string(),
    user: None,
    company: None,
    accommodations: Vec::new(),
    transportation: Vec::new(),
    trip_itineraries: Vec::new(),
    ai_recommendations: Vec::new(),
    expenses: Vec::new(),
    trip_approvals: Vec::new(),
  }
}

pub fn sample_form(title: &str) -> TripForm {
  TripForm {
    title: title.to_string(),
    description: None,
    user_id: "u-1".to_string(),
    company_id: "c-1".to_string(),
    destination_city: "Paris".to_string(),
    destination_country: "FR".to_string(),
    purpose: TripPurpose::ClientMeeting,
    start_date: NaiveDate::from_ymd_opt(2024, 7, 1).unwrap(),
    end_date: NaiveDate::from_ymd_opt(2024, 7, 2).unwrap(),
    total_budget: Some(800.0),
    priority: TripPriority::High,
  }
}

/// Trips kept in insertion order, with per-operation call counts.
#[derive(Default)]
pub struct FakeStore {
  trips: Mutex<Vec<Trip>>,
  next_id: AtomicU32,
  fail: AtomicBool,
  calls: Mutex<HashMap<&'static str, u32>>,
}

impl FakeStore {
  pub fn with_trips(trips: Vec<Trip>) -> Self {
    Self {
      trips: Mutex::new(trips),
      ..Default::default()
    }
  }

  /// Make every following call fail with a 500.
  pub fn fail_all(&self, fail: bool) {
    self.fail.store(fail, Ordering::SeqCst);
  }

  pub fn calls(&self, operation: &str) -> u32 {
    self.calls.lock().unwrap().get(operation).copied().unwrap_or(0)
  }

  pub fn stored(&self, id: &str) -> Option<Trip> {
    self.trips.lock().unwrap().iter().find(|t| t.id == id).cloned()
  }

  fn enter(&self, operation: &'static str) -> Result<(), GatewayError> {
    *self.calls.lock().unwrap().entry(operation).or_insert(0) += 1;
    if self.fail.load(Ordering::SeqCst) {
      return Err(
        RemoteError {
          status: 500,
          body: format!("{} unavailable", operation),
        }
        .into(),
      );
    }
    Ok(())
  }

  fn not_found(id: &str) -> GatewayError {
    GatewayError::NotFound {
      entity: "trip",
      id: id.to_string(),
    }
  }
}

#[async_trait]
impl TripStore for FakeStore {
  async fn list_trips(
    &self,
    filters: &TripFilters,
    page: Pagination,
  ) -> Result<PaginatedResult<Trip>, GatewayError> {
    self.enter("list_trips")?;
    let trips = self.trips.lock().unwrap();
    let matching: Vec<Trip> = trips
      .iter()
      .rev()
      .filter(|t| filters.status.is_none_or(|s| t.status == s))
      .filter(|t| filters.company_id.as_ref().is_none_or(|c| &t.company_id == c))
      .cloned()
      .collect();
    let total = matching.len() as u64;
    let items = matching
      .into_iter()
      .skip(page.offset() as usize)
      .take(page.limit as usize)
      .collect();
    Ok(PaginatedResult::new(items, page.page, page.limit, total))
  }

  async fn get_trip(&self, id: &str) -> Result<Trip, GatewayError> {
    self.enter("get_trip")?;
    self.stored(id).ok_or_else(|| Self::not_found(id))
  }

  async fn create_trip(&self, form: &TripForm) -> Result<Trip, GatewayError> {
    self.enter("create_trip")?;
    let id = format!("new-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
    let mut trip = sample_trip(&id, TripStatus::Draft);
    trip.title = form.title.clone();
    trip.destination_city = form.destination_city.clone();
    trip.destination_country = form.destination_country.clone();
    trip.purpose = form.purpose;
    trip.priority = form.priority;
    trip.start_date = form.start_date;
    trip.end_date = form.end_date;
    trip.total_budget = form.total_budget;
    self.trips.lock().unwrap().push(trip.clone());
    Ok(trip)
  }

  async fn update_trip(&self, id: &str, patch: &TripPatch) -> Result<Trip, GatewayError> {
    self.enter("update_trip")?;
    let mut trips = self.trips.lock().unwrap();
    let trip = trips
      .iter_mut()
      .find(|t| t.id == id)
      .ok_or_else(|| Self::not_found(id))?;
    if let Some(title) = &patch.title {
      trip.title = title.clone();
    }
    if let Some(status) = patch.status {
      trip.status = status;
    }
    if let Some(notes) = &patch.approval_notes {
      trip.approval_notes = Some(notes.clone());
    }
    if let Some(budget) = patch.total_budget {
      trip.total_budget = Some(budget);
    }
    Ok(trip.clone())
  }

  async fn delete_trip(&self, id: &str) -> Result<(), GatewayError> {
    self.enter("delete_trip")?;
    self.trips.lock().unwrap().retain(|t| t.id != id);
    Ok(())
  }

  async fn trip_stats(&self, company_id: Option<&str>) -> Result<TripStats, GatewayError> {
    self.enter("trip_stats")?;
    let rows: Vec<StatsRow> = self
      .trips
      .lock()
      .unwrap()
      .iter()
      .filter(|t| company_id.is_none_or(|c| t.company_id == c))
      .map(|t| StatsRow {
        status: Some(t.status.as_str().to_string()),
        total_budget: t.total_budget,
        actual_cost: t.actual_cost,
        purpose: Some(t.purpose.as_str().to_string()),
        priority: Some(t.priority.as_str().to_string()),
        start_date: Some(t.start_date),
      })
      .collect();
    Ok(TripStats::from_rows(
      &rows,
      NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
    ))
  }

  async fn recent_trips(&self, limit: u32) -> Result<Vec<Trip>, GatewayError> {
    self.enter("recent_trips")?;
    Ok(
      self
        .trips
        .lock()
        .unwrap()
        .iter()
        .rev()
        .take(limit as usize)
        .cloned()
        .collect(),
    )
  }
}
