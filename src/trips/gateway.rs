//! Trip reads and writes against the remote store.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;

use super::filters::TripFilters;
use super::stats::{StatsRow, STATS_PROJECTION};
use super::types::{PaginatedResult, Pagination, Trip, TripForm, TripPatch, TripStats, TripStatus};
use crate::error::GatewayError;
use crate::rest::{QueryParams, RestClient};

const TABLE: &str = "trips";

/// Projection for list pages.
pub const LIST_PROJECTION: &str = "
  *,
  users(id, full_name, department, travel_grade),
  companies(id, name, policy),
  accommodations(*),
  transportation(*),
  trip_itineraries(*),
  ai_recommendations(*),
  expenses(*),
  trip_approvals(*, users(full_name))
";

/// Projection for a single trip; adds contact fields to the list projection.
pub const DETAIL_PROJECTION: &str = "
  *,
  users(id, full_name, department, travel_grade, email),
  companies(id, name, policy, domain),
  accommodations(*),
  transportation(*),
  trip_itineraries(*),
  ai_recommendations(*),
  expenses(*),
  trip_approvals(*, users(full_name, email))
";

pub const RECENT_PROJECTION: &str = "
  *,
  users(full_name, department),
  companies(name)
";

const NEWEST_FIRST: &str = "created_at.desc";

/// Every trip operation the cache and mutation layers need.
#[async_trait]
pub trait TripStore: Send + Sync {
  async fn list_trips(
    &self,
    filters: &TripFilters,
    page: Pagination,
  ) -> Result<PaginatedResult<Trip>, GatewayError>;

  /// Fails with `NotFound` when no trip has `id`.
  async fn get_trip(&self, id: &str) -> Result<Trip, GatewayError>;

  /// Inserts a draft trip with no spend yet.
  async fn create_trip(&self, form: &TripForm) -> Result<Trip, GatewayError>;

  async fn update_trip(&self, id: &str, patch: &TripPatch) -> Result<Trip, GatewayError>;

  async fn delete_trip(&self, id: &str) -> Result<(), GatewayError>;

  async fn trip_stats(&self, company_id: Option<&str>) -> Result<TripStats, GatewayError>;

  async fn recent_trips(&self, limit: u32) -> Result<Vec<Trip>, GatewayError>;

  async fn trips_by_status(
    &self,
    status: TripStatus,
    page: Pagination,
  ) -> Result<PaginatedResult<Trip>, GatewayError> {
    self.list_trips(&TripFilters::with_status(status), page).await
  }

  async fn update_trip_status(
    &self,
    id: &str,
    status: TripStatus,
    notes: Option<&str>,
  ) -> Result<Trip, GatewayError> {
    let patch = TripPatch {
      status: Some(status),
      approval_notes: notes.map(str::to_string),
      ..Default::default()
    };
    self.update_trip(id, &patch).await
  }
}

#[derive(Serialize)]
struct NewTrip<'a> {
  #[serde(flatten)]
  form: &'a TripForm,
  status: TripStatus,
  actual_cost: f64,
  updated_at: String,
}

#[derive(Serialize)]
struct Stamped<'a, T> {
  #[serde(flatten)]
  fields: &'a T,
  updated_at: String,
}

fn now_stamp() -> String {
  Utc::now().to_rfc3339()
}

/// [`TripStore`] over the store's REST API.
#[derive(Clone)]
pub struct RestGateway {
  rest: RestClient,
}

impl RestGateway {
  pub fn new(rest: RestClient) -> Self {
    Self { rest }
  }

  pub fn rest(&self) -> &RestClient {
    &self.rest
  }

  fn by_id(id: &str) -> QueryParams {
    QueryParams::new().eq("id", id)
  }

  fn single(rows: Vec<Trip>, id: &str) -> Result<Trip, GatewayError> {
    rows.into_iter().next().ok_or_else(|| GatewayError::NotFound {
      entity: "trip",
      id: id.to_string(),
    })
  }
}

#[async_trait]
impl TripStore for RestGateway {
  async fn list_trips(
    &self,
    filters: &TripFilters,
    page: Pagination,
  ) -> Result<PaginatedResult<Trip>, GatewayError> {
    let params = filters.apply(
      QueryParams::new()
        .select(LIST_PROJECTION)
        .order(NEWEST_FIRST)
        .limit(page.limit)
        .offset(page.offset()),
    );
    let count_params = filters.apply(QueryParams::new());

    let (items, total) = tokio::try_join!(
      self.rest.get::<Vec<Trip>>(TABLE, &params),
      self.rest.count(TABLE, &count_params),
    )?;
    Ok(PaginatedResult::new(items, page.page, page.limit, total))
  }

  async fn get_trip(&self, id: &str) -> Result<Trip, GatewayError> {
    let params = Self::by_id(id).select(DETAIL_PROJECTION);
    let rows: Vec<Trip> = self.rest.get(TABLE, &params).await?;
    Self::single(rows, id)
  }

  async fn create_trip(&self, form: &TripForm) -> Result<Trip, GatewayError> {
    let body = NewTrip {
      form,
      status: TripStatus::Draft,
      actual_cost: 0.0,
      updated_at: now_stamp(),
    };
    let rows: Vec<Trip> = self.rest.post(TABLE, &body).await?;
    Self::single(rows, "new")
  }

  async fn update_trip(&self, id: &str, patch: &TripPatch) -> Result<Trip, GatewayError> {
    let body = Stamped {
      fields: patch,
      updated_at: now_stamp(),
    };
    let rows: Vec<Trip> = self.rest.patch(TABLE, &Self::by_id(id), &body).await?;
    Self::single(rows, id)
  }

  async fn delete_trip(&self, id: &str) -> Result<(), GatewayError> {
    self.rest.delete(TABLE, &Self::by_id(id)).await
  }

  async fn trip_stats(&self, company_id: Option<&str>) -> Result<TripStats, GatewayError> {
    let mut params = QueryParams::new().select(STATS_PROJECTION);
    if let Some(company_id) = company_id {
      params = params.eq("company_id", company_id);
    }
    let rows: Vec<StatsRow> = self.rest.get(TABLE, &params).await?;
    Ok(TripStats::from_rows(&rows, Utc::now().date_naive()))
  }

  async fn recent_trips(&self, limit: u32) -> Result<Vec<Trip>, GatewayError> {
    let params = QueryParams::new()
      .select(RECENT_PROJECTION)
      .order(NEWEST_FIRST)
      .limit(limit);
    self.rest.get(TABLE, &params).await
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::trips::types::{TripPriority, TripPurpose};
  use httpmock::prelude::*;
  use serde_json::{json, Value};

  fn gateway(server: &MockServer) -> RestGateway {
    RestGateway::new(RestClient::new(&server.base_url(), "anon".to_string()).unwrap())
  }

  fn trip_row(id: &str, status: &str) -> Value {
    json!({
      "id": id,
      "title": "Lisbon summit",
      "description": null,
      "user_id": "u-1",
      "company_id": "c-1",
      "destination_city": "Lisbon",
      "destination_country": "PT",
      "purpose": "conference",
      "start_date": "2024-09-10",
      "end_date": "2024-09-12",
      "total_budget": 2000.0,
      "actual_cost": 0.0,
      "status": status,
      "priority": "medium",
      "approval_notes": null,
      "created_at": "2024-08-01T09:00:00+00:00",
      "updated_at": "2024-08-01T09:00:00+00:00"
    })
  }

  #[tokio::test]
  async fn test_list_trips_pages_with_exact_count() {
    let server = MockServer::start_async().await;
    let rows = server
      .mock_async(|when, then| {
        when
          .method(GET)
          .path("/rest/v1/trips")
          .query_param("status", "eq.draft")
          .query_param("order", "created_at.desc")
          .query_param("limit", "10")
          .query_param("offset", "10")
          .header("prefer", "return=representation");
        then
          .status(200)
          .json_body(json!([trip_row("t-11", "draft"), trip_row("t-12", "draft")]));
      })
      .await;
    let count = server
      .mock_async(|when, then| {
        when
          .method(GET)
          .path("/rest/v1/trips")
          .query_param("select", "count")
          .query_param("status", "eq.draft")
          .header("prefer", "count=exact");
        then.status(200).json_body(json!([{ "count": 25 }]));
      })
      .await;

    let page = gateway(&server)
      .list_trips(&TripFilters::with_status(TripStatus::Draft), Pagination::new(2, 10))
      .await
      .unwrap();

    rows.assert_async().await;
    count.assert_async().await;
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.total, 25);
    assert_eq!(page.total_pages, 3);
    assert!(page.has_next);
    assert!(page.has_prev);
  }

  #[tokio::test]
  async fn test_get_trip_without_rows_is_not_found() {
    let server = MockServer::start_async().await;
    server
      .mock_async(|when, then| {
        when
          .method(GET)
          .path("/rest/v1/trips")
          .query_param("id", "eq.missing");
        then.status(200).json_body(json!([]));
      })
      .await;

    let err = gateway(&server).get_trip("missing").await.unwrap_err();
    assert!(matches!(err, GatewayError::NotFound { entity: "trip", ref id } if id == "missing"));
  }

  #[tokio::test]
  async fn test_create_trip_starts_as_draft() {
    let server = MockServer::start_async().await;
    let mock = server
      .mock_async(|when, then| {
        when
          .method(POST)
          .path("/rest/v1/trips")
          .json_body_includes(r#"{"title":"Lisbon summit","status":"draft","actual_cost":0.0}"#);
        then.status(201).json_body(json!([trip_row("t-1", "draft")]));
      })
      .await;

    let form = TripForm {
      title: "Lisbon summit".to_string(),
      description: None,
      user_id: "u-1".to_string(),
      company_id: "c-1".to_string(),
      destination_city: "Lisbon".to_string(),
      destination_country: "PT".to_string(),
      purpose: TripPurpose::Conference,
      start_date: "2024-09-10".parse().unwrap(),
      end_date: "2024-09-12".parse().unwrap(),
      total_budget: Some(2000.0),
      priority: TripPriority::Medium,
    };
    let trip = gateway(&server).create_trip(&form).await.unwrap();

    mock.assert_async().await;
    assert_eq!(trip.id, "t-1");
    assert_eq!(trip.status, TripStatus::Draft);
  }

  #[tokio::test]
  async fn test_update_status_patches_status_and_notes() {
    let server = MockServer::start_async().await;
    let mock = server
      .mock_async(|when, then| {
        when
          .method(PATCH)
          .path("/rest/v1/trips")
          .query_param("id", "eq.t-1")
          .json_body_includes(r#"{"status":"approved","approval_notes":"within policy"}"#);
        then.status(200).json_body(json!([trip_row("t-1", "approved")]));
      })
      .await;

    let trip = gateway(&server)
      .update_trip_status("t-1", TripStatus::Approved, Some("within policy"))
      .await
      .unwrap();

    mock.assert_async().await;
    assert_eq!(trip.status, TripStatus::Approved);
  }

  #[tokio::test]
  async fn test_update_missing_trip_is_not_found() {
    let server = MockServer::start_async().await;
    server
      .mock_async(|when, then| {
        when.method(PATCH).path("/rest/v1/trips");
        then.status(200).json_body(json!([]));
      })
      .await;

    let err = gateway(&server)
      .update_trip("gone", &TripPatch::default())
      .await
      .unwrap_err();
    assert_eq!(err.status(), Some(404));
  }

  #[tokio::test]
  async fn test_stats_filter_by_company() {
    let server = MockServer::start_async().await;
    let mock = server
      .mock_async(|when, then| {
        when
          .method(GET)
          .path("/rest/v1/trips")
          .query_param("select", STATS_PROJECTION)
          .query_param("company_id", "eq.c-9");
        then.status(200).json_body(json!([
          { "status": "completed", "total_budget": 100.0, "actual_cost": 80.0, "start_date": "2020-01-01" },
          { "status": "draft", "total_budget": 50.0, "actual_cost": 0.0, "start_date": "2020-02-01" }
        ]));
      })
      .await;

    let stats = gateway(&server).trip_stats(Some("c-9")).await.unwrap();

    mock.assert_async().await;
    assert_eq!(stats.total_trips, 2);
    assert_eq!(stats.completed_trips, 1);
    assert_eq!(stats.average_cost, 80.0);
  }

  #[tokio::test]
  async fn test_remote_failure_passes_through() {
    let server = MockServer::start_async().await;
    server
      .mock_async(|when, then| {
        when.method(GET).path("/rest/v1/trips");
        then.status(503).body("upstream down");
      })
      .await;

    let err = gateway(&server).recent_trips(5).await.unwrap_err();
    assert_eq!(err.status(), Some(503));
  }
}
