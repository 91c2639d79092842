//! Cached trip reads.

use std::sync::Arc;

use super::filters::TripFilters;
use super::gateway::TripStore;
use super::keys::TripQuery;
use super::types::{PaginatedResult, Pagination, Trip, TripStats, TripStatus};
use crate::cache::QueryCache;
use crate::query::Query;

/// Builds [`Query`] handles for every trip read, all sharing one cache.
pub struct TripQueries<S> {
  cache: QueryCache,
  store: Arc<S>,
}

impl<S> Clone for TripQueries<S> {
  fn clone(&self) -> Self {
    Self {
      cache: self.cache.clone(),
      store: Arc::clone(&self.store),
    }
  }
}

impl<S: TripStore + 'static> TripQueries<S> {
  pub fn new(cache: QueryCache, store: Arc<S>) -> Self {
    Self { cache, store }
  }

  pub fn cache(&self) -> &QueryCache {
    &self.cache
  }

  pub fn list(&self, filters: TripFilters, page: Pagination) -> Query<PaginatedResult<Trip>> {
    let key = TripQuery::List {
      filters: filters.clone(),
      page,
    }
    .key();
    let store = Arc::clone(&self.store);
    Query::new(self.cache.clone(), key, move || {
      let store = Arc::clone(&store);
      let filters = filters.clone();
      async move { store.list_trips(&filters, page).await }
    })
  }

  pub fn detail(&self, id: &str) -> Query<Trip> {
    let id = id.to_string();
    let key = TripQuery::Detail { id: id.clone() }.key();
    let store = Arc::clone(&self.store);
    Query::new(self.cache.clone(), key, move || {
      let store = Arc::clone(&store);
      let id = id.clone();
      async move { store.get_trip(&id).await }
    })
  }

  pub fn stats(&self, company_id: Option<&str>) -> Query<TripStats> {
    let company_id = company_id.map(str::to_string);
    let key = TripQuery::Stats {
      company_id: company_id.clone(),
    }
    .key();
    let store = Arc::clone(&self.store);
    Query::new(self.cache.clone(), key, move || {
      let store = Arc::clone(&store);
      let company_id = company_id.clone();
      async move { store.trip_stats(company_id.as_deref()).await }
    })
  }

  pub fn recent(&self, limit: u32) -> Query<Vec<Trip>> {
    let key = TripQuery::Recent { limit }.key();
    let store = Arc::clone(&self.store);
    Query::new(self.cache.clone(), key, move || {
      let store = Arc::clone(&store);
      async move { store.recent_trips(limit).await }
    })
  }

  pub fn by_status(&self, status: TripStatus, page: Pagination) -> Query<PaginatedResult<Trip>> {
    let key = TripQuery::ByStatus { status, page }.key();
    let store = Arc::clone(&self.store);
    Query::new(self.cache.clone(), key, move || {
      let store = Arc::clone(&store);
      async move { store.trips_by_status(status, page).await }
    })
  }
}
