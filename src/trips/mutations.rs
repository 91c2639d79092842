//! Trip writes and the cache effects each one has.
//!
//! | write         | detail entry | invalidated prefixes   |
//! |---------------|--------------|------------------------|
//! | create        | written      | lists, stats, recent   |
//! | update        | written      | lists, stats           |
//! | delete        | removed      | lists, stats, recent   |
//! | update status | written      | lists, stats           |
//!
//! A failed write leaves the cache untouched.

use std::sync::Arc;
use tracing::{error, info};

use super::gateway::TripStore;
use super::keys::trip_keys;
use super::types::{Trip, TripForm, TripPatch, TripStatus};
use crate::cache::QueryCache;
use crate::error::{GatewayError, MutationError, MutationKind};

pub struct TripMutations<S> {
  cache: QueryCache,
  store: Arc<S>,
}

impl<S> Clone for TripMutations<S> {
  fn clone(&self) -> Self {
    Self {
      cache: self.cache.clone(),
      store: Arc::clone(&self.store),
    }
  }
}

impl<S: TripStore> TripMutations<S> {
  pub fn new(cache: QueryCache, store: Arc<S>) -> Self {
    Self { cache, store }
  }

  pub async fn create(&self, form: &TripForm) -> Result<Trip, MutationError> {
    let trip = settle(MutationKind::Create, self.store.create_trip(form).await)?;
    info!(id = %trip.id, "trip created");

    self.cache.invalidate(&trip_keys::lists());
    self.cache.invalidate(&trip_keys::stats());
    self.cache.invalidate(&trip_keys::recent());
    self.cache.write(&trip_keys::detail(&trip.id), trip.clone());
    Ok(trip)
  }

  pub async fn update(&self, id: &str, patch: &TripPatch) -> Result<Trip, MutationError> {
    let trip = settle(MutationKind::Update, self.store.update_trip(id, patch).await)?;
    info!(id = %trip.id, "trip updated");

    self.write_detail_and_invalidate(&trip);
    Ok(trip)
  }

  pub async fn delete(&self, id: &str) -> Result<(), MutationError> {
    settle(MutationKind::Delete, self.store.delete_trip(id).await)?;
    info!(id, "trip deleted");

    self.cache.remove(&trip_keys::detail(id));
    self.cache.invalidate(&trip_keys::lists());
    self.cache.invalidate(&trip_keys::stats());
    self.cache.invalidate(&trip_keys::recent());
    Ok(())
  }

  pub async fn update_status(
    &self,
    id: &str,
    status: TripStatus,
    notes: Option<&str>,
  ) -> Result<Trip, MutationError> {
    let result = self.store.update_trip_status(id, status, notes).await;
    let trip = settle(MutationKind::UpdateStatus, result)?;
    info!(id = %trip.id, status = %trip.status, "trip status updated");

    self.write_detail_and_invalidate(&trip);
    Ok(trip)
  }

  fn write_detail_and_invalidate(&self, trip: &Trip) {
    self.cache.write(&trip_keys::detail(&trip.id), trip.clone());
    self.cache.invalidate(&trip_keys::lists());
    self.cache.invalidate(&trip_keys::stats());
  }
}

pub(crate) fn settle<T>(operation: MutationKind, result: Result<T, GatewayError>) -> Result<T, MutationError> {
  result.map_err(|cause| {
    error!(%operation, error = %cause, "mutation failed");
    MutationError { operation, cause }
  })
}
