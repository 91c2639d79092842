//! Trips: domain types, cache keys, the store gateway, and the cached reads
//! and writes built on top of them.

pub mod filters;
pub mod gateway;
pub mod keys;
pub mod mutations;
pub mod queries;
pub mod stats;
#[cfg(test)]
pub(crate) mod testing;
pub mod types;

pub use filters::TripFilters;
pub use gateway::{RestGateway, TripStore};
pub use keys::{trip_keys, TripQuery};
pub use mutations::TripMutations;
pub use queries::TripQueries;
pub use types::{PaginatedResult, Pagination, Trip, TripForm, TripPatch, TripStats, TripStatus};
