//! Cached data layer for the trip dashboard: a keyed query cache, the REST
//! gateway to the trip store, and the trip reads and writes built on both.

pub mod cache;
pub mod companies;
pub mod config;
pub mod error;
pub mod query;
pub mod rest;
pub mod trips;
