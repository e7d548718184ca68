//! # Delivery Dispatch Core
//!
//! Route planning and execution engine for last-mile parcel delivery.
//!
//! ## Overview
//!
//! This crate provides the core planning and supervision engine, including:
//!
//! - **Clustering**: Driver-sized parcel zones with empty-zone rebalancing
//! - **Truck Allocation**: Smallest sufficient truck per zone
//! - **Trip Optimization**: OSRM-backed visit ordering behind a trait seam
//! - **Parcel Lifecycle**: The authoritative status state machine
//! - **Execution Supervision**: Journey start/finish, mid-route recovery,
//!   office fallback for undeliverable parcels
//! - **History & Stats**: Per-day delivery aggregates and dashboard views
//!
//! ## Key Concepts
//!
//! - **Explicit seams**: storage ([`store::Store`]), routing
//!   ([`routing::TripService`]), time ([`clock::Clock`]), and notifications
//!   ([`notify::Notifier`]) are traits, so every flow is deterministic
//!   under test
//! - **Exclusive resources**: one active route per driver, one active route
//!   per truck, enforced at the store
//! - **Deterministic planning**: the partitioner is seeded via
//!   [`config::PlannerConfig`]
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use dispatch_core::clock::SystemClock;
//! use dispatch_core::config::{EngineConfig, PlannerConfig};
//! use dispatch_core::planner::RoutePlanner;
//! use dispatch_core::routing::OsrmTripClient;
//! use dispatch_core::store::MemoryStore;
//!
//! let store = Arc::new(MemoryStore::new());
//! let trips = Arc::new(OsrmTripClient::new(&EngineConfig::default()));
//! let planner = RoutePlanner::new(
//!     store,
//!     trips,
//!     Arc::new(SystemClock),
//!     PlannerConfig::default(),
//! );
//! let routes = planner.plan_routes(&["driver1".to_string()]);
//! ```

pub mod allocator;
pub mod clock;
pub mod cluster;
pub mod config;
pub mod error;
pub mod geo;
pub mod history;
pub mod lifecycle;
pub mod model;
pub mod notify;
pub mod offices;
pub mod planner;
pub mod routing;
pub mod stats;
pub mod store;
pub mod supervisor;

#[cfg(test)]
pub mod test_helpers;
