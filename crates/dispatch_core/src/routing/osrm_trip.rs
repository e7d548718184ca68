//! OSRM `/trip` client: round-trip optimization with a fixed start.
//!
//! This module wraps a blocking HTTP client for OSRM's trip service and a
//! parser that re-keys the response to visit order, so callers never see the
//! engine's waypoint layout.

mod client;
mod error;
mod parser;
mod response;

pub use client::OsrmTripClient;
pub use error::TripError;
