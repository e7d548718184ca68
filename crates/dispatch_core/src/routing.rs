//! Trip optimization: trait abstraction over the external routing engine.
//!
//! The engine receives an ordered list of points with a fixed start and
//! returns the optimized visit order, per-leg durations, and the full loop
//! geometry. [`TripService`] is the seam the planner and supervisor depend
//! on; [`osrm_trip::OsrmTripClient`] is the production implementation over
//! OSRM's `/trip` HTTP service.

use h3o::LatLng;

use crate::geo::{self, LonLat};

pub mod osrm_trip;

pub use osrm_trip::{OsrmTripClient, TripError};

/// One stop of an optimized trip, in visit order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TripStop {
    /// Index of this stop in the *request* point list.
    pub input_index: usize,
    /// Road-snapped `[lon, lat]` location reported by the engine.
    pub snapped: LonLat,
    /// Travel seconds on the leg arriving at this stop; 0 for the first stop.
    pub inbound_duration_s: f64,
}

/// Optimized trip over the requested points.
#[derive(Debug, Clone, PartialEq)]
pub struct TripPlan {
    /// Stops re-keyed to visit order; `stops[0]` is the fixed start.
    pub stops: Vec<TripStop>,
    /// Travel seconds of the closing leg back to the start.
    pub return_duration_s: f64,
    /// Full loop polyline as `[lon, lat]` pairs, verbatim from the engine.
    pub geometry: Vec<LonLat>,
}

/// Trait for trip optimization backends. Implementations must be
/// `Send + Sync` so one client can serve concurrent requests.
pub trait TripService: Send + Sync {
    /// Optimize a round trip over `points`, keeping `points[0]` as the fixed
    /// start. A single-point input must not reach the network: the plan is
    /// synthesized locally with one zero-duration stop.
    fn trip(&self, points: &[LatLng]) -> Result<TripPlan, TripError>;
}

/// Degenerate plan for a single point: one stop, zero durations.
pub fn single_point_plan(point: LatLng) -> TripPlan {
    let snapped = geo::to_wire(point);
    TripPlan {
        stops: vec![TripStop {
            input_index: 0,
            snapped,
            inbound_duration_s: 0.0,
        }],
        return_duration_s: 0.0,
        geometry: vec![snapped],
    }
}
