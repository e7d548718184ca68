//! Engine and planner configuration.
//!
//! Plain config structs with explicit defaults, passed into components at
//! construction time. Seeds are part of the config so plans are reproducible.

use h3o::LatLng;
use serde::{Deserialize, Serialize};

/// Default routing engine endpoint (public OSRM demo server).
pub const DEFAULT_ENGINE_URL: &str = "http://router.project-osrm.org";

/// Default request timeout for the routing engine, in seconds.
pub const DEFAULT_ENGINE_TIMEOUT_SECS: u64 = 20;

/// Routing engine connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Base URL of the trip-optimizer service, without a trailing slash.
    pub base_url: String,
    /// Routing profile tag in the request path (e.g. `driving`, `car`).
    pub profile: String,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_ENGINE_URL.to_string(),
            profile: "driving".to_string(),
            timeout_secs: DEFAULT_ENGINE_TIMEOUT_SECS,
        }
    }
}

/// Route planning settings: depot location, clustering seed, eligibility window.
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Depot latitude; every route starts and ends here.
    pub depot_lat: f64,
    /// Depot longitude.
    pub depot_lon: f64,
    /// Display address of the depot, carried on depot visit records.
    pub depot_address: String,
    /// Seed for the k-means partitioner; fixed so plans are reproducible.
    pub cluster_seed: u64,
    /// Maximum k-means refinement passes before accepting the partition.
    pub cluster_max_iters: usize,
    /// Parcels due within this many days from today are eligible for a plan.
    /// Overdue parcels are always included and sorted first.
    pub due_within_days: i64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            depot_lat: 42.6666,
            depot_lon: 23.3750,
            depot_address: "123 Factory Street".to_string(),
            cluster_seed: 0,
            cluster_max_iters: 100,
            due_within_days: 1,
        }
    }
}

impl PlannerConfig {
    /// Depot coordinate.
    ///
    /// # Panics
    ///
    /// Panics if the configured depot is out of coordinate range; a depot is
    /// operator-supplied configuration, not request input.
    pub fn depot(&self) -> LatLng {
        LatLng::new(self.depot_lat, self.depot_lon).expect("depot coordinate out of range")
    }
}
