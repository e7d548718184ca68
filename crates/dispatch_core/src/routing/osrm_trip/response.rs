use crate::geo::LonLat;

#[derive(serde::Deserialize)]
pub(super) struct OsrmTripResponse {
    pub(super) code: String,
    #[serde(default)]
    pub(super) trips: Vec<OsrmTrip>,
    #[serde(default)]
    pub(super) waypoints: Vec<OsrmWaypoint>,
}

#[derive(serde::Deserialize)]
pub(super) struct OsrmTrip {
    pub(super) geometry: OsrmGeometry,
    #[serde(default)]
    pub(super) legs: Vec<OsrmLeg>,
}

#[derive(serde::Deserialize)]
pub(super) struct OsrmGeometry {
    pub(super) coordinates: Vec<LonLat>,
}

#[derive(serde::Deserialize)]
pub(super) struct OsrmLeg {
    pub(super) duration: f64,
}

/// Waypoints arrive in *input* order; `waypoint_index` is the position in
/// the optimized visit sequence of trip `trips_index`.
#[derive(serde::Deserialize)]
pub(super) struct OsrmWaypoint {
    pub(super) waypoint_index: usize,
    pub(super) trips_index: usize,
    pub(super) location: LonLat,
}
