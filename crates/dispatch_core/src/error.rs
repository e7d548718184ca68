//! Error taxonomy for the engine.
//!
//! Input and state errors are user-visible and carry a stable code via
//! [`DispatchError::code`]. Routing engine failures abort the current
//! operation and are reported verbatim; there is no silent fallback that
//! could produce an incorrect plan. Notification failures never appear
//! here: they are logged and discarded at the call site.

use thiserror::Error;

use crate::model::{OfficeId, ParcelStatus};
use crate::routing::TripError;

pub type DispatchResult<T> = Result<T, DispatchError>;

#[derive(Debug, Error)]
pub enum DispatchError {
    // ------------------------------ input ------------------------------
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("coordinate ({lat}, {lon}) is out of range")]
    InvalidCoordinate { lat: f64, lon: f64 },
    #[error("driver `{0}` does not exist")]
    UnknownDriver(String),
    #[error("truck `{0}` does not exist")]
    UnknownTruck(String),
    #[error("parcel `{0}` does not exist")]
    UnknownParcel(String),
    #[error("office {0} does not exist")]
    UnknownOffice(OfficeId),

    // ------------------------------ state ------------------------------
    #[error("driver `{0}` already has an active route")]
    ActiveRouteExists(String),
    #[error("route is already inactive")]
    AlreadyInactive,
    #[error("parcel `{0}` is already delivered")]
    AlreadyDelivered(String),
    #[error("illegal parcel transition {from} -> {to}")]
    IllegalTransition { from: ParcelStatus, to: ParcelStatus },
    #[error("truck `{0}` is attached to an active route")]
    TruckInUse(String),
    #[error("driver `{0}` is not verified for route assignment")]
    DriverNotVerified(String),
    #[error("driver `{0}` has no active route")]
    NoActiveRoute(String),

    // ----------------------------- capacity ----------------------------
    #[error("no available truck can carry zone(s) {zones:?}")]
    InsufficientCapacity { zones: Vec<usize> },
    #[error("no parcels are eligible for planning")]
    NoEligibleParcels,

    // ----------------------------- external ----------------------------
    #[error(transparent)]
    Engine(#[from] TripError),

    // ----------------------------- internal ----------------------------
    #[error("store failure: {0}")]
    StoreFailure(String),
    #[error("operation timed out")]
    Timeout,
}

impl DispatchError {
    /// Stable machine-readable code for API consumers.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "missing_field",
            Self::InvalidCoordinate { .. } => "invalid_coordinate",
            Self::UnknownDriver(_) => "unknown_driver",
            Self::UnknownTruck(_) => "unknown_truck",
            Self::UnknownParcel(_) => "unknown_parcel",
            Self::UnknownOffice(_) => "unknown_office",
            Self::ActiveRouteExists(_) => "active_route_exists",
            Self::AlreadyInactive => "already_inactive",
            Self::AlreadyDelivered(_) => "already_delivered",
            Self::IllegalTransition { .. } => "illegal_transition",
            Self::TruckInUse(_) => "truck_in_use",
            Self::DriverNotVerified(_) => "driver_not_verified",
            Self::NoActiveRoute(_) => "no_active_route",
            Self::InsufficientCapacity { .. } => "insufficient_capacity",
            Self::NoEligibleParcels => "no_eligible_parcels",
            Self::Engine(TripError::Network(_) | TripError::NonOkStatus(_)) => {
                "routing_engine_unavailable"
            }
            Self::Engine(TripError::EngineCode(_)) => "routing_engine_non_ok",
            Self::Engine(TripError::Decode(_) | TripError::NoPoints) => "routing_engine_decode",
            Self::StoreFailure(_) => "store_failure",
            Self::Timeout => "timeout",
        }
    }
}
