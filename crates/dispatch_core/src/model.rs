//! Domain entities: parcels, trucks, drivers, offices, routes, and history rows.
//!
//! - **Entities**: `Parcel`, `Truck`, `Driver`, `Office`, `RouteAssignment`
//! - **Status enums**: `ParcelStatus`
//! - **Route contents**: `VisitRecord` with a tagged `VisitStop` (depot or parcel)
//! - **Aggregates**: `DeliveryHistory`, `OfficeDelivery`
//!
//! `Parcel.status` is the source of truth; the matching `VisitRecord.status`
//! in an active route is a cached projection kept in sync by the lifecycle
//! module. Visit sequences and geometries serialize as ordered JSON arrays.

use chrono::{DateTime, NaiveDate, Utc};
use h3o::LatLng;
use serde::{Deserialize, Serialize};

use crate::geo::LonLat;

/// Short opaque parcel token (assigned by the external CRUD layer).
pub type ParcelId = String;
/// Driver username (unique within the identity layer).
pub type DriverId = String;
/// Truck license plate (unique).
pub type TruckId = String;
pub type OfficeId = u32;
pub type CompanyId = u32;
pub type RouteId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParcelStatus {
    Pending,
    InTransit,
    Delivered,
    Undelivered,
}

impl ParcelStatus {
    /// Terminal states end a parcel's journey on the current route.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Undelivered)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InTransit => "in_transit",
            Self::Delivered => "delivered",
            Self::Undelivered => "undelivered",
        }
    }
}

impl std::fmt::Display for ParcelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Parcel {
    pub id: ParcelId,
    pub address: String,
    pub location: LatLng,
    pub recipient: String,
    pub phone: String,
    /// Recipient email; notifications are skipped (with a warning) when absent.
    pub email: Option<String>,
    pub due_date: NaiveDate,
    pub weight_kg: f64,
    pub status: ParcelStatus,
    /// Set exactly when the parcel is undelivered and a fallback office exists.
    pub office_id: Option<OfficeId>,
    /// Base64 signature captured at the door, stored verbatim.
    pub signature: Option<String>,
    pub company_id: Option<CompanyId>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Truck {
    pub license_plate: TruckId,
    pub capacity_kg: f64,
    /// True exactly while an active route references this truck.
    pub in_use: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Driver {
    pub username: DriverId,
    /// Display name used in notifications; falls back to the username.
    pub display_name: Option<String>,
    pub company_id: Option<CompanyId>,
    /// Only verified drivers may be assigned routes.
    pub verified: bool,
}

impl Driver {
    pub fn display_name(&self) -> &str {
        match self.display_name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => &self.username,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Office {
    pub id: OfficeId,
    pub name: String,
    pub address: String,
    pub company_id: Option<CompanyId>,
    pub location: LatLng,
}

/// Immutable copy of the parcel fields a driver needs at a stop, taken at
/// plan time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParcelSnapshot {
    pub id: ParcelId,
    pub address: String,
    pub lat: f64,
    pub lon: f64,
    pub recipient: String,
    pub phone: String,
    pub due_date: NaiveDate,
    pub weight_kg: f64,
}

impl ParcelSnapshot {
    pub fn of(parcel: &Parcel) -> Self {
        Self {
            id: parcel.id.clone(),
            address: parcel.address.clone(),
            lat: parcel.location.lat(),
            lon: parcel.location.lng(),
            recipient: parcel.recipient.clone(),
            phone: parcel.phone.clone(),
            due_date: parcel.due_date,
            weight_kg: parcel.weight_kg,
        }
    }
}

/// What a visit stops at: the company depot or a parcel delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VisitStop {
    Depot,
    Parcel { snapshot: ParcelSnapshot },
}

impl VisitStop {
    pub fn is_depot(&self) -> bool {
        matches!(self, Self::Depot)
    }

    pub fn parcel_id(&self) -> Option<&str> {
        match self {
            Self::Depot => None,
            Self::Parcel { snapshot } => Some(&snapshot.id),
        }
    }

    pub fn snapshot(&self) -> Option<&ParcelSnapshot> {
        match self {
            Self::Depot => None,
            Self::Parcel { snapshot } => Some(snapshot),
        }
    }
}

/// One stop in a route's optimized sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitRecord {
    /// Position in the optimized sequence, 0-based; 0 is the depot.
    pub visit_order: u32,
    pub stop: VisitStop,
    /// Road-snapped `[lon, lat]` location reported by the routing engine.
    pub snapped: LonLat,
    /// Travel seconds on the leg arriving at this stop; 0 for the first stop.
    pub inbound_duration_s: f64,
    /// Cached projection of the parcel's status; `Pending` on depot records.
    pub status: ParcelStatus,
    /// True only on the synthetic tail record closing the loop at the depot.
    pub is_return_leg: bool,
}

impl VisitRecord {
    /// A deliverable stop: references a parcel and is not the closing leg.
    pub fn is_parcel_stop(&self) -> bool {
        !self.is_return_leg && !self.stop.is_depot()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteAssignment {
    pub route_id: RouteId,
    pub driver: DriverId,
    pub truck: TruckId,
    pub created_on: NaiveDate,
    pub is_active: bool,
    /// Ordered visit sequence; first record is the depot, last is the return leg.
    pub sequence: Vec<VisitRecord>,
    /// Full loop polyline as `[lon, lat]` pairs, passed through verbatim for
    /// client-side rendering.
    pub path_geometry: Vec<LonLat>,
}

impl RouteAssignment {
    /// Iterate the deliverable stops (depot and return leg excluded).
    pub fn parcel_stops(&self) -> impl Iterator<Item = &VisitRecord> {
        self.sequence.iter().filter(|v| v.is_parcel_stop())
    }

    /// All parcel stops are in a terminal state.
    pub fn is_complete(&self) -> bool {
        self.parcel_stops().all(|v| v.status.is_terminal())
    }
}

/// Per-day, per-driver delivery aggregate. Unique on `(date, driver)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryHistory {
    pub date: NaiveDate,
    pub driver: DriverId,
    pub truck: Option<TruckId>,
    pub delivered_count: u32,
    pub delivered_kilos: f64,
    pub undelivered_count: u32,
    pub undelivered_kilos: f64,
    pub duration_hours: f64,
    pub route_id: Option<RouteId>,
}

/// Append-only record of a batch of undelivered parcels dropped at an office.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OfficeDelivery {
    pub driver: DriverId,
    pub office_id: OfficeId,
    pub parcel_ids: Vec<ParcelId>,
    pub recorded_at: DateTime<Utc>,
    pub route_id: Option<RouteId>,
}
