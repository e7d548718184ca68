//! Persistence seam: every component talks to storage through [`Store`].
//!
//! The trait replaces ambient ORM access with an explicit interface so the
//! engine is deterministic under test. Multi-step mutations (`launch_routes`,
//! `finish_route`, `apply_transition`, `drop_all_routes`) are transactional:
//! an implementation must apply all of their effects inside one critical
//! section or none at all. The one-active-route-per-driver rule is enforced
//! here, at the store, not by callers.

use chrono::NaiveDate;

use crate::error::DispatchResult;
use crate::geo::LonLat;
use crate::lifecycle::Transition;
use crate::model::{
    CompanyId, DeliveryHistory, Driver, Office, OfficeDelivery, OfficeId, Parcel, ParcelStatus,
    RouteAssignment, RouteId, Truck,
};

mod memory;

pub use memory::MemoryStore;

pub trait Store: Send + Sync {
    // ------------------------------ parcels -----------------------------
    fn insert_parcel(&self, parcel: Parcel);
    fn parcel(&self, id: &str) -> DispatchResult<Parcel>;
    fn parcels(&self) -> Vec<Parcel>;
    fn parcels_with_status(&self, status: ParcelStatus) -> Vec<Parcel>;
    /// Pending parcels due on or before `by`, ordered by due date then id.
    fn pending_due_by(&self, by: NaiveDate) -> Vec<Parcel>;
    /// Apply a lifecycle transition to the parcel row *and* to the matching
    /// visit record in every active route, atomically per parcel. A parcel
    /// referenced by no active route is still updated (stale-route
    /// tolerance). Returns the parcel after the transition.
    fn apply_transition(&self, parcel_id: &str, transition: &Transition) -> DispatchResult<Parcel>;

    // ------------------------------ trucks ------------------------------
    fn insert_truck(&self, truck: Truck);
    fn truck(&self, license_plate: &str) -> DispatchResult<Truck>;
    fn trucks(&self) -> Vec<Truck>;
    /// Trucks not attached to an active route, ascending by capacity.
    fn available_trucks(&self) -> Vec<Truck>;

    // ------------------------------ drivers -----------------------------
    fn insert_driver(&self, driver: Driver);
    fn driver(&self, username: &str) -> DispatchResult<Driver>;
    fn drivers(&self) -> Vec<Driver>;

    // ------------------------------ offices -----------------------------
    fn insert_office(&self, office: Office);
    fn office(&self, id: OfficeId) -> DispatchResult<Office>;
    fn offices(&self) -> Vec<Office>;
    fn offices_for_company(&self, company: CompanyId) -> Vec<Office>;

    // ------------------------------ routes ------------------------------
    /// Persist a batch of new routes in one transaction: route ids are
    /// assigned, trucks flip to in-use, and referenced parcels advance
    /// `pending -> in_transit`. Any violation (`ActiveRouteExists`,
    /// `TruckInUse`, a non-pending parcel) rolls the whole batch back.
    fn launch_routes(&self, routes: Vec<RouteAssignment>) -> DispatchResult<Vec<RouteAssignment>>;
    fn route(&self, route_id: RouteId) -> DispatchResult<RouteAssignment>;
    fn active_route_for_driver(&self, driver: &str) -> Option<RouteAssignment>;
    /// Most recently created route for the driver, active or not.
    fn latest_route_for_driver(&self, driver: &str) -> Option<RouteAssignment>;
    fn active_routes(&self) -> Vec<RouteAssignment>;
    fn active_routes_on(&self, date: NaiveDate) -> Vec<RouteAssignment>;
    /// Deactivate the route and release its truck in one transaction.
    /// Re-deactivation reports `AlreadyInactive`.
    fn finish_route(&self, route_id: RouteId) -> DispatchResult<RouteAssignment>;
    /// Replace the rendered geometry; visit records are not renumbered.
    fn update_route_geometry(&self, route_id: RouteId, geometry: Vec<LonLat>)
        -> DispatchResult<()>;
    /// Destructive reset: drop every route, release every truck, and return
    /// every parcel referenced by an active route to `pending`.
    fn drop_all_routes(&self) -> usize;

    // ------------------------------ history -----------------------------
    /// Create-or-update keyed on `(date, driver)`; last writer wins.
    fn upsert_history(&self, entry: DeliveryHistory);
    fn history_on(&self, date: NaiveDate) -> Vec<DeliveryHistory>;
    fn history_for_driver_on(&self, driver: &str, date: NaiveDate) -> Option<DeliveryHistory>;

    // -------------------------- office deliveries -----------------------
    /// Append a drop-off record. Returns false (storing nothing) when the
    /// same driver already recorded the same office and parcel set that day.
    fn insert_office_delivery(&self, delivery: OfficeDelivery) -> bool;
    fn office_deliveries_for(&self, driver: &str) -> Vec<OfficeDelivery>;
}
