//! Execution supervision: the journey from truck lock to history row.
//!
//! The supervisor owns every flip of `truck.in_use` and `route.is_active`
//! (performed inside store transactions it invokes) and orchestrates:
//!
//! - `start_journey`: persist a manually prepared route, lock the truck,
//!   advance its parcels to `in_transit`
//! - `on_delivered` / `on_undelivered`: parcel events, with notification and
//!   office fallback side effects after the transition commits
//! - `recalculate`: re-route from the driver's current position over the
//!   remaining work, replacing only the rendered geometry
//! - `return_to_depot`: a homeward leg plus journey finalization
//! - `finish_journey`: deactivate, release the truck, materialize history
//! - `check_status`: the driver's day at a glance

use std::sync::Arc;

use chrono::NaiveDate;
use h3o::LatLng;
use serde::Serialize;

use crate::clock::Clock;
use crate::config::PlannerConfig;
use crate::error::{DispatchError, DispatchResult};
use crate::geo::{self, LonLat};
use crate::history;
use crate::lifecycle::Transition;
use crate::model::{
    DeliveryHistory, Driver, Parcel, ParcelStatus, RouteAssignment, RouteId, VisitRecord,
};
use crate::notify::{self, Notifier};
use crate::offices;
use crate::routing::TripService;
use crate::store::Store;

/// Counts over the active route's parcel stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActiveRouteStatus {
    pub route_id: RouteId,
    /// Stops not yet in a terminal state.
    pub pending: u32,
    pub delivered: u32,
    pub undelivered: u32,
    /// Every parcel stop is terminal; the driver can finish the journey.
    pub route_complete: bool,
}

/// A driver's day at a glance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DriverStatus {
    Available,
    Active(ActiveRouteStatus),
    CompletedToday,
}

/// Homeward leg produced by [`ExecutionSupervisor::return_to_depot`].
#[derive(Debug, Clone)]
pub struct ReturnTrip {
    pub geometry: Vec<LonLat>,
    pub duration_s: f64,
    pub history: DeliveryHistory,
}

pub struct ExecutionSupervisor {
    store: Arc<dyn Store>,
    trips: Arc<dyn TripService>,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    config: PlannerConfig,
}

impl ExecutionSupervisor {
    pub fn new(
        store: Arc<dyn Store>,
        trips: Arc<dyn TripService>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        config: PlannerConfig,
    ) -> Self {
        Self {
            store,
            trips,
            notifier,
            clock,
            config,
        }
    }

    /// Persist a manually prepared route and start the journey: the truck
    /// locks and every referenced parcel advances `pending -> in_transit`,
    /// all in one transaction.
    pub fn start_journey(
        &self,
        driver_username: &str,
        truck_plate: &str,
        sequence: Vec<VisitRecord>,
        path_geometry: Vec<LonLat>,
    ) -> DispatchResult<RouteAssignment> {
        let driver = self.store.driver(driver_username)?;
        if !driver.verified {
            return Err(DispatchError::DriverNotVerified(driver_username.to_string()));
        }
        let truck = self.store.truck(truck_plate)?;
        if truck.in_use {
            return Err(DispatchError::TruckInUse(truck_plate.to_string()));
        }
        if sequence.is_empty() {
            return Err(DispatchError::MissingField("package_sequence"));
        }
        for visit in sequence.iter().filter(|v| v.is_parcel_stop()) {
            let snapshot = visit.stop.snapshot().expect("parcel stop has a snapshot");
            geo::coordinate(snapshot.lat, snapshot.lon)?;
            self.store.parcel(&snapshot.id)?;
        }

        let route = RouteAssignment {
            route_id: 0,
            driver: driver.username.clone(),
            truck: truck.license_plate.clone(),
            created_on: self.clock.today(),
            is_active: true,
            sequence,
            path_geometry,
        };
        let mut stored = self.store.launch_routes(vec![route])?;
        Ok(stored.pop().expect("one route launched"))
    }

    /// Driver handed the parcel over. The optional signature is stored
    /// verbatim; a delivery notification fires after the commit.
    pub fn on_delivered(
        &self,
        parcel_id: &str,
        signature: Option<String>,
        driver_username: Option<&str>,
    ) -> DispatchResult<Parcel> {
        let updated = self
            .store
            .apply_transition(parcel_id, &Transition::Deliver { signature })?;

        match self.notification_driver(parcel_id, driver_username) {
            Some(driver) => notify::delivered_best_effort(self.notifier.as_ref(), &updated, &driver),
            None => log::debug!(
                "no driver resolved for parcel {}; skipping delivery notification",
                parcel_id
            ),
        }
        Ok(updated)
    }

    /// Driver could not deliver the parcel: it becomes `undelivered` and is
    /// linked to the nearest office, when one exists.
    pub fn on_undelivered(&self, parcel_id: &str) -> DispatchResult<Parcel> {
        let parcel = self.store.parcel(parcel_id)?;
        let office = offices::nearest_office(self.store.as_ref(), &parcel);
        self.store.apply_transition(
            parcel_id,
            &Transition::MarkUndelivered {
                office: office.map(|o| o.id),
            },
        )
    }

    /// Re-route from the driver's current position over the remaining
    /// non-terminal parcels and back to the depot. Only `path_geometry`
    /// changes; visit records keep their numbering.
    pub fn recalculate(
        &self,
        driver_username: &str,
        current: LatLng,
    ) -> DispatchResult<Vec<LonLat>> {
        self.store.driver(driver_username)?;
        let route = self
            .store
            .active_route_for_driver(driver_username)
            .ok_or_else(|| DispatchError::NoActiveRoute(driver_username.to_string()))?;

        let mut points = vec![current];
        for visit in route.parcel_stops() {
            if visit.status.is_terminal() {
                continue;
            }
            let snapshot = visit.stop.snapshot().expect("parcel stop has a snapshot");
            points.push(geo::coordinate(snapshot.lat, snapshot.lon)?);
        }
        points.push(self.config.depot());

        let plan = self.trips.trip(&points)?;
        self.store
            .update_route_geometry(route.route_id, plan.geometry.clone())?;
        Ok(plan.geometry)
    }

    /// Route the driver home and finalize the journey.
    pub fn return_to_depot(
        &self,
        driver_username: &str,
        current: LatLng,
        depot_override: Option<LatLng>,
    ) -> DispatchResult<ReturnTrip> {
        self.store.driver(driver_username)?;
        if self
            .store
            .active_route_for_driver(driver_username)
            .is_none()
        {
            return Err(DispatchError::NoActiveRoute(driver_username.to_string()));
        }

        let depot = depot_override.unwrap_or_else(|| self.config.depot());
        let plan = self.trips.trip(&[current, depot])?;
        let duration_s = plan
            .stops
            .iter()
            .find(|stop| stop.input_index == 1)
            .map(|stop| stop.inbound_duration_s)
            .unwrap_or(0.0);

        let history = self.finish_journey(driver_username, None)?;
        Ok(ReturnTrip {
            geometry: plan.geometry,
            duration_s,
            history,
        })
    }

    /// The driver's day at a glance, derived from route and parcel state.
    pub fn check_status(&self, driver_username: &str, date: NaiveDate) -> DispatchResult<DriverStatus> {
        self.store.driver(driver_username)?;

        if let Some(route) = self.store.active_route_for_driver(driver_username) {
            let mut status = ActiveRouteStatus {
                route_id: route.route_id,
                pending: 0,
                delivered: 0,
                undelivered: 0,
                route_complete: false,
            };
            for visit in route.parcel_stops() {
                match visit.status {
                    ParcelStatus::Delivered => status.delivered += 1,
                    ParcelStatus::Undelivered => status.undelivered += 1,
                    ParcelStatus::Pending | ParcelStatus::InTransit => status.pending += 1,
                }
            }
            status.route_complete = status.pending == 0;
            return Ok(DriverStatus::Active(status));
        }

        let completed_today = self
            .store
            .history_for_driver_on(driver_username, date)
            .is_some()
            || self
                .store
                .latest_route_for_driver(driver_username)
                .map(|r| !r.is_active && r.created_on == date)
                .unwrap_or(false);
        if completed_today {
            return Ok(DriverStatus::CompletedToday);
        }
        Ok(DriverStatus::Available)
    }

    /// Deactivate the driver's active route, release its truck, and upsert
    /// the day's history row. Finishing twice reports `AlreadyInactive`.
    pub fn finish_journey(
        &self,
        driver_username: &str,
        duration_hours: Option<f64>,
    ) -> DispatchResult<DeliveryHistory> {
        self.store.driver(driver_username)?;

        let Some(route) = self.store.active_route_for_driver(driver_username) else {
            return if self.store.latest_route_for_driver(driver_username).is_some() {
                Err(DispatchError::AlreadyInactive)
            } else {
                Err(DispatchError::NoActiveRoute(driver_username.to_string()))
            };
        };

        let finished = self.store.finish_route(route.route_id)?;
        let entry = history::materialize_route(
            self.store.as_ref(),
            &finished,
            self.clock.today(),
            duration_hours.unwrap_or(0.0),
        );
        self.store.upsert_history(entry.clone());
        Ok(entry)
    }

    /// Resolve the driver for a delivery notification: the reported
    /// username when valid, otherwise the active route referencing the
    /// parcel.
    fn notification_driver(
        &self,
        parcel_id: &str,
        driver_username: Option<&str>,
    ) -> Option<Driver> {
        if let Some(driver) = driver_username.and_then(|u| self.store.driver(u).ok()) {
            return Some(driver);
        }
        self.store
            .active_routes()
            .iter()
            .find(|route| {
                route
                    .parcel_stops()
                    .any(|v| v.stop.parcel_id() == Some(parcel_id))
            })
            .and_then(|route| self.store.driver(&route.driver).ok())
    }
}
