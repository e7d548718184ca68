//! In-process store: a single mutex acts as the transaction boundary.
//!
//! All operations run strictly serialized, which subsumes the per-parcel
//! critical section the lifecycle contract requires. A SQL-backed
//! implementation of [`Store`] would replace the mutex with transactions
//! and a partial unique index on `(driver, is_active)`.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use chrono::NaiveDate;

use super::Store;
use crate::error::{DispatchError, DispatchResult};
use crate::geo::LonLat;
use crate::lifecycle::{self, Transition};
use crate::model::{
    CompanyId, DeliveryHistory, Driver, DriverId, Office, OfficeDelivery, OfficeId, Parcel,
    ParcelStatus, RouteAssignment, RouteId, Truck,
};

#[derive(Debug, Default)]
struct Inner {
    parcels: BTreeMap<String, Parcel>,
    trucks: BTreeMap<String, Truck>,
    drivers: BTreeMap<String, Driver>,
    offices: BTreeMap<OfficeId, Office>,
    routes: BTreeMap<RouteId, RouteAssignment>,
    next_route_id: RouteId,
    history: BTreeMap<(NaiveDate, DriverId), DeliveryHistory>,
    office_deliveries: Vec<OfficeDelivery>,
}

/// In-memory [`Store`] implementation.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_route_id: 1,
                ..Inner::default()
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().expect("store mutex poisoned")
    }
}

impl Store for MemoryStore {
    fn insert_parcel(&self, parcel: Parcel) {
        self.lock().parcels.insert(parcel.id.clone(), parcel);
    }

    fn parcel(&self, id: &str) -> DispatchResult<Parcel> {
        self.lock()
            .parcels
            .get(id)
            .cloned()
            .ok_or_else(|| DispatchError::UnknownParcel(id.to_string()))
    }

    fn parcels(&self) -> Vec<Parcel> {
        self.lock().parcels.values().cloned().collect()
    }

    fn parcels_with_status(&self, status: ParcelStatus) -> Vec<Parcel> {
        self.lock()
            .parcels
            .values()
            .filter(|p| p.status == status)
            .cloned()
            .collect()
    }

    fn pending_due_by(&self, by: NaiveDate) -> Vec<Parcel> {
        let inner = self.lock();
        let mut parcels: Vec<Parcel> = inner
            .parcels
            .values()
            .filter(|p| p.status == ParcelStatus::Pending && p.due_date <= by)
            .cloned()
            .collect();
        parcels.sort_by(|a, b| a.due_date.cmp(&b.due_date).then_with(|| a.id.cmp(&b.id)));
        parcels
    }

    fn apply_transition(&self, parcel_id: &str, transition: &Transition) -> DispatchResult<Parcel> {
        let mut inner = self.lock();
        let parcel = inner
            .parcels
            .get_mut(parcel_id)
            .ok_or_else(|| DispatchError::UnknownParcel(parcel_id.to_string()))?;
        lifecycle::apply(parcel, transition)?;
        let status = parcel.status;
        let updated = parcel.clone();

        let mut touched = false;
        for route in inner.routes.values_mut().filter(|r| r.is_active) {
            for visit in &mut route.sequence {
                if visit.stop.parcel_id() == Some(parcel_id) {
                    visit.status = status;
                    touched = true;
                }
            }
        }
        if !touched {
            log::debug!("parcel {} is not referenced by any active route", parcel_id);
        }
        Ok(updated)
    }

    fn insert_truck(&self, truck: Truck) {
        self.lock().trucks.insert(truck.license_plate.clone(), truck);
    }

    fn truck(&self, license_plate: &str) -> DispatchResult<Truck> {
        self.lock()
            .trucks
            .get(license_plate)
            .cloned()
            .ok_or_else(|| DispatchError::UnknownTruck(license_plate.to_string()))
    }

    fn trucks(&self) -> Vec<Truck> {
        self.lock().trucks.values().cloned().collect()
    }

    fn available_trucks(&self) -> Vec<Truck> {
        let mut trucks: Vec<Truck> = self
            .lock()
            .trucks
            .values()
            .filter(|t| !t.in_use)
            .cloned()
            .collect();
        trucks.sort_by(|a, b| {
            a.capacity_kg
                .partial_cmp(&b.capacity_kg)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.license_plate.cmp(&b.license_plate))
        });
        trucks
    }

    fn insert_driver(&self, driver: Driver) {
        self.lock().drivers.insert(driver.username.clone(), driver);
    }

    fn driver(&self, username: &str) -> DispatchResult<Driver> {
        self.lock()
            .drivers
            .get(username)
            .cloned()
            .ok_or_else(|| DispatchError::UnknownDriver(username.to_string()))
    }

    fn drivers(&self) -> Vec<Driver> {
        self.lock().drivers.values().cloned().collect()
    }

    fn insert_office(&self, office: Office) {
        self.lock().offices.insert(office.id, office);
    }

    fn office(&self, id: OfficeId) -> DispatchResult<Office> {
        self.lock()
            .offices
            .get(&id)
            .cloned()
            .ok_or(DispatchError::UnknownOffice(id))
    }

    fn offices(&self) -> Vec<Office> {
        self.lock().offices.values().cloned().collect()
    }

    fn offices_for_company(&self, company: CompanyId) -> Vec<Office> {
        self.lock()
            .offices
            .values()
            .filter(|o| o.company_id == Some(company))
            .cloned()
            .collect()
    }

    fn launch_routes(&self, routes: Vec<RouteAssignment>) -> DispatchResult<Vec<RouteAssignment>> {
        let mut inner = self.lock();

        // Validate the whole batch before mutating anything.
        let mut batch_drivers: HashSet<&str> = HashSet::new();
        let mut batch_trucks: HashSet<&str> = HashSet::new();
        for route in &routes {
            if inner
                .routes
                .values()
                .any(|r| r.is_active && r.driver == route.driver)
                || !batch_drivers.insert(route.driver.as_str())
            {
                return Err(DispatchError::ActiveRouteExists(route.driver.clone()));
            }
            let truck = inner
                .trucks
                .get(&route.truck)
                .ok_or_else(|| DispatchError::UnknownTruck(route.truck.clone()))?;
            if truck.in_use || !batch_trucks.insert(route.truck.as_str()) {
                return Err(DispatchError::TruckInUse(route.truck.clone()));
            }
            for visit in route.parcel_stops() {
                let id = visit.stop.parcel_id().expect("parcel stop has an id");
                let parcel = inner
                    .parcels
                    .get(id)
                    .ok_or_else(|| DispatchError::UnknownParcel(id.to_string()))?;
                lifecycle::validate(id, parcel.status, &Transition::Start)?;
            }
        }

        // Commit.
        let mut stored = Vec::with_capacity(routes.len());
        for mut route in routes {
            route.route_id = inner.next_route_id;
            inner.next_route_id += 1;
            route.is_active = true;

            inner
                .trucks
                .get_mut(&route.truck)
                .expect("truck validated above")
                .in_use = true;

            for visit in &mut route.sequence {
                if let Some(id) = visit.stop.parcel_id().map(str::to_string) {
                    let parcel = inner.parcels.get_mut(&id).expect("parcel validated above");
                    // A parcel referenced more than once in the batch starts
                    // on its first occurrence.
                    if parcel.status == ParcelStatus::Pending {
                        lifecycle::apply(parcel, &Transition::Start)
                            .expect("transition validated above");
                    }
                    visit.status = parcel.status;
                }
            }

            inner.routes.insert(route.route_id, route.clone());
            stored.push(route);
        }
        Ok(stored)
    }

    fn route(&self, route_id: RouteId) -> DispatchResult<RouteAssignment> {
        self.lock()
            .routes
            .get(&route_id)
            .cloned()
            .ok_or_else(|| DispatchError::StoreFailure(format!("route {} not found", route_id)))
    }

    fn active_route_for_driver(&self, driver: &str) -> Option<RouteAssignment> {
        self.lock()
            .routes
            .values()
            .find(|r| r.is_active && r.driver == driver)
            .cloned()
    }

    fn latest_route_for_driver(&self, driver: &str) -> Option<RouteAssignment> {
        self.lock()
            .routes
            .values()
            .filter(|r| r.driver == driver)
            .max_by_key(|r| r.route_id)
            .cloned()
    }

    fn active_routes(&self) -> Vec<RouteAssignment> {
        self.lock()
            .routes
            .values()
            .filter(|r| r.is_active)
            .cloned()
            .collect()
    }

    fn active_routes_on(&self, date: NaiveDate) -> Vec<RouteAssignment> {
        self.lock()
            .routes
            .values()
            .filter(|r| r.is_active && r.created_on == date)
            .cloned()
            .collect()
    }

    fn finish_route(&self, route_id: RouteId) -> DispatchResult<RouteAssignment> {
        let mut inner = self.lock();
        let route = inner
            .routes
            .get_mut(&route_id)
            .ok_or_else(|| DispatchError::StoreFailure(format!("route {} not found", route_id)))?;
        if !route.is_active {
            return Err(DispatchError::AlreadyInactive);
        }
        route.is_active = false;
        let finished = route.clone();
        if let Some(truck) = inner.trucks.get_mut(&finished.truck) {
            truck.in_use = false;
        }
        Ok(finished)
    }

    fn update_route_geometry(
        &self,
        route_id: RouteId,
        geometry: Vec<LonLat>,
    ) -> DispatchResult<()> {
        let mut inner = self.lock();
        let route = inner
            .routes
            .get_mut(&route_id)
            .ok_or_else(|| DispatchError::StoreFailure(format!("route {} not found", route_id)))?;
        route.path_geometry = geometry;
        Ok(())
    }

    fn drop_all_routes(&self) -> usize {
        let mut inner = self.lock();
        let dropped = inner.routes.len();

        let referenced: Vec<String> = inner
            .routes
            .values()
            .filter(|r| r.is_active)
            .flat_map(|r| {
                r.parcel_stops()
                    .filter_map(|v| v.stop.parcel_id().map(str::to_string))
            })
            .collect();
        for id in referenced {
            if let Some(parcel) = inner.parcels.get_mut(&id) {
                parcel.status = ParcelStatus::Pending;
                parcel.office_id = None;
            }
        }
        for truck in inner.trucks.values_mut() {
            truck.in_use = false;
        }
        inner.routes.clear();
        dropped
    }

    fn upsert_history(&self, entry: DeliveryHistory) {
        self.lock()
            .history
            .insert((entry.date, entry.driver.clone()), entry);
    }

    fn history_on(&self, date: NaiveDate) -> Vec<DeliveryHistory> {
        self.lock()
            .history
            .values()
            .filter(|h| h.date == date)
            .cloned()
            .collect()
    }

    fn history_for_driver_on(&self, driver: &str, date: NaiveDate) -> Option<DeliveryHistory> {
        self.lock().history.get(&(date, driver.to_string())).cloned()
    }

    fn insert_office_delivery(&self, delivery: OfficeDelivery) -> bool {
        let mut inner = self.lock();
        let day = delivery.recorded_at.date_naive();
        let mut new_set: Vec<&str> = delivery.parcel_ids.iter().map(String::as_str).collect();
        new_set.sort_unstable();

        let duplicate = inner.office_deliveries.iter().any(|existing| {
            if existing.driver != delivery.driver
                || existing.office_id != delivery.office_id
                || existing.recorded_at.date_naive() != day
            {
                return false;
            }
            let mut existing_set: Vec<&str> =
                existing.parcel_ids.iter().map(String::as_str).collect();
            existing_set.sort_unstable();
            existing_set == new_set
        });
        if duplicate {
            return false;
        }
        inner.office_deliveries.push(delivery);
        true
    }

    fn office_deliveries_for(&self, driver: &str) -> Vec<OfficeDelivery> {
        self.lock()
            .office_deliveries
            .iter()
            .filter(|od| od.driver == driver)
            .cloned()
            .collect()
    }
}
