//! Plan assembly: from pending parcels to persisted driver routes.
//!
//! Pipeline: eligibility window -> clusterer -> truck allocator -> per-zone
//! trip optimization -> one transactional batch insert. Every route begins
//! at the depot and carries a synthetic closing record back to it. A failure
//! anywhere (unservable zone, engine error, active-route conflict) persists
//! nothing.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::allocator;
use crate::clock::Clock;
use crate::cluster::{self, Zone};
use crate::config::PlannerConfig;
use crate::error::{DispatchError, DispatchResult};
use crate::geo;
use crate::model::{
    Driver, Parcel, ParcelSnapshot, ParcelStatus, RouteAssignment, Truck, VisitRecord, VisitStop,
};
use crate::routing::{TripError, TripPlan, TripService};
use crate::store::Store;

/// Builds and persists delivery plans.
pub struct RoutePlanner {
    store: Arc<dyn Store>,
    trips: Arc<dyn TripService>,
    clock: Arc<dyn Clock>,
    config: PlannerConfig,
}

impl RoutePlanner {
    pub fn new(
        store: Arc<dyn Store>,
        trips: Arc<dyn TripService>,
        clock: Arc<dyn Clock>,
        config: PlannerConfig,
    ) -> Self {
        Self {
            store,
            trips,
            clock,
            config,
        }
    }

    /// Pending parcels inside the eligibility window, overdue first.
    pub fn eligible_parcels(&self) -> Vec<Parcel> {
        let today = self.clock.today();
        let horizon = today + chrono::Duration::days(self.config.due_within_days);
        let mut parcels = self.store.pending_due_by(horizon);
        parcels.sort_by(|a, b| {
            delivery_priority(a.due_date, today)
                .cmp(&delivery_priority(b.due_date, today))
                .then_with(|| a.due_date.cmp(&b.due_date))
                .then_with(|| a.id.cmp(&b.id))
        });
        parcels
    }

    /// Plan one route per selected driver and persist the batch.
    pub fn plan_routes(&self, driver_usernames: &[String]) -> DispatchResult<Vec<RouteAssignment>> {
        if driver_usernames.is_empty() {
            return Err(DispatchError::MissingField("drivers"));
        }
        let mut drivers = Vec::with_capacity(driver_usernames.len());
        for username in driver_usernames {
            let driver = self.store.driver(username)?;
            if !driver.verified {
                return Err(DispatchError::DriverNotVerified(username.clone()));
            }
            if self.store.active_route_for_driver(username).is_some() {
                return Err(DispatchError::ActiveRouteExists(username.clone()));
            }
            drivers.push(driver);
        }

        let parcels = self.eligible_parcels();
        if parcels.is_empty() {
            return Err(DispatchError::NoEligibleParcels);
        }

        let zones = cluster::cluster_parcels(
            &parcels,
            drivers.len(),
            self.config.cluster_seed,
            self.config.cluster_max_iters,
        );
        let trucks = allocator::allocate_trucks(&zones, &self.store.available_trucks())?;

        let today = self.clock.today();
        let mut routes = Vec::new();
        for ((zone, driver), truck) in zones.iter().zip(&drivers).zip(&trucks) {
            if zone.is_empty() {
                log::info!("no parcels left for driver {}", driver.username);
                continue;
            }
            routes.push(self.assemble_route(driver, truck, zone, today)?);
        }

        self.store.launch_routes(routes)
    }

    /// One zone into a depot-anchored route.
    fn assemble_route(
        &self,
        driver: &Driver,
        truck: &Truck,
        zone: &Zone,
        today: NaiveDate,
    ) -> DispatchResult<RouteAssignment> {
        let depot = self.config.depot();
        let depot_wire = geo::to_wire(depot);

        let (sequence, geometry) = if zone.parcels.len() == 1 {
            // A lone delivery needs no optimization: depot, parcel, return.
            let parcel = &zone.parcels[0];
            let parcel_wire = geo::to_wire(parcel.location);
            let sequence = vec![
                depot_record(0, depot_wire, 0.0, false),
                parcel_record(1, parcel, parcel_wire, 0.0),
                depot_record(2, depot_wire, 0.0, true),
            ];
            (sequence, vec![depot_wire, parcel_wire, depot_wire])
        } else {
            let mut points = vec![depot];
            points.extend(zone.parcels.iter().map(|p| p.location));
            let plan = self.trips.trip(&points)?;
            (build_sequence(zone, &plan)?, plan.geometry)
        };

        Ok(RouteAssignment {
            route_id: 0,
            driver: driver.username.clone(),
            truck: truck.license_plate.clone(),
            created_on: today,
            is_active: true,
            sequence,
            path_geometry: geometry,
        })
    }
}

fn delivery_priority(due: NaiveDate, today: NaiveDate) -> u8 {
    if due < today {
        0
    } else if due == today {
        1
    } else {
        2
    }
}

fn depot_record(
    visit_order: u32,
    snapped: geo::LonLat,
    inbound_duration_s: f64,
    is_return_leg: bool,
) -> VisitRecord {
    VisitRecord {
        visit_order,
        stop: VisitStop::Depot,
        snapped,
        inbound_duration_s,
        status: ParcelStatus::Pending,
        is_return_leg,
    }
}

fn parcel_record(
    visit_order: u32,
    parcel: &Parcel,
    snapped: geo::LonLat,
    inbound_duration_s: f64,
) -> VisitRecord {
    VisitRecord {
        visit_order,
        stop: VisitStop::Parcel {
            snapshot: ParcelSnapshot::of(parcel),
        },
        snapped,
        inbound_duration_s,
        status: parcel.status,
        is_return_leg: false,
    }
}

/// Visit-ordered records from an engine plan over `[depot, parcels...]`,
/// with the synthetic closing record appended.
fn build_sequence(zone: &Zone, plan: &TripPlan) -> DispatchResult<Vec<VisitRecord>> {
    let first = plan
        .stops
        .first()
        .filter(|stop| stop.input_index == 0)
        .ok_or_else(|| {
            DispatchError::Engine(TripError::Decode(
                "optimized trip does not start at the depot".to_string(),
            ))
        })?;

    let mut sequence = Vec::with_capacity(plan.stops.len() + 1);
    sequence.push(depot_record(0, first.snapped, 0.0, false));

    for (visit_pos, stop) in plan.stops.iter().enumerate().skip(1) {
        let parcel = zone.parcels.get(stop.input_index - 1).ok_or_else(|| {
            DispatchError::Engine(TripError::Decode(format!(
                "waypoint references input {} outside the zone",
                stop.input_index
            )))
        })?;
        sequence.push(parcel_record(
            visit_pos as u32,
            parcel,
            stop.snapped,
            stop.inbound_duration_s,
        ));
    }

    sequence.push(depot_record(
        plan.stops.len() as u32,
        first.snapped,
        plan.return_duration_s,
        true,
    ));
    Ok(sequence)
}
