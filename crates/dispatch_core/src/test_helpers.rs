//! Test helpers for common fixtures and scripted collaborators.
//!
//! This module provides shared builders so tests across modules agree on
//! dates, coordinates, and entity shapes, plus a scripted [`TripService`]
//! and a recording [`Notifier`].

use std::sync::Mutex;

use chrono::NaiveDate;
use h3o::LatLng;

use crate::geo::{self, LonLat};
use crate::model::{
    Driver, Office, OfficeId, Parcel, ParcelSnapshot, ParcelStatus, RouteAssignment, Truck,
    VisitRecord, VisitStop,
};
use crate::notify::{Notifier, NotifyError};
use crate::routing::{single_point_plan, TripError, TripPlan, TripService, TripStop};

/// The date every fixture lives on.
pub fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 21).expect("valid date")
}

pub fn sample_parcel(id: &str, lat: f64, lon: f64, weight_kg: f64) -> Parcel {
    Parcel {
        id: id.to_string(),
        address: format!("{} Test Street", id),
        location: LatLng::new(lat, lon).expect("fixture coordinate in range"),
        recipient: "Test Recipient".to_string(),
        phone: "0888123456".to_string(),
        email: Some(format!("{}@example.com", id.to_lowercase())),
        due_date: test_date(),
        weight_kg,
        status: ParcelStatus::Pending,
        office_id: None,
        signature: None,
        company_id: None,
    }
}

pub fn sample_driver(username: &str) -> Driver {
    Driver {
        username: username.to_string(),
        display_name: None,
        company_id: None,
        verified: true,
    }
}

pub fn sample_truck(license_plate: &str, capacity_kg: f64) -> Truck {
    Truck {
        license_plate: license_plate.to_string(),
        capacity_kg,
        in_use: false,
    }
}

pub fn sample_office(id: OfficeId, name: &str, lat: f64, lon: f64) -> Office {
    Office {
        id,
        name: name.to_string(),
        address: format!("{} Office Street", name),
        company_id: None,
        location: LatLng::new(lat, lon).expect("fixture coordinate in range"),
    }
}

/// A ready-to-launch route over the given parcel ids: depot first, one stop
/// per parcel, closing return record last.
pub fn route_for(
    driver: &str,
    truck: &str,
    parcel_ids: &[&str],
    date: NaiveDate,
) -> RouteAssignment {
    let depot_wire: LonLat = [23.3750, 42.6666];
    let mut sequence = vec![VisitRecord {
        visit_order: 0,
        stop: VisitStop::Depot,
        snapped: depot_wire,
        inbound_duration_s: 0.0,
        status: ParcelStatus::Pending,
        is_return_leg: false,
    }];
    for (i, id) in parcel_ids.iter().enumerate() {
        let parcel = sample_parcel(id, 42.69 + i as f64 * 0.01, 23.32, 1.0);
        sequence.push(VisitRecord {
            visit_order: (i + 1) as u32,
            stop: VisitStop::Parcel {
                snapshot: ParcelSnapshot::of(&parcel),
            },
            snapped: geo::to_wire(parcel.location),
            inbound_duration_s: 60.0,
            status: ParcelStatus::Pending,
            is_return_leg: false,
        });
    }
    sequence.push(VisitRecord {
        visit_order: (parcel_ids.len() + 1) as u32,
        stop: VisitStop::Depot,
        snapped: depot_wire,
        inbound_duration_s: 60.0,
        status: ParcelStatus::Pending,
        is_return_leg: true,
    });

    RouteAssignment {
        route_id: 0,
        driver: driver.to_string(),
        truck: truck.to_string(),
        created_on: date,
        is_active: true,
        sequence,
        path_geometry: vec![depot_wire],
    }
}

/// Scripted [`TripService`]: fixed leg durations, optional visit order,
/// records every call for assertions.
pub struct ScriptedTrips {
    leg_duration_s: f64,
    visit_order: Option<Vec<usize>>,
    fail_code: Mutex<Option<String>>,
    calls: Mutex<Vec<Vec<LonLat>>>,
}

impl ScriptedTrips {
    pub fn new(leg_duration_s: f64) -> Self {
        Self {
            leg_duration_s,
            visit_order: None,
            fail_code: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Serve stops in the given visit order (input indices). Falls back to
    /// input order for calls with a different point count.
    pub fn with_visit_order(mut self, order: Vec<usize>) -> Self {
        self.visit_order = Some(order);
        self
    }

    /// Make subsequent calls fail with the given engine code.
    pub fn fail_with_code(&self, code: &str) {
        *self.fail_code.lock().expect("lock poisoned") = Some(code.to_string());
    }

    /// Every point list this service has been asked to optimize.
    pub fn calls(&self) -> Vec<Vec<LonLat>> {
        self.calls.lock().expect("lock poisoned").clone()
    }
}

impl TripService for ScriptedTrips {
    fn trip(&self, points: &[LatLng]) -> Result<TripPlan, TripError> {
        self.calls
            .lock()
            .expect("lock poisoned")
            .push(points.iter().map(|p| geo::to_wire(*p)).collect());

        if let Some(code) = self.fail_code.lock().expect("lock poisoned").clone() {
            return Err(TripError::EngineCode(code));
        }
        if points.is_empty() {
            return Err(TripError::NoPoints);
        }
        if points.len() == 1 {
            return Ok(single_point_plan(points[0]));
        }

        let order: Vec<usize> = match &self.visit_order {
            Some(order) if order.len() == points.len() => order.clone(),
            _ => (0..points.len()).collect(),
        };

        let stops = order
            .iter()
            .enumerate()
            .map(|(pos, &input_index)| TripStop {
                input_index,
                snapped: geo::to_wire(points[input_index]),
                inbound_duration_s: if pos == 0 { 0.0 } else { self.leg_duration_s },
            })
            .collect();
        let mut geometry: Vec<LonLat> = order.iter().map(|&i| geo::to_wire(points[i])).collect();
        geometry.push(geo::to_wire(points[order[0]]));

        Ok(TripPlan {
            stops,
            return_duration_s: self.leg_duration_s,
            geometry,
        })
    }
}

/// Recording [`Notifier`]: captures notices, optionally failing on demand.
#[derive(Default)]
pub struct RecordingNotifier {
    delivered: Mutex<Vec<(String, String)>>,
    office: Mutex<Vec<(String, OfficeId)>>,
    fail: Mutex<bool>,
}

impl RecordingNotifier {
    pub fn fail_next_sends(&self) {
        *self.fail.lock().expect("lock poisoned") = true;
    }

    /// `(parcel id, driver username)` pairs, in send order.
    pub fn delivered_notices(&self) -> Vec<(String, String)> {
        self.delivered.lock().expect("lock poisoned").clone()
    }

    /// `(parcel id, office id)` pairs, in send order.
    pub fn office_notices(&self) -> Vec<(String, OfficeId)> {
        self.office.lock().expect("lock poisoned").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify_delivered(&self, parcel: &Parcel, driver: &Driver) -> Result<(), NotifyError> {
        if *self.fail.lock().expect("lock poisoned") {
            return Err(NotifyError("scripted failure".to_string()));
        }
        self.delivered
            .lock()
            .expect("lock poisoned")
            .push((parcel.id.clone(), driver.username.clone()));
        Ok(())
    }

    fn notify_office_fallback(
        &self,
        parcel: &Parcel,
        office: &Office,
        _driver: &Driver,
    ) -> Result<(), NotifyError> {
        if *self.fail.lock().expect("lock poisoned") {
            return Err(NotifyError("scripted failure".to_string()));
        }
        self.office
            .lock()
            .expect("lock poisoned")
            .push((parcel.id.clone(), office.id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_trips_default_to_input_order() {
        let trips = ScriptedTrips::new(30.0);
        let points = vec![
            LatLng::new(42.0, 23.0).expect("valid"),
            LatLng::new(42.1, 23.1).expect("valid"),
        ];
        let plan = trips.trip(&points).expect("plan");
        assert_eq!(plan.stops[0].input_index, 0);
        assert_eq!(plan.stops[1].input_index, 1);
        assert_eq!(plan.stops[1].inbound_duration_s, 30.0);
        assert_eq!(plan.geometry.len(), 3);
        assert_eq!(trips.calls().len(), 1);
    }
}
