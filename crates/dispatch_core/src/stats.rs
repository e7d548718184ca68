//! Read-only projections for operational dashboards.

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::ParcelStatus;
use crate::store::Store;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ParcelCounts {
    pub total: usize,
    pub pending: usize,
    pub in_transit: usize,
    pub delivered: usize,
    pub undelivered: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TruckCounts {
    pub total: usize,
    pub used: usize,
    pub available: usize,
}

/// Load on one truck: stops assigned across its active routes.
#[derive(Debug, Clone, Serialize)]
pub struct TruckUsage {
    pub license_plate: String,
    pub capacity_kg: f64,
    pub in_use: bool,
    pub assigned_stops: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct DailyDelivered {
    pub date: NaiveDate,
    pub delivered: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct DriverCounts {
    pub total: usize,
    pub verified: usize,
    pub unverified: usize,
}

/// Dashboard snapshot of the whole operation.
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    pub parcels: ParcelCounts,
    pub trucks: TruckCounts,
    pub truck_usage: Vec<TruckUsage>,
    /// Delivered counts for the trailing week, oldest day first.
    pub daily_deliveries: Vec<DailyDelivered>,
    pub active_routes: usize,
    pub drivers: DriverCounts,
}

pub fn snapshot(store: &dyn Store, today: NaiveDate) -> StatsReport {
    let mut parcels = ParcelCounts::default();
    let all_parcels = store.parcels();
    parcels.total = all_parcels.len();
    for parcel in &all_parcels {
        match parcel.status {
            ParcelStatus::Pending => parcels.pending += 1,
            ParcelStatus::InTransit => parcels.in_transit += 1,
            ParcelStatus::Delivered => parcels.delivered += 1,
            ParcelStatus::Undelivered => parcels.undelivered += 1,
        }
    }

    let all_trucks = store.trucks();
    let used = all_trucks.iter().filter(|t| t.in_use).count();
    let trucks = TruckCounts {
        total: all_trucks.len(),
        used,
        available: all_trucks.len() - used,
    };

    let active_routes = store.active_routes_on(today);
    let truck_usage = all_trucks
        .iter()
        .map(|truck| {
            let assigned_stops = active_routes
                .iter()
                .filter(|r| r.truck == truck.license_plate)
                .map(|r| r.parcel_stops().count())
                .sum();
            TruckUsage {
                license_plate: truck.license_plate.clone(),
                capacity_kg: truck.capacity_kg,
                in_use: truck.in_use,
                assigned_stops,
            }
        })
        .collect();

    let mut daily_deliveries = Vec::with_capacity(7);
    for offset in (0..7).rev() {
        let date = today - chrono::Duration::days(offset);
        let delivered = all_parcels
            .iter()
            .filter(|p| p.due_date == date && p.status == ParcelStatus::Delivered)
            .count();
        daily_deliveries.push(DailyDelivered { date, delivered });
    }

    let all_drivers = store.drivers();
    let verified = all_drivers.iter().filter(|d| d.verified).count();
    let drivers = DriverCounts {
        total: all_drivers.len(),
        verified,
        unverified: all_drivers.len() - verified,
    };

    StatsReport {
        parcels,
        trucks,
        truck_usage,
        daily_deliveries,
        active_routes: active_routes.len(),
        drivers,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Transition;
    use crate::store::MemoryStore;
    use crate::test_helpers::{
        route_for, sample_driver, sample_parcel, sample_truck, test_date,
    };

    #[test]
    fn snapshot_counts_parcels_trucks_and_drivers() {
        let store = MemoryStore::new();
        store.insert_driver(sample_driver("ivan"));
        let mut unverified = sample_driver("petar");
        unverified.verified = false;
        store.insert_driver(unverified);
        store.insert_truck(sample_truck("CA0001", 50.0));
        store.insert_truck(sample_truck("CA0002", 200.0));
        for i in 0..4 {
            store.insert_parcel(sample_parcel(&format!("PKG{}", i), 42.69, 23.32, 2.0));
        }

        store
            .launch_routes(vec![route_for("ivan", "CA0001", &["PKG0", "PKG1"], test_date())])
            .expect("launch");
        store
            .apply_transition("PKG0", &Transition::Deliver { signature: None })
            .expect("deliver");

        let report = snapshot(&store, test_date());
        assert_eq!(report.parcels.total, 4);
        assert_eq!(report.parcels.pending, 2);
        assert_eq!(report.parcels.in_transit, 1);
        assert_eq!(report.parcels.delivered, 1);
        assert_eq!(report.trucks.used, 1);
        assert_eq!(report.trucks.available, 1);
        assert_eq!(report.active_routes, 1);
        assert_eq!(report.drivers.verified, 1);
        assert_eq!(report.drivers.unverified, 1);

        let usage = report
            .truck_usage
            .iter()
            .find(|u| u.license_plate == "CA0001")
            .expect("usage row");
        assert!(usage.in_use);
        assert_eq!(usage.assigned_stops, 2);

        assert_eq!(report.daily_deliveries.len(), 7);
        assert_eq!(
            report.daily_deliveries.last().expect("today").delivered,
            1
        );
    }
}
