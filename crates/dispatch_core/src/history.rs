//! Delivery history: per-day, per-driver aggregates.
//!
//! A row is materialized when a journey finishes and upserted on
//! `(date, driver)`, so finishing twice (or re-finishing after corrections)
//! converges to the latest aggregate. Day queries merge materialized rows
//! with a fallback scan over parcels due that day, covering days where no
//! route row was written.

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::{DeliveryHistory, ParcelStatus, RouteAssignment};
use crate::store::Store;

/// Count and summed kilograms for one status class.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct DeliveryBucket {
    pub count: u32,
    pub kilos: f64,
}

/// One day of delivery activity, aggregated over all drivers.
#[derive(Debug, Clone, Serialize)]
pub struct DailySummary {
    pub date: NaiveDate,
    pub delivered: DeliveryBucket,
    pub undelivered: DeliveryBucket,
    pub trucks: u32,
    pub duration_hours: f64,
}

/// Aggregate the parcels cited by `route` into a history row for `date`.
///
/// The parcel row is authoritative for status and weight; a parcel that has
/// vanished from the store falls back to its plan-time snapshot.
pub fn materialize_route(
    store: &dyn Store,
    route: &RouteAssignment,
    date: NaiveDate,
    duration_hours: f64,
) -> DeliveryHistory {
    let mut entry = DeliveryHistory {
        date,
        driver: route.driver.clone(),
        truck: Some(route.truck.clone()),
        delivered_count: 0,
        delivered_kilos: 0.0,
        undelivered_count: 0,
        undelivered_kilos: 0.0,
        duration_hours,
        route_id: Some(route.route_id),
    };

    for visit in route.parcel_stops() {
        let snapshot = visit.stop.snapshot().expect("parcel stop has a snapshot");
        let (status, weight) = match store.parcel(&snapshot.id) {
            Ok(parcel) => (parcel.status, parcel.weight_kg),
            Err(_) => (visit.status, snapshot.weight_kg),
        };
        match status {
            ParcelStatus::Delivered => {
                entry.delivered_count += 1;
                entry.delivered_kilos += weight;
            }
            ParcelStatus::Undelivered => {
                entry.undelivered_count += 1;
                entry.undelivered_kilos += weight;
            }
            ParcelStatus::Pending | ParcelStatus::InTransit => {}
        }
    }
    entry
}

/// The last `days` days of activity, newest first. Days without any
/// materialized row fall back to a scan over parcels due that day.
pub fn daily_summaries(store: &dyn Store, today: NaiveDate, days: u32) -> Vec<DailySummary> {
    let mut out = Vec::new();
    for offset in 0..days {
        let date = today - chrono::Duration::days(i64::from(offset));
        let rows = store.history_on(date);
        let summary = if rows.is_empty() {
            scan_parcels_on(store, date)
        } else {
            let mut summary = DailySummary {
                date,
                delivered: DeliveryBucket::default(),
                undelivered: DeliveryBucket::default(),
                trucks: 0,
                duration_hours: 0.0,
            };
            for row in rows {
                summary.delivered.count += row.delivered_count;
                summary.delivered.kilos += row.delivered_kilos;
                summary.undelivered.count += row.undelivered_count;
                summary.undelivered.kilos += row.undelivered_kilos;
                summary.trucks += 1;
                summary.duration_hours += row.duration_hours;
            }
            Some(summary)
        };
        if let Some(summary) = summary {
            out.push(summary);
        }
    }
    out
}

/// Per-driver rows for one date (dashboard detail view).
pub fn detail_on(store: &dyn Store, date: NaiveDate) -> Vec<DeliveryHistory> {
    store.history_on(date)
}

fn scan_parcels_on(store: &dyn Store, date: NaiveDate) -> Option<DailySummary> {
    let mut delivered = DeliveryBucket::default();
    let mut undelivered = DeliveryBucket::default();
    for parcel in store.parcels() {
        if parcel.due_date != date {
            continue;
        }
        match parcel.status {
            ParcelStatus::Delivered => {
                delivered.count += 1;
                delivered.kilos += parcel.weight_kg;
            }
            ParcelStatus::Undelivered => {
                undelivered.count += 1;
                undelivered.kilos += parcel.weight_kg;
            }
            ParcelStatus::Pending | ParcelStatus::InTransit => {}
        }
    }
    if delivered.count == 0 && undelivered.count == 0 {
        return None;
    }
    Some(DailySummary {
        date,
        delivered,
        undelivered,
        // Truck count is unknown without route rows.
        trucks: 1,
        duration_hours: 0.0,
    })
}
