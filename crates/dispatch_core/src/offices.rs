//! Office fallback: where undeliverable parcels go.
//!
//! - On an undelivered event, the parcel is linked to the geographically
//!   nearest office (company-scoped set when known, global otherwise)
//! - Drivers can ask for their remaining office drop-offs grouped by office
//! - Confirming a drop-off advances every listed parcel to `delivered` and
//!   appends one [`OfficeDelivery`] record

use std::collections::HashSet;

use h3o::LatLng;
use serde::Serialize;

use crate::clock::Clock;
use crate::error::{DispatchError, DispatchResult};
use crate::geo::{haversine_km, LonLat};
use crate::lifecycle::Transition;
use crate::model::{Office, OfficeDelivery, OfficeId, Parcel, ParcelStatus};
use crate::notify::{self, Notifier};
use crate::routing::TripService;
use crate::store::Store;

/// Parcels awaiting drop-off at one office.
#[derive(Debug, Clone)]
pub struct OfficeGroup {
    pub office: Office,
    pub parcels: Vec<Parcel>,
}

/// Remaining drop-offs for a driver, ordered by distance from the first
/// undelivered parcel still on the route.
#[derive(Debug, Clone, Default)]
pub struct OfficeRouteSuggestion {
    pub groups: Vec<OfficeGroup>,
    pub suggested_order: Vec<OfficeId>,
}

/// One office stop of an engine-optimized drop-off tour.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizedOfficeStop {
    pub visit_order: u32,
    pub office_id: OfficeId,
    pub office_name: String,
    pub lat: f64,
    pub lon: f64,
}

/// Engine-optimized tour over the selected offices.
#[derive(Debug, Clone)]
pub struct OptimizedOfficeRoute {
    pub stops: Vec<OptimizedOfficeStop>,
    pub geometry: Vec<LonLat>,
}

/// Pick the nearest office for an undelivered parcel.
///
/// The candidate set is the parcel's company offices; an empty company set
/// falls back to the global list. Ties break toward the lowest office id.
/// Returns `None` (logged) when no office exists at all.
pub fn nearest_office(store: &dyn Store, parcel: &Parcel) -> Option<Office> {
    let mut candidates = match parcel.company_id {
        Some(company) => {
            let scoped = store.offices_for_company(company);
            if scoped.is_empty() {
                log::info!(
                    "no offices for company {}; falling back to the global set",
                    company
                );
                store.offices()
            } else {
                scoped
            }
        }
        None => store.offices(),
    };
    if candidates.is_empty() {
        log::warn!("no office available for parcel {}", parcel.id);
        return None;
    }

    candidates.sort_by_key(|o| o.id);
    let mut best: Option<(f64, Office)> = None;
    for office in candidates {
        let km = haversine_km(parcel.location, office.location);
        if best.as_ref().map_or(true, |(best_km, _)| km < *best_km) {
            best = Some((km, office));
        }
    }
    best.map(|(_, office)| office)
}

/// Collect the driver's undelivered parcels that have not yet been dropped
/// off, grouped by their assigned office.
pub fn suggest_office_route(
    store: &dyn Store,
    driver: &str,
) -> DispatchResult<OfficeRouteSuggestion> {
    let route = store
        .active_route_for_driver(driver)
        .ok_or_else(|| DispatchError::NoActiveRoute(driver.to_string()))?;

    let dropped: HashSet<String> = store
        .office_deliveries_for(driver)
        .into_iter()
        .flat_map(|od| od.parcel_ids)
        .collect();

    let mut remaining: Vec<Parcel> = Vec::new();
    for visit in route.parcel_stops() {
        if visit.status != ParcelStatus::Undelivered {
            continue;
        }
        let id = visit.stop.parcel_id().expect("parcel stop has an id");
        if dropped.contains(id) {
            continue;
        }
        match store.parcel(id) {
            Ok(parcel) if parcel.status == ParcelStatus::Undelivered => remaining.push(parcel),
            _ => {}
        }
    }
    if remaining.is_empty() {
        return Ok(OfficeRouteSuggestion::default());
    }

    // Group by office in first-seen order.
    let mut groups: Vec<OfficeGroup> = Vec::new();
    for parcel in &remaining {
        let Some(office_id) = parcel.office_id else {
            continue;
        };
        if let Some(group) = groups.iter_mut().find(|g| g.office.id == office_id) {
            group.parcels.push(parcel.clone());
            continue;
        }
        match store.office(office_id) {
            Ok(office) => groups.push(OfficeGroup {
                office,
                parcels: vec![parcel.clone()],
            }),
            Err(_) => log::warn!(
                "parcel {} references missing office {}",
                parcel.id,
                office_id
            ),
        }
    }

    // Order offices by distance from the first remaining parcel; ties keep
    // the lower office id, so the order is stable and deterministic.
    let anchor = remaining[0].location;
    groups.sort_by(|a, b| {
        haversine_km(anchor, a.office.location)
            .partial_cmp(&haversine_km(anchor, b.office.location))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.office.id.cmp(&b.office.id))
    });
    let suggested_order = groups.iter().map(|g| g.office.id).collect();

    Ok(OfficeRouteSuggestion {
        groups,
        suggested_order,
    })
}

/// Ask the routing engine for an optimized tour from the driver's current
/// position over the selected offices.
pub fn optimize_office_route(
    store: &dyn Store,
    trips: &dyn TripService,
    driver: &str,
    current: LatLng,
    office_ids: &[OfficeId],
) -> DispatchResult<OptimizedOfficeRoute> {
    store.driver(driver)?;
    if office_ids.is_empty() {
        return Err(DispatchError::MissingField("office_ids"));
    }
    let offices: Vec<Office> = office_ids
        .iter()
        .map(|id| store.office(*id))
        .collect::<DispatchResult<_>>()?;

    let mut points = vec![current];
    points.extend(offices.iter().map(|o| o.location));
    let plan = trips.trip(&points)?;

    let mut stops = Vec::new();
    for (visit_pos, stop) in plan.stops.iter().enumerate() {
        // Skip the driver's own position at the head of the tour.
        if stop.input_index == 0 {
            continue;
        }
        let office = &offices[stop.input_index - 1];
        stops.push(OptimizedOfficeStop {
            visit_order: visit_pos as u32,
            office_id: office.id,
            office_name: office.name.clone(),
            lat: office.location.lat(),
            lon: office.location.lng(),
        });
    }

    Ok(OptimizedOfficeRoute {
        stops,
        geometry: plan.geometry,
    })
}

/// Record a confirmed drop-off batch.
///
/// Every listed parcel advances `undelivered -> delivered`, one
/// [`OfficeDelivery`] row is appended, and a pickup notification fires per
/// parcel (best-effort). Replaying the same batch on the same day is a
/// no-op returning the equivalent record.
pub fn record_office_delivery(
    store: &dyn Store,
    notifier: &dyn Notifier,
    clock: &dyn Clock,
    driver_username: &str,
    office_id: OfficeId,
    parcel_ids: &[String],
) -> DispatchResult<OfficeDelivery> {
    let driver = store.driver(driver_username)?;
    let office = store.office(office_id)?;
    if parcel_ids.is_empty() {
        return Err(DispatchError::MissingField("parcel_ids"));
    }

    // A replay of today's batch is a no-op, not an error.
    let today = clock.now().date_naive();
    let mut requested: Vec<&str> = parcel_ids.iter().map(String::as_str).collect();
    requested.sort_unstable();
    if let Some(existing) = store.office_deliveries_for(driver_username).into_iter().find(
        |existing| {
            let mut ids: Vec<&str> = existing.parcel_ids.iter().map(String::as_str).collect();
            ids.sort_unstable();
            existing.office_id == office_id
                && existing.recorded_at.date_naive() == today
                && ids == requested
        },
    ) {
        log::info!(
            "office drop-off for driver {} at office {} already recorded today",
            driver.username,
            office_id
        );
        return Ok(existing);
    }

    // Validate the whole batch before recording anything.
    for id in parcel_ids {
        let parcel = store.parcel(id)?;
        match parcel.status {
            ParcelStatus::Undelivered => {}
            ParcelStatus::Delivered => {
                return Err(DispatchError::AlreadyDelivered(id.clone()));
            }
            from => {
                return Err(DispatchError::IllegalTransition {
                    from,
                    to: ParcelStatus::Delivered,
                });
            }
        }
    }

    let delivery = OfficeDelivery {
        driver: driver.username.clone(),
        office_id,
        parcel_ids: parcel_ids.to_vec(),
        recorded_at: clock.now(),
        route_id: store
            .active_route_for_driver(driver_username)
            .map(|r| r.route_id),
    };
    if !store.insert_office_delivery(delivery.clone()) {
        return Ok(delivery);
    }

    for id in parcel_ids {
        let parcel = store.apply_transition(id, &Transition::OfficeDrop)?;
        notify::office_fallback_best_effort(notifier, &parcel, &office, &driver);
    }

    Ok(delivery)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::store::MemoryStore;
    use crate::test_helpers::{
        route_for, sample_driver, sample_office, sample_parcel, sample_truck, test_date,
        RecordingNotifier,
    };

    fn store_with_offices() -> MemoryStore {
        let store = MemoryStore::new();
        store.insert_driver(sample_driver("ivan"));
        store.insert_truck(sample_truck("CA0001", 100.0));
        store.insert_office(sample_office(1, "Center", 42.6977, 23.3219));
        store.insert_office(sample_office(2, "South", 42.6521, 23.3314));
        store.insert_office(sample_office(3, "East", 42.6561, 23.3775));
        store
    }

    #[test]
    fn nearest_office_is_chosen_by_distance() {
        let store = store_with_offices();
        // Right next to the South office.
        let parcel = sample_parcel("PKG0", 42.6530, 23.3310, 2.0);
        let office = nearest_office(&store, &parcel).expect("an office exists");
        assert_eq!(office.id, 2);
    }

    #[test]
    fn nearest_office_is_none_without_offices() {
        let store = MemoryStore::new();
        let parcel = sample_parcel("PKG0", 42.6530, 23.3310, 2.0);
        assert!(nearest_office(&store, &parcel).is_none());
    }

    #[test]
    fn company_scoped_offices_win_over_global() {
        let store = store_with_offices();
        let mut company_office = sample_office(9, "Company", 43.9, 24.9);
        company_office.company_id = Some(77);
        store.insert_office(company_office);

        let mut parcel = sample_parcel("PKG0", 42.6530, 23.3310, 2.0);
        parcel.company_id = Some(77);
        // The company office is far away, but it is the only in-scope one.
        let office = nearest_office(&store, &parcel).expect("an office exists");
        assert_eq!(office.id, 9);
    }

    #[test]
    fn suggestion_groups_by_office_and_orders_by_distance() {
        let store = store_with_offices();
        for (i, (lat, lon)) in [(42.6530, 23.3310), (42.6560, 23.3770), (42.6525, 23.3320)]
            .iter()
            .enumerate()
        {
            store.insert_parcel(sample_parcel(&format!("PKG{}", i), *lat, *lon, 2.0));
        }
        store
            .launch_routes(vec![route_for(
                "ivan",
                "CA0001",
                &["PKG0", "PKG1", "PKG2"],
                test_date(),
            )])
            .expect("launch");

        for id in ["PKG0", "PKG1", "PKG2"] {
            let parcel = store.parcel(id).expect("parcel");
            let office = nearest_office(&store, &parcel).expect("office");
            store
                .apply_transition(
                    id,
                    &Transition::MarkUndelivered {
                        office: Some(office.id),
                    },
                )
                .expect("undeliver");
        }

        let suggestion = suggest_office_route(&store, "ivan").expect("suggestion");
        // PKG0 and PKG2 share the South office, PKG1 goes East. The anchor is
        // PKG0, so South comes first.
        assert_eq!(suggestion.suggested_order, vec![2, 3]);
        assert_eq!(suggestion.groups[0].parcels.len(), 2);
        assert_eq!(suggestion.groups[1].parcels.len(), 1);
    }

    #[test]
    fn recorded_drop_offs_leave_the_suggestion() {
        let store = store_with_offices();
        store.insert_parcel(sample_parcel("PKG0", 42.6530, 23.3310, 2.0));
        store
            .launch_routes(vec![route_for("ivan", "CA0001", &["PKG0"], test_date())])
            .expect("launch");
        store
            .apply_transition("PKG0", &Transition::MarkUndelivered { office: Some(2) })
            .expect("undeliver");

        let clock = FixedClock::at_date(test_date());
        let notifier = RecordingNotifier::default();
        record_office_delivery(&store, &notifier, &clock, "ivan", 2, &["PKG0".to_string()])
            .expect("drop off");

        let suggestion = suggest_office_route(&store, "ivan").expect("suggestion");
        assert!(suggestion.groups.is_empty());
    }

    #[test]
    fn drop_off_delivers_parcels_and_notifies_once() {
        let store = store_with_offices();
        store.insert_parcel(sample_parcel("PKG0", 42.6530, 23.3310, 2.0));
        store
            .launch_routes(vec![route_for("ivan", "CA0001", &["PKG0"], test_date())])
            .expect("launch");
        store
            .apply_transition("PKG0", &Transition::MarkUndelivered { office: Some(2) })
            .expect("undeliver");

        let clock = FixedClock::at_date(test_date());
        let notifier = RecordingNotifier::default();
        let delivery =
            record_office_delivery(&store, &notifier, &clock, "ivan", 2, &["PKG0".to_string()])
                .expect("drop off");
        assert_eq!(delivery.parcel_ids, vec!["PKG0".to_string()]);

        let parcel = store.parcel("PKG0").expect("parcel");
        assert_eq!(parcel.status, ParcelStatus::Delivered);
        assert_eq!(parcel.office_id, None);
        assert_eq!(notifier.office_notices(), vec![("PKG0".to_string(), 2)]);

        // The active route's visit record follows the parcel.
        let route = store.active_route_for_driver("ivan").expect("route");
        let visit = route
            .parcel_stops()
            .find(|v| v.stop.parcel_id() == Some("PKG0"))
            .expect("visit");
        assert_eq!(visit.status, ParcelStatus::Delivered);

        // Replaying the batch the same day stores and notifies nothing new.
        record_office_delivery(&store, &notifier, &clock, "ivan", 2, &["PKG0".to_string()])
            .expect("replay is a no-op");
        assert_eq!(store.office_deliveries_for("ivan").len(), 1);
        assert_eq!(notifier.office_notices().len(), 1);
    }

    #[test]
    fn drop_off_rejects_parcels_not_undelivered() {
        let store = store_with_offices();
        store.insert_parcel(sample_parcel("PKG0", 42.6530, 23.3310, 2.0));

        let clock = FixedClock::at_date(test_date());
        let notifier = RecordingNotifier::default();
        let err =
            record_office_delivery(&store, &notifier, &clock, "ivan", 2, &["PKG0".to_string()])
                .expect_err("pending parcel cannot be dropped off");
        assert!(matches!(
            err,
            DispatchError::IllegalTransition {
                from: ParcelStatus::Pending,
                ..
            }
        ));
        assert!(store.office_deliveries_for("ivan").is_empty());
    }
}
