//! Truck allocation: smallest sufficient truck per zone.
//!
//! Trucks are consumed greedily from the ascending-capacity list, so a
//! light zone never wastes a heavy truck. Allocation is all-or-nothing:
//! one unservable zone fails the whole plan and nothing downstream runs.

use std::cmp::Ordering;

use crate::cluster::Zone;
use crate::error::{DispatchError, DispatchResult};
use crate::model::Truck;

/// Assign each zone the smallest available truck whose capacity covers the
/// zone's weight. Returns the trucks aligned with the zone order.
pub fn allocate_trucks(zones: &[Zone], available: &[Truck]) -> DispatchResult<Vec<Truck>> {
    let mut pool: Vec<Truck> = available.iter().filter(|t| !t.in_use).cloned().collect();
    pool.sort_by(|a, b| {
        a.capacity_kg
            .partial_cmp(&b.capacity_kg)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.license_plate.cmp(&b.license_plate))
    });

    let mut assigned = Vec::with_capacity(zones.len());
    let mut unservable = Vec::new();
    for (idx, zone) in zones.iter().enumerate() {
        let weight = zone.weight_kg();
        match pool.iter().position(|t| t.capacity_kg >= weight) {
            Some(i) => assigned.push(pool.remove(i)),
            None => unservable.push(idx),
        }
    }

    if !unservable.is_empty() {
        return Err(DispatchError::InsufficientCapacity { zones: unservable });
    }
    Ok(assigned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{sample_parcel, sample_truck};

    fn zone_weighing(id_prefix: &str, weights: &[f64]) -> Zone {
        Zone {
            parcels: weights
                .iter()
                .enumerate()
                .map(|(i, w)| sample_parcel(&format!("{}{}", id_prefix, i), 42.69, 23.32, *w))
                .collect(),
        }
    }

    #[test]
    fn smallest_sufficient_truck_wins() {
        let zones = vec![zone_weighing("A", &[10.0, 20.0]), zone_weighing("B", &[30.0, 40.0])];
        let trucks = vec![sample_truck("CA5050", 50.0), sample_truck("CA2000", 200.0)];

        let assigned = allocate_trucks(&zones, &trucks).expect("allocation succeeds");
        assert_eq!(assigned[0].license_plate, "CA5050");
        assert_eq!(assigned[1].license_plate, "CA2000");
    }

    #[test]
    fn zero_weight_zone_takes_the_smallest_truck() {
        let zones = vec![Zone::default(), zone_weighing("A", &[60.0])];
        let trucks = vec![sample_truck("CA0001", 40.0), sample_truck("CA0002", 100.0)];

        let assigned = allocate_trucks(&zones, &trucks).expect("allocation succeeds");
        assert_eq!(assigned[0].license_plate, "CA0001");
        assert_eq!(assigned[1].license_plate, "CA0002");
    }

    #[test]
    fn unservable_zone_fails_the_whole_plan() {
        let zones = vec![zone_weighing("A", &[10.0]), zone_weighing("B", &[90.0])];
        let trucks = vec![sample_truck("CA0001", 20.0), sample_truck("CA0002", 20.0)];

        let err = allocate_trucks(&zones, &trucks).expect_err("must fail");
        assert!(matches!(
            err,
            DispatchError::InsufficientCapacity { zones } if zones == vec![1]
        ));
    }

    #[test]
    fn in_use_trucks_are_not_considered() {
        let zones = vec![zone_weighing("A", &[10.0])];
        let mut busy = sample_truck("CA0001", 50.0);
        busy.in_use = true;
        let trucks = vec![busy, sample_truck("CA0002", 60.0)];

        let assigned = allocate_trucks(&zones, &trucks).expect("allocation succeeds");
        assert_eq!(assigned[0].license_plate, "CA0002");
    }

    #[test]
    fn more_zones_than_trucks_reports_the_tail_zones() {
        let zones = vec![
            zone_weighing("A", &[10.0]),
            zone_weighing("B", &[10.0]),
            zone_weighing("C", &[10.0]),
        ];
        let trucks = vec![sample_truck("CA0001", 50.0)];

        let err = allocate_trucks(&zones, &trucks).expect_err("must fail");
        assert!(matches!(
            err,
            DispatchError::InsufficientCapacity { zones } if zones == vec![1, 2]
        ));
    }
}
