//! Parcel partitioning: one geographic zone per selected driver.
//!
//! Zones are produced in driver order (zone *i* goes to driver *i*) and
//! every parcel lands in exactly one zone. Partitioning is a seeded k-means
//! over latitude/longitude; a rebalancing pass then guarantees no zone is
//! empty while another can donate, so the truck allocator always sees a
//! workload per driver.

use h3o::LatLng;

use crate::model::Parcel;

mod kmeans;
mod rebalance;

/// A partition of parcels destined for a single driver.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Zone {
    pub parcels: Vec<Parcel>,
}

impl Zone {
    pub fn weight_kg(&self) -> f64 {
        self.parcels.iter().map(|p| p.weight_kg).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.parcels.is_empty()
    }

    /// Mean coordinate of the zone's parcels; `None` for an empty zone.
    pub fn centroid(&self) -> Option<LatLng> {
        if self.parcels.is_empty() {
            return None;
        }
        let n = self.parcels.len() as f64;
        let lat = self.parcels.iter().map(|p| p.location.lat()).sum::<f64>() / n;
        let lon = self.parcels.iter().map(|p| p.location.lng()).sum::<f64>() / n;
        LatLng::new(lat, lon).ok()
    }
}

/// Partition `parcels` into exactly `driver_count` zones.
///
/// Deterministic for a fixed `seed`. With a single driver all parcels form
/// one zone and the partitioner is skipped.
pub fn cluster_parcels(
    parcels: &[Parcel],
    driver_count: usize,
    seed: u64,
    max_iters: usize,
) -> Vec<Zone> {
    if driver_count == 0 {
        return Vec::new();
    }
    if driver_count == 1 {
        return vec![Zone {
            parcels: parcels.to_vec(),
        }];
    }

    let mut zones = kmeans::partition(parcels, driver_count, seed, max_iters);
    rebalance::fill_empty_zones(&mut zones);
    zones
}
