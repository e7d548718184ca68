//! Seeded k-means over latitude/longitude degrees.
//!
//! Plain Euclidean distance in degree space is sufficient at city scale;
//! the rebalancing pass downstream corrects degenerate splits.

use rand::rngs::StdRng;
use rand::SeedableRng;

use super::Zone;
use crate::model::Parcel;

pub(super) fn partition(parcels: &[Parcel], k: usize, seed: u64, max_iters: usize) -> Vec<Zone> {
    let mut zones = vec![Zone::default(); k];
    if parcels.is_empty() {
        return zones;
    }

    let mut rng = StdRng::seed_from_u64(seed);
    // Initial centroids are distinct parcels; with fewer parcels than zones
    // the surplus zones start (and may stay) empty.
    let centroid_count = k.min(parcels.len());
    let chosen = rand::seq::index::sample(&mut rng, parcels.len(), centroid_count);
    let mut centroids: Vec<(f64, f64)> = chosen
        .iter()
        .map(|i| (parcels[i].location.lat(), parcels[i].location.lng()))
        .collect();

    let mut assignment = vec![0usize; parcels.len()];
    for _ in 0..max_iters.max(1) {
        let mut changed = false;
        for (i, parcel) in parcels.iter().enumerate() {
            let nearest = nearest_centroid(&centroids, parcel);
            if assignment[i] != nearest {
                assignment[i] = nearest;
                changed = true;
            }
        }

        // Recompute centroids as the mean of their members; a centroid that
        // lost all members keeps its position.
        let mut sums = vec![(0.0f64, 0.0f64, 0usize); centroids.len()];
        for (i, parcel) in parcels.iter().enumerate() {
            let slot = &mut sums[assignment[i]];
            slot.0 += parcel.location.lat();
            slot.1 += parcel.location.lng();
            slot.2 += 1;
        }
        for (centroid, (lat_sum, lon_sum, count)) in centroids.iter_mut().zip(&sums) {
            if *count > 0 {
                *centroid = (lat_sum / *count as f64, lon_sum / *count as f64);
            }
        }

        if !changed {
            break;
        }
    }

    for (i, parcel) in parcels.iter().enumerate() {
        zones[assignment[i]].parcels.push(parcel.clone());
    }
    zones
}

/// Index of the closest centroid; ties resolve to the lowest index.
fn nearest_centroid(centroids: &[(f64, f64)], parcel: &Parcel) -> usize {
    let lat = parcel.location.lat();
    let lon = parcel.location.lng();
    let mut best = 0usize;
    let mut best_d2 = f64::INFINITY;
    for (i, (clat, clon)) in centroids.iter().enumerate() {
        let dlat = lat - clat;
        let dlon = lon - clon;
        let d2 = dlat * dlat + dlon * dlon;
        if d2 < best_d2 {
            best = i;
            best_d2 = d2;
        }
    }
    best
}
