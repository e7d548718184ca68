//! Empty-zone rebalancing.
//!
//! Every driver needs a workload, so while some zone is empty and another
//! holds at least two parcels, one parcel moves from the heaviest donor to
//! the empty zone. The donated parcel is the one farthest from the donor's
//! centroid, which costs the donor the least locality. Deterministic given
//! the incoming assignment.

use super::Zone;
use crate::geo::haversine_km;

pub(super) fn fill_empty_zones(zones: &mut [Zone]) {
    loop {
        let Some(empty_idx) = zones.iter().position(Zone::is_empty) else {
            return;
        };

        // Heaviest zone that can spare a parcel; ties keep the lowest index.
        let mut donor_idx: Option<usize> = None;
        for (i, zone) in zones.iter().enumerate() {
            if zone.parcels.len() < 2 {
                continue;
            }
            match donor_idx {
                None => donor_idx = Some(i),
                Some(d) if zone.weight_kg() > zones[d].weight_kg() => donor_idx = Some(i),
                _ => {}
            }
        }
        let Some(donor_idx) = donor_idx else {
            return;
        };

        let centroid = zones[donor_idx]
            .centroid()
            .expect("donor zone has parcels");
        let mut far_idx = 0usize;
        let mut far_km = -1.0f64;
        for (i, parcel) in zones[donor_idx].parcels.iter().enumerate() {
            let km = haversine_km(parcel.location, centroid);
            if km > far_km {
                far_idx = i;
                far_km = km;
            }
        }

        let parcel = zones[donor_idx].parcels.remove(far_idx);
        zones[empty_idx].parcels.push(parcel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::sample_parcel;

    #[test]
    fn moves_from_heaviest_donor_until_no_zone_is_empty() {
        let mut zones = vec![
            Zone {
                parcels: vec![
                    sample_parcel("A0", 42.69, 23.32, 1.0),
                    sample_parcel("A1", 42.70, 23.33, 1.0),
                ],
            },
            Zone {
                parcels: vec![
                    sample_parcel("B0", 42.60, 23.40, 10.0),
                    sample_parcel("B1", 42.61, 23.41, 10.0),
                    sample_parcel("B2", 42.66, 23.46, 10.0),
                ],
            },
            Zone::default(),
        ];

        fill_empty_zones(&mut zones);

        assert!(zones.iter().all(|z| !z.is_empty()));
        // The heavy zone donated, and gave away its outlier.
        assert_eq!(zones[1].parcels.len(), 2);
        assert_eq!(zones[2].parcels.len(), 1);
        assert_eq!(zones[2].parcels[0].id, "B2");
    }

    #[test]
    fn stops_when_no_donor_remains() {
        let mut zones = vec![
            Zone {
                parcels: vec![sample_parcel("A0", 42.69, 23.32, 1.0)],
            },
            Zone::default(),
        ];
        fill_empty_zones(&mut zones);
        assert_eq!(zones[0].parcels.len(), 1);
        assert!(zones[1].is_empty());
    }
}
