use super::error::TripError;
use super::response::OsrmTripResponse;
use crate::routing::{TripPlan, TripStop};

pub(super) fn parse_trip_response(resp: OsrmTripResponse) -> Result<TripPlan, TripError> {
    if resp.code != "Ok" {
        return Err(TripError::EngineCode(resp.code));
    }

    let trip = resp
        .trips
        .into_iter()
        .next()
        .ok_or_else(|| TripError::Decode("response carried no trips".to_string()))?;

    if resp.waypoints.is_empty() {
        return Err(TripError::Decode("response carried no waypoints".to_string()));
    }
    // Round trip: one leg per waypoint, the last closing the loop.
    if trip.legs.len() != resp.waypoints.len() {
        return Err(TripError::Decode(format!(
            "expected {} legs for {} waypoints, engine sent {}",
            resp.waypoints.len(),
            resp.waypoints.len(),
            trip.legs.len(),
        )));
    }

    // Waypoints arrive in input order; re-key to visit order.
    let mut ordered: Vec<(usize, &super::response::OsrmWaypoint)> =
        resp.waypoints.iter().enumerate().collect();
    ordered.sort_by_key(|(_, wp)| (wp.trips_index, wp.waypoint_index));

    let stops = ordered
        .iter()
        .enumerate()
        .map(|(visit_pos, (input_index, wp))| TripStop {
            input_index: *input_index,
            snapped: wp.location,
            inbound_duration_s: if visit_pos == 0 {
                0.0
            } else {
                trip.legs[visit_pos - 1].duration
            },
        })
        .collect();

    let return_duration_s = trip.legs.last().map(|leg| leg.duration).unwrap_or(0.0);

    Ok(TripPlan {
        stops,
        return_duration_s,
        geometry: trip.geometry.coordinates,
    })
}
