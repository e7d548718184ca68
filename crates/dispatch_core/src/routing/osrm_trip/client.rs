use std::time::Duration;

use h3o::LatLng;
use reqwest::{blocking::Client, Url};

use super::error::TripError;
use super::parser::parse_trip_response;
use super::response::OsrmTripResponse;
use crate::config::EngineConfig;
use crate::routing::{single_point_plan, TripPlan, TripService};

/// Thin HTTP client for OSRM trip optimization.
#[derive(Debug, Clone)]
pub struct OsrmTripClient {
    client: Client,
    base_url: String,
    profile: String,
}

impl OsrmTripClient {
    /// Create a client for the configured engine endpoint.
    pub fn new(config: &EngineConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .expect("failed to build routing engine client");
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            profile: config.profile.clone(),
        }
    }

    fn trip_url(&self, points: &[LatLng]) -> Result<Url, TripError> {
        let coord_segment = points
            .iter()
            .map(|point| format!("{},{}", point.lng(), point.lat()))
            .collect::<Vec<_>>()
            .join(";");

        let base = format!("{}/trip/v1/{}/{}", self.base_url, self.profile, coord_segment);
        let mut url = Url::parse(&base)
            .map_err(|err| TripError::Decode(format!("failed to build trip URL: {}", err)))?;

        url.query_pairs_mut()
            .append_pair("source", "first")
            .append_pair("roundtrip", "true")
            .append_pair("steps", "true")
            .append_pair("geometries", "geojson")
            .append_pair("overview", "full");
        Ok(url)
    }
}

impl TripService for OsrmTripClient {
    fn trip(&self, points: &[LatLng]) -> Result<TripPlan, TripError> {
        if points.is_empty() {
            return Err(TripError::NoPoints);
        }
        if points.len() == 1 {
            return Ok(single_point_plan(points[0]));
        }

        let url = self.trip_url(points)?;
        let response = self.client.get(url).send().map_err(TripError::Network)?;
        if !response.status().is_success() {
            return Err(TripError::NonOkStatus(response.status()));
        }

        let parsed: OsrmTripResponse = response
            .json()
            .map_err(|err| TripError::Decode(err.to_string()))?;
        parse_trip_response(parsed)
    }
}
