//! Geographic primitives: validated coordinates, haversine distances, wire pairs.
//!
//! This module provides:
//!
//! - **Coordinate validation**: `coordinate` builds an `h3o::LatLng` and maps
//!   out-of-range input to [`DispatchError::InvalidCoordinate`]
//! - **Distance calculations**: cached haversine distance between two points
//! - **Wire conversion**: `[lon, lat]` pairs as exchanged with the routing engine
//!
//! Distances are cached in a global LRU keyed by the coordinate bit patterns,
//! since office-fallback and clustering repeatedly measure the same pairs.

use std::num::NonZeroUsize;
use std::sync::{Mutex, OnceLock};

use h3o::LatLng;
use lru::LruCache;

use crate::error::DispatchError;

/// Earth radius in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A `[lon, lat]` pair, exactly as the routing engine exchanges coordinates.
pub type LonLat = [f64; 2];

/// Build a validated coordinate from `(lat, lon)` degrees.
pub fn coordinate(lat: f64, lon: f64) -> Result<LatLng, DispatchError> {
    LatLng::new(lat, lon).map_err(|_| DispatchError::InvalidCoordinate { lat, lon })
}

/// Convert a coordinate to its `[lon, lat]` wire pair.
pub fn to_wire(point: LatLng) -> LonLat {
    [point.lng(), point.lat()]
}

/// Build a validated coordinate from a `[lon, lat]` wire pair.
pub fn from_wire(pair: LonLat) -> Result<LatLng, DispatchError> {
    coordinate(pair[1], pair[0])
}

/// Uncached distance calculation (internal use).
fn haversine_km_uncached(a: LatLng, b: LatLng) -> f64 {
    let (lat1, lon1) = (a.lat().to_radians(), a.lng().to_radians());
    let (lat2, lon2) = (b.lat().to_radians(), b.lng().to_radians());
    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;
    let sin_dlat = (dlat * 0.5).sin();
    let sin_dlon = (dlon * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

type PointKey = (u64, u64);

fn point_key(p: LatLng) -> PointKey {
    (p.lat().to_bits(), p.lng().to_bits())
}

/// Global distance cache (10,000 entries).
fn get_distance_cache() -> &'static Mutex<LruCache<(PointKey, PointKey), f64>> {
    static CACHE: OnceLock<Mutex<LruCache<(PointKey, PointKey), f64>>> = OnceLock::new();
    CACHE.get_or_init(|| {
        Mutex::new(LruCache::new(
            NonZeroUsize::new(10_000).expect("cache size must be non-zero"),
        ))
    })
}

/// Haversine distance between two coordinates with LRU caching.
///
/// Uses a global LRU cache to avoid recomputing distances for frequently
/// measured pairs (office fallback, cluster rebalancing).
pub fn haversine_km(a: LatLng, b: LatLng) -> f64 {
    // Use symmetric key (smaller point first) to maximize cache hits
    let (ka, kb) = (point_key(a), point_key(b));
    let key = if ka < kb { (ka, kb) } else { (kb, ka) };

    let mut cache = get_distance_cache().lock().expect("distance cache poisoned");
    *cache.get_or_insert(key, || haversine_km_uncached(a, b))
}
