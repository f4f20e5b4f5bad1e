//! Great-circle distance helpers and the nearby-place query.
//!
//! Straight-line distance with an assumed speed stands in for road
//! routing; less accurate, but has no external dependency.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::catalog::PlaceCatalog;
use crate::traits::TravelTimeProvider;

/// Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Average travel speed assumption for time estimation.
pub const DEFAULT_SPEED_KMH: f64 = 20.0;

/// Great-circle distance between two (lat, lng) points in kilometers.
pub fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lng1) = from;
    let (lat2, lng2) = to;

    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lng = (lng2 - lng1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Travel time in whole minutes, rounded up.
///
/// `None` when either endpoint lacks coordinates.
pub fn travel_minutes(
    from: Option<(f64, f64)>,
    to: Option<(f64, f64)>,
    speed_kmh: f64,
) -> Option<i64> {
    let from = from?;
    let to = to?;
    let km = haversine_km(from, to);
    let minutes = km / speed_kmh.max(1e-6) * 60.0;
    Some(minutes.ceil() as i64)
}

/// Haversine-based travel time provider over catalog places.
#[derive(Debug, Clone)]
pub struct HaversineTravel {
    catalog: Arc<PlaceCatalog>,
    pub speed_kmh: f64,
}

impl HaversineTravel {
    pub fn new(catalog: Arc<PlaceCatalog>, speed_kmh: f64) -> Self {
        Self { catalog, speed_kmh }
    }
}

impl TravelTimeProvider for HaversineTravel {
    fn minutes_between(&self, from: &str, to: &str) -> Option<i64> {
        let from = self.catalog.get(from)?.coords;
        let to = self.catalog.get(to)?.coords;
        travel_minutes(from, to, self.speed_kmh)
    }
}

/// A catalogued place within the query radius.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NearbyPlace {
    pub id: String,
    pub title: String,
    pub coords: (f64, f64),
    pub distance_km: f64,
}

/// Geospatial radius query over the place catalog.
#[derive(Debug, Clone)]
pub struct GeoCandidateFinder {
    catalog: Arc<PlaceCatalog>,
}

impl GeoCandidateFinder {
    pub fn new(catalog: Arc<PlaceCatalog>) -> Self {
        Self { catalog }
    }

    /// Places within `radius_km` of the center, ascending by distance,
    /// truncated to `limit`. Places without coordinates are excluded;
    /// a degenerate radius yields an empty result.
    pub fn find_nearby(
        &self,
        center_lat: f64,
        center_lng: f64,
        radius_km: f64,
        limit: usize,
    ) -> Vec<NearbyPlace> {
        if radius_km <= 0.0 {
            return Vec::new();
        }

        let mut results: Vec<NearbyPlace> = self
            .catalog
            .places()
            .iter()
            .filter_map(|place| {
                let coords = place.coords?;
                let distance = haversine_km(coords, (center_lat, center_lng));
                if distance <= radius_km {
                    Some(NearbyPlace {
                        id: place.id.clone(),
                        title: place.title.clone(),
                        coords,
                        distance_km: (distance * 100.0).round() / 100.0,
                    })
                } else {
                    None
                }
            })
            .collect();

        results.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        results.truncate(limit);
        results
    }
}
