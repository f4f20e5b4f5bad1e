//! Nearest-neighbor ordering of selected stops.
//!
//! An approximation of the traveling-salesman problem: always step to
//! the closest unvisited place. Can produce suboptimal tours on
//! adversarial layouts (two clusters comparably near the start invite
//! zig-zagging), which is acceptable for the handful of stops in a day
//! plan.

use crate::catalog::PlaceCatalog;
use crate::geo::haversine_km;

/// Order place keys by greedy proximity from a start point.
///
/// The start defaults to the catalog's city-center reference. Keys
/// without resolvable coordinates keep their input order at the tail,
/// so the output is always a permutation of the input.
pub fn order_stops(
    catalog: &PlaceCatalog,
    keys: &[String],
    start: Option<(f64, f64)>,
) -> Vec<String> {
    let mut remaining: Vec<(String, (f64, f64))> = Vec::new();
    let mut tail: Vec<String> = Vec::new();
    for key in keys {
        match catalog.get(key).and_then(|place| place.coords) {
            Some(coords) => remaining.push((key.clone(), coords)),
            None => tail.push(key.clone()),
        }
    }

    let mut position = start.unwrap_or_else(|| catalog.city_center());
    let mut route = Vec::with_capacity(keys.len());
    while !remaining.is_empty() {
        let nearest = remaining
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| {
                haversine_km(position, a.1).total_cmp(&haversine_km(position, b.1))
            })
            .map(|(index, _)| index)
            .unwrap_or(0);
        let (key, coords) = remaining.remove(nearest);
        position = coords;
        route.push(key);
    }

    route.extend(tail);
    route
}
