// (c) Copyright 2025 Mikołaj Kuranowski
// SPDX-License-Identifier: MIT

use crate::Node;

/// Radius of Earth used for all distances, in meters.
pub const EARTH_RADIUS: f64 = 6_371_000.0;

/// Calculates the great-circle distance between two [Nodes](Node)
/// using the [haversine formula](https://en.wikipedia.org/wiki/Haversine_formula).
/// Returns the result in meters.
///
/// This is both the edge weight and the A* heuristic. As no road between two points
/// is shorter than the great circle between them, the heuristic is admissible.
pub fn great_circle_distance(a: Node, b: Node) -> f64 {
    let phi1 = a.lat.to_radians();
    let phi2 = b.lat.to_radians();
    let sin_dphi_half = ((b.lat - a.lat).to_radians() * 0.5).sin();
    let sin_dlambda_half = ((b.lon - a.lon).to_radians() * 0.5).sin();

    let h = sin_dphi_half * sin_dphi_half
        + phi1.cos() * phi2.cos() * sin_dlambda_half * sin_dlambda_half;

    2.0 * EARTH_RADIUS * h.sqrt().atan2((1.0 - h).max(0.0).sqrt())
}

/// Formats a distance for humans: whole meters below a kilometer,
/// kilometers with one decimal place otherwise.
pub fn format_distance(meters: f64) -> String {
    if meters < 1000.0 {
        format!("{}m", meters as i64)
    } else {
        format!("{:.1}km", meters / 1000.0)
    }
}
