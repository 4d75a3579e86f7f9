//! Great-circle distance
//!
//! Haversine distance on a sphere of the Earth's mean radius. Accurate to
//! about 0.5% which is plenty for picking the nearest data centre.

use pgedge_shared::Coordinate;

/// Mean Earth radius in kilometres
pub const EARTH_RADIUS_KM: f64 = 6371.0;

fn radians(degrees: f64) -> f64 {
    degrees * (std::f64::consts::PI / 180.0)
}

/// Haversine distance between two coordinates in kilometres
///
/// Total over finite input. Non-finite input yields a non-finite result.
pub fn distance(a: Coordinate, b: Coordinate) -> f64 {
    let d_lat = radians(b.latitude - a.latitude);
    let d_lon = radians(b.longitude - a.longitude);
    let lat1 = radians(a.latitude);
    let lat2 = radians(b.latitude);

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    // rounding can push antipodal points a hair past 1
    let h = h.clamp(0.0, 1.0);

    2.0 * EARTH_RADIUS_KM * h.sqrt().atan2((1.0 - h).sqrt())
}
