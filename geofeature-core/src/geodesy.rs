//! Spherical-earth helpers for radius filters and distance ordering.

use geo::Coord;

use crate::Envelope;

/// Mean earth radius in metres.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

const FULL_TURN_DEG: f64 = 360.0;

/// Great-circle distance between two coordinates in metres.
#[must_use]
pub fn haversine_distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    let lat_a = a.y.to_radians();
    let lat_b = b.y.to_radians();
    let d_lat = (b.y - a.y).to_radians();
    let d_lon = (b.x - a.x).to_radians();
    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Point reached from `origin` after travelling `distance_m` metres on the
/// initial bearing `bearing_deg` (clockwise from north).
///
/// The returned longitude is not wrapped back into ±180.
#[must_use]
pub fn destination(origin: Coord<f64>, bearing_deg: f64, distance_m: f64) -> Coord<f64> {
    let angular = distance_m / EARTH_RADIUS_M;
    let bearing = bearing_deg.to_radians();
    let lat = origin.y.to_radians();
    let dest_lat = (lat.sin() * angular.cos() + lat.cos() * angular.sin() * bearing.cos()).asin();
    let d_lon = (bearing.sin() * angular.sin() * lat.cos())
        .atan2(angular.cos() - lat.sin() * dest_lat.sin());
    Coord {
        x: origin.x + d_lon.to_degrees(),
        y: dest_lat.to_degrees(),
    }
}

/// Shortest distance in metres from `point` to any position inside
/// `envelope`, allowing for longitude wraparound.
#[must_use]
pub fn distance_to_envelope(point: Coord<f64>, envelope: &Envelope) -> f64 {
    [-FULL_TURN_DEG, 0.0, FULL_TURN_DEG]
        .iter()
        .map(|shift| {
            let shifted = shift_envelope(envelope, *shift);
            let nearest = Coord {
                x: point.x.clamp(shifted.min_x, shifted.max_x),
                y: point.y.clamp(shifted.min_y, shifted.max_y),
            };
            haversine_distance(point, nearest)
        })
        .fold(f64::INFINITY, f64::min)
}

/// Smallest envelope holding the circle of `radius_m` metres around
/// `center`.
///
/// The longitude half-width is `asin(sin δ / cos φ)`, reached away from the
/// cardinal bearings once the center leaves the equator. Circles that touch
/// a pole span every longitude.
pub(crate) fn radius_envelope(center: Coord<f64>, radius_m: f64) -> Envelope {
    let angular = radius_m / EARTH_RADIUS_M;
    let reach_deg = angular.to_degrees();
    let (south, north) = (center.y - reach_deg, center.y + reach_deg);
    if north >= 90.0 || south <= -90.0 {
        return Envelope::from_bounds(-180.0, south.max(-90.0), 180.0, north.min(90.0));
    }
    let ratio = angular.sin() / center.y.to_radians().cos();
    let half_width = ratio.min(1.0).asin().to_degrees();
    Envelope::from_bounds(center.x - half_width, south, center.x + half_width, north)
}

pub(crate) fn shift_envelope(envelope: &Envelope, dx: f64) -> Envelope {
    Envelope {
        min_x: envelope.min_x + dx,
        min_y: envelope.min_y,
        max_x: envelope.max_x + dx,
        max_y: envelope.max_y,
    }
}

pub(crate) fn unwrap_east(west: f64, east: f64) -> f64 {
    if east < west { east + FULL_TURN_DEG } else { east }
}
