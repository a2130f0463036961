//! Spherical Mercator projection between geographic coordinates and the
//! normalized map plane.
//!
//! Two normalized spaces are involved:
//! - Mercator space: `[0, 1]` on both axes, origin at the top-left (north-west)
//!   corner of the world, y growing southwards. Slippy-map tile math lives here.
//! - Plane space: `[-1, 1]` on both axes, origin at the center of the world,
//!   y growing northwards. Camera positions and vertex buffers live here.

use std::f64::consts::PI;

use super::Vec2;

/// Latitude limit (degrees) used for the default world extent.
///
/// Slightly inside the true Web Mercator limit (85.0511...) so clamped bounds
/// land on a representable value.
pub const MAX_LATITUDE: f64 = 85.05;

/// Geographic position in degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LngLat {
    pub lng: f64,
    pub lat: f64,
}

impl LngLat {
    pub fn new(lng: f64, lat: f64) -> Self {
        Self { lng, lat }
    }
}

pub fn mercator_x_from_lng(lng: f64) -> f64 {
    (180.0 + lng) / 360.0
}

pub fn mercator_y_from_lat(lat: f64) -> f64 {
    (180.0 - (180.0 / PI) * (PI / 4.0 + lat * PI / 360.0).tan().ln()) / 360.0
}

pub fn lng_from_mercator_x(x: f64) -> f64 {
    x * 360.0 - 180.0
}

pub fn lat_from_mercator_y(y: f64) -> f64 {
    let y2 = 180.0 - y * 360.0;
    (360.0 / PI) * (y2 * PI / 180.0).exp().atan() - 90.0
}

/// Forward projection into plane space.
pub fn lng_lat_to_plane(lng_lat: LngLat) -> Vec2 {
    let x = mercator_x_from_lng(lng_lat.lng);
    let y = mercator_y_from_lat(lng_lat.lat);
    Vec2::new(-1.0 + x * 2.0, 1.0 - y * 2.0)
}

/// Exact inverse of [`lng_lat_to_plane`].
pub fn plane_to_lng_lat(p: Vec2) -> LngLat {
    let lng = lng_from_mercator_x((1.0 + p.x) / 2.0);
    let lat = lat_from_mercator_y((1.0 - p.y) / 2.0);
    LngLat::new(lng, lat)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn origin_and_corners() {
        let o = lng_lat_to_plane(LngLat::new(0.0, 0.0));
        assert_close(o.x, 0.0, 1e-12);
        assert_close(o.y, 0.0, 1e-12);

        let west = lng_lat_to_plane(LngLat::new(-180.0, 0.0));
        let east = lng_lat_to_plane(LngLat::new(180.0, 0.0));
        assert_close(west.x, -1.0, 1e-12);
        assert_close(east.x, 1.0, 1e-12);

        // The Web Mercator square ends at ~85.0511 degrees.
        let north = lng_lat_to_plane(LngLat::new(0.0, 85.051_128_779_806_59));
        assert_close(north.y, 1.0, 1e-9);
    }

    #[test]
    fn tokyo_projects_into_north_east_quadrant() {
        let p = lng_lat_to_plane(LngLat::new(139.6917, 35.6895));
        assert_close(p.x, 0.776_065, 1e-6);
        assert!(p.y > 0.2 && p.y < 0.25, "unexpected y {}", p.y);
    }

    #[test]
    fn round_trip_within_tolerance() {
        let mut lng = -180.0;
        while lng <= 180.0 {
            let mut lat = -85.0;
            while lat < 85.05 {
                let back = plane_to_lng_lat(lng_lat_to_plane(LngLat::new(lng, lat)));
                assert_close(back.lng, lng, 1e-9);
                assert_close(back.lat, lat, 1e-9);
                lat += 2.5;
            }
            lng += 7.5;
        }
    }

    #[test]
    fn round_trip_near_latitude_limit() {
        for lat in [-85.049_999, 85.049_999, 1e-7, -1e-7] {
            let back = plane_to_lng_lat(lng_lat_to_plane(LngLat::new(12.5, lat)));
            assert_close(back.lat, lat, 1e-9);
        }
    }
}
