use foundation::math::{LngLat, Vec2, lng_lat_to_plane, plane_to_lng_lat};

/// Map camera in plane space.
///
/// `(x, y)` is the plane point at the canvas center; at zoom 0 one tile spans
/// the whole `[-1, 1]` plane.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub x: f64,
    pub y: f64,
    pub zoom: f64,
}

impl Camera {
    pub fn new(x: f64, y: f64, zoom: f64) -> Self {
        Self { x, y, zoom }
    }

    pub fn looking_at(center: LngLat, zoom: f64) -> Self {
        let p = lng_lat_to_plane(center);
        Self::new(p.x, p.y, zoom)
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn center(&self) -> LngLat {
        plane_to_lng_lat(self.position())
    }

    pub fn translated(&self, delta: Vec2) -> Self {
        Self::new(self.x + delta.x, self.y + delta.y, self.zoom)
    }

    pub fn with_zoom(&self, zoom: f64) -> Self {
        Self::new(self.x, self.y, zoom)
    }
}
