use foundation::math::{Mat3, Vec2, lat_from_mercator_y, lng_from_mercator_x};
use foundation::GeoBounds;

use crate::camera::Camera;

/// Canvas size in pixels.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CanvasSize {
    pub width: f64,
    pub height: f64,
}

impl CanvasSize {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        !(self.width > 0.0 && self.height > 0.0)
    }
}

/// Geographic extent of the canvas for `camera`, each edge clamped to
/// `limits`.
pub fn viewport_bounds(
    camera: &Camera,
    canvas: CanvasSize,
    tile_size: f64,
    limits: &GeoBounds,
) -> GeoBounds {
    let world_px = tile_size * 2f64.powf(camera.zoom);

    // Canvas center in world pixels, origin at the north-west corner.
    let cx = (1.0 + camera.x) / 2.0 * world_px;
    let cy = (1.0 - camera.y) / 2.0 * world_px;

    let half_w = canvas.width / 2.0;
    let half_h = canvas.height / 2.0;

    GeoBounds {
        west: lng_from_mercator_x((cx - half_w) / world_px),
        south: lat_from_mercator_y((cy + half_h) / world_px),
        east: lng_from_mercator_x((cx + half_w) / world_px),
        north: lat_from_mercator_y((cy - half_h) / world_px),
    }
    .clamp_to(limits)
}

/// True when the view from `camera` reaches any edge of `limits`.
pub fn at_limits(camera: &Camera, canvas: CanvasSize, tile_size: f64, limits: &GeoBounds) -> bool {
    viewport_bounds(camera, canvas, tile_size, limits).touches(limits)
}

/// Plane-to-clip transform for one camera and canvas.
///
/// Clip space is `[-1, 1]` on both axes with y up; pixels have their origin at
/// the top-left of the canvas with y down.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewportMatrix {
    /// Plane -> clip.
    matrix: Mat3,
    /// Clip -> plane.
    inverse: Mat3,
    canvas: CanvasSize,
}

impl ViewportMatrix {
    /// `None` for an empty canvas or a non-finite camera.
    pub fn new(camera: &Camera, canvas: CanvasSize, tile_size: f64) -> Option<Self> {
        if canvas.is_empty() || tile_size <= 0.0 {
            return None;
        }
        let zoom_scale = 2f64.powf(-camera.zoom);
        let clip_to_plane = Mat3::from_translation(camera.position()).mul(&Mat3::from_scale(
            zoom_scale * canvas.width / tile_size,
            zoom_scale * canvas.height / tile_size,
        ));
        let matrix = clip_to_plane.inverse()?;
        if !matrix.m.iter().all(|v| v.is_finite()) {
            return None;
        }
        Some(Self {
            matrix,
            inverse: clip_to_plane,
            canvas,
        })
    }

    pub fn matrix(&self) -> &Mat3 {
        &self.matrix
    }

    pub fn canvas(&self) -> CanvasSize {
        self.canvas
    }

    pub fn plane_to_clip(&self, p: Vec2) -> Vec2 {
        self.matrix.transform_point(p)
    }

    pub fn clip_to_plane(&self, c: Vec2) -> Vec2 {
        self.inverse.transform_point(c)
    }

    pub fn pixel_to_clip(&self, px: f64, py: f64) -> Vec2 {
        Vec2::new(
            2.0 * px / self.canvas.width - 1.0,
            1.0 - 2.0 * py / self.canvas.height,
        )
    }

    pub fn clip_to_pixel(&self, c: Vec2) -> Vec2 {
        Vec2::new(
            (1.0 + c.x) / 2.0 * self.canvas.width,
            (1.0 - c.y) / 2.0 * self.canvas.height,
        )
    }

    pub fn pixel_to_plane(&self, px: f64, py: f64) -> Vec2 {
        self.clip_to_plane(self.pixel_to_clip(px, py))
    }

    pub fn plane_to_pixel(&self, p: Vec2) -> Vec2 {
        self.clip_to_pixel(self.plane_to_clip(p))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use foundation::math::{LngLat, lng_lat_to_plane};

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    fn square(px: f64) -> CanvasSize {
        CanvasSize::new(px, px)
    }

    #[test]
    fn bounds_around_manhattan() {
        let cam = Camera::new(-0.411, 0.248, 13.0);
        let b = viewport_bounds(&cam, square(512.0), 512.0, &GeoBounds::WORLD);
        assert_close(b.west, -74.00197265625, 1e-9);
        assert_close(b.south, 40.690901683676884, 1e-9);
        assert_close(b.east, -73.95802734375, 1e-9);
        assert_close(b.north, 40.72421435237737, 1e-9);
        assert!(!at_limits(&cam, square(512.0), 512.0, &GeoBounds::WORLD));
    }

    #[test]
    fn zoomed_out_world_view_is_clamped() {
        let cam = Camera::new(0.0, 0.0, 0.0);
        let b = viewport_bounds(&cam, square(1024.0), 512.0, &GeoBounds::WORLD);
        assert_eq!(b, GeoBounds::WORLD);
        assert!(at_limits(&cam, square(1024.0), 512.0, &GeoBounds::WORLD));
    }

    #[test]
    fn tighter_limits_trip_when_view_crosses_them() {
        let japan = GeoBounds::new(122.440567, 22.546489, 149.346256, 45.418094);
        let tokyo = Camera::looking_at(LngLat::new(139.763275, 35.638126), 10.0);
        assert!(!at_limits(&tokyo, square(800.0), 512.0, &japan));

        let pacific = Camera::looking_at(LngLat::new(149.3, 35.0), 10.0);
        assert!(at_limits(&pacific, square(800.0), 512.0, &japan));
    }

    #[test]
    fn camera_center_maps_to_clip_origin() {
        let cam = Camera::new(0.3, -0.2, 4.0);
        let vm = ViewportMatrix::new(&cam, CanvasSize::new(800.0, 600.0), 512.0).unwrap();
        let c = vm.plane_to_clip(cam.position());
        assert_close(c.x, 0.0, 1e-12);
        assert_close(c.y, 0.0, 1e-12);

        let center_px = vm.plane_to_pixel(cam.position());
        assert_close(center_px.x, 400.0, 1e-9);
        assert_close(center_px.y, 300.0, 1e-9);
    }

    #[test]
    fn canvas_edge_matches_viewport_bounds() {
        let cam = Camera::new(-0.411, 0.248, 13.0);
        let canvas = CanvasSize::new(640.0, 480.0);
        let vm = ViewportMatrix::new(&cam, canvas, 512.0).unwrap();
        let b = viewport_bounds(&cam, canvas, 512.0, &GeoBounds::WORLD);

        let nw = vm.plane_to_pixel(lng_lat_to_plane(LngLat::new(b.west, b.north)));
        let se = vm.plane_to_pixel(lng_lat_to_plane(LngLat::new(b.east, b.south)));
        assert_close(nw.x, 0.0, 1e-6);
        assert_close(nw.y, 0.0, 1e-6);
        assert_close(se.x, 640.0, 1e-6);
        assert_close(se.y, 480.0, 1e-6);
    }

    #[test]
    fn pixel_and_plane_round_trip() {
        let cam = Camera::new(0.776, 0.207, 10.5);
        let vm = ViewportMatrix::new(&cam, CanvasSize::new(1280.0, 720.0), 512.0).unwrap();
        let p = vm.pixel_to_plane(100.0, 650.0);
        let back = vm.plane_to_pixel(p);
        assert_close(back.x, 100.0, 1e-6);
        assert_close(back.y, 650.0, 1e-6);
    }

    #[test]
    fn empty_canvas_has_no_matrix() {
        let cam = Camera::new(0.0, 0.0, 1.0);
        assert!(ViewportMatrix::new(&cam, CanvasSize::new(0.0, 300.0), 512.0).is_none());
    }
}
