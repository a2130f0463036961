use foundation::GeoBounds;
use foundation::math::{LngLat, lng_lat_to_plane};

/// Tile border as a line list (4 edges, 8 vertices) in plane space.
pub fn tile_outline(bounds: &GeoBounds) -> Vec<f32> {
    let corners = [
        LngLat::new(bounds.west, bounds.north),
        LngLat::new(bounds.east, bounds.north),
        LngLat::new(bounds.east, bounds.south),
        LngLat::new(bounds.west, bounds.south),
    ]
    .map(lng_lat_to_plane);

    let mut out = Vec::with_capacity(16);
    for i in 0..corners.len() {
        let a = corners[i];
        let b = corners[(i + 1) % corners.len()];
        out.extend([a.x as f32, a.y as f32, b.x as f32, b.y as f32]);
    }
    out
}
