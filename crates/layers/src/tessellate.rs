use earcutr::earcut;
use formats::{DecodedLayer, DecodedTile, Polygon};
use foundation::math::{LngLat, lng_lat_to_plane};

use crate::layer::TileLayer;

/// Triangulates a polygon (outer ring plus holes) in geographic space and
/// returns the triangle list projected to plane space. Polygons with any
/// non-finite position yield nothing.
pub fn tessellate_polygon(rings: &Polygon) -> Vec<f32> {
    if !rings.iter().flatten().all(|p| p.lng.is_finite() && p.lat.is_finite()) {
        return Vec::new();
    }

    let mut positions: Vec<LngLat> = Vec::new();
    let mut coords: Vec<f64> = Vec::new();
    let mut hole_indices: Vec<usize> = Vec::new();

    for (ring_i, ring) in rings.iter().enumerate() {
        let ring = without_closing_duplicate(ring);
        if ring.len() < 3 {
            // A degenerate outer ring leaves nothing to fill.
            if ring_i == 0 {
                return Vec::new();
            }
            continue;
        }
        if ring_i > 0 {
            hole_indices.push(positions.len());
        }
        for p in ring {
            coords.push(p.lng);
            coords.push(p.lat);
            positions.push(*p);
        }
    }

    let indices = match earcut(&coords, &hole_indices, 2) {
        Ok(ix) => ix,
        Err(_) => return Vec::new(),
    };

    let mut out = Vec::with_capacity(indices.len() * 2);
    for idx in indices {
        if let Some(p) = positions.get(idx) {
            let v = lng_lat_to_plane(*p);
            out.push(v.x as f32);
            out.push(v.y as f32);
        }
    }
    out
}

/// Fill triangles for every polygon in the layer. Points and lines carry no
/// fill and contribute nothing.
pub fn tessellate_layer(layer: &DecodedLayer) -> Vec<f32> {
    let mut out = Vec::new();
    for feature in &layer.features {
        for polygon in feature.geometry.polygons() {
            out.extend(tessellate_polygon(polygon));
        }
    }
    out
}

/// Builds one [`TileLayer`] for each wanted layer the tile contains, in the
/// order the names are given.
pub fn tessellate_tile<'a>(
    tile: &DecodedTile,
    wanted: impl IntoIterator<Item = &'a str>,
) -> Vec<TileLayer> {
    wanted
        .into_iter()
        .filter_map(|name| {
            tile.layer(name)
                .map(|layer| TileLayer::new(name, tessellate_layer(layer)))
        })
        .collect()
}

fn without_closing_duplicate(ring: &[LngLat]) -> &[LngLat] {
    match ring {
        [first, rest @ .., last] if !rest.is_empty() && first == last => &ring[..ring.len() - 1],
        _ => ring,
    }
}
