use serde::{Deserialize, Serialize};

/// Renderable geometry of one named source layer within a tile.
///
/// `vertices` is a flat `[x0, y0, x1, y1, ...]` list in plane space.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TileLayer {
    pub layer: String,
    pub vertices: Vec<f32>,
}

impl TileLayer {
    pub fn new(layer: impl Into<String>, vertices: Vec<f32>) -> Self {
        Self {
            layer: layer.into(),
            vertices,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 2
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }
}

/// True when at least one layer carries geometry.
pub fn has_geometry(layers: &[TileLayer]) -> bool {
    layers.iter().any(|l| !l.is_empty())
}
