//! Minimal vector tile encoder, used to build fixture tiles.

use prost::Message;

use super::geometry::{MOVE_TO, TilePath, TilePoint, command_integer, encode_paths, zigzag_encode};
use super::wire::{self, GeomType};

#[derive(Debug, Clone)]
pub struct LayerWriter {
    layer: wire::Layer,
}

impl LayerWriter {
    pub fn new(name: impl Into<String>, extent: u32) -> Self {
        Self {
            layer: wire::Layer {
                version: 2,
                name: name.into(),
                features: Vec::new(),
                keys: Vec::new(),
                values: Vec::new(),
                extent: Some(extent),
            },
        }
    }

    pub fn add_points(&mut self, id: Option<u64>, points: &[TilePoint], properties: &[(&str, &str)]) {
        self.push(id, GeomType::Point, encode_multi_point(points), properties);
    }

    pub fn add_line(&mut self, id: Option<u64>, lines: &[TilePath], properties: &[(&str, &str)]) {
        self.push(id, GeomType::Linestring, encode_paths(lines, false), properties);
    }

    /// Rings are given without their closing point. Exterior rings run
    /// clockwise on screen (y down), holes the other way.
    pub fn add_polygon(&mut self, id: Option<u64>, rings: &[TilePath], properties: &[(&str, &str)]) {
        self.push(id, GeomType::Polygon, encode_paths(rings, true), properties);
    }

    pub fn into_wire(self) -> wire::Layer {
        self.layer
    }

    fn push(
        &mut self,
        id: Option<u64>,
        geom_type: GeomType,
        geometry: Vec<u32>,
        properties: &[(&str, &str)],
    ) {
        let mut tags = Vec::with_capacity(properties.len() * 2);
        for (key, value) in properties {
            tags.push(self.key_index(key));
            tags.push(self.value_index(value));
        }
        self.layer.features.push(wire::Feature {
            id,
            tags,
            geom_type: Some(geom_type as i32),
            geometry,
        });
    }

    fn key_index(&mut self, key: &str) -> u32 {
        if let Some(i) = self.layer.keys.iter().position(|k| k == key) {
            return i as u32;
        }
        self.layer.keys.push(key.to_string());
        (self.layer.keys.len() - 1) as u32
    }

    fn value_index(&mut self, value: &str) -> u32 {
        if let Some(i) = self
            .layer
            .values
            .iter()
            .position(|v| v.string_value.as_deref() == Some(value))
        {
            return i as u32;
        }
        self.layer.values.push(wire::Value {
            string_value: Some(value.to_string()),
            float_value: None,
            double_value: None,
            int_value: None,
            uint_value: None,
            sint_value: None,
            bool_value: None,
        });
        (self.layer.values.len() - 1) as u32
    }
}

// A multi-point is a single MoveTo carrying every point.
fn encode_multi_point(points: &[TilePoint]) -> Vec<u32> {
    if points.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(1 + points.len() * 2);
    out.push(command_integer(MOVE_TO, points.len() as u32));
    let (mut x, mut y) = (0i64, 0i64);
    for &(px, py) in points {
        out.push(zigzag_encode(px - x));
        out.push(zigzag_encode(py - y));
        (x, y) = (px, py);
    }
    out
}

pub fn encode_tile(layers: Vec<LayerWriter>) -> Vec<u8> {
    wire::Tile {
        layers: layers.into_iter().map(LayerWriter::into_wire).collect(),
    }
    .encode_to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mvt::geometry::decode_paths;

    #[test]
    fn multi_point_uses_one_move_to() {
        let geometry = encode_multi_point(&[(5, 7), (3, 2)]);
        assert_eq!(geometry, vec![17, 10, 14, 3, 9]);
        assert_eq!(
            decode_paths(&geometry).unwrap(),
            vec![vec![(5, 7)], vec![(3, 2)]]
        );
    }

    #[test]
    fn keys_and_values_are_deduplicated() {
        let mut layer = LayerWriter::new("poi", 4096);
        layer.add_points(None, &[(1, 1)], &[("kind", "cafe")]);
        layer.add_points(None, &[(2, 2)], &[("kind", "cafe"), ("name", "cafe")]);
        let wire = layer.into_wire();
        assert_eq!(wire.keys, vec!["kind".to_string(), "name".to_string()]);
        assert_eq!(wire.values.len(), 1);
        assert_eq!(wire.features[1].tags, vec![0, 0, 1, 0]);
    }
}
