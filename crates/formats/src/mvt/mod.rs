//! Mapbox Vector Tile decoding into geographic features.

pub mod geometry;
pub mod wire;
pub mod writer;

use foundation::math::{LngLat, lat_from_mercator_y, lng_from_mercator_x};
use prost::Message;
use serde_json::{Map, Value};

use crate::feature::{DecodedLayer, DecodedTile, VectorFeature, VectorGeometry};
use geometry::{GeometryError, TilePath, TilePoint, classify_rings, decode_paths};
use wire::GeomType;

pub const DEFAULT_EXTENT: u32 = 4096;
pub const MAX_VERSION: u32 = 2;

#[derive(Debug)]
pub enum MvtError {
    Protobuf(prost::DecodeError),
    UnsupportedVersion {
        layer: String,
        version: u32,
    },
    /// A layer declared an extent of zero, which has no tile-local scale.
    ZeroExtent {
        layer: String,
    },
    Geometry {
        layer: String,
        feature: usize,
        source: GeometryError,
    },
    Tags {
        layer: String,
        feature: usize,
        reason: String,
    },
    NonFiniteCoordinate {
        layer: String,
        feature: usize,
    },
}

impl std::fmt::Display for MvtError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MvtError::Protobuf(e) => write!(f, "invalid vector tile protobuf: {e}"),
            MvtError::UnsupportedVersion { layer, version } => {
                write!(f, "layer {layer}: unsupported version {version}")
            }
            MvtError::ZeroExtent { layer } => write!(f, "layer {layer}: extent is zero"),
            MvtError::Geometry {
                layer,
                feature,
                source,
            } => write!(f, "layer {layer}, feature {feature}: {source}"),
            MvtError::Tags {
                layer,
                feature,
                reason,
            } => write!(f, "layer {layer}, feature {feature}: {reason}"),
            MvtError::NonFiniteCoordinate { layer, feature } => {
                write!(f, "layer {layer}, feature {feature}: coordinate projects to a non-finite position")
            }
        }
    }
}

impl std::error::Error for MvtError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MvtError::Protobuf(e) => Some(e),
            MvtError::Geometry { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<prost::DecodeError> for MvtError {
    fn from(e: prost::DecodeError) -> Self {
        MvtError::Protobuf(e)
    }
}

/// Maps tile-local integer coordinates of tile `x/y/z` to degrees.
#[derive(Debug, Copy, Clone)]
pub struct TileProjector {
    extent: f64,
    x0: f64,
    y0: f64,
    size: f64,
}

impl TileProjector {
    pub fn new(x: u32, y: u32, z: u8, extent: u32) -> Self {
        let extent = f64::from(extent);
        Self {
            extent,
            x0: extent * f64::from(x),
            y0: extent * f64::from(y),
            size: extent * 2f64.powi(i32::from(z)),
        }
    }

    pub fn extent(&self) -> f64 {
        self.extent
    }

    pub fn project(&self, (px, py): TilePoint) -> LngLat {
        LngLat::new(
            lng_from_mercator_x((px as f64 + self.x0) / self.size),
            lat_from_mercator_y((py as f64 + self.y0) / self.size),
        )
    }

    fn project_path(&self, path: &[TilePoint]) -> Vec<LngLat> {
        path.iter().map(|&p| self.project(p)).collect()
    }
}

/// Decodes every layer of the tile at `x/y/z`.
///
/// Features with an unknown geometry type or without usable geometry are
/// skipped; malformed command streams and tag tables fail the whole tile, as
/// do a zero extent and coordinates that do not project to finite degrees.
pub fn decode_tile(bytes: &[u8], x: u32, y: u32, z: u8) -> Result<DecodedTile, MvtError> {
    let tile = wire::Tile::decode(bytes)?;
    let mut layers = Vec::with_capacity(tile.layers.len());
    for layer in &tile.layers {
        layers.push(decode_layer(layer, x, y, z)?);
    }
    Ok(DecodedTile { layers })
}

fn decode_layer(layer: &wire::Layer, x: u32, y: u32, z: u8) -> Result<DecodedLayer, MvtError> {
    if layer.version > MAX_VERSION {
        return Err(MvtError::UnsupportedVersion {
            layer: layer.name.clone(),
            version: layer.version,
        });
    }
    let extent = layer.extent.unwrap_or(DEFAULT_EXTENT);
    if extent == 0 {
        return Err(MvtError::ZeroExtent {
            layer: layer.name.clone(),
        });
    }
    let projector = TileProjector::new(x, y, z, extent);

    let mut features = Vec::with_capacity(layer.features.len());
    for (index, feature) in layer.features.iter().enumerate() {
        let paths = decode_paths(&feature.geometry).map_err(|source| MvtError::Geometry {
            layer: layer.name.clone(),
            feature: index,
            source,
        })?;
        let geom_type = feature
            .geom_type
            .and_then(|t| GeomType::try_from(t).ok())
            .unwrap_or(GeomType::Unknown);
        let Some(geometry) = build_geometry(geom_type, paths, &projector) else {
            continue;
        };
        if !geometry.is_finite() {
            return Err(MvtError::NonFiniteCoordinate {
                layer: layer.name.clone(),
                feature: index,
            });
        }
        let properties =
            decode_properties(layer, feature).map_err(|reason| MvtError::Tags {
                layer: layer.name.clone(),
                feature: index,
                reason,
            })?;
        features.push(VectorFeature {
            id: feature.id,
            properties,
            geometry,
        });
    }

    Ok(DecodedLayer {
        name: layer.name.clone(),
        extent,
        features,
    })
}

fn build_geometry(
    geom_type: GeomType,
    paths: Vec<TilePath>,
    projector: &TileProjector,
) -> Option<VectorGeometry> {
    match geom_type {
        GeomType::Unknown => None,
        GeomType::Point => {
            let mut points: Vec<LngLat> = paths
                .iter()
                .flatten()
                .map(|&p| projector.project(p))
                .collect();
            match points.len() {
                0 => None,
                1 => points.pop().map(VectorGeometry::Point),
                _ => Some(VectorGeometry::MultiPoint(points)),
            }
        }
        GeomType::Linestring => {
            let mut lines: Vec<Vec<LngLat>> = paths
                .iter()
                .filter(|p| p.len() >= 2)
                .map(|p| projector.project_path(p))
                .collect();
            match lines.len() {
                0 => None,
                1 => lines.pop().map(VectorGeometry::LineString),
                _ => Some(VectorGeometry::MultiLineString(lines)),
            }
        }
        GeomType::Polygon => {
            let mut polygons: Vec<Vec<Vec<LngLat>>> = classify_rings(paths)
                .iter()
                .map(|rings| rings.iter().map(|r| projector.project_path(r)).collect())
                .collect();
            match polygons.len() {
                0 => None,
                1 => polygons.pop().map(VectorGeometry::Polygon),
                _ => Some(VectorGeometry::MultiPolygon(polygons)),
            }
        }
    }
}

fn decode_properties(
    layer: &wire::Layer,
    feature: &wire::Feature,
) -> Result<Map<String, Value>, String> {
    if feature.tags.len() % 2 != 0 {
        return Err(format!("odd tag count {}", feature.tags.len()));
    }
    let mut properties = Map::new();
    for pair in feature.tags.chunks_exact(2) {
        let key = layer
            .keys
            .get(pair[0] as usize)
            .ok_or_else(|| format!("key index {} out of range", pair[0]))?;
        let value = layer
            .values
            .get(pair[1] as usize)
            .ok_or_else(|| format!("value index {} out of range", pair[1]))?;
        properties.insert(key.clone(), value_to_json(value));
    }
    Ok(properties)
}

fn value_to_json(value: &wire::Value) -> Value {
    if let Some(s) = &value.string_value {
        Value::String(s.clone())
    } else if let Some(v) = value.float_value {
        Value::from(f64::from(v))
    } else if let Some(v) = value.double_value {
        Value::from(v)
    } else if let Some(v) = value.int_value.or(value.sint_value) {
        Value::from(v)
    } else if let Some(v) = value.uint_value {
        Value::from(v)
    } else if let Some(v) = value.bool_value {
        Value::Bool(v)
    } else {
        Value::Null
    }
}
