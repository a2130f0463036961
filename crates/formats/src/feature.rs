use foundation::math::LngLat;
use serde_json::{Map, Value};

/// A ring is a closed sequence of positions; the first and last coincide.
pub type Ring = Vec<LngLat>;

/// Outer ring followed by zero or more holes.
pub type Polygon = Vec<Ring>;

#[derive(Debug, Clone, PartialEq)]
pub enum VectorGeometry {
    Point(LngLat),
    MultiPoint(Vec<LngLat>),
    LineString(Vec<LngLat>),
    MultiLineString(Vec<Vec<LngLat>>),
    Polygon(Polygon),
    MultiPolygon(Vec<Polygon>),
}

impl VectorGeometry {
    /// Every polygon carried by this geometry, holes included.
    pub fn polygons(&self) -> &[Polygon] {
        match self {
            VectorGeometry::Polygon(p) => std::slice::from_ref(p),
            VectorGeometry::MultiPolygon(ps) => ps,
            _ => &[],
        }
    }

    /// True when every position has finite longitude and latitude.
    pub fn is_finite(&self) -> bool {
        let finite = |p: &LngLat| p.lng.is_finite() && p.lat.is_finite();
        match self {
            VectorGeometry::Point(p) => finite(p),
            VectorGeometry::MultiPoint(ps) | VectorGeometry::LineString(ps) => ps.iter().all(finite),
            VectorGeometry::MultiLineString(lines) => lines.iter().flatten().all(finite),
            VectorGeometry::Polygon(rings) => rings.iter().flatten().all(finite),
            VectorGeometry::MultiPolygon(polys) => polys.iter().flatten().flatten().all(finite),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            VectorGeometry::Point(_) => "Point",
            VectorGeometry::MultiPoint(_) => "MultiPoint",
            VectorGeometry::LineString(_) => "LineString",
            VectorGeometry::MultiLineString(_) => "MultiLineString",
            VectorGeometry::Polygon(_) => "Polygon",
            VectorGeometry::MultiPolygon(_) => "MultiPolygon",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorFeature {
    pub id: Option<u64>,
    pub properties: Map<String, Value>,
    pub geometry: VectorGeometry,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecodedLayer {
    pub name: String,
    pub extent: u32,
    pub features: Vec<VectorFeature>,
}

/// A vector tile decoded into geographic coordinates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecodedTile {
    pub layers: Vec<DecodedLayer>,
}

impl DecodedTile {
    pub fn layer(&self, name: &str) -> Option<&DecodedLayer> {
        self.layers.iter().find(|l| l.name == name)
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.iter().map(|l| l.name.as_str())
    }
}

impl DecodedLayer {
    /// GeoJSON FeatureCollection for inspection tools.
    pub fn to_geojson_value(&self) -> Value {
        let features = self
            .features
            .iter()
            .map(|feat| {
                let mut obj = Map::new();
                obj.insert("type".to_string(), Value::String("Feature".to_string()));
                if let Some(id) = feat.id {
                    obj.insert("id".to_string(), Value::from(id));
                }
                obj.insert(
                    "properties".to_string(),
                    Value::Object(feat.properties.clone()),
                );
                obj.insert("geometry".to_string(), geometry_to_geojson(&feat.geometry));
                Value::Object(obj)
            })
            .collect();

        let mut root = Map::new();
        root.insert(
            "type".to_string(),
            Value::String("FeatureCollection".to_string()),
        );
        root.insert("features".to_string(), Value::Array(features));
        Value::Object(root)
    }
}

fn position(p: &LngLat) -> Value {
    Value::Array(vec![Value::from(p.lng), Value::from(p.lat)])
}

fn line(points: &[LngLat]) -> Value {
    Value::Array(points.iter().map(position).collect())
}

fn polygon(rings: &[Ring]) -> Value {
    Value::Array(rings.iter().map(|r| line(r)).collect())
}

fn geometry_to_geojson(geom: &VectorGeometry) -> Value {
    let coordinates = match geom {
        VectorGeometry::Point(p) => position(p),
        VectorGeometry::MultiPoint(ps) | VectorGeometry::LineString(ps) => line(ps),
        VectorGeometry::MultiLineString(ls) => Value::Array(ls.iter().map(|l| line(l)).collect()),
        VectorGeometry::Polygon(rings) => polygon(rings),
        VectorGeometry::MultiPolygon(ps) => Value::Array(ps.iter().map(|p| polygon(p)).collect()),
    };
    let mut obj = Map::new();
    obj.insert(
        "type".to_string(),
        Value::String(geom.type_name().to_string()),
    );
    obj.insert("coordinates".to_string(), coordinates);
    Value::Object(obj)
}
