use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use foundation::GeoBounds;
use foundation::math::{lat_from_mercator_y, lng_from_mercator_x};
use serde::{Deserialize, Serialize};

/// Deepest zoom a tile coordinate may carry; keeps `2^z` within `u32`.
pub const MAX_ZOOM_LEVEL: u8 = 30;

/// Tile coordinate in the XYZ scheme.
///
/// Ordered by zoom first, then column, then row, so sorted sets of tiles group
/// by level.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileKeyError {
    Malformed(String),
    OutOfRange(String),
}

impl fmt::Display for TileKeyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileKeyError::Malformed(key) => write!(f, "malformed tile key {key:?}, expected x/y/z"),
            TileKeyError::OutOfRange(key) => write!(f, "tile key {key:?} is outside its zoom level"),
        }
    }
}

impl std::error::Error for TileKeyError {}

impl TileCoord {
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Tiles along one axis at zoom `z`.
    pub fn tiles_per_axis(z: u8) -> u64 {
        1u64 << z
    }

    pub fn is_valid(&self) -> bool {
        self.z <= MAX_ZOOM_LEVEL
            && u64::from(self.x) < Self::tiles_per_axis(self.z)
            && u64::from(self.y) < Self::tiles_per_axis(self.z)
    }

    /// Tile containing a geographic position. Positions on or beyond the world
    /// edge land in the outermost tile instead of wrapping.
    pub fn from_lng_lat(lng: f64, lat: f64, z: u8) -> Self {
        let n = Self::tiles_per_axis(z) as f64;
        let sin = (lat * PI / 180.0).sin();
        let fx = n * (lng / 360.0 + 0.5);
        let fy = n * (0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / PI);
        let clamp = |v: f64| -> u32 {
            if v.is_nan() {
                return 0;
            }
            v.floor().clamp(0.0, n - 1.0) as u32
        };
        Self::new(z, clamp(fx), clamp(fy))
    }

    pub fn parent(&self) -> Option<TileCoord> {
        (self.z > 0).then(|| TileCoord::new(self.z - 1, self.x / 2, self.y / 2))
    }

    /// Ancestor `levels` zoom levels up, if the pyramid is that deep.
    pub fn ancestor(&self, levels: u8) -> Option<TileCoord> {
        let z = self.z.checked_sub(levels)?;
        Some(TileCoord::new(z, self.x >> levels, self.y >> levels))
    }

    /// The four tiles one level down, in x-major order.
    pub fn children(&self) -> [TileCoord; 4] {
        let (z, x, y) = (self.z + 1, self.x * 2, self.y * 2);
        [
            TileCoord::new(z, x, y),
            TileCoord::new(z, x, y + 1),
            TileCoord::new(z, x + 1, y),
            TileCoord::new(z, x + 1, y + 1),
        ]
    }

    /// Geographic extent of the tile.
    pub fn bounds(&self) -> GeoBounds {
        let n = Self::tiles_per_axis(self.z) as f64;
        GeoBounds {
            west: lng_from_mercator_x(f64::from(self.x) / n),
            south: lat_from_mercator_y(f64::from(self.y + 1) / n),
            east: lng_from_mercator_x(f64::from(self.x + 1) / n),
            north: lat_from_mercator_y(f64::from(self.y) / n),
        }
    }

    /// Canonical `x/y/z` key.
    pub fn key(&self) -> String {
        self.to_string()
    }

    /// Substitutes `{x}`, `{y}` and `{z}` in a URL template.
    pub fn url(&self, template: &str) -> String {
        template
            .replace("{x}", &self.x.to_string())
            .replace("{y}", &self.y.to_string())
            .replace("{z}", &self.z.to_string())
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.x, self.y, self.z)
    }
}

impl FromStr for TileCoord {
    type Err = TileKeyError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let mut parts = key.split('/');
        let (Some(x), Some(y), Some(z), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TileKeyError::Malformed(key.to_string()));
        };
        let malformed = |_| TileKeyError::Malformed(key.to_string());
        let coord = TileCoord::new(
            z.parse().map_err(malformed)?,
            x.parse().map_err(malformed)?,
            y.parse().map_err(malformed)?,
        );
        if !coord.is_valid() {
            return Err(TileKeyError::OutOfRange(key.to_string()));
        }
        Ok(coord)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(a: f64, b: f64, eps: f64) {
        let diff = (a - b).abs();
        assert!(diff <= eps, "expected {a} ~= {b} (diff {diff})");
    }

    #[test]
    fn key_round_trips_through_display_and_parse() {
        let tile = TileCoord::new(13, 2412, 3079);
        assert_eq!(tile.key(), "2412/3079/13");
        assert_eq!("2412/3079/13".parse::<TileCoord>(), Ok(tile));
    }

    #[test]
    fn malformed_and_out_of_range_keys_are_rejected() {
        assert!(matches!("1/2".parse::<TileCoord>(), Err(TileKeyError::Malformed(_))));
        assert!(matches!("1/2/3/4".parse::<TileCoord>(), Err(TileKeyError::Malformed(_))));
        assert!(matches!("a/2/3".parse::<TileCoord>(), Err(TileKeyError::Malformed(_))));
        assert!(matches!("-1/0/3".parse::<TileCoord>(), Err(TileKeyError::Malformed(_))));
        assert!(matches!("8/0/3".parse::<TileCoord>(), Err(TileKeyError::OutOfRange(_))));
        assert!(matches!("0/0/31".parse::<TileCoord>(), Err(TileKeyError::OutOfRange(_))));
    }

    #[test]
    fn point_to_tile_matches_slippy_math() {
        // Tokyo station area at z=10.
        let t = TileCoord::from_lng_lat(139.763275, 35.638126, 10);
        assert_eq!((t.x, t.y), (909, 403));

        assert_eq!(TileCoord::from_lng_lat(0.0, 0.0, 1), TileCoord::new(1, 1, 1));
    }

    #[test]
    fn world_edges_clamp_instead_of_wrapping() {
        let se = TileCoord::from_lng_lat(180.0, -85.05, 3);
        assert_eq!(se, TileCoord::new(3, 7, 7));
        let nw = TileCoord::from_lng_lat(-180.0, 89.0, 3);
        assert_eq!(nw, TileCoord::new(3, 0, 0));
    }

    #[test]
    fn hierarchy_navigation() {
        let t = TileCoord::new(13, 2413, 3080);
        assert_eq!(t.parent(), Some(TileCoord::new(12, 1206, 1540)));
        assert_eq!(t.ancestor(2), Some(TileCoord::new(11, 603, 770)));
        assert_eq!(TileCoord::new(0, 0, 0).parent(), None);
        assert_eq!(TileCoord::new(1, 0, 0).ancestor(2), None);

        for child in t.children() {
            assert_eq!(child.parent(), Some(t));
        }
    }

    #[test]
    fn bounds_of_root_tile_cover_the_world() {
        let b = TileCoord::new(0, 0, 0).bounds();
        assert_close(b.west, -180.0, 1e-12);
        assert_close(b.east, 180.0, 1e-12);
        assert_close(b.north, 85.051_128_779_806_59, 1e-9);
        assert_close(b.south, -85.051_128_779_806_59, 1e-9);
    }

    #[test]
    fn url_template_substitution() {
        let t = TileCoord::new(10, 909, 403);
        assert_eq!(
            t.url("https://tiles.example/{z}/{x}/{y}.pbf"),
            "https://tiles.example/10/909/403.pbf"
        );
    }
}
