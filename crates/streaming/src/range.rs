use std::collections::BTreeSet;

use foundation::GeoBounds;

use crate::tile::TileCoord;

/// Zoom window and prefetch margin for tile selection.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TileRange {
    pub min_tile_zoom: u8,
    pub max_tile_zoom: u8,
    /// Extra rings of tiles fetched around the visible rectangle.
    pub tile_buffer: u32,
}

impl Default for TileRange {
    fn default() -> Self {
        Self {
            min_tile_zoom: 7,
            max_tile_zoom: 16,
            tile_buffer: 1,
        }
    }
}

/// Tiles wanted for one viewport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileSelection {
    pub zoom: u8,
    /// Visible rectangle in x-major order.
    pub visible: Vec<TileCoord>,
    /// Buffered rectangle plus the two ancestor levels of each buffered tile.
    pub prefetch: BTreeSet<TileCoord>,
}

impl TileSelection {
    pub fn is_visible(&self, tile: &TileCoord) -> bool {
        self.visible.contains(tile)
    }
}

impl TileRange {
    /// Integer tile zoom for a continuous camera zoom.
    pub fn tile_zoom(&self, zoom: f64) -> u8 {
        let z = zoom.trunc();
        if z.is_nan() {
            return self.min_tile_zoom;
        }
        z.clamp(f64::from(self.min_tile_zoom), f64::from(self.max_tile_zoom)) as u8
    }

    fn zoom_in_range(&self, z: u8) -> bool {
        z >= self.min_tile_zoom && z <= self.max_tile_zoom
    }

    pub fn select(&self, bounds: &GeoBounds, zoom: f64) -> TileSelection {
        let z = self.tile_zoom(zoom);
        let top_left = TileCoord::from_lng_lat(bounds.west, bounds.north, z);
        let bottom_right = TileCoord::from_lng_lat(bounds.east, bounds.south, z);

        let mut visible = Vec::new();
        for x in top_left.x..=bottom_right.x {
            for y in top_left.y..=bottom_right.y {
                visible.push(TileCoord::new(z, x, y));
            }
        }

        let n = TileCoord::tiles_per_axis(z) as i64;
        let buffer = i64::from(self.tile_buffer);
        let mut prefetch = BTreeSet::new();
        for x in i64::from(top_left.x) - buffer..=i64::from(bottom_right.x) + buffer {
            for y in i64::from(top_left.y) - buffer..=i64::from(bottom_right.y) + buffer {
                if x < 0 || y < 0 || x >= n || y >= n {
                    continue;
                }
                let tile = TileCoord::new(z, x as u32, y as u32);
                prefetch.insert(tile);
                for levels in 1..=2 {
                    if let Some(ancestor) = tile.ancestor(levels) {
                        if self.zoom_in_range(ancestor.z) {
                            prefetch.insert(ancestor);
                        }
                    }
                }
            }
        }

        TileSelection {
            zoom: z,
            visible,
            prefetch,
        }
    }
}
