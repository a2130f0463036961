//! Messages exchanged with the background tile worker.
//!
//! Both directions are plain `serde` types so they can cross a thread, a
//! process or a JSON pipe unchanged. A response without `tileData` reports a
//! failed fetch.

use layers::{LayerColors, TileLayer};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileRequest {
    /// Tile key, `x/y/z`.
    pub tile: String,
    /// Layers to extract, with their fill colors.
    pub layers: LayerColors,
    /// URL template containing `{x}`, `{y}` and `{z}`.
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileResponse {
    pub tile: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tile_data: Option<Vec<TileLayer>>,
}

impl TileResponse {
    pub fn ready(tile: impl Into<String>, layers: Vec<TileLayer>) -> Self {
        Self {
            tile: tile.into(),
            tile_data: Some(layers),
        }
    }

    pub fn failed(tile: impl Into<String>) -> Self {
        Self {
            tile: tile.into(),
            tile_data: None,
        }
    }
}
