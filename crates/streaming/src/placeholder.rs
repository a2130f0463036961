use crate::cache::{TileCache, TileData};
use crate::tile::TileCoord;

/// What to draw for a tile in view.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    Own(TileData),
    /// Nearest loaded ancestor (parent, then grandparent).
    Ancestor(TileCoord, TileData),
    /// Loaded children, or grandchildren when no child has data.
    Descendants(Vec<(TileCoord, TileData)>),
    Nothing,
}

impl Resolved {
    /// Layer sets to draw, in order.
    pub fn layer_sets(&self) -> Vec<&TileData> {
        match self {
            Resolved::Own(data) | Resolved::Ancestor(_, data) => vec![data],
            Resolved::Descendants(found) => found.iter().map(|(_, d)| d).collect(),
            Resolved::Nothing => Vec::new(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Resolved::Ancestor(..) | Resolved::Descendants(_))
    }
}

/// Picks the best available geometry for `tile` without waiting on fetches.
/// Pending and failed tiles fall back the same way.
pub fn resolve(cache: &TileCache, tile: &TileCoord) -> Resolved {
    let drawable = |t: &TileCoord| cache.get(t).and_then(|s| s.drawable()).cloned();

    if let Some(data) = drawable(tile) {
        return Resolved::Own(data);
    }

    for levels in 1..=2 {
        if let Some(ancestor) = tile.ancestor(levels) {
            if let Some(data) = drawable(&ancestor) {
                return Resolved::Ancestor(ancestor, data);
            }
        }
    }

    let children = tile.children();
    let found: Vec<(TileCoord, TileData)> = children
        .iter()
        .filter_map(|c| drawable(c).map(|d| (*c, d)))
        .collect();
    if !found.is_empty() {
        return Resolved::Descendants(found);
    }

    let found: Vec<(TileCoord, TileData)> = children
        .iter()
        .flat_map(|c| c.children())
        .filter_map(|g| drawable(&g).map(|d| (g, d)))
        .collect();
    if !found.is_empty() {
        return Resolved::Descendants(found);
    }

    Resolved::Nothing
}
