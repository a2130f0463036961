use std::collections::BTreeMap;
use std::sync::Arc;

use layers::{TileLayer, has_geometry};

use crate::tile::TileCoord;

/// Decoded layers of a tile, shared between the cache and draw calls.
pub type TileData = Arc<Vec<TileLayer>>;

#[derive(Debug, Clone, PartialEq)]
pub enum TileState {
    /// A fetch is in flight.
    Pending,
    Ready(TileData),
    Failed,
}

impl TileState {
    pub fn is_pending(&self) -> bool {
        matches!(self, TileState::Pending)
    }

    /// Resolved data with at least one non-empty layer.
    pub fn drawable(&self) -> Option<&TileData> {
        match self {
            TileState::Ready(data) if has_geometry(data) => Some(data),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    UnknownTile(TileCoord),
    AlreadySettled(TileCoord),
}

impl std::fmt::Display for CacheError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheError::UnknownTile(tile) => write!(f, "tile {tile} was never requested"),
            CacheError::AlreadySettled(tile) => write!(f, "tile {tile} is no longer pending"),
        }
    }
}

impl std::error::Error for CacheError {}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub pending: usize,
    pub ready: usize,
    pub failed: usize,
}

/// Per-session tile store.
///
/// An entry moves absent -> pending -> ready | failed, exactly once, and is
/// never removed. Keys are ordered so iteration is stable.
#[derive(Debug, Default)]
pub struct TileCache {
    entries: BTreeMap<TileCoord, TileState>,
}

impl TileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, tile: &TileCoord) -> Option<&TileState> {
        self.entries.get(tile)
    }

    /// Marks an absent tile pending. Returns `true` when the caller must start
    /// a fetch; any existing entry is left alone.
    pub fn begin(&mut self, tile: TileCoord) -> bool {
        if self.entries.contains_key(&tile) {
            return false;
        }
        self.entries.insert(tile, TileState::Pending);
        true
    }

    /// Settles a pending tile. `None` records a failed fetch.
    pub fn complete(
        &mut self,
        tile: TileCoord,
        data: Option<Vec<TileLayer>>,
    ) -> Result<(), CacheError> {
        let entry = self
            .entries
            .get_mut(&tile)
            .ok_or(CacheError::UnknownTile(tile))?;
        if !entry.is_pending() {
            return Err(CacheError::AlreadySettled(tile));
        }
        *entry = match data {
            Some(layers) => TileState::Ready(Arc::new(layers)),
            None => TileState::Failed,
        };
        Ok(())
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();
        for state in self.entries.values() {
            match state {
                TileState::Pending => stats.pending += 1,
                TileState::Ready(_) => stats.ready += 1,
                TileState::Failed => stats.failed += 1,
            }
        }
        stats
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TileCoord, &TileState)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn water(vertices: Vec<f32>) -> Vec<TileLayer> {
        vec![TileLayer::new("waterarea", vertices)]
    }

    #[test]
    fn begin_only_once_per_tile() {
        let mut cache = TileCache::new();
        let t = TileCoord::new(10, 909, 403);
        assert!(cache.begin(t));
        assert!(!cache.begin(t));
        assert_eq!(cache.get(&t), Some(&TileState::Pending));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn resolved_entries_never_change() {
        let mut cache = TileCache::new();
        let t = TileCoord::new(10, 909, 403);
        cache.begin(t);
        cache.complete(t, Some(water(vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0]))).unwrap();

        assert!(!cache.begin(t));
        assert_eq!(cache.complete(t, None), Err(CacheError::AlreadySettled(t)));
        assert_eq!(
            cache.get(&t).and_then(TileState::drawable).map(|d| d[0].vertex_count()),
            Some(3)
        );
    }

    #[test]
    fn failed_entries_stay_failed() {
        let mut cache = TileCache::new();
        let t = TileCoord::new(8, 1, 2);
        cache.begin(t);
        cache.complete(t, None).unwrap();
        assert!(!cache.begin(t));
        assert_eq!(
            cache.complete(t, Some(water(vec![1.0, 1.0]))),
            Err(CacheError::AlreadySettled(t))
        );
        assert_eq!(cache.get(&t), Some(&TileState::Failed));
    }

    #[test]
    fn completing_unknown_tile_is_an_error() {
        let mut cache = TileCache::new();
        let t = TileCoord::new(8, 1, 2);
        assert_eq!(cache.complete(t, None), Err(CacheError::UnknownTile(t)));
        assert!(cache.is_empty());
    }

    #[test]
    fn empty_layers_are_not_drawable() {
        let mut cache = TileCache::new();
        let t = TileCoord::new(8, 1, 2);
        cache.begin(t);
        cache.complete(t, Some(water(Vec::new()))).unwrap();
        assert_eq!(cache.get(&t).and_then(TileState::drawable), None);
    }

    #[test]
    fn stats_count_each_state() {
        let mut cache = TileCache::new();
        for x in 0..4 {
            cache.begin(TileCoord::new(4, x, 0));
        }
        cache.complete(TileCoord::new(4, 0, 0), Some(Vec::new())).unwrap();
        cache.complete(TileCoord::new(4, 1, 0), None).unwrap();
        assert_eq!(
            cache.stats(),
            CacheStats {
                pending: 2,
                ready: 1,
                failed: 1
            }
        );
    }
}
