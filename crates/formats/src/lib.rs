pub mod feature;
pub mod mvt;

pub use feature::*;
pub use mvt::{DEFAULT_EXTENT, MvtError, TileProjector, decode_tile};
