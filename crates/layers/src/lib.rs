pub mod layer;
pub mod outline;
pub mod symbology;
pub mod tessellate;

pub use layer::*;
pub use outline::*;
pub use symbology::*;
pub use tessellate::*;
