pub mod mat3;
pub mod projection;
pub mod vec;

pub use mat3::*;
pub use projection::*;
pub use vec::*;
