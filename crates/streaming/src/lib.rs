pub mod cache;
pub mod fetch;
pub mod pipeline;
pub mod placeholder;
pub mod protocol;
pub mod range;
pub mod source;
pub mod tile;
pub mod worker;

pub use cache::*;
pub use fetch::*;
pub use pipeline::*;
pub use placeholder::*;
pub use protocol::*;
pub use range::*;
pub use source::*;
pub use tile::*;
pub use worker::*;
