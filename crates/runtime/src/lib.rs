pub mod frame;
pub mod metrics;
pub mod watchdog;

pub use frame::*;
pub use metrics::*;
pub use watchdog::*;
