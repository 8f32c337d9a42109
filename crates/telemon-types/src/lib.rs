pub mod counters;
pub mod system;

pub use counters::*;
pub use system::*;
