#![allow(non_snake_case)]

pub mod battery;
pub mod collector;
pub mod cpu;
pub mod disk;
pub mod diskio;
pub mod error;
pub mod gpu;
pub mod host;
pub mod interfaces;
pub mod memory;
pub mod network;
pub mod paths;
pub mod processes;
pub mod rates;
pub mod sampling;
pub mod source;
pub mod system;
pub mod uptime;

pub use collector::{Collector, CollectorConfig};
pub use error::ProviderError;
pub use paths::HostPaths;
pub use rates::{RateEngine, SnapshotStore};
pub use source::{CounterSource, ProcCounterSource};
