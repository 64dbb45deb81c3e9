//! `home-metrics` library.
//!
//! The binary (`src/main.rs`) is responsible for logging setup and process
//! exit codes. The pipeline itself lives in [`crate::app`]:
//!
//! ```text
//! BLE radio ──> ClimateProvider ──┐
//!                                 ├──> Aggregator ──> gauges ──> HTTP /metrics
//! plug ──────> PowerProvider ─────┘
//! ```
//!
//! Providers and the aggregator take their radio, transport and gauges as
//! arguments, so they can be driven deterministically in tests.

pub mod address;
pub mod aggregator;
pub mod app;
pub mod config;
pub mod devices;
pub mod http;
pub mod metrics;
pub mod payload;
pub mod provider;
pub mod reading;
pub mod scanner;
pub mod transport;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types at the crate root
pub use address::DeviceAddress;
pub use aggregator::{Aggregator, Routed};
pub use config::Config;
pub use devices::{DeviceNames, UNKNOWN_DEVICE};
pub use metrics::{Gauges, MetricsRegistry};
pub use provider::{AdvertisementFilter, ClimateProvider, PowerProvider};
pub use reading::{Power, Reading, TemperatureHumidity};
pub use scanner::{Advertisement, Radio, ScanError, VendorData};
pub use transport::{HttpTransport, Transport, TransportError};
