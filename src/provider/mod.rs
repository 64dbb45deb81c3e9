//! Telemetry providers.
//!
//! Each provider runs as its own task and writes typed readings into its own
//! channel; the aggregator is the only consumer.

pub mod climate;
pub mod power;

pub use climate::{AdvertisementFilter, ClimateProvider};
pub use power::{PollError, PowerProvider};

/// Capacity of each provider's reading channel: a one-deep handoff, so a slow
/// sink back-pressures the provider instead of dropping readings.
pub const READING_CHANNEL_CAPACITY: usize = 1;
