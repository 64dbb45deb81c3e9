//! Smart plug power provider.
//!
//! Polls the plug on a fixed interval. A failed cycle is logged and skipped;
//! the next one runs on schedule with no retry and no backoff.

use crate::config::TapoConfig;
use crate::reading::Power;
use crate::transport::{Transport, TransportError};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Transport-level method every plug call goes through.
pub const REQUEST_METHOD: &str = "request";

/// Plug API method returning the current power draw.
pub const ENERGY_USAGE_METHOD: &str = "get_energy_usage";

/// Why a poll cycle produced no reading.
#[derive(Error, Debug)]
pub enum PollError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("malformed energy usage response: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("device returned error code {0}")]
    Device(i64),
    #[error("energy usage response has no result")]
    MissingResult,
}

#[derive(Debug, Deserialize)]
struct EnergyUsageResponse {
    #[serde(default)]
    error_code: i64,
    result: Option<EnergyUsage>,
}

#[derive(Debug, Deserialize)]
struct EnergyUsage {
    /// Milliwatts
    current_power: i64,
}

/// Parse a `get_energy_usage` response; the reported milliwatts are scaled by 1/1000.
fn parse_energy_usage(body: &[u8]) -> Result<f64, PollError> {
    let response: EnergyUsageResponse = serde_json::from_slice(body)?;
    if response.error_code != 0 {
        return Err(PollError::Device(response.error_code));
    }
    let usage = response.result.ok_or(PollError::MissingResult)?;
    Ok(usage.current_power as f64 / 1000.0)
}

/// Power telemetry provider.
pub struct PowerProvider<T> {
    transport: T,
    device: String,
    interval: Duration,
    payload: Vec<u8>,
}

impl<T: Transport> PowerProvider<T> {
    pub fn new(transport: T, device: impl Into<String>, interval: Duration) -> Self {
        let payload = serde_json::json!({ "method": ENERGY_USAGE_METHOD, "params": null });
        Self {
            transport,
            device: device.into(),
            interval,
            payload: payload.to_string().into_bytes(),
        }
    }

    pub fn from_config(transport: T, config: &TapoConfig) -> Self {
        Self::new(transport, config.host.clone(), config.poll_interval)
    }

    /// Run a single request/parse cycle.
    pub async fn poll_once(&self) -> Result<Power, PollError> {
        let body = self
            .transport
            .request(REQUEST_METHOD, &self.payload)
            .await?;
        let value = parse_energy_usage(&body)?;
        Ok(Power {
            value,
            device: self.device.clone(),
        })
    }

    /// Poll forever, or until the reading channel closes.
    pub async fn run(self, readings: mpsc::Sender<Power>) {
        loop {
            tokio::time::sleep(self.interval).await;
            debug!(device = %self.device, "Reading power");

            match self.poll_once().await {
                Ok(reading) => {
                    if readings.send(reading).await.is_err() {
                        info!("Reading channel closed, stopping power poller");
                        return;
                    }
                }
                Err(e) => warn!(device = %self.device, error = %e, "Power poll failed"),
            }
        }
    }
}
