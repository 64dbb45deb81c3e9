//! Process wiring for `home-metrics`.
//!
//! This module is decoupled from process exit codes so the pipeline can be
//! tested with a fake radio and a fake transport.

use crate::aggregator::Aggregator;
use crate::config::{Config, ConfigError};
use crate::devices::{DeviceEntry, parse_device};
use crate::http::HttpServer;
use crate::metrics::{MetricsError, MetricsRegistry};
use crate::provider::{
    AdvertisementFilter, ClimateProvider, PowerProvider, READING_CHANNEL_CAPACITY,
};
use crate::scanner::{Radio, ScanError};
use crate::transport::{HttpTransport, Transport, TransportError};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Command line options.
#[derive(Parser, Debug, Clone)]
#[command(author, about, version)]
pub struct Options {
    /// Path to configuration file (JSON5 format).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Metrics endpoint listen address, e.g. 0.0.0.0:2112 (overrides config).
    #[arg(long)]
    pub listen: Option<String>,

    /// Name a thermometer by address.
    /// Format: --device A4:C1:38:5F:A4:E6=salon
    #[arg(long = "device", value_parser = parse_device, value_name = "DEVICE")]
    pub devices: Vec<DeviceEntry>,

    /// Log level: trace, debug, info, warn, error (overrides config).
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Options {
    /// Load the configuration file, if any, and apply command line overrides.
    pub fn load_config(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.config {
            Some(path) => Config::load_from_file(path)?,
            None => Config::default(),
        };

        if let Some(listen) = &self.listen {
            config.metrics.listen = listen.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }
        for entry in &self.devices {
            config
                .devices
                .insert(entry.address.clone(), entry.name.clone());
        }

        Ok(config)
    }
}

/// Errors that stop the process.
#[derive(Error, Debug)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error(transparent)]
    Metrics(#[from] MetricsError),
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("invalid listen address '{0}'")]
    ListenAddress(String),
    #[error("metrics endpoint failed: {0}")]
    Http(#[from] std::io::Error),
    #[error("task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Run the providers and the aggregator until a provider fails fatally.
///
/// Each provider gets its own one-deep channel into the aggregator. When the
/// climate provider fails, the power provider is stopped and the aggregator
/// drains the readings already handed off before the error is returned.
pub async fn run_pipeline<R, T>(
    climate: Option<ClimateProvider<R>>,
    power: Option<PowerProvider<T>>,
    aggregator: Aggregator,
) -> Result<(), RunError>
where
    R: Radio + 'static,
    T: Transport + 'static,
{
    let (climate_task, climate_rx) = match climate {
        Some(provider) => {
            let (tx, rx) = mpsc::channel(READING_CHANNEL_CAPACITY);
            (Some(tokio::spawn(provider.run(tx))), Some(rx))
        }
        None => (None, None),
    };
    let (power_task, power_rx) = match power {
        Some(provider) => {
            let (tx, rx) = mpsc::channel(READING_CHANNEL_CAPACITY);
            (Some(tokio::spawn(provider.run(tx))), Some(rx))
        }
        None => (None, None),
    };
    let sink = tokio::spawn(aggregator.run(climate_rx, power_rx));

    if let Some(task) = climate_task {
        let outcome = match task.await {
            Ok(result) => result.map_err(RunError::from),
            Err(e) => Err(RunError::from(e)),
        };
        if let Err(e) = outcome {
            if let Some(power_task) = &power_task {
                power_task.abort();
            }
            sink.await?;
            return Err(e);
        }
    }

    if let Some(task) = power_task {
        task.await?;
    }
    sink.await?;
    Ok(())
}

#[cfg(feature = "bluer")]
fn default_radio() -> Option<Box<dyn Radio>> {
    Some(Box::new(crate::scanner::bluer::BluerRadio::new()))
}

#[cfg(not(feature = "bluer"))]
fn default_radio() -> Option<Box<dyn Radio>> {
    None
}

/// Build every component from `config` and run until a fatal error.
pub async fn run(config: Config) -> Result<(), RunError> {
    config.validate()?;
    let listen_addr: SocketAddr = config
        .metrics
        .listen
        .parse()
        .map_err(|_| RunError::ListenAddress(config.metrics.listen.clone()))?;

    let devices = config.device_names();
    let registry = MetricsRegistry::new();
    let gauges = registry.build_gauges(&devices, config.tapo.as_ref())?;
    let aggregator = Aggregator::new(gauges);

    let climate = match (&config.govee, default_radio()) {
        (Some(govee), Some(radio)) => {
            info!(
                mac = %govee.mac,
                company_id = govee.company_id,
                devices = devices.len(),
                "Thermometer scanner enabled"
            );
            Some(ClimateProvider::new(
                radio,
                AdvertisementFilter::from(govee),
                devices,
            ))
        }
        (Some(_), None) => {
            warn!("No bluetooth backend compiled in, thermometer scanner disabled");
            None
        }
        (None, _) => None,
    };

    let power = match &config.tapo {
        Some(tapo) => {
            info!(
                host = %tapo.host,
                interval = ?tapo.poll_interval,
                "Power poller enabled"
            );
            Some(PowerProvider::from_config(HttpTransport::new(tapo)?, tapo))
        }
        None => None,
    };

    let server = HttpServer::new(registry, listen_addr, config.metrics.path.clone());

    if climate.is_none() && power.is_none() {
        warn!("No providers enabled, serving empty metrics");
        server.run().await?;
        return Ok(());
    }

    tokio::select! {
        result = run_pipeline(climate, power, aggregator) => result,
        result = server.run() => {
            result?;
            Ok(())
        }
    }
}
