//! Prometheus gauges.
//!
//! Gauges live in a registry owned by this process (not the `prometheus`
//! crate's global default registry). The aggregator receives the handles it
//! writes to; the HTTP endpoint only renders the registry.

use crate::config::TapoConfig;
use crate::devices::DeviceNames;
use prometheus::{Encoder, Gauge, Opts, Registry, TextEncoder};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum MetricsError {
    #[error("metric registration failed: {0}")]
    Prometheus(#[from] prometheus::Error),
    #[error("metrics output is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Temperature and humidity gauges of one thermometer.
#[derive(Clone)]
pub struct ClimateGauges {
    pub temperature: Gauge,
    pub humidity: Gauge,
}

/// Every gauge the aggregator may write, keyed by reading device.
#[derive(Clone, Default)]
pub struct Gauges {
    climate: HashMap<String, ClimateGauges>,
    power: HashMap<String, Gauge>,
}

impl Gauges {
    pub fn climate(&self, device: &str) -> Option<&ClimateGauges> {
        self.climate.get(device)
    }

    pub fn power(&self, device: &str) -> Option<&Gauge> {
        self.power.get(device)
    }

    pub fn insert_climate(&mut self, device: impl Into<String>, gauges: ClimateGauges) {
        self.climate.insert(device.into(), gauges);
    }

    pub fn insert_power(&mut self, device: impl Into<String>, gauge: Gauge) {
        self.power.insert(device.into(), gauge);
    }
}

/// Build a valid Prometheus metric name `<device>_<metric>`.
///
/// ```
/// use home_metrics::metrics::metric_name;
///
/// assert_eq!(metric_name("salon", "temperature"), "salon_temperature");
/// assert_eq!(metric_name("living room", "humidity"), "living_room_humidity");
/// ```
pub fn metric_name(device: &str, metric: &str) -> String {
    let mut name: String = format!("{device}_{metric}")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}

/// Process-local gauge registry.
#[derive(Clone, Default)]
pub struct MetricsRegistry {
    registry: Registry,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create and register a gauge.
    pub fn gauge(&self, name: &str, help: &str) -> Result<Gauge, MetricsError> {
        let gauge = Gauge::with_opts(Opts::new(name, help))?;
        self.registry.register(Box::new(gauge.clone()))?;
        debug!(name, "Registered gauge");
        Ok(gauge)
    }

    pub fn climate_gauges(&self, device: &str) -> Result<ClimateGauges, MetricsError> {
        Ok(ClimateGauges {
            temperature: self.gauge(
                &metric_name(device, "temperature"),
                &format!("Temperature of the {device}"),
            )?,
            humidity: self.gauge(
                &metric_name(device, "humidity"),
                &format!("Humidity of the {device}"),
            )?,
        })
    }

    pub fn power_gauge(&self, name: &str) -> Result<Gauge, MetricsError> {
        self.gauge(
            &metric_name(name, "power"),
            &format!("Power draw of the {name}"),
        )
    }

    /// Register gauges for every named thermometer and, if configured, the plug.
    ///
    /// Thermometer gauges are keyed by symbolic name; the power gauge is keyed
    /// by the plug host, which is what power readings carry.
    pub fn build_gauges(
        &self,
        devices: &DeviceNames,
        plug: Option<&TapoConfig>,
    ) -> Result<Gauges, MetricsError> {
        let mut gauges = Gauges::default();
        for name in devices.names() {
            gauges.insert_climate(name, self.climate_gauges(name)?);
        }
        if let Some(plug) = plug {
            gauges.insert_power(plug.host.clone(), self.power_gauge(&plug.name)?);
        }
        Ok(gauges)
    }

    /// Render the text exposition snapshot.
    pub fn render(&self) -> Result<String, MetricsError> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::reference_devices;
    use std::time::Duration;

    fn plug() -> TapoConfig {
        TapoConfig {
            host: "10.0.0.7".to_string(),
            user: String::new(),
            password: String::new(),
            name: "taller".to_string(),
            poll_interval: Duration::from_secs(15),
            timeout: Duration::from_secs(10),
        }
    }

    #[test]
    fn metric_names_are_sanitized() {
        assert_eq!(metric_name("taller", "power"), "taller_power");
        assert_eq!(metric_name("sótano-1", "humidity"), "s_tano_1_humidity");
        assert_eq!(
            metric_name("2nd floor", "temperature"),
            "_2nd_floor_temperature"
        );
    }

    #[test]
    fn builds_gauges_for_configured_devices() {
        let registry = MetricsRegistry::new();
        let gauges = registry
            .build_gauges(&reference_devices(), Some(&plug()))
            .unwrap();

        assert!(gauges.climate("salon").is_some());
        assert!(gauges.climate("taller").is_some());
        assert!(gauges.climate("unknown").is_none());
        assert!(gauges.power("10.0.0.7").is_some());
        assert!(gauges.power("taller").is_none());
    }

    #[test]
    fn render_contains_gauge_values() {
        let registry = MetricsRegistry::new();
        let gauges = registry
            .build_gauges(&reference_devices(), Some(&plug()))
            .unwrap();
        gauges.climate("salon").unwrap().temperature.set(21.5);
        gauges.power("10.0.0.7").unwrap().set(0.75);

        let text = registry.render().unwrap();
        assert!(text.contains("# HELP salon_temperature Temperature of the salon"));
        assert!(text.contains("# TYPE salon_temperature gauge"));
        assert!(text.contains("salon_temperature 21.5"));
        assert!(text.contains("taller_humidity 0"));
        assert!(text.contains("taller_power 0.75"));
    }

    #[test]
    fn duplicate_registration_fails() {
        let registry = MetricsRegistry::new();
        registry.climate_gauges("salon").unwrap();
        assert!(matches!(
            registry.climate_gauges("salon"),
            Err(MetricsError::Prometheus(_))
        ));
    }

    #[test]
    fn registries_are_independent() {
        let a = MetricsRegistry::new();
        let b = MetricsRegistry::new();
        a.climate_gauges("salon").unwrap();
        b.climate_gauges("salon").unwrap();
        assert!(!b.render().unwrap().is_empty());
    }
}
