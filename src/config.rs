//! Process configuration.
//!
//! Settings are read once at startup from an optional JSON5 file. Every
//! section has defaults, so an empty file (or no file at all) yields a working
//! setup that scans for the two reference thermometers and serves metrics on
//! port 2112. The smart plug poller only runs when a `tapo` section is given.
//!
//! ```json5
//! {
//!     metrics: { listen: "0.0.0.0:2112", path: "/metrics" },
//!     logging: { level: "debug", format: "json" },
//!     devices: { "A4:C1:38:5F:A4:E6": "salon" },
//!     govee: { mac: "A4:C1:38", company_id: 60552 },
//!     tapo: { host: "192.168.1.40", user: "me@example.com", password: "secret", name: "taller", poll_interval: "15s" },
//! }
//! ```

use crate::devices::DeviceNames;
use crate::http::HEALTH_PATH;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading the configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(String),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub metrics: MetricsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Address to symbolic name table for the thermometers.
    #[serde(default = "default_devices")]
    pub devices: BTreeMap<String, String>,

    /// BLE thermometer provider; `null` disables it.
    #[serde(default = "default_govee")]
    pub govee: Option<GoveeConfig>,

    /// Smart plug provider; absent by default.
    #[serde(default)]
    pub tapo: Option<TapoConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            metrics: MetricsConfig::default(),
            logging: LoggingConfig::default(),
            devices: default_devices(),
            govee: default_govee(),
            tapo: None,
        }
    }
}

impl Config {
    /// Load a configuration file in JSON5 format.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&content)
    }

    /// Parse a configuration from a JSON5 string.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            json5::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that deserialize fine but cannot be served.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.metrics.validate()
    }

    pub fn device_names(&self) -> DeviceNames {
        DeviceNames::new(&self.devices)
    }
}

/// Metrics endpoint settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Socket address the HTTP endpoint binds to.
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Path serving the text exposition format.
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

impl MetricsConfig {
    /// The metrics path must be an absolute route without parameters and
    /// must not shadow the health endpoint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let path = self.path.as_str();
        if !path.starts_with('/') {
            return Err(ConfigError::Invalid(format!(
                "metrics path '{path}' must start with '/'"
            )));
        }
        if path == HEALTH_PATH {
            return Err(ConfigError::Invalid(format!(
                "metrics path '{path}' is reserved for the health endpoint"
            )));
        }
        if path
            .split('/')
            .any(|segment| segment.starts_with(':') || segment.starts_with('*'))
        {
            return Err(ConfigError::Invalid(format!(
                "metrics path '{path}' must not contain route parameters"
            )));
        }
        Ok(())
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            path: default_metrics_path(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// One of `trace`, `debug`, `info`, `warn`, `error`.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

/// Filter applied to BLE advertisements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoveeConfig {
    /// Fragment that must appear in the advertiser's address.
    #[serde(default = "default_mac_fragment")]
    pub mac: String,

    /// Bluetooth SIG company identifier of the first manufacturer data record.
    #[serde(default = "default_company_id", alias = "company-id")]
    pub company_id: u16,
}

impl Default for GoveeConfig {
    fn default() -> Self {
        Self {
            mac: default_mac_fragment(),
            company_id: default_company_id(),
        }
    }
}

/// Smart plug endpoint and poll schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TapoConfig {
    /// Host name or IP of the plug; also tags the emitted readings.
    pub host: String,

    #[serde(default)]
    pub user: String,

    #[serde(default)]
    pub password: String,

    /// Name used for the power gauge (`<name>_power`).
    #[serde(default = "default_power_name")]
    pub name: String,

    #[serde(
        default = "default_poll_interval",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub poll_interval: Duration,

    /// Per-request timeout.
    #[serde(
        default = "default_request_timeout",
        deserialize_with = "deserialize_duration",
        serialize_with = "serialize_duration"
    )]
    pub timeout: Duration,
}

fn default_listen() -> String {
    "0.0.0.0:2112".to_string()
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_devices() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("A4:C1:38:5F:A4:E6".to_string(), "salon".to_string()),
        ("A4:C1:38:B8:1A:4C".to_string(), "taller".to_string()),
    ])
}

fn default_govee() -> Option<GoveeConfig> {
    Some(GoveeConfig::default())
}

fn default_mac_fragment() -> String {
    "A4:C1:38".to_string()
}

fn default_company_id() -> u16 {
    60552
}

fn default_power_name() -> String {
    "taller".to_string()
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(15)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Seconds(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => parse_duration(&text).map_err(serde::de::Error::custom),
    }
}

fn serialize_duration<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&format!("{}ms", duration.as_millis()))
}

/// Parse a duration from a human-readable string.
///
/// Supports the following suffixes:
/// - `s` or no suffix: seconds
/// - `m`: minutes
/// - `h`: hours
/// - `ms`: milliseconds
///
/// # Examples
/// ```
/// use home_metrics::config::parse_duration;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration("15s").unwrap(), Duration::from_secs(15));
/// assert_eq!(parse_duration("1m").unwrap(), Duration::from_secs(60));
/// assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
/// ```
pub fn parse_duration(src: &str) -> Result<Duration, String> {
    let src = src.trim();
    if src.is_empty() {
        return Err("empty duration string".to_string());
    }

    let (num, millis_per_unit) = if let Some(num) = src.strip_suffix("ms") {
        (num, 1)
    } else if let Some(num) = src.strip_suffix('h') {
        (num, 3_600_000)
    } else if let Some(num) = src.strip_suffix('m') {
        (num, 60_000)
    } else if let Some(num) = src.strip_suffix('s') {
        (num, 1_000)
    } else {
        (src, 1_000)
    };

    num.trim()
        .parse::<u64>()
        .map(|n| Duration::from_millis(n.saturating_mul(millis_per_unit)))
        .map_err(|_| format!("invalid duration: {src}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse("{}").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.metrics.listen, "0.0.0.0:2112");
        assert_eq!(config.metrics.path, "/metrics");
        assert_eq!(config.govee, Some(GoveeConfig::default()));
        assert_eq!(config.govee.unwrap().company_id, 60552);
        assert!(config.tapo.is_none());
        assert_eq!(config.devices.len(), 2);
    }

    #[test]
    fn parses_full_config() {
        let config = Config::parse(
            r#"
            {
                metrics: { listen: "127.0.0.1:9000" },
                logging: { level: "debug", format: "json" },
                devices: { "a4:c1:38:00:00:01": "kitchen" },
                govee: { mac: "A4:C1", "company-id": 1234 },
                tapo: {
                    host: "10.0.0.7",
                    user: "me",
                    password: "pw",
                    poll_interval: "30s",
                },
            }
            "#,
        )
        .unwrap();

        assert_eq!(config.metrics.listen, "127.0.0.1:9000");
        assert_eq!(config.metrics.path, "/metrics");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.device_names().resolve("A4:C1:38:00:00:01"), "kitchen");
        assert_eq!(config.device_names().resolve("A4:C1:38:5F:A4:E6"), "unknown");

        let govee = config.govee.unwrap();
        assert_eq!(govee.mac, "A4:C1");
        assert_eq!(govee.company_id, 1234);

        let tapo = config.tapo.unwrap();
        assert_eq!(tapo.host, "10.0.0.7");
        assert_eq!(tapo.name, "taller");
        assert_eq!(tapo.poll_interval, Duration::from_secs(30));
        assert_eq!(tapo.timeout, Duration::from_secs(10));
    }

    #[test]
    fn null_govee_disables_scanner() {
        let config = Config::parse("{ govee: null }").unwrap();
        assert!(config.govee.is_none());
    }

    #[test]
    fn numeric_poll_interval_is_seconds() {
        let config = Config::parse(r#"{ tapo: { host: "plug", poll_interval: 5 } }"#).unwrap();
        assert_eq!(config.tapo.unwrap().poll_interval, Duration::from_secs(5));
    }

    #[test]
    fn invalid_config_is_reported() {
        assert!(matches!(
            Config::parse("{ metrics: "),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            Config::parse(r#"{ tapo: { host: "plug", poll_interval: "soon" } }"#),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            Config::load_from_file("/nonexistent/home-metrics.json5"),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn metrics_path_must_be_servable() {
        for path in ["metrics", "", "/health", "/:name", "/stats/*rest"] {
            let content = format!(r#"{{ metrics: {{ path: "{path}" }} }}"#);
            assert!(
                matches!(Config::parse(&content), Err(ConfigError::Invalid(_))),
                "path {path:?} should be rejected"
            );
        }

        let config = Config::parse(r#"{ metrics: { path: "/prom/metrics" } }"#).unwrap();
        assert_eq!(config.metrics.path, "/prom/metrics");
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn parse_duration_suffixes() {
        assert_eq!(parse_duration("3s").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
        assert_eq!(parse_duration("10").unwrap(), Duration::from_secs(10));
        assert_eq!(parse_duration(" 3 s ").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_invalid() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("-1s").is_err());
    }
}
