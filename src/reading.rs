//! Readings produced by the telemetry providers.

/// A decoded thermo-hygrometer advertisement.
#[derive(Debug, Clone, PartialEq)]
pub struct TemperatureHumidity {
    /// Temperature in Celsius
    pub temperature: f64,
    /// Relative humidity in percent (0-100)
    pub humidity: f64,
    /// Symbolic device name, or `unknown`
    pub device: String,
}

/// One successful smart plug poll.
#[derive(Debug, Clone, PartialEq)]
pub struct Power {
    /// Current power draw, reported milliwatts divided by 1000
    pub value: f64,
    /// Endpoint the reading was taken from
    pub device: String,
}

/// Any reading the aggregator dispatches.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    Climate(TemperatureHumidity),
    Power(Power),
}

impl Reading {
    pub fn device(&self) -> &str {
        match self {
            Reading::Climate(r) => &r.device,
            Reading::Power(r) => &r.device,
        }
    }
}

impl From<TemperatureHumidity> for Reading {
    fn from(reading: TemperatureHumidity) -> Self {
        Reading::Climate(reading)
    }
}

impl From<Power> for Reading {
    fn from(reading: Power) -> Self {
        Reading::Power(reading)
    }
}
