//! Fan-in of provider readings into gauges.
//!
//! The aggregator is the only writer of every gauge. It waits on all provider
//! channels at once and handles whichever reading arrives first; readings from
//! one provider keep their order, readings from different providers are not
//! ordered relative to each other.

use crate::metrics::Gauges;
use crate::reading::{Power, Reading, TemperatureHumidity};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Where a reading ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Routed {
    /// Temperature and humidity gauges of a known thermometer were set
    Climate,
    /// A power gauge was set
    Power,
    /// No gauge exists for the reading's device; it was only logged
    Unrouted,
}

pub struct Aggregator {
    gauges: Gauges,
}

impl Aggregator {
    pub fn new(gauges: Gauges) -> Self {
        Self { gauges }
    }

    /// Route one reading to its gauges and log it.
    pub fn record(&self, reading: &Reading) -> Routed {
        let routed = match reading {
            Reading::Climate(r) => self.record_climate(r),
            Reading::Power(r) => self.record_power(r),
        };
        if routed == Routed::Unrouted {
            debug!(device = reading.device(), "No gauge for device");
        }
        routed
    }

    fn record_climate(&self, reading: &TemperatureHumidity) -> Routed {
        info!(
            device = %reading.device,
            temperature = reading.temperature,
            humidity = reading.humidity,
            "Climate reading"
        );
        match self.gauges.climate(&reading.device) {
            Some(gauges) => {
                gauges.temperature.set(reading.temperature);
                gauges.humidity.set(reading.humidity);
                Routed::Climate
            }
            None => Routed::Unrouted,
        }
    }

    fn record_power(&self, reading: &Power) -> Routed {
        info!(device = %reading.device, power = reading.value, "Power reading");
        match self.gauges.power(&reading.device) {
            Some(gauge) => {
                gauge.set(reading.value);
                Routed::Power
            }
            None => Routed::Unrouted,
        }
    }

    /// Consume both provider channels until every one of them has closed.
    ///
    /// A `None` channel means the provider is not running.
    pub async fn run(
        self,
        mut climate: Option<mpsc::Receiver<TemperatureHumidity>>,
        mut power: Option<mpsc::Receiver<Power>>,
    ) {
        loop {
            let reading: Reading = tokio::select! {
                Some(r) = recv(&mut climate) => r.into(),
                Some(r) = recv(&mut power) => r.into(),
                else => break,
            };
            self.record(&reading);
        }
        info!("All providers stopped");
    }
}

/// Receive from an optional channel, dropping it once it closes.
async fn recv<T>(rx: &mut Option<mpsc::Receiver<T>>) -> Option<T> {
    let reading = rx.as_mut()?.recv().await;
    if reading.is_none() {
        *rx = None;
    }
    reading
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsRegistry;
    use crate::test_utils::reference_devices;

    fn climate(device: &str, temperature: f64, humidity: f64) -> TemperatureHumidity {
        TemperatureHumidity {
            temperature,
            humidity,
            device: device.to_string(),
        }
    }

    fn power(device: &str, value: f64) -> Power {
        Power {
            value,
            device: device.to_string(),
        }
    }

    fn setup() -> (Aggregator, Gauges) {
        let registry = MetricsRegistry::new();
        let mut gauges = registry.build_gauges(&reference_devices(), None).unwrap();
        gauges.insert_power("10.0.0.7", registry.power_gauge("taller").unwrap());
        (Aggregator::new(gauges.clone()), gauges)
    }

    fn values(gauges: &Gauges, device: &str) -> (f64, f64) {
        let g = gauges.climate(device).unwrap();
        (g.temperature.get(), g.humidity.get())
    }

    #[test]
    fn salon_reading_sets_only_salon_gauges() {
        let (aggregator, gauges) = setup();

        let routed = aggregator.record(&climate("salon", 21.9, 42.1).into());

        assert_eq!(routed, Routed::Climate);
        assert_eq!(values(&gauges, "salon"), (21.9, 42.1));
        assert_eq!(values(&gauges, "taller"), (0.0, 0.0));
        assert_eq!(gauges.power("10.0.0.7").unwrap().get(), 0.0);
    }

    #[test]
    fn unknown_device_sets_no_gauge() {
        let (aggregator, gauges) = setup();

        let routed = aggregator.record(&climate("unknown", 30.0, 10.0).into());

        assert_eq!(routed, Routed::Unrouted);
        assert_eq!(values(&gauges, "salon"), (0.0, 0.0));
        assert_eq!(values(&gauges, "taller"), (0.0, 0.0));
    }

    #[test]
    fn power_reading_sets_power_gauge() {
        let (aggregator, gauges) = setup();

        assert_eq!(
            aggregator.record(&power("10.0.0.7", 1.25).into()),
            Routed::Power
        );
        assert_eq!(gauges.power("10.0.0.7").unwrap().get(), 1.25);
        assert_eq!(
            aggregator.record(&power("10.0.0.8", 3.0).into()),
            Routed::Unrouted
        );
    }

    #[test]
    fn last_value_wins() {
        let (aggregator, gauges) = setup();
        aggregator.record(&climate("taller", 10.0, 80.0).into());
        aggregator.record(&climate("taller", -2.5, 75.5).into());
        assert_eq!(values(&gauges, "taller"), (-2.5, 75.5));
    }

    #[tokio::test]
    async fn run_drains_all_channels_in_per_source_order() {
        let (aggregator, gauges) = setup();
        let (climate_tx, climate_rx) = mpsc::channel(4);
        let (power_tx, power_rx) = mpsc::channel(4);

        climate_tx.send(climate("salon", 20.0, 50.0)).await.unwrap();
        climate_tx.send(climate("salon", 21.0, 51.0)).await.unwrap();
        climate_tx.send(climate("taller", 12.0, 70.0)).await.unwrap();
        power_tx.send(power("10.0.0.7", 0.5)).await.unwrap();
        power_tx.send(power("10.0.0.7", 0.8)).await.unwrap();
        drop(climate_tx);
        drop(power_tx);

        aggregator.run(Some(climate_rx), Some(power_rx)).await;

        assert_eq!(values(&gauges, "salon"), (21.0, 51.0));
        assert_eq!(values(&gauges, "taller"), (12.0, 70.0));
        assert_eq!(gauges.power("10.0.0.7").unwrap().get(), 0.8);
    }

    #[tokio::test]
    async fn run_with_single_provider() {
        let (aggregator, gauges) = setup();
        let (power_tx, power_rx) = mpsc::channel(1);

        let task = tokio::spawn(aggregator.run(None, Some(power_rx)));
        power_tx.send(power("10.0.0.7", 2.0)).await.unwrap();
        drop(power_tx);
        task.await.unwrap();

        assert_eq!(gauges.power("10.0.0.7").unwrap().get(), 2.0);
    }

    #[tokio::test]
    async fn run_returns_immediately_without_providers() {
        let (aggregator, _) = setup();
        aggregator.run(None, None).await;
    }
}
