//! Govee thermometer provider.
//!
//! Owns the radio, keeps a scan session running and turns every matching
//! advertisement into a [`TemperatureHumidity`] reading.

use crate::config::GoveeConfig;
use crate::devices::DeviceNames;
use crate::payload;
use crate::reading::TemperatureHumidity;
use crate::scanner::{Advertisement, Radio, ScanError};
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

/// Which advertisements are thermometer readings.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvertisementFilter {
    address_fragment: String,
    vendor_id: u16,
}

impl AdvertisementFilter {
    pub fn new(address_fragment: &str, vendor_id: u16) -> Self {
        Self {
            address_fragment: address_fragment.to_uppercase(),
            vendor_id,
        }
    }

    /// Payload of the first vendor record, if the advertisement passes the filter.
    pub fn matching_payload<'a>(&self, advertisement: &'a Advertisement) -> Option<&'a [u8]> {
        if !advertisement
            .address
            .contains_fragment(&self.address_fragment)
        {
            return None;
        }
        advertisement
            .vendor_data
            .first()
            .filter(|record| record.vendor_id == self.vendor_id)
            .map(|record| record.data.as_slice())
    }
}

impl From<&GoveeConfig> for AdvertisementFilter {
    fn from(config: &GoveeConfig) -> Self {
        Self::new(&config.mac, config.company_id)
    }
}

/// BLE telemetry provider.
pub struct ClimateProvider<R> {
    radio: R,
    filter: AdvertisementFilter,
    devices: DeviceNames,
}

impl<R: Radio> ClimateProvider<R> {
    pub fn new(radio: R, filter: AdvertisementFilter, devices: DeviceNames) -> Self {
        Self {
            radio,
            filter,
            devices,
        }
    }

    /// Decode an advertisement if it passes the filter.
    pub fn accept(&self, advertisement: &Advertisement) -> Option<TemperatureHumidity> {
        let data = self.filter.matching_payload(advertisement)?;
        let Some(encoded) = payload::pack(data) else {
            debug!(
                address = %advertisement.address,
                len = data.len(),
                "Vendor data too short, ignoring advertisement"
            );
            return None;
        };

        let (temperature, humidity) = payload::decode(encoded);
        let address = advertisement.address.to_string();
        Some(TemperatureHumidity {
            temperature,
            humidity,
            device: self.devices.resolve(&address).to_string(),
        })
    }

    /// Run until the radio fails or the reading channel closes.
    ///
    /// Failing to enable the adapter or a scan error is returned immediately;
    /// there is no retry. A scan session that ends on its own is restarted.
    pub async fn run(
        mut self,
        readings: mpsc::Sender<TemperatureHumidity>,
    ) -> Result<(), ScanError> {
        self.radio.enable().await?;

        loop {
            info!("Scanning for devices...");
            let mut events = self.radio.scan().await?;

            while let Some(event) = events.recv().await {
                let advertisement = event?;
                let Some(reading) = self.accept(&advertisement) else {
                    trace!(address = %advertisement.address, "Advertisement filtered out");
                    continue;
                };

                debug!(
                    device = %reading.device,
                    temperature = reading.temperature,
                    humidity = reading.humidity,
                    "Emitting climate reading"
                );
                if readings.send(reading).await.is_err() {
                    info!("Reading channel closed, stopping scanner");
                    return Ok(());
                }
            }

            info!("Scan stopped");
        }
    }
}
