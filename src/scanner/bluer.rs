//! BlueZ D-Bus radio backend.
//!
//! This backend uses the `bluer` crate to communicate with the BlueZ daemon
//! via D-Bus. It requires the `bluetoothd` daemon to be running.
//!
//! Discovery runs with duplicate reporting enabled so that every
//! advertisement of an already known thermometer shows up as a new event,
//! not only the first one.

use super::{
    ADVERTISEMENT_CHANNEL_BUFFER_SIZE, Advertisement, Radio, RadioFuture, ScanError, ScanEvent,
    VendorData,
};
use bluer::{Adapter, AdapterEvent, Address, DiscoveryFilter, DiscoveryTransport, Session};
use futures::{StreamExt, pin_mut};
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Radio backed by the default BlueZ adapter.
#[derive(Default)]
pub struct BluerRadio {
    session: Option<Session>,
    adapter: Option<Adapter>,
}

impl BluerRadio {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Radio for BluerRadio {
    fn enable(&mut self) -> RadioFuture<'_, ()> {
        Box::pin(async move {
            let enable_err = |e: bluer::Error| ScanError::Enable(e.to_string());

            let session = Session::new().await.map_err(enable_err)?;
            let adapter = session.default_adapter().await.map_err(enable_err)?;
            adapter.set_powered(true).await.map_err(enable_err)?;
            info!(adapter = adapter.name(), "Bluetooth adapter enabled");

            self.session = Some(session);
            self.adapter = Some(adapter);
            Ok(())
        })
    }

    fn scan(&mut self) -> RadioFuture<'_, mpsc::Receiver<ScanEvent>> {
        Box::pin(async move {
            let adapter = self.adapter.clone().ok_or(ScanError::NotEnabled)?;
            let scan_err = |e: bluer::Error| ScanError::Scan(e.to_string());

            adapter
                .set_discovery_filter(DiscoveryFilter {
                    transport: DiscoveryTransport::Le,
                    duplicate_data: true,
                    ..Default::default()
                })
                .await
                .map_err(scan_err)?;
            let events = adapter
                .discover_devices_with_changes()
                .await
                .map_err(scan_err)?;

            let (tx, rx) = mpsc::channel(ADVERTISEMENT_CHANNEL_BUFFER_SIZE);

            // The discovery session lives as long as the event stream, which
            // this task owns. Dropping the receiver stops discovery.
            tokio::spawn(async move {
                pin_mut!(events);
                while let Some(event) = events.next().await {
                    let AdapterEvent::DeviceAdded(address) = event else {
                        continue;
                    };
                    let Some(advertisement) = read_advertisement(&adapter, address).await else {
                        continue;
                    };
                    if tx.send(Ok(advertisement)).await.is_err() {
                        break;
                    }
                }
                debug!("Discovery session ended");
            });

            Ok(rx)
        })
    }
}

/// Read the manufacturer data currently cached by BlueZ for `address`.
///
/// Devices can disappear between the discovery event and the property read;
/// such per-device failures are not radio failures and are skipped.
async fn read_advertisement(adapter: &Adapter, address: Address) -> Option<Advertisement> {
    let manufacturer_data = match adapter.device(address) {
        Ok(device) => device.manufacturer_data().await,
        Err(e) => Err(e),
    };

    match manufacturer_data {
        Ok(Some(data)) => Some(Advertisement {
            address: address.into(),
            vendor_data: to_vendor_data(data),
        }),
        Ok(None) => None,
        Err(e) => {
            debug!(%address, error = %e, "Skipping device");
            None
        }
    }
}

/// BlueZ reports manufacturer data as a map; order records by company id so
/// "first record" is deterministic.
fn to_vendor_data(data: HashMap<u16, Vec<u8>>) -> Vec<VendorData> {
    let mut records: Vec<VendorData> = data
        .into_iter()
        .map(|(vendor_id, data)| VendorData { vendor_id, data })
        .collect();
    records.sort_by_key(|r| r.vendor_id);
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::DeviceAddress;

    #[test]
    fn address_conversion() {
        let addr = Address([0xA4, 0xC1, 0x38, 0x5F, 0xA4, 0xE6]);
        let converted: DeviceAddress = addr.into();
        assert_eq!(converted.to_string(), "A4:C1:38:5F:A4:E6");
    }

    #[test]
    fn vendor_records_are_ordered_by_id() {
        let data = HashMap::from([(0xEC88, vec![1, 2, 3]), (0x004C, vec![9])]);
        let records = to_vendor_data(data);
        assert_eq!(records[0].vendor_id, 0x004C);
        assert_eq!(records[1].vendor_id, 0xEC88);
        assert_eq!(records[1].data, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn scan_requires_enable() {
        let mut radio = BluerRadio::new();
        assert!(matches!(radio.scan().await, Err(ScanError::NotEnabled)));
    }
}
