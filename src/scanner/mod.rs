//! BLE radio abstraction.
//!
//! A [`Radio`] is enabled once and then produces a stream of raw
//! advertisements. Decoding and filtering happen in the climate provider, so
//! backends only need to report what the adapter sees.

#[cfg(feature = "bluer")]
pub mod bluer;

use crate::address::DeviceAddress;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use tokio::sync::mpsc;

/// Channel buffer size for advertisements between the backend and the provider.
pub const ADVERTISEMENT_CHANNEL_BUFFER_SIZE: usize = 64;

/// Error type for radio operations. Every variant is fatal for the provider.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The adapter could not be found or powered on
    #[error("failed to enable bluetooth adapter: {0}")]
    Enable(String),
    /// Discovery could not be started or failed while running
    #[error("failed to scan: {0}")]
    Scan(String),
    /// `scan` was called before a successful `enable`
    #[error("bluetooth adapter is not enabled")]
    NotEnabled,
}

/// One manufacturer-specific data record of an advertisement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorData {
    /// Bluetooth SIG company identifier
    pub vendor_id: u16,
    /// Record payload, without the company identifier
    pub data: Vec<u8>,
}

/// A received advertisement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    pub address: DeviceAddress,
    /// Manufacturer data records in the order reported by the backend
    pub vendor_data: Vec<VendorData>,
}

/// Items produced by a running scan. An `Err` ends the scan.
pub type ScanEvent = Result<Advertisement, ScanError>;

/// Boxed future returned by [`Radio`] methods.
pub type RadioFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, ScanError>> + Send + 'a>>;

/// Radio abstraction to enable deterministic tests without Bluetooth hardware.
pub trait Radio: Send {
    /// Power on the adapter.
    fn enable(&mut self) -> RadioFuture<'_, ()>;

    /// Start a scan session.
    ///
    /// The returned channel closes when the session ends; the caller may then
    /// start a new one.
    fn scan(&mut self) -> RadioFuture<'_, mpsc::Receiver<ScanEvent>>;
}

impl<R: Radio + ?Sized> Radio for Box<R> {
    fn enable(&mut self) -> RadioFuture<'_, ()> {
        (**self).enable()
    }

    fn scan(&mut self) -> RadioFuture<'_, mpsc::Receiver<ScanEvent>> {
        (**self).scan()
    }
}
