//! Bluetooth device address as reported by the radio.
//!
//! Addresses are kept as six raw bytes and rendered in the canonical
//! upper-case `AA:BB:CC:DD:EE:FF` form, which is also the form the address
//! filter and the device name table compare against.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A 48-bit Bluetooth device address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DeviceAddress(pub [u8; 6]);

impl DeviceAddress {
    /// Whether the canonical rendering of this address contains `fragment`.
    ///
    /// `fragment` is expected in canonical (upper-case) form, e.g. `A4:C1:38`.
    /// An empty fragment matches every address.
    pub fn contains_fragment(&self, fragment: &str) -> bool {
        self.to_string().contains(fragment)
    }
}

impl fmt::Display for DeviceAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

/// Errors returned when parsing an address string.
#[derive(Error, Debug, PartialEq)]
pub enum AddressError {
    #[error("invalid address '{0}': expected six ':'-separated octets")]
    OctetCount(String),
    #[error("invalid address octet '{0}'")]
    Octet(String),
}

impl FromStr for DeviceAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let mut octets = s.split(':');

        for byte in bytes.iter_mut() {
            let octet = octets
                .next()
                .ok_or_else(|| AddressError::OctetCount(s.to_string()))?;
            if octet.len() != 2 {
                return Err(AddressError::Octet(octet.to_string()));
            }
            *byte =
                u8::from_str_radix(octet, 16).map_err(|_| AddressError::Octet(octet.to_string()))?;
        }

        if octets.next().is_some() {
            return Err(AddressError::OctetCount(s.to_string()));
        }

        Ok(DeviceAddress(bytes))
    }
}

impl From<[u8; 6]> for DeviceAddress {
    fn from(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }
}

#[cfg(feature = "bluer")]
impl From<bluer::Address> for DeviceAddress {
    fn from(addr: bluer::Address) -> Self {
        Self(addr.0)
    }
}
