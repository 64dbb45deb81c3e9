use crate::devices::DeviceNames;
use crate::scanner::{Advertisement, VendorData};

/// Govee company identifier (60552).
pub const GOVEE_ID: u16 = 0xEC88;

/// Reference sensor addresses.
pub const SALON: &str = "A4:C1:38:5F:A4:E6";
pub const TALLER: &str = "A4:C1:38:B8:1A:4C";

/// The two reference sensors.
pub fn reference_devices() -> DeviceNames {
    DeviceNames::new([(SALON, "salon"), (TALLER, "taller")])
}

/// Build an advertisement with a single vendor record.
pub fn advertisement(address: &str, vendor_id: u16, data: Vec<u8>) -> Advertisement {
    Advertisement {
        address: address.parse().expect("test address must be valid"),
        vendor_data: vec![VendorData { vendor_id, data }],
    }
}
