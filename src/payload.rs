//! Govee thermo-hygrometer advertisement payload.
//!
//! The sensor packs temperature and humidity into one integer carried in the
//! manufacturer-specific data of its advertisements:
//!
//! ```text
//! encoded = |temperature in 0.1 °C| * 1000 + humidity in 0.1 %
//! ```
//!
//! Bit 23 (`0x800000`) carries the temperature sign, the low 23 bits carry
//! the magnitude. The last two bytes of the vendor data are a trailer with no
//! measurement content.

/// Number of trailing vendor-data bytes that are not part of the reading.
pub const TRAILER_LEN: usize = 2;

/// Set when the temperature is below zero.
pub const SIGN_BIT: u64 = 0x80_0000;

/// Mask selecting the packed temperature/humidity value.
pub const VALUE_MASK: u64 = 0x7F_FFFF;

/// Decode the temperature in °C.
pub fn decode_temperature(encoded: u64) -> f64 {
    let tenths = (encoded & VALUE_MASK) / 1000;
    if encoded & SIGN_BIT != 0 {
        -(tenths as f64 / 10.0)
    } else {
        tenths as f64 / 10.0
    }
}

/// Decode the relative humidity in percent. Never negative.
pub fn decode_humidity(encoded: u64) -> f64 {
    ((encoded & VALUE_MASK) % 1000) as f64 / 10.0
}

/// Decode `(temperature, humidity)` from a packed value.
///
/// Total over `u64`: bits above 23 are ignored.
pub fn decode(encoded: u64) -> (f64, f64) {
    (decode_temperature(encoded), decode_humidity(encoded))
}

/// Pack raw vendor data into the integer understood by [`decode`].
///
/// Drops the trailer, left-pads with zeros to eight bytes and reads the result
/// as big-endian. If more than eight bytes remain, only the last eight are
/// used, so leading bytes of an oversized frame are discarded rather than
/// trailing ones. Returns `None` when the data is shorter than the trailer.
///
/// ```
/// use home_metrics::payload::pack;
///
/// assert_eq!(pack(&[0x00, 0x03, 0x59, 0x1D, 0x64, 0x00]), Some(0x0003_591D));
/// assert_eq!(pack(&[0x64]), None);
/// ```
pub fn pack(vendor_data: &[u8]) -> Option<u64> {
    let body_len = vendor_data.len().checked_sub(TRAILER_LEN)?;
    let body = &vendor_data[..body_len];
    let body = &body[body.len().saturating_sub(8)..];

    let mut bytes = [0u8; 8];
    bytes[8 - body.len()..].copy_from_slice(body);
    Some(u64::from_be_bytes(bytes))
}
