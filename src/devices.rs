//! Symbolic names for known sensors.
//!
//! Readings are routed to gauges by device name rather than by address, so
//! every known address is mapped to a short name such as `salon`. Addresses
//! that are not in the table resolve to [`UNKNOWN_DEVICE`].

use std::collections::BTreeMap;

/// Name given to readings from addresses that are not in the table.
pub const UNKNOWN_DEVICE: &str = "unknown";

/// A single `ADDRESS=NAME` entry, as given on the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceEntry {
    /// Canonical (upper-case) address, e.g. `A4:C1:38:5F:A4:E6`
    pub address: String,
    /// Symbolic name, e.g. `salon`
    pub name: String,
}

/// Parse a device entry from a string in the format `ADDRESS=NAME`.
///
/// ```
/// use home_metrics::devices::parse_device;
///
/// let entry = parse_device("a4:c1:38:5f:a4:e6=salon").unwrap();
/// assert_eq!(entry.address, "A4:C1:38:5F:A4:E6");
/// assert_eq!(entry.name, "salon");
/// ```
pub fn parse_device(src: &str) -> Result<DeviceEntry, String> {
    let (address, name) = src
        .split_once('=')
        .ok_or_else(|| "invalid device: expected format ADDRESS=NAME".to_string())?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("invalid device '{src}': name is empty"));
    }
    Ok(DeviceEntry {
        address: address.trim().to_uppercase(),
        name: name.to_string(),
    })
}

/// Address to name table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceNames {
    names: BTreeMap<String, String>,
}

impl DeviceNames {
    /// Build a table from `(address, name)` pairs. Addresses are upper-cased.
    pub fn new<I, A, N>(entries: I) -> Self
    where
        I: IntoIterator<Item = (A, N)>,
        A: AsRef<str>,
        N: Into<String>,
    {
        let names = entries
            .into_iter()
            .map(|(address, name)| (address.as_ref().to_uppercase(), name.into()))
            .collect();
        Self { names }
    }

    /// Add or replace one entry.
    pub fn insert(&mut self, entry: DeviceEntry) {
        self.names.insert(entry.address.to_uppercase(), entry.name);
    }

    /// Resolve an address to its symbolic name. Exact match only.
    pub fn resolve(&self, address: &str) -> &str {
        self.names
            .get(address)
            .map(String::as_str)
            .unwrap_or(UNKNOWN_DEVICE)
    }

    /// Distinct configured names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.names.values().map(String::as_str).collect();
        names.sort_unstable();
        names.dedup();
        names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_table() -> DeviceNames {
        DeviceNames::new([("A4:C1:38:5F:A4:E6", "salon"), ("A4:C1:38:B8:1A:4C", "taller")])
    }

    #[test]
    fn resolves_known_addresses() {
        let devices = reference_table();
        assert_eq!(devices.resolve("A4:C1:38:5F:A4:E6"), "salon");
        assert_eq!(devices.resolve("A4:C1:38:B8:1A:4C"), "taller");
    }

    #[test]
    fn unknown_for_everything_else() {
        let devices = reference_table();
        assert_eq!(devices.resolve("A4:C1:38:00:00:00"), UNKNOWN_DEVICE);
        assert_eq!(devices.resolve(""), UNKNOWN_DEVICE);
        assert_eq!(devices.resolve("not an address"), UNKNOWN_DEVICE);
        assert_eq!(devices.resolve("A4:C1:38:5F:A4"), UNKNOWN_DEVICE);
        assert_eq!(devices.resolve("A4:C1:38:5F:A4:E6 "), UNKNOWN_DEVICE);
    }

    #[test]
    fn keys_are_normalized_to_upper_case() {
        let devices = DeviceNames::new([("a4:c1:38:5f:a4:e6", "salon")]);
        assert_eq!(devices.resolve("A4:C1:38:5F:A4:E6"), "salon");
    }

    #[test]
    fn insert_overrides_existing_entry() {
        let mut devices = reference_table();
        devices.insert(parse_device("A4:C1:38:B8:1A:4C=sotano").unwrap());
        assert_eq!(devices.resolve("A4:C1:38:B8:1A:4C"), "sotano");
        assert_eq!(devices.len(), 2);
    }

    #[test]
    fn names_are_distinct_and_sorted() {
        let devices = DeviceNames::new([
            ("11:11:11:11:11:11", "taller"),
            ("22:22:22:22:22:22", "salon"),
            ("33:33:33:33:33:33", "salon"),
        ]);
        assert_eq!(devices.names(), vec!["salon", "taller"]);
    }

    #[test]
    fn parse_device_rejects_bad_input() {
        assert!(parse_device("no-equals-sign").is_err());
        assert!(parse_device("A4:C1:38:5F:A4:E6=").is_err());
        assert!(parse_device("A4:C1:38:5F:A4:E6=  ").is_err());
    }

    #[test]
    fn parse_device_keeps_spaces_inside_name() {
        let entry = parse_device("A4:C1:38:5F:A4:E6=living room").unwrap();
        assert_eq!(entry.name, "living room");
    }
}
