//! IEEE 802 MAC address as reported by the module.
//!
//! The module prints addresses as six colon-separated hex octets, usually
//! lower-case and wrapped in quotes (`"5c:cf:7f:12:34:56"`). Quote handling
//! belongs to the response parser; this type only deals with the bare text.
//!
//! # Example
//!
//! ```
//! use espat_core::MacAddress;
//!
//! let mac: MacAddress = "5c:cf:7f:12:34:56".parse().unwrap();
//! assert_eq!(mac.octets(), [0x5c, 0xcf, 0x7f, 0x12, 0x34, 0x56]);
//! assert_eq!(mac.to_string(), "5C:CF:7F:12:34:56");
//! ```

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Number of octets in a MAC address.
pub const MAC_LEN: usize = 6;

/// A 48-bit MAC address. The default value is all zeros.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddress([u8; MAC_LEN]);

impl MacAddress {
    /// The all-zero address.
    pub const ZERO: MacAddress = MacAddress([0; MAC_LEN]);

    /// Construct from raw octets, most significant first.
    pub const fn new(octets: [u8; MAC_LEN]) -> Self {
        MacAddress(octets)
    }

    /// Returns the octets, most significant first.
    pub fn octets(&self) -> [u8; MAC_LEN] {
        self.0
    }

    /// Returns `true` for the all-zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0; MAC_LEN]
    }
}

impl From<[u8; MAC_LEN]> for MacAddress {
    fn from(octets: [u8; MAC_LEN]) -> Self {
        MacAddress(octets)
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl FromStr for MacAddress {
    type Err = Error;

    /// Parse `xx:xx:xx:xx:xx:xx`, exactly two hex digits per octet.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || Error::InvalidMac(s.to_string());

        let mut octets = [0u8; MAC_LEN];
        let mut fields = s.split(':');
        for octet in octets.iter_mut() {
            let field = fields.next().ok_or_else(invalid)?;
            if field.len() != 2 || !field.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(invalid());
            }
            *octet = u8::from_str_radix(field, 16).map_err(|_| invalid())?;
        }
        if fields.next().is_some() {
            return Err(invalid());
        }
        Ok(MacAddress(octets))
    }
}
