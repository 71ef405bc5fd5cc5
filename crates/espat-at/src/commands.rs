//! ESP8266 AT commands issued by this crate.
//!
//! Only read-only queries are covered. Each MAC query pairs the command
//! text with the key its response line is tagged with.

/// Attention. Answers `OK` when the module is alive and in AT mode.
pub const CMD_PROBE: &str = "AT";

/// Firmware version information.
pub const CMD_VERSION: &str = "AT+GMR";

/// A query whose response carries a MAC address under a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacQuery {
    /// Command text, without the line terminator.
    pub command: &'static str,
    /// Key of the response line carrying the address.
    pub key: &'static str,
}

/// Station (client) interface MAC address.
pub const STATION_MAC: MacQuery = MacQuery {
    command: "AT+CIPSTAMAC?",
    key: "+CIPSTAMAC",
};

/// Soft-AP interface MAC address.
pub const AP_MAC: MacQuery = MacQuery {
    command: "AT+CIPAPMAC?",
    key: "+CIPAPMAC",
};
