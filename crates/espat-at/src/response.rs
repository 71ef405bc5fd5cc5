//! Parsers for validated response payloads.
//!
//! Query responses put their data on `key:value` lines, with string values
//! usually wrapped in double quotes:
//!
//! ```text
//! +CIPSTAMAC:"5c:cf:7f:12:34:56"
//! AT version:1.2.0.0(Jul  1 2016 20:04:45)
//! ```
//!
//! Only the first colon separates key from value, so values may contain
//! colons themselves.

use espat_core::error::Result;
use espat_core::MacAddress;

/// Find the value for `key` in a payload.
///
/// A line matches when it contains a colon and the text before the first
/// colon, trimmed, equals `key` exactly (case-sensitive). Returns the
/// trimmed text after the colon for the first matching line. `None` means
/// no line matched, which is distinct from `Some("")`.
///
/// # Example
///
/// ```
/// use espat_at::response::lookup;
///
/// let payload = vec!["+CIPSTAMAC:\"5c:cf:7f:12:34:56\"".to_string()];
/// assert_eq!(lookup(&payload, "+CIPSTAMAC"), Some("\"5c:cf:7f:12:34:56\""));
/// assert_eq!(lookup(&payload, "+CIPAPMAC"), None);
/// ```
pub fn lookup<'a, S: AsRef<str>>(lines: &'a [S], key: &str) -> Option<&'a str> {
    lines.iter().find_map(|line| {
        let (k, v) = line.as_ref().split_once(':')?;
        (k.trim() == key).then(|| v.trim())
    })
}

/// Strip one pair of surrounding double quotes.
///
/// Values shorter than two characters, or not both starting and ending with
/// `"`, are returned unchanged.
pub fn unwrap_quotes(value: &str) -> &str {
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        &value[1..value.len() - 1]
    } else {
        value
    }
}

/// Parse a bare `xx:xx:xx:xx:xx:xx` MAC address.
pub fn parse_mac(text: &str) -> Result<MacAddress> {
    text.parse()
}

/// Firmware identification returned by `AT+GMR`.
///
/// Current firmware prints `key:value` lines; early 0.9.x images print a
/// single bare version number such as `0018000902`. Both are kept in
/// [`lines`](Self::lines) for display.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FirmwareInfo {
    /// AT command set version, e.g. `1.2.0.0(Jul  1 2016 20:04:45)`.
    pub at_version: Option<String>,
    /// SDK version, e.g. `1.5.4.1(39cb9a32)`.
    pub sdk_version: Option<String>,
    /// Build timestamp, e.g. `Dec 22 2016 10:48:55`.
    pub compile_time: Option<String>,
    /// The payload lines as received.
    pub lines: Vec<String>,
}

impl FirmwareInfo {
    pub fn from_payload(lines: Vec<String>) -> Self {
        let get = |key: &str| lookup(&lines, key).map(str::to_string);
        let at_version = get("AT version");
        let sdk_version = get("SDK version");
        let compile_time = get("compile time");
        FirmwareInfo {
            at_version,
            sdk_version,
            compile_time,
            lines,
        }
    }
}
