//! Line-level encode/decode for the ESP8266 AT protocol.
//!
//! Commands are ASCII text terminated by CR LF. The module echoes each
//! command line, prints zero or more response lines, and closes a successful
//! response with the line `OK`. Everything is CR LF terminated.
//!
//! ```text
//! → AT+CIPSTAMAC?\r\n
//! ← AT+CIPSTAMAC?\r\n
//! ← +CIPSTAMAC:"5c:cf:7f:12:34:56"\r\n
//! ← OK\r\n
//! ```

use bytes::{BufMut, BytesMut};

/// Carriage return.
pub const CR: u8 = 0x0D;

/// Line feed.
pub const LF: u8 = 0x0A;

/// Line terminator appended to every command.
pub const LINE_TERMINATOR: &[u8] = b"\r\n";

/// The status line that closes a successful response.
pub const OK_SENTINEL: &str = "OK";

/// Maximum length of a single line before the buffer is reset.
///
/// Module responses are well under 256 bytes per line; anything longer is
/// noise (wrong baud rate, boot ROM output at 74880 baud).
pub const MAX_LINE: usize = 8192;

/// Encode a command line into raw bytes ready for transmission.
///
/// # Example
///
/// ```
/// use espat_at::protocol::encode_command;
///
/// assert_eq!(encode_command("AT+GMR"), b"AT+GMR\r\n");
/// ```
pub fn encode_command(command: &str) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(command.len() + LINE_TERMINATOR.len());
    buf.put_slice(command.as_bytes());
    buf.put_slice(LINE_TERMINATOR);
    buf.to_vec()
}

/// Accumulates bytes into CR LF terminated lines.
///
/// A LF completes a line only when the byte buffered just before it is a
/// CR. A bare LF is dropped. Completed lines are right-trimmed, which also
/// removes the CR.
#[derive(Debug, Default)]
pub struct LineAssembler {
    buf: Vec<u8>,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self {
            buf: Vec::with_capacity(256),
        }
    }

    /// Feed one byte; returns the completed line when `byte` ends one.
    pub fn push(&mut self, byte: u8) -> Option<String> {
        if byte == LF {
            if self.buf.last() != Some(&CR) {
                return None;
            }
            let line = String::from_utf8_lossy(&self.buf).trim_end().to_string();
            self.buf.clear();
            return Some(line);
        }

        if self.buf.len() >= MAX_LINE {
            tracing::warn!(len = self.buf.len(), "line buffer overflow, resetting");
            self.buf.clear();
        }
        self.buf.push(byte);
        None
    }

    /// Number of bytes buffered for the current, unterminated line.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}

/// Returns `true` if `line` is the success sentinel.
pub fn is_ok_sentinel(line: &str) -> bool {
    line == OK_SENTINEL
}
