//! Read cycle that turns transport bytes into response lines.
//!
//! [`Framer::receive_lines`] polls the transport in short slices until it
//! sees the `OK` sentinel or the line has been quiet for a fixed number of
//! consecutive polls. It knows nothing about commands; deciding whether the
//! collected lines form a valid transaction is the client's job.

use std::time::Duration;

use tracing::{debug, trace, warn};

use espat_core::error::Error;
use espat_core::transport::Transport;

use crate::protocol::{self, LineAssembler};

/// Per-poll read timeout.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(20);

/// Consecutive empty polls before a read cycle gives up.
pub const DEFAULT_MAX_IDLE_READS: u32 = 10;

/// Size of the receive buffer handed to the transport.
const READ_CHUNK: usize = 1024;

/// Polls a transport and splits the byte stream into lines.
#[derive(Debug)]
pub struct Framer {
    read_timeout: Duration,
    max_idle_reads: u32,
    /// Bytes received after an `OK` line in the same chunk, not yet scanned.
    pending: Vec<u8>,
}

impl Framer {
    pub fn new(read_timeout: Duration, max_idle_reads: u32) -> Self {
        Self {
            read_timeout,
            max_idle_reads,
            pending: Vec::new(),
        }
    }

    /// Number of received-but-unscanned bytes carried to the next cycle.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Drop any carried-over bytes; returns how many were dropped.
    pub fn discard_pending(&mut self) -> usize {
        let n = self.pending.len();
        self.pending.clear();
        n
    }

    /// Collect lines until `OK` or until the transport stays silent.
    ///
    /// The returned lines are right-trimmed and in arrival order. When the
    /// cycle stops on `OK`, that line is the last element. A silent cycle
    /// returns whatever was completed, which may be nothing. Transport
    /// errors count as empty polls.
    pub async fn receive_lines<T>(&mut self, transport: &mut T) -> Vec<String>
    where
        T: Transport + ?Sized,
    {
        let mut assembler = LineAssembler::new();
        let mut lines = Vec::new();

        let carried = std::mem::take(&mut self.pending);
        if self.scan(&mut assembler, &mut lines, &carried) {
            return lines;
        }

        let mut chunk = [0u8; READ_CHUNK];
        let mut idle_reads = 0;
        while idle_reads < self.max_idle_reads {
            match transport.receive(&mut chunk, self.read_timeout).await {
                Ok(n) if n > 0 => {
                    idle_reads = 0;
                    if self.scan(&mut assembler, &mut lines, &chunk[..n]) {
                        return lines;
                    }
                }
                Ok(_) | Err(Error::Timeout) => idle_reads += 1,
                Err(e) => {
                    warn!(error = %e, "receive failed, treating as no data");
                    idle_reads += 1;
                }
            }
        }

        debug!(
            lines = lines.len(),
            partial = assembler.buffered(),
            "read cycle ended without OK"
        );
        lines
    }

    /// Feed `bytes` through the assembler. Returns `true` once `OK` is seen,
    /// stashing the unscanned remainder for the next cycle.
    fn scan(&mut self, assembler: &mut LineAssembler, lines: &mut Vec<String>, bytes: &[u8]) -> bool {
        for (i, &byte) in bytes.iter().enumerate() {
            let Some(line) = assembler.push(byte) else {
                continue;
            };
            trace!(line = %line, "line");
            let done = protocol::is_ok_sentinel(&line);
            lines.push(line);
            if done {
                self.pending.extend_from_slice(&bytes[i + 1..]);
                return true;
            }
        }
        false
    }
}

impl Default for Framer {
    fn default() -> Self {
        Self::new(DEFAULT_READ_TIMEOUT, DEFAULT_MAX_IDLE_READS)
    }
}
