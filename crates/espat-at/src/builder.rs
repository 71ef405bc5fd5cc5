//! AtClientBuilder -- fluent builder for constructing [`AtClient`] instances.
//!
//! Separates configuration from construction so that callers can set up
//! serial port parameters, retry policy, and timeout values before the port
//! is opened.
//!
//! # Example
//!
//! ```no_run
//! use espat_at::builder::AtClientBuilder;
//! use std::time::Duration;
//!
//! # async fn example() -> espat_core::Result<()> {
//! let mut client = AtClientBuilder::new()
//!     .serial_port("/dev/ttyUSB0")
//!     .baud_rate(115_200)
//!     .max_retries(5)
//!     .build()
//!     .await?;
//! let mac = client.station_mac().await;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use espat_core::error::{Error, Result};
use espat_core::transport::Transport;
use espat_transport::{SerialConfig, SerialTransport};

use crate::client::{AtClient, AtConfig};

/// Fluent builder for [`AtClient`].
#[derive(Debug, Clone, Default)]
pub struct AtClientBuilder {
    serial_port: Option<String>,
    serial: SerialConfig,
    config: AtConfig,
}

impl AtClientBuilder {
    /// Create a builder with 115200 8N1 serial settings and default timing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the serial port path (e.g. `/dev/ttyUSB0` or `COM3`).
    pub fn serial_port(mut self, port: &str) -> Self {
        self.serial_port = Some(port.to_string());
        self
    }

    /// Override the baud rate (default: 115200).
    pub fn baud_rate(mut self, baud: u32) -> Self {
        self.serial.baud_rate = baud;
        self
    }

    /// Replace the full serial line configuration.
    pub fn serial_config(mut self, serial: SerialConfig) -> Self {
        self.serial = serial;
        self
    }

    /// Set the maximum number of attempts per command (default: 3).
    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    /// Set the timeout for a single transport poll (default: 20ms).
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    /// Set how many consecutive empty polls end a read cycle (default: 10).
    pub fn max_idle_reads(mut self, n: u32) -> Self {
        self.config.max_idle_reads = n;
        self
    }

    /// Set the quiet period used when draining stale input (default: 100ms).
    pub fn flush_timeout(mut self, timeout: Duration) -> Self {
        self.config.flush_timeout = timeout;
        self
    }

    /// Build an [`AtClient`] with a caller-provided transport.
    ///
    /// This is the entry point for testing (pass a `MockTransport` from
    /// `espat-test-harness`).
    pub fn build_with_transport<T: Transport>(self, transport: T) -> Result<AtClient<T>> {
        if self.config.max_idle_reads == 0 {
            return Err(Error::InvalidParameter(
                "max_idle_reads must be at least 1".into(),
            ));
        }
        if self.config.read_timeout.is_zero() {
            return Err(Error::InvalidParameter(
                "read_timeout must be non-zero".into(),
            ));
        }
        Ok(AtClient::new(transport, self.config))
    }

    /// Build an [`AtClient`] over a serial port.
    ///
    /// Requires that [`serial_port()`](Self::serial_port) has been called.
    pub async fn build(self) -> Result<AtClient<SerialTransport>> {
        let port = self
            .serial_port
            .clone()
            .ok_or_else(|| Error::InvalidParameter("serial_port is required for build()".into()))?;

        let transport = SerialTransport::open_with_config(&port, self.serial.clone()).await?;
        self.build_with_transport(transport)
    }
}
