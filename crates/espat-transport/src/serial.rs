//! UART transport for USB-serial bridges (CP2102, CH340) and bare 3.3 V links.
//!
//! ESP8266 AT firmware ships at 115200 baud, 8N1, no flow control. Older
//! 0.9.x firmware images sometimes default to 9600 or 57600.
//!
//! # Example
//!
//! ```no_run
//! use espat_transport::SerialTransport;
//! use espat_core::transport::Transport;
//! use std::time::Duration;
//!
//! # async fn example() -> espat_core::Result<()> {
//! let mut transport = SerialTransport::open("/dev/ttyUSB0", 115_200).await?;
//!
//! transport.send(b"AT\r\n").await?;
//!
//! let mut buf = [0u8; 256];
//! let n = transport.receive(&mut buf, Duration::from_millis(20)).await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use espat_core::error::{Error, Result};
use espat_core::transport::Transport;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

/// Baud rate of stock ESP8266 AT firmware.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Serial port configuration.
///
/// Defaults match stock AT firmware: 115200 baud, 8 data bits, 1 stop bit,
/// no parity, no flow control.
#[derive(Debug, Clone)]
pub struct SerialConfig {
    /// Baud rate (e.g., 9600, 57600, 115200)
    pub baud_rate: u32,
    /// Number of data bits (typically 8)
    pub data_bits: DataBits,
    /// Number of stop bits (typically 1)
    pub stop_bits: StopBits,
    /// Parity checking (typically None)
    pub parity: Parity,
    /// Flow control (None unless the board wires up RTS/CTS)
    pub flow_control: FlowControl,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::Eight,
            stop_bits: StopBits::One,
            parity: Parity::None,
            flow_control: FlowControl::None,
        }
    }
}

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataBits {
    Seven,
    Eight,
}

impl From<DataBits> for tokio_serial::DataBits {
    fn from(bits: DataBits) -> Self {
        match bits {
            DataBits::Seven => tokio_serial::DataBits::Seven,
            DataBits::Eight => tokio_serial::DataBits::Eight,
        }
    }
}

/// Number of stop bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

impl From<StopBits> for tokio_serial::StopBits {
    fn from(bits: StopBits) -> Self {
        match bits {
            StopBits::One => tokio_serial::StopBits::One,
            StopBits::Two => tokio_serial::StopBits::Two,
        }
    }
}

/// Parity checking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl From<Parity> for tokio_serial::Parity {
    fn from(parity: Parity) -> Self {
        match parity {
            Parity::None => tokio_serial::Parity::None,
            Parity::Odd => tokio_serial::Parity::Odd,
            Parity::Even => tokio_serial::Parity::Even,
        }
    }
}

/// Flow control mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowControl {
    None,
    Software,
    Hardware,
}

impl From<FlowControl> for tokio_serial::FlowControl {
    fn from(flow: FlowControl) -> Self {
        match flow {
            FlowControl::None => tokio_serial::FlowControl::None,
            FlowControl::Software => tokio_serial::FlowControl::Software,
            FlowControl::Hardware => tokio_serial::FlowControl::Hardware,
        }
    }
}

/// A UART link to an AT-command module.
///
/// The stream is dropped on [`close`](Transport::close); after that every
/// call fails with [`Error::NotConnected`].
pub struct SerialTransport {
    stream: Option<SerialStream>,
    device: String,
}

impl SerialTransport {
    /// Open `device` at `baud_rate`, 8N1 without flow control.
    pub async fn open(device: &str, baud_rate: u32) -> Result<Self> {
        let config = SerialConfig {
            baud_rate,
            ..Default::default()
        };
        Self::open_with_config(device, config).await
    }

    /// Open `device` with explicit line settings.
    pub async fn open_with_config(device: &str, config: SerialConfig) -> Result<Self> {
        let stream = tokio_serial::new(device, config.baud_rate)
            .data_bits(config.data_bits.into())
            .stop_bits(config.stop_bits.into())
            .parity(config.parity.into())
            .flow_control(config.flow_control.into())
            .open_native_async()
            .map_err(|e| Error::Transport(format!("cannot open {device}: {e}")))?;

        tracing::debug!(
            device,
            baud = config.baud_rate,
            line = ?(config.data_bits, config.parity, config.stop_bits),
            flow = ?config.flow_control,
            "uart ready"
        );

        Ok(Self {
            stream: Some(stream),
            device: device.to_owned(),
        })
    }

    /// Device path this transport was opened on.
    pub fn device(&self) -> &str {
        &self.device
    }
}

/// Map an I/O error to the transport error space.
fn classify(e: std::io::Error) -> Error {
    match e.kind() {
        std::io::ErrorKind::BrokenPipe | std::io::ErrorKind::NotConnected => Error::ConnectionLost,
        _ => Error::Io(e),
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;
        tracing::trace!(device = %self.device, tx = ?String::from_utf8_lossy(data));

        stream.write_all(data).await.map_err(classify)?;
        stream.flush().await.map_err(classify)
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        let stream = self.stream.as_mut().ok_or(Error::NotConnected)?;

        let n = tokio::time::timeout(timeout, stream.read(buf))
            .await
            .map_err(|_| Error::Timeout)?
            .map_err(classify)?;
        tracing::trace!(device = %self.device, rx = ?String::from_utf8_lossy(&buf[..n]));
        Ok(n)
    }

    async fn close(&mut self) -> Result<()> {
        let Some(mut stream) = self.stream.take() else {
            return Ok(());
        };
        // Pending output is best effort; the handle is released regardless.
        if let Err(e) = stream.flush().await {
            tracing::warn!(device = %self.device, error = %e, "unsent bytes dropped at close");
        }
        tracing::debug!(device = %self.device, "uart released");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.stream.is_some()
    }
}
