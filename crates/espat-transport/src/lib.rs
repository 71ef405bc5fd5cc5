//! Transport implementations for espat.
//!
//! This crate provides the serial implementation of the
//! [`Transport`](espat_core::Transport) trait from `espat-core`. The same
//! code path serves Linux (`/dev/ttyUSB0`), macOS (`/dev/cu.usbserial-*`)
//! and Windows (`COM3`); `tokio-serial` hides the platform line discipline.

pub mod serial;

pub use serial::{
    DataBits, FlowControl, Parity, SerialConfig, SerialTransport, StopBits, DEFAULT_BAUD_RATE,
};
