//! espat-core: Core traits, types, and error definitions for espat.
//!
//! This crate defines the link-agnostic pieces shared by the AT engine, the
//! serial transport, and the test harness.
//!
//! # Key types
//!
//! - [`Transport`] -- byte-level communication channel
//! - [`MacAddress`] -- six-octet hardware address
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod mac;
pub mod transport;

// Re-export key types at crate root for ergonomic `use espat_core::*`.
pub use error::{Error, Result};
pub use mac::{MacAddress, MAC_LEN};
pub use transport::Transport;
