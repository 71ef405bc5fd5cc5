//! AT-command transaction engine for ESP8266-class Wi-Fi modules.
//!
//! One command at a time is sent over a [`Transport`](espat_core::Transport),
//! its response lines are collected until `OK`, and the exchange is checked
//! for the module's echo before the payload is handed back.
//!
//! # Architecture
//!
//! - [`protocol`] — CR LF line encoding and byte-level line assembly
//! - [`framer`] — read cycle: polling, idle budget, `OK` stop sentinel
//! - [`client`] — echo/`OK` validation, retry with input flush, queries
//! - [`response`] — `key:value` lookup, quote stripping, MAC parsing
//! - [`commands`] — the fixed ESP8266 query commands
//! - [`builder`] — fluent construction over a serial port or any transport

pub mod builder;
pub mod client;
pub mod commands;
pub mod framer;
pub mod protocol;
pub mod response;

pub use builder::AtClientBuilder;
pub use client::{AtClient, AtConfig, Exchange};
pub use framer::Framer;
pub use response::{lookup, parse_mac, unwrap_quotes, FirmwareInfo};
