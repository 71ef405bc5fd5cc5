//! espat-test-harness: Test utilities for espat.
//!
//! This crate provides [`MockTransport`] for deterministic unit testing of
//! the AT engine without a real module attached.

pub mod mock_serial;

pub use mock_serial::MockTransport;
