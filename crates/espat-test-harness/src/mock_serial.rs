//! Mock transport for deterministic testing of the AT engine.
//!
//! [`MockTransport`] implements the [`Transport`] trait by playing back
//! scripted bytes. Each `send()` is matched against the next pre-loaded
//! expectation and the paired response is appended to an inbound byte
//! queue, which `receive()` then hands out. Bytes can also be injected
//! without a request to simulate stale data left on the line.
//!
//! # Example
//!
//! ```
//! use espat_test_harness::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! // When the engine sends this command, the module echoes it and answers.
//! mock.expect(b"AT+GMR\r\n", b"AT+GMR\r\n0018000902\r\nOK\r\n");
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::time::Duration;

use espat_core::error::{Error, Result};
use espat_core::transport::Transport;

/// A pre-loaded request/response pair for the mock transport.
#[derive(Debug, Clone)]
struct Expectation {
    /// The exact bytes we expect to be sent.
    request: Vec<u8>,
    /// The bytes queued for reception once the request arrives.
    response: Vec<u8>,
}

/// A scripted [`Transport`] for testing without hardware.
///
/// Expectations are consumed in order. A `send()` that does not match the
/// next expectation, or arrives after the queue is exhausted, returns an
/// error. `receive()` returns [`Error::Timeout`] whenever the inbound queue
/// is empty; it never actually sleeps.
#[derive(Debug)]
pub struct MockTransport {
    /// Ordered queue of expected request/response pairs.
    expectations: VecDeque<Expectation>,
    /// Bytes waiting to be returned by `receive()`.
    inbound: VecDeque<u8>,
    /// Upper bound on bytes returned per `receive()` call.
    chunk_size: Option<usize>,
    /// Whether the transport is "connected".
    connected: bool,
    /// Log of all bytes sent through this transport.
    sent_log: Vec<Vec<u8>>,
    /// Total `receive()` calls, including ones that timed out.
    receive_calls: usize,
    /// `receive()` calls that found nothing to return.
    empty_receives: usize,
    /// Timeout passed to each `receive()` call, in call order.
    receive_timeouts: Vec<Duration>,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            expectations: VecDeque::new(),
            inbound: VecDeque::new(),
            chunk_size: None,
            connected: true,
            sent_log: Vec::new(),
            receive_calls: 0,
            empty_receives: 0,
            receive_timeouts: Vec::new(),
        }
    }

    /// Add an expected request/response pair.
    ///
    /// When `send()` is called with data matching `request`, `response` is
    /// appended to the inbound queue behind any bytes already waiting.
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        self.expectations.push_back(Expectation {
            request: request.to_vec(),
            response: response.to_vec(),
        });
    }

    /// Queue bytes for reception without waiting for a request.
    pub fn inject(&mut self, data: &[u8]) {
        self.inbound.extend(data.iter().copied());
    }

    /// Limit how many bytes a single `receive()` may return.
    ///
    /// Useful for checking that line assembly survives fragmented reads.
    pub fn set_chunk_size(&mut self, size: usize) {
        self.chunk_size = Some(size.max(1));
    }

    /// Return a reference to all data that has been sent through this transport.
    ///
    /// Each element is the byte slice from one `send()` call.
    pub fn sent_data(&self) -> &[Vec<u8>] {
        &self.sent_log
    }

    /// Return the number of expectations that have not yet been consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.expectations.len()
    }

    /// Return the number of inbound bytes not yet received.
    pub fn pending_inbound(&self) -> usize {
        self.inbound.len()
    }

    /// Return the total number of `receive()` calls.
    pub fn receive_calls(&self) -> usize {
        self.receive_calls
    }

    /// Return the number of `receive()` calls that timed out.
    pub fn empty_receives(&self) -> usize {
        self.empty_receives
    }

    /// Return the timeout each `receive()` call was given, oldest first.
    pub fn receive_timeouts(&self) -> &[Duration] {
        &self.receive_timeouts
    }

    /// Set the connected state of the mock transport.
    ///
    /// When set to `false`, subsequent `send()` and `receive()` calls will
    /// return [`Error::NotConnected`].
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        self.sent_log.push(data.to_vec());

        match self.expectations.pop_front() {
            Some(expectation) if data == expectation.request.as_slice() => {
                self.inbound.extend(expectation.response);
                Ok(())
            }
            Some(expectation) => Err(Error::Transport(format!(
                "unexpected send data: expected {:?}, got {:?}",
                String::from_utf8_lossy(&expectation.request),
                String::from_utf8_lossy(data)
            ))),
            None => Err(Error::Transport(
                "no more expectations in mock transport".into(),
            )),
        }
    }

    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        self.receive_calls += 1;
        self.receive_timeouts.push(timeout);

        if self.inbound.is_empty() || buf.is_empty() {
            self.empty_receives += 1;
            return Err(Error::Timeout);
        }

        let limit = self.chunk_size.unwrap_or(usize::MAX);
        let n = self.inbound.len().min(buf.len()).min(limit);
        for (slot, byte) in buf.iter_mut().zip(self.inbound.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        self.inbound.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
