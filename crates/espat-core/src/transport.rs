//! Transport trait for module communication.
//!
//! The [`Transport`] trait abstracts over the physical link to the Wi-Fi
//! module. The serial implementation lives in `espat-transport`; a scripted
//! in-memory implementation for tests lives in `espat-test-harness`.
//!
//! The AT engine in `espat-at` operates on a `Transport` rather than directly
//! on a serial port, so the whole protocol layer can be exercised
//! deterministically without hardware.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::{Error, Result};

/// Size of the scratch buffer used by [`Transport::flush_input`].
const FLUSH_CHUNK: usize = 256;

/// Asynchronous byte-level transport to a module.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the module.
    ///
    /// Implementations should block until all bytes have been written to
    /// the underlying transport.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Receive bytes from the module into the provided buffer.
    ///
    /// Returns the number of bytes actually read. Will wait up to `timeout`
    /// for data to arrive; returns [`Error::Timeout`] if no data is received
    /// within the deadline.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Discard inbound bytes for at most `timeout`.
    ///
    /// The drain stops early once a receive yields nothing before the
    /// deadline. A module that keeps talking is cut off when the deadline
    /// passes. Returns the number of bytes discarded. Errors other than a
    /// timeout end the drain early and are propagated.
    async fn flush_input(&mut self, timeout: Duration) -> Result<usize> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut scratch = [0u8; FLUSH_CHUNK];
        let mut discarded = 0;
        loop {
            let now = tokio::time::Instant::now();
            if now >= deadline {
                break;
            }
            let remaining = deadline - now;

            match self.receive(&mut scratch, remaining).await {
                Ok(0) | Err(Error::Timeout) => break,
                Ok(n) => {
                    tracing::trace!(bytes = n, data = ?&scratch[..n], "discarding stale input");
                    discarded += n;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(discarded)
    }

    /// Close the transport connection.
    ///
    /// After calling `close()`, subsequent `send()` and `receive()` calls
    /// should return [`Error::NotConnected`].
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    /// Plays back fixed chunks, then times out forever.
    struct Chunks(VecDeque<Vec<u8>>);

    #[async_trait]
    impl Transport for Chunks {
        async fn send(&mut self, _data: &[u8]) -> Result<()> {
            Ok(())
        }

        async fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
            match self.0.pop_front() {
                Some(chunk) => {
                    buf[..chunk.len()].copy_from_slice(&chunk);
                    Ok(chunk.len())
                }
                None => Err(Error::Timeout),
            }
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }

        fn is_connected(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn flush_input_drains_until_quiet() {
        let mut t = Chunks(VecDeque::from(vec![b"stale".to_vec(), b"\r\n".to_vec()]));
        let n = t.flush_input(Duration::from_millis(100)).await.unwrap();
        assert_eq!(n, 7);
        assert!(t.0.is_empty());
    }

    /// Sends one byte every `interval` for as long as it is polled.
    struct Chatter {
        interval: Duration,
        polls: usize,
    }

    #[async_trait]
    impl Transport for Chatter {
        async fn send(&mut self, _data: &[u8]) -> Result<()> {
            Ok(())
        }

        async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize> {
            self.polls += 1;
            if timeout < self.interval {
                tokio::time::sleep(timeout).await;
                return Err(Error::Timeout);
            }
            tokio::time::sleep(self.interval).await;
            buf[0] = b'.';
            Ok(1)
        }

        async fn close(&mut self) -> Result<()> {
            Ok(())
        }

        fn is_connected(&self) -> bool {
            true
        }
    }

    #[tokio::test(start_paused = true)]
    async fn flush_input_stops_at_deadline_on_chatty_line() {
        let mut t = Chatter {
            interval: Duration::from_millis(50),
            polls: 0,
        };
        let start = tokio::time::Instant::now();
        let n = t.flush_input(Duration::from_millis(100)).await.unwrap();
        let elapsed = start.elapsed();

        assert_eq!(n, 2);
        assert_eq!(t.polls, 2);
        assert!(elapsed <= Duration::from_millis(100), "flush took {elapsed:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn flush_input_gives_receive_the_remaining_budget() {
        let mut t = Chatter {
            interval: Duration::from_millis(30),
            polls: 0,
        };
        let start = tokio::time::Instant::now();
        // Reads at 30, 60 and 90 ms; the fourth poll only has 10 ms left.
        let n = t.flush_input(Duration::from_millis(100)).await.unwrap();

        assert_eq!(n, 3);
        assert_eq!(t.polls, 4);
        assert_eq!(start.elapsed(), Duration::from_millis(100));
    }

    #[tokio::test]
    async fn flush_input_on_quiet_line_is_zero() {
        let mut t = Chunks(VecDeque::new());
        let n = t.flush_input(Duration::from_millis(100)).await.unwrap();
        assert_eq!(n, 0);
    }
}
