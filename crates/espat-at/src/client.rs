//! AT command engine.
//!
//! [`AtClient`] owns the transport and runs one command at a time as a
//! request/response transaction:
//!
//! 1. send the command text followed by CR LF,
//! 2. collect lines with the [`Framer`] until `OK` or silence,
//! 3. accept the exchange only if the first line is the module's echo of
//!    the exact command and the last line is `OK`.
//!
//! The echo doubles as a synchronization marker: leftover bytes from an
//! earlier exchange show up ahead of it and fail validation. After any
//! failed attempt the client drains the input and tries again, up to the
//! configured retry limit.

use std::time::Duration;

use tracing::{debug, warn};

use espat_core::error::{Error, Result};
use espat_core::transport::Transport;
use espat_core::MacAddress;

use crate::commands::{self, MacQuery};
use crate::framer::{Framer, DEFAULT_MAX_IDLE_READS, DEFAULT_READ_TIMEOUT};
use crate::protocol;
use crate::response::{self, FirmwareInfo};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Default input drain time between attempts.
pub const DEFAULT_FLUSH_TIMEOUT: Duration = Duration::from_millis(100);

/// Default number of attempts per command.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Timing and retry policy for the AT engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtConfig {
    /// Timeout for a single transport poll.
    pub read_timeout: Duration,
    /// Consecutive empty polls that end a read cycle.
    pub max_idle_reads: u32,
    /// How long the line must stay quiet when draining stale input.
    pub flush_timeout: Duration,
    /// Attempts per command made by [`AtClient::execute`].
    pub max_retries: u32,
}

impl Default for AtConfig {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_idle_reads: DEFAULT_MAX_IDLE_READS,
            flush_timeout: DEFAULT_FLUSH_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

/// Outcome of running a command.
///
/// When `ok` is `true`, `lines` is the payload: the response with the echo
/// and the `OK` line removed. When `ok` is `false`, `lines` is whatever the
/// last read cycle collected, untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub ok: bool,
    pub lines: Vec<String>,
    /// Attempts made, including the successful one.
    pub attempts: u32,
}

impl Exchange {
    /// Judge a collected response against the command that was sent.
    pub fn validate(command: &str, mut lines: Vec<String>) -> Self {
        let ok = lines.len() >= 2
            && lines.first().is_some_and(|first| first == command)
            && lines.last().is_some_and(|last| protocol::is_ok_sentinel(last));
        if ok {
            lines.pop();
            lines.remove(0);
        }
        Exchange {
            ok,
            lines,
            attempts: 1,
        }
    }

    /// The payload, if the exchange succeeded.
    pub fn payload(&self) -> Option<&[String]> {
        self.ok.then_some(self.lines.as_slice())
    }

    /// Convert to a `Result`, naming `command` in the failure.
    pub fn into_payload(self, command: &str) -> Result<Vec<String>> {
        if self.ok {
            Ok(self.lines)
        } else {
            Err(Error::CommandFailed {
                command: command.to_string(),
                attempts: self.attempts,
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Sequential AT command client over an exclusively owned transport.
pub struct AtClient<T: Transport> {
    transport: T,
    framer: Framer,
    config: AtConfig,
}

impl<T: Transport> AtClient<T> {
    pub fn new(transport: T, config: AtConfig) -> Self {
        let framer = Framer::new(config.read_timeout, config.max_idle_reads);
        Self {
            transport,
            framer,
            config,
        }
    }

    pub fn config(&self) -> &AtConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the client and hand back the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Write `command` followed by CR LF.
    ///
    /// A failed write is logged and otherwise ignored; the read that follows
    /// will come back empty and the exchange fails validation.
    pub async fn send(&mut self, command: &str) {
        let bytes = protocol::encode_command(command);
        if let Err(e) = self.transport.send(&bytes).await {
            warn!(command, error = %e, "send failed, treating as nothing written");
        }
    }

    /// Run `command` once, without retry.
    pub async fn execute_once(&mut self, command: &str) -> Exchange {
        self.send(command).await;
        let lines = self.framer.receive_lines(&mut self.transport).await;
        Exchange::validate(command, lines)
    }

    /// Run `command` with the configured retry limit.
    pub async fn execute(&mut self, command: &str) -> Exchange {
        self.execute_with_retries(command, self.config.max_retries)
            .await
    }

    /// Run `command`, making at most `max_retries` attempts.
    ///
    /// Returns on the first valid exchange. Each failed attempt is followed
    /// by an input flush. If every attempt fails, the last failure is
    /// returned; with `max_retries == 0` nothing is sent and the result is
    /// an empty failure.
    pub async fn execute_with_retries(&mut self, command: &str, max_retries: u32) -> Exchange {
        let mut last = Exchange {
            ok: false,
            lines: Vec::new(),
            attempts: 0,
        };

        for attempt in 1..=max_retries {
            let mut exchange = self.execute_once(command).await;
            exchange.attempts = attempt;
            if exchange.ok {
                if attempt > 1 {
                    debug!(command, attempt, "AT command succeeded after retry");
                }
                return exchange;
            }

            debug!(
                command,
                attempt,
                max_retries,
                lines = ?exchange.lines,
                "AT command failed validation, flushing input"
            );
            self.flush_input().await;
            last = exchange;
        }

        last
    }

    /// Like [`execute`](Self::execute), but failure is an error.
    pub async fn execute_checked(&mut self, command: &str) -> Result<Vec<String>> {
        self.execute(command).await.into_payload(command)
    }

    /// Discard carried-over bytes, then drain incoming bytes for at most
    /// `flush_timeout`.
    pub async fn flush_input(&mut self) {
        let carried = self.framer.discard_pending();
        match self.transport.flush_input(self.config.flush_timeout).await {
            Ok(n) => {
                if carried + n > 0 {
                    debug!(bytes = carried + n, "discarded stale input");
                }
            }
            Err(e) => warn!(error = %e, "input flush failed"),
        }
    }

    /// Check that the module answers `AT` with a valid exchange.
    pub async fn probe(&mut self) -> Result<()> {
        self.execute_checked(commands::CMD_PROBE).await.map(|_| ())
    }

    /// Query firmware version with `AT+GMR`.
    pub async fn firmware_version(&mut self) -> Result<FirmwareInfo> {
        let payload = self.execute_checked(commands::CMD_VERSION).await?;
        Ok(FirmwareInfo::from_payload(payload))
    }

    /// Run `command` and parse the MAC address stored under `key`.
    ///
    /// Fails with [`Error::CommandFailed`] if no valid exchange was
    /// obtained, [`Error::KeyNotFound`] if the payload lacks `key`, or
    /// [`Error::InvalidMac`] if the value does not parse.
    pub async fn try_get_mac(&mut self, command: &str, key: &str) -> Result<MacAddress> {
        let payload = self.execute_checked(command).await?;
        let value =
            response::lookup(&payload, key).ok_or_else(|| Error::KeyNotFound(key.to_string()))?;
        response::parse_mac(response::unwrap_quotes(value))
    }

    /// Like [`try_get_mac`](Self::try_get_mac), returning the all-zero
    /// address on any failure.
    pub async fn get_mac(&mut self, command: &str, key: &str) -> MacAddress {
        match self.try_get_mac(command, key).await {
            Ok(mac) => mac,
            Err(e) => {
                debug!(command, key, error = %e, "MAC query failed, using zero address");
                MacAddress::ZERO
            }
        }
    }

    async fn query_mac(&mut self, query: MacQuery) -> Result<MacAddress> {
        self.try_get_mac(query.command, query.key).await
    }

    /// Station interface MAC address.
    pub async fn try_station_mac(&mut self) -> Result<MacAddress> {
        self.query_mac(commands::STATION_MAC).await
    }

    /// Soft-AP interface MAC address.
    pub async fn try_ap_mac(&mut self) -> Result<MacAddress> {
        self.query_mac(commands::AP_MAC).await
    }

    /// Station interface MAC address, zero on failure.
    pub async fn station_mac(&mut self) -> MacAddress {
        let q = commands::STATION_MAC;
        self.get_mac(q.command, q.key).await
    }

    /// Soft-AP interface MAC address, zero on failure.
    pub async fn ap_mac(&mut self) -> MacAddress {
        let q = commands::AP_MAC;
        self.get_mac(q.command, q.key).await
    }

    /// Close the underlying transport.
    pub async fn close(&mut self) -> Result<()> {
        self.transport.close().await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use espat_test_harness::MockTransport;

    fn lines(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn make_client(mock: MockTransport) -> AtClient<MockTransport> {
        AtClient::new(mock, AtConfig::default())
    }

    // =======================================================================
    // Exchange::validate
    // =======================================================================

    #[test]
    fn validate_strips_echo_and_ok() {
        let ex = Exchange::validate("AT+GMR", lines(&["AT+GMR", "0018000902", "OK"]));
        assert!(ex.ok);
        assert_eq!(ex.lines, vec!["0018000902"]);
        assert_eq!(ex.payload(), Some(&["0018000902".to_string()][..]));
    }

    #[test]
    fn validate_echo_and_ok_only() {
        let ex = Exchange::validate("AT", lines(&["AT", "OK"]));
        assert!(ex.ok);
        assert!(ex.lines.is_empty());
    }

    #[test]
    fn validate_rejects_single_ok() {
        let ex = Exchange::validate("OK", lines(&["OK"]));
        assert!(!ex.ok);
        assert_eq!(ex.lines, vec!["OK"]);
    }

    #[test]
    fn validate_rejects_wrong_echo() {
        let ex = Exchange::validate("AT+GMR", lines(&["busy p...", "AT+GMR", "OK"]));
        assert!(!ex.ok);
        assert_eq!(ex.lines.len(), 3);
        assert_eq!(ex.payload(), None);
    }

    #[test]
    fn validate_rejects_missing_ok() {
        let ex = Exchange::validate("AT+FOO", lines(&["AT+FOO", "ERROR"]));
        assert!(!ex.ok);
        assert_eq!(ex.lines, vec!["AT+FOO", "ERROR"]);
    }

    #[test]
    fn validate_rejects_empty() {
        let ex = Exchange::validate("AT", Vec::new());
        assert!(!ex.ok);
    }

    #[test]
    fn validate_echo_is_case_sensitive() {
        let ex = Exchange::validate("AT+GMR", lines(&["at+gmr", "OK"]));
        assert!(!ex.ok);
    }

    #[test]
    fn into_payload_failure_names_command() {
        let ex = Exchange {
            ok: false,
            lines: Vec::new(),
            attempts: 3,
        };
        let err = ex.into_payload("AT+GMR").unwrap_err();
        assert!(matches!(
            err,
            Error::CommandFailed { ref command, attempts: 3 } if command == "AT+GMR"
        ));
    }

    // =======================================================================
    // send / execute_once
    // =======================================================================

    #[tokio::test]
    async fn send_appends_terminator() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT+GMR\r\n", b"");
        let mut client = make_client(mock);

        client.send("AT+GMR").await;
        assert_eq!(client.transport().sent_data(), &[b"AT+GMR\r\n".to_vec()]);
    }

    #[tokio::test]
    async fn send_failure_is_not_fatal() {
        let mut client = make_client(MockTransport::new());
        client.send("AT").await;
        assert_eq!(client.transport().sent_data().len(), 1);
    }

    #[tokio::test]
    async fn execute_once_success() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT+GMR\r\n", b"AT+GMR\r\n0018000902\r\nOK\r\n");
        let mut client = make_client(mock);

        let ex = client.execute_once("AT+GMR").await;
        assert!(ex.ok);
        assert_eq!(ex.lines, vec!["0018000902"]);
    }

    #[tokio::test]
    async fn execute_once_error_status() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT+FOO\r\n", b"AT+FOO\r\nERROR\r\n");
        let mut client = make_client(mock);

        let ex = client.execute_once("AT+FOO").await;
        assert!(!ex.ok);
        assert_eq!(ex.lines, vec!["AT+FOO", "ERROR"]);
    }

    // =======================================================================
    // execute / retries
    // =======================================================================

    #[tokio::test]
    async fn execute_first_attempt_no_flush() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT\r\n", b"AT\r\nOK\r\n");
        let mut client = make_client(mock);

        let ex = client.execute("AT").await;
        assert!(ex.ok);
        assert_eq!(ex.attempts, 1);
        assert_eq!(client.transport().sent_data().len(), 1);
    }

    #[tokio::test]
    async fn execute_stops_at_retry_limit() {
        let mut mock = MockTransport::new();
        for _ in 0..3 {
            mock.expect(b"AT\r\n", b"AT\r\nERROR\r\n");
        }
        // A fourth expectation must never be consumed.
        mock.expect(b"AT\r\n", b"AT\r\nOK\r\n");
        let mut client = make_client(mock);

        let ex = client.execute("AT").await;
        assert!(!ex.ok);
        assert_eq!(ex.attempts, 3);
        assert_eq!(ex.lines, vec!["AT", "ERROR"]);
        assert_eq!(client.transport().sent_data().len(), 3);
        assert_eq!(client.transport().remaining_expectations(), 1);
    }

    #[tokio::test]
    async fn execute_with_zero_retries_sends_nothing() {
        let mut client = make_client(MockTransport::new());

        let ex = client.execute_with_retries("AT", 0).await;
        assert!(!ex.ok);
        assert_eq!(ex.attempts, 0);
        assert!(ex.lines.is_empty());
        assert!(client.transport().sent_data().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn execute_recovers_after_stale_line() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT+GMR\r\n", b"WIFI GOT IP\r\n");
        mock.expect(b"AT+GMR\r\n", b"AT+GMR\r\n0018000902\r\nOK\r\n");
        let mut client = make_client(mock);

        let ex = client.execute_with_retries("AT+GMR", 2).await;
        assert!(ex.ok);
        assert_eq!(ex.attempts, 2);
        assert_eq!(ex.lines, vec!["0018000902"]);

        // One data read plus ten idle polls, the flush, then the second attempt.
        let poll = Duration::from_millis(20);
        let mut expected = vec![poll; 11];
        expected.push(Duration::from_millis(100));
        expected.push(poll);
        assert_eq!(client.transport().receive_timeouts(), expected.as_slice());
    }

    #[tokio::test]
    async fn execute_flush_clears_carried_bytes() {
        let mut mock = MockTransport::new();
        // Attempt 1 ends on an OK preceded by the wrong echo, with trailing
        // noise in the same chunk. The flush must drop that noise.
        mock.expect(b"AT\r\n", b"ready\r\nOK\r\nnoise\r\n");
        mock.expect(b"AT\r\n", b"AT\r\nOK\r\n");
        let mut client = make_client(mock);

        let ex = client.execute("AT").await;
        assert!(ex.ok);
        assert_eq!(ex.attempts, 2);
        assert_eq!(client.transport().pending_inbound(), 0);
    }

    #[tokio::test]
    async fn execute_checked_maps_exhaustion() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT\r\n", b"");
        mock.expect(b"AT\r\n", b"");
        let mut client = AtClient::new(
            mock,
            AtConfig {
                max_retries: 2,
                ..AtConfig::default()
            },
        );

        let err = client.execute_checked("AT").await.unwrap_err();
        assert!(matches!(err, Error::CommandFailed { attempts: 2, .. }));
    }

    // =======================================================================
    // Queries
    // =======================================================================

    #[tokio::test]
    async fn probe_ok() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT\r\n", b"AT\r\n\r\nOK\r\n");
        let mut client = make_client(mock);
        client.probe().await.unwrap();
    }

    #[tokio::test]
    async fn firmware_version_parses_payload() {
        let mut mock = MockTransport::new();
        mock.expect(
            b"AT+GMR\r\n",
            b"AT+GMR\r\nAT version:1.2.0.0(Jul  1 2016 20:04:45)\r\n\
              SDK version:1.5.4.1(39cb9a32)\r\ncompile time:Dec 22 2016 10:48:55\r\nOK\r\n",
        );
        let mut client = make_client(mock);

        let info = client.firmware_version().await.unwrap();
        assert_eq!(info.sdk_version.as_deref(), Some("1.5.4.1(39cb9a32)"));
        assert_eq!(info.lines.len(), 3);
    }

    #[tokio::test]
    async fn station_mac_parses() {
        let mut mock = MockTransport::new();
        mock.expect(
            b"AT+CIPSTAMAC?\r\n",
            b"AT+CIPSTAMAC?\r\n+CIPSTAMAC:\"5c:cf:7f:12:34:56\"\r\nOK\r\n",
        );
        let mut client = make_client(mock);

        let mac = client.station_mac().await;
        assert_eq!(mac.octets(), [0x5c, 0xcf, 0x7f, 0x12, 0x34, 0x56]);
    }

    #[tokio::test]
    async fn ap_mac_parses() {
        let mut mock = MockTransport::new();
        mock.expect(
            b"AT+CIPAPMAC?\r\n",
            b"AT+CIPAPMAC?\r\n+CIPAPMAC:\"5e:cf:7f:12:34:56\"\r\nOK\r\n",
        );
        let mut client = make_client(mock);

        let mac = client.try_ap_mac().await.unwrap();
        assert_eq!(mac.to_string(), "5E:CF:7F:12:34:56");
    }

    #[tokio::test]
    async fn try_get_mac_key_missing() {
        let mut mock = MockTransport::new();
        mock.expect(b"AT+CIPSTAMAC?\r\n", b"AT+CIPSTAMAC?\r\nOK\r\n");
        let mut client = make_client(mock);

        let err = client.try_station_mac().await.unwrap_err();
        assert!(matches!(err, Error::KeyNotFound(k) if k == "+CIPSTAMAC"));
    }

    #[tokio::test]
    async fn try_get_mac_malformed_value() {
        let mut mock = MockTransport::new();
        mock.expect(
            b"AT+CIPSTAMAC?\r\n",
            b"AT+CIPSTAMAC?\r\n+CIPSTAMAC:\"5c:cf:7f\"\r\nOK\r\n",
        );
        let mut client = make_client(mock);

        let err = client.try_station_mac().await.unwrap_err();
        assert!(matches!(err, Error::InvalidMac(s) if s == "5c:cf:7f"));
    }

    #[tokio::test]
    async fn get_mac_zero_on_failure() {
        let mut mock = MockTransport::new();
        mock.expect(
            b"AT+CIPSTAMAC?\r\n",
            b"AT+CIPSTAMAC?\r\n+CIPSTAMAC:\"nope\"\r\nOK\r\n",
        );
        let mut client = make_client(mock);

        assert!(client.station_mac().await.is_zero());
    }

    #[tokio::test]
    async fn close_disconnects_transport() {
        let mut client = make_client(MockTransport::new());
        client.close().await.unwrap();
        assert!(!client.transport().is_connected());
    }
}
