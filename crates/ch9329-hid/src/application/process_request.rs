//! One request/response exchange with the chip, with bounded retries.
//!
//! The [`RequestProcessor`] sends a request frame over a [`Connection`],
//! classifies the answer, and updates the published [`DeviceState`].  Every
//! failure is either *temporary* (retry after a delay) or *permanent* (give
//! up on this request immediately).
//!
//! [`DeviceState`]: super::device_state::DeviceState

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use ch9329_core::protocol::{
    commands::{ACK_OFFSET, ERROR_ACK_OFFSET, FRAME_HEADER, MIN_FRAME_SIZE, SIMPLE_COMMAND_LIMIT},
    events::GET_INFO_FRAME,
    frame::hex,
    CommandCode, DeviceErrorCode, Frame, FrameError,
};
use thiserror::Error;
use tracing::{debug, error, trace};

use super::device_state::{LedStatus, StatePublisher};

// ── Connection boundary ───────────────────────────────────────────────────────

/// Failures of a single frame exchange on the transport.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// Fewer bytes arrived than the frame header announced.
    #[error("short read: expected {expected} bytes, got {received}")]
    ShortRead { expected: usize, received: usize },

    /// The request is not a protocol frame and was not sent.
    #[error("request is not a CH9329 frame: {0}")]
    InvalidRequest(String),

    /// The answer does not start like a protocol frame.
    #[error("malformed response: {0}")]
    BadFrame(#[from] FrameError),

    /// Writing or reading the transport failed.
    #[error("transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An open, exclusively owned link to the chip.
///
/// Implementations release the transport when dropped.
#[cfg_attr(test, mockall::automock)]
pub trait Connection: Send {
    /// Discards stale input, writes `request`, and reads back one full frame.
    ///
    /// # Errors
    ///
    /// [`ConnectionError::InvalidRequest`] before any I/O if `request` does
    /// not start with the frame header; [`ConnectionError::ShortRead`] if the
    /// chip goes quiet mid-frame.
    fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>, ConnectionError>;
}

/// Rejects anything that is not at least a minimal frame with the header.
///
/// # Errors
///
/// Returns [`ConnectionError::InvalidRequest`] describing the bad request.
pub fn check_request(request: &[u8]) -> Result<(), ConnectionError> {
    if request.len() < MIN_FRAME_SIZE || !request.starts_with(&FRAME_HEADER) {
        return Err(ConnectionError::InvalidRequest(hex(request)));
    }
    Ok(())
}

// ── Settings ──────────────────────────────────────────────────────────────────

/// Retry and logging parameters of the request processor.
#[derive(Debug, Clone, PartialEq)]
pub struct HidSettings {
    /// Attempts that may end in a transport short read.
    pub read_retries: u32,
    /// Attempts that may end in any temporary error.
    pub common_retries: u32,
    /// Pause between attempts.
    pub retries_delay: Duration,
    /// Errors buffered per request before they are logged as a burst.
    pub errors_threshold: usize,
    /// Skip all transport I/O and pretend every request succeeds.
    pub noop: bool,
}

impl Default for HidSettings {
    fn default() -> Self {
        Self {
            read_retries: 5,
            common_retries: 5,
            retries_delay: Duration::from_millis(500),
            errors_threshold: 5,
            noop: false,
        }
    }
}

// ── Request errors ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Worth another attempt.
    Temporary,
    /// Retrying cannot help; abort this request.
    Permanent,
}

/// Why one attempt at a request failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RequestError {
    pub kind: ErrorKind,
    pub message: String,
    /// Set when the transport returned a truncated frame.
    pub short_read: bool,
}

impl RequestError {
    pub fn temporary(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Temporary,
            message: message.into(),
            short_read: false,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Permanent,
            message: message.into(),
            short_read: false,
        }
    }
}

impl From<ConnectionError> for RequestError {
    fn from(err: ConnectionError) -> Self {
        match err {
            ConnectionError::InvalidRequest(_) => RequestError::permanent(err.to_string()),
            ConnectionError::ShortRead { .. } => RequestError {
                short_read: true,
                ..RequestError::temporary(err.to_string())
            },
            ConnectionError::BadFrame(_) | ConnectionError::Io(_) => {
                RequestError::temporary(err.to_string())
            }
        }
    }
}

// ── Error burst suppression ───────────────────────────────────────────────────

/// Buffers error messages of one request until they exceed a threshold.
///
/// Below the threshold nothing is logged until the request ends.  The first
/// message over the threshold releases the whole buffer, after which every
/// message is logged as it happens.
#[derive(Debug)]
pub struct ErrorBurst {
    threshold: usize,
    buffered: Vec<String>,
    live: bool,
}

impl ErrorBurst {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            buffered: Vec::new(),
            live: false,
        }
    }

    /// Records one message and returns the messages due for logging now.
    pub fn record(&mut self, message: String) -> Vec<String> {
        if self.live {
            return vec![message];
        }
        self.buffered.push(message);
        if self.buffered.len() > self.threshold {
            self.live = true;
            return std::mem::take(&mut self.buffered);
        }
        Vec::new()
    }

    /// Returns the messages still buffered when the request ends.
    pub fn finish(self) -> Vec<String> {
        self.buffered
    }
}

// ── Processor ─────────────────────────────────────────────────────────────────

/// Runs single requests against the chip on behalf of the event worker.
pub struct RequestProcessor {
    settings: HidSettings,
    state: Arc<StatePublisher>,
    stop: Arc<AtomicBool>,
}

impl RequestProcessor {
    pub fn new(settings: HidSettings, state: Arc<StatePublisher>, stop: Arc<AtomicBool>) -> Self {
        Self {
            settings,
            state,
            stop,
        }
    }

    /// Sends `request` until it succeeds or the retry budget is spent.
    ///
    /// Never fails loudly: the outcome is the returned flag plus whatever the
    /// attempts published to the device state.
    pub fn process(&self, conn: &mut dyn Connection, request: &[u8]) -> bool {
        let mut common_retries = self.settings.common_retries;
        let mut read_retries = self.settings.read_retries;
        let mut burst = ErrorBurst::new(self.settings.errors_threshold);
        let mut first_attempt = true;

        let succeeded = loop {
            if common_retries == 0 || read_retries == 0 {
                break false;
            }
            if !first_attempt && self.stop.load(Ordering::Acquire) {
                debug!("stop requested; abandoning request {}", hex(request));
                break false;
            }
            first_attempt = false;

            if self.settings.noop {
                self.state.update(|state| {
                    state.online = true;
                    state.busy = false;
                });
                break true;
            }

            let err = match self.attempt(conn, request) {
                Ok(()) => break true,
                Err(err) => err,
            };

            common_retries -= 1;
            if err.short_read {
                read_retries -= 1;
            }
            for message in burst.record(err.message) {
                error!("{message}");
            }
            if err.kind == ErrorKind::Permanent {
                break false;
            }

            self.state.set_online(false);
            if common_retries > 0 && read_retries > 0 {
                std::thread::sleep(self.settings.retries_delay);
            }
        };

        for message in burst.finish() {
            error!("{message}");
        }
        if common_retries == 0 || read_retries == 0 {
            error!("Can't process HID request due many errors: {}", hex(request));
        }
        succeeded
    }

    /// One exchange plus response classification.
    fn attempt(&self, conn: &mut dyn Connection, request: &[u8]) -> Result<(), RequestError> {
        let response = match conn.exchange(request) {
            Ok(response) => response,
            Err(ConnectionError::BadFrame(e)) => {
                resync(conn);
                return Err(RequestError::temporary(format!(
                    "Invalid CH9329 response; request={}; {e}",
                    hex(request)
                )));
            }
            Err(e) => return Err(e.into()),
        };
        trace!("request {} -> response {}", hex(request), hex(&response));

        let frame = match Frame::parse(&response) {
            Ok(frame) => frame,
            Err(e) => {
                resync(conn);
                return Err(RequestError::temporary(format!(
                    "Invalid CH9329 response; request={}; response={}; {e}",
                    hex(request),
                    hex(&response)
                )));
            }
        };

        let request_code = *request
            .get(3)
            .ok_or_else(|| RequestError::permanent(format!("truncated request {}", hex(request))))?;
        if request_code == CommandCode::ReadCustomHid.as_u8() {
            return Ok(());
        }

        let response_code = frame.command();
        let payload = frame.payload();

        if response_code > ERROR_ACK_OFFSET {
            if response_code == request_code.wrapping_add(ERROR_ACK_OFFSET) {
                let code = payload.first().copied().unwrap_or_default();
                let description = DeviceErrorCode::try_from(code)
                    .map(DeviceErrorCode::description)
                    .unwrap_or("unknown");
                return Err(RequestError::temporary(format!(
                    "CH9329 error: {description} code: 0x{code:02x}"
                )));
            }
        } else if response_code > ACK_OFFSET
            && response_code == request_code.wrapping_add(ACK_OFFSET)
        {
            if request_code == CommandCode::GetInfo.as_u8() {
                return self.apply_info(payload, &frame);
            }
            if request_code < SIMPLE_COMMAND_LIMIT {
                return Ok(());
            }
            return Err(RequestError::temporary(format!(
                "Not supported response={}",
                hex(frame.as_bytes())
            )));
        }

        Err(RequestError::temporary(format!(
            "Invalid response from HID: request={}, response={}",
            hex(request),
            hex(frame.as_bytes())
        )))
    }

    /// Publishes the fields of a `GET_INFO` answer.
    fn apply_info(&self, payload: &[u8], frame: &Frame) -> Result<(), RequestError> {
        let [version, online, status, ..] = payload else {
            return Err(RequestError::temporary(format!(
                "Short GET_INFO response={}",
                hex(frame.as_bytes())
            )));
        };
        trace!("chip firmware V1.{}", version.wrapping_sub(0x30));
        self.state
            .set_status(*online != 0, LedStatus::from_status_byte(*status));
        Ok(())
    }
}

/// Resynchronises the chip's parser after a garbled answer.  The status
/// probe's own answer does not matter.
fn resync(conn: &mut dyn Connection) {
    if let Err(e) = conn.exchange(&GET_INFO_FRAME) {
        debug!("resync probe failed: {e}");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ch9329_core::build_frame;

    fn fast_settings(common: u32, read: u32) -> HidSettings {
        HidSettings {
            read_retries: read,
            common_retries: common,
            retries_delay: Duration::from_millis(1),
            errors_threshold: 5,
            noop: false,
        }
    }

    fn processor(settings: HidSettings) -> (RequestProcessor, Arc<StatePublisher>) {
        let state = Arc::new(StatePublisher::new());
        let processor =
            RequestProcessor::new(settings, Arc::clone(&state), Arc::new(AtomicBool::new(false)));
        (processor, state)
    }

    fn info_response(online: u8, status: u8) -> Vec<u8> {
        build_frame(0x81, &[0x30, online, status, 0, 0, 0, 0, 0]).into_bytes()
    }

    fn key_request() -> Vec<u8> {
        build_frame(0x02, &[0, 0, 0x04, 0, 0, 0, 0, 0]).into_bytes()
    }

    // ── check_request ─────────────────────────────────────────────────────────

    #[test]
    fn test_check_request_accepts_frames_and_rejects_foreign_bytes() {
        assert!(check_request(&GET_INFO_FRAME).is_ok());
        assert!(matches!(
            check_request(&[0x00, 0x01, 0x02, 0x03, 0x04, 0x05]),
            Err(ConnectionError::InvalidRequest(_))
        ));
        assert!(check_request(&[0x57, 0xAB, 0x00]).is_err());
    }

    // ── ErrorBurst ────────────────────────────────────────────────────────────

    #[test]
    fn test_error_burst_flushes_buffer_once_threshold_is_exceeded() {
        // Arrange
        let mut burst = ErrorBurst::new(3);

        // Act / Assert: three errors stay buffered
        for i in 1..=3 {
            assert!(burst.record(format!("e{i}")).is_empty());
        }
        // The fourth releases all four, in order
        assert_eq!(burst.record("e4".into()), vec!["e1", "e2", "e3", "e4"]);
        // Later errors are passed straight through
        assert_eq!(burst.record("e5".into()), vec!["e5"]);
        assert!(burst.finish().is_empty());
    }

    #[test]
    fn test_error_burst_returns_leftovers_on_finish() {
        let mut burst = ErrorBurst::new(3);
        burst.record("a".into());
        burst.record("b".into());

        assert_eq!(burst.finish(), vec!["a", "b"]);
    }

    // ── Connection error mapping ──────────────────────────────────────────────

    #[test]
    fn test_connection_errors_map_to_request_error_kinds() {
        let short = RequestError::from(ConnectionError::ShortRead {
            expected: 5,
            received: 0,
        });
        assert_eq!(short.kind, ErrorKind::Temporary);
        assert!(short.short_read);

        let invalid = RequestError::from(ConnectionError::InvalidRequest("00".into()));
        assert_eq!(invalid.kind, ErrorKind::Permanent);

        let io = RequestError::from(ConnectionError::Io(std::io::Error::other("gone")));
        assert_eq!(io.kind, ErrorKind::Temporary);
        assert!(!io.short_read);
    }

    // ── process ───────────────────────────────────────────────────────────────

    #[test]
    fn test_get_info_response_publishes_status() {
        // Arrange
        let (processor, state) = processor(fast_settings(5, 5));
        let mut conn = MockConnection::new();
        conn.expect_exchange()
            .withf(|r| r == &GET_INFO_FRAME[..])
            .times(1)
            .returning(|_| Ok(info_response(1, 0b011)));

        // Act
        let ok = processor.process(&mut conn, &GET_INFO_FRAME);

        // Assert
        assert!(ok);
        let snapshot = state.snapshot();
        assert!(snapshot.online);
        assert!(snapshot.num_lock);
        assert!(snapshot.caps_lock);
        assert!(!snapshot.scroll_lock);
    }

    #[test]
    fn test_simple_command_ack_is_success_without_state_change() {
        // Arrange
        let (processor, state) = processor(fast_settings(5, 5));
        let mut conn = MockConnection::new();
        conn.expect_exchange()
            .times(1)
            .returning(|_| Ok(build_frame(0x82, &[0x00]).into_bytes()));

        // Act
        let ok = processor.process(&mut conn, &key_request());

        // Assert
        assert!(ok);
        assert!(!state.snapshot().online);
    }

    #[test]
    fn test_read_custom_hid_accepts_any_valid_frame() {
        let (processor, _state) = processor(fast_settings(5, 5));
        let mut conn = MockConnection::new();
        conn.expect_exchange()
            .times(1)
            .returning(|_| Ok(build_frame(0x33, &[1, 2, 3]).into_bytes()));

        assert!(processor.process(&mut conn, build_frame(0x87, &[]).as_bytes()));
    }

    #[test]
    fn test_bad_checksum_exhausts_retries_and_resyncs() {
        // Arrange
        let (processor, state) = processor(fast_settings(2, 2));
        state.set_online(true);
        let request = key_request();
        let mut corrupt = build_frame(0x82, &[0x00]).into_bytes();
        let last = corrupt.len() - 1;
        corrupt[last] ^= 0xFF;

        let mut conn = MockConnection::new();
        let expected_request = request.clone();
        conn.expect_exchange()
            .withf(move |r| r == expected_request.as_slice())
            .times(2)
            .returning(move |_| Ok(corrupt.clone()));
        conn.expect_exchange()
            .withf(|r| r == &GET_INFO_FRAME[..])
            .times(2)
            .returning(|_| Ok(info_response(1, 0)));

        // Act
        let ok = processor.process(&mut conn, &request);

        // Assert
        assert!(!ok);
        assert!(!state.snapshot().online);
    }

    #[test]
    fn test_device_error_ack_is_temporary_and_retried() {
        // Arrange: bad parameter once, then a normal ack
        let (processor, _state) = processor(fast_settings(3, 3));
        let mut conn = MockConnection::new();
        let mut seq = mockall::Sequence::new();
        conn.expect_exchange()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(build_frame(0xC2, &[0xE5]).into_bytes()));
        conn.expect_exchange()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(build_frame(0x82, &[0x00]).into_bytes()));

        // Act / Assert
        assert!(processor.process(&mut conn, &key_request()));
    }

    #[test]
    fn test_mismatched_ack_is_invalid_response() {
        let (processor, _state) = processor(fast_settings(2, 5));
        let mut conn = MockConnection::new();
        conn.expect_exchange()
            .times(2)
            .returning(|_| Ok(build_frame(0x85, &[0x00]).into_bytes()));

        assert!(!processor.process(&mut conn, &key_request()));
    }

    #[test]
    fn test_unsupported_command_ack_is_temporary() {
        let (processor, _state) = processor(fast_settings(1, 1));
        let mut conn = MockConnection::new();
        conn.expect_exchange()
            .times(1)
            .returning(|_| Ok(build_frame(0x90, &[0x00]).into_bytes()));

        assert!(!processor.process(&mut conn, build_frame(0x10, &[]).as_bytes()));
    }

    #[test]
    fn test_short_reads_consume_read_retries() {
        // Arrange: plenty of common retries, only two read retries
        let (processor, _state) = processor(fast_settings(10, 2));
        let mut conn = MockConnection::new();
        conn.expect_exchange().times(2).returning(|_| {
            Err(ConnectionError::ShortRead {
                expected: 5,
                received: 0,
            })
        });

        // Act / Assert
        assert!(!processor.process(&mut conn, &key_request()));
    }

    #[test]
    fn test_permanent_error_aborts_after_one_attempt() {
        // Arrange
        let (processor, state) = processor(fast_settings(5, 5));
        state.set_online(true);
        let mut conn = MockConnection::new();
        conn.expect_exchange()
            .times(1)
            .returning(|r| Err(ConnectionError::InvalidRequest(hex(r))));

        // Act
        let ok = processor.process(&mut conn, &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06]);

        // Assert: permanent errors do not touch the online flag
        assert!(!ok);
        assert!(state.snapshot().online);
    }

    #[test]
    fn test_stop_request_ends_retries_after_first_attempt() {
        // Arrange
        let state = Arc::new(StatePublisher::new());
        let stop = Arc::new(AtomicBool::new(true));
        let processor = RequestProcessor::new(fast_settings(5, 5), state, stop);
        let mut conn = MockConnection::new();
        conn.expect_exchange().times(1).returning(|_| {
            Err(ConnectionError::ShortRead {
                expected: 5,
                received: 2,
            })
        });

        // Act / Assert
        assert!(!processor.process(&mut conn, &key_request()));
    }

    #[test]
    fn test_noop_mode_marks_online_without_io() {
        // Arrange
        let settings = HidSettings {
            noop: true,
            ..fast_settings(5, 5)
        };
        let (processor, state) = processor(settings);
        let mut conn = MockConnection::new();
        conn.expect_exchange().never();

        // Act
        let ok = processor.process(&mut conn, &key_request());

        // Assert
        assert!(ok);
        assert!(state.snapshot().online);
    }

    #[test]
    fn test_noop_mode_clears_busy_left_by_a_reset() {
        // Arrange
        let settings = HidSettings {
            noop: true,
            ..fast_settings(5, 5)
        };
        let (processor, state) = processor(settings);
        state.set_busy(true);
        let mut conn = MockConnection::new();
        conn.expect_exchange().never();

        // Act
        let ok = processor.process(&mut conn, &GET_INFO_FRAME);

        // Assert
        assert!(ok);
        let snapshot = state.snapshot();
        assert!(snapshot.online);
        assert!(!snapshot.busy);
    }

    #[test]
    fn test_malformed_header_from_transport_triggers_resync_and_retry() {
        // Arrange: the transport rejects one answer's header, then all is well
        let (processor, _state) = processor(fast_settings(3, 3));
        let request = key_request();
        let mut conn = MockConnection::new();
        let mut seq = mockall::Sequence::new();
        conn.expect_exchange()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Err(ConnectionError::BadFrame(FrameError::BadHeader([
                    0x00, 0xAB, 0x00,
                ])))
            });
        conn.expect_exchange()
            .withf(|r| r == &GET_INFO_FRAME[..])
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(info_response(1, 0)));
        conn.expect_exchange()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(build_frame(0x82, &[0x00]).into_bytes()));

        // Act / Assert
        assert!(processor.process(&mut conn, &request));
    }

    #[test]
    fn test_response_with_inconsistent_length_is_invalid() {
        // Arrange: valid checksum, but the length byte promises more payload
        let mut truncated = build_frame(0x82, &[0x00, 0x00]).into_bytes();
        truncated.remove(5);
        let body_len = truncated.len() - 1;
        truncated[body_len] = ch9329_core::protocol::frame::checksum(&truncated[..body_len]);

        let (processor, _state) = processor(fast_settings(1, 1));
        let mut conn = MockConnection::new();
        conn.expect_exchange()
            .withf(|r| r != &GET_INFO_FRAME[..])
            .times(1)
            .returning(move |_| Ok(truncated.clone()));
        conn.expect_exchange()
            .withf(|r| r == &GET_INFO_FRAME[..])
            .times(1)
            .returning(|_| Ok(info_response(1, 0)));

        // Act / Assert
        assert!(!processor.process(&mut conn, &key_request()));
    }

    #[test]
    fn test_short_get_info_payload_is_rejected() {
        let (processor, state) = processor(fast_settings(1, 1));
        let mut conn = MockConnection::new();
        conn.expect_exchange()
            .times(1)
            .returning(|_| Ok(build_frame(0x81, &[0x30, 0x01]).into_bytes()));

        assert!(!processor.process(&mut conn, &GET_INFO_FRAME));
        assert!(!state.snapshot().online);
    }
}
