//! Frame codec for the CH9329 serial protocol.
//!
//! Wire format:
//! ```text
//! [0x57][0xAB][0x00][command:1][len:1][payload:len][checksum:1]
//! ```
//! The checksum is the low byte of the additive sum of every preceding byte.
//! Only the low byte matters, so all arithmetic wraps modulo 256.

use thiserror::Error;

use crate::protocol::commands::{FRAME_HEADER, MIN_FRAME_SIZE, PARTIAL_HEADER_SIZE};

/// Errors that can occur while interpreting received bytes as a frame.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// The byte slice is shorter than the minimum required length.
    #[error("insufficient data: need at least {needed} bytes, got {available}")]
    InsufficientData { needed: usize, available: usize },

    /// The first three bytes are not `57 AB 00`.
    #[error("bad frame header: {0:02X?}")]
    BadHeader([u8; 3]),

    /// The declared payload length does not match the bytes available.
    #[error("payload length mismatch: header says {declared}, available is {available}")]
    PayloadLengthMismatch { declared: usize, available: usize },

    /// The trailing checksum byte does not match the recomputed sum.
    #[error("checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },
}

/// One complete protocol message, checksum included.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Frame(Vec<u8>);

impl Frame {
    /// Parses and validates a complete frame received from the chip.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError`] if the header, length, or checksum is wrong.
    pub fn parse(bytes: &[u8]) -> Result<Self, FrameError> {
        let header = FrameHeader::parse(bytes)?;
        let expected_len = header.frame_len();
        if bytes.len() != expected_len {
            return Err(FrameError::PayloadLengthMismatch {
                declared: header.declared_len,
                available: bytes.len().saturating_sub(MIN_FRAME_SIZE),
            });
        }
        let (body, tail) = bytes.split_at(bytes.len() - 1);
        let expected = checksum(body);
        if tail[0] != expected {
            return Err(FrameError::ChecksumMismatch {
                expected,
                actual: tail[0],
            });
        }
        Ok(Self(bytes.to_vec()))
    }

    /// The command (or acknowledgement) byte.
    pub fn command(&self) -> u8 {
        self.0[3]
    }

    /// The payload bytes between the length byte and the checksum.
    pub fn payload(&self) -> &[u8] {
        &self.0[PARTIAL_HEADER_SIZE..self.0.len() - 1]
    }

    /// The trailing checksum byte.
    pub fn checksum(&self) -> u8 {
        self.0[self.0.len() - 1]
    }

    /// The raw frame bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the frame and returns the raw bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Frame({})", hex(&self.0))
    }
}

/// The 5-byte prefix of a frame: enough to know how much more to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Command or acknowledgement code.
    pub command: u8,
    /// Payload length announced by the sender.
    pub declared_len: usize,
}

impl FrameHeader {
    /// Parses the partial header from the start of `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::InsufficientData`] for fewer than 5 bytes and
    /// [`FrameError::BadHeader`] when the magic bytes are wrong.
    pub fn parse(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < PARTIAL_HEADER_SIZE {
            return Err(FrameError::InsufficientData {
                needed: PARTIAL_HEADER_SIZE,
                available: bytes.len(),
            });
        }
        if bytes[..3] != FRAME_HEADER {
            return Err(FrameError::BadHeader([bytes[0], bytes[1], bytes[2]]));
        }
        Ok(Self {
            command: bytes[3],
            declared_len: bytes[4] as usize,
        })
    }

    /// Number of bytes that follow the partial header: payload plus checksum.
    pub fn remaining_len(&self) -> usize {
        self.declared_len + 1
    }

    /// Total frame length implied by this header.
    pub fn frame_len(&self) -> usize {
        PARTIAL_HEADER_SIZE + self.remaining_len()
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Builds a frame from a command byte and its payload.
///
/// The length byte is derived from `payload`.  Every report this crate
/// produces is at most 8 bytes long, far below the 255-byte limit of the
/// length field.
///
/// # Examples
///
/// ```rust
/// use ch9329_core::protocol::frame::{build_frame, verify_frame};
///
/// let frame = build_frame(0x01, &[]);
/// assert_eq!(frame.as_bytes(), &[0x57, 0xAB, 0x00, 0x01, 0x00, 0x03]);
/// assert!(verify_frame(frame.as_bytes()));
/// ```
pub fn build_frame(command: u8, payload: &[u8]) -> Frame {
    debug_assert!(payload.len() <= u8::MAX as usize, "payload too long for one frame");

    let mut buf = Vec::with_capacity(MIN_FRAME_SIZE + payload.len());
    buf.extend_from_slice(&FRAME_HEADER);
    buf.push(command);
    buf.push(payload.len() as u8);
    buf.extend_from_slice(payload);
    buf.push(checksum(&buf));
    Frame(buf)
}

/// Returns `true` if the last byte of `bytes` is the checksum of the rest.
///
/// Only the checksum is checked here.  Slices too short to hold a partial
/// header and a checksum never verify.
pub fn verify_frame(bytes: &[u8]) -> bool {
    if bytes.len() < MIN_FRAME_SIZE {
        return false;
    }
    let (body, tail) = bytes.split_at(bytes.len() - 1);
    checksum(body) == tail[0]
}

/// Low byte of the additive sum of `bytes`.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Formats bytes as space-separated lowercase hex, as used in log lines.
pub fn hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(" ")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
