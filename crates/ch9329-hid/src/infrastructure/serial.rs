//! UART transport to a real CH9329.
//!
//! The chip sits behind a USB-serial adapter or a board UART, so "present"
//! simply means the device node exists.  Each [`SerialConnection`] owns the
//! opened port and closes it when dropped.

use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::Duration;

use ch9329_core::protocol::commands::PARTIAL_HEADER_SIZE;
use ch9329_core::protocol::frame::{hex, FrameHeader};
use serialport::{ClearBuffer, SerialPort};
use tracing::{debug, info};

use crate::application::event_worker::Phy;
use crate::application::process_request::{check_request, Connection, ConnectionError};

/// Serial port parameters of the chip.
#[derive(Debug, Clone, PartialEq)]
pub struct SerialPhy {
    pub device_path: PathBuf,
    pub speed: u32,
    pub read_timeout: Duration,
}

impl SerialPhy {
    pub fn new(device_path: impl Into<PathBuf>, speed: u32, read_timeout: Duration) -> Self {
        Self {
            device_path: device_path.into(),
            speed,
            read_timeout,
        }
    }
}

impl Phy for SerialPhy {
    fn is_present(&self) -> bool {
        self.device_path.exists()
    }

    fn open(&self) -> Result<Box<dyn Connection>, ConnectionError> {
        let path = self.device_path.to_string_lossy().into_owned();
        let port = serialport::new(path.as_str(), self.speed)
            .timeout(self.read_timeout)
            .open()
            .map_err(|e| ConnectionError::Io(e.into()))?;
        info!("opened {path} at {} baud", self.speed);
        Ok(Box::new(SerialConnection { port, path }))
    }
}

/// An open serial link.  The port closes when this value is dropped.
pub struct SerialConnection {
    port: Box<dyn SerialPort>,
    path: String,
}

impl Connection for SerialConnection {
    fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>, ConnectionError> {
        check_request(request)?;

        if self.port.bytes_to_read().map_err(|e| ConnectionError::Io(e.into()))? > 0 {
            self.port
                .clear(ClearBuffer::Input)
                .map_err(|e| ConnectionError::Io(e.into()))?;
        }
        self.port.write_all(request)?;
        self.port.flush()?;

        read_response(&mut self.port)
    }
}

impl Drop for SerialConnection {
    fn drop(&mut self) {
        debug!("closing {}", self.path);
    }
}

/// Reads one answer: the partial header, then as many bytes as it announces.
fn read_response<R: Read + ?Sized>(reader: &mut R) -> Result<Vec<u8>, ConnectionError> {
    let mut response = read_frame_part(reader, PARTIAL_HEADER_SIZE)?;
    let header = FrameHeader::parse(&response)?;
    let rest = read_frame_part(reader, header.remaining_len()).map_err(|e| match e {
        ConnectionError::ShortRead { received, .. } => ConnectionError::ShortRead {
            expected: header.frame_len(),
            received: PARTIAL_HEADER_SIZE + received,
        },
        other => other,
    })?;
    response.extend_from_slice(&rest);
    Ok(response)
}

/// Reads `len` bytes from `reader`, stopping early on timeout or end of stream.
fn read_frame_part<R: Read + ?Sized>(reader: &mut R, len: usize) -> Result<Vec<u8>, ConnectionError> {
    let mut buf = vec![0u8; len];
    let mut filled = 0;
    while filled < len {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => break,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(ConnectionError::Io(e)),
        }
    }
    if filled < len {
        debug!("short read {} of {len} bytes", hex(&buf[..filled]));
        return Err(ConnectionError::ShortRead {
            expected: len,
            received: filled,
        });
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ch9329_core::FrameError;
    use std::io::Cursor;

    /// Reader that returns its data in fixed-size chunks, then times out.
    struct ChunkedReader {
        data: Vec<u8>,
        pos: usize,
        chunk: usize,
    }

    impl Read for ChunkedReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.data.len() {
                return Err(std::io::Error::new(std::io::ErrorKind::TimedOut, "timeout"));
            }
            let n = self.chunk.min(buf.len()).min(self.data.len() - self.pos);
            buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }

    #[test]
    fn test_read_frame_part_collects_chunked_input() {
        // Arrange
        let mut reader = ChunkedReader {
            data: vec![0x57, 0xAB, 0x00, 0x81, 0x08],
            pos: 0,
            chunk: 2,
        };

        // Act
        let bytes = read_frame_part(&mut reader, 5).unwrap();

        // Assert
        assert_eq!(bytes, vec![0x57, 0xAB, 0x00, 0x81, 0x08]);
    }

    #[test]
    fn test_read_frame_part_reports_short_read_on_timeout() {
        let mut reader = ChunkedReader {
            data: vec![0x57, 0xAB],
            pos: 0,
            chunk: 1,
        };

        let result = read_frame_part(&mut reader, 5);

        assert!(matches!(
            result,
            Err(ConnectionError::ShortRead {
                expected: 5,
                received: 2
            })
        ));
    }

    #[test]
    fn test_read_frame_part_reports_short_read_at_end_of_stream() {
        let mut reader = Cursor::new(vec![0x57]);

        let result = read_frame_part(&mut reader, 3);

        assert!(matches!(
            result,
            Err(ConnectionError::ShortRead { received: 1, .. })
        ));
    }

    #[test]
    fn test_read_response_follows_announced_length() {
        // Arrange: a GET_INFO answer followed by unrelated trailing bytes
        let mut bytes =
            ch9329_core::build_frame(0x81, &[0x30, 0x01, 0x02, 0, 0, 0, 0, 0]).into_bytes();
        let frame_len = bytes.len();
        bytes.extend_from_slice(&[0xEE, 0xEE]);
        let mut reader = Cursor::new(bytes.clone());

        // Act
        let response = read_response(&mut reader).unwrap();

        // Assert
        assert_eq!(response, bytes[..frame_len].to_vec());
    }

    #[test]
    fn test_read_response_rejects_bad_header_without_reading_on() {
        // Arrange
        let mut reader = Cursor::new(vec![0x00, 0xAB, 0x00, 0x82, 0x01, 0x00, 0x2D]);

        // Act
        let result = read_response(&mut reader);

        // Assert
        assert!(matches!(
            result,
            Err(ConnectionError::BadFrame(FrameError::BadHeader([0x00, 0xAB, 0x00])))
        ));
        assert_eq!(reader.position(), 5);
    }

    #[test]
    fn test_read_response_reports_whole_frame_counts_on_short_payload() {
        let mut reader = ChunkedReader {
            data: vec![0x57, 0xAB, 0x00, 0x81, 0x08, 0x30, 0x01],
            pos: 0,
            chunk: 3,
        };

        let result = read_response(&mut reader);

        assert!(matches!(
            result,
            Err(ConnectionError::ShortRead {
                expected: 14,
                received: 7
            })
        ));
    }

    #[test]
    fn test_missing_device_node_is_not_present() {
        let phy = SerialPhy::new(
            "/nonexistent/path/that/cannot/exist/ttyUSB9",
            115_200,
            Duration::from_secs(1),
        );

        assert!(!phy.is_present());
        assert!(phy.open().is_err());
    }
}
