//! In-memory CH9329 for tests and dry runs.
//!
//! [`MockChip`] answers requests the way the real chip does: `GET_INFO`
//! returns a configurable status and every other command gets a plain
//! acknowledgement.  Faults can be queued one at a time or made persistent
//! to exercise the retry logic, and every request, open and close is
//! recorded for assertions.
//!
//! # Usage in tests
//!
//! ```ignore
//! let chip = MockChip::new();
//! chip.push_fault(MockFault::BadChecksum);
//!
//! let hid = Ch9329Hid::start(settings, Arc::new(chip.clone()), reset_line)?;
//! hid.send_key_events([("KeyA", true)])?;
//!
//! assert_eq!(chip.requests_with_command(0x02).len(), 2);
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

use ch9329_core::build_frame;
use ch9329_core::protocol::commands::{ACK_OFFSET, ERROR_ACK_OFFSET};
use ch9329_core::protocol::CommandCode;

use crate::application::event_worker::Phy;
use crate::application::process_request::{check_request, Connection, ConnectionError};

/// A misbehaviour to inject into one answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFault {
    /// The chip stays silent.
    ShortRead,
    /// The answer's checksum byte is wrong.
    BadChecksum,
    /// The answer does not start with `57 AB 00`.
    BadHeader,
    /// An error acknowledgement carrying this code.
    DeviceError(u8),
    /// A normal acknowledgement for a different command.
    WrongAck,
}

#[derive(Debug)]
struct ChipState {
    present: bool,
    fail_open: bool,
    usb_online: bool,
    leds: u8,
    version: u8,
    faults: VecDeque<(Option<u8>, MockFault)>,
    persistent_fault: Option<MockFault>,
    requests: Vec<Vec<u8>>,
    open_attempts: usize,
    opens: usize,
    closes: usize,
}

/// A scripted chip.  Clones share the same state.
#[derive(Debug, Clone)]
pub struct MockChip {
    inner: Arc<Mutex<ChipState>>,
}

impl MockChip {
    /// A present, online chip reporting firmware V1.0 and no LEDs lit.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ChipState {
                present: true,
                fail_open: false,
                usb_online: true,
                leds: 0,
                version: 0x30,
                faults: VecDeque::new(),
                persistent_fault: None,
                requests: Vec::new(),
                open_attempts: 0,
                opens: 0,
                closes: 0,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChipState> {
        // Poisoning is ignored so the record stays readable after a test panic.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_present(&self, present: bool) {
        self.lock().present = present;
    }

    pub fn set_fail_open(&self, fail: bool) {
        self.lock().fail_open = fail;
    }

    pub fn set_usb_online(&self, online: bool) {
        self.lock().usb_online = online;
    }

    /// Sets the LED status byte (bit 0 num, bit 1 caps, bit 2 scroll).
    pub fn set_leds(&self, leds: u8) {
        self.lock().leds = leds;
    }

    /// Queues a fault for the next answer.
    pub fn push_fault(&self, fault: MockFault) {
        self.lock().faults.push_back((None, fault));
    }

    /// Queues a fault for the next request carrying `command`.  Other
    /// requests, such as idle probes, pass it by.
    pub fn push_fault_on(&self, command: u8, fault: MockFault) {
        self.lock().faults.push_back((Some(command), fault));
    }

    /// Applies `fault` to every answer until cleared with `None`.
    pub fn set_persistent_fault(&self, fault: Option<MockFault>) {
        self.lock().persistent_fault = fault;
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<Vec<u8>> {
        self.lock().requests.clone()
    }

    /// Requests whose command byte is `command`.
    pub fn requests_with_command(&self, command: u8) -> Vec<Vec<u8>> {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.get(3) == Some(&command))
            .cloned()
            .collect()
    }

    pub fn open_attempts(&self) -> usize {
        self.lock().open_attempts
    }

    pub fn opens(&self) -> usize {
        self.lock().opens
    }

    pub fn closes(&self) -> usize {
        self.lock().closes
    }

    fn answer(&self, request: &[u8]) -> Result<Vec<u8>, ConnectionError> {
        check_request(request)?;
        let mut state = self.lock();
        state.requests.push(request.to_vec());

        let command = request[3];
        let queued = state
            .faults
            .iter()
            .position(|(target, _)| target.map_or(true, |c| c == command));
        let fault = queued
            .and_then(|i| state.faults.remove(i))
            .map(|(_, fault)| fault)
            .or(state.persistent_fault);
        let ack = command.wrapping_add(ACK_OFFSET);
        let response = match fault {
            None => {
                if command == CommandCode::GetInfo.as_u8() {
                    let online = u8::from(state.usb_online);
                    build_frame(ack, &[state.version, online, state.leds, 0, 0, 0, 0, 0])
                        .into_bytes()
                } else {
                    build_frame(ack, &[0x00]).into_bytes()
                }
            }
            Some(MockFault::ShortRead) => {
                return Err(ConnectionError::ShortRead {
                    expected: 5,
                    received: 0,
                })
            }
            Some(MockFault::BadChecksum) => {
                let mut bytes = build_frame(ack, &[0x00]).into_bytes();
                if let Some(last) = bytes.last_mut() {
                    *last ^= 0xFF;
                }
                bytes
            }
            Some(MockFault::BadHeader) => {
                let mut bytes = build_frame(ack, &[0x00]).into_bytes();
                bytes[0] = 0x00;
                bytes
            }
            Some(MockFault::DeviceError(code)) => {
                build_frame(command.wrapping_add(ERROR_ACK_OFFSET), &[code]).into_bytes()
            }
            Some(MockFault::WrongAck) => build_frame(ack.wrapping_add(1), &[0x00]).into_bytes(),
        };
        Ok(response)
    }
}

impl Default for MockChip {
    fn default() -> Self {
        Self::new()
    }
}

impl Phy for MockChip {
    fn is_present(&self) -> bool {
        self.lock().present
    }

    fn open(&self) -> Result<Box<dyn Connection>, ConnectionError> {
        let mut state = self.lock();
        state.open_attempts += 1;
        if state.fail_open {
            return Err(ConnectionError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "mock open failure",
            )));
        }
        state.opens += 1;
        Ok(Box::new(MockConnection { chip: self.clone() }))
    }
}

/// An open link to a [`MockChip`].  Dropping it records a close.
pub struct MockConnection {
    chip: MockChip,
}

impl Connection for MockConnection {
    fn exchange(&mut self, request: &[u8]) -> Result<Vec<u8>, ConnectionError> {
        self.chip.answer(request)
    }
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        self.chip.lock().closes += 1;
    }
}
