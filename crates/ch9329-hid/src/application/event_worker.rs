//! The event worker: the one thread that talks to the chip.
//!
//! The worker owns the transport for as long as the device is present.  It
//! drains the event queue one request at a time, probes the chip's status
//! whenever the queue stays idle, and performs hardware resets on request.
//!
//! # Loop structure
//!
//! ```text
//! outer loop (until stop)
//!  └─ reset line pulse, then wait for the device node (1 s polls, 10 tries)
//!  └─ open the transport
//!       └─ inner loop (until stop and queue empty)
//!            ├─ reset pending?      -> busy, pulse reset line (or 0x0F command)
//!            ├─ event within 0.5 s  -> process; on failure flush the queue
//!            └─ idle 0.5 s          -> status probe
//! ```
//!
//! Any fault inside one pass of the outer loop, including a panic, is logged
//! and followed by a one second pause.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::Context;
use ch9329_core::{
    protocol::events::{GET_INFO_FRAME, RESET_FRAME},
    HidEvent,
};
use crossbeam::channel::{Receiver, RecvTimeoutError};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::device_state::StatePublisher;
use super::process_request::{Connection, ConnectionError, HidSettings, RequestProcessor};

/// How long the queue may stay empty before a status probe is sent.
pub const IDLE_PROBE_INTERVAL: Duration = Duration::from_millis(500);

/// Default pause between presence checks of the device node.
pub const PRESENCE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default number of presence checks before "Missing HID" is reported.
pub const PRESENCE_ATTEMPTS: u32 = 10;

/// Pause after a fault before the outer loop retries.
pub const FAULT_BACKOFF: Duration = Duration::from_secs(1);

// ── Collaborator boundaries ───────────────────────────────────────────────────

/// The physical transport: tells whether the device exists and opens it.
pub trait Phy: Send + Sync {
    /// Whether the device node exists, without opening it.
    fn is_present(&self) -> bool;

    /// Opens the transport.  The returned connection closes it when dropped.
    ///
    /// # Errors
    ///
    /// Returns [`ConnectionError`] if the device cannot be opened.
    fn open(&self) -> Result<Box<dyn Connection>, ConnectionError>;
}

/// Error raised by a hardware reset line.
#[derive(Debug, Error)]
pub enum ResetError {
    #[error("reset line I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Hardware reset control of the chip.
pub trait ResetLine: Send + Sync {
    /// Pulses the reset line and returns once the pulse is complete.
    ///
    /// # Errors
    ///
    /// Returns [`ResetError`] if the line could not be driven.
    fn reset(&self) -> Result<(), ResetError>;

    /// Whether a physical line is connected.  Without one, explicit reset
    /// requests fall back to the chip's own reset command.
    fn is_wired(&self) -> bool {
        true
    }
}

// ── Worker ────────────────────────────────────────────────────────────────────

/// Everything the worker thread owns or shares with the handle.
pub struct EventWorker {
    pub settings: HidSettings,
    pub phy: Arc<dyn Phy>,
    pub reset_line: Arc<dyn ResetLine>,
    pub state: Arc<StatePublisher>,
    pub events: Receiver<HidEvent>,
    pub stop: Arc<AtomicBool>,
    pub reset_required: Arc<AtomicBool>,
    pub presence_poll_interval: Duration,
    pub presence_attempts: u32,
}

impl EventWorker {
    /// Starts the worker on a dedicated, named OS thread.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread could not be spawned.
    pub fn spawn(self) -> std::io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("ch9329-hid".to_string())
            .spawn(move || self.run())
    }

    fn run(self) {
        info!("HID worker started");
        let processor = RequestProcessor::new(
            self.settings.clone(),
            Arc::clone(&self.state),
            Arc::clone(&self.stop),
        );

        while !self.stopped() {
            let pass = panic::catch_unwind(AssertUnwindSafe(|| self.hid_loop(&processor)));
            let fault = match pass {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => format!("{e:#}"),
                Err(payload) => format!("panic: {}", panic_message(payload.as_ref())),
            };
            self.clear_queue();
            error!("Unexpected error in the HID loop: {fault}");
            thread::sleep(FAULT_BACKOFF);
        }
        info!("HID worker stopped");
    }

    /// One presence cycle: wait for the device, open it, serve the queue.
    fn hid_loop(&self, processor: &RequestProcessor) -> anyhow::Result<()> {
        if !self.wait_device() {
            return Ok(());
        }

        let mut conn = self.phy.open().context("can't open HID transport")?;
        processor.process(conn.as_mut(), &GET_INFO_FRAME);

        while !(self.stopped() && self.events.is_empty()) {
            if self.reset_required.load(Ordering::Acquire) {
                self.state.set_busy(true);
                if self.reset_line.is_wired() {
                    if let Err(e) = self.reset_line.reset() {
                        warn!("HID reset failed: {e}");
                    }
                } else {
                    debug!("no reset line; sending the chip reset command");
                    processor.process(conn.as_mut(), &RESET_FRAME);
                }
                self.reset_required.store(false, Ordering::Release);
            }

            let ok = match self.events.recv_timeout(IDLE_PROBE_INTERVAL) {
                Ok(event) => {
                    let ok = processor.process(conn.as_mut(), event.encode().as_bytes());
                    if !ok {
                        self.clear_queue();
                    }
                    ok
                }
                Err(RecvTimeoutError::Timeout) => processor.process(conn.as_mut(), &GET_INFO_FRAME),
                Err(RecvTimeoutError::Disconnected) => {
                    debug!("event queue closed; stopping");
                    self.stop.store(true, Ordering::Release);
                    return Ok(());
                }
            };

            if !ok && !self.phy.is_present() {
                warn!("HID device disappeared; releasing transport");
                return Ok(());
            }
        }
        Ok(())
    }

    /// Pulses the reset line, then polls for the device node.
    fn wait_device(&self) -> bool {
        info!("Initial HID reset and wait ...");
        if let Err(e) = self.reset_line.reset() {
            warn!("HID reset failed: {e}");
        }
        for _ in 0..self.presence_attempts {
            if self.phy.is_present() {
                info!("HID found");
                return true;
            }
            if self.stopped() {
                return false;
            }
            thread::sleep(self.presence_poll_interval);
        }
        error!("Missing HID");
        false
    }

    fn clear_queue(&self) {
        let dropped = self.events.try_iter().count();
        if dropped > 0 {
            debug!("dropped {dropped} pending HID events");
        }
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "unknown"
    }
}
