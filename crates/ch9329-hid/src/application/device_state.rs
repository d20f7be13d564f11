//! Last-known chip status and change notification for consumers.
//!
//! The worker thread is the only writer.  Any number of readers can take a
//! snapshot or hold a [`StatePoller`] that wakes when a field changes.
//!
//! # Why a `watch` channel?
//!
//! A `tokio::sync::watch` channel keeps exactly one value and wakes every
//! receiver when it is replaced.  Readers never block the writer, and a slow
//! reader simply skips intermediate states and sees the newest one.

use futures::stream::{self, Stream};
use serde::Serialize;
use tokio::sync::watch;

/// Snapshot of the chip as seen by the engine.
///
/// Every field is `false` until the first successful status probe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeviceState {
    /// The chip answered and reports its USB side as connected.
    pub online: bool,
    /// A hardware reset is in progress.
    pub busy: bool,
    pub num_lock: bool,
    pub caps_lock: bool,
    pub scroll_lock: bool,
}

/// Keyboard LED bits carried in byte 2 of a `GET_INFO` response payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedStatus {
    pub num_lock: bool,
    pub caps_lock: bool,
    pub scroll_lock: bool,
}

impl LedStatus {
    /// Decodes the status byte: bit 0 num, bit 1 caps, bit 2 scroll.
    pub fn from_status_byte(status: u8) -> Self {
        Self {
            num_lock: status & 0b001 != 0,
            caps_lock: status & 0b010 != 0,
            scroll_lock: status & 0b100 != 0,
        }
    }
}

// ── Publisher ─────────────────────────────────────────────────────────────────

/// Holds the current [`DeviceState`] and notifies pollers on change.
pub struct StatePublisher {
    tx: watch::Sender<DeviceState>,
}

impl StatePublisher {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(DeviceState::default());
        Self { tx }
    }

    /// Returns a copy of the current state.
    pub fn snapshot(&self) -> DeviceState {
        *self.tx.borrow()
    }

    /// Applies `f` to the state and wakes pollers only if a field changed.
    pub fn update(&self, f: impl FnOnce(&mut DeviceState)) {
        self.tx.send_if_modified(|state| {
            let before = *state;
            f(state);
            *state != before
        });
    }

    pub fn set_online(&self, online: bool) {
        self.update(|state| state.online = online);
    }

    pub fn set_busy(&self, busy: bool) {
        self.update(|state| state.busy = busy);
    }

    /// Publishes the result of a successful status probe.
    ///
    /// A status answer means any reset has completed, so `busy` is cleared.
    pub fn set_status(&self, online: bool, leds: LedStatus) {
        self.update(|state| {
            state.online = online;
            state.busy = false;
            state.num_lock = leds.num_lock;
            state.caps_lock = leds.caps_lock;
            state.scroll_lock = leds.scroll_lock;
        });
    }

    /// Starts a new poller positioned before the current state.
    pub fn poll(&self) -> StatePoller {
        StatePoller {
            rx: self.tx.subscribe(),
            last: None,
        }
    }
}

impl Default for StatePublisher {
    fn default() -> Self {
        Self::new()
    }
}

// ── Poller ────────────────────────────────────────────────────────────────────

/// Yields the current state once, then every distinct state that follows.
pub struct StatePoller {
    rx: watch::Receiver<DeviceState>,
    last: Option<DeviceState>,
}

impl StatePoller {
    /// Waits until the state differs from the last one yielded.
    ///
    /// Returns `None` once the publisher has been dropped.
    pub async fn next(&mut self) -> Option<DeviceState> {
        loop {
            let current = *self.rx.borrow_and_update();
            if self.last != Some(current) {
                self.last = Some(current);
                return Some(current);
            }
            // Wakeups for writes that restored an equal value are rechecked.
            self.rx.changed().await.ok()?;
        }
    }

    /// Adapts the poller into a [`Stream`].
    pub fn into_stream(self) -> impl Stream<Item = DeviceState> {
        stream::unfold(self, |mut poller| async move {
            let state = poller.next().await?;
            Some((state, poller))
        })
    }
}

// ── Host-facing report ────────────────────────────────────────────────────────

/// Keyboard LED block of a [`HidStateReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedsReport {
    pub caps: bool,
    pub scroll: bool,
    pub num: bool,
}

/// Output selection block.  The chip exposes a single fixed output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutputsReport {
    pub available: Vec<String>,
    pub active: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyboardReport {
    pub online: bool,
    pub leds: LedsReport,
    pub outputs: OutputsReport,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MouseReport {
    pub online: bool,
    pub absolute: bool,
    pub outputs: OutputsReport,
}

/// State as presented to the hosting application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HidStateReport {
    pub online: bool,
    pub busy: bool,
    pub connected: bool,
    pub keyboard: KeyboardReport,
    pub mouse: MouseReport,
}

impl From<DeviceState> for HidStateReport {
    fn from(state: DeviceState) -> Self {
        Self {
            online: state.online,
            busy: state.busy,
            connected: state.online,
            keyboard: KeyboardReport {
                online: state.online,
                leds: LedsReport {
                    caps: state.caps_lock,
                    scroll: state.scroll_lock,
                    num: state.num_lock,
                },
                outputs: OutputsReport::default(),
            },
            mouse: MouseReport {
                online: state.online,
                absolute: true,
                outputs: OutputsReport::default(),
            },
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
