//! `Ch9329Hid`: the handle producers talk to.
//!
//! Events are validated on the caller's thread and queued; the worker thread
//! turns them into frames.  State is read from the shared [`StatePublisher`]
//! without ever blocking on the worker.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::JoinHandle;

use ch9329_core::{EventError, HidEvent};
use crossbeam::channel::{unbounded, Receiver, Sender};
use thiserror::Error;
use tracing::{debug, info, warn};

use super::device_state::{DeviceState, HidStateReport, StatePoller, StatePublisher};
use super::event_worker::{
    EventWorker, Phy, ResetLine, PRESENCE_ATTEMPTS, PRESENCE_POLL_INTERVAL,
};
use super::process_request::HidSettings;

/// Error returned when the engine cannot be started.
#[derive(Debug, Error)]
pub enum HidError {
    #[error("failed to spawn the HID worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

pub struct Ch9329Hid {
    // Dropped by `cleanup` so the worker sees the queue close.
    events_tx: Option<Sender<HidEvent>>,
    // Kept so producers can drain the queue on `clear`.
    events_rx: Receiver<HidEvent>,
    state: Arc<StatePublisher>,
    stop: Arc<AtomicBool>,
    reset_required: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
}

impl Ch9329Hid {
    /// Spawns the worker thread and returns the handle.
    ///
    /// # Errors
    ///
    /// Returns [`HidError::Spawn`] if the OS refuses to create the thread.
    pub fn start(
        settings: HidSettings,
        phy: Arc<dyn Phy>,
        reset_line: Arc<dyn ResetLine>,
    ) -> Result<Self, HidError> {
        let (events_tx, events_rx) = unbounded();
        let state = Arc::new(StatePublisher::new());
        let stop = Arc::new(AtomicBool::new(false));
        let reset_required = Arc::new(AtomicBool::new(false));

        info!(
            "starting HID engine (read_retries={}, common_retries={}, noop={})",
            settings.read_retries, settings.common_retries, settings.noop
        );
        let worker = EventWorker {
            settings,
            phy,
            reset_line,
            state: Arc::clone(&state),
            events: events_rx.clone(),
            stop: Arc::clone(&stop),
            reset_required: Arc::clone(&reset_required),
            presence_poll_interval: PRESENCE_POLL_INTERVAL,
            presence_attempts: PRESENCE_ATTEMPTS,
        }
        .spawn()
        .map_err(HidError::Spawn)?;

        Ok(Self {
            events_tx: Some(events_tx),
            events_rx,
            state,
            stop,
            reset_required,
            worker: Some(worker),
        })
    }

    // ── Producers ─────────────────────────────────────────────────────────────

    /// Queues key presses and releases in order.
    ///
    /// Every key is validated before any is queued, so an unknown name
    /// leaves the queue untouched.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::UnknownKey`] for the first unknown key name.
    pub fn send_key_events<'a, I>(&self, keys: I) -> Result<(), EventError>
    where
        I: IntoIterator<Item = (&'a str, bool)>,
    {
        let events = keys
            .into_iter()
            .map(|(name, pressed)| HidEvent::key(name, pressed))
            .collect::<Result<Vec<_>, _>>()?;
        for event in events {
            self.queue_event(event, false);
        }
        Ok(())
    }

    pub fn send_mouse_button_event(&self, button: &str, pressed: bool) -> Result<(), EventError> {
        self.queue_event(HidEvent::mouse_button(button, pressed)?, false);
        Ok(())
    }

    pub fn send_mouse_move_event(&self, to_x: i32, to_y: i32) -> Result<(), EventError> {
        self.queue_event(HidEvent::mouse_move(to_x, to_y)?, false);
        Ok(())
    }

    pub fn send_mouse_relative_event(&self, delta_x: i32, delta_y: i32) -> Result<(), EventError> {
        self.queue_event(HidEvent::mouse_relative(delta_x, delta_y)?, false);
        Ok(())
    }

    pub fn send_mouse_wheel_event(&self, delta_x: i32, delta_y: i32) -> Result<(), EventError> {
        self.queue_event(HidEvent::mouse_wheel(delta_x, delta_y)?, false);
        Ok(())
    }

    /// Discards every event not yet taken by the worker.
    pub fn clear_events(&self) {
        let dropped = self.events_rx.try_iter().count();
        if dropped > 0 {
            debug!("cleared {dropped} pending HID events");
        }
    }

    /// Appends an already validated event, optionally discarding the queue
    /// first.
    ///
    /// Events queued by other producers between the discard and the append
    /// survive the clear.
    pub fn queue_event(&self, event: HidEvent, clear: bool) {
        let Some(events_tx) = self.events_tx.as_ref() else {
            return;
        };
        if self.stop.load(Ordering::Acquire) {
            return;
        }
        if clear {
            self.clear_events();
        }
        if events_tx.send(event).is_err() {
            warn!("HID worker is gone; dropping {event:?}");
        }
    }

    /// Asks the worker to reset the chip, through the reset line when one is
    /// wired.  A reset already pending is not repeated.
    pub fn reset(&self) {
        if !self.reset_required.swap(true, Ordering::AcqRel) {
            info!("HID reset requested");
        }
    }

    // ── State ─────────────────────────────────────────────────────────────────

    pub fn get_state(&self) -> DeviceState {
        self.state.snapshot()
    }

    pub fn state_report(&self) -> HidStateReport {
        self.get_state().into()
    }

    /// A poller yielding the current state, then every change.
    pub fn poll_state(&self) -> StatePoller {
        self.state.poll()
    }

    // ── Shutdown ──────────────────────────────────────────────────────────────

    /// Stops the worker and waits for it.  Events already queued are still
    /// sent once.  Calling it again is a no-op.
    pub fn cleanup(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        info!("Stopping HID daemon ...");
        self.stop.store(true, Ordering::Release);
        self.events_tx = None;
        if worker.join().is_err() {
            warn!("HID worker thread panicked during shutdown");
        }
    }
}

impl Drop for Ch9329Hid {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::mock::MockChip;
    use crate::infrastructure::reset::RecordingResetLine;
    use ch9329_core::protocol::events::KEYBOARD_RELEASE_FRAME;
    use std::time::{Duration, Instant};

    fn settings() -> HidSettings {
        HidSettings {
            retries_delay: Duration::from_millis(10),
            ..HidSettings::default()
        }
    }

    fn start(chip: &MockChip) -> (Ch9329Hid, RecordingResetLine) {
        let reset_line = RecordingResetLine::new();
        let hid = Ch9329Hid::start(
            settings(),
            Arc::new(chip.clone()),
            Arc::new(reset_line.clone()),
        )
        .unwrap();
        (hid, reset_line)
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_unknown_key_queues_nothing() {
        // Arrange
        let chip = MockChip::new();
        chip.set_present(false);
        let (hid, _) = start(&chip);

        // Act
        let result = hid.send_key_events([("KeyA", true), ("NoSuchKey", true)]);

        // Assert
        assert!(matches!(result, Err(EventError::UnknownKey(name)) if name == "NoSuchKey"));
        assert!(hid.events_rx.is_empty());
    }

    #[test]
    fn test_invalid_mouse_parameters_are_rejected() {
        let chip = MockChip::new();
        chip.set_present(false);
        let (hid, _) = start(&chip);

        assert!(hid.send_mouse_button_event("side", true).is_err());
        assert!(hid.send_mouse_relative_event(128, 0).is_err());
        assert!(hid.send_mouse_wheel_event(0, -128).is_err());
        assert!(hid.send_mouse_move_event(40_000, 0).is_err());
        assert!(hid.events_rx.is_empty());
    }

    #[test]
    fn test_clear_flag_discards_earlier_events() {
        // Arrange: no device, so nothing is consumed
        let chip = MockChip::new();
        chip.set_present(false);
        let (hid, _) = start(&chip);
        hid.send_mouse_relative_event(1, 1).unwrap();
        hid.send_mouse_relative_event(2, 2).unwrap();

        // Act
        let last = HidEvent::mouse_relative(3, 3).unwrap();
        hid.queue_event(last, true);

        // Assert
        let pending: Vec<HidEvent> = hid.events_rx.try_iter().collect();
        assert_eq!(pending, vec![last]);
    }

    #[test]
    fn test_key_events_reach_the_chip_in_order() {
        // Arrange
        let chip = MockChip::new();
        let (hid, _) = start(&chip);

        // Act
        hid.send_key_events([("KeyA", true), ("KeyA", false)]).unwrap();

        // Assert
        assert!(wait_until(|| chip.requests_with_command(0x02).len() == 2));
        let keys = chip.requests_with_command(0x02);
        assert_ne!(keys[0], keys[1]);
        assert_eq!(keys[1], KEYBOARD_RELEASE_FRAME.to_vec());
    }

    #[test]
    fn test_reset_pulses_line_once_more_than_startup() {
        // Arrange
        let chip = MockChip::new();
        let (hid, reset_line) = start(&chip);
        assert!(wait_until(|| chip.opens() == 1));
        let baseline = reset_line.pulses();

        // Act
        hid.reset();
        hid.reset();

        // Assert
        assert!(wait_until(|| reset_line.pulses() == baseline + 1));
    }

    #[test]
    fn test_cleanup_stops_worker_and_closes_transport() {
        // Arrange
        let chip = MockChip::new();
        let (mut hid, _) = start(&chip);
        assert!(wait_until(|| chip.opens() == 1));

        // Act
        hid.cleanup();
        hid.cleanup();

        // Assert
        assert_eq!(chip.closes(), 1);
        assert!(hid.events_tx.is_none());
        let before = chip.requests().len();
        hid.send_mouse_relative_event(1, 1).unwrap();
        assert!(hid.events_rx.is_empty(), "stopped engine must not queue");
        assert_eq!(chip.requests().len(), before);
    }

    #[test]
    fn test_state_report_follows_probe() {
        // Arrange
        let chip = MockChip::new();
        chip.set_leds(0b010);
        let (hid, _) = start(&chip);

        // Act
        assert!(wait_until(|| hid.get_state().online));

        // Assert
        let report = hid.state_report();
        assert!(report.online);
        assert!(report.keyboard.leds.caps);
        assert!(!report.keyboard.leds.num);
    }
}
