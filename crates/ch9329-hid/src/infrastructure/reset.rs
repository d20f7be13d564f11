//! Hardware reset lines for the chip.
//!
//! - [`NoResetLine`]: no pin wired; pulses are no-ops and explicit resets
//!   are sent to the chip as its reset command instead.
//! - [`SysfsResetLine`]: drives a GPIO pin through `/sys/class/gpio`.
//! - [`RecordingResetLine`]: counts pulses, for tests.

use std::path::{Path, PathBuf};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use tracing::{debug, info};

use crate::application::event_worker::{ResetError, ResetLine};

/// Used when no reset pin is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResetLine;

impl ResetLine for NoResetLine {
    fn reset(&self) -> Result<(), ResetError> {
        debug!("no reset pin configured; skipping HID reset");
        Ok(())
    }

    fn is_wired(&self) -> bool {
        false
    }
}

/// A GPIO output held inactive, pulsed active for `delay` on reset.
#[derive(Debug, Clone)]
pub struct SysfsResetLine {
    root: PathBuf,
    pin: u32,
    inverted: bool,
    delay: Duration,
}

impl SysfsResetLine {
    /// Exports `pin` under `root` if needed and drives it to its idle level.
    ///
    /// # Errors
    ///
    /// Returns [`ResetError::Io`] if the pin cannot be exported or configured.
    pub fn open(
        root: impl Into<PathBuf>,
        pin: u32,
        inverted: bool,
        delay: Duration,
    ) -> Result<Self, ResetError> {
        let line = Self {
            root: root.into(),
            pin,
            inverted,
            delay,
        };
        if !line.pin_dir().exists() {
            write_sysfs(&line.root.join("export"), &pin.to_string())?;
        }
        write_sysfs(&line.pin_dir().join("direction"), "out")?;
        line.set_active(false)?;
        info!("using GPIO {pin} as HID reset line");
        Ok(line)
    }

    fn pin_dir(&self) -> PathBuf {
        self.root.join(format!("gpio{}", self.pin))
    }

    fn set_active(&self, active: bool) -> Result<(), ResetError> {
        let level = if active != self.inverted { "1" } else { "0" };
        write_sysfs(&self.pin_dir().join("value"), level)
    }
}

impl ResetLine for SysfsResetLine {
    fn reset(&self) -> Result<(), ResetError> {
        info!("pulsing HID reset line (GPIO {})", self.pin);
        self.set_active(true)?;
        std::thread::sleep(self.delay);
        self.set_active(false)
    }
}

fn write_sysfs(path: &Path, value: &str) -> Result<(), ResetError> {
    std::fs::write(path, value).map_err(|source| ResetError::Io {
        path: path.display().to_string(),
        source,
    })
}

/// Counts reset pulses.  Clones share the counter.
#[derive(Debug, Clone, Default)]
pub struct RecordingResetLine {
    pulses: Arc<AtomicUsize>,
}

impl RecordingResetLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pulses(&self) -> usize {
        self.pulses.load(Ordering::Acquire)
    }
}

impl ResetLine for RecordingResetLine {
    fn reset(&self) -> Result<(), ResetError> {
        self.pulses.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}
