//! Keyboard and mouse intents and their CH9329 report encodings.
//!
//! An [`HidEvent`] can only be built through its validating constructors, so
//! [`HidEvent::encode`] never fails.  Each event encodes to exactly one frame.

use thiserror::Error;

use crate::keymap::hid::HidKeyCode;
use crate::mouse::{to_device_coordinate, DELTA_LIMIT, MOUSE_MAX, MOUSE_MIN};
use crate::protocol::commands::{
    CommandCode, KEYBOARD_REPORT_LEN, MOUSE_ABSOLUTE_MODE, MOUSE_ABSOLUTE_REPORT_LEN,
    MOUSE_RELATIVE_MODE, MOUSE_RELATIVE_REPORT_LEN,
};
use crate::protocol::frame::{build_frame, Frame};

// ── Canonical frames ──────────────────────────────────────────────────────────

/// Keyboard report with no key held.
pub const KEYBOARD_RELEASE_FRAME: [u8; 14] = [
    0x57, 0xAB, 0x00, 0x02, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x0C,
];

/// Relative mouse report with no button held and no motion.
pub const MOUSE_RELEASE_FRAME: [u8; 11] = [
    0x57, 0xAB, 0x00, 0x05, 0x05, 0x01, 0x00, 0x00, 0x00, 0x00, 0x0D,
];

/// Status probe (`GET_INFO`); also used as keep-alive and resync request.
pub const GET_INFO_FRAME: [u8; 6] = [0x57, 0xAB, 0x00, 0x01, 0x00, 0x03];

/// Software reset of the chip.
pub const RESET_FRAME: [u8; 6] = [0x57, 0xAB, 0x00, 0x0F, 0x00, 0x11];

/// Wheel byte for one notch up.
const WHEEL_UP: u8 = 0x01;

/// Wheel byte for one notch down.
const WHEEL_DOWN: u8 = 0x81;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Rejections raised while building an event from host input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error("unknown key: {0:?}")]
    UnknownKey(String),

    #[error("unknown mouse button: {0:?}")]
    UnknownButton(String),

    #[error("invalid parameter {name}={value}: expected {min}..={max}")]
    InvalidParameter {
        name: &'static str,
        value: i32,
        min: i32,
        max: i32,
    },
}

// ── Mouse buttons ─────────────────────────────────────────────────────────────

/// Named mouse buttons.  `Up` and `Down` are wheel notches, not bitmask buttons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    Left,
    Right,
    Middle,
    Up,
    Down,
}

impl MouseButton {
    /// Parses the host-facing button name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "left" => Some(MouseButton::Left),
            "right" => Some(MouseButton::Right),
            "middle" => Some(MouseButton::Middle),
            "up" => Some(MouseButton::Up),
            "down" => Some(MouseButton::Down),
            _ => None,
        }
    }

    /// `(buttons, wheel)` bytes of a relative report with this button pressed.
    fn report_bytes(self) -> (u8, u8) {
        match self {
            MouseButton::Left => (0x01, 0x00),
            MouseButton::Right => (0x02, 0x00),
            MouseButton::Middle => (0x04, 0x00),
            MouseButton::Up => (0x00, WHEEL_UP),
            MouseButton::Down => (0x00, WHEEL_DOWN),
        }
    }
}

// ── Events ────────────────────────────────────────────────────────────────────

/// One host intent destined for the chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HidEvent {
    Key { key: HidKeyCode, pressed: bool },
    MouseButton { button: MouseButton, pressed: bool },
    MouseMove { to_x: i16, to_y: i16 },
    MouseRelative { delta_x: i8, delta_y: i8 },
    MouseWheel { delta_x: i8, delta_y: i8 },
}

impl HidEvent {
    /// Key press or release by web key name (`"KeyA"`, `"Enter"`, ...).
    ///
    /// # Errors
    ///
    /// [`EventError::UnknownKey`] if the name is not in the key table.
    pub fn key(name: &str, pressed: bool) -> Result<Self, EventError> {
        let key =
            HidKeyCode::from_web_name(name).ok_or_else(|| EventError::UnknownKey(name.to_owned()))?;
        Ok(HidEvent::Key { key, pressed })
    }

    /// Mouse button press or release (`left`, `right`, `middle`, `up`, `down`).
    ///
    /// # Errors
    ///
    /// [`EventError::UnknownButton`] for any other name.
    pub fn mouse_button(name: &str, pressed: bool) -> Result<Self, EventError> {
        let button = MouseButton::from_name(name)
            .ok_or_else(|| EventError::UnknownButton(name.to_owned()))?;
        Ok(HidEvent::MouseButton { button, pressed })
    }

    /// Absolute move to a position in the generic `MOUSE_MIN..=MOUSE_MAX` range.
    ///
    /// # Errors
    ///
    /// [`EventError::InvalidParameter`] if either coordinate is out of range.
    pub fn mouse_move(to_x: i32, to_y: i32) -> Result<Self, EventError> {
        Ok(HidEvent::MouseMove {
            to_x: checked_coordinate("to_x", to_x)?,
            to_y: checked_coordinate("to_y", to_y)?,
        })
    }

    /// Relative move by `-127..=127` on each axis.
    ///
    /// # Errors
    ///
    /// [`EventError::InvalidParameter`] if either delta is out of range.
    pub fn mouse_relative(delta_x: i32, delta_y: i32) -> Result<Self, EventError> {
        Ok(HidEvent::MouseRelative {
            delta_x: checked_delta("delta_x", delta_x)?,
            delta_y: checked_delta("delta_y", delta_y)?,
        })
    }

    /// Wheel scroll by `-127..=127` on each axis.  Only the vertical axis
    /// reaches the chip.
    ///
    /// # Errors
    ///
    /// [`EventError::InvalidParameter`] if either delta is out of range.
    pub fn mouse_wheel(delta_x: i32, delta_y: i32) -> Result<Self, EventError> {
        Ok(HidEvent::MouseWheel {
            delta_x: checked_delta("delta_x", delta_x)?,
            delta_y: checked_delta("delta_y", delta_y)?,
        })
    }

    /// Encodes the event into its request frame.
    pub fn encode(&self) -> Frame {
        match *self {
            HidEvent::Key { key, pressed: true } => {
                let mut report = [0u8; KEYBOARD_REPORT_LEN];
                report[2] = key.as_u8();
                build_frame(CommandCode::SendKeyboardGeneral.as_u8(), &report)
            }
            HidEvent::Key { pressed: false, .. } => keyboard_release(),
            HidEvent::MouseButton { button, pressed: true } => {
                let (buttons, wheel) = button.report_bytes();
                relative_report([MOUSE_RELATIVE_MODE, buttons, 0x00, 0x00, wheel])
            }
            HidEvent::MouseButton { pressed: false, .. } => mouse_release(),
            HidEvent::MouseMove { to_x, to_y } => {
                let [x_lo, x_hi] = to_device_coordinate(i32::from(to_x)).to_le_bytes();
                let [y_lo, y_hi] = to_device_coordinate(i32::from(to_y)).to_le_bytes();
                let report: [u8; MOUSE_ABSOLUTE_REPORT_LEN] =
                    [MOUSE_ABSOLUTE_MODE, 0x00, x_lo, x_hi, y_lo, y_hi, 0x00];
                build_frame(CommandCode::SendMouseAbsolute.as_u8(), &report)
            }
            HidEvent::MouseRelative { delta_x, delta_y } => relative_report([
                MOUSE_RELATIVE_MODE,
                0x00,
                relative_byte(delta_x),
                relative_byte(delta_y),
                0x00,
            ]),
            HidEvent::MouseWheel { delta_y, .. } => {
                relative_report([MOUSE_RELATIVE_MODE, 0x00, 0x00, 0x00, wheel_byte(delta_y)])
            }
        }
    }
}

/// The canonical keyboard release frame.
pub fn keyboard_release() -> Frame {
    build_frame(
        CommandCode::SendKeyboardGeneral.as_u8(),
        &[0u8; KEYBOARD_REPORT_LEN],
    )
}

/// The canonical mouse release frame.
pub fn mouse_release() -> Frame {
    relative_report([MOUSE_RELATIVE_MODE, 0x00, 0x00, 0x00, 0x00])
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn relative_report(report: [u8; MOUSE_RELATIVE_REPORT_LEN]) -> Frame {
    build_frame(CommandCode::SendMouseRelative.as_u8(), &report)
}

fn checked_coordinate(name: &'static str, value: i32) -> Result<i16, EventError> {
    if !(MOUSE_MIN..=MOUSE_MAX).contains(&value) {
        return Err(EventError::InvalidParameter {
            name,
            value,
            min: MOUSE_MIN,
            max: MOUSE_MAX,
        });
    }
    Ok(value as i16)
}

fn checked_delta(name: &'static str, value: i32) -> Result<i8, EventError> {
    if !(-DELTA_LIMIT..=DELTA_LIMIT).contains(&value) {
        return Err(EventError::InvalidParameter {
            name,
            value,
            min: -DELTA_LIMIT,
            max: DELTA_LIMIT,
        });
    }
    Ok(value as i8)
}

/// `delta + 127`, so -127..=127 maps onto 0..=254.
fn relative_byte(delta: i8) -> u8 {
    (i32::from(delta) + DELTA_LIMIT).clamp(0, 2 * DELTA_LIMIT) as u8
}

/// `floor((delta + 127) / 2)`, so -127..=127 maps onto 0..=127.
fn wheel_byte(delta: i8) -> u8 {
    ((i32::from(delta) + DELTA_LIMIT).max(0) / 2) as u8
}
