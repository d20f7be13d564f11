//! Protocol module containing the frame codec, command codes and HID events.

pub mod commands;
pub mod events;
pub mod frame;

pub use commands::{CommandCode, DeviceErrorCode};
pub use events::{EventError, HidEvent};
pub use frame::{build_frame, verify_frame, Frame, FrameError, FrameHeader};
