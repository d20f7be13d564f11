//! # ch9329-core
//!
//! Shared library for the CH9329 HID bridge containing the serial frame codec,
//! the HID event model, and key code lookup tables.
//!
//! This crate is pure: it has no dependencies on serial ports, threads, or
//! the async runtime.  The engine that drives a real chip lives in
//! `ch9329-hid`.
//!
//! # Architecture overview
//!
//! The CH9329 is a small WCH chip that appears to a target computer as a USB
//! keyboard and mouse, while being controlled from the other side through a
//! UART.  Every UART message is a checksummed *frame*:
//!
//! ```text
//! [0x57 0xAB 0x00][command:1][len:1][payload:len][checksum:1]
//! ```
//!
//! - **`protocol`** – Frame building and validation (`frame`), the chip's
//!   command and acknowledgement codes (`commands`), and the closed set of
//!   user intents that encode to frames (`events`).
//!
//! - **`keymap`** – Web key names (`"KeyA"`, `"ShiftLeft"`, ...) mapped to
//!   USB HID Usage IDs, which is what the chip expects in a keyboard report.
//!
//! - **`mouse`** – The generic absolute pointer range used by hosts.

pub mod keymap;
pub mod mouse;
pub mod protocol;

pub use keymap::hid::HidKeyCode;
pub use protocol::events::{EventError, HidEvent};
pub use protocol::frame::{build_frame, verify_frame, Frame, FrameError};
