//! Key code tables for the CH9329 keyboard report.
//!
//! The canonical representation is USB HID Usage IDs (page 0x07,
//! Keyboard/Keypad).  Hosts name keys with web `KeyboardEvent.code` strings,
//! which are translated here before a report is built.

pub mod hid;

pub use hid::HidKeyCode;
