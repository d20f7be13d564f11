//! ch9329-hid library entry point.
//!
//! Re-exports all public modules so that integration tests in `tests/`
//! and the binary entry point in `main.rs` share the same module tree.
//!
//! # What does ch9329-hid do?
//!
//! A CH9329 is a small chip that appears to a target computer as a USB
//! keyboard and mouse, while taking its orders over a UART.  This crate is
//! the engine on the other end of that UART:
//!
//! 1. Producers hand it key and mouse intents through [`Ch9329Hid`].
//! 2. A single worker thread turns each intent into a checksummed frame,
//!    sends it and checks the chip's acknowledgement, retrying transient
//!    failures.
//! 3. While idle, the worker probes the chip's status so the USB link state
//!    and keyboard LEDs stay current.
//! 4. Consumers read or await that state without touching the serial port.

/// Application layer: request processing, the worker and the state publisher.
pub mod application;

/// Infrastructure layer: serial and mock transports, reset lines, config.
pub mod infrastructure;

pub use application::device_state::{DeviceState, HidStateReport};
pub use application::hid::{Ch9329Hid, HidError};
pub use application::process_request::HidSettings;
