//! Infrastructure layer of the HID engine.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `ch9329_core`, but MUST NOT be imported by the `application` layer
//! outside of tests.
//!
//! # Sub-modules
//!
//! - **`serial`** – `Phy`/`Connection` over a real UART via `serialport`.
//! - **`mock`** – A scripted in-memory chip for tests and dry runs.
//! - **`reset`** – `ResetLine` implementations (none, sysfs GPIO, recorder).
//! - **`storage`** – TOML configuration.

pub mod mock;
pub mod reset;
pub mod serial;
pub mod storage;
