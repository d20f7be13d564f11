//! Application layer of the HID engine.
//!
//! - **`process_request`** – One request/response exchange with the chip,
//!   including retries, response classification and status parsing.  Also
//!   defines the `Connection` boundary the transports implement.
//!
//! - **`event_worker`** – The worker thread: waits for the device, owns the
//!   open connection and drains the event queue.  Defines the `Phy` and
//!   `ResetLine` boundaries.
//!
//! - **`device_state`** – The published device snapshot, its change poller
//!   and the host-facing report.
//!
//! - **`hid`** – `Ch9329Hid`, the handle producers and consumers use.
//!
//! This layer knows nothing about serial ports or GPIO; infrastructure
//! implementations are injected at construction time.

pub mod device_state;
pub mod event_worker;
pub mod hid;
pub mod process_request;
