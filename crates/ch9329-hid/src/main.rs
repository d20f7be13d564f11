//! CH9329 HID daemon entry point.
//!
//! Loads the configuration, opens the reset line, starts the engine against
//! the configured serial port and logs every device state change as a JSON
//! report until Ctrl-C.
//!
//! ```text
//! main()
//!  └─ load_config()              -- TOML file or defaults
//!  └─ Ch9329Hid::start()         -- spawns the worker thread
//!  └─ state loop
//!       ├─ state changed -> log HidStateReport as JSON
//!       └─ Ctrl-C        -> cleanup() and exit
//! ```

use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ch9329_hid::application::event_worker::ResetLine;
use ch9329_hid::infrastructure::{
    reset::{NoResetLine, SysfsResetLine},
    serial::SerialPhy,
    storage::config::{config_file_path, load_config},
};
use ch9329_hid::{Ch9329Hid, HidStateReport};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config().context("failed to load configuration")?;

    // RUST_LOG wins over the configured level.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.daemon.log_level)),
        )
        .init();

    info!("CH9329 HID daemon starting");
    if let Ok(path) = config_file_path() {
        info!("config file: {}", path.display());
    }

    // ── Collaborators ─────────────────────────────────────────────────────────
    let phy = Arc::new(SerialPhy::new(
        config.serial.device.clone(),
        config.serial.speed,
        config.read_timeout(),
    ));

    let reset_line: Arc<dyn ResetLine> = match config.reset_pin() {
        Some(pin) => Arc::new(
            SysfsResetLine::open(
                config.reset.gpio_root.clone(),
                pin,
                config.reset.reset_inverted,
                config.reset_delay(),
            )
            .with_context(|| format!("failed to set up reset pin {pin}"))?,
        ),
        None => Arc::new(NoResetLine),
    };

    // ── Engine ────────────────────────────────────────────────────────────────
    let mut hid = Ch9329Hid::start(config.hid_settings(), phy, reset_line)?;
    let mut poller = hid.poll_state();

    // ── State loop ────────────────────────────────────────────────────────────
    loop {
        tokio::select! {
            state = poller.next() => {
                let Some(state) = state else { break };
                let report = HidStateReport::from(state);
                info!("HID state: {}", serde_json::to_string(&report)?);
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for Ctrl-C")?;
                info!("shutdown signal received");
                break;
            }
        }
    }

    // The worker blocks on the serial port, so join it off the async runtime.
    tokio::task::spawn_blocking(move || hid.cleanup()).await?;
    info!("CH9329 HID daemon stopped");
    Ok(())
}
