//! TOML configuration for the HID daemon.
//!
//! The file is looked up in this order:
//! - `$CH9329_CONFIG` if set
//! - `$XDG_CONFIG_HOME/ch9329-hid/config.toml`
//! - `~/.config/ch9329-hid/config.toml`
//!
//! A missing file is not an error: every field has a default, so the daemon
//! runs against `/dev/ttyUSB0` at 115200 baud out of the box.
//!
//! ```toml
//! [hid]
//! read_retries = 5
//! common_retries = 5
//! retries_delay = 0.5
//! errors_threshold = 5
//! noop = false
//!
//! [serial]
//! device = "/dev/ttyUSB0"
//! speed = 115200
//! read_timeout = 5.0
//!
//! [reset]
//! gpio_root = "/sys/class/gpio"
//! reset_pin = -1
//! reset_inverted = false
//! reset_delay = 0.1
//!
//! [daemon]
//! log_level = "info"
//! ```
//!
//! # Serde default values
//!
//! Fields annotated with `#[serde(default = "some_fn")]` use the return value
//! of `some_fn()` when the field is absent, so partial files are valid.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::application::process_request::HidSettings;

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV_VAR: &str = "CH9329_CONFIG";

/// Baud rates accepted for the serial link.
pub const STANDARD_BAUD_RATES: &[u32] = &[
    50, 75, 110, 134, 150, 200, 300, 600, 1200, 1800, 2400, 4800, 9600, 19200, 38400, 57600,
    115200, 230400, 460800, 500000, 576000, 921600, 1000000, 1152000, 1500000, 2000000,
    2500000, 3000000, 3500000, 4000000,
];

/// Smallest accepted value for any delay or timeout, in seconds.
const MIN_SECONDS: f64 = 0.1;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither `$CH9329_CONFIG`, `$XDG_CONFIG_HOME` nor `$HOME` is set.
    #[error("could not determine config directory")]
    NoConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is outside its accepted range.
    #[error("invalid config value {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

// ── Config schema types ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub hid: HidConfig,
    #[serde(default)]
    pub serial: SerialConfig,
    #[serde(default)]
    pub reset: ResetConfig,
    #[serde(default)]
    pub daemon: DaemonConfig,
}

/// Retry engine settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct HidConfig {
    #[serde(default = "default_retries")]
    pub read_retries: u32,
    #[serde(default = "default_retries")]
    pub common_retries: u32,
    /// Seconds between attempts of one request.
    #[serde(default = "default_retries_delay")]
    pub retries_delay: f64,
    #[serde(default = "default_errors_threshold")]
    pub errors_threshold: usize,
    #[serde(default)]
    pub noop: bool,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SerialConfig {
    #[serde(default = "default_device")]
    pub device: PathBuf,
    #[serde(default = "default_speed")]
    pub speed: u32,
    /// Seconds to wait for each part of a response.
    #[serde(default = "default_read_timeout")]
    pub read_timeout: f64,
}

/// GPIO reset line.  A negative pin disables it.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ResetConfig {
    #[serde(default = "default_gpio_root")]
    pub gpio_root: PathBuf,
    #[serde(default = "default_reset_pin")]
    pub reset_pin: i32,
    #[serde(default)]
    pub reset_inverted: bool,
    /// Seconds the line is held active.
    #[serde(default = "default_reset_delay")]
    pub reset_delay: f64,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct DaemonConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_retries() -> u32 {
    5
}
fn default_retries_delay() -> f64 {
    0.5
}
fn default_errors_threshold() -> usize {
    5
}
fn default_device() -> PathBuf {
    PathBuf::from("/dev/ttyUSB0")
}
fn default_speed() -> u32 {
    115_200
}
fn default_read_timeout() -> f64 {
    5.0
}
fn default_gpio_root() -> PathBuf {
    PathBuf::from("/sys/class/gpio")
}
fn default_reset_pin() -> i32 {
    -1
}
fn default_reset_delay() -> f64 {
    0.1
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for HidConfig {
    fn default() -> Self {
        Self {
            read_retries: default_retries(),
            common_retries: default_retries(),
            retries_delay: default_retries_delay(),
            errors_threshold: default_errors_threshold(),
            noop: false,
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            speed: default_speed(),
            read_timeout: default_read_timeout(),
        }
    }
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            gpio_root: default_gpio_root(),
            reset_pin: default_reset_pin(),
            reset_inverted: false,
            reset_delay: default_reset_delay(),
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

// ── Validation and conversion ─────────────────────────────────────────────────

impl AppConfig {
    /// Checks every range constraint.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hid.read_retries < 1 {
            return Err(invalid("hid.read_retries", "must be at least 1"));
        }
        if self.hid.common_retries < 1 {
            return Err(invalid("hid.common_retries", "must be at least 1"));
        }
        check_seconds("hid.retries_delay", self.hid.retries_delay)?;
        check_seconds("serial.read_timeout", self.serial.read_timeout)?;
        check_seconds("reset.reset_delay", self.reset.reset_delay)?;
        if !STANDARD_BAUD_RATES.contains(&self.serial.speed) {
            return Err(invalid(
                "serial.speed",
                format!("{} is not a standard baud rate", self.serial.speed),
            ));
        }
        Ok(())
    }

    /// Engine settings derived from the `[hid]` section.
    pub fn hid_settings(&self) -> HidSettings {
        HidSettings {
            read_retries: self.hid.read_retries,
            common_retries: self.hid.common_retries,
            retries_delay: Duration::from_secs_f64(self.hid.retries_delay),
            errors_threshold: self.hid.errors_threshold,
            noop: self.hid.noop,
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.serial.read_timeout)
    }

    pub fn reset_delay(&self) -> Duration {
        Duration::from_secs_f64(self.reset.reset_delay)
    }

    /// The configured reset pin, or `None` when disabled.
    pub fn reset_pin(&self) -> Option<u32> {
        u32::try_from(self.reset.reset_pin).ok()
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}

fn check_seconds(field: &'static str, value: f64) -> Result<(), ConfigError> {
    // NaN fails the comparison and is rejected too.
    if !(value >= MIN_SECONDS) {
        return Err(invalid(field, format!("{value} is below {MIN_SECONDS} seconds")));
    }
    if Duration::try_from_secs_f64(value).is_err() {
        return Err(invalid(field, format!("{value} seconds is out of range")));
    }
    Ok(())
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Resolves the full path to the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoConfigDir`] if no base directory can be determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
        return Ok(PathBuf::from(path));
    }
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .ok_or(ConfigError::NoConfigDir)?;
    Ok(base.join("ch9329-hid").join("config.toml"))
}

/// Loads and validates the config from the default location.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads and validates the config at `path`, returning defaults if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// [`ConfigError::Parse`] for malformed TOML and [`ConfigError::Invalid`]
/// for out-of-range values.
pub fn load_config_from(path: &std::path::Path) -> Result<AppConfig, ConfigError> {
    let cfg = match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str::<AppConfig>(&content)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => AppConfig::default(),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    cfg.validate()?;
    Ok(cfg)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    // ── Defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn test_app_config_default_matches_documented_values() {
        // Arrange / Act
        let cfg = AppConfig::default();

        // Assert
        assert_eq!(cfg.hid.read_retries, 5);
        assert_eq!(cfg.hid.common_retries, 5);
        assert_eq!(cfg.hid.retries_delay, 0.5);
        assert_eq!(cfg.hid.errors_threshold, 5);
        assert!(!cfg.hid.noop);
        assert_eq!(cfg.serial.device, PathBuf::from("/dev/ttyUSB0"));
        assert_eq!(cfg.serial.speed, 115_200);
        assert_eq!(cfg.serial.read_timeout, 5.0);
        assert_eq!(cfg.reset.reset_pin, -1);
        assert_eq!(cfg.daemon.log_level, "info");
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_hid_settings_converts_seconds_to_durations() {
        let settings = AppConfig::default().hid_settings();

        assert_eq!(settings, HidSettings::default());
    }

    #[test]
    fn test_negative_reset_pin_disables_reset_line() {
        let mut cfg = AppConfig::default();
        assert_eq!(cfg.reset_pin(), None);

        cfg.reset.reset_pin = 17;
        assert_eq!(cfg.reset_pin(), Some(17));
    }

    // ── Parsing ───────────────────────────────────────────────────────────────

    #[test]
    fn test_deserialize_empty_toml_uses_defaults() {
        let cfg: AppConfig = toml::from_str("").expect("deserialize empty");

        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_deserialize_partial_section_overrides_defaults() {
        // Arrange
        let toml_str = r#"
[serial]
device = "/dev/ttyAMA0"
speed = 9600
"#;

        // Act
        let cfg: AppConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert_eq!(cfg.serial.device, PathBuf::from("/dev/ttyAMA0"));
        assert_eq!(cfg.serial.speed, 9600);
        // Unspecified fields keep their defaults
        assert_eq!(cfg.serial.read_timeout, 5.0);
        assert_eq!(cfg.hid.common_retries, 5);
    }

    #[test]
    fn test_deserialize_invalid_toml_returns_parse_error() {
        let result: Result<AppConfig, toml::de::Error> = toml::from_str("[[[ not valid toml");

        assert!(result.is_err());
    }

    // ── Validation ────────────────────────────────────────────────────────────

    #[test]
    fn test_validate_rejects_zero_retries() {
        let mut cfg = AppConfig::default();
        cfg.hid.common_retries = 0;

        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid {
                field: "hid.common_retries",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_sub_minimum_delays() {
        for (field, patch) in [
            ("hid.retries_delay", (|c: &mut AppConfig| c.hid.retries_delay = 0.05) as fn(&mut AppConfig)),
            ("serial.read_timeout", |c: &mut AppConfig| c.serial.read_timeout = 0.0),
            ("reset.reset_delay", |c: &mut AppConfig| c.reset.reset_delay = f64::NAN),
        ] {
            // Arrange
            let mut cfg = AppConfig::default();
            patch(&mut cfg);

            // Act
            let result = cfg.validate();

            // Assert
            assert!(
                matches!(result, Err(ConfigError::Invalid { field: f, .. }) if f == field),
                "{field} must be rejected"
            );
        }
    }

    #[test]
    fn test_validate_rejects_durations_too_large_to_represent() {
        // Arrange
        let mut cfg = AppConfig::default();
        cfg.hid.retries_delay = 1e30;

        // Act
        let result = cfg.validate();

        // Assert
        assert!(matches!(
            result,
            Err(ConfigError::Invalid {
                field: "hid.retries_delay",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_infinite_read_timeout() {
        let mut cfg = AppConfig::default();
        cfg.serial.read_timeout = f64::INFINITY;

        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid {
                field: "serial.read_timeout",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_non_standard_baud_rate() {
        let mut cfg = AppConfig::default();
        cfg.serial.speed = 12345;

        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Invalid {
                field: "serial.speed",
                ..
            })
        ));
    }

    // ── Loading ───────────────────────────────────────────────────────────────

    #[test]
    fn test_load_config_returns_default_when_file_absent() {
        let path = PathBuf::from("/nonexistent/path/that/cannot/exist/config.toml");

        let cfg = load_config_from(&path).unwrap();

        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_load_config_reads_and_validates_file() {
        // Arrange
        let dir = std::env::temp_dir().join(format!("ch9329_test_{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[hid]\nnoop = true\n[daemon]\nlog_level = \"debug\"\n").unwrap();

        // Act
        let cfg = load_config_from(&path).unwrap();

        // Assert
        assert!(cfg.hid.noop);
        assert_eq!(cfg.daemon.log_level, "debug");

        // Cleanup
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_config_rejects_huge_delay_before_conversion() {
        // Arrange
        let dir = std::env::temp_dir().join(format!("ch9329_test_{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[hid]\nretries_delay = 1e30\n").unwrap();

        // Act
        let result = load_config_from(&path);

        // Assert
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_config_surfaces_validation_errors() {
        // Arrange
        let dir = std::env::temp_dir().join(format!("ch9329_test_{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.toml");
        std::fs::write(&path, "[hid]\nread_retries = 0\n").unwrap();

        // Act
        let result = load_config_from(&path);

        // Assert
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_config_file_path_ends_with_config_toml_or_override() {
        match config_file_path() {
            Ok(path) if std::env::var_os(CONFIG_ENV_VAR).is_none() => {
                assert!(path.ends_with("ch9329-hid/config.toml"), "got {path:?}");
            }
            // Overridden or no base directory in a stripped environment.
            _ => {}
        }
    }
}
