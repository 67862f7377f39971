//! Link and pacing settings for the DAQ card.
//!
//! The card is a fixed-format device: 8 data bits, no parity, 1 stop bit,
//! XON/XOFF flow control. Those never change and are hardwired into the
//! serial transport. What does vary between setups is the port path, the
//! baud rate, the read timeout, and how long the card needs between
//! commands, so those live here and can be overridden from a TOML file
//! passed to the CLI via `--config`.
//!
//! ## Configuration
//!
//! ```toml
//! [serial]
//! port = "/dev/ttyUSB0"
//! baud_rate = 115200
//! read_timeout_ms = 500
//!
//! [timing]
//! settle_ms = 500
//! command_delay_ms = 100
//! retry_delay_ms = 10
//! ```
//!
//! Every field has a default matching the card's documented behavior, so an
//! empty file (or no file at all) yields a working configuration.

use crate::error::{AppResult, DaqError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Serial port parameters for the card link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialSettings {
    /// Port path (e.g. "/dev/ttyUSB0", "COM3")
    #[serde(default = "default_port")]
    pub port: String,
    /// Baud rate; the card talks at 115200
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
    /// Read timeout in milliseconds; expiry surfaces as an empty line, not
    /// an error
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

impl SerialSettings {
    /// Read timeout as a [`Duration`].
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: default_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

/// Delays the card firmware needs around commands.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimingSettings {
    /// Settle time after opening the port, before the first command
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    /// Pause after configuration and start/stop commands
    #[serde(default = "default_command_delay_ms")]
    pub command_delay_ms: u64,
    /// Pause before re-reading after an unparseable status line
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl TimingSettings {
    /// Post-open settle time as a [`Duration`].
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    /// Post-command delay as a [`Duration`].
    pub fn command_delay(&self) -> Duration {
        Duration::from_millis(self.command_delay_ms)
    }

    /// Read-retry delay as a [`Duration`].
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            settle_ms: default_settle_ms(),
            command_delay_ms: default_command_delay_ms(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

/// Top-level settings: one serial link, one set of delays.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaqSettings {
    /// Serial link parameters
    #[serde(default)]
    pub serial: SerialSettings,
    /// Command pacing
    #[serde(default)]
    pub timing: TimingSettings,
}

fn default_port() -> String {
    "/dev/ttyUSB0".to_string()
}

fn default_baud_rate() -> u32 {
    115_200
}

fn default_read_timeout_ms() -> u64 {
    500
}

fn default_settle_ms() -> u64 {
    500
}

fn default_command_delay_ms() -> u64 {
    100
}

fn default_retry_delay_ms() -> u64 {
    10
}

impl DaqSettings {
    /// Load settings from a TOML file and validate them.
    ///
    /// Missing fields take their defaults, so a partial file is fine.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let settings: Self = toml::from_str(&raw).map_err(|e| {
            DaqError::Config(format!(
                "invalid settings file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check the values make sense before anything touches the port.
    pub fn validate(&self) -> AppResult<()> {
        if self.serial.port.is_empty() {
            return Err(DaqError::Config(
                "serial port path cannot be empty".to_string(),
            ));
        }
        if self.serial.baud_rate == 0 {
            return Err(DaqError::Config("baud_rate must be > 0".to_string()));
        }
        if self.serial.read_timeout_ms == 0 {
            return Err(DaqError::Config(
                "read_timeout_ms must be > 0; the card needs a bounded blocking read".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_the_card() {
        let settings = DaqSettings::default();
        assert_eq!(settings.serial.port, "/dev/ttyUSB0");
        assert_eq!(settings.serial.baud_rate, 115_200);
        assert_eq!(settings.serial.read_timeout(), Duration::from_millis(500));
        assert_eq!(settings.timing.settle(), Duration::from_millis(500));
        assert_eq!(settings.timing.command_delay(), Duration::from_millis(100));
        assert_eq!(settings.timing.retry_delay(), Duration::from_millis(10));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let settings: DaqSettings = toml::from_str(
            r#"
            [serial]
            port = "/dev/ttyACM3"
            "#,
        )
        .unwrap();
        assert_eq!(settings.serial.port, "/dev/ttyACM3");
        assert_eq!(settings.serial.baud_rate, 115_200);
        assert_eq!(settings.timing.command_delay_ms, 100);
    }

    #[test]
    fn test_empty_port_rejected() {
        let settings: DaqSettings = toml::from_str(
            r#"
            [serial]
            port = ""
            "#,
        )
        .unwrap();
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("port"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let settings: DaqSettings = toml::from_str(
            r#"
            [serial]
            read_timeout_ms = 0
            "#,
        )
        .unwrap();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[timing]\nsettle_ms = 50\ncommand_delay_ms = 5\nretry_delay_ms = 1"
        )
        .unwrap();

        let settings = DaqSettings::load_from(file.path()).unwrap();
        assert_eq!(settings.timing.settle_ms, 50);
        assert_eq!(settings.serial.baud_rate, 115_200);
    }

    #[test]
    fn test_load_from_garbage_is_config_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "this is not toml [").unwrap();

        let err = DaqSettings::load_from(file.path()).unwrap_err();
        assert!(err.to_string().starts_with("Configuration error"));
    }
}
