//! Runtime configuration.
//!
//! # Loading Priority
//!
//! 1. The file named by the `GATEKEEPER_CONFIG` environment variable (must exist)
//! 2. `gatekeeper.toml` in the working directory, if present
//! 3. Built-in defaults
//!
//! Every key is optional; missing keys take their default.
//!
//! ```toml
//! [serial]
//! port = "/dev/ttyUSB0"
//! baud_rate = 9600
//! read_timeout_ms = 1000
//! settle_delay_ms = 2000
//!
//! [roster]
//! path = "users_db.xlsx"
//!
//! [roster.columns]
//! uid = "UID номер карточки"
//! name = "Фамилия ИО"
//! expiry = "Срок окончания"
//!
//! [logging]
//! file = "gatekeeper.log"
//! level = "info"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use gatekeeper_device::SerialConfig;
use gatekeeper_roster::ColumnMapping;
use serde::{Deserialize, Serialize};

/// Environment variable naming an explicit configuration file.
pub const CONFIG_ENV: &str = "GATEKEEPER_CONFIG";

/// Configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "gatekeeper.toml";

pub const DEFAULT_ROSTER_PATH: &str = "users_db.xlsx";
pub const DEFAULT_LOG_FILE: &str = "gatekeeper.log";
pub const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatekeeperConfig {
    pub serial: SerialConfig,
    pub roster: RosterConfig,
    pub logging: LoggingConfig,
}

/// Where the cardholder roster lives and how its columns are named.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosterConfig {
    pub path: PathBuf,
    pub columns: ColumnMapping,
}

impl Default for RosterConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_ROSTER_PATH),
            columns: ColumnMapping::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log file, appended to and never rotated.
    pub file: PathBuf,

    /// Filter directive such as `info` or `gatekeeper_device=debug`.
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from(DEFAULT_LOG_FILE),
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

impl GatekeeperConfig {
    /// Load configuration following the documented priority.
    ///
    /// # Errors
    ///
    /// Fails if `GATEKEEPER_CONFIG` names a missing file, or if the selected
    /// file cannot be read or parsed.
    pub fn load() -> Result<Self> {
        let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        Self::load_from(explicit.as_deref(), Path::new(DEFAULT_CONFIG_FILE))
    }

    fn load_from(explicit: Option<&Path>, fallback: &Path) -> Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None if fallback.exists() => Self::from_file(fallback),
            None => Ok(Self::default()),
        }
    }

    /// Read and parse a TOML configuration file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatekeeper_core::constants::default_serial_port;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = GatekeeperConfig::default();
        assert_eq!(config.serial.port, default_serial_port());
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.roster.path, PathBuf::from("users_db.xlsx"));
        assert_eq!(config.roster.columns.uid, "UID номер карточки");
        assert_eq!(config.logging.file, PathBuf::from("gatekeeper.log"));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config(
            r#"
            [serial]
            port = "/dev/ttyACM0"

            [roster.columns]
            uid = "Card"
            "#,
        );

        let config = GatekeeperConfig::from_file(file.path()).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyACM0");
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.serial.settle_delay_ms, 2000);
        assert_eq!(config.roster.columns.uid, "Card");
        assert_eq!(config.roster.columns.name, "Фамилия ИО");
        assert_eq!(config.roster.path, PathBuf::from("users_db.xlsx"));
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_full_file() {
        let file = write_config(
            r#"
            [serial]
            port = "COM7"
            baud_rate = 115200
            read_timeout_ms = 250
            settle_delay_ms = 0

            [roster]
            path = "cards.csv"

            [logging]
            file = "/var/log/gatekeeper.log"
            level = "debug"
            "#,
        );

        let config = GatekeeperConfig::from_file(file.path()).unwrap();
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.serial.read_timeout_ms, 250);
        assert_eq!(config.serial.settle_delay_ms, 0);
        assert_eq!(config.roster.path, PathBuf::from("cards.csv"));
        assert_eq!(config.logging.level, "debug");
    }

    #[rstest]
    #[case("[serial]\nbaud_rate = \"fast\"\n")]
    #[case("[serial\n")]
    fn test_malformed_file_is_rejected(#[case] contents: &str) {
        let file = write_config(contents);
        let error = GatekeeperConfig::from_file(file.path()).unwrap_err();
        assert!(error.to_string().contains("failed to parse config file"));
    }

    #[test]
    fn test_missing_fallback_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config =
            GatekeeperConfig::load_from(None, &dir.path().join("gatekeeper.toml")).unwrap();
        assert_eq!(config, GatekeeperConfig::default());
    }

    #[test]
    fn test_present_fallback_is_read() {
        let file = write_config("[logging]\nlevel = \"warn\"\n");
        let config = GatekeeperConfig::load_from(None, file.path()).unwrap();
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");

        let error = GatekeeperConfig::load_from(Some(&missing), Path::new("unused")).unwrap_err();
        assert!(error.to_string().contains("failed to read config file"));
    }
}
