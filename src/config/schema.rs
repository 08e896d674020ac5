//! Configuration schema definitions.
//!
//! Every section uses `#[serde(default)]`, so a config file only needs the
//! keys it wants to change.

use crate::port::{DataBits, Parity, PortConfiguration, StopBits};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Queue file handling
    pub relay: RelayConfig,
    /// Serial port configuration
    pub serial: SerialConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Queue file section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Path of the queue file
    pub queue_file: PathBuf,
    /// When a processed line leaves the queue file
    pub delete_policy: DeletePolicy,
    /// Rewrite the queue file through a temporary file and rename
    pub atomic_persist: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            queue_file: PathBuf::from("data.txt"),
            delete_policy: DeletePolicy::default(),
            atomic_persist: false,
        }
    }
}

/// When a line is removed from the queue file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeletePolicy {
    /// Remove the line once its send was attempted, whatever the outcome.
    #[default]
    AfterAttempt,
    /// Keep lines whose send failed in the file for a later run.
    AfterSuccess,
}

impl std::str::FromStr for DeletePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "after-attempt" => Ok(Self::AfterAttempt),
            "after-success" => Ok(Self::AfterSuccess),
            other => Err(format!(
                "unknown delete policy '{other}' (expected after-attempt or after-success)"
            )),
        }
    }
}

/// Serial port section. Fixed for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Port name, e.g. "COM9" or "/dev/ttyUSB0"
    pub port: String,
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub stop_bits: StopBits,
    pub parity: Parity,
    /// Write timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        let line = PortConfiguration::default();
        Self {
            port: "COM9".to_string(),
            baud_rate: line.baud_rate,
            data_bits: line.data_bits,
            stop_bits: line.stop_bits,
            parity: line.parity,
            timeout_ms: line.timeout.as_millis() as u64,
        }
    }
}

impl SerialConfig {
    /// Get the write timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Line parameters to apply on every open.
    pub fn port_configuration(&self) -> PortConfiguration {
        PortConfiguration {
            baud_rate: self.baud_rate,
            data_bits: self.data_bits,
            parity: self.parity,
            stop_bits: self.stop_bits,
            timeout: self.timeout(),
        }
    }
}

/// Logging section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive: "trace", "debug", "info", "warn", "error" or a full
    /// `EnvFilter` expression
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// JSON format
    Json,
    /// Pretty format with colors
    #[default]
    Pretty,
    /// Compact format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}
