//! Relay-level error type.
//!
//! Queue file I/O, port writes and port opens each have their own variant;
//! `is_port_open` tells the unavailable-device case apart for logging. None of
//! them is fatal to the process; the relay logs them and moves on.

use crate::port::PortError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by queue and relay operations.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The queue file is missing or could not be read.
    #[error("Failed to read queue file '{path}': {source}")]
    QueueRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The remaining lines could not be written back.
    #[error("Failed to write queue file '{path}': {source}")]
    QueueWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The serial device is unavailable or busy.
    #[error("Failed to open serial port '{port}': {source}")]
    PortOpen {
        port: String,
        #[source]
        source: PortError,
    },

    /// The port opened but writing or flushing the line failed.
    #[error("Failed to write to serial port '{port}': {source}")]
    PortWrite {
        port: String,
        #[source]
        source: PortError,
    },
}

impl RelayError {
    /// The serial device could not be opened.
    pub fn is_port_open(&self) -> bool {
        matches!(self, Self::PortOpen { .. })
    }
}

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;
