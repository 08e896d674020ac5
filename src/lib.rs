//! Serial Line Relay Library
//!
//! Sends the lines of a plain-text queue file to a serial device one at a
//! time, rewriting the file after each line so it only ever holds what is
//! still pending.
//!
//! # Modules
//!
//! - `config`: Configuration management with TOML support
//! - `error`: Relay error type
//! - `logging`: `tracing` subscriber setup
//! - `port`: Port abstraction layer for serial communication
//! - `queue`: Loading and rewriting the queue file
//! - `relay`: The send/dequeue/persist loop

pub mod config;
pub mod error;
pub mod logging;
pub mod port;
pub mod queue;
pub mod relay;

// Re-export commonly used types for convenience
pub use error::{RelayError, RelayResult};
pub use port::{
    DataBits, MockPortOpener, MockSerialPort, Parity, PortConfiguration, PortError, PortOpener,
    SerialPortAdapter, StopBits, SyncSerialPort, SystemPortOpener,
};
pub use queue::{append_lines, load_queue, persist_remaining, persist_remaining_atomic, LineQueue};
pub use relay::{send_line, LineRelay, RelaySettings, RelayState, RunReport, LINE_TERMINATOR};

// Re-export config types
pub use config::{Config, ConfigError, ConfigLoader, ConfigResult, DeletePolicy};
