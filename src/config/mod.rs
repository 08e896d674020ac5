//! Configuration module for line-relay.
//!
//! TOML configuration with environment variable overrides.
//!
//! # Configuration Resolution
//!
//! 1. `--config <path>` on the command line
//! 2. `LINE_RELAY_CONFIG` environment variable (explicit path)
//! 3. `./line-relay.toml` (current directory)
//! 4. `~/.config/line-relay/config.toml` (XDG on Linux/macOS)
//! 5. `%APPDATA%\line-relay\config.toml` (Windows)
//! 6. Built-in defaults: `data.txt` relayed to `COM9` at 9600 8N1
//!
//! # Example
//!
//! ```toml
//! [relay]
//! queue_file = "data.txt"
//! delete_policy = "after-attempt"
//!
//! [serial]
//! port = "/dev/ttyUSB0"
//! baud_rate = 9600
//! data_bits = 8
//! stop_bits = 1
//! parity = "none"
//!
//! [logging]
//! level = "info"
//! format = "compact"
//! ```

mod error;
mod loader;
mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{get_default_config_path, resolve_config_path, validate, ConfigLoader};
pub use schema::{Config, DeletePolicy, LogFormat, LoggingConfig, RelayConfig, SerialConfig};
