//! Finds the config file, parses it and layers `LINE_RELAY_*` overrides on top.
//!
//! A file that exists but cannot be read, parsed or validated is an error.
//! Only the absence of any file falls back to built-in defaults.

use super::error::{ConfigError, ConfigResult};
use super::schema::{Config, LogFormat};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable prefix for overrides
const ENV_PREFIX: &str = "LINE_RELAY";

/// Config file name looked up in the working directory
const LOCAL_CONFIG_FILE_NAME: &str = "line-relay.toml";

/// Config file name inside the per-user config directory
const CONFIG_FILE_NAME: &str = "config.toml";

/// Application directory under the per-user config directory
const APP_DIR_NAME: &str = "line-relay";

/// Environment variable naming the config file explicitly
const CONFIG_PATH_ENV: &str = "LINE_RELAY_CONFIG";

/// A loaded configuration and the file it came from.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// File the configuration was read from, `None` for built-in defaults
    pub config_path: Option<PathBuf>,
    pub config: Config,
}

impl ConfigLoader {
    /// Load configuration using the standard lookup.
    ///
    /// 1. `LINE_RELAY_CONFIG` (must exist when set)
    /// 2. `./line-relay.toml`
    /// 3. `~/.config/line-relay/config.toml`, or `%APPDATA%\line-relay\config.toml`
    /// 4. Built-in defaults
    pub fn load() -> ConfigResult<Self> {
        match resolve_config_path() {
            Some(path) => Self::load_from(path),
            None => Self::with_defaults(),
        }
    }

    /// Load configuration from `path`. A missing file is an error.
    pub fn load_from(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut config = load_from_file(&path)?;
        apply_env_overrides(&mut config)?;
        validate(&config)?;

        Ok(Self {
            config_path: Some(path),
            config,
        })
    }

    /// Built-in defaults with `LINE_RELAY_*` overrides applied.
    pub fn with_defaults() -> ConfigResult<Self> {
        let mut config = Config::default();
        apply_env_overrides(&mut config)?;
        validate(&config)?;

        Ok(Self {
            config_path: None,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn into_config(self) -> Config {
        self.config
    }
}

/// The config file the standard lookup would use, if any.
///
/// `LINE_RELAY_CONFIG` is returned even when the file does not exist, so that
/// a mistyped path is reported instead of silently skipped.
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let cwd_config = PathBuf::from(LOCAL_CONFIG_FILE_NAME);
    if cwd_config.exists() {
        return Some(cwd_config);
    }

    get_default_config_path().filter(|p| p.exists())
}

fn get_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var("APPDATA").ok().map(PathBuf::from)
    }

    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .filter(|d| !d.is_empty())
            .map(PathBuf::from)
            .or_else(|| {
                std::env::var("HOME")
                    .ok()
                    .map(|h| PathBuf::from(h).join(".config"))
            })
    }
}

/// Per-user config file location, whether or not it exists.
pub fn get_default_config_path() -> Option<PathBuf> {
    get_config_dir().map(|d| d.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
}

fn load_from_file(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    debug!(path = %path.display(), "loading configuration file");
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn env_var(suffix: &str) -> (String, Option<String>) {
    let name = format!("{}_{}", ENV_PREFIX, suffix);
    let value = std::env::var(&name).ok();
    (name, value)
}

/// Apply environment variable overrides to the configuration.
///
/// Recognised variables:
/// - `LINE_RELAY_QUEUE_FILE`
/// - `LINE_RELAY_SERIAL_PORT`
/// - `LINE_RELAY_SERIAL_BAUD`
/// - `LINE_RELAY_LOG_LEVEL`
/// - `LINE_RELAY_LOG_FORMAT`
fn apply_env_overrides(config: &mut Config) -> ConfigResult<()> {
    if let (_, Some(val)) = env_var("QUEUE_FILE") {
        config.relay.queue_file = PathBuf::from(val);
    }

    if let (_, Some(val)) = env_var("SERIAL_PORT") {
        config.serial.port = val;
    }
    if let (name, Some(val)) = env_var("SERIAL_BAUD") {
        config.serial.baud_rate = val
            .parse()
            .map_err(|_| ConfigError::env(name, format!("'{val}' is not a baud rate")))?;
    }

    if let (_, Some(val)) = env_var("LOG_LEVEL") {
        config.logging.level = val;
    }
    if let (name, Some(val)) = env_var("LOG_FORMAT") {
        config.logging.format = val
            .parse::<LogFormat>()
            .map_err(|message| ConfigError::env(name, message))?;
    }

    Ok(())
}

/// Reject values that would only fail later, mid-run.
pub fn validate(config: &Config) -> ConfigResult<()> {
    if config.relay.queue_file.as_os_str().is_empty() {
        return Err(ConfigError::invalid("relay.queue_file", "no queue file given"));
    }
    if config.serial.port.trim().is_empty() {
        return Err(ConfigError::invalid("serial.port", "no port name given"));
    }
    if config.serial.baud_rate == 0 {
        return Err(ConfigError::invalid("serial.baud_rate", "must be above zero"));
    }
    if config.serial.timeout_ms == 0 {
        return Err(ConfigError::invalid("serial.timeout_ms", "must be above zero"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    #[test]
    #[serial]
    fn test_default_loader() {
        let loader = ConfigLoader::with_defaults().unwrap();
        assert_eq!(loader.config().serial.baud_rate, 9600);
        assert!(loader.config_path.is_none());
    }

    #[test]
    #[serial]
    fn test_env_override() {
        env::set_var("LINE_RELAY_SERIAL_PORT", "/dev/ttyUSB7");
        env::set_var("LINE_RELAY_SERIAL_BAUD", "115200");

        let loader = ConfigLoader::with_defaults().unwrap();
        assert_eq!(loader.config().serial.port, "/dev/ttyUSB7");
        assert_eq!(loader.config().serial.baud_rate, 115200);

        env::remove_var("LINE_RELAY_SERIAL_PORT");
        env::remove_var("LINE_RELAY_SERIAL_BAUD");
    }

    #[test]
    #[serial]
    fn test_queue_file_and_log_format_overrides() {
        env::set_var("LINE_RELAY_QUEUE_FILE", "/tmp/outbox.txt");
        env::set_var("LINE_RELAY_LOG_FORMAT", "json");

        let config = ConfigLoader::with_defaults().unwrap().into_config();
        assert_eq!(config.relay.queue_file, PathBuf::from("/tmp/outbox.txt"));
        assert_eq!(config.logging.format, LogFormat::Json);

        env::remove_var("LINE_RELAY_QUEUE_FILE");
        env::remove_var("LINE_RELAY_LOG_FORMAT");
    }

    #[test]
    #[serial]
    fn test_bad_env_value_is_reported_not_reset() {
        env::set_var("LINE_RELAY_SERIAL_PORT", "/dev/ttyS3");
        env::set_var("LINE_RELAY_SERIAL_BAUD", "fast");

        let err = ConfigLoader::with_defaults().unwrap_err();
        assert!(matches!(err, ConfigError::Env { ref var, .. } if var == "LINE_RELAY_SERIAL_BAUD"));

        env::remove_var("LINE_RELAY_SERIAL_PORT");
        env::remove_var("LINE_RELAY_SERIAL_BAUD");
    }

    #[test]
    #[serial]
    fn test_bad_log_format_env() {
        env::set_var("LINE_RELAY_LOG_FORMAT", "xml");

        let mut config = Config::default();
        let err = apply_env_overrides(&mut config).unwrap_err();
        assert!(matches!(err, ConfigError::Env { ref var, .. } if var == "LINE_RELAY_LOG_FORMAT"));

        env::remove_var("LINE_RELAY_LOG_FORMAT");
    }

    #[test]
    #[serial]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        std::fs::write(&path, "[serial]\nport = \"COM3\"\n").unwrap();

        let loader = ConfigLoader::load_from(&path).unwrap();
        assert_eq!(loader.config().serial.port, "COM3");
        assert_eq!(loader.config_path.as_deref(), Some(path.as_path()));
    }

    #[test]
    #[serial]
    fn test_load_from_missing_file() {
        let err = ConfigLoader::load_from("/nonexistent/line-relay.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    #[serial]
    fn test_load_from_unknown_variant_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        std::fs::write(&path, "[relay]\ndelete_policy = \"after-succes\"\n").unwrap();

        let err = ConfigLoader::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { path: ref p, .. } if p == &path));
    }

    #[test]
    #[serial]
    fn test_load_from_invalid_value_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        std::fs::write(&path, "[serial]\nport = \"  \"\n").unwrap();

        let err = ConfigLoader::load_from(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "serial.port", .. }));
    }

    #[test]
    fn test_validate_rejects_zero_baud() {
        let mut config = Config::default();
        config.serial.baud_rate = 0;
        assert!(matches!(
            validate(&config),
            Err(ConfigError::Invalid { key: "serial.baud_rate", .. })
        ));
    }
}
