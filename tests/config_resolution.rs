//! Config file lookup order and the overrides layered on top of it.
//!
//! These tests move the working directory and edit the environment, so every
//! one of them runs under `#[serial]`.

use pretty_assertions::assert_eq;
use serial_line_relay::config::{resolve_config_path, ConfigLoader, LogFormat};
use serial_line_relay::ConfigError;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const LOOKUP_VARS: &[&str] = &[
    "LINE_RELAY_CONFIG",
    "LINE_RELAY_QUEUE_FILE",
    "LINE_RELAY_SERIAL_PORT",
    "LINE_RELAY_SERIAL_BAUD",
    "LINE_RELAY_LOG_LEVEL",
    "LINE_RELAY_LOG_FORMAT",
    "XDG_CONFIG_HOME",
    "HOME",
    "APPDATA",
];

/// Runs a test inside a fresh working directory with the lookup variables
/// cleared, and puts everything back on drop.
struct Sandbox {
    dir: TempDir,
    old_cwd: PathBuf,
    old_env: Vec<(&'static str, Option<String>)>,
}

impl Sandbox {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let old_cwd = env::current_dir().expect("current dir");
        let old_env = LOOKUP_VARS.iter().map(|k| (*k, env::var(k).ok())).collect();
        for key in LOOKUP_VARS {
            env::remove_var(key);
        }
        env::set_current_dir(dir.path()).expect("enter temp dir");
        Self {
            dir,
            old_cwd,
            old_env,
        }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn write(&self, relative: &str, body: &str) -> PathBuf {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, body).unwrap();
        path
    }
}

impl Drop for Sandbox {
    fn drop(&mut self) {
        let _ = env::set_current_dir(&self.old_cwd);
        for (key, value) in &self.old_env {
            match value {
                Some(v) => env::set_var(key, v),
                None => env::remove_var(key),
            }
        }
    }
}

#[test]
#[serial]
fn explicit_env_path_wins_over_local_file() {
    let sandbox = Sandbox::new();
    sandbox.write("line-relay.toml", "[serial]\nport = \"LOCAL\"\n");
    let chosen = sandbox.write("elsewhere/relay.toml", "[serial]\nport = \"FROM_ENV\"\n");
    env::set_var("LINE_RELAY_CONFIG", &chosen);

    let loader = ConfigLoader::load().unwrap();
    assert_eq!(loader.config().serial.port, "FROM_ENV");
    assert_eq!(loader.config_path.as_deref(), Some(chosen.as_path()));
}

#[test]
#[serial]
fn explicit_env_path_that_does_not_exist_is_an_error() {
    let sandbox = Sandbox::new();
    sandbox.write("line-relay.toml", "[serial]\nport = \"LOCAL\"\n");
    env::set_var("LINE_RELAY_CONFIG", sandbox.path().join("typo.toml"));

    let err = ConfigLoader::load().unwrap_err();
    assert!(matches!(err, ConfigError::Read { .. }), "{err}");
}

#[test]
#[serial]
fn local_file_in_working_directory_is_used() {
    let sandbox = Sandbox::new();
    sandbox.write(
        "line-relay.toml",
        "[relay]\nqueue_file = \"outbox.txt\"\n\n[serial]\nport = \"LOCAL\"\n",
    );

    assert_eq!(resolve_config_path(), Some(PathBuf::from("line-relay.toml")));
    let config = ConfigLoader::load().unwrap().into_config();
    assert_eq!(config.serial.port, "LOCAL");
    assert_eq!(config.relay.queue_file, PathBuf::from("outbox.txt"));
}

#[cfg(not(windows))]
#[test]
#[serial]
fn user_config_directory_is_used_when_no_local_file() {
    let sandbox = Sandbox::new();
    let xdg = sandbox.path().join("xdg");
    let expected = sandbox.write("xdg/line-relay/config.toml", "[serial]\nport = \"USER\"\n");
    env::set_var("XDG_CONFIG_HOME", &xdg);

    let loader = ConfigLoader::load().unwrap();
    assert_eq!(loader.config().serial.port, "USER");
    assert_eq!(loader.config_path, Some(expected));
}

#[cfg(not(windows))]
#[test]
#[serial]
fn local_file_shadows_user_config_directory() {
    let sandbox = Sandbox::new();
    sandbox.write("xdg/line-relay/config.toml", "[serial]\nport = \"USER\"\n");
    sandbox.write("line-relay.toml", "[serial]\nport = \"LOCAL\"\n");
    env::set_var("XDG_CONFIG_HOME", sandbox.path().join("xdg"));

    assert_eq!(ConfigLoader::load().unwrap().config().serial.port, "LOCAL");
}

#[test]
#[serial]
fn defaults_apply_only_when_no_file_exists() {
    let sandbox = Sandbox::new();
    env::set_var("XDG_CONFIG_HOME", sandbox.path().join("empty-xdg"));

    let loader = ConfigLoader::load().unwrap();
    assert!(loader.config_path.is_none());
    assert_eq!(loader.config().serial.port, "COM9");
    assert_eq!(loader.config().relay.queue_file, PathBuf::from("data.txt"));
}

#[test]
#[serial]
fn malformed_local_file_is_an_error_not_defaults() {
    let sandbox = Sandbox::new();
    sandbox.write("line-relay.toml", "[relay]\ndelete_policy = \"after-succes\"\n");

    let err = ConfigLoader::load().unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "{err}");
}

#[test]
#[serial]
fn queue_file_and_log_format_env_override_file_values() {
    let sandbox = Sandbox::new();
    sandbox.write(
        "line-relay.toml",
        "[relay]\nqueue_file = \"from-file.txt\"\n\n[logging]\nformat = \"pretty\"\n",
    );
    env::set_var("LINE_RELAY_QUEUE_FILE", "from-env.txt");
    env::set_var("LINE_RELAY_LOG_FORMAT", "compact");

    let config = ConfigLoader::load().unwrap().into_config();
    assert_eq!(config.relay.queue_file, PathBuf::from("from-env.txt"));
    assert_eq!(config.logging.format, LogFormat::Compact);
}

#[test]
#[serial]
fn bad_env_override_fails_even_with_a_valid_file() {
    let sandbox = Sandbox::new();
    sandbox.write("line-relay.toml", "[serial]\nport = \"LOCAL\"\n");
    env::set_var("LINE_RELAY_LOG_FORMAT", "xml");

    let err = ConfigLoader::load().unwrap_err();
    assert!(
        matches!(err, ConfigError::Env { ref var, .. } if var == "LINE_RELAY_LOG_FORMAT"),
        "{err}"
    );
}
