//! The relay loop: load the queue file, then send, dequeue and persist one
//! line at a time until nothing is left.
//!
//! # Order of operations per line
//!
//! ```text
//! pop front line ──> send_line ──> persist remainder
//!                    (open, write, flush, close)
//! ```
//!
//! The port is opened and closed for every line. After each iteration the
//! queue file holds exactly the lines that are still pending, plus any lines
//! retained by [`DeletePolicy::AfterSuccess`].

use crate::config::{Config, DeletePolicy};
use crate::error::{RelayError, RelayResult};
use crate::port::{PortConfiguration, PortOpener, SerialPortAdapter};
use crate::queue::{self, LineQueue};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Terminator appended to every transmitted line.
pub const LINE_TERMINATOR: &[u8] = b"\n";

/// Where the relay loop stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayState {
    /// Lines remain to be processed.
    Pending,
    /// The queue is exhausted or the source could not be read.
    Done,
}

/// Outcome of one call to [`LineRelay::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Lines loaded from the queue file.
    pub loaded: usize,
    /// Lines written and flushed to the port.
    pub sent: usize,
    /// Lines whose port open or write failed.
    pub failed: usize,
    /// Failed lines kept in the queue file.
    pub retained: usize,
    /// Rewrites of the queue file that failed.
    pub persist_errors: usize,
    /// The queue file could not be read, so nothing was attempted.
    pub load_failed: bool,
}

/// Relay settings, independent of where they came from.
#[derive(Debug, Clone, PartialEq)]
pub struct RelaySettings {
    pub queue_file: PathBuf,
    pub port_name: String,
    pub port_config: PortConfiguration,
    pub delete_policy: DeletePolicy,
    pub atomic_persist: bool,
}

impl RelaySettings {
    /// Settings for `queue_file` and `port_name` with 9600 8N1 and the
    /// default delete policy.
    pub fn new(queue_file: impl Into<PathBuf>, port_name: impl Into<String>) -> Self {
        Self {
            queue_file: queue_file.into(),
            port_name: port_name.into(),
            port_config: PortConfiguration::default(),
            delete_policy: DeletePolicy::default(),
            atomic_persist: false,
        }
    }

    pub fn with_delete_policy(mut self, policy: DeletePolicy) -> Self {
        self.delete_policy = policy;
        self
    }

    pub fn with_atomic_persist(mut self, atomic: bool) -> Self {
        self.atomic_persist = atomic;
        self
    }
}

impl From<&Config> for RelaySettings {
    fn from(config: &Config) -> Self {
        Self {
            queue_file: config.relay.queue_file.clone(),
            port_name: config.serial.port.clone(),
            port_config: config.serial.port_configuration(),
            delete_policy: config.relay.delete_policy,
            atomic_persist: config.relay.atomic_persist,
        }
    }
}

/// Open `port_name`, write `text` plus the line terminator, flush, close.
///
/// The port handle is dropped on every path out of this function, so the
/// device is released even when the write fails.
pub fn send_line<O: PortOpener>(
    opener: &O,
    port_name: &str,
    config: &PortConfiguration,
    text: &str,
) -> RelayResult<()> {
    let mut port = opener
        .open(port_name, config)
        .map_err(|source| RelayError::PortOpen {
            port: port_name.to_string(),
            source,
        })?;

    let write_err = |source| RelayError::PortWrite {
        port: port_name.to_string(),
        source,
    };

    port.write_all(text.as_bytes()).map_err(write_err)?;
    port.write_all(LINE_TERMINATOR).map_err(write_err)?;
    port.flush().map_err(write_err)?;

    debug!(port = port.name(), bytes = text.len() + LINE_TERMINATOR.len(), "line sent");
    Ok(())
}

/// Drives the queue file through a port opener.
#[derive(Debug)]
pub struct LineRelay<O: PortOpener> {
    opener: O,
    settings: RelaySettings,
    state: RelayState,
}

impl<O: PortOpener> LineRelay<O> {
    pub fn new(opener: O, settings: RelaySettings) -> Self {
        Self {
            opener,
            settings,
            state: RelayState::Pending,
        }
    }

    /// State after the last call to [`LineRelay::run`].
    pub fn state(&self) -> RelayState {
        self.state
    }

    /// Send one line with the configured port and line settings.
    pub fn send_line(&self, text: &str) -> RelayResult<()> {
        send_line(
            &self.opener,
            &self.settings.port_name,
            &self.settings.port_config,
            text,
        )
    }

    fn persist(&self, retained: &[String], queue: &LineQueue) -> RelayResult<()> {
        let path = self.settings.queue_file.as_path();
        let remaining = retained.iter().map(String::as_str).chain(queue.iter());
        if self.settings.atomic_persist {
            queue::persist_remaining_atomic(path, remaining)
        } else {
            queue::persist_remaining(path, remaining)
        }
    }

    /// Relay every line of the queue file, in order.
    ///
    /// A missing or unreadable queue file yields an empty report with
    /// `load_failed` set; no port is opened. Send and persist failures are
    /// logged and counted, and the loop moves on to the next line.
    pub fn run(&mut self) -> RunReport {
        let path = self.settings.queue_file.clone();
        let mut report = RunReport::default();

        let mut queue = match queue::load_queue(&path) {
            Ok(queue) => queue,
            Err(e) => {
                error!(error = %e, "cannot load queue, nothing to relay");
                report.load_failed = true;
                self.state = RelayState::Done;
                return report;
            }
        };

        report.loaded = queue.len();
        self.state = state_for(&queue);
        info!(
            path = %path.display(),
            port = %self.settings.port_name,
            lines = report.loaded,
            "relay started"
        );

        let mut retained: Vec<String> = Vec::new();

        while let Some(line) = queue.pop_front() {
            match self.send_line(&line) {
                Ok(()) => report.sent += 1,
                Err(e) => {
                    report.failed += 1;
                    if e.is_port_open() {
                        warn!(error = %e, "port unavailable, line not sent");
                    } else {
                        warn!(error = %e, "line transmission failed");
                    }
                    if self.settings.delete_policy == DeletePolicy::AfterSuccess {
                        retained.push(line);
                    }
                }
            }

            if let Err(e) = self.persist(&retained, &queue) {
                report.persist_errors += 1;
                error!(error = %e, "queue file out of sync with pending lines");
            }

            self.state = state_for(&queue);
        }

        report.retained = retained.len();
        self.state = RelayState::Done;
        info!(
            sent = report.sent,
            failed = report.failed,
            retained = report.retained,
            persist_errors = report.persist_errors,
            "relay finished"
        );
        report
    }
}

fn state_for(queue: &LineQueue) -> RelayState {
    if queue.is_empty() {
        RelayState::Done
    } else {
        RelayState::Pending
    }
}

/// Load `path`, relay it through `opener` with `config` and return the
/// report. Convenience wrapper over [`LineRelay`].
pub fn run<O: PortOpener>(
    path: &Path,
    port_name: &str,
    config: &PortConfiguration,
    opener: O,
) -> RunReport {
    let settings = RelaySettings {
        port_config: config.clone(),
        ..RelaySettings::new(path, port_name)
    };
    LineRelay::new(opener, settings).run()
}
