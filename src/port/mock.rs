//! Mock serial port implementation for testing.
//!
//! `MockPortOpener` hands out `MockSerialPort` handles that all share one
//! recorded state, so a test can inspect every transmission and every
//! open/close after the relay has dropped its handles.

use super::error::PortError;
use super::traits::{PortConfiguration, PortOpener, SerialPortAdapter};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Shared state behind every handle created by one opener.
#[derive(Debug, Default)]
struct MockPortState {
    /// One entry per flushed transmission, in order.
    write_log: Vec<Vec<u8>>,
    /// Bytes written since the last flush.
    pending: Vec<u8>,
    /// Configuration passed to each successful open.
    open_log: Vec<(String, PortConfiguration)>,
    /// Open attempts so far, successful or not.
    open_attempts: usize,
    /// Handles currently alive.
    open_handles: usize,
    /// Handles dropped so far.
    closes: usize,
    /// Zero-based open attempts that should fail.
    failing_opens: HashSet<usize>,
    /// Zero-based open attempts whose write should time out.
    failing_writes: HashSet<usize>,
}

/// Opener that never touches hardware.
///
/// # Example
/// ```
/// use serial_line_relay::port::{MockPortOpener, PortConfiguration, PortOpener, SerialPortAdapter};
///
/// let opener = MockPortOpener::new();
/// opener.fail_open_on_attempt(1);
///
/// let mut port = opener.open("MOCK0", &PortConfiguration::default()).unwrap();
/// port.write_all(b"AA\n").unwrap();
/// port.flush().unwrap();
/// drop(port);
///
/// assert!(opener.open("MOCK0", &PortConfiguration::default()).is_err());
/// assert_eq!(opener.transmissions(), vec![b"AA\n".to_vec()]);
/// assert_eq!(opener.close_count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockPortOpener {
    state: Arc<Mutex<MockPortState>>,
}

impl MockPortOpener {
    /// Create an opener whose ports always open and accept writes.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockPortState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Make the `attempt`-th call to `open` (zero-based) fail as if the
    /// device were busy.
    pub fn fail_open_on_attempt(&self, attempt: usize) {
        self.lock().failing_opens.insert(attempt);
    }

    /// Make writes on the port returned by the `attempt`-th open time out.
    pub fn fail_write_on_attempt(&self, attempt: usize) {
        self.lock().failing_writes.insert(attempt);
    }

    /// Every flushed transmission, in order.
    pub fn transmissions(&self) -> Vec<Vec<u8>> {
        self.lock().write_log.clone()
    }

    /// Flushed transmissions decoded as UTF-8 with the trailing `\n` kept.
    pub fn transmitted_text(&self) -> Vec<String> {
        self.lock()
            .write_log
            .iter()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .collect()
    }

    /// Names and configurations of every successful open.
    pub fn open_log(&self) -> Vec<(String, PortConfiguration)> {
        self.lock().open_log.clone()
    }

    /// Number of `open` calls, including failed ones.
    pub fn open_attempts(&self) -> usize {
        self.lock().open_attempts
    }

    /// Number of handles dropped so far.
    pub fn close_count(&self) -> usize {
        self.lock().closes
    }

    /// Number of handles still alive.
    pub fn open_handles(&self) -> usize {
        self.lock().open_handles
    }
}

impl PortOpener for MockPortOpener {
    type Port = MockSerialPort;

    fn open(&self, port_name: &str, config: &PortConfiguration) -> Result<Self::Port, PortError> {
        let mut state = self.lock();
        let attempt = state.open_attempts;
        state.open_attempts += 1;

        if state.failing_opens.contains(&attempt) {
            return Err(PortError::busy(port_name));
        }

        state.open_log.push((port_name.to_string(), config.clone()));
        state.open_handles += 1;

        Ok(MockSerialPort {
            name: port_name.to_string(),
            timeout: config.timeout,
            fail_writes: state.failing_writes.contains(&attempt),
            state: Arc::clone(&self.state),
        })
    }
}

/// A single open handle produced by `MockPortOpener`.
pub struct MockSerialPort {
    name: String,
    timeout: Duration,
    fail_writes: bool,
    state: Arc<Mutex<MockPortState>>,
}

impl MockSerialPort {
    fn lock(&self) -> MutexGuard<'_, MockPortState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SerialPortAdapter for MockSerialPort {
    fn write_bytes(&mut self, data: &[u8]) -> Result<usize, PortError> {
        if self.fail_writes {
            return Err(PortError::timeout(self.timeout));
        }
        self.lock().pending.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> Result<(), PortError> {
        let mut state = self.lock();
        if !state.pending.is_empty() {
            let frame = std::mem::take(&mut state.pending);
            state.write_log.push(frame);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Drop for MockSerialPort {
    fn drop(&mut self) {
        let mut state = self.lock();
        // Unflushed bytes never reach the device.
        state.pending.clear();
        state.open_handles -= 1;
        state.closes += 1;
    }
}

impl std::fmt::Debug for MockSerialPort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockSerialPort")
            .field("name", &self.name)
            .field("fail_writes", &self.fail_writes)
            .finish()
    }
}
