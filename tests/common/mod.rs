//! Shared test utilities for the relay integration tests.

#![allow(dead_code)]

use serial_line_relay::port::MockPortOpener;
use serial_line_relay::{DeletePolicy, LineRelay, RelaySettings};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A queue file inside its own temporary directory.
pub struct QueueFixture {
    pub dir: TempDir,
    pub path: PathBuf,
}

impl QueueFixture {
    /// Write `lines`, each terminated by `\n`.
    pub fn with_lines(lines: &[&str]) -> Self {
        let fixture = Self::empty_dir();
        let mut content = String::new();
        for line in lines {
            content.push_str(line);
            content.push('\n');
        }
        fs::write(&fixture.path, content).expect("write queue file");
        fixture
    }

    /// A directory with no queue file in it yet.
    pub fn empty_dir() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        let path = dir.path().join("data.txt");
        Self { dir, path }
    }

    /// Current lines of the queue file.
    pub fn lines(&self) -> Vec<String> {
        read_lines(&self.path)
    }

    pub fn relay(&self, opener: &MockPortOpener) -> LineRelay<MockPortOpener> {
        self.relay_with(opener, DeletePolicy::AfterAttempt)
    }

    pub fn relay_with(
        &self,
        opener: &MockPortOpener,
        policy: DeletePolicy,
    ) -> LineRelay<MockPortOpener> {
        let settings = RelaySettings::new(&self.path, "MOCK0").with_delete_policy(policy);
        LineRelay::new(opener.clone(), settings)
    }
}

pub fn read_lines(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .expect("read queue file")
        .lines()
        .map(str::to_owned)
        .collect()
}

/// Transmissions as text with the terminator stripped.
pub fn sent_lines(opener: &MockPortOpener) -> Vec<String> {
    opener
        .transmitted_text()
        .into_iter()
        .map(|t| t.strip_suffix('\n').unwrap_or(&t).to_string())
        .collect()
}
