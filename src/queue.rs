//! The queue file: a plain-text file that is both the work queue and its
//! persisted state.
//!
//! Lines are loaded once into a `LineQueue`; after each dequeue the file is
//! rewritten so it holds exactly the lines still pending.

use crate::error::{RelayError, RelayResult};
use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::{debug, trace, warn};

/// Ordered FIFO of pending lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineQueue {
    lines: VecDeque<String>,
}

impl LineQueue {
    /// Split `content` into records. `\n` and `\r\n` both terminate a line; a
    /// trailing terminator does not add an empty record.
    pub fn parse(content: &str) -> Self {
        Self {
            lines: content.lines().map(str::to_owned).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Remove and return the next line.
    pub fn pop_front(&mut self) -> Option<String> {
        self.lines.pop_front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

}

impl<S: Into<String>> FromIterator<S> for LineQueue {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            lines: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl IntoIterator for LineQueue {
    type Item = String;
    type IntoIter = std::collections::vec_deque::IntoIter<String>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.into_iter()
    }
}

fn render<'a>(lines: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(line);
        out.push('\n');
    }
    out
}

/// Read the queue file at `path`.
///
/// Fails with [`RelayError::QueueRead`] if the file does not exist or cannot
/// be read. Bytes that are not valid UTF-8 are replaced with U+FFFD and a
/// warning is logged; the next rewrite stores the replaced text.
pub fn load_queue(path: &Path) -> RelayResult<LineQueue> {
    let bytes = fs::read(path).map_err(|source| RelayError::QueueRead {
        path: path.to_path_buf(),
        source,
    })?;
    let queue = match String::from_utf8(bytes) {
        Ok(content) => LineQueue::parse(&content),
        Err(e) => {
            warn!(
                path = %path.display(),
                offset = e.utf8_error().valid_up_to(),
                "queue file is not valid UTF-8, invalid bytes replaced"
            );
            LineQueue::parse(&String::from_utf8_lossy(e.as_bytes()))
        }
    };
    debug!(path = %path.display(), lines = queue.len(), "queue loaded");
    Ok(queue)
}

/// Append `lines` to the end of the queue file, creating it if needed.
///
/// A file whose last line lacks a terminator gets one first, so an appended
/// line never merges into it. Lines containing `\n` or `\r` are rejected
/// before anything is written.
pub fn append_lines<'a, I>(path: &Path, lines: I) -> RelayResult<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let write_err = |source: io::Error| RelayError::QueueWrite {
        path: path.to_path_buf(),
        source,
    };

    let lines: Vec<&str> = lines.into_iter().collect();
    if let Some(bad) = lines.iter().find(|l| l.contains(|c: char| c == '\n' || c == '\r')) {
        return Err(write_err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("line {bad:?} contains a line break"),
        )));
    }

    let mut file = OpenOptions::new()
        .read(true)
        .append(true)
        .create(true)
        .open(path)
        .map_err(write_err)?;

    let mut content = String::new();
    if needs_terminator(&mut file).map_err(write_err)? {
        content.push('\n');
    }
    content.push_str(&render(lines.iter().copied()));
    file.write_all(content.as_bytes()).map_err(write_err)?;

    debug!(path = %path.display(), lines = lines.len(), "lines appended");
    Ok(())
}

fn needs_terminator(file: &mut fs::File) -> io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

/// Overwrite `path` with exactly `remaining`, one line each.
///
/// The file is truncated first; an empty `remaining` leaves an empty file.
pub fn persist_remaining<'a, I>(path: &Path, remaining: I) -> RelayResult<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let content = render(remaining);
    fs::write(path, &content).map_err(|source| RelayError::QueueWrite {
        path: path.to_path_buf(),
        source,
    })?;
    trace!(path = %path.display(), bytes = content.len(), "queue persisted");
    Ok(())
}

/// Like [`persist_remaining`], but writes a temporary sibling file and
/// renames it over `path`, so a crash mid-write never leaves a torn queue.
pub fn persist_remaining_atomic<'a, I>(path: &Path, remaining: I) -> RelayResult<()>
where
    I: IntoIterator<Item = &'a str>,
{
    let write_err = |source: std::io::Error| RelayError::QueueWrite {
        path: path.to_path_buf(),
        source,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let content = render(remaining);
    let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    tmp.write_all(content.as_bytes()).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;
    tmp.persist(path).map_err(|e| write_err(e.error))?;

    trace!(path = %path.display(), bytes = content.len(), "queue persisted atomically");
    Ok(())
}
