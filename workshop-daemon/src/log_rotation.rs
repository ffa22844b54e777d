//! Daemon log file: a reopening writer for `tracing` and size-based rotation.
//!
//! `~/.workshop/logs/daemon.log` rolls over at 10 MiB into `daemon.log.1`,
//! shifting older copies up and dropping anything past `daemon.log.5`. The
//! writer opens the file per event, so a rotation never leaves the subscriber
//! appending to a renamed file.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing_subscriber::fmt::MakeWriter;

/// Size at which the live log is rotated (10 MiB).
pub const MAX_LOG_BYTES: u64 = 10 * 1024 * 1024;

/// Rotated copies kept next to the live log.
pub const MAX_ROTATED_FILES: usize = 5;

/// `MakeWriter` that appends to a log file, reopened for every event.
#[derive(Debug, Clone)]
pub struct LogFile {
    path: PathBuf,
}

impl LogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Either the opened log or a sink when the file cannot be opened.
pub enum LogWriter {
    File(File),
    Sink(io::Sink),
}

impl Write for LogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            LogWriter::File(file) => file.write(buf),
            LogWriter::Sink(sink) => sink.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            LogWriter::File(file) => file.flush(),
            LogWriter::Sink(sink) => sink.flush(),
        }
    }
}

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = LogWriter;

    fn make_writer(&'a self) -> Self::Writer {
        match OpenOptions::new().create(true).append(true).open(&self.path) {
            Ok(file) => LogWriter::File(file),
            Err(_) => LogWriter::Sink(io::sink()),
        }
    }
}

/// Rotate `log_path` once it reaches `max_bytes`, keeping `max_files`
/// numbered copies. Returns whether a rotation happened; a missing log is not
/// an error.
pub fn rotate_if_needed(log_path: &Path, max_bytes: u64, max_files: usize) -> io::Result<bool> {
    let size = match fs::metadata(log_path) {
        Ok(meta) => meta.len(),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };
    if size < max_bytes || max_files == 0 {
        return Ok(false);
    }

    remove_if_exists(&numbered_path(log_path, max_files))?;
    for n in (1..max_files).rev() {
        let from = numbered_path(log_path, n);
        if from.exists() {
            fs::rename(&from, numbered_path(log_path, n + 1))?;
        }
    }
    fs::rename(log_path, numbered_path(log_path, 1))?;
    File::create(log_path)?;
    Ok(true)
}

/// Rotate the daemon log under `home`; failures are logged, never returned.
pub fn rotate_logs(home: &Path) {
    let path = crate::paths::log_path(home);
    match rotate_if_needed(&path, MAX_LOG_BYTES, MAX_ROTATED_FILES) {
        Ok(true) => tracing::info!(path = %path.display(), "log file rotated"),
        Ok(false) => {}
        Err(err) => tracing::warn!(path = %path.display(), error = %err, "log rotation failed"),
    }
}

/// `daemon.log` + 2 → `daemon.log.2`
fn numbered_path(base: &Path, n: usize) -> PathBuf {
    let mut name = base.file_name().map(|s| s.to_os_string()).unwrap_or_default();
    name.push(format!(".{n}"));
    base.with_file_name(name)
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const SMALL_LIMIT: u64 = 64;

    fn write_bytes(path: &Path, len: usize, fill: u8) {
        fs::write(path, vec![fill; len]).unwrap();
    }

    #[test]
    fn small_log_is_left_alone() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("daemon.log");
        write_bytes(&log, 10, b'a');

        assert!(!rotate_if_needed(&log, SMALL_LIMIT, 3).unwrap());
        assert!(!numbered_path(&log, 1).exists());
    }

    #[test]
    fn oversized_log_moves_to_first_copy() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("daemon.log");
        write_bytes(&log, SMALL_LIMIT as usize, b'a');

        assert!(rotate_if_needed(&log, SMALL_LIMIT, 3).unwrap());
        assert_eq!(fs::metadata(&log).unwrap().len(), 0);
        assert_eq!(fs::read(numbered_path(&log, 1)).unwrap().len(), SMALL_LIMIT as usize);
    }

    #[test]
    fn copies_shift_and_oldest_is_dropped() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("daemon.log");

        for fill in [b'1', b'2', b'3', b'4'] {
            write_bytes(&log, SMALL_LIMIT as usize, fill);
            rotate_if_needed(&log, SMALL_LIMIT, 3).unwrap();
        }

        assert_eq!(fs::read(numbered_path(&log, 1)).unwrap()[0], b'4');
        assert_eq!(fs::read(numbered_path(&log, 3)).unwrap()[0], b'2');
        assert!(!numbered_path(&log, 4).exists());
    }

    #[test]
    fn missing_log_is_not_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(!rotate_if_needed(&dir.path().join("nope.log"), SMALL_LIMIT, 3).unwrap());
    }

    #[test]
    fn writer_appends_across_reopen() {
        let dir = TempDir::new().unwrap();
        let log = LogFile::new(dir.path().join("daemon.log"));
        log.make_writer().write_all(b"one\n").unwrap();
        log.make_writer().write_all(b"two\n").unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("daemon.log")).unwrap(), "one\ntwo\n");
    }

    #[test]
    fn unopenable_log_falls_back_to_sink() {
        let dir = TempDir::new().unwrap();
        let log = LogFile::new(dir.path().join("missing-dir").join("daemon.log"));
        assert!(matches!(log.make_writer(), LogWriter::Sink(_)));
    }
}
