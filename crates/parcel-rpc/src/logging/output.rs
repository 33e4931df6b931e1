// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Log sinks (stderr and append-only file).

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use parking_lot::Mutex;

/// Severity used for filtering and the line prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug = 0,
    Info = 1,
    Warning = 2,
    Error = 3,
}

impl LogLevel {
    /// Fixed-width tag written in front of each line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO ",
            Self::Warning => "WARN ",
            Self::Error => "ERROR",
        }
    }

    /// Facade filter matching this level.
    pub fn to_filter(self) -> log::LevelFilter {
        match self {
            Self::Debug => log::LevelFilter::Debug,
            Self::Info => log::LevelFilter::Info,
            Self::Warning => log::LevelFilter::Warn,
            Self::Error => log::LevelFilter::Error,
        }
    }
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Self::Error,
            log::Level::Warn => Self::Warning,
            log::Level::Info => Self::Info,
            log::Level::Debug | log::Level::Trace => Self::Debug,
        }
    }
}

/// Destination for formatted log lines.
///
/// Implementations are shared between threads and must not panic on I/O errors.
pub trait Output: Send + Sync {
    /// Write one line. `target` is the emitting module path.
    fn write(&self, level: LogLevel, target: &str, message: &str) -> io::Result<()>;

    /// Flush any buffered output.
    fn flush(&self) -> io::Result<()>;
}

fn format_line(level: LogLevel, target: &str, message: &str) -> String {
    format!("[{}] {}: {}\n", level.as_str(), target, message)
}

/// Writes to stderr.
pub struct ConsoleOutput {
    min_level: LogLevel,
}

impl ConsoleOutput {
    pub fn new(min_level: LogLevel) -> Self {
        Self { min_level }
    }
}

impl Output for ConsoleOutput {
    fn write(&self, level: LogLevel, target: &str, message: &str) -> io::Result<()> {
        if level < self.min_level {
            return Ok(());
        }
        io::stderr().lock().write_all(format_line(level, target, message).as_bytes())
    }

    fn flush(&self) -> io::Result<()> {
        io::stderr().flush()
    }
}

/// Appends to a file. The handle is guarded by a mutex so lines never interleave.
pub struct FileOutput {
    file: Mutex<File>,
    min_level: LogLevel,
}

impl FileOutput {
    /// Open `path` for appending, creating it if missing.
    pub fn new<P: AsRef<Path>>(path: P, min_level: LogLevel) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
            min_level,
        })
    }
}

impl Output for FileOutput {
    fn write(&self, level: LogLevel, target: &str, message: &str) -> io::Result<()> {
        if level < self.min_level {
            return Ok(());
        }
        self.file
            .lock()
            .write_all(format_line(level, target, message).as_bytes())
    }

    fn flush(&self) -> io::Result<()> {
        self.file.lock().flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Warning < LogLevel::Error);
        assert_eq!(LogLevel::from(log::Level::Trace), LogLevel::Debug);
        assert_eq!(LogLevel::Warning.to_filter(), log::LevelFilter::Warn);
    }

    #[test]
    fn test_file_output_appends_and_filters() {
        let dir = tempfile::tempdir().expect("tempdir should succeed");
        let path = dir.path().join("rpc.log");
        let output = FileOutput::new(&path, LogLevel::Warning).expect("open should succeed");

        output
            .write(LogLevel::Debug, "parcel_rpc::rpc", "dropped")
            .expect("write should succeed");
        output
            .write(LogLevel::Error, "parcel_rpc::rpc", "handler panicked")
            .expect("write should succeed");
        output.flush().expect("flush should succeed");

        let content = std::fs::read_to_string(&path).expect("read should succeed");
        assert_eq!(content, "[ERROR] parcel_rpc::rpc: handler panicked\n");
    }

    #[test]
    fn test_console_output_accepts_lines() {
        let output = ConsoleOutput::new(LogLevel::Info);
        assert!(output.write(LogLevel::Error, "test", "line").is_ok());
        assert!(output.flush().is_ok());
    }
}
