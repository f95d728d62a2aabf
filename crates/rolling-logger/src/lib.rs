//! Rolling Logger
//!
//! File logger for desktop apps: size-based rotation on disk plus a
//! circular buffer of the most recent lines kept in memory.

use std::collections::VecDeque;
use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, OnceLock};

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::fmt::MakeWriter;

const MAX_FILE_BYTES: u64 = 2 * 1024 * 1024;
const MAX_ROTATED_FILES: usize = 3;
const BUFFER_LINES: usize = 500;

static LOGGER: OnceLock<RollingLog> = OnceLock::new();

struct RollingFile {
    dir: PathBuf,
    app_name: String,
    file: File,
    written: u64,
    max_bytes: u64,
    max_files: usize,
    buffer: VecDeque<String>,
    capacity: usize,
    partial: String,
}

impl RollingFile {
    fn path_for(dir: &Path, app_name: &str, index: usize) -> PathBuf {
        if index == 0 {
            dir.join(format!("{}.log", app_name))
        } else {
            dir.join(format!("{}.log.{}", app_name, index))
        }
    }

    fn open_current(dir: &Path, app_name: &str) -> io::Result<(File, u64)> {
        let path = Self::path_for(dir, app_name, 0);
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let written = file.metadata().map(|m| m.len()).unwrap_or(0);
        Ok((file, written))
    }

    fn rotate(&mut self) -> io::Result<()> {
        self.file.flush()?;
        if self.max_files == 0 {
            // No history kept: truncate in place
            let path = Self::path_for(&self.dir, &self.app_name, 0);
            self.file = File::create(path)?;
            self.written = 0;
            return Ok(());
        }
        for index in (1..self.max_files).rev() {
            let from = Self::path_for(&self.dir, &self.app_name, index);
            if from.exists() {
                fs::rename(&from, Self::path_for(&self.dir, &self.app_name, index + 1))?;
            }
        }
        fs::rename(
            Self::path_for(&self.dir, &self.app_name, 0),
            Self::path_for(&self.dir, &self.app_name, 1),
        )?;
        let (file, written) = Self::open_current(&self.dir, &self.app_name)?;
        self.file = file;
        self.written = written;
        Ok(())
    }

    fn remember(&mut self, buf: &[u8]) {
        self.partial.push_str(&String::from_utf8_lossy(buf));
        while let Some(pos) = self.partial.find('\n') {
            let line: String = self.partial.drain(..=pos).collect();
            let line = line.trim_end_matches(['\n', '\r']).to_string();
            if self.buffer.len() == self.capacity {
                self.buffer.pop_front();
            }
            if self.capacity > 0 {
                self.buffer.push_back(line);
            }
        }
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.written > 0 && self.written + buf.len() as u64 > self.max_bytes {
            self.rotate()?;
        }
        self.file.write_all(buf)?;
        self.written += buf.len() as u64;
        self.remember(buf);
        Ok(buf.len())
    }
}

/// Cloneable handle to a rolling log file
///
/// Implements [`Write`] and [`MakeWriter`] so it can back a
/// `tracing_subscriber::fmt` layer directly.
#[derive(Clone)]
pub struct RollingLog {
    inner: Arc<Mutex<RollingFile>>,
}

impl RollingLog {
    /// Open `<log_dir>/<app_name>.log` with the default limits
    pub fn open(log_dir: impl AsRef<Path>, app_name: &str) -> Result<Self, String> {
        Self::with_limits(log_dir, app_name, MAX_FILE_BYTES, MAX_ROTATED_FILES, BUFFER_LINES)
    }

    /// Open with explicit rotation size, rotated file count and buffer capacity
    pub fn with_limits(
        log_dir: impl AsRef<Path>,
        app_name: &str,
        max_bytes: u64,
        max_files: usize,
        capacity: usize,
    ) -> Result<Self, String> {
        let dir = log_dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| format!("Failed to create log dir: {}", e))?;
        let (file, written) = RollingFile::open_current(&dir, app_name)
            .map_err(|e| format!("Failed to open log file: {}", e))?;

        Ok(Self {
            inner: Arc::new(Mutex::new(RollingFile {
                dir,
                app_name: app_name.to_string(),
                file,
                written,
                max_bytes,
                max_files,
                buffer: VecDeque::with_capacity(capacity),
                capacity,
                partial: String::new(),
            })),
        })
    }

    /// Path of the file currently written to
    pub fn current_path(&self) -> Option<PathBuf> {
        let guard = self.inner.lock().ok()?;
        Some(RollingFile::path_for(&guard.dir, &guard.app_name, 0))
    }

    /// The last `n` complete lines, oldest first
    pub fn recent(&self, n: usize) -> Vec<String> {
        match self.inner.lock() {
            Ok(guard) => {
                let skip = guard.buffer.len().saturating_sub(n);
                guard.buffer.iter().skip(skip).cloned().collect()
            }
            Err(_) => Vec::new(),
        }
    }
}

impl Write for RollingLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?;
        guard.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "log file lock poisoned"))?;
        guard.file.flush()
    }
}

impl<'a> MakeWriter<'a> for RollingLog {
    type Writer = RollingLog;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Local wall-clock timestamps for log lines
struct LocalTime;

impl FormatTime for LocalTime {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"))
    }
}

/// Install the global subscriber writing to `<log_dir>/<app_name>.log`
pub fn init_logger(log_dir: impl AsRef<Path>, app_name: &str) -> Result<(), String> {
    if LOGGER.get().is_some() {
        return Err("Logger already initialized".to_string());
    }

    let log = RollingLog::open(log_dir, app_name)?;

    tracing_subscriber::fmt()
        .with_writer(log.clone())
        .with_ansi(false)
        .with_timer(LocalTime)
        .with_target(true)
        .try_init()
        .map_err(|e| format!("Failed to install subscriber: {}", e))?;

    LOGGER
        .set(log)
        .map_err(|_| "Logger already initialized".to_string())
}

/// Log an info line through the installed logger
pub fn info(message: &str) -> Result<(), String> {
    if LOGGER.get().is_none() {
        return Err("Logger not initialized".to_string());
    }
    tracing::info!("{}", message);
    Ok(())
}

/// Log an error line through the installed logger
pub fn error(message: &str) -> Result<(), String> {
    if LOGGER.get().is_none() {
        return Err("Logger not initialized".to_string());
    }
    tracing::error!("{}", message);
    Ok(())
}

/// The most recent `n` lines written by the installed logger
pub fn recent(n: usize) -> Vec<String> {
    LOGGER.get().map(|log| log.recent(n)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_keeps_last_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = RollingLog::with_limits(dir.path(), "App", 1024 * 1024, 2, 3).unwrap();

        for i in 0..5 {
            writeln!(log, "line {}", i).unwrap();
        }

        assert_eq!(log.recent(10), vec!["line 2", "line 3", "line 4"]);
        assert_eq!(log.recent(1), vec!["line 4"]);
    }

    #[test]
    fn test_partial_lines_wait_for_newline() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = RollingLog::with_limits(dir.path(), "App", 1024, 1, 10).unwrap();

        log.write_all(b"hello ").unwrap();
        assert!(log.recent(5).is_empty());
        log.write_all(b"world\n").unwrap();
        assert_eq!(log.recent(5), vec!["hello world"]);
    }

    #[test]
    fn test_rotation_moves_full_file_aside() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = RollingLog::with_limits(dir.path(), "App", 32, 2, 10).unwrap();

        for _ in 0..6 {
            writeln!(log, "0123456789abcdef").unwrap();
        }
        log.flush().unwrap();

        assert!(dir.path().join("App.log").exists());
        assert!(dir.path().join("App.log.1").exists());
        assert!(dir.path().join("App.log.2").exists());
        assert!(!dir.path().join("App.log.3").exists());

        let current = fs::read_to_string(dir.path().join("App.log")).unwrap();
        assert!(current.len() as u64 <= 34);
    }

    #[test]
    fn test_open_writes_under_app_name() {
        let dir = tempfile::tempdir().unwrap();
        let mut log = RollingLog::open(dir.path().join("logs"), "App").unwrap();
        assert_eq!(log.current_path(), Some(dir.path().join("logs").join("App.log")));

        writeln!(log, "first").unwrap();
        log.flush().unwrap();
        let written = fs::read_to_string(dir.path().join("logs").join("App.log")).unwrap();
        assert_eq!(written, "first\n");
    }

    #[test]
    fn test_init_logger_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        init_logger(dir.path(), "Test").unwrap();

        info("started").unwrap();
        error("went wrong").unwrap();

        let lines = recent(10);
        assert!(lines.iter().any(|l| l.contains("INFO") && l.contains("started")));
        assert!(lines.iter().any(|l| l.contains("ERROR") && l.contains("went wrong")));
        assert!(init_logger(dir.path(), "Test").is_err());
    }
}
