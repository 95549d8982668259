//! File-based logging with tracing integration
//!
//! Sets up a tracing subscriber that writes to a timestamped log file.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use chrono::Local;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use super::retention::LOG_FILE_PREFIX;

/// Filter used when `RUST_LOG` is not set
pub const DEFAULT_FILTER: &str = "studytimer=info";

/// Information about the current log file
#[derive(Debug, Clone)]
pub struct LogFileInfo {
    /// Full path to the log file
    pub path: PathBuf,
}

/// Generate a timestamped log file path
pub fn create_log_file_path(logs_dir: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S");
    logs_dir.join(format!("{}{}.log", LOG_FILE_PREFIX, timestamp))
}

/// Shared handle to the open log file
struct FileWriter {
    file: Arc<Mutex<File>>,
}

impl Write for FileWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if let Ok(mut file) = self.file.lock() {
            file.write_all(buf)?;
            file.flush()?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self.file.lock() {
            Ok(mut file) => file.flush(),
            Err(_) => Ok(()),
        }
    }
}

/// Writer factory for tracing-subscriber
struct FileWriterMaker {
    file: Arc<Mutex<File>>,
}

impl<'a> MakeWriter<'a> for FileWriterMaker {
    type Writer = FileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        FileWriter {
            file: Arc::clone(&self.file),
        }
    }
}

/// Guard that keeps the logging system alive
pub struct LoggingGuard {
    _file: Arc<Mutex<File>>,
}

/// Initialize file logging
///
/// Returns the log file info and a guard that must be kept alive for the duration of logging.
pub fn init_file_logging(logs_dir: PathBuf) -> Result<(LogFileInfo, LoggingGuard)> {
    fs::create_dir_all(&logs_dir).context("Failed to create logs directory")?;

    let log_path = create_log_file_path(&logs_dir);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .context("Failed to open log file")?;
    let file = Arc::new(Mutex::new(file));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(FileWriterMaker {
            file: Arc::clone(&file),
        })
        .with_ansi(false)
        .with_target(true);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_FILTER.into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    let info = LogFileInfo { path: log_path };
    let guard = LoggingGuard { _file: file };

    Ok((info, guard))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_log_file_path() {
        let logs_dir = PathBuf::from("/tmp/studytimer/logs");
        let path = create_log_file_path(&logs_dir);
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("studytimer-"));
        assert!(name.ends_with(".log"));
        // studytimer-YYYY-MM-DD_HH-MM-SS.log
        assert_eq!(name.len(), "studytimer-".len() + 19 + ".log".len());
    }

    #[test]
    fn test_file_writer_appends() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("studytimer-test.log");
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .unwrap();
        let maker = FileWriterMaker {
            file: Arc::new(Mutex::new(file)),
        };

        maker.make_writer().write_all(b"first\n").unwrap();
        maker.make_writer().write_all(b"second\n").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }
}
