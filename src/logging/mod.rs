//! Logging for the study timer
//!
//! Provides file-based logging with timestamped files and age-based
//! retention of old log files.

mod file_writer;
mod retention;

pub use file_writer::{init_file_logging, LogFileInfo, LoggingGuard, DEFAULT_FILTER};
pub use retention::{cleanup_old_logs, cleanup_old_logs_with_retention, LOG_FILE_PREFIX};
