//! Log file retention management
//!
//! Handles cleanup of old log files based on age.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};

/// Default retention period in days
pub const DEFAULT_RETENTION_DAYS: u64 = 7;

/// File name prefix shared by every log file this crate writes
pub const LOG_FILE_PREFIX: &str = "studytimer-";

/// Clean up log files older than the default retention period
///
/// Returns the number of files deleted.
pub fn cleanup_old_logs(logs_dir: &Path) -> Result<usize> {
    cleanup_old_logs_with_retention(logs_dir, DEFAULT_RETENTION_DAYS)
}

/// Clean up log files older than the specified number of days
///
/// Returns the number of files deleted.
pub fn cleanup_old_logs_with_retention(logs_dir: &Path, retention_days: u64) -> Result<usize> {
    if !logs_dir.exists() {
        return Ok(0);
    }

    let cutoff = SystemTime::now()
        .checked_sub(Duration::from_secs(retention_days * 24 * 60 * 60))
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let mut deleted_count = 0;

    for entry in fs::read_dir(logs_dir).context("Failed to read logs directory")? {
        let entry = entry?;
        let path = entry.path();

        let is_log_file = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |name| {
                name.starts_with(LOG_FILE_PREFIX) && name.ends_with(".log")
            });
        if !is_log_file {
            continue;
        }

        let modified = entry.metadata().and_then(|m| m.modified());
        if let Ok(modified) = modified {
            if modified < cutoff && fs::remove_file(&path).is_ok() {
                deleted_count += 1;
            }
        }
    }

    if deleted_count > 0 {
        tracing::info!("Removed {} old log files", deleted_count);
    }

    Ok(deleted_count)
}
