//! JSON-file persistence for study sessions
//!
//! Sessions are stored as a map from planner date to the sessions recorded
//! under that date. Every write prunes dates older than the retention window.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate};

use super::{SessionStorage, StudySessionRecord};

pub const STUDY_SESSIONS_FILE: &str = "study_sessions.json";

type SessionsByDate = BTreeMap<NaiveDate, Vec<StudySessionRecord>>;

/// File-backed session storage
#[derive(Debug)]
pub struct JsonSessionStore {
    store_path: PathBuf,
    retention_days: u64,
    /// Serializes read-modify-write cycles within this process
    write_lock: Mutex<()>,
}

impl JsonSessionStore {
    /// Store at a custom path
    pub fn with_path(path: PathBuf, retention_days: u64) -> Self {
        Self {
            store_path: path,
            retention_days,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.store_path
    }

    fn load(&self) -> Result<SessionsByDate> {
        if !self.store_path.exists() {
            return Ok(BTreeMap::new());
        }

        let content = std::fs::read_to_string(&self.store_path)
            .context("Failed to read study sessions file")?;

        if content.trim().is_empty() {
            return Ok(BTreeMap::new());
        }

        serde_json::from_str(&content).context("Failed to parse study sessions")
    }

    fn save(&self, sessions: &SessionsByDate) -> Result<()> {
        if let Some(parent) = self.store_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create sessions directory")?;
        }

        let content =
            serde_json::to_string_pretty(sessions).context("Failed to serialize study sessions")?;

        std::fs::write(&self.store_path, content).context("Failed to write study sessions file")?;

        Ok(())
    }

    /// Drop every date before `cutoff` except `keep`, returning how many sessions went
    fn prune(sessions: &mut SessionsByDate, cutoff: NaiveDate, keep: NaiveDate) -> usize {
        let mut pruned = 0;
        sessions.retain(|date, records| {
            let retained = *date >= cutoff || *date == keep;
            if !retained {
                pruned += records.len();
            }
            retained
        });
        pruned
    }

    fn record_with_today(&self, record: &StudySessionRecord, today: NaiveDate) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("session store lock poisoned"))?;

        let mut sessions = self.load()?;
        let cutoff = today - Duration::days(self.retention_days as i64);
        let pruned = Self::prune(&mut sessions, cutoff, record.date);
        if pruned > 0 {
            tracing::info!("Pruned {} study sessions older than {}", pruned, cutoff);
        }

        sessions
            .entry(record.date)
            .or_default()
            .push(record.clone());
        self.save(&sessions)
    }
}

impl SessionStorage for JsonSessionStore {
    fn record_session(&self, record: &StudySessionRecord) -> Result<()> {
        self.record_with_today(record, Local::now().date_naive())
    }

    fn sessions_for_date(&self, date: NaiveDate) -> Result<Vec<StudySessionRecord>> {
        Ok(self.load()?.remove(&date).unwrap_or_default())
    }

    fn all_sessions(&self) -> Result<Vec<StudySessionRecord>> {
        Ok(self.load()?.into_values().flatten().collect())
    }

    fn delete_session(&self, date: NaiveDate, id: &str) -> Result<bool> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow::anyhow!("session store lock poisoned"))?;

        let mut sessions = self.load()?;
        let Some(records) = sessions.get_mut(&date) else {
            return Ok(false);
        };

        let before = records.len();
        records.retain(|s| s.id != id);
        if records.len() == before {
            return Ok(false);
        }

        self.save(&sessions)?;
        Ok(true)
    }
}
