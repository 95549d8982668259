//! Study sessions
//!
//! This module provides:
//! - The persisted study-session record and the storage interface
//! - A JSON-file store and an in-memory store
//! - The recorder that turns finished timer runs into records
//! - Daily and range aggregation of study time

pub mod recorder;
pub mod stats;
pub mod store;

pub use recorder::{DiscardReason, SaveOutcome, SessionRecorder};
pub use stats::DailyStudyTime;
pub use store::JsonSessionStore;

use std::sync::{Arc, Mutex};

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::timer::{ExamTally, SessionDraft};

/// A saved study session; never modified after it is written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudySessionRecord {
    /// Unique, time-derived identifier
    pub id: String,
    /// Planner date the session belongs to (not necessarily the day it was recorded)
    pub date: NaiveDate,
    pub method_id: String,
    pub duration_secs: u64,
    pub subject: String,
    /// Timer event log, one line per entry
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub cycles: u32,
    /// Question counts for exam-mode sessions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam: Option<ExamTally>,
}

impl StudySessionRecord {
    /// Build a record from a finished run
    pub fn from_draft(
        draft: SessionDraft,
        date: NaiveDate,
        subject: String,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: session_id(created_at),
            date,
            method_id: draft.method_id,
            duration_secs: draft.total_secs,
            subject,
            notes: draft.notes,
            created_at,
            cycles: draft.cycles,
            exam: draft.exam,
        }
    }
}

fn session_id(created_at: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("session-{}-{}", created_at.timestamp_millis(), &suffix[..8])
}

/// Where study sessions are kept
pub trait SessionStorage: Send + Sync {
    /// Persist one record
    fn record_session(&self, record: &StudySessionRecord) -> Result<()>;

    /// Sessions for a planner date, in recording order
    fn sessions_for_date(&self, date: NaiveDate) -> Result<Vec<StudySessionRecord>>;

    /// All stored sessions ordered by date
    fn all_sessions(&self) -> Result<Vec<StudySessionRecord>>;

    /// Remove a session, returning whether it existed
    fn delete_session(&self, date: NaiveDate, id: &str) -> Result<bool>;
}

impl<T: SessionStorage + ?Sized> SessionStorage for Arc<T> {
    fn record_session(&self, record: &StudySessionRecord) -> Result<()> {
        (**self).record_session(record)
    }

    fn sessions_for_date(&self, date: NaiveDate) -> Result<Vec<StudySessionRecord>> {
        (**self).sessions_for_date(date)
    }

    fn all_sessions(&self) -> Result<Vec<StudySessionRecord>> {
        (**self).all_sessions()
    }

    fn delete_session(&self, date: NaiveDate, id: &str) -> Result<bool> {
        (**self).delete_session(date, id)
    }
}

/// Session storage that lives only as long as the process
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<Vec<StudySessionRecord>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStorage for MemorySessionStore {
    fn record_session(&self, record: &StudySessionRecord) -> Result<()> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| anyhow::anyhow!("session store lock poisoned"))?;
        sessions.push(record.clone());
        Ok(())
    }

    fn sessions_for_date(&self, date: NaiveDate) -> Result<Vec<StudySessionRecord>> {
        Ok(self
            .all_sessions()?
            .into_iter()
            .filter(|s| s.date == date)
            .collect())
    }

    fn all_sessions(&self) -> Result<Vec<StudySessionRecord>> {
        let sessions = self
            .sessions
            .lock()
            .map_err(|_| anyhow::anyhow!("session store lock poisoned"))?;
        let mut all = sessions.clone();
        all.sort_by_key(|s| s.date);
        Ok(all)
    }

    fn delete_session(&self, date: NaiveDate, id: &str) -> Result<bool> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| anyhow::anyhow!("session store lock poisoned"))?;
        let before = sessions.len();
        sessions.retain(|s| !(s.date == date && s.id == id));
        Ok(sessions.len() != before)
    }
}
