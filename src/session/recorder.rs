//! Turns finished timer runs into saved sessions

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, error, info};

use crate::error::TimerError;
use crate::timer::{SessionDraft, TimerEffect, TimerEvent, TimerMachine};

use super::{SessionStorage, StudySessionRecord};

/// Runs shorter than this are never saved
pub const DEFAULT_MIN_SESSION_SECS: u64 = 10;

/// Subject used when the user left it blank
pub const DEFAULT_SUBJECT: &str = "Study time";

/// Why a run was not saved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    TooShort { total_secs: u64 },
    /// Stop was requested with no run in progress
    NothingToSave,
    PersistenceFailed(TimerError),
}

/// Result of handing a run to the recorder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved(StudySessionRecord),
    Discarded(DiscardReason),
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved(_))
    }

    /// User-facing description, or None when nothing worth showing happened
    pub fn notice(&self) -> Option<String> {
        match self {
            SaveOutcome::Saved(_) => Some("Study session saved".to_string()),
            SaveOutcome::Discarded(DiscardReason::TooShort { .. }) => {
                Some("Session too short to save".to_string())
            }
            SaveOutcome::Discarded(DiscardReason::PersistenceFailed(_)) => {
                Some("Could not save study session".to_string())
            }
            SaveOutcome::Discarded(DiscardReason::NothingToSave) => None,
        }
    }
}

/// Saves sessions that meet the minimum length
pub struct SessionRecorder {
    storage: Arc<dyn SessionStorage>,
    min_session_secs: u64,
    default_subject: String,
}

impl SessionRecorder {
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            storage,
            min_session_secs: DEFAULT_MIN_SESSION_SECS,
            default_subject: DEFAULT_SUBJECT.to_string(),
        }
    }

    pub fn with_min_session_secs(mut self, secs: u64) -> Self {
        self.min_session_secs = secs;
        self
    }

    pub fn with_default_subject(mut self, subject: impl Into<String>) -> Self {
        self.default_subject = subject.into();
        self
    }

    pub fn storage(&self) -> &Arc<dyn SessionStorage> {
        &self.storage
    }

    /// Save `draft` under planner date `date`
    pub fn record(&self, draft: SessionDraft, date: NaiveDate, now: DateTime<Utc>) -> SaveOutcome {
        // Zero-length runs are never saved, whatever the configured minimum
        if draft.total_secs == 0 || draft.total_secs < self.min_session_secs {
            debug!(
                total = draft.total_secs,
                min = self.min_session_secs,
                "Session too short, not saving"
            );
            return SaveOutcome::Discarded(DiscardReason::TooShort {
                total_secs: draft.total_secs,
            });
        }

        let subject = match draft.subject.as_deref().map(str::trim) {
            Some(subject) if !subject.is_empty() => subject.to_string(),
            _ => self.default_subject.clone(),
        };
        let record = StudySessionRecord::from_draft(draft, date, subject, now);

        match self.storage.record_session(&record) {
            Ok(()) => {
                info!(
                    id = %record.id,
                    date = %record.date,
                    duration = record.duration_secs,
                    "Study session saved"
                );
                SaveOutcome::Saved(record)
            }
            Err(e) => {
                error!(id = %record.id, "Failed to save study session: {:#}", e);
                SaveOutcome::Discarded(DiscardReason::PersistenceFailed(TimerError::Persistence {
                    session_id: record.id,
                    message: format!("{:#}", e),
                }))
            }
        }
    }

    /// Stop `machine` and save its run
    ///
    /// Returns the save outcome and the machine's remaining effects; the
    /// `SessionEnded` effect is consumed here.
    pub fn stop(
        &self,
        machine: &mut TimerMachine,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> (SaveOutcome, Vec<TimerEffect>) {
        let mut draft = None;
        let mut residual = Vec::new();
        for effect in machine.transition(TimerEvent::Stop, now) {
            match effect {
                TimerEffect::SessionEnded(d) => draft = Some(d),
                other => residual.push(other),
            }
        }

        let outcome = match draft {
            Some(draft) => self.record(draft, date, now),
            None => SaveOutcome::Discarded(DiscardReason::NothingToSave),
        };
        (outcome, residual)
    }
}
