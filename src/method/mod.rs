//! Timer methods
//!
//! A timer method is an immutable work/break configuration. Exam-mode
//! methods reinterpret the work duration as seconds per question and
//! count down a fixed number of questions instead of alternating phases.

pub mod catalog;

pub use catalog::MethodCatalog;

use serde::{Deserialize, Serialize};

use crate::error::TimerError;

/// Immutable timer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerMethod {
    /// Unique key in the catalog
    pub id: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Short description shown in method pickers
    #[serde(default)]
    pub description: String,
    /// Work phase length, or seconds per question in exam mode
    pub work_duration_secs: u64,
    /// Break phase length (unused in exam mode)
    #[serde(default)]
    pub break_duration_secs: u64,
    /// Count down questions instead of alternating work and break
    #[serde(default)]
    pub is_exam_mode: bool,
    /// Number of questions (exam mode only)
    #[serde(default)]
    pub question_count: u32,
    /// Whether users may override the durations
    #[serde(default)]
    pub is_customizable: bool,
}

impl TimerMethod {
    /// Create a standard work/break method
    pub fn standard(
        id: impl Into<String>,
        name: impl Into<String>,
        work_duration_secs: u64,
        break_duration_secs: u64,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            work_duration_secs,
            break_duration_secs,
            is_exam_mode: false,
            question_count: 0,
            is_customizable: false,
        }
    }

    /// Create an exam-mode method
    pub fn exam(
        id: impl Into<String>,
        name: impl Into<String>,
        seconds_per_question: u64,
        question_count: u32,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            work_duration_secs: seconds_per_question,
            break_duration_secs: 0,
            is_exam_mode: true,
            question_count,
            is_customizable: false,
        }
    }

    /// Set the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Allow users to override this method's durations
    pub fn customizable(mut self) -> Self {
        self.is_customizable = true;
        self
    }

    /// Check the method invariants
    pub fn validate(&self) -> Result<(), TimerError> {
        if self.id.trim().is_empty() {
            return Err(TimerError::invalid_method(&self.id, "id must not be empty"));
        }
        if self.work_duration_secs == 0 {
            return Err(TimerError::invalid_method(
                &self.id,
                "work duration must be positive",
            ));
        }
        if self.is_exam_mode && self.question_count == 0 {
            return Err(TimerError::invalid_method(
                &self.id,
                "exam mode needs at least one question",
            ));
        }
        Ok(())
    }
}

/// User overrides for a customizable method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomSettings {
    /// Work and break lengths for a standard method
    Standard {
        work_duration_secs: u64,
        break_duration_secs: u64,
    },
    /// Time per question and question count for an exam method
    Exam {
        seconds_per_question: u64,
        question_count: u32,
    },
}

/// Return a copy of `method` with the custom settings applied
///
/// The input method is left untouched whether or not the settings are valid.
pub fn apply_custom_settings(
    method: &TimerMethod,
    settings: &CustomSettings,
) -> Result<TimerMethod, TimerError> {
    if !method.is_customizable {
        return Err(TimerError::invalid_settings(format!(
            "method '{}' is not customizable",
            method.id
        )));
    }

    let mut customized = method.clone();
    match (*settings, method.is_exam_mode) {
        (
            CustomSettings::Standard {
                work_duration_secs,
                break_duration_secs,
            },
            false,
        ) => {
            if work_duration_secs == 0 {
                return Err(TimerError::invalid_settings("work duration must be positive"));
            }
            if break_duration_secs == 0 {
                return Err(TimerError::invalid_settings("break duration must be positive"));
            }
            customized.work_duration_secs = work_duration_secs;
            customized.break_duration_secs = break_duration_secs;
        }
        (
            CustomSettings::Exam {
                seconds_per_question,
                question_count,
            },
            true,
        ) => {
            if seconds_per_question == 0 {
                return Err(TimerError::invalid_settings(
                    "time per question must be positive",
                ));
            }
            if question_count == 0 {
                return Err(TimerError::invalid_settings(
                    "question count must be positive",
                ));
            }
            customized.work_duration_secs = seconds_per_question;
            customized.question_count = question_count;
        }
        (CustomSettings::Standard { .. }, true) => {
            return Err(TimerError::invalid_settings(
                "work/break settings do not apply to an exam method",
            ));
        }
        (CustomSettings::Exam { .. }, false) => {
            return Err(TimerError::invalid_settings(
                "exam settings do not apply to a standard method",
            ));
        }
    }

    Ok(customized)
}
