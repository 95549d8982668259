use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Phase of the timer state machine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    #[default]
    Idle,
    Working,
    Break,
    Paused,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Working => "working",
            Phase::Break => "break",
            Phase::Paused => "paused",
        }
    }
}

/// A phase that can be paused and later restored
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivePhase {
    #[default]
    Working,
    Break,
}

impl From<ActivePhase> for Phase {
    fn from(phase: ActivePhase) -> Self {
        match phase {
            ActivePhase::Working => Phase::Working,
            ActivePhase::Break => Phase::Break,
        }
    }
}

/// One line of the human-readable transition trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub text: String,
    pub at: DateTime<Utc>,
}

impl LogEntry {
    /// Render as `HH:MM:SS text` in local time
    pub fn render(&self) -> String {
        format!(
            "{} {}",
            self.at.with_timezone(&Local).format("%H:%M:%S"),
            self.text
        )
    }
}

/// Elapsed phase time counts as study time
fn in_work_time(phase: Phase, paused_from: ActivePhase) -> bool {
    phase == Phase::Working || (phase == Phase::Paused && paused_from == ActivePhase::Working)
}

/// Mutable state of one timer run, owned by a single machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerRuntimeState {
    pub phase: Phase,
    /// Phase to restore on resume
    pub paused_from: ActivePhase,
    pub cycle_index: u32,
    /// Instant from which the current phase's elapsed time is measured
    pub phase_anchor: Option<DateTime<Utc>>,
    /// Derived from `phase_anchor`; frozen while paused
    pub elapsed_in_phase: u64,
    /// Confirmed Working seconds of the current unsaved session
    pub total_accumulated_secs: u64,
    pub remaining_questions: u32,
    pub event_log: Vec<LogEntry>,
    /// Whether a tick source is supposed to be installed
    pub tick_active: bool,
}

impl TimerRuntimeState {
    /// Fresh idle state; `question_count` seeds the exam countdown
    pub fn new(question_count: u32) -> Self {
        Self {
            phase: Phase::Idle,
            paused_from: ActivePhase::Working,
            cycle_index: 1,
            phase_anchor: None,
            elapsed_in_phase: 0,
            total_accumulated_secs: 0,
            remaining_questions: question_count,
            event_log: Vec::new(),
            tick_active: false,
        }
    }

    /// Working now, or paused out of Working
    pub fn is_in_work_time(&self) -> bool {
        in_work_time(self.phase, self.paused_from)
    }

    /// Event log rendered one entry per line
    pub fn render_log(&self) -> String {
        self.event_log
            .iter()
            .map(LogEntry::render)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Read-only view of a machine for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerSnapshot {
    pub method_id: String,
    pub phase: Phase,
    pub paused_from: ActivePhase,
    pub remaining_secs: u64,
    pub elapsed_in_phase: u64,
    pub total_accumulated_secs: u64,
    pub cycle_index: u32,
    pub remaining_questions: Option<u32>,
}

impl TimerSnapshot {
    /// Working time not yet confirmed into the accumulator
    pub fn in_flight_work_secs(&self) -> u64 {
        if in_work_time(self.phase, self.paused_from) {
            self.elapsed_in_phase
        } else {
            0
        }
    }
}

/// Outcome of an exam-mode run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExamResult {
    pub completed_questions: u32,
    pub total_questions: u32,
    pub total_time_secs: u64,
    /// Rounded to the nearest second; zero when nothing was completed
    pub average_time_secs: u64,
}

impl ExamResult {
    pub fn new(completed_questions: u32, total_questions: u32, total_time_secs: u64) -> Self {
        let average_time_secs = if completed_questions > 0 {
            (total_time_secs as f64 / completed_questions as f64).round() as u64
        } else {
            0
        };
        Self {
            completed_questions,
            total_questions,
            total_time_secs,
            average_time_secs,
        }
    }
}

/// Question counts stored with exam-mode sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamTally {
    pub question_count: u32,
    pub completed_questions: u32,
}

/// A finished run handed from the machine to the session recorder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDraft {
    pub method_id: String,
    pub subject: Option<String>,
    pub total_secs: u64,
    pub cycles: u32,
    pub notes: String,
    pub exam: Option<ExamTally>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_idle() {
        let state = TimerRuntimeState::new(0);
        assert_eq!(state.phase, Phase::Idle);
        assert_eq!(state.cycle_index, 1);
        assert!(!state.tick_active);
        assert!(!state.is_in_work_time());
    }

    #[test]
    fn test_exam_average_rounds() {
        let result = ExamResult::new(3, 3, 31);
        assert_eq!(result.average_time_secs, 10);

        let result = ExamResult::new(2, 5, 25);
        assert_eq!(result.average_time_secs, 13);
    }

    #[test]
    fn test_exam_average_with_nothing_completed() {
        let result = ExamResult::new(0, 10, 7);
        assert_eq!(result.average_time_secs, 0);
    }

    #[test]
    fn test_in_flight_only_counts_work() {
        let mut snapshot = TimerSnapshot {
            method_id: "pomodoro".to_string(),
            phase: Phase::Break,
            paused_from: ActivePhase::Working,
            remaining_secs: 100,
            elapsed_in_phase: 200,
            total_accumulated_secs: 1500,
            cycle_index: 2,
            remaining_questions: None,
        };
        assert_eq!(snapshot.in_flight_work_secs(), 0);

        snapshot.phase = Phase::Paused;
        assert_eq!(snapshot.in_flight_work_secs(), 200);

        snapshot.paused_from = ActivePhase::Break;
        assert_eq!(snapshot.in_flight_work_secs(), 0);
    }

    #[test]
    fn test_state_and_snapshot_agree_on_work_time() {
        let phases = [Phase::Idle, Phase::Working, Phase::Break, Phase::Paused];
        for phase in phases {
            for paused_from in [ActivePhase::Working, ActivePhase::Break] {
                let mut state = TimerRuntimeState::new(0);
                state.phase = phase;
                state.paused_from = paused_from;
                state.elapsed_in_phase = 42;

                let snapshot = TimerSnapshot {
                    method_id: "pomodoro".to_string(),
                    phase,
                    paused_from,
                    remaining_secs: 0,
                    elapsed_in_phase: 42,
                    total_accumulated_secs: 0,
                    cycle_index: 1,
                    remaining_questions: None,
                };

                let expected = if state.is_in_work_time() { 42 } else { 0 };
                assert_eq!(snapshot.in_flight_work_secs(), expected, "{:?}/{:?}", phase, paused_from);
            }
        }
    }
}
