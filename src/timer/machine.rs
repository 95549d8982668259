//! Timer state machine
//!
//! All state changes go through [`TimerMachine::transition`], which returns
//! the side effects the caller must carry out (tick scheduling, wake lock,
//! notices, session hand-off). The machine itself never sleeps, spawns or
//! performs IO.

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::method::TimerMethod;
use crate::session::stats::format_clock;

use super::elapsed;
use super::state::{
    ActivePhase, ExamResult, ExamTally, LogEntry, Phase, SessionDraft, TimerRuntimeState,
    TimerSnapshot,
};

/// Input to the state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEvent {
    Start,
    Pause,
    /// Recurring scheduling signal; recomputes elapsed time and checks exhaustion
    Tick,
    Stop,
    Reset,
    /// Switch to another method, discarding the current run
    SelectMethod(TimerMethod),
}

/// Side effect requested by a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerEffect {
    /// Replace any installed tick source with a fresh one starting now
    ScheduleTick,
    /// Remove the tick source
    CancelTick,
    AcquireWakeLock,
    ReleaseWakeLock,
    /// Short user-facing message
    Notice(String),
    ExamCompleted(ExamResult),
    /// The run is over and should go to the session recorder
    SessionEnded(SessionDraft),
}

/// Study timer for one selected method
#[derive(Debug, Clone)]
pub struct TimerMachine {
    method: TimerMethod,
    state: TimerRuntimeState,
    subject: Option<String>,
}

impl TimerMachine {
    /// Create an idle machine for `method`
    pub fn new(method: TimerMethod) -> Self {
        let state = TimerRuntimeState::new(initial_questions(&method));
        Self {
            method,
            state,
            subject: None,
        }
    }

    pub fn method(&self) -> &TimerMethod {
        &self.method
    }

    pub fn state(&self) -> &TimerRuntimeState {
        &self.state
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Subject recorded with the next saved session; survives resets
    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.subject = Some(subject.into());
    }

    /// Read-only view of the machine at `now`
    pub fn snapshot(&self, now: DateTime<Utc>) -> TimerSnapshot {
        let elapsed_in_phase = self.current_elapsed(now);
        let remaining_secs = match self.state.phase {
            Phase::Idle => self.method.work_duration_secs,
            Phase::Working => {
                elapsed::remaining_secs(self.phase_duration(ActivePhase::Working), elapsed_in_phase)
            }
            Phase::Break => {
                elapsed::remaining_secs(self.phase_duration(ActivePhase::Break), elapsed_in_phase)
            }
            Phase::Paused => elapsed::remaining_secs(
                self.phase_duration(self.state.paused_from),
                elapsed_in_phase,
            ),
        };

        TimerSnapshot {
            method_id: self.method.id.clone(),
            phase: self.state.phase,
            paused_from: self.state.paused_from,
            remaining_secs,
            elapsed_in_phase,
            total_accumulated_secs: self.state.total_accumulated_secs,
            cycle_index: self.state.cycle_index,
            remaining_questions: self
                .method
                .is_exam_mode
                .then_some(self.state.remaining_questions),
        }
    }

    /// Apply `event` at `now` and return the effects to carry out, in order
    pub fn transition(&mut self, event: TimerEvent, now: DateTime<Utc>) -> Vec<TimerEffect> {
        match event {
            TimerEvent::Start => self.on_start(now),
            TimerEvent::Pause => self.on_pause(now),
            TimerEvent::Tick => self.on_tick(now),
            TimerEvent::Stop => self.on_stop(now),
            TimerEvent::Reset => self.on_reset(),
            TimerEvent::SelectMethod(method) => self.on_select_method(method, now),
        }
    }

    fn on_start(&mut self, now: DateTime<Utc>) -> Vec<TimerEffect> {
        let (target, resumed) = match self.state.phase {
            Phase::Idle => (ActivePhase::Working, false),
            Phase::Paused => (self.state.paused_from, true),
            Phase::Working | Phase::Break => {
                debug!("Start ignored: timer already running");
                return Vec::new();
            }
        };

        let previously_elapsed = if resumed {
            self.state.elapsed_in_phase
        } else {
            0
        };
        self.state.phase_anchor = Some(if resumed {
            elapsed::resume_anchor(now, previously_elapsed)
        } else {
            elapsed::start(now)
        });
        self.state.elapsed_in_phase = previously_elapsed;
        self.state.phase = target.into();

        if self.method.is_exam_mode {
            if !resumed {
                self.log(
                    format!("exam started: {} questions", self.method.question_count),
                    now,
                );
            }
        } else if target == ActivePhase::Working && (!resumed || previously_elapsed == 0) {
            self.log(format!("cycle {} started", self.state.cycle_index), now);
        }

        info!(
            method = %self.method.id,
            cycle = self.state.cycle_index,
            resumed,
            "Timer entered {}",
            self.state.phase.as_str()
        );

        let mut effects = Vec::new();
        self.install_tick(&mut effects);
        effects.push(TimerEffect::AcquireWakeLock);
        effects
    }

    fn on_pause(&mut self, now: DateTime<Utc>) -> Vec<TimerEffect> {
        let active = match self.state.phase {
            Phase::Working => ActivePhase::Working,
            Phase::Break => ActivePhase::Break,
            Phase::Idle | Phase::Paused => {
                debug!("Pause ignored: timer not running");
                return Vec::new();
            }
        };

        self.state.elapsed_in_phase = self.current_elapsed(now);
        self.state.paused_from = active;
        self.state.phase = Phase::Paused;
        self.state.phase_anchor = None;

        if self.method.is_exam_mode {
            self.log(format!("question {} paused", self.current_question()), now);
        } else {
            self.log(format!("cycle {} paused", self.state.cycle_index), now);
        }

        info!(
            cycle = self.state.cycle_index,
            elapsed = self.state.elapsed_in_phase,
            "Timer paused"
        );

        let mut effects = Vec::new();
        self.remove_tick(&mut effects);
        effects.push(TimerEffect::ReleaseWakeLock);
        effects
    }

    fn on_tick(&mut self, now: DateTime<Utc>) -> Vec<TimerEffect> {
        let active = match self.state.phase {
            Phase::Working => ActivePhase::Working,
            Phase::Break => ActivePhase::Break,
            Phase::Idle | Phase::Paused => return Vec::new(),
        };

        let elapsed = self.current_elapsed(now);
        self.state.elapsed_in_phase = elapsed;
        if elapsed::remaining_secs(self.phase_duration(active), elapsed) > 0 {
            return Vec::new();
        }

        match active {
            ActivePhase::Working if self.method.is_exam_mode => {
                self.complete_question(elapsed, now)
            }
            ActivePhase::Working => self.complete_work(elapsed, now),
            ActivePhase::Break => self.complete_break(now),
        }
    }

    fn complete_work(&mut self, worked: u64, now: DateTime<Utc>) -> Vec<TimerEffect> {
        self.state.total_accumulated_secs += worked;
        self.log(
            format!(
                "cycle {} work completed ({})",
                self.state.cycle_index,
                format_clock(worked)
            ),
            now,
        );
        info!(
            worked,
            total = self.state.total_accumulated_secs,
            "Work phase completed"
        );

        self.state.cycle_index += 1;
        self.log(format!("cycle {} break started", self.state.cycle_index), now);

        self.state.phase = Phase::Break;
        self.state.phase_anchor = Some(elapsed::start(now));
        self.state.elapsed_in_phase = 0;

        let mut effects = Vec::new();
        self.install_tick(&mut effects);
        effects
    }

    fn complete_break(&mut self, now: DateTime<Utc>) -> Vec<TimerEffect> {
        self.log(format!("cycle {} break completed", self.state.cycle_index), now);
        self.state.cycle_index += 1;
        self.log(format!("cycle {} ready", self.state.cycle_index), now);

        // Breaks always flow straight into the next work phase
        self.state.phase = Phase::Idle;
        self.state.phase_anchor = None;
        self.state.elapsed_in_phase = 0;
        self.on_start(now)
    }

    fn complete_question(&mut self, question_secs: u64, now: DateTime<Utc>) -> Vec<TimerEffect> {
        self.state.total_accumulated_secs += question_secs;
        let question = self.current_question();

        if self.state.remaining_questions > 1 {
            self.state.remaining_questions -= 1;
            self.log(
                format!(
                    "question {} completed ({})",
                    question,
                    format_clock(question_secs)
                ),
                now,
            );
            self.state.phase_anchor = Some(elapsed::start(now));
            self.state.elapsed_in_phase = 0;

            let mut effects = Vec::new();
            self.install_tick(&mut effects);
            effects.push(TimerEffect::Notice(format!(
                "Next question ({} left)",
                self.state.remaining_questions
            )));
            return effects;
        }

        self.state.remaining_questions = 0;
        let total_questions = self.method.question_count;
        let result = ExamResult::new(
            total_questions,
            total_questions,
            self.state.total_accumulated_secs,
        );
        self.log(
            format!(
                "all questions completed: total {}, average {} per question",
                format_clock(result.total_time_secs),
                format_clock(result.average_time_secs)
            ),
            now,
        );
        info!(
            questions = total_questions,
            total = result.total_time_secs,
            "Exam completed"
        );

        let mut effects = Vec::new();
        self.remove_tick(&mut effects);
        effects.push(TimerEffect::ReleaseWakeLock);
        effects.push(TimerEffect::ExamCompleted(result));
        effects.push(TimerEffect::SessionEnded(self.draft()));
        self.reset_state();
        effects
    }

    fn on_stop(&mut self, now: DateTime<Utc>) -> Vec<TimerEffect> {
        if self.state.phase == Phase::Idle {
            debug!("Stop ignored: timer idle");
            return Vec::new();
        }

        if self.state.is_in_work_time() {
            self.state.total_accumulated_secs += self.current_elapsed(now);
        }

        if self.method.is_exam_mode {
            self.log("exam stopped".to_string(), now);
        } else {
            self.log(format!("cycle {} stopped", self.state.cycle_index), now);
        }

        let mut effects = vec![TimerEffect::CancelTick, TimerEffect::ReleaseWakeLock];
        self.state.tick_active = false;

        if self.method.is_exam_mode {
            let completed = self
                .method
                .question_count
                .saturating_sub(self.state.remaining_questions);
            effects.push(TimerEffect::ExamCompleted(ExamResult::new(
                completed,
                self.method.question_count,
                self.state.total_accumulated_secs,
            )));
        }

        info!(
            method = %self.method.id,
            total = self.state.total_accumulated_secs,
            cycles = self.state.cycle_index,
            "Timer stopped"
        );

        effects.push(TimerEffect::SessionEnded(self.draft()));
        self.reset_state();
        effects
    }

    fn on_reset(&mut self) -> Vec<TimerEffect> {
        self.reset_state();
        vec![TimerEffect::CancelTick, TimerEffect::ReleaseWakeLock]
    }

    fn on_select_method(&mut self, method: TimerMethod, now: DateTime<Utc>) -> Vec<TimerEffect> {
        let unsaved = self.state.total_accumulated_secs
            + if self.state.is_in_work_time() {
                self.current_elapsed(now)
            } else {
                0
            };
        if unsaved > 0 {
            warn!(
                from = %self.method.id,
                to = %method.id,
                unsaved,
                "Switching timer method discards unsaved study time"
            );
        }

        info!(method = %method.id, "Timer method selected");
        self.method = method;
        self.on_reset()
    }

    fn draft(&self) -> SessionDraft {
        SessionDraft {
            method_id: self.method.id.clone(),
            subject: self.subject.clone(),
            total_secs: self.state.total_accumulated_secs,
            cycles: self.state.cycle_index,
            notes: self.state.render_log(),
            exam: self.method.is_exam_mode.then(|| ExamTally {
                question_count: self.method.question_count,
                completed_questions: self
                    .method
                    .question_count
                    .saturating_sub(self.state.remaining_questions),
            }),
        }
    }

    fn reset_state(&mut self) {
        self.state = TimerRuntimeState::new(initial_questions(&self.method));
    }

    fn install_tick(&mut self, effects: &mut Vec<TimerEffect>) {
        self.state.tick_active = true;
        effects.push(TimerEffect::ScheduleTick);
    }

    fn remove_tick(&mut self, effects: &mut Vec<TimerEffect>) {
        self.state.tick_active = false;
        effects.push(TimerEffect::CancelTick);
    }

    fn current_elapsed(&self, now: DateTime<Utc>) -> u64 {
        match (self.state.phase, self.state.phase_anchor) {
            (Phase::Working | Phase::Break, Some(anchor)) => elapsed::elapsed_secs(anchor, now),
            _ => self.state.elapsed_in_phase,
        }
    }

    fn phase_duration(&self, phase: ActivePhase) -> u64 {
        match phase {
            ActivePhase::Working => self.method.work_duration_secs,
            ActivePhase::Break => self.method.break_duration_secs,
        }
    }

    /// 1-based number of the question currently being worked on
    fn current_question(&self) -> u32 {
        self.method
            .question_count
            .saturating_sub(self.state.remaining_questions)
            + 1
    }

    fn log(&mut self, text: String, now: DateTime<Utc>) {
        self.state.event_log.push(LogEntry { text, at: now });
    }
}

fn initial_questions(method: &TimerMethod) -> u32 {
    if method.is_exam_mode {
        method.question_count
    } else {
        0
    }
}
