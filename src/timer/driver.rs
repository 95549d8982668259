//! Tokio driver for a [`TimerMachine`]
//!
//! The controller owns the machine, the single tick task and the wake lock.
//! Every command locks the machine, applies one event and carries out the
//! returned effects. Finished runs are saved on the blocking pool after the
//! machine has already reset.

use std::sync::{Arc, Mutex as StdMutex, PoisonError, Weak};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate, Utc};
use tokio::sync::{Mutex, MutexGuard};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, error};

use crate::error::TimerError;
use crate::method::{apply_custom_settings, CustomSettings, TimerMethod};
use crate::session::{DailyStudyTime, DiscardReason, SaveOutcome, SessionRecorder};

use super::clock::{Clock, SystemClock};
use super::machine::{TimerEffect, TimerEvent, TimerMachine};
use super::state::{ExamResult, SessionDraft, TimerSnapshot};
use super::wake_lock::{NoopWakeLock, WakeLock, WakeLockGuard};

pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Presentation hooks; all methods default to doing nothing
pub trait TimerObserver: Send + Sync {
    /// Called after every tick and every command with the fresh state
    fn on_tick(&self, _snapshot: &TimerSnapshot) {}

    fn on_exam_completed(&self, _result: &ExamResult) {}

    fn on_notice(&self, _message: &str) {}
}

struct SilentObserver;

impl TimerObserver for SilentObserver {}

/// What a batch of effects asks of the tick source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickRequest {
    Keep,
    Schedule,
    Cancel,
}

#[derive(Debug)]
struct AppliedEffects {
    tick: TickRequest,
    draft: Option<SessionDraft>,
}

struct Inner {
    machine: Mutex<TimerMachine>,
    /// Only touched while `machine` is locked
    ticker: Mutex<Option<JoinHandle<()>>>,
    recorder: Arc<SessionRecorder>,
    wake_lock: StdMutex<WakeLockGuard>,
    observer: Arc<dyn TimerObserver>,
    clock: Arc<dyn Clock>,
    tick_interval: Duration,
    selected_date: StdMutex<Option<NaiveDate>>,
}

/// Builder for [`TimerController`]
pub struct TimerControllerBuilder {
    method: TimerMethod,
    recorder: Arc<SessionRecorder>,
    observer: Arc<dyn TimerObserver>,
    clock: Arc<dyn Clock>,
    wake_lock: Arc<dyn WakeLock>,
    tick_interval: Duration,
}

impl TimerControllerBuilder {
    pub fn observer(mut self, observer: Arc<dyn TimerObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn wake_lock(mut self, wake_lock: Arc<dyn WakeLock>) -> Self {
        self.wake_lock = wake_lock;
        self
    }

    pub fn tick_interval(mut self, tick_interval: Duration) -> Self {
        self.tick_interval = tick_interval;
        self
    }

    pub fn build(self) -> TimerController {
        TimerController {
            inner: Arc::new(Inner {
                machine: Mutex::new(TimerMachine::new(self.method)),
                ticker: Mutex::new(None),
                recorder: self.recorder,
                wake_lock: StdMutex::new(WakeLockGuard::new(self.wake_lock)),
                observer: self.observer,
                clock: self.clock,
                tick_interval: self.tick_interval,
                selected_date: StdMutex::new(None),
            }),
        }
    }
}

/// Handle to a running study timer; clones share the same timer
#[derive(Clone)]
pub struct TimerController {
    inner: Arc<Inner>,
}

impl TimerController {
    pub fn builder(method: TimerMethod, recorder: Arc<SessionRecorder>) -> TimerControllerBuilder {
        TimerControllerBuilder {
            method,
            recorder,
            observer: Arc::new(SilentObserver),
            clock: Arc::new(SystemClock),
            wake_lock: Arc::new(NoopWakeLock),
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }

    /// Start from Idle or resume from Paused
    pub async fn start(&self) {
        self.dispatch_without_draft(TimerEvent::Start).await;
    }

    pub async fn pause(&self) {
        self.dispatch_without_draft(TimerEvent::Pause).await;
    }

    /// Clear the current run without saving it
    pub async fn reset(&self) {
        self.dispatch_without_draft(TimerEvent::Reset).await;
    }

    /// Stop the run and save it, returning what happened to it
    pub async fn stop(&self) -> SaveOutcome {
        let Some((draft, now)) = self.inner.dispatch(TimerEvent::Stop).await else {
            return SaveOutcome::Discarded(DiscardReason::NothingToSave);
        };

        let outcome = match self.inner.persist(draft, now).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Session save task failed: {}", e);
                SaveOutcome::Discarded(DiscardReason::PersistenceFailed(
                    TimerError::Persistence {
                        session_id: String::new(),
                        message: e.to_string(),
                    },
                ))
            }
        };

        if let Some(notice) = outcome.notice() {
            self.inner.observer.on_notice(&notice);
        }
        outcome
    }

    /// Switch methods; any unsaved run is discarded
    pub async fn select_method(&self, method: TimerMethod) {
        self.dispatch_without_draft(TimerEvent::SelectMethod(method))
            .await;
    }

    /// Replace the current method with a customized copy of it
    ///
    /// On error the current configuration is left as it was.
    pub async fn customize(&self, settings: CustomSettings) -> Result<(), TimerError> {
        let now = self.inner.clock.now();
        let machine = self.inner.machine.lock().await;
        let method = apply_custom_settings(machine.method(), &settings)?;
        // Same lock: a concurrent select_method cannot slip in between
        self.inner
            .dispatch_locked(machine, TimerEvent::SelectMethod(method), now)
            .await;
        Ok(())
    }

    pub async fn set_subject(&self, subject: impl Into<String>) {
        self.inner.machine.lock().await.set_subject(subject);
    }

    /// Planner date finished runs are saved under; `None` means today
    pub fn set_selected_date(&self, date: Option<NaiveDate>) {
        *self
            .inner
            .selected_date
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = date;
    }

    pub async fn method(&self) -> TimerMethod {
        self.inner.machine.lock().await.method().clone()
    }

    pub async fn snapshot(&self) -> TimerSnapshot {
        let now = self.inner.clock.now();
        self.inner.machine.lock().await.snapshot(now)
    }

    /// Study seconds for the selected date, including the unsaved run
    pub async fn daily_total(&self) -> Result<u64> {
        let now = self.inner.clock.now();
        let snapshot = self.inner.machine.lock().await.snapshot(now);
        let date = self.inner.planner_date(now);

        let recorder = self.inner.recorder.clone();
        let sessions = tokio::task::spawn_blocking(move || recorder.storage().sessions_for_date(date))
            .await
            .context("Session load task failed")?
            .context("Failed to load study sessions")?;

        Ok(DailyStudyTime::local().total_for(date, &snapshot, &sessions))
    }

    /// Whether a tick task is currently installed and running
    pub async fn has_active_ticker(&self) -> bool {
        let _machine = self.inner.machine.lock().await;
        self.inner
            .ticker
            .lock()
            .await
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    pub fn wake_lock_held(&self) -> bool {
        self.inner
            .wake_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_held()
    }

    async fn dispatch_without_draft(&self, event: TimerEvent) {
        if let Some((draft, _)) = self.inner.dispatch(event).await {
            debug!(total = draft.total_secs, "Dropping unexpected session draft");
        }
    }
}

impl Inner {
    /// Apply one command event; returns the finished run, if any
    async fn dispatch(self: &Arc<Self>, event: TimerEvent) -> Option<(SessionDraft, DateTime<Utc>)> {
        let now = self.clock.now();
        let machine = self.machine.lock().await;
        self.dispatch_locked(machine, event, now).await
    }

    /// Apply `event` to an already locked machine, releasing the lock before notifying
    async fn dispatch_locked(
        self: &Arc<Self>,
        mut machine: MutexGuard<'_, TimerMachine>,
        event: TimerEvent,
        now: DateTime<Utc>,
    ) -> Option<(SessionDraft, DateTime<Utc>)> {
        let effects = machine.transition(event, now);
        let applied = self.apply(effects);

        {
            let mut ticker = self.ticker.lock().await;
            match applied.tick {
                TickRequest::Schedule => {
                    if let Some(handle) = ticker.take() {
                        handle.abort();
                    }
                    *ticker = Some(self.spawn_ticker());
                }
                TickRequest::Cancel => {
                    if let Some(handle) = ticker.take() {
                        handle.abort();
                    }
                }
                TickRequest::Keep => {}
            }
        }

        let snapshot = machine.snapshot(now);
        drop(machine);
        self.observer.on_tick(&snapshot);

        applied.draft.map(|draft| (draft, now))
    }

    /// One tick from inside the tick task
    async fn tick(self: &Arc<Self>) -> TickRequest {
        let now = self.clock.now();
        let mut machine = self.machine.lock().await;
        let effects = machine.transition(TimerEvent::Tick, now);
        let applied = self.apply(effects);

        if applied.tick == TickRequest::Cancel {
            // Detach rather than abort: this task is the one being removed
            self.ticker.lock().await.take();
        }

        let snapshot = machine.snapshot(now);
        drop(machine);
        self.observer.on_tick(&snapshot);

        if let Some(draft) = applied.draft {
            self.persist_detached(draft, now);
        }
        applied.tick
    }

    fn apply(&self, effects: Vec<TimerEffect>) -> AppliedEffects {
        let mut applied = AppliedEffects {
            tick: TickRequest::Keep,
            draft: None,
        };

        for effect in effects {
            match effect {
                TimerEffect::ScheduleTick => applied.tick = TickRequest::Schedule,
                TimerEffect::CancelTick => applied.tick = TickRequest::Cancel,
                TimerEffect::AcquireWakeLock => self.lock_wake_lock().acquire(),
                TimerEffect::ReleaseWakeLock => self.lock_wake_lock().release(),
                TimerEffect::Notice(message) => self.observer.on_notice(&message),
                TimerEffect::ExamCompleted(result) => self.observer.on_exam_completed(&result),
                TimerEffect::SessionEnded(draft) => applied.draft = Some(draft),
            }
        }
        applied
    }

    fn spawn_ticker(self: &Arc<Self>) -> JoinHandle<()> {
        let inner: Weak<Inner> = Arc::downgrade(self);
        let period = self.tick_interval;

        tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately
            interval.tick().await;

            loop {
                interval.tick().await;
                let Some(inner) = inner.upgrade() else {
                    break;
                };
                match inner.tick().await {
                    TickRequest::Keep => {}
                    TickRequest::Schedule => interval.reset(),
                    TickRequest::Cancel => break,
                }
            }
        })
    }

    fn persist(&self, draft: SessionDraft, now: DateTime<Utc>) -> JoinHandle<SaveOutcome> {
        let recorder = self.recorder.clone();
        let date = self.planner_date(now);
        tokio::task::spawn_blocking(move || recorder.record(draft, date, now))
    }

    fn persist_detached(&self, draft: SessionDraft, now: DateTime<Utc>) {
        let handle = self.persist(draft, now);
        let observer = self.observer.clone();
        tokio::spawn(async move {
            match handle.await {
                Ok(outcome) => {
                    if let Some(notice) = outcome.notice() {
                        observer.on_notice(&notice);
                    }
                }
                Err(e) => error!("Session save task failed: {}", e),
            }
        });
    }

    fn planner_date(&self, now: DateTime<Utc>) -> NaiveDate {
        self.selected_date
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .unwrap_or_else(|| now.with_timezone(&Local).date_naive())
    }

    fn lock_wake_lock(&self) -> std::sync::MutexGuard<'_, WakeLockGuard> {
        self.wake_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
