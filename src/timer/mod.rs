//! Study timer
//!
//! The [`TimerMachine`] holds the phase logic and is driven by explicit
//! events. [`TimerController`] runs a machine on tokio: it owns the single
//! tick task, applies the machine's effects and saves finished runs.

pub mod clock;
pub mod driver;
pub mod elapsed;
pub mod machine;
pub mod state;
pub mod wake_lock;

pub use clock::{Clock, ManualClock, SystemClock};
pub use driver::{TimerController, TimerObserver};
pub use machine::{TimerEffect, TimerEvent, TimerMachine};
pub use state::{
    ActivePhase, ExamResult, ExamTally, LogEntry, Phase, SessionDraft, TimerRuntimeState,
    TimerSnapshot,
};
pub use wake_lock::{NoopWakeLock, WakeLock, WakeLockGuard};
