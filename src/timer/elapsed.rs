//! Elapsed-time accounting against an anchor instant
//!
//! Elapsed time is always `now - anchor`, recomputed on demand. Resuming
//! shifts the anchor back by the time already accrued so the count
//! continues instead of restarting.

use chrono::{DateTime, Duration, Utc};

/// Anchor for a phase that begins at `now`
pub fn start(now: DateTime<Utc>) -> DateTime<Utc> {
    now
}

/// Whole seconds since `anchor`, clamped to zero if the clock moved backwards
pub fn elapsed_secs(anchor: DateTime<Utc>, now: DateTime<Utc>) -> u64 {
    (now - anchor).num_seconds().max(0) as u64
}

/// Seconds left in a phase of `phase_secs` after `elapsed` seconds
pub fn remaining_secs(phase_secs: u64, elapsed: u64) -> u64 {
    phase_secs.saturating_sub(elapsed)
}

/// Anchor that makes `elapsed_secs(anchor, now) == previously_elapsed`
pub fn resume_anchor(now: DateTime<Utc>, previously_elapsed: u64) -> DateTime<Utc> {
    now - Duration::seconds(previously_elapsed as i64)
}
