//! Study timer - timer state machine and session accounting for a study planner
//!
//! This library provides the timer-method catalog, the Working/Break/Paused
//! state machine with exam-mode countdown, session recording and daily
//! study-time aggregation.

pub mod config;
pub mod error;
pub mod logging;
pub mod method;
pub mod session;
pub mod timer;
