//! Sweep pipeline stages.
//!
//! - `classify`: raw query result → availability
//! - `transition`: compare with stored state, notify and archive on change
//! - `scheduler`: jittered sweep loop with heartbeat and interrupt handling

pub mod classify;
pub mod scheduler;
pub mod transition;

pub use classify::classify;
pub use scheduler::{Jitter, Scheduler, StopReason, Ticker};
pub use transition::{TransitionOutcome, apply, change_message, detect};
