//! Command dispatch loop

mod runner;

pub use runner::{CommandLoop, DEFAULT_MAX_ROUND_TRIPS, LoopEvent, LoopState};
