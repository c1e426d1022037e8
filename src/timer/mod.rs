pub mod commands;
pub mod config;
pub mod controller;
pub mod state;

pub use config::TimerConfig;
pub use controller::TimerController;
pub use state::{format_clock, Cue, Phase, RoundLabel, TimerSnapshot, TimerState, TimerStatus};
