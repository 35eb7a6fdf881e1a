//! # Pomotimer Core Library
//!
//! This library provides the countdown engine behind the Pomotimer focus timer.
//! The CLI binary is a thin presentation layer over the same core library.
//!
//! ## Architecture
//!
//! - **Timer Engine**: A per-second countdown state machine. The engine owns
//!   exactly one repeating task while running and reports completion through
//!   an optional callback.
//! - **Scheduler**: The host primitive that fires the engine's tick once per
//!   second. Backed by tokio in production and by a simulated clock in tests.
//! - **Storage**: TOML-based configuration for the front-end.
//!
//! ## Key Components
//!
//! - [`TimerEngine`]: Core timer state machine
//! - [`Scheduler`]: Repeating-task primitive consumed by the engine
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod storage;
pub mod timer;

pub use error::{ConfigError, CoreError, ValidationError};
pub use events::Event;
pub use storage::Config;
pub use timer::{
    format_clock, CompletionCallback, ManualScheduler, Scheduler, TaskHandle, TimerEngine,
    TimerMode, TimerState, TimerStatus, TokioScheduler,
};
