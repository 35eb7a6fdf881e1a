mod engine;
mod mode;
mod scheduler;

pub use engine::{CompletionCallback, TimerEngine};
pub use mode::{format_clock, TimerMode, TimerState, TimerStatus, BREAK_SECS, MIN_CUSTOM_SECS, WORK_SECS};
pub use scheduler::{
    ManualHandle, ManualScheduler, RepeatingTask, Scheduler, TaskHandle, TokioHandle,
    TokioScheduler,
};
