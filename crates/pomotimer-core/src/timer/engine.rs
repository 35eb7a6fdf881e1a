//! Timer engine implementation.
//!
//! The engine is a per-second countdown state machine. It does not spawn
//! threads itself: while running it owns exactly one repeating task registered
//! with a [`Scheduler`], and that task is the only thing that mutates state
//! outside the public commands.
//!
//! ## State Transitions
//!
//! ```text
//! Idle --start--> Running --pause--> Paused --start--> Running
//! Running --[reaches 0]--> Idle            (completion callback fires once)
//! any --reset / set_mode / set_custom_time--> Idle
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let engine = TimerEngine::with_callback(TokioScheduler::current()?, |mode| {
//!     println!("{mode} finished");
//! });
//! engine.start();
//! // Poll as often as the display needs:
//! let state = engine.state();
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};

use super::mode::{
    format_clock, TimerMode, TimerState, TimerStatus, MIN_CUSTOM_SECS, WORK_SECS,
};
use super::scheduler::{RepeatingTask, Scheduler, TaskHandle, TokioScheduler};
use crate::events::Event;

/// Invoked with the active mode each time a countdown reaches zero.
pub type CompletionCallback = Arc<dyn Fn(TimerMode) + Send + Sync + 'static>;

const TICK_PERIOD: Duration = Duration::from_secs(1);

struct ActiveTask<H> {
    /// Ticks carrying any other generation are stale and ignored.
    generation: u64,
    handle: H,
}

struct Inner<H> {
    mode: TimerMode,
    status: TimerStatus,
    remaining_seconds: u64,
    /// Last duration assigned through `set_custom_time`.
    custom_seconds: Option<u64>,
    task: Option<ActiveTask<H>>,
    next_generation: u64,
    debug: bool,
}

impl<H: TaskHandle> Inner<H> {
    fn new() -> Self {
        Self {
            mode: TimerMode::Work,
            status: TimerStatus::Idle,
            remaining_seconds: WORK_SECS,
            custom_seconds: None,
            task: None,
            next_generation: 0,
            debug: false,
        }
    }

    fn snapshot(&self) -> TimerState {
        TimerState {
            mode: self.mode,
            status: self.status,
            remaining_seconds: self.remaining_seconds,
        }
    }

    /// Full duration for `mode`. Custom falls back to the work length until
    /// a custom duration has been assigned.
    fn duration_for(&self, mode: TimerMode) -> u64 {
        mode.default_secs()
            .or(self.custom_seconds)
            .unwrap_or(WORK_SECS)
    }

    fn cancel_task(&mut self) {
        if let Some(task) = self.task.take() {
            task.handle.cancel();
        }
    }

    fn go_idle(&mut self, remaining_seconds: u64) {
        self.cancel_task();
        self.status = TimerStatus::Idle;
        self.remaining_seconds = remaining_seconds;
    }

    /// One decrement. Returns the mode when this tick completed the countdown.
    fn tick(&mut self, generation: u64) -> Option<TimerMode> {
        if self.task.as_ref().map(|t| t.generation) != Some(generation) {
            return None;
        }
        self.remaining_seconds = self.remaining_seconds.saturating_sub(1);
        if self.debug {
            debug!(
                mode = %self.mode,
                remaining = self.remaining_seconds,
                "tick"
            );
        }
        if self.remaining_seconds > 0 {
            return None;
        }
        self.cancel_task();
        self.status = TimerStatus::Idle;
        Some(self.mode)
    }
}

/// Core timer engine.
///
/// All commands take `&self`; the state record lives behind a single mutex
/// shared with the tick task, so a `TimerEngine` can sit in an `Arc` and be
/// driven from several tasks at once.
pub struct TimerEngine<S: Scheduler = TokioScheduler> {
    scheduler: S,
    inner: Arc<Mutex<Inner<S::Handle>>>,
    on_complete: Option<CompletionCallback>,
}

impl<S: Scheduler> TimerEngine<S> {
    /// Create an engine in `Idle`, work mode, 25 minutes remaining.
    pub fn new(scheduler: S) -> Self {
        Self {
            scheduler,
            inner: Arc::new(Mutex::new(Inner::new())),
            on_complete: None,
        }
    }

    /// Like [`new`](Self::new), with a callback fired on every natural
    /// completion.
    pub fn with_callback<F>(scheduler: S, on_complete: F) -> Self
    where
        F: Fn(TimerMode) + Send + Sync + 'static,
    {
        let mut engine = Self::new(scheduler);
        engine.on_complete = Some(Arc::new(on_complete));
        engine
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Consistent copy of `{mode, status, remaining_seconds}`.
    pub fn state(&self) -> TimerState {
        self.lock().snapshot()
    }

    /// Build a full state snapshot event.
    pub fn snapshot(&self) -> Event {
        let state = self.state();
        Event::StateSnapshot {
            mode: state.mode,
            status: state.status,
            remaining_seconds: state.remaining_seconds,
            display: format_clock(state.remaining_seconds),
            at: Utc::now(),
        }
    }

    pub fn is_debug(&self) -> bool {
        self.lock().debug
    }

    /// Log every tick of this engine at `debug` level.
    pub fn set_debug(&self, enabled: bool) {
        self.lock().debug = enabled;
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin or resume the countdown. Returns `None` if already running.
    ///
    /// Starting an engine that sits at zero reloads the mode's duration first.
    pub fn start(&self) -> Option<Event> {
        let mut inner = self.lock();
        let resumed = match inner.status {
            TimerStatus::Running => return None,
            TimerStatus::Paused => true,
            TimerStatus::Idle => false,
        };
        if inner.remaining_seconds == 0 {
            inner.remaining_seconds = inner.duration_for(inner.mode);
        }

        let generation = inner.next_generation;
        inner.next_generation += 1;
        let handle = self
            .scheduler
            .schedule_repeating(TICK_PERIOD, self.tick_task(generation));
        inner.task = Some(ActiveTask { generation, handle });
        inner.status = TimerStatus::Running;

        debug!(mode = %inner.mode, remaining = inner.remaining_seconds, resumed, "timer started");
        let (mode, remaining_seconds, at) = (inner.mode, inner.remaining_seconds, Utc::now());
        Some(if resumed {
            Event::TimerResumed {
                mode,
                remaining_seconds,
                at,
            }
        } else {
            Event::TimerStarted {
                mode,
                remaining_seconds,
                at,
            }
        })
    }

    /// Stop counting and keep the remaining time.
    ///
    /// Returns `None` unless the engine was running; pausing an idle engine
    /// leaves it idle.
    pub fn pause(&self) -> Option<Event> {
        let mut inner = self.lock();
        inner.cancel_task();
        if inner.status != TimerStatus::Running {
            return None;
        }
        inner.status = TimerStatus::Paused;
        debug!(mode = %inner.mode, remaining = inner.remaining_seconds, "timer paused");
        Some(Event::TimerPaused {
            mode: inner.mode,
            remaining_seconds: inner.remaining_seconds,
            at: Utc::now(),
        })
    }

    /// Return to `Idle` with the current mode's full duration.
    pub fn reset(&self) -> Event {
        let mut inner = self.lock();
        let duration = inner.duration_for(inner.mode);
        inner.go_idle(duration);
        debug!(mode = %inner.mode, remaining = duration, "timer reset");
        Event::TimerReset {
            mode: inner.mode,
            remaining_seconds: duration,
            at: Utc::now(),
        }
    }

    /// Switch mode, discarding any countdown in progress.
    pub fn set_mode(&self, mode: TimerMode) -> Event {
        let mut inner = self.lock();
        inner.mode = mode;
        let duration = inner.duration_for(mode);
        inner.go_idle(duration);
        debug!(%mode, remaining = duration, "mode changed");
        Event::ModeChanged {
            mode,
            remaining_seconds: duration,
            at: Utc::now(),
        }
    }

    /// Switch to custom mode with `minutes * 60 + seconds`.
    ///
    /// Totals below one second (zero or negative) are clamped to one second.
    pub fn set_custom_time(&self, minutes: i64, seconds: i64) -> Event {
        let total = minutes.saturating_mul(60).saturating_add(seconds);
        let duration = u64::try_from(total)
            .unwrap_or(0)
            .max(MIN_CUSTOM_SECS);

        let mut inner = self.lock();
        inner.mode = TimerMode::Custom;
        inner.custom_seconds = Some(duration);
        inner.go_idle(duration);
        debug!(minutes, seconds, remaining = duration, "custom time set");
        Event::ModeChanged {
            mode: TimerMode::Custom,
            remaining_seconds: duration,
            at: Utc::now(),
        }
    }

    pub fn set_custom_minutes(&self, minutes: i64) -> Event {
        self.set_custom_time(minutes, 0)
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn tick_task(&self, generation: u64) -> RepeatingTask {
        let inner = Arc::downgrade(&self.inner);
        let on_complete = self.on_complete.clone();
        Box::new(move || {
            let Some(inner) = inner.upgrade() else {
                return;
            };
            // Lock released before the callback so it may query the engine.
            let completed = lock_inner(&inner).tick(generation);
            if let Some(mode) = completed {
                info!(%mode, "countdown completed");
                if let Some(callback) = &on_complete {
                    callback(mode);
                }
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, Inner<S::Handle>> {
        lock_inner(&self.inner)
    }
}

impl<S: Scheduler> Drop for TimerEngine<S> {
    fn drop(&mut self) {
        self.lock().cancel_task();
    }
}

impl<S: Scheduler> std::fmt::Debug for TimerEngine<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("TimerEngine")
            .field("state", &inner.snapshot())
            .field("custom_seconds", &inner.custom_seconds)
            .field("has_callback", &self.on_complete.is_some())
            .finish()
    }
}

fn lock_inner<H>(inner: &Mutex<Inner<H>>) -> MutexGuard<'_, Inner<H>> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}
