//! Repeating-task primitives consumed by the timer engine.
//!
//! The engine never sleeps or spawns on its own. It asks a [`Scheduler`] to
//! run a closure once per period and keeps the returned handle so it can
//! cancel the work later.
//!
//! Two implementations ship with the crate:
//!
//! - [`TokioScheduler`] spawns an interval task on a tokio runtime.
//! - [`ManualScheduler`] keeps a simulated clock that only moves when
//!   [`ManualScheduler::advance`] is called. Hosts that drive time themselves
//!   (and tests) use this one.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::error::CoreError;

/// Work executed on every period of a repeating schedule.
pub type RepeatingTask = Box<dyn FnMut() + Send + 'static>;

/// Zero periods would spin forever; they are raised to this.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Handle to a registered repeating task.
pub trait TaskHandle: Send + 'static {
    /// Stop the task. No further invocations start after this returns.
    fn cancel(&self);
}

/// Host facility that fires a closure once per `period` until cancelled.
pub trait Scheduler: Send + Sync + 'static {
    type Handle: TaskHandle;

    /// Register `task` to run every `period`, first firing one full period
    /// from now.
    fn schedule_repeating(&self, period: Duration, task: RepeatingTask) -> Self::Handle;
}

// ── Tokio ────────────────────────────────────────────────────────────

/// Scheduler backed by a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    runtime: Handle,
}

impl TokioScheduler {
    /// Use the runtime the caller is currently running on.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoRuntime`] when called outside a tokio runtime.
    pub fn current() -> Result<Self, CoreError> {
        let runtime = Handle::try_current().map_err(|_| CoreError::NoRuntime)?;
        Ok(Self { runtime })
    }
}

impl Scheduler for TokioScheduler {
    type Handle = TokioHandle;

    fn schedule_repeating(&self, period: Duration, mut task: RepeatingTask) -> TokioHandle {
        let period = period.max(MIN_PERIOD);
        let first = tokio::time::Instant::now() + period;
        let join = self.runtime.spawn(async move {
            let mut interval = tokio::time::interval_at(first, period);
            loop {
                interval.tick().await;
                task();
            }
        });
        TokioHandle { join }
    }
}

#[derive(Debug)]
pub struct TokioHandle {
    join: JoinHandle<()>,
}

impl TaskHandle for TokioHandle {
    fn cancel(&self) {
        self.join.abort();
    }
}

// ── Manual ───────────────────────────────────────────────────────────

struct ManualEntry {
    period: Duration,
    next_due: Duration,
    /// `None` only while the task is executing inside `advance`.
    task: Option<RepeatingTask>,
}

#[derive(Default)]
struct ManualClock {
    now: Duration,
    next_id: u64,
    tasks: BTreeMap<u64, ManualEntry>,
}

/// Scheduler driven by a simulated clock.
///
/// Time stands still until [`advance`](Self::advance) is called, which fires
/// every task that falls due in deadline order. Clones share the same clock.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    clock: Arc<Mutex<ManualClock>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulated time elapsed since the scheduler was created.
    pub fn now(&self) -> Duration {
        self.lock().now
    }

    /// Number of registered, uncancelled tasks.
    pub fn active_tasks(&self) -> usize {
        self.lock().tasks.len()
    }

    pub fn advance_secs(&self, secs: u64) {
        self.advance(Duration::from_secs(secs));
    }

    /// Move the clock forward by `by`, running every task that falls due.
    ///
    /// Tasks run without the clock lock held, so a task may cancel itself or
    /// register new work. A task registered during `advance` fires within the
    /// same call if its first deadline is inside the window.
    pub fn advance(&self, by: Duration) {
        let target = self.lock().now + by;
        loop {
            let (id, mut task) = {
                let mut clock = self.lock();
                let due = clock
                    .tasks
                    .iter()
                    .filter(|(_, entry)| entry.task.is_some() && entry.next_due <= target)
                    .min_by_key(|(id, entry)| (entry.next_due, **id))
                    .map(|(id, _)| *id);
                let Some(id) = due else { break };
                let Some(entry) = clock.tasks.get_mut(&id) else { break };
                let fire_at = entry.next_due;
                entry.next_due += entry.period;
                let Some(task) = entry.task.take() else { break };
                clock.now = fire_at;
                (id, task)
            };
            trace!(task_id = id, "manual scheduler firing task");
            task();
            if let Some(entry) = self.lock().tasks.get_mut(&id) {
                entry.task = Some(task);
            }
        }
        self.lock().now = target;
    }

    fn lock(&self) -> MutexGuard<'_, ManualClock> {
        self.clock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let clock = self.lock();
        f.debug_struct("ManualScheduler")
            .field("now", &clock.now)
            .field("active_tasks", &clock.tasks.len())
            .finish()
    }
}

impl Scheduler for ManualScheduler {
    type Handle = ManualHandle;

    fn schedule_repeating(&self, period: Duration, task: RepeatingTask) -> ManualHandle {
        let period = period.max(MIN_PERIOD);
        let mut clock = self.lock();
        let id = clock.next_id;
        clock.next_id += 1;
        let next_due = clock.now + period;
        clock.tasks.insert(
            id,
            ManualEntry {
                period,
                next_due,
                task: Some(task),
            },
        );
        ManualHandle {
            id,
            clock: Arc::downgrade(&self.clock),
        }
    }
}

#[derive(Debug)]
pub struct ManualHandle {
    id: u64,
    clock: Weak<Mutex<ManualClock>>,
}

impl TaskHandle for ManualHandle {
    fn cancel(&self) {
        if let Some(clock) = self.clock.upgrade() {
            let removed = clock
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .tasks
                .remove(&self.id);
            // Dropped outside the lock; the closure may own arbitrary state.
            drop(removed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter_task(count: &Arc<AtomicUsize>) -> RepeatingTask {
        let count = Arc::clone(count);
        Box::new(move || {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn manual_fires_once_per_period() {
        let scheduler = ManualScheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        let _handle = scheduler.schedule_repeating(Duration::from_secs(1), counter_task(&count));

        scheduler.advance(Duration::from_millis(999));
        assert_eq!(count.load(Ordering::SeqCst), 0);

        scheduler.advance(Duration::from_millis(1));
        assert_eq!(count.load(Ordering::SeqCst), 1);

        scheduler.advance_secs(5);
        assert_eq!(count.load(Ordering::SeqCst), 6);
        assert_eq!(scheduler.now(), Duration::from_secs(6));
    }

    #[test]
    fn manual_cancel_stops_task() {
        let scheduler = ManualScheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        let handle = scheduler.schedule_repeating(Duration::from_secs(1), counter_task(&count));

        scheduler.advance_secs(2);
        handle.cancel();
        assert_eq!(scheduler.active_tasks(), 0);

        scheduler.advance_secs(10);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn manual_task_can_cancel_itself() {
        let scheduler = ManualScheduler::new();
        let count = Arc::new(AtomicUsize::new(0));
        let slot: Arc<Mutex<Option<ManualHandle>>> = Arc::new(Mutex::new(None));

        let task_count = Arc::clone(&count);
        let task_slot = Arc::clone(&slot);
        let handle = scheduler.schedule_repeating(
            Duration::from_secs(1),
            Box::new(move || {
                if task_count.fetch_add(1, Ordering::SeqCst) + 1 == 3 {
                    if let Some(handle) = task_slot.lock().unwrap().take() {
                        handle.cancel();
                    }
                }
            }),
        );
        *slot.lock().unwrap() = Some(handle);

        scheduler.advance_secs(10);
        assert_eq!(count.load(Ordering::SeqCst), 3);
        assert_eq!(scheduler.active_tasks(), 0);
    }

    #[test]
    fn manual_fires_in_deadline_order() {
        let scheduler = ManualScheduler::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        let slow = Arc::clone(&order);
        let _a = scheduler.schedule_repeating(
            Duration::from_secs(2),
            Box::new(move || slow.lock().unwrap().push("slow")),
        );
        let fast = Arc::clone(&order);
        let _b = scheduler.schedule_repeating(
            Duration::from_secs(1),
            Box::new(move || fast.lock().unwrap().push("fast")),
        );

        scheduler.advance_secs(2);
        // At t=2 both are due; the earlier registration wins the tie.
        assert_eq!(*order.lock().unwrap(), vec!["fast", "slow", "fast"]);
    }

    #[test]
    fn tokio_scheduler_requires_runtime() {
        assert!(matches!(TokioScheduler::current(), Err(CoreError::NoRuntime)));
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_scheduler_ticks_each_period() {
        let scheduler = TokioScheduler::current().unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let handle = scheduler.schedule_repeating(Duration::from_secs(1), counter_task(&count));

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        handle.cancel();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
