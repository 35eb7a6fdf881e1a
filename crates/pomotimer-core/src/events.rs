use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timer::{TimerMode, TimerStatus};

/// Every state change in the engine produces an Event.
/// Front-ends print or forward them; the engine keeps no history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    TimerStarted {
        mode: TimerMode,
        remaining_seconds: u64,
        at: DateTime<Utc>,
    },
    TimerPaused {
        mode: TimerMode,
        remaining_seconds: u64,
        at: DateTime<Utc>,
    },
    TimerResumed {
        mode: TimerMode,
        remaining_seconds: u64,
        at: DateTime<Utc>,
    },
    /// Countdown reached zero on its own.
    TimerCompleted {
        mode: TimerMode,
        at: DateTime<Utc>,
    },
    TimerReset {
        mode: TimerMode,
        remaining_seconds: u64,
        at: DateTime<Utc>,
    },
    /// Mode switched (including assignment of a custom duration).
    ModeChanged {
        mode: TimerMode,
        remaining_seconds: u64,
        at: DateTime<Utc>,
    },
    StateSnapshot {
        mode: TimerMode,
        status: TimerStatus,
        remaining_seconds: u64,
        display: String,
        at: DateTime<Utc>,
    },
}

impl Event {
    pub fn completed(mode: TimerMode) -> Self {
        Event::TimerCompleted {
            mode,
            at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_tagged_snake_case() {
        let event = Event::completed(TimerMode::Break);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "timer_completed");
        assert_eq!(json["mode"], "break");
        assert!(json.get("at").is_some());
    }
}
