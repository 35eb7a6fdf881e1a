use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Work session length in seconds (25 minutes).
pub const WORK_SECS: u64 = 1500;
/// Break length in seconds (5 minutes).
pub const BREAK_SECS: u64 = 300;
/// Floor applied to every custom duration.
pub const MIN_CUSTOM_SECS: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerMode {
    Work,
    Break,
    /// Duration assigned explicitly via `set_custom_time`.
    Custom,
}

impl TimerMode {
    /// Fixed duration for `Work` and `Break`.
    ///
    /// `Custom` has no fixed default and returns `None`.
    pub fn default_secs(self) -> Option<u64> {
        match self {
            TimerMode::Work => Some(WORK_SECS),
            TimerMode::Break => Some(BREAK_SECS),
            TimerMode::Custom => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TimerMode::Work => "Work",
            TimerMode::Break => "Break",
            TimerMode::Custom => "Custom",
        }
    }

    /// Message shown by front-ends when a countdown in this mode completes.
    pub fn completion_message(self) -> &'static str {
        match self {
            TimerMode::Work => "Work session finished. Nice job!",
            TimerMode::Break => "Break is over.",
            TimerMode::Custom => "Custom timer finished.",
        }
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimerMode::Work => "work",
            TimerMode::Break => "break",
            TimerMode::Custom => "custom",
        };
        f.write_str(s)
    }
}

impl FromStr for TimerMode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "work" => Ok(TimerMode::Work),
            "break" => Ok(TimerMode::Break),
            "custom" => Ok(TimerMode::Custom),
            other => Err(ValidationError::InvalidValue {
                field: "mode".into(),
                message: format!("expected work, break or custom, got '{other}'"),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimerStatus {
    Idle,
    Running,
    Paused,
}

/// Point-in-time copy of the engine's state record.
///
/// Owned and `Copy`, so holding one never affects the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimerState {
    pub mode: TimerMode,
    pub status: TimerStatus,
    pub remaining_seconds: u64,
}

impl TimerState {
    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    /// Remaining time as `MM:SS`.
    pub fn display(&self) -> String {
        format_clock(self.remaining_seconds)
    }
}

/// Format seconds as zero-padded `MM:SS`.
///
/// Minutes are not wrapped into hours, so 6000 seconds renders as `100:00`.
pub fn format_clock(secs: u64) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_durations() {
        assert_eq!(TimerMode::Work.default_secs(), Some(1500));
        assert_eq!(TimerMode::Break.default_secs(), Some(300));
        assert_eq!(TimerMode::Custom.default_secs(), None);
    }

    #[test]
    fn format_clock_pads_both_fields() {
        assert_eq!(format_clock(1500), "25:00");
        assert_eq!(format_clock(330), "05:30");
        assert_eq!(format_clock(7), "00:07");
        assert_eq!(format_clock(0), "00:00");
        assert_eq!(format_clock(6000), "100:00");
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Work".parse::<TimerMode>().unwrap(), TimerMode::Work);
        assert_eq!(" break ".parse::<TimerMode>().unwrap(), TimerMode::Break);
        assert_eq!("CUSTOM".parse::<TimerMode>().unwrap(), TimerMode::Custom);
        assert!("lunch".parse::<TimerMode>().is_err());
    }

    #[test]
    fn state_serializes_lowercase() {
        let state = TimerState {
            mode: TimerMode::Break,
            status: TimerStatus::Paused,
            remaining_seconds: 42,
        };
        let json = serde_json::to_value(state).unwrap();
        assert_eq!(json["mode"], "break");
        assert_eq!(json["status"], "paused");
        assert_eq!(json["remaining_seconds"], 42);
    }

    #[test]
    fn only_running_status_is_running() {
        let mut state = TimerState {
            mode: TimerMode::Work,
            status: TimerStatus::Running,
            remaining_seconds: 1499,
        };
        assert!(state.is_running());
        state.status = TimerStatus::Paused;
        assert!(!state.is_running());
        state.status = TimerStatus::Idle;
        assert!(!state.is_running());
    }
}
