//! Parsing and range checks for user input.
//!
//! The engine accepts any custom duration and clamps it to one second. The
//! terminal front-end is stricter: minutes must be 0..=999, seconds 0..=59,
//! and at least one of them non-zero.

use pomotimer_core::{TimerMode, ValidationError};

pub const MAX_MINUTES: i64 = 999;
pub const MAX_SECONDS: i64 = 59;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomDuration {
    pub minutes: i64,
    pub seconds: i64,
}

/// One line typed at the interactive prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Pause,
    Reset,
    Mode(TimerMode),
    Custom(CustomDuration),
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands: s|start  p|pause  r|reset  w|work  b|break
          c|custom MM:SS  m|minutes N  status  h|help  q|quit";

fn parse_field(field: &str, raw: &str, max: i64) -> Result<i64, ValidationError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(0);
    }
    let value: i64 = raw.parse().map_err(|_| ValidationError::InvalidValue {
        field: field.to_string(),
        message: format!("'{raw}' is not a whole number"),
    })?;
    if !(0..=max).contains(&value) {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            value,
            min: 0,
            max,
        });
    }
    Ok(value)
}

/// Parse `MM:SS` or a bare minute count.
pub fn parse_duration(raw: &str) -> Result<CustomDuration, ValidationError> {
    let (minutes, seconds) = match raw.split_once(':') {
        Some((m, s)) => (m, s),
        None => (raw, ""),
    };
    let duration = CustomDuration {
        minutes: parse_field("minutes", minutes, MAX_MINUTES)?,
        seconds: parse_field("seconds", seconds, MAX_SECONDS)?,
    };
    if duration.minutes == 0 && duration.seconds == 0 {
        return Err(ValidationError::InvalidValue {
            field: "duration".into(),
            message: "enter a time longer than zero".into(),
        });
    }
    Ok(duration)
}

/// Parse a prompt line. Blank lines yield `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, ValidationError> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();

    let command = match (verb.to_ascii_lowercase().as_str(), arg) {
        ("s" | "start", None) => Command::Start,
        ("p" | "pause", None) => Command::Pause,
        ("r" | "reset", None) => Command::Reset,
        ("w" | "work", None) => Command::Mode(TimerMode::Work),
        ("b" | "break", None) => Command::Mode(TimerMode::Break),
        ("c" | "custom", Some(arg)) => Command::Custom(parse_duration(arg)?),
        ("m" | "minutes", Some(arg)) if !arg.contains(':') => {
            Command::Custom(parse_duration(arg)?)
        }
        ("status", None) => Command::Status,
        ("h" | "help" | "?", None) => Command::Help,
        ("q" | "quit" | "exit", None) => Command::Quit,
        (other, _) => {
            return Err(ValidationError::InvalidValue {
                field: "command".into(),
                message: format!("unrecognised input '{other}'"),
            })
        }
    };
    Ok(Some(command))
}
