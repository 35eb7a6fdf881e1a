//! Interactive countdown.
//!
//! Polls the engine at `ui.poll_interval_ms` and redraws a single status line,
//! reads commands from stdin, and reacts to the completion callback with a
//! message and an optional terminal bell.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use pomotimer_core::{Config, Event, TimerEngine, TimerMode, TimerState, TimerStatus, TokioScheduler};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::input::{self, Command, CustomDuration};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Mode to open in (defaults to `timer.default_mode`)
    #[arg(long, value_parser = parse_mode, conflicts_with_all = ["custom", "minutes"])]
    mode: Option<TimerMode>,
    /// Custom duration as MM:SS
    #[arg(long, value_parser = input::parse_duration, conflicts_with = "minutes")]
    custom: Option<CustomDuration>,
    /// Custom duration in whole minutes
    #[arg(long, value_parser = clap::value_parser!(u16).range(1..=999))]
    minutes: Option<u16>,
    /// Start counting immediately
    #[arg(long)]
    auto_start: bool,
    /// Print events as JSON lines instead of status text
    #[arg(long)]
    json: bool,
}

fn parse_mode(raw: &str) -> Result<TimerMode, pomotimer_core::ValidationError> {
    raw.parse()
}

pub fn run(args: RunArgs, debug: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load().unwrap_or_else(|e| {
        warn!(error = %e, "using default configuration");
        Config::default()
    });
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(session(args, config, debug));
    // A pending stdin read must not hold up exit.
    runtime.shutdown_timeout(Duration::from_millis(100));
    result
}

/// Apply the start-up mode: explicit flags win over configuration.
fn initial_setup(engine: &TimerEngine, args: &RunArgs, config: &Config) {
    if let Some(custom) = args.custom {
        engine.set_custom_time(custom.minutes, custom.seconds);
    } else if let Some(minutes) = args.minutes {
        engine.set_custom_minutes(i64::from(minutes));
    } else {
        engine.set_mode(args.mode.unwrap_or(config.timer.default_mode));
    }
}

async fn session(
    args: RunArgs,
    config: Config,
    debug: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<TimerMode>();
    let engine = Arc::new(TimerEngine::with_callback(
        TokioScheduler::current()?,
        move |mode| {
            // Receiver only disappears during shutdown.
            let _ = done_tx.send(mode);
        },
    ));
    engine.set_debug(debug || config.timer.debug);
    initial_setup(&engine, &args, &config);

    let mut out = Output::new(args.json);
    if !args.json {
        println!("{}", input::HELP);
    }
    if args.auto_start || config.timer.auto_start {
        if let Some(event) = engine.start() {
            out.event(&event)?;
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut poll = tokio::time::interval(Duration::from_millis(config.ui.poll_interval_ms.max(1)));
    poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = poll.tick() => out.render(&engine.state())?,
            Some(mode) = done_rx.recv() => {
                out.render(&engine.state())?;
                out.completed(mode, config.ui.bell_on_complete)?;
                if !stdin_open {
                    break;
                }
            }
            line = lines.next_line(), if stdin_open => {
                let Some(line) = line? else {
                    stdin_open = false;
                    // Without input only a running countdown can still change.
                    if engine.state().is_running() {
                        debug!("stdin closed, waiting for completion");
                        continue;
                    }
                    debug!("stdin closed");
                    break;
                };
                match input::parse_command(&line) {
                    Ok(Some(Command::Quit)) => break,
                    Ok(Some(command)) => apply(&engine, command, &mut out)?,
                    Ok(None) => {}
                    Err(e) => out.message(&format!("error: {e}"))?,
                }
            }
            _ = &mut ctrl_c => {
                debug!("interrupted");
                break;
            }
        }
    }

    if engine.state().is_running() {
        engine.pause();
    }
    out.finish()?;
    Ok(())
}

fn apply(
    engine: &TimerEngine,
    command: Command,
    out: &mut Output,
) -> Result<(), Box<dyn std::error::Error>> {
    let event = match command {
        Command::Start => engine.start(),
        Command::Pause => engine.pause(),
        Command::Reset => Some(engine.reset()),
        Command::Mode(mode) => Some(engine.set_mode(mode)),
        Command::Custom(d) => Some(engine.set_custom_time(d.minutes, d.seconds)),
        Command::Status => Some(engine.snapshot()),
        Command::Help => {
            out.message(input::HELP)?;
            return Ok(());
        }
        Command::Quit => return Ok(()),
    };
    match event {
        Some(event) => out.event(&event)?,
        None => warn!(?command, "command had no effect"),
    }
    Ok(out.render(&engine.state())?)
}

/// One status line such as `Work   24:59  running`.
pub fn status_line(state: &TimerState) -> String {
    let status = match state.status {
        TimerStatus::Idle => "idle",
        TimerStatus::Running => "running",
        TimerStatus::Paused => "paused",
    };
    format!("{:<6} {}  {}", state.mode.label(), state.display(), status)
}

/// Terminal writer that only redraws when the status line changes.
struct Output {
    json: bool,
    last: Option<TimerState>,
}

impl Output {
    fn new(json: bool) -> Self {
        Self { json, last: None }
    }

    fn render(&mut self, state: &TimerState) -> std::io::Result<()> {
        if self.last.as_ref() == Some(state) {
            return Ok(());
        }
        self.last = Some(*state);
        if self.json {
            return Ok(());
        }
        let mut stdout = std::io::stdout().lock();
        write!(stdout, "\r\x1b[2K{}", status_line(state))?;
        stdout.flush()
    }

    fn event(&mut self, event: &Event) -> Result<(), Box<dyn std::error::Error>> {
        if self.json {
            println!("{}", serde_json::to_string(event)?);
        } else if let Event::StateSnapshot { .. } = event {
            self.message(&serde_json::to_string_pretty(event)?)?;
        }
        Ok(())
    }

    fn completed(&mut self, mode: TimerMode, bell: bool) -> Result<(), Box<dyn std::error::Error>> {
        if self.json {
            return self.event(&Event::completed(mode));
        }
        let bell = if bell { "\x07" } else { "" };
        self.message(&format!("{}{bell}", mode.completion_message()))?;
        Ok(())
    }

    /// Print a full line below the status line, then redraw it.
    fn message(&mut self, text: &str) -> std::io::Result<()> {
        let mut stdout = std::io::stdout().lock();
        if self.json {
            writeln!(stdout, "{text}")?;
            return stdout.flush();
        }
        writeln!(stdout, "\r\x1b[2K{text}")?;
        if let Some(state) = self.last {
            write!(stdout, "{}", status_line(&state))?;
        }
        stdout.flush()
    }

    fn finish(&mut self) -> std::io::Result<()> {
        if !self.json {
            println!();
        }
        Ok(())
    }
}
