//! Line-oriented terminal front end.
//!
//! [`TerminalView`] renders session output as lines on a writer, and
//! [`parse_line`] turns typed lines into UI intents. Input is read on a
//! plain thread because blocking stdin reads never finish on their own.

use std::io::{BufRead, Write};
use std::sync::{Arc, Mutex};

use crossterm::style::Stylize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use watchparty_client::{PlayerState, SessionView, UiIntent};
use watchparty_core::{format_time, parse_timestamp, WatchError, WatchResult};

pub const HELP: &str = "\
commands:
  /load <youtube url>   load a video for everyone (host only)
  /play                 toggle play/pause
  /seek <secs|mm:ss>    jump to a position
  /name <name>          change your chat name
  /status               show connection and playback state
  /quit                 leave the party
anything else is sent as a chat message";

/// What the view last rendered; read back by `/status`.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub status: String,
    pub state: Option<PlayerState>,
    pub position: f64,
    pub duration: f64,
}

impl Snapshot {
    pub fn describe(&self) -> String {
        let state = self
            .state
            .map(|s| s.to_string())
            .unwrap_or_else(|| "no video".into());
        format!(
            "{} | {} {} / {}",
            self.status,
            state,
            format_time(self.position),
            format_time(self.duration)
        )
    }
}

pub struct TerminalView<W> {
    out: W,
    color: bool,
    snapshot: Arc<Mutex<Snapshot>>,
}

impl TerminalView<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout(), true)
    }
}

impl<W: Write> TerminalView<W> {
    pub fn new(out: W, color: bool) -> Self {
        Self {
            out,
            color,
            snapshot: Arc::new(Mutex::new(Snapshot::default())),
        }
    }

    /// Shared handle to the render state.
    pub fn snapshot(&self) -> Arc<Mutex<Snapshot>> {
        Arc::clone(&self.snapshot)
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    fn update(&self, f: impl FnOnce(&mut Snapshot)) {
        if let Ok(mut snap) = self.snapshot.lock() {
            f(&mut snap);
        }
    }

    fn line(&mut self, text: String) {
        if let Err(e) = writeln!(self.out, "{text}").and_then(|()| self.out.flush()) {
            debug!(error = %e, "terminal write failed");
        }
    }
}

impl<W: Write> SessionView for TerminalView<W> {
    fn set_play_icon(&mut self, state: PlayerState) {
        self.update(|s| s.state = Some(state));
        let icon = match state {
            PlayerState::Playing => "▶",
            PlayerState::Paused => "⏸",
            PlayerState::Ended => "⏹",
            // Transient states are not worth a line.
            PlayerState::Buffering | PlayerState::Unstarted => return,
        };
        self.line(format!("{icon} {state}"));
    }

    fn set_slider(&mut self, position: f64, duration: f64) {
        self.update(|s| {
            s.position = position;
            s.duration = duration;
        });
    }

    fn append_chat_line(&mut self, sender: &str, message: &str, is_local: bool) {
        let text = if !self.color {
            format!("{sender}: {message}")
        } else if is_local {
            format!("{}: {message}", sender.dim())
        } else {
            format!("{}: {message}", sender.cyan().bold())
        };
        self.line(text);
    }

    fn set_status_text(&mut self, text: &str) {
        self.update(|s| s.status = text.to_string());
        let text = if self.color {
            format!("* {}", text.yellow())
        } else {
            format!("* {text}")
        };
        self.line(text);
    }

    fn alert(&mut self, text: &str) {
        let text = if self.color {
            format!("! {}", text.red())
        } else {
            format!("! {text}")
        };
        self.line(text);
    }
}

/// Result of parsing one typed line.
#[derive(Debug, Clone, PartialEq)]
pub enum LineAction {
    Intents(Vec<UiIntent>),
    Rename(String),
    ShowStatus,
    ShowHelp,
    Nothing,
}

/// Parse a typed line. `sender` is the current chat name.
pub fn parse_line(line: &str, sender: &str) -> WatchResult<LineAction> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(LineAction::Nothing);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(LineAction::Intents(vec![UiIntent::SubmitChat {
            sender: sender.to_string(),
            message: line.to_string(),
        }]));
    };

    let (cmd, arg) = match rest.split_once(char::is_whitespace) {
        Some((cmd, arg)) => (cmd, arg.trim()),
        None => (rest, ""),
    };

    let action = match cmd {
        "load" if arg.is_empty() => {
            return Err(WatchError::InvalidInput("usage: /load <url>".into()))
        }
        "load" => LineAction::Intents(vec![UiIntent::SubmitLoad(arg.to_string())]),
        "play" | "pause" => LineAction::Intents(vec![UiIntent::TogglePlayPause]),
        "seek" => {
            let seconds = parse_timestamp(arg).ok_or_else(|| {
                WatchError::InvalidInput(format!("invalid timestamp '{arg}', use secs or mm:ss"))
            })?;
            LineAction::Intents(vec![
                UiIntent::SeekDragStart,
                UiIntent::SeekDragCommit(seconds),
            ])
        }
        "name" if arg.is_empty() => {
            return Err(WatchError::InvalidInput("usage: /name <name>".into()))
        }
        "name" => LineAction::Rename(arg.to_string()),
        "status" => LineAction::ShowStatus,
        "help" | "?" => LineAction::ShowHelp,
        "quit" | "exit" => LineAction::Intents(vec![UiIntent::Quit]),
        other => {
            return Err(WatchError::InvalidInput(format!(
                "unknown command /{other}, try /help"
            )))
        }
    };
    Ok(action)
}

/// Read lines from `input` until EOF or `/quit`, forwarding intents. Dropping
/// the sender on return ends the session.
pub fn read_input(
    input: impl BufRead,
    mut sender: String,
    intents: mpsc::UnboundedSender<UiIntent>,
    snapshot: Arc<Mutex<Snapshot>>,
) {
    for line in input.lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(error = %e, "stdin read failed");
                break;
            }
        };

        match parse_line(&line, &sender) {
            Ok(LineAction::Intents(batch)) => {
                let quit = batch.contains(&UiIntent::Quit);
                for intent in batch {
                    if intents.send(intent).is_err() {
                        return;
                    }
                }
                if quit {
                    return;
                }
            }
            Ok(LineAction::Rename(name)) => {
                println!("* chat name is now {name}");
                sender = name;
            }
            Ok(LineAction::ShowStatus) => {
                if let Ok(snap) = snapshot.lock() {
                    println!("* {}", snap.describe());
                }
            }
            Ok(LineAction::ShowHelp) => println!("{HELP}"),
            Ok(LineAction::Nothing) => {}
            Err(e) => println!("! {e}"),
        }
    }
    debug!("input closed");
}
