//! UI collaborator: intents coming in, render calls going out.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::player::PlayerState;

pub const STATUS_PLAYER_READY: &str = "Player ready. Connecting to relay...";
pub const STATUS_CONNECTED: &str = "Connected to the watch party relay!";
pub const STATUS_CONNECTION_ERROR: &str = "Connection error. Check that the relay is running.";
pub const STATUS_NOT_CONNECTED: &str = "Error: not connected to the relay.";

pub const ALERT_INVALID_URL: &str = "Invalid YouTube URL!";
pub const ALERT_EMPTY_CHAT: &str = "Enter your name and a message.";
pub const ALERT_GUEST_LOAD: &str = "Only the host can load videos.";
pub const ALERT_NOT_READY: &str = "The player is not ready yet.";

/// Status shown after the relay connection drops.
pub fn disconnected_status(retry_in: Duration) -> String {
    format!(
        "Disconnected. Reconnecting in {} seconds...",
        retry_in.as_secs_f64().round() as u64
    )
}

/// Participant role. Guests have the load control hidden.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Host,
    Guest,
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "host" => Ok(Self::Host),
            "guest" => Ok(Self::Guest),
            other => Err(format!("unknown role: {other} (expected host or guest)")),
        }
    }
}

/// Discrete user gestures.
#[derive(Debug, Clone, PartialEq)]
pub enum UiIntent {
    SubmitLoad(String),
    TogglePlayPause,
    SeekDragStart,
    SeekDragCommit(f64),
    SubmitChat { sender: String, message: String },
    Quit,
}

/// Render surface driven by the session.
pub trait SessionView {
    fn set_play_icon(&mut self, state: PlayerState);

    fn set_slider(&mut self, position: f64, duration: f64);

    fn append_chat_line(&mut self, sender: &str, message: &str, is_local: bool);

    fn set_status_text(&mut self, text: &str);

    /// Synchronous feedback for invalid input.
    fn alert(&mut self, text: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing() {
        assert_eq!("host".parse::<Role>().unwrap(), Role::Host);
        assert_eq!("Guest".parse::<Role>().unwrap(), Role::Guest);
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn disconnected_status_rounds_seconds() {
        assert_eq!(
            disconnected_status(Duration::from_millis(5000)),
            "Disconnected. Reconnecting in 5 seconds..."
        );
    }
}
