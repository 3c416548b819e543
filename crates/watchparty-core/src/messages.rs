//! Command envelopes exchanged between watchparty peers and the relay.
//!
//! The wire shape is a flat JSON object keyed by `type`:
//!
//! ```json
//! {"type": "PLAY", "videoId": "dQw4w9WgXcQ", "currentTime": 42.5}
//! {"type": "CHAT", "sender": "alice", "message": "hi"}
//! ```
//!
//! [`Envelope`] mirrors that shape field for field and parses permissively.
//! [`Command`] is the typed form the client works with.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{WatchError, WatchResult};

/// The `type` tag of an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandType {
    Load,
    Play,
    Pause,
    Seek,
    Chat,
}

impl CommandType {
    /// The tag as it appears on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Load => "LOAD",
            Self::Play => "PLAY",
            Self::Pause => "PAUSE",
            Self::Seek => "SEEK",
            Self::Chat => "CHAT",
        }
    }

    /// Whether this tag carries playback control (everything except chat).
    pub fn is_video(self) -> bool {
        !matches!(self, Self::Chat)
    }
}

impl TryFrom<&str> for CommandType {
    type Error = WatchError;

    fn try_from(v: &str) -> Result<Self, WatchError> {
        match v {
            "LOAD" => Ok(Self::Load),
            "PLAY" => Ok(Self::Play),
            "PAUSE" => Ok(Self::Pause),
            "SEEK" => Ok(Self::Seek),
            "CHAT" => Ok(Self::Chat),
            other => Err(WatchError::UnknownCommand(other.to_string())),
        }
    }
}

impl std::fmt::Display for CommandType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw wire object. Every field except `type` is optional, unknown fields
/// are ignored, and a field holding the wrong JSON type reads as absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub current_time: Option<f64>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Accept any JSON value, keeping it only if it has the expected type.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

impl Envelope {
    /// Resolve the `type` tag.
    pub fn command_type(&self) -> WatchResult<CommandType> {
        CommandType::try_from(self.kind.as_str())
    }
}

/// Playback control carried by LOAD/PLAY/PAUSE/SEEK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VideoAction {
    Load,
    Play,
    Pause,
    Seek,
}

impl VideoAction {
    pub fn command_type(self) -> CommandType {
        match self {
            Self::Load => CommandType::Load,
            Self::Play => CommandType::Play,
            Self::Pause => CommandType::Pause,
            Self::Seek => CommandType::Seek,
        }
    }
}

/// A playback control command.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoCommand {
    pub action: VideoAction,
    /// Empty when the command applies to whatever video is already loaded.
    pub video_id: String,
    /// Absolute position in seconds, never negative.
    pub current_time: f64,
}

/// A chat line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub sender: String,
    pub message: String,
}

/// A typed watchparty command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Video(VideoCommand),
    Chat(ChatMessage),
}

impl Command {
    pub fn video(action: VideoAction, video_id: impl Into<String>, current_time: f64) -> Self {
        Self::Video(VideoCommand {
            action,
            video_id: video_id.into(),
            current_time: sanitize_time(Some(current_time)),
        })
    }

    pub fn load(video_id: impl Into<String>, current_time: f64) -> Self {
        Self::video(VideoAction::Load, video_id, current_time)
    }

    pub fn play(video_id: impl Into<String>, current_time: f64) -> Self {
        Self::video(VideoAction::Play, video_id, current_time)
    }

    pub fn pause(video_id: impl Into<String>, current_time: f64) -> Self {
        Self::video(VideoAction::Pause, video_id, current_time)
    }

    pub fn seek(video_id: impl Into<String>, current_time: f64) -> Self {
        Self::video(VideoAction::Seek, video_id, current_time)
    }

    pub fn chat(sender: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Chat(ChatMessage {
            sender: sender.into(),
            message: message.into(),
        })
    }

    pub fn command_type(&self) -> CommandType {
        match self {
            Self::Video(v) => v.action.command_type(),
            Self::Chat(_) => CommandType::Chat,
        }
    }
}

/// Clamp a wire timestamp to a finite, non-negative number of seconds.
fn sanitize_time(t: Option<f64>) -> f64 {
    match t {
        Some(v) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}

impl TryFrom<Envelope> for Command {
    type Error = WatchError;

    fn try_from(env: Envelope) -> Result<Self, WatchError> {
        let action = match env.command_type()? {
            CommandType::Chat => {
                let sender = env.sender.unwrap_or_default();
                let message = env.message.unwrap_or_default();
                if sender.is_empty() || message.is_empty() {
                    return Err(WatchError::MalformedMessage(
                        "CHAT requires a sender and a message".into(),
                    ));
                }
                return Ok(Self::Chat(ChatMessage { sender, message }));
            }
            CommandType::Load => VideoAction::Load,
            CommandType::Play => VideoAction::Play,
            CommandType::Pause => VideoAction::Pause,
            CommandType::Seek => VideoAction::Seek,
        };

        Ok(Self::Video(VideoCommand {
            action,
            video_id: env.video_id.unwrap_or_default(),
            current_time: sanitize_time(env.current_time),
        }))
    }
}

impl From<&Command> for Envelope {
    fn from(cmd: &Command) -> Self {
        match cmd {
            Command::Video(v) => Envelope {
                kind: v.action.command_type().as_str().to_string(),
                video_id: (!v.video_id.is_empty()).then(|| v.video_id.clone()),
                current_time: Some(v.current_time),
                ..Default::default()
            },
            Command::Chat(c) => Envelope {
                kind: CommandType::Chat.as_str().to_string(),
                sender: Some(c.sender.clone()),
                message: Some(c.message.clone()),
                ..Default::default()
            },
        }
    }
}
