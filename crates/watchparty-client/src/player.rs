//! The video player collaborator.
//!
//! The session never owns a concrete player type; anything that can load,
//! play, pause, seek and report its state can back a session. State changes
//! are reported asynchronously as [`PlayerEvent`]s on a channel.

use watchparty_core::WatchResult;

/// Player states as reported by state-change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerState {
    Unstarted,
    Ended,
    Playing,
    Paused,
    Buffering,
}

impl std::fmt::Display for PlayerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Unstarted => "unstarted",
            Self::Ended => "ended",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Buffering => "buffering",
        };
        f.write_str(s)
    }
}

/// Notifications emitted by a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    /// The player finished initializing and accepts commands.
    Ready,
    /// The player transitioned to a new state.
    StateChange(PlayerState),
}

/// Operations the session needs from a video player.
pub trait Player {
    /// Load a video and start it at `start_seconds`.
    fn load_video_by_id(&mut self, video_id: &str, start_seconds: f64) -> WatchResult<()>;

    fn play(&mut self) -> WatchResult<()>;

    fn pause(&mut self) -> WatchResult<()>;

    /// Seek to an absolute position.
    fn seek_to(&mut self, seconds: f64, allow_seek_ahead: bool) -> WatchResult<()>;

    /// Current position in seconds.
    fn current_time(&self) -> f64;

    /// Duration of the loaded video in seconds, 0 if unknown.
    fn duration(&self) -> f64;

    /// ID of the loaded video, if any.
    fn video_id(&self) -> Option<String>;

    fn state(&self) -> PlayerState;
}

/// A point-in-time snapshot of a player.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub video_id: Option<String>,
    pub is_playing: bool,
    pub position_seconds: f64,
    pub duration_seconds: f64,
}

impl PlaybackState {
    pub fn capture(player: &dyn Player) -> Self {
        Self {
            video_id: player.video_id(),
            is_playing: player.state() == PlayerState::Playing,
            position_seconds: player.current_time(),
            duration_seconds: player.duration(),
        }
    }
}
