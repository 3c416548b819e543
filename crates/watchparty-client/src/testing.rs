//! In-memory collaborators for exercising sessions without a real player,
//! terminal, or relay.

use watchparty_core::{codec, Command, LinkState, TransportLink, WatchError, WatchResult};

use crate::player::{Player, PlayerEvent, PlayerState};
use crate::view::SessionView;

/// A mutating call observed by [`RecordingPlayer`].
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerCall {
    Load(String, f64),
    Play,
    Pause,
    Seek(f64),
}

/// A player that records every call and queues the notifications a real
/// widget would emit later.
#[derive(Debug, Default)]
pub struct RecordingPlayer {
    video_id: Option<String>,
    state: Option<PlayerState>,
    position: f64,
    duration: f64,
    calls: Vec<PlayerCall>,
    pending: Vec<PlayerEvent>,
    fail_next: Option<String>,
}

impl RecordingPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A paused player with `video_id` already loaded.
    pub fn with_video(video_id: &str) -> Self {
        Self {
            video_id: Some(video_id.to_string()),
            state: Some(PlayerState::Paused),
            duration: 600.0,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> &[PlayerCall] {
        &self.calls
    }

    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Drain notifications emitted since the last call.
    pub fn take_events(&mut self) -> Vec<PlayerEvent> {
        std::mem::take(&mut self.pending)
    }

    /// Make the next mutating call fail with `message`.
    pub fn fail_next(&mut self, message: &str) {
        self.fail_next = Some(message.to_string());
    }

    /// Move the playhead as if time passed.
    pub fn set_position(&mut self, seconds: f64) {
        self.position = seconds;
    }

    fn check_failure(&mut self) -> WatchResult<()> {
        match self.fail_next.take() {
            Some(message) => Err(WatchError::Player(message)),
            None => Ok(()),
        }
    }

    fn transition(&mut self, state: PlayerState) {
        if self.state != Some(state) {
            self.state = Some(state);
            self.pending.push(PlayerEvent::StateChange(state));
        }
    }
}

impl Player for RecordingPlayer {
    fn load_video_by_id(&mut self, video_id: &str, start_seconds: f64) -> WatchResult<()> {
        self.check_failure()?;
        self.calls
            .push(PlayerCall::Load(video_id.to_string(), start_seconds));
        self.video_id = Some(video_id.to_string());
        self.position = start_seconds;
        if self.duration == 0.0 {
            self.duration = 600.0;
        }
        self.transition(PlayerState::Buffering);
        self.transition(PlayerState::Playing);
        Ok(())
    }

    fn play(&mut self) -> WatchResult<()> {
        self.check_failure()?;
        self.calls.push(PlayerCall::Play);
        self.transition(PlayerState::Playing);
        Ok(())
    }

    fn pause(&mut self) -> WatchResult<()> {
        self.check_failure()?;
        self.calls.push(PlayerCall::Pause);
        self.transition(PlayerState::Paused);
        Ok(())
    }

    fn seek_to(&mut self, seconds: f64, _allow_seek_ahead: bool) -> WatchResult<()> {
        self.check_failure()?;
        self.calls.push(PlayerCall::Seek(seconds));
        self.position = seconds;
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.position
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn video_id(&self) -> Option<String> {
        self.video_id.clone()
    }

    fn state(&self) -> PlayerState {
        self.state.unwrap_or(PlayerState::Unstarted)
    }
}

/// A view that keeps every render call.
#[derive(Debug, Default)]
pub struct RecordingView {
    pub icons: Vec<PlayerState>,
    pub sliders: Vec<(f64, f64)>,
    pub chat: Vec<(String, String, bool)>,
    pub statuses: Vec<String>,
    pub alerts: Vec<String>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_status(&self) -> Option<&str> {
        self.statuses.last().map(String::as_str)
    }

    pub fn last_icon(&self) -> Option<PlayerState> {
        self.icons.last().copied()
    }
}

impl SessionView for RecordingView {
    fn set_play_icon(&mut self, state: PlayerState) {
        self.icons.push(state);
    }

    fn set_slider(&mut self, position: f64, duration: f64) {
        self.sliders.push((position, duration));
    }

    fn append_chat_line(&mut self, sender: &str, message: &str, is_local: bool) {
        self.chat
            .push((sender.to_string(), message.to_string(), is_local));
    }

    fn set_status_text(&mut self, text: &str) {
        self.statuses.push(text.to_string());
    }

    fn alert(&mut self, text: &str) {
        self.alerts.push(text.to_string());
    }
}

/// A relay link that stores sent frames in memory.
#[derive(Debug)]
pub struct MemoryLink {
    pub state: LinkState,
    pub sent: Vec<String>,
}

impl Default for MemoryLink {
    fn default() -> Self {
        Self::connected()
    }
}

impl MemoryLink {
    pub fn connected() -> Self {
        Self {
            state: LinkState::Connected,
            sent: Vec::new(),
        }
    }

    pub fn disconnected() -> Self {
        Self {
            state: LinkState::Disconnected,
            sent: Vec::new(),
        }
    }

    /// Decode every frame sent so far.
    pub fn sent_commands(&self) -> Vec<Command> {
        self.sent
            .iter()
            .filter_map(|frame| codec::decode(frame).ok())
            .collect()
    }
}

impl TransportLink for MemoryLink {
    fn state(&self) -> LinkState {
        self.state
    }

    fn send_text(&mut self, frame: String) -> WatchResult<()> {
        if !self.state.is_open() {
            return Err(WatchError::NotConnected);
        }
        self.sent.push(frame);
        Ok(())
    }
}
