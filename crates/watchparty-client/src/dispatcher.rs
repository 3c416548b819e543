//! Command dispatcher.
//!
//! Owns the relay link and the [`SessionState`], and is the only place that
//! decides whether something goes out on the wire:
//!
//! - Outbound: PLAYING/PAUSED notifications become PLAY/PAUSE unless the
//!   echo-suppression guard or the seek-drag guard is armed. LOAD, SEEK and
//!   CHAT come straight from UI intents.
//! - Inbound: CHAT goes to the chat log. Playback commands arm the guard and
//!   are handed to the reconciliation engine.

use tokio::time::Instant;
use tracing::{debug, trace, warn};

use watchparty_core::{
    codec, extract_video_id, Command, TransportLink, VideoAction, WatchError, WatchResult,
};

use crate::guard::SuppressionGuard;
use crate::player::{Player, PlayerState};
use crate::reconcile;
use crate::transport::TransportEvent;
use crate::view::{
    disconnected_status, Role, SessionView, ALERT_EMPTY_CHAT, ALERT_GUEST_LOAD, ALERT_INVALID_URL,
    STATUS_CONNECTED, STATUS_CONNECTION_ERROR, STATUS_NOT_CONNECTED, STATUS_PLAYER_READY,
};

/// Per-session flags shared by the dispatcher, reconciliation, and UI binding.
#[derive(Debug, Clone)]
pub struct SessionState {
    /// Armed while remote-originated mutations settle.
    pub suppression: SuppressionGuard,
    /// True between seek drag-start and drag-commit.
    pub seeking: bool,
    /// Set once the player reported Ready.
    pub player_ready: bool,
    pub role: Role,
}

impl SessionState {
    pub fn new(role: Role, suppression: SuppressionGuard) -> Self {
        Self {
            suppression,
            seeking: false,
            player_ready: false,
            role,
        }
    }

    /// Whether player notifications at `now` must not originate commands.
    pub fn outbound_blocked(&self, now: Instant) -> bool {
        self.seeking || self.suppression.is_armed(now)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new(Role::Host, SuppressionGuard::default())
    }
}

pub struct Dispatcher<L> {
    link: L,
    state: SessionState,
}

impl<L: TransportLink> Dispatcher<L> {
    pub fn new(link: L, state: SessionState) -> Self {
        Self { link, state }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }

    /// Encode and transmit `cmd`. A closed link shows a status message and
    /// drops the command.
    pub fn send(&mut self, cmd: &Command, view: &mut dyn SessionView) -> bool {
        let frame = match codec::encode(cmd) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "failed to encode command");
                return false;
            }
        };

        match self.link.send_text(frame) {
            Ok(()) => {
                debug!(kind = %cmd.command_type(), "sent command");
                true
            }
            Err(WatchError::NotConnected) => {
                debug!(kind = %cmd.command_type(), "dropping command, relay not connected");
                view.set_status_text(STATUS_NOT_CONNECTED);
                false
            }
            Err(e) => {
                warn!(kind = %cmd.command_type(), error = %e, "send failed");
                view.set_status_text(STATUS_NOT_CONNECTED);
                false
            }
        }
    }

    pub fn on_player_ready(&mut self, view: &mut dyn SessionView) {
        self.state.player_ready = true;
        view.set_status_text(STATUS_PLAYER_READY);
    }

    /// Outbound path for player notifications. Returns the command sent, if any.
    pub fn on_player_state_change(
        &mut self,
        new_state: PlayerState,
        player: &dyn Player,
        view: &mut dyn SessionView,
        now: Instant,
    ) -> Option<Command> {
        view.set_play_icon(new_state);

        if self.state.outbound_blocked(now) {
            trace!(state = %new_state, seeking = self.state.seeking, "notification suppressed");
            return None;
        }

        let action = match new_state {
            PlayerState::Playing => VideoAction::Play,
            PlayerState::Paused => VideoAction::Pause,
            _ => return None,
        };

        let cmd = Command::video(
            action,
            player.video_id().unwrap_or_default(),
            player.current_time(),
        );
        self.send(&cmd, view).then_some(cmd)
    }

    /// Inbound path for commands from the relay.
    pub fn on_remote_command(
        &mut self,
        cmd: Command,
        player: &mut dyn Player,
        view: &mut dyn SessionView,
        now: Instant,
    ) {
        match cmd {
            Command::Chat(chat) => {
                view.append_chat_line(&chat.sender, &chat.message, false);
            }
            Command::Video(video) => {
                if !self.state.player_ready {
                    debug!(action = ?video.action, "player not ready, ignoring command");
                    return;
                }

                let result = self
                    .state
                    .suppression
                    .with_suppression(now, || reconcile::reconcile(&video, &mut *player));

                match result {
                    Ok(actions) => {
                        debug!(
                            action = ?video.action,
                            video_id = %video.video_id,
                            current_time = video.current_time,
                            ?actions,
                            "applied remote command"
                        );
                    }
                    Err(e) => {
                        warn!(action = ?video.action, error = %e, "player rejected remote command");
                    }
                }
            }
        }
    }

    /// Route a transport event to status updates or the inbound path.
    pub fn on_transport_event(
        &mut self,
        event: TransportEvent,
        player: &mut dyn Player,
        view: &mut dyn SessionView,
        now: Instant,
    ) {
        match event {
            TransportEvent::Connecting { attempt } => {
                trace!(attempt, "connect attempt started");
            }
            TransportEvent::Opened => view.set_status_text(STATUS_CONNECTED),
            TransportEvent::Error(e) => {
                debug!(error = %e, "transport error");
                view.set_status_text(STATUS_CONNECTION_ERROR);
            }
            TransportEvent::Closed { retry_in } => {
                view.set_status_text(&disconnected_status(retry_in));
            }
            TransportEvent::Command(cmd) => self.on_remote_command(cmd, player, view, now),
        }
    }

    /// URL submit. Only hosts may load; the relay echoes the LOAD back, which
    /// is what actually loads the video locally.
    pub fn submit_load(&mut self, url: &str, view: &mut dyn SessionView) -> Option<Command> {
        if self.state.role == Role::Guest {
            view.alert(ALERT_GUEST_LOAD);
            return None;
        }
        let Some(video_id) = extract_video_id(url) else {
            view.alert(ALERT_INVALID_URL);
            return None;
        };

        let cmd = Command::load(video_id, 0.0);
        self.send(&cmd, view).then_some(cmd)
    }

    /// Toggle playback. Nothing is sent here; the resulting PLAYING/PAUSED
    /// notification takes the outbound path.
    pub fn toggle_play_pause(&mut self, player: &mut dyn Player) -> WatchResult<()> {
        if player.state() == PlayerState::Playing {
            player.pause()
        } else {
            player.play()
        }
    }

    pub fn seek_drag_start(&mut self) {
        self.state.seeking = true;
    }

    /// Seek locally and broadcast SEEK. The guard is armed so the transient
    /// notifications caused by the seek are not broadcast as PLAY/PAUSE.
    pub fn seek_drag_commit(
        &mut self,
        seconds: f64,
        player: &mut dyn Player,
        view: &mut dyn SessionView,
        now: Instant,
    ) -> Option<Command> {
        let seconds = if seconds.is_finite() && seconds > 0.0 {
            seconds
        } else {
            0.0
        };

        self.state.suppression.arm(now);
        if let Err(e) = player.seek_to(seconds, true) {
            warn!(seconds, error = %e, "player rejected seek");
        }

        let cmd = Command::seek(player.video_id().unwrap_or_default(), seconds);
        let sent = self.send(&cmd, view);
        self.state.seeking = false;
        sent.then_some(cmd)
    }

    /// Chat submit. Empty fields raise an alert; otherwise the line is sent
    /// and echoed locally whether or not the relay is reachable.
    pub fn submit_chat(
        &mut self,
        sender: &str,
        message: &str,
        view: &mut dyn SessionView,
    ) -> Option<Command> {
        let (sender, message) = (sender.trim(), message.trim());
        if sender.is_empty() || message.is_empty() {
            view.alert(ALERT_EMPTY_CHAT);
            return None;
        }

        let cmd = Command::chat(sender, message);
        let sent = self.send(&cmd, view);
        view.append_chat_line(sender, message, true);
        sent.then_some(cmd)
    }

    /// Poll tick: refresh the slider unless the user is dragging it.
    pub fn on_poll_tick(&self, player: &dyn Player, view: &mut dyn SessionView) {
        if self.state.seeking {
            return;
        }
        view.set_slider(player.current_time(), player.duration());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::PlayerEvent;
    use crate::testing::{MemoryLink, PlayerCall, RecordingPlayer, RecordingView};
    use std::time::Duration;
    use watchparty_core::LinkState;

    const VIDEO: &str = "dQw4w9WgXcQ";

    fn ready_dispatcher(role: Role) -> (Dispatcher<MemoryLink>, RecordingView) {
        let mut dispatcher = Dispatcher::new(
            MemoryLink::connected(),
            SessionState::new(role, SuppressionGuard::default()),
        );
        let mut view = RecordingView::new();
        dispatcher.on_player_ready(&mut view);
        (dispatcher, view)
    }

    /// Deliver every queued player notification at `at`.
    fn deliver(
        dispatcher: &mut Dispatcher<MemoryLink>,
        player: &mut RecordingPlayer,
        view: &mut RecordingView,
        at: Instant,
    ) -> Vec<Command> {
        let mut sent = Vec::new();
        for event in player.take_events() {
            if let PlayerEvent::StateChange(state) = event {
                if let Some(cmd) = dispatcher.on_player_state_change(state, &*player, view, at) {
                    sent.push(cmd);
                }
            }
        }
        sent
    }

    #[test]
    fn local_play_and_pause_are_broadcast() {
        let (mut d, mut view) = ready_dispatcher(Role::Host);
        let mut player = RecordingPlayer::with_video(VIDEO);
        player.set_position(12.0);
        let now = Instant::now();

        d.toggle_play_pause(&mut player).unwrap();
        assert_eq!(
            deliver(&mut d, &mut player, &mut view, now),
            vec![Command::play(VIDEO, 12.0)]
        );

        player.set_position(20.0);
        d.toggle_play_pause(&mut player).unwrap();
        assert_eq!(
            deliver(&mut d, &mut player, &mut view, now),
            vec![Command::pause(VIDEO, 20.0)]
        );
        assert_eq!(
            d.link().sent_commands(),
            vec![Command::play(VIDEO, 12.0), Command::pause(VIDEO, 20.0)]
        );
        assert_eq!(view.last_icon(), Some(PlayerState::Paused));
    }

    #[test]
    fn buffering_and_ended_never_originate() {
        let (mut d, mut view) = ready_dispatcher(Role::Host);
        let player = RecordingPlayer::with_video(VIDEO);
        let now = Instant::now();
        for state in [PlayerState::Buffering, PlayerState::Ended, PlayerState::Unstarted] {
            assert_eq!(d.on_player_state_change(state, &player, &mut view, now), None);
        }
        assert!(d.link().sent.is_empty());
        assert_eq!(view.icons.len(), 3);
    }

    #[test]
    fn remote_commands_never_echo_within_window() {
        let (mut d, mut view) = ready_dispatcher(Role::Host);
        let mut player = RecordingPlayer::with_video("other-video");
        let t0 = Instant::now();

        let commands = [
            Command::load(VIDEO, 0.0),
            Command::play(VIDEO, 5.0),
            Command::pause(VIDEO, 9.0),
            Command::seek(VIDEO, 30.0),
            Command::play("", 31.0),
            Command::pause(VIDEO, 33.0),
        ];
        for (i, cmd) in commands.into_iter().enumerate() {
            let at = t0 + Duration::from_millis(40 * i as u64);
            d.on_remote_command(cmd, &mut player, &mut view, at);
            // Notifications trickle in up to 99ms after the command.
            for lag in [0u64, 1, 50, 99] {
                let sent = deliver(&mut d, &mut player, &mut view, at + Duration::from_millis(lag));
                assert!(sent.is_empty(), "echoed {sent:?}");
                // Replays of the last transition are suppressed too.
                let replay = d.on_player_state_change(
                    player.state(),
                    &player,
                    &mut view,
                    at + Duration::from_millis(lag),
                );
                assert_eq!(replay, None);
            }
        }
        assert!(d.link().sent.is_empty());
    }

    #[test]
    fn guard_expires_after_window() {
        let (mut d, mut view) = ready_dispatcher(Role::Host);
        let mut player = RecordingPlayer::with_video(VIDEO);
        let t0 = Instant::now();

        d.on_remote_command(Command::play(VIDEO, 5.0), &mut player, &mut view, t0);
        assert!(deliver(&mut d, &mut player, &mut view, t0).is_empty());

        // The user pauses well after the window closed.
        let later = t0 + Duration::from_millis(500);
        d.toggle_play_pause(&mut player).unwrap();
        assert_eq!(
            deliver(&mut d, &mut player, &mut view, later),
            vec![Command::pause(VIDEO, 5.0)]
        );
    }

    #[test]
    fn remote_play_pause_is_idempotent() {
        let (mut d, mut view) = ready_dispatcher(Role::Host);
        let mut player = RecordingPlayer::with_video(VIDEO);
        let t0 = Instant::now();

        for round in 0..5u64 {
            let at = t0 + Duration::from_millis(10 * round);
            d.on_remote_command(Command::play(VIDEO, 42.0), &mut player, &mut view, at);
            d.on_remote_command(Command::play(VIDEO, 42.0), &mut player, &mut view, at);
            d.on_remote_command(Command::pause(VIDEO, 42.0), &mut player, &mut view, at);
            deliver(&mut d, &mut player, &mut view, at);
            assert_eq!(player.state(), PlayerState::Paused);
            assert_eq!(player.current_time(), 42.0);
            assert_eq!(player.video_id().as_deref(), Some(VIDEO));
        }
        assert_eq!(view.last_icon(), Some(PlayerState::Paused));
        assert!(!player
            .calls()
            .iter()
            .any(|c| matches!(c, PlayerCall::Load(..))));
        assert!(d.link().sent.is_empty());
    }

    #[test]
    fn remote_play_loads_other_video_first() {
        let (mut d, mut view) = ready_dispatcher(Role::Guest);
        let mut player = RecordingPlayer::with_video("Y");
        d.on_remote_command(Command::play("X", 42.0), &mut player, &mut view, Instant::now());
        assert_eq!(
            player.calls(),
            &[
                PlayerCall::Load("X".into(), 42.0),
                PlayerCall::Seek(42.0),
                PlayerCall::Play,
            ]
        );
    }

    #[test]
    fn remote_video_ignored_until_ready() {
        let mut d = Dispatcher::new(MemoryLink::connected(), SessionState::default());
        let mut view = RecordingView::new();
        let mut player = RecordingPlayer::new();
        d.on_remote_command(Command::load(VIDEO, 0.0), &mut player, &mut view, Instant::now());
        assert!(player.calls().is_empty());

        // Chat does not depend on the player.
        d.on_remote_command(Command::chat("bob", "hi"), &mut player, &mut view, Instant::now());
        assert_eq!(view.chat, vec![("bob".into(), "hi".into(), false)]);
    }

    #[test]
    fn player_failure_is_not_fatal() {
        let (mut d, mut view) = ready_dispatcher(Role::Host);
        let mut player = RecordingPlayer::with_video(VIDEO);
        player.fail_next("boom");
        d.on_remote_command(Command::play(VIDEO, 1.0), &mut player, &mut view, Instant::now());
        d.on_remote_command(Command::play(VIDEO, 2.0), &mut player, &mut view, Instant::now());
        assert_eq!(player.calls(), &[PlayerCall::Seek(2.0), PlayerCall::Play]);
    }

    #[test]
    fn seek_drag_blocks_pause_and_commits_seek() {
        let (mut d, mut view) = ready_dispatcher(Role::Guest);
        let mut player = RecordingPlayer::with_video(VIDEO);
        let t0 = Instant::now();

        d.toggle_play_pause(&mut player).unwrap();
        deliver(&mut d, &mut player, &mut view, t0);
        d.link_mut().sent.clear();

        d.seek_drag_start();
        assert!(d.state().seeking);
        // Dragging transiently pauses the widget.
        let later = t0 + Duration::from_secs(1);
        assert_eq!(
            d.on_player_state_change(PlayerState::Paused, &player, &mut view, later),
            None
        );
        d.on_poll_tick(&player, &mut view);
        assert!(view.sliders.is_empty());

        let cmd = d.seek_drag_commit(75.0, &mut player, &mut view, later);
        assert_eq!(cmd, Some(Command::seek(VIDEO, 75.0)));
        assert!(!d.state().seeking);
        assert_eq!(player.calls().last(), Some(&PlayerCall::Seek(75.0)));

        // The widget's own notification right after the commit is swallowed.
        assert_eq!(
            d.on_player_state_change(
                PlayerState::Playing,
                &player,
                &mut view,
                later + Duration::from_millis(30)
            ),
            None
        );
        assert_eq!(d.link().sent_commands(), vec![Command::seek(VIDEO, 75.0)]);

        d.on_poll_tick(&player, &mut view);
        assert_eq!(view.sliders, vec![(75.0, 600.0)]);
    }

    #[test]
    fn load_requires_valid_url_and_host_role() {
        let (mut host, mut view) = ready_dispatcher(Role::Host);
        assert_eq!(host.submit_load("https://example.com/nope", &mut view), None);
        assert_eq!(view.alerts, vec![ALERT_INVALID_URL.to_string()]);

        let url = format!("https://www.youtube.com/watch?v={VIDEO}");
        assert_eq!(host.submit_load(&url, &mut view), Some(Command::load(VIDEO, 0.0)));
        assert_eq!(host.link().sent_commands(), vec![Command::load(VIDEO, 0.0)]);

        let (mut guest, mut view) = ready_dispatcher(Role::Guest);
        assert_eq!(guest.submit_load(&url, &mut view), None);
        assert_eq!(view.alerts, vec![ALERT_GUEST_LOAD.to_string()]);
        assert!(guest.link().sent.is_empty());
    }

    #[test]
    fn empty_chat_is_rejected() {
        let (mut d, mut view) = ready_dispatcher(Role::Host);
        assert_eq!(d.submit_chat("", "hello", &mut view), None);
        assert_eq!(d.submit_chat("alice", "   ", &mut view), None);
        assert!(d.link().sent.is_empty());
        assert!(view.chat.is_empty());
        assert_eq!(view.alerts.len(), 2);
    }

    #[test]
    fn chat_is_sent_and_echoed_locally() {
        let (mut d, mut view) = ready_dispatcher(Role::Host);
        assert_eq!(
            d.submit_chat(" alice ", " hello ", &mut view),
            Some(Command::chat("alice", "hello"))
        );
        assert_eq!(d.link().sent_commands(), vec![Command::chat("alice", "hello")]);
        assert_eq!(view.chat, vec![("alice".into(), "hello".into(), true)]);
    }

    #[test]
    fn send_while_disconnected_sets_status() {
        let mut d = Dispatcher::new(MemoryLink::disconnected(), SessionState::default());
        let mut view = RecordingView::new();
        d.on_player_ready(&mut view);

        assert_eq!(d.submit_chat("alice", "anyone?", &mut view), None);
        assert_eq!(view.last_status(), Some(STATUS_NOT_CONNECTED));
        // The local echo still happens.
        assert_eq!(view.chat.len(), 1);

        d.link_mut().state = LinkState::Connected;
        assert!(d.submit_chat("alice", "now?", &mut view).is_some());
        assert_eq!(d.link().sent_commands(), vec![Command::chat("alice", "now?")]);
    }

    #[test]
    fn transport_events_update_status() {
        let (mut d, mut view) = ready_dispatcher(Role::Host);
        let mut player = RecordingPlayer::new();
        let now = Instant::now();

        d.on_transport_event(TransportEvent::Opened, &mut player, &mut view, now);
        assert_eq!(view.last_status(), Some(STATUS_CONNECTED));

        d.on_transport_event(
            TransportEvent::Error("refused".into()),
            &mut player,
            &mut view,
            now,
        );
        assert_eq!(view.last_status(), Some(STATUS_CONNECTION_ERROR));

        d.on_transport_event(
            TransportEvent::Closed {
                retry_in: Duration::from_secs(5),
            },
            &mut player,
            &mut view,
            now,
        );
        assert_eq!(
            view.last_status(),
            Some("Disconnected. Reconnecting in 5 seconds...")
        );

        d.on_transport_event(
            TransportEvent::Command(Command::chat("carol", "back")),
            &mut player,
            &mut view,
            now,
        );
        assert_eq!(view.chat, vec![("carol".into(), "back".into(), false)]);
    }
}
