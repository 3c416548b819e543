//! Headless player that keeps time against the tokio clock.
//!
//! Used by the terminal client, where there is no real video widget. Like a
//! browser player it reports state changes through a channel instead of
//! synchronously, so the session sees them only after the call returned.

use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::trace;

use watchparty_core::{WatchError, WatchResult};

use crate::player::{Player, PlayerEvent, PlayerState};

pub struct SimulatedPlayer {
    video_id: Option<String>,
    state: PlayerState,
    /// Playhead at `anchor`, or the frozen playhead when not playing.
    position: f64,
    anchor: Option<Instant>,
    /// Reported duration of every loaded video; 0 means unknown.
    duration: f64,
    events: mpsc::UnboundedSender<PlayerEvent>,
}

impl SimulatedPlayer {
    /// Create a player. `Ready` is already queued on the returned receiver.
    pub fn new(duration: f64) -> (Self, mpsc::UnboundedReceiver<PlayerEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let _ = events.send(PlayerEvent::Ready);
        let player = Self {
            video_id: None,
            state: PlayerState::Unstarted,
            position: 0.0,
            anchor: None,
            duration: if duration.is_finite() && duration > 0.0 {
                duration
            } else {
                0.0
            },
            events,
        };
        (player, rx)
    }

    fn clamp(&self, seconds: f64) -> f64 {
        let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        if self.duration > 0.0 {
            seconds.min(self.duration)
        } else {
            seconds
        }
    }

    fn position_at(&self, now: Instant) -> f64 {
        match self.anchor {
            Some(anchor) => self.clamp(self.position + (now - anchor).as_secs_f64()),
            None => self.position,
        }
    }

    fn freeze(&mut self, now: Instant) {
        self.position = self.position_at(now);
        self.anchor = None;
    }

    fn transition(&mut self, state: PlayerState) {
        if self.state == state {
            return;
        }
        trace!(from = %self.state, to = %state, "simulated player transition");
        self.state = state;
        let _ = self.events.send(PlayerEvent::StateChange(state));
    }
}

impl Player for SimulatedPlayer {
    fn load_video_by_id(&mut self, video_id: &str, start_seconds: f64) -> WatchResult<()> {
        if video_id.is_empty() {
            return Err(WatchError::Player("empty video id".into()));
        }
        self.video_id = Some(video_id.to_string());
        self.position = self.clamp(start_seconds);
        self.anchor = None;
        self.transition(PlayerState::Buffering);
        // Loading autoplays.
        self.anchor = Some(Instant::now());
        self.transition(PlayerState::Playing);
        Ok(())
    }

    fn play(&mut self) -> WatchResult<()> {
        if self.video_id.is_none() {
            return Err(WatchError::Player("no video loaded".into()));
        }
        match self.state {
            PlayerState::Playing => return Ok(()),
            PlayerState::Ended => self.position = 0.0,
            _ => {}
        }
        self.anchor = Some(Instant::now());
        self.transition(PlayerState::Playing);
        Ok(())
    }

    fn pause(&mut self) -> WatchResult<()> {
        if matches!(self.state, PlayerState::Playing | PlayerState::Buffering) {
            self.freeze(Instant::now());
            self.transition(PlayerState::Paused);
        }
        Ok(())
    }

    fn seek_to(&mut self, seconds: f64, _allow_seek_ahead: bool) -> WatchResult<()> {
        if self.video_id.is_none() {
            return Ok(());
        }
        self.position = self.clamp(seconds);
        if self.anchor.is_some() {
            self.anchor = Some(Instant::now());
        }
        if self.state == PlayerState::Ended {
            self.transition(PlayerState::Paused);
        }
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.position_at(Instant::now())
    }

    fn duration(&self) -> f64 {
        if self.video_id.is_some() {
            self.duration
        } else {
            0.0
        }
    }

    fn video_id(&self) -> Option<String> {
        self.video_id.clone()
    }

    fn state(&self) -> PlayerState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn drain(rx: &mut mpsc::UnboundedReceiver<PlayerEvent>) -> Vec<PlayerEvent> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev);
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn load_autoplays_and_tracks_time() {
        let (mut player, mut rx) = SimulatedPlayer::new(300.0);
        assert_eq!(drain(&mut rx), vec![PlayerEvent::Ready]);

        player.load_video_by_id("abc", 10.0).unwrap();
        assert_eq!(
            drain(&mut rx),
            vec![
                PlayerEvent::StateChange(PlayerState::Buffering),
                PlayerEvent::StateChange(PlayerState::Playing),
            ]
        );

        tokio::time::advance(Duration::from_secs(5)).await;
        assert!((player.current_time() - 15.0).abs() < 1e-6);

        player.pause().unwrap();
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!((player.current_time() - 15.0).abs() < 1e-6);
        assert_eq!(
            drain(&mut rx),
            vec![PlayerEvent::StateChange(PlayerState::Paused)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn position_clamps_to_duration() {
        let (mut player, _rx) = SimulatedPlayer::new(30.0);
        player.load_video_by_id("abc", 25.0).unwrap();
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(player.current_time(), 30.0);

        player.seek_to(-4.0, true).unwrap();
        assert_eq!(player.current_time(), 0.0);
    }

    #[tokio::test(start_paused = true)]
    async fn seek_while_paused_stays_paused() {
        let (mut player, mut rx) = SimulatedPlayer::new(0.0);
        player.load_video_by_id("abc", 0.0).unwrap();
        player.pause().unwrap();
        drain(&mut rx);

        player.seek_to(120.0, true).unwrap();
        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(player.current_time(), 120.0);
        assert_eq!(player.state(), PlayerState::Paused);
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test]
    async fn play_without_video_fails() {
        let (mut player, _rx) = SimulatedPlayer::new(0.0);
        assert!(player.play().is_err());
        assert!(player.load_video_by_id("", 0.0).is_err());
        assert_eq!(player.duration(), 0.0);
        // Pausing and seeking an empty player are no-ops.
        player.pause().unwrap();
        player.seek_to(10.0, true).unwrap();
        assert_eq!(player.current_time(), 0.0);
    }

    #[tokio::test]
    async fn repeated_play_emits_once() {
        let (mut player, mut rx) = SimulatedPlayer::new(0.0);
        player.load_video_by_id("abc", 0.0).unwrap();
        drain(&mut rx);
        player.play().unwrap();
        player.play().unwrap();
        assert!(drain(&mut rx).is_empty());
    }
}
