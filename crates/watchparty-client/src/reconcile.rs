//! Reconciliation of inbound playback commands against the local player.
//!
//! A command is turned into an ordered list of [`PlayerAction`]s first and
//! applied second, so the ordering rules can be checked without a player:
//!
//! 1. A non-empty `videoId` that differs from the loaded video triggers a
//!    load at `currentTime`. An empty `videoId` never loads.
//! 2. PLAY seeks then plays. PAUSE pauses then seeks, so the paused frame
//!    lands on the sender's position. SEEK and LOAD only seek.

use watchparty_core::{VideoAction, VideoCommand, WatchResult};

use crate::player::{PlaybackState, Player};

/// A single player mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerAction {
    Load { video_id: String, start_seconds: f64 },
    Seek(f64),
    Play,
    Pause,
}

/// Compute the actions needed to apply `cmd` on top of `state`.
pub fn plan(cmd: &VideoCommand, state: &PlaybackState) -> Vec<PlayerAction> {
    let mut actions = Vec::with_capacity(3);

    if !cmd.video_id.is_empty() && state.video_id.as_deref() != Some(cmd.video_id.as_str()) {
        actions.push(PlayerAction::Load {
            video_id: cmd.video_id.clone(),
            start_seconds: cmd.current_time,
        });
    }

    match cmd.action {
        VideoAction::Play => {
            actions.push(PlayerAction::Seek(cmd.current_time));
            actions.push(PlayerAction::Play);
        }
        VideoAction::Pause => {
            actions.push(PlayerAction::Pause);
            actions.push(PlayerAction::Seek(cmd.current_time));
        }
        VideoAction::Seek | VideoAction::Load => {
            actions.push(PlayerAction::Seek(cmd.current_time));
        }
    }

    actions
}

/// Apply actions in order, stopping at the first player failure.
pub fn apply(actions: &[PlayerAction], player: &mut dyn Player) -> WatchResult<()> {
    for action in actions {
        match action {
            PlayerAction::Load {
                video_id,
                start_seconds,
            } => player.load_video_by_id(video_id, *start_seconds)?,
            PlayerAction::Seek(seconds) => player.seek_to(*seconds, true)?,
            PlayerAction::Play => player.play()?,
            PlayerAction::Pause => player.pause()?,
        }
    }
    Ok(())
}

/// Snapshot the player, plan against the snapshot and apply. Returns what
/// was applied.
pub fn reconcile(cmd: &VideoCommand, player: &mut dyn Player) -> WatchResult<Vec<PlayerAction>> {
    let state = PlaybackState::capture(&*player);
    let actions = plan(cmd, &state);
    apply(&actions, player)?;
    Ok(actions)
}
