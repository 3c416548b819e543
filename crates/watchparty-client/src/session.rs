//! Session event loop.
//!
//! One task owns the dispatcher, the player and the view, and processes
//! inputs one at a time: UI intents, player notifications, transport events
//! and poll ticks. Nothing else touches session state, so no locking is
//! needed anywhere in the client.

use std::ops::ControlFlow;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use watchparty_core::{TransportLink, WatchResult};

use crate::dispatcher::{Dispatcher, SessionState};
use crate::guard::{SuppressionGuard, SUPPRESSION_WINDOW};
use crate::player::{Player, PlayerEvent, PlayerState};
use crate::transport::{RelayConnection, TransportEvent, RECONNECT_DELAY};
use crate::view::{Role, SessionView, UiIntent, ALERT_NOT_READY};

/// Slider refresh interval while playing.
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Tunables for one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Relay websocket URL, e.g. `ws://127.0.0.1:8080/watchparty`.
    pub url: String,
    pub role: Role,
    pub reconnect_delay: Duration,
    pub suppression_window: Duration,
    pub poll_interval: Duration,
}

impl SessionConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            role: Role::Host,
            reconnect_delay: RECONNECT_DELAY,
            suppression_window: SUPPRESSION_WINDOW,
            poll_interval: POLL_INTERVAL,
        }
    }
}

/// Everything the loop reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionInput {
    Intent(UiIntent),
    Player(PlayerEvent),
    Transport(TransportEvent),
    PollTick,
}

pub struct Session<L, P, V> {
    dispatcher: Dispatcher<L>,
    player: P,
    view: V,
    poll_interval: Duration,
    /// Whether the slider ticker should run.
    polling: bool,
    /// Set when a PLAYING notification asks for a fresh ticker.
    restart_poll: bool,
}

impl<L, P, V> Session<L, P, V>
where
    L: TransportLink,
    P: Player,
    V: SessionView,
{
    pub fn new(link: L, player: P, view: V, config: &SessionConfig) -> Self {
        let state = SessionState::new(config.role, SuppressionGuard::new(config.suppression_window));
        Self {
            dispatcher: Dispatcher::new(link, state),
            player,
            view,
            poll_interval: config.poll_interval,
            polling: false,
            restart_poll: false,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher<L> {
        &self.dispatcher
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut P {
        &mut self.player
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }

    /// Process one input. `Break` ends the session.
    pub fn handle(&mut self, input: SessionInput, now: Instant) -> ControlFlow<()> {
        match input {
            SessionInput::Intent(intent) => return self.handle_intent(intent, now),
            SessionInput::Player(PlayerEvent::Ready) => {
                debug!("player ready");
                self.dispatcher.on_player_ready(&mut self.view);
            }
            SessionInput::Player(PlayerEvent::StateChange(state)) => {
                self.dispatcher
                    .on_player_state_change(state, &self.player, &mut self.view, now);
                if state == PlayerState::Playing {
                    self.polling = true;
                    self.restart_poll = true;
                } else if self.polling {
                    self.polling = false;
                    // Leave the slider where playback stopped.
                    self.dispatcher.on_poll_tick(&self.player, &mut self.view);
                }
            }
            SessionInput::Transport(event) => {
                self.dispatcher
                    .on_transport_event(event, &mut self.player, &mut self.view, now);
            }
            SessionInput::PollTick => {
                self.dispatcher.on_poll_tick(&self.player, &mut self.view);
            }
        }
        ControlFlow::Continue(())
    }

    fn handle_intent(&mut self, intent: UiIntent, now: Instant) -> ControlFlow<()> {
        if intent == UiIntent::Quit {
            info!("session ending");
            return ControlFlow::Break(());
        }
        if !self.dispatcher.state().player_ready {
            self.view.alert(ALERT_NOT_READY);
            return ControlFlow::Continue(());
        }

        match intent {
            UiIntent::SubmitLoad(url) => {
                self.dispatcher.submit_load(&url, &mut self.view);
            }
            UiIntent::TogglePlayPause => {
                if let Err(e) = self.dispatcher.toggle_play_pause(&mut self.player) {
                    warn!(error = %e, "toggle play/pause failed");
                }
            }
            UiIntent::SeekDragStart => self.dispatcher.seek_drag_start(),
            UiIntent::SeekDragCommit(seconds) => {
                self.dispatcher
                    .seek_drag_commit(seconds, &mut self.player, &mut self.view, now);
            }
            UiIntent::SubmitChat { sender, message } => {
                self.dispatcher
                    .submit_chat(&sender, &message, &mut self.view);
            }
            UiIntent::Quit => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    fn sync_ticker(&mut self, ticker: &mut Option<Interval>) {
        if !self.polling {
            *ticker = None;
            return;
        }
        if self.restart_poll || ticker.is_none() {
            let mut interval = tokio::time::interval(self.poll_interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            *ticker = Some(interval);
            self.restart_poll = false;
        }
    }

    /// Drive the session until a Quit intent arrives or the intent channel
    /// closes.
    pub async fn run(
        &mut self,
        mut intents: mpsc::UnboundedReceiver<UiIntent>,
        mut player_events: mpsc::UnboundedReceiver<PlayerEvent>,
        mut transport_events: mpsc::UnboundedReceiver<TransportEvent>,
    ) -> WatchResult<()> {
        let mut ticker: Option<Interval> = None;

        loop {
            let input = tokio::select! {
                biased;
                Some(event) = player_events.recv() => SessionInput::Player(event),
                Some(event) = transport_events.recv() => SessionInput::Transport(event),
                intent = intents.recv() => {
                    SessionInput::Intent(intent.unwrap_or(UiIntent::Quit))
                }
                _ = next_tick(ticker.as_mut()) => SessionInput::PollTick,
            };

            if self.handle(input, Instant::now()).is_break() {
                break;
            }
            self.sync_ticker(&mut ticker);
        }
        Ok(())
    }
}

async fn next_tick(ticker: Option<&mut Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// Connect to the relay described by `config` and run a session with the
/// given player and view until the user quits.
pub async fn run<P, V>(
    config: SessionConfig,
    player: P,
    player_events: mpsc::UnboundedReceiver<PlayerEvent>,
    view: V,
    intents: mpsc::UnboundedReceiver<UiIntent>,
) -> WatchResult<()>
where
    P: Player,
    V: SessionView,
{
    info!(url = %config.url, role = ?config.role, "starting watch party session");
    let (link, transport_events) = RelayConnection::connect(config.url.clone(), config.reconnect_delay);
    let mut session = Session::new(link, player, view, &config);
    session.run(intents, player_events, transport_events).await
}
