//! watchparty-client: client library for synchronized video watching.
//!
//! Keeps a local player in step with every other participant connected to
//! the same relay. Local play/pause/seek/load gestures become commands on the
//! wire; commands from the relay are reconciled against the local player
//! under an echo-suppression guard so they are not broadcast back.
//!
//! # Quick Start
//!
//! ```no_run
//! use watchparty_client::{session, SessionConfig, SimulatedPlayer, UiIntent};
//! # use watchparty_client::testing::RecordingView;
//!
//! # async fn example() -> watchparty_core::WatchResult<()> {
//! let (player, player_events) = SimulatedPlayer::new(600.0);
//! let (intent_tx, intents) = tokio::sync::mpsc::unbounded_channel();
//! intent_tx.send(UiIntent::SubmitLoad("https://youtu.be/dQw4w9WgXcQ".into())).ok();
//!
//! session::run(
//!     SessionConfig::new("ws://127.0.0.1:8080/watchparty"),
//!     player,
//!     player_events,
//!     RecordingView::new(),
//!     intents,
//! )
//! .await
//! # }
//! ```

pub mod dispatcher;
pub mod guard;
pub mod player;
pub mod reconcile;
pub mod session;
pub mod simulated;
pub mod testing;
pub mod transport;
pub mod view;

// Re-export primary public types.
pub use dispatcher::{Dispatcher, SessionState};
pub use guard::{SuppressionGuard, SUPPRESSION_WINDOW};
pub use player::{PlaybackState, Player, PlayerEvent, PlayerState};
pub use reconcile::PlayerAction;
pub use session::{Session, SessionConfig, SessionInput, POLL_INTERVAL};
pub use simulated::SimulatedPlayer;
pub use transport::{relay_url, RelayConnection, TransportEvent, RECONNECT_DELAY};
pub use view::{Role, SessionView, UiIntent};
