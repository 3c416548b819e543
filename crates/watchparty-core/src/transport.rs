//! Abstract outbound link to the relay.
//!
//! The websocket implementation lives in `watchparty-client`; tests use an
//! in-memory link.

use crate::error::WatchResult;

/// Connection state of the single relay link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// No connection; a reconnect may be pending.
    Disconnected,
    /// A connect attempt is in flight.
    Connecting,
    /// The channel is open and frames may be sent.
    Connected,
}

impl LinkState {
    pub fn is_open(self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Outbound half of a relay connection.
pub trait TransportLink {
    /// Current connection state as last observed by the session.
    fn state(&self) -> LinkState;

    /// Queue a text frame for transmission.
    ///
    /// Returns `WatchError::NotConnected` if the link is not open.
    fn send_text(&mut self, frame: String) -> WatchResult<()>;
}
