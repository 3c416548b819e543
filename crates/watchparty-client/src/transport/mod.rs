//! Relay transport: a reconnecting websocket link plus the events it reports
//! to the session loop.

pub mod reconnect;
pub mod websocket;

pub use reconnect::{ReconnectSchedule, RECONNECT_DELAY};
pub use websocket::RelayConnection;

use std::time::Duration;

use watchparty_core::Command;

/// Events reported by the transport task, in the order they happened.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A connect attempt started.
    Connecting { attempt: u64 },
    /// The channel is open.
    Opened,
    /// A connect attempt or an open channel failed.
    Error(String),
    /// The channel closed; the next attempt starts after `retry_in`.
    Closed { retry_in: Duration },
    /// A well-formed command arrived.
    Command(Command),
}

/// Build the relay websocket URL from its parts.
pub fn relay_url(host: &str, port: u16, path: &str) -> String {
    let path = if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{path}")
    };
    format!("ws://{host}:{port}{path}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_from_parts() {
        assert_eq!(
            relay_url("127.0.0.1", 8080, "/watchparty"),
            "ws://127.0.0.1:8080/watchparty"
        );
        assert_eq!(relay_url("example.com", 9000, "party"), "ws://example.com:9000/party");
    }
}
