//! watchparty-relay: fan-out relay for watchparty sessions.
//!
//! Every peer connected on the relay path receives every playback and chat
//! command, its own included. Peers that join late are sent the most recent
//! playback command first.

pub mod config;
pub mod peers;
pub mod server;

pub use config::{Overrides, RelayConfig};
pub use peers::PeerRegistry;
pub use server::{route, RelayServer, Routing};
