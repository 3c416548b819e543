//! watchparty-core: shared protocol library for watchparty.
//!
//! Provides the JSON command envelope, its text-frame codec, the abstract
//! relay link trait, and video URL/timestamp helpers.

pub mod codec;
pub mod error;
pub mod messages;
pub mod transport;
pub mod video;

// Re-export commonly used items at crate root.
pub use codec::{decode, decode_envelope, encode};
pub use error::{WatchError, WatchResult};
pub use messages::{ChatMessage, Command, CommandType, Envelope, VideoAction, VideoCommand};
pub use transport::{LinkState, TransportLink};
pub use video::{extract_video_id, format_time, parse_timestamp};

/// Default websocket path the relay serves.
pub const DEFAULT_PATH: &str = "/watchparty";

/// Default relay port.
pub const DEFAULT_PORT: u16 = 8080;
