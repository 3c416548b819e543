use thiserror::Error;

/// Errors produced by the watchparty protocol and session layers.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("codec error: {0}")]
    Codec(String),

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("unknown command type: {0}")]
    UnknownCommand(String),

    #[error("not connected to the relay")]
    NotConnected,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("player error: {0}")]
    Player(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for WatchError {
    fn from(e: serde_json::Error) -> Self {
        WatchError::Codec(e.to_string())
    }
}

impl WatchError {
    /// Whether this error means an inbound frame should be silently dropped.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            WatchError::Codec(_) | WatchError::MalformedMessage(_) | WatchError::UnknownCommand(_)
        )
    }
}

pub type WatchResult<T> = Result<T, WatchError>;
