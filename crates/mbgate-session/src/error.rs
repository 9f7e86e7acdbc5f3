use std::time::Duration;

/// Errors that can occur during a command/response exchange.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Another exchange is still in flight on this session.
    #[error("session busy: an exchange is already in flight")]
    SessionBusy,

    /// No complete response arrived before the deadline.
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// Channel-level error.
    #[error("channel error: {0}")]
    Channel(#[from] mbgate_channel::ChannelError),

    /// Frame-level error.
    #[error("frame error: {0}")]
    Frame(#[from] mbgate_frame::FrameError),

    /// The command failed validation and was not sent.
    #[error("invalid command: {0}")]
    InvalidCommand(String),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// Register value encode/decode error.
    #[error("codec error: {0}")]
    Codec(#[from] mbgate_register::CodecError),
}

pub type Result<T> = std::result::Result<T, SessionError>;
