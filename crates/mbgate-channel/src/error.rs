use std::path::PathBuf;

/// Errors that can occur on a packet channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Failed to bind to the specified address.
    #[error("failed to bind to {path}: {source}")]
    Bind {
        path: PathBuf,
        source: std::io::Error,
    },

    /// An I/O error occurred on the underlying link.
    #[error("channel I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The socket path is too long for the platform.
    #[error("socket path too long ({len} bytes, max {max}): {path}")]
    PathTooLong {
        path: PathBuf,
        len: usize,
        max: usize,
    },

    /// A single write exceeds what the link can carry.
    #[error("packet too large ({size} bytes, mtu {mtu})")]
    PacketTooLarge { size: usize, mtu: usize },

    /// The other end of the channel is gone.
    #[error("channel closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, ChannelError>;
