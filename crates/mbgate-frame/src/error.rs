/// Errors that can occur while sending fragmented messages.
///
/// Reassembly never fails: malformed or missing fragments simply never
/// complete a message, and the caller's deadline catches that.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The channel rejected a fragment write.
    #[error("channel error: {0}")]
    Channel(#[from] mbgate_channel::ChannelError),

    /// The profile cannot produce valid fragments.
    #[error("invalid frame config: {0}")]
    InvalidConfig(String),

    /// A sentinel profile only carries UTF-8 text.
    #[error("sentinel profile requires UTF-8 payload: {0}")]
    NotUtf8(#[from] std::str::Utf8Error),
}

pub type Result<T> = std::result::Result<T, FrameError>;
