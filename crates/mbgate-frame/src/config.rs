use std::time::Duration;

use mbgate_channel::DEFAULT_MTU;

use crate::error::{FrameError, Result};
use crate::sentinel::DEFAULT_TERMINATOR;
use crate::tagged::TAG_SIZE;

/// Tagged binary profile settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedConfig {
    /// Negotiated link MTU. One byte per packet goes to the tag.
    pub mtu: usize,
}

impl TaggedConfig {
    /// Largest payload a single fragment carries.
    pub fn max_payload(&self) -> usize {
        self.mtu.saturating_sub(TAG_SIZE)
    }
}

impl Default for TaggedConfig {
    fn default() -> Self {
        Self { mtu: DEFAULT_MTU }
    }
}

/// Sentinel text profile settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentinelConfig {
    /// Maximum bytes per chunk write.
    pub chunk_size: usize,
    /// Pause after each chunk write so the device can drain its buffer.
    pub chunk_delay: Duration,
    /// Literal token marking the end of a message.
    pub terminator: String,
    /// Pause after the terminator write.
    pub terminator_delay: Duration,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_MTU,
            chunk_delay: Duration::from_millis(20),
            terminator: DEFAULT_TERMINATOR.to_string(),
            terminator_delay: Duration::from_millis(50),
        }
    }
}

/// Fragmentation scheme spoken by an endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameProfile {
    Tagged(TaggedConfig),
    Sentinel(SentinelConfig),
}

impl FrameProfile {
    /// Tagged profile for a link with the given MTU.
    pub fn tagged(mtu: usize) -> Self {
        FrameProfile::Tagged(TaggedConfig { mtu })
    }

    /// Sentinel profile with the given chunk size and default delays.
    pub fn sentinel(chunk_size: usize) -> Self {
        FrameProfile::Sentinel(SentinelConfig {
            chunk_size,
            ..SentinelConfig::default()
        })
    }

    /// Reject settings that cannot produce valid fragments.
    pub fn validate(&self) -> Result<()> {
        match self {
            FrameProfile::Tagged(cfg) => {
                if cfg.max_payload() == 0 {
                    return Err(FrameError::InvalidConfig(format!(
                        "mtu {} leaves no room for payload after the tag byte",
                        cfg.mtu
                    )));
                }
            }
            FrameProfile::Sentinel(cfg) => {
                if cfg.chunk_size == 0 {
                    return Err(FrameError::InvalidConfig(
                        "chunk size must be greater than zero".to_string(),
                    ));
                }
                if cfg.terminator.is_empty() {
                    return Err(FrameError::InvalidConfig(
                        "terminator must not be empty".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &'static str {
        match self {
            FrameProfile::Tagged(_) => "tagged",
            FrameProfile::Sentinel(_) => "sentinel",
        }
    }
}

impl Default for FrameProfile {
    fn default() -> Self {
        FrameProfile::Tagged(TaggedConfig::default())
    }
}
