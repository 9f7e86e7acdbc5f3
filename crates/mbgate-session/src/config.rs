use std::time::Duration;

use mbgate_frame::FrameProfile;

/// Default time allowed for a complete response.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// How often the listener wakes to check for shutdown while the link is idle.
pub const DEFAULT_LISTENER_POLL: Duration = Duration::from_millis(20);

/// Configuration for a command/response session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Deadline for each exchange, measured from the start of sending.
    pub timeout: Duration,
    /// Fragmentation profile spoken by the device.
    pub profile: FrameProfile,
    /// Listener poll interval.
    pub listener_poll: Duration,
}

impl SessionConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_profile(mut self, profile: FrameProfile) -> Self {
        self.profile = profile;
        self
    }

    pub fn with_listener_poll(mut self, poll: Duration) -> Self {
        self.listener_poll = poll;
        self
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            profile: FrameProfile::default(),
            listener_poll: DEFAULT_LISTENER_POLL,
        }
    }
}
