//! Command/response sessions with a gateway device.
//!
//! A [`Session`] owns one packet channel, runs one exchange at a time and
//! enforces a deadline per exchange. Replies are parsed into a
//! [`DeviceResponse`] when they are a status object and handed back raw
//! otherwise. [`DeviceEmulator`] implements the device side of the same
//! command vocabulary for tests and local simulation.

pub mod command;
pub mod config;
pub mod emulator;
pub mod error;
pub mod response;
pub mod session;

pub use command::{Command, RegisterKind, RegisterSpec};
pub use config::{SessionConfig, DEFAULT_LISTENER_POLL, DEFAULT_TIMEOUT};
pub use emulator::DeviceEmulator;
pub use error::{Result, SessionError};
pub use response::{parse_response, DeviceResponse, RawResponse, Response, STATUS_ERROR, STATUS_OK};
pub use session::{Session, SessionState};
