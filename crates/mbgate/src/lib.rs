//! Test tooling for Modbus/BLE gateway devices.
//!
//! Every device interaction follows the same path: encode a typed value into
//! register words, wrap it in a command, fragment the command to fit the
//! link, reassemble the reply, decode it.
//!
//! # Crate Structure
//!
//! - [`channel`]: packet channel capability (in-memory pair, Unix datagrams)
//! - [`register`]: typed value to register word codec, register memory
//! - [`frame`]: tagged and sentinel fragmentation with reassembly
//! - [`session`]: command/response sessions and a device emulator (behind `session` feature)

/// Re-export channel types.
pub mod channel {
    pub use mbgate_channel::*;
}

/// Re-export register codec types.
pub mod register {
    pub use mbgate_register::*;
}

/// Re-export frame types.
pub mod frame {
    pub use mbgate_frame::*;
}

/// Re-export session types (requires `session` feature).
#[cfg(feature = "session")]
pub mod session {
    pub use mbgate_session::*;
}
