//! Packet channel capability for gateway links.
//!
//! The gateway is reached through a pair of characteristics: one accepts
//! outbound writes, the other notifies inbound packets. This crate models
//! that pair as two small traits and provides two adapters:
//! - an in-process pair backed by std channels (tests, emulators)
//! - Unix datagram sockets, which preserve packet boundaries like a GATT link
//!
//! Discovery and connection management live outside this crate.

pub mod error;
pub mod memory;
pub mod traits;

#[cfg(unix)]
pub mod datagram;

pub use error::{ChannelError, Result};
pub use memory::{memory_pair, MemoryEndpoint, MemorySink, MemorySource};
pub use traits::{PacketSink, PacketSource, DEFAULT_MTU};

#[cfg(unix)]
pub use datagram::{DatagramChannel, DatagramSink, DatagramSource};
