//! Message fragmentation over small-payload packet channels.
//!
//! A gateway link carries packets no larger than its MTU, so every message is
//! sliced on the way out and reassembled on the way in. Two profiles exist:
//! - Tagged: a 1-byte position tag (SINGLE/START/CONTINUE/END) prefixes each packet
//! - Sentinel: raw UTF-8 chunks followed by a packet holding only a terminator
//!
//! Neither profile acknowledges or sequences packets.

pub mod config;
pub mod error;
pub mod reader;
pub mod sentinel;
pub mod tagged;
pub mod writer;

pub use config::{FrameProfile, SentinelConfig, TaggedConfig};
pub use error::{FrameError, Result};
pub use reader::{MessageReader, Reassembler};
pub use sentinel::{split_sentinel, SentinelReassembler, DEFAULT_TERMINATOR};
pub use tagged::{decode_fragment, split_tagged, Fragment, Tag, TaggedReassembler, TAG_SIZE};
pub use writer::FragmentWriter;
