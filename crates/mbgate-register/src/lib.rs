//! Typed value to Modbus register codec.
//!
//! Converts scalar values of 16, 32 and 64 bits into the sequence of 16-bit
//! register words a device exposes, and back. Bytes within a register are
//! always big-endian; the [`WordOrder`] only reorders whole words.
//!
//! Both directions are pure. Round trips are exact, including float bit
//! patterns.

pub mod codec;
pub mod error;
pub mod map;
pub mod types;
pub mod value;

pub use codec::{decode, encode, encode_value, parse_word};
pub use error::{CodecError, Result};
pub use map::RegisterMap;
pub use types::{BaseType, WordOrder};
pub use value::{RawValue, TypedValue, Value};
