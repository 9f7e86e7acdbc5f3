use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CodecError;

/// Scalar type stored in one or more consecutive registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseType {
    Bool,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Float32,
    Int64,
    Uint64,
    Float64,
}

impl BaseType {
    /// Every supported base type, narrowest first.
    pub const ALL: [BaseType; 9] = [
        BaseType::Bool,
        BaseType::Int16,
        BaseType::Uint16,
        BaseType::Int32,
        BaseType::Uint32,
        BaseType::Float32,
        BaseType::Int64,
        BaseType::Uint64,
        BaseType::Float64,
    ];

    /// Width of the serialized value in bits. `bool` occupies a full register.
    pub fn bit_width(self) -> usize {
        match self {
            BaseType::Bool | BaseType::Int16 | BaseType::Uint16 => 16,
            BaseType::Int32 | BaseType::Uint32 | BaseType::Float32 => 32,
            BaseType::Int64 | BaseType::Uint64 | BaseType::Float64 => 64,
        }
    }

    /// Number of 16-bit registers the value occupies.
    pub fn register_count(self) -> usize {
        self.bit_width() / 16
    }

    pub fn is_float(self) -> bool {
        matches!(self, BaseType::Float32 | BaseType::Float64)
    }

    /// Canonical lowercase tag.
    pub fn as_str(self) -> &'static str {
        match self {
            BaseType::Bool => "bool",
            BaseType::Int16 => "int16",
            BaseType::Uint16 => "uint16",
            BaseType::Int32 => "int32",
            BaseType::Uint32 => "uint32",
            BaseType::Float32 => "float32",
            BaseType::Int64 => "int64",
            BaseType::Uint64 => "uint64",
            BaseType::Float64 => "float64",
        }
    }
}

impl FromStr for BaseType {
    type Err = CodecError;

    /// Accepts canonical tags plus the short Rust-style and C-style aliases
    /// device configs tend to use (`u16`, `i32`, `float`, `double`, ...).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', '-'], "");
        let base_type = match normalized.as_str() {
            "bool" | "boolean" | "coil" => BaseType::Bool,
            "int16" | "i16" | "short" => BaseType::Int16,
            "uint16" | "u16" | "ushort" | "word" => BaseType::Uint16,
            "int32" | "i32" | "int" | "dint" => BaseType::Int32,
            "uint32" | "u32" | "uint" | "dword" => BaseType::Uint32,
            "float32" | "f32" | "float" | "real" => BaseType::Float32,
            "int64" | "i64" | "long" => BaseType::Int64,
            "uint64" | "u64" | "ulong" => BaseType::Uint64,
            "float64" | "f64" | "double" => BaseType::Float64,
            _ => return Err(CodecError::UnsupportedType(s.to_string())),
        };
        Ok(base_type)
    }
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order of whole 16-bit words for values wider than one register.
///
/// Bytes inside a word are always big-endian; only the word sequence moves.
/// For a 64-bit value with big-endian words `[w0, w1, w2, w3]`:
/// - `Be`:  `[w0, w1, w2, w3]`
/// - `Le`:  `[w3, w2, w1, w0]`
/// - `Ws1`: `[w1, w0, w3, w2]` (pairwise swap)
/// - `Ws2`: `[w2, w3, w0, w1]` (half swap; same as `Be` at 32 bits)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WordOrder {
    #[default]
    Be,
    Le,
    Ws1,
    Ws2,
}

impl WordOrder {
    pub const ALL: [WordOrder; 4] = [WordOrder::Be, WordOrder::Le, WordOrder::Ws1, WordOrder::Ws2];

    pub fn as_str(self) -> &'static str {
        match self {
            WordOrder::Be => "BE",
            WordOrder::Le => "LE",
            WordOrder::Ws1 => "WS1",
            WordOrder::Ws2 => "WS2",
        }
    }

    /// Reorder big-endian words in place.
    ///
    /// Every order is its own inverse, so the same call converts in both
    /// directions.
    pub(crate) fn permute(self, words: &mut [u16]) {
        if words.len() < 2 {
            return;
        }
        match self {
            WordOrder::Be => {}
            WordOrder::Le => words.reverse(),
            WordOrder::Ws1 => {
                for pair in words.chunks_exact_mut(2) {
                    pair.swap(0, 1);
                }
            }
            WordOrder::Ws2 => {
                if words.len() == 4 {
                    let (front, back) = words.split_at_mut(2);
                    front.swap_with_slice(back);
                }
            }
        }
    }
}

impl FromStr for WordOrder {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace(['-', '_'], "");
        let order = match normalized.as_str() {
            "BE" | "BIGENDIAN" | "ABCD" => WordOrder::Be,
            "LE" | "LITTLEENDIAN" => WordOrder::Le,
            "WS1" | "WORDSWAP" => WordOrder::Ws1,
            "WS2" | "HALFSWAP" => WordOrder::Ws2,
            _ => return Err(CodecError::InvalidWordOrder(s.to_string())),
        };
        Ok(order)
    }
}

impl fmt::Display for WordOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
