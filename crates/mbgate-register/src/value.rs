use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::codec::encode_value;
use crate::error::{CodecError, Result};
use crate::types::{BaseType, WordOrder};

/// A loosely typed input value, before it is checked against a base type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue {
    Bool(bool),
    Int(i128),
    Float(f64),
}

impl FromStr for RawValue {
    type Err = CodecError;

    /// Reads `true`/`false`, decimal or `0x` hex integers, and decimal floats.
    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        match text.to_ascii_lowercase().as_str() {
            "true" => return Ok(RawValue::Bool(true)),
            "false" => return Ok(RawValue::Bool(false)),
            _ => {}
        }

        let (negative, digits) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        if let Some(hex) = digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
        {
            // from_str_radix takes a sign of its own; only one before `0x` is allowed.
            if hex.starts_with(['+', '-']) {
                return Err(CodecError::InvalidLiteral(s.to_string()));
            }
            let magnitude = i128::from_str_radix(hex, 16)
                .map_err(|_| CodecError::InvalidLiteral(s.to_string()))?;
            return Ok(RawValue::Int(if negative { -magnitude } else { magnitude }));
        }

        if let Ok(int) = text.parse::<i128>() {
            return Ok(RawValue::Int(int));
        }
        text.parse::<f64>()
            .map(RawValue::Float)
            .map_err(|_| CodecError::InvalidLiteral(s.to_string()))
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Bool(v) => write!(f, "{v}"),
            RawValue::Int(v) => write!(f, "{v}"),
            RawValue::Float(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for RawValue {
    fn from(v: bool) -> Self {
        RawValue::Bool(v)
    }
}

impl From<f64> for RawValue {
    fn from(v: f64) -> Self {
        RawValue::Float(v)
    }
}

impl From<f32> for RawValue {
    fn from(v: f32) -> Self {
        RawValue::Float(f64::from(v))
    }
}

macro_rules! raw_from_int {
    ($($ty:ty),*) => {
        $(impl From<$ty> for RawValue {
            fn from(v: $ty) -> Self {
                RawValue::Int(i128::from(v))
            }
        })*
    };
}

raw_from_int!(i8, u8, i16, u16, i32, u32, i64, u64);

/// An exactly typed value: one variant per base type.
///
/// This is what decode produces, and the unit for exact round trips.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    Bool(bool),
    Int16(i16),
    Uint16(u16),
    Int32(i32),
    Uint32(u32),
    Float32(f32),
    Int64(i64),
    Uint64(u64),
    Float64(f64),
}

impl Value {
    pub fn base_type(&self) -> BaseType {
        match self {
            Value::Bool(_) => BaseType::Bool,
            Value::Int16(_) => BaseType::Int16,
            Value::Uint16(_) => BaseType::Uint16,
            Value::Int32(_) => BaseType::Int32,
            Value::Uint32(_) => BaseType::Uint32,
            Value::Float32(_) => BaseType::Float32,
            Value::Int64(_) => BaseType::Int64,
            Value::Uint64(_) => BaseType::Uint64,
            Value::Float64(_) => BaseType::Float64,
        }
    }

    /// Check `raw` against the bounds of `base_type` and narrow it.
    ///
    /// Nothing is clamped or truncated: out-of-range integers, non-integral
    /// floats for integer types and non-finite floats all fail with
    /// [`CodecError::InvalidRange`]. Floats narrowed to `float32` are rounded
    /// to the nearest representable value.
    pub fn from_raw(raw: RawValue, base_type: BaseType) -> Result<Self> {
        let out_of_range = || CodecError::InvalidRange {
            value: raw.to_string(),
            base_type,
        };

        if base_type == BaseType::Bool {
            return match raw {
                RawValue::Bool(v) => Ok(Value::Bool(v)),
                RawValue::Int(0) => Ok(Value::Bool(false)),
                RawValue::Int(1) => Ok(Value::Bool(true)),
                _ => Err(out_of_range()),
            };
        }

        if base_type.is_float() {
            let wide = match raw {
                RawValue::Bool(_) => return Err(out_of_range()),
                RawValue::Int(v) => v as f64,
                RawValue::Float(v) => v,
            };
            if !wide.is_finite() {
                return Err(out_of_range());
            }
            return match base_type {
                BaseType::Float32 if wide.abs() > f64::from(f32::MAX) => Err(out_of_range()),
                BaseType::Float32 => Ok(Value::Float32(wide as f32)),
                _ => Ok(Value::Float64(wide)),
            };
        }

        let int = match raw {
            RawValue::Bool(_) => return Err(out_of_range()),
            RawValue::Int(v) => v,
            RawValue::Float(v) => {
                if !v.is_finite() || v.fract() != 0.0 {
                    return Err(out_of_range());
                }
                // Saturates; anything past i128 fails the narrowing below.
                v as i128
            }
        };

        let value = match base_type {
            BaseType::Int16 => i16::try_from(int).map(Value::Int16).ok(),
            BaseType::Uint16 => u16::try_from(int).map(Value::Uint16).ok(),
            BaseType::Int32 => i32::try_from(int).map(Value::Int32).ok(),
            BaseType::Uint32 => u32::try_from(int).map(Value::Uint32).ok(),
            BaseType::Int64 => i64::try_from(int).map(Value::Int64).ok(),
            BaseType::Uint64 => u64::try_from(int).map(Value::Uint64).ok(),
            BaseType::Bool | BaseType::Float32 | BaseType::Float64 => None,
        };
        value.ok_or_else(out_of_range)
    }
}

/// Values compare by bit pattern for floats, so `NaN == NaN` and
/// `0.0 != -0.0`. That is the equality a register round trip preserves.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int16(a), Value::Int16(b)) => a == b,
            (Value::Uint16(a), Value::Uint16(b)) => a == b,
            (Value::Int32(a), Value::Int32(b)) => a == b,
            (Value::Uint32(a), Value::Uint32(b)) => a == b,
            (Value::Float32(a), Value::Float32(b)) => a.to_bits() == b.to_bits(),
            (Value::Int64(a), Value::Int64(b)) => a == b,
            (Value::Uint64(a), Value::Uint64(b)) => a == b,
            (Value::Float64(a), Value::Float64(b)) => a.to_bits() == b.to_bits(),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int16(v) => write!(f, "{v}"),
            Value::Uint16(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Uint32(v) => write!(f, "{v}"),
            Value::Float32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Uint64(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
        }
    }
}

/// A validated value together with the word order it is stored in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypedValue {
    value: Value,
    word_order: WordOrder,
}

impl TypedValue {
    /// Validate `raw` against `base_type`.
    pub fn new(base_type: BaseType, word_order: WordOrder, raw: impl Into<RawValue>) -> Result<Self> {
        let value = Value::from_raw(raw.into(), base_type)?;
        Ok(Self { value, word_order })
    }

    /// Wrap an already exactly typed value.
    pub fn from_value(value: Value, word_order: WordOrder) -> Self {
        Self { value, word_order }
    }

    pub fn base_type(&self) -> BaseType {
        self.value.base_type()
    }

    pub fn word_order(&self) -> WordOrder {
        self.word_order
    }

    pub fn value(&self) -> Value {
        self.value
    }

    pub fn register_count(&self) -> usize {
        self.base_type().register_count()
    }

    /// Register words in transmission order.
    pub fn encode(&self) -> Vec<u16> {
        encode_value(&self.value, self.word_order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_bounds_enforced() {
        assert_eq!(
            Value::from_raw(RawValue::Int(32767), BaseType::Int16).unwrap(),
            Value::Int16(i16::MAX)
        );
        assert!(matches!(
            Value::from_raw(RawValue::Int(32768), BaseType::Int16),
            Err(CodecError::InvalidRange { .. })
        ));
        assert!(matches!(
            Value::from_raw(RawValue::Int(-1), BaseType::Uint32),
            Err(CodecError::InvalidRange { .. })
        ));
        assert_eq!(
            Value::from_raw(RawValue::Int(u64::MAX.into()), BaseType::Uint64).unwrap(),
            Value::Uint64(u64::MAX)
        );
        assert!(Value::from_raw(RawValue::Int(i128::from(u64::MAX) + 1), BaseType::Uint64).is_err());
        assert!(Value::from_raw(RawValue::Int(i128::from(i64::MIN) - 1), BaseType::Int64).is_err());
    }

    #[test]
    fn floats_into_integer_types_must_be_integral() {
        assert_eq!(
            Value::from_raw(RawValue::Float(42.0), BaseType::Int32).unwrap(),
            Value::Int32(42)
        );
        assert!(Value::from_raw(RawValue::Float(42.5), BaseType::Int32).is_err());
        assert!(Value::from_raw(RawValue::Float(f64::NAN), BaseType::Uint16).is_err());

        // Largest f64 below 2^64 still fits.
        assert_eq!(
            Value::from_raw(RawValue::Float(18446744073709549568.0), BaseType::Uint64).unwrap(),
            Value::Uint64(18446744073709549568)
        );
        assert!(Value::from_raw(RawValue::Float(18446744073709551616.0), BaseType::Uint64).is_err());
        assert_eq!(
            Value::from_raw(RawValue::Float(-9223372036854775808.0), BaseType::Int64).unwrap(),
            Value::Int64(i64::MIN)
        );
        assert!(Value::from_raw(RawValue::Float(1e300), BaseType::Int64).is_err());
    }

    #[test]
    fn float_ranges() {
        assert_eq!(
            Value::from_raw(RawValue::Float(1.5), BaseType::Float32).unwrap(),
            Value::Float32(1.5)
        );
        assert_eq!(
            Value::from_raw(RawValue::Int(7), BaseType::Float64).unwrap(),
            Value::Float64(7.0)
        );
        assert!(Value::from_raw(RawValue::Float(1e39), BaseType::Float32).is_err());
        assert!(Value::from_raw(RawValue::Float(1e39), BaseType::Float64).is_ok());
        assert!(Value::from_raw(RawValue::Float(f64::INFINITY), BaseType::Float64).is_err());
        assert!(Value::from_raw(RawValue::Float(f64::NAN), BaseType::Float32).is_err());
    }

    #[test]
    fn bool_accepts_flags_and_zero_one() {
        assert_eq!(Value::from_raw(RawValue::Bool(true), BaseType::Bool).unwrap(), Value::Bool(true));
        assert_eq!(Value::from_raw(RawValue::Int(0), BaseType::Bool).unwrap(), Value::Bool(false));
        assert!(Value::from_raw(RawValue::Int(2), BaseType::Bool).is_err());
        assert!(Value::from_raw(RawValue::Bool(true), BaseType::Int16).is_err());
    }

    #[test]
    fn parses_literals() {
        assert_eq!("true".parse::<RawValue>().unwrap(), RawValue::Bool(true));
        assert_eq!("-5".parse::<RawValue>().unwrap(), RawValue::Int(-5));
        assert_eq!("0x1F".parse::<RawValue>().unwrap(), RawValue::Int(31));
        assert_eq!("-0x10".parse::<RawValue>().unwrap(), RawValue::Int(-16));
        assert_eq!("3.25".parse::<RawValue>().unwrap(), RawValue::Float(3.25));
        assert!(matches!(
            "twelve".parse::<RawValue>(),
            Err(CodecError::InvalidLiteral(_))
        ));
    }

    #[test]
    fn hex_digits_reject_inner_sign() {
        for literal in ["0x-5", "-0x-5", "0x+5", "-0X+1F"] {
            assert!(
                matches!(
                    literal.parse::<RawValue>(),
                    Err(CodecError::InvalidLiteral(_))
                ),
                "{literal} should be rejected"
            );
        }
    }

    #[test]
    fn float_equality_is_bitwise() {
        assert_eq!(Value::Float32(f32::NAN), Value::Float32(f32::NAN));
        assert_ne!(Value::Float64(0.0), Value::Float64(-0.0));
        assert_ne!(Value::Int32(1), Value::Uint32(1));
    }

    #[test]
    fn typed_value_accessors() {
        let typed = TypedValue::new(BaseType::Uint32, WordOrder::Le, 70000u32).unwrap();
        assert_eq!(typed.base_type(), BaseType::Uint32);
        assert_eq!(typed.word_order(), WordOrder::Le);
        assert_eq!(typed.register_count(), 2);
        assert_eq!(typed.value(), Value::Uint32(70000));
        assert_eq!(typed.encode(), vec![0x1170, 0x0001]);
    }

    #[test]
    fn value_serializes_with_type_tag() {
        let json = serde_json::to_value(Value::Int32(-7)).unwrap();
        assert_eq!(json, serde_json::json!({"type": "int32", "value": -7}));
    }
}
