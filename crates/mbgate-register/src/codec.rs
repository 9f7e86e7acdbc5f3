use tracing::trace;

use crate::error::{CodecError, Result};
use crate::types::{BaseType, WordOrder};
use crate::value::{RawValue, Value};

/// Encode a loosely typed value into register words.
///
/// The value is range-checked against `base_type` first; nothing is clamped.
/// 16-bit types and `bool` ignore `word_order`.
///
/// ```text
/// int32 123456789 → bytes 07 5B CD 15
///   BE  → [0x075B, 0xCD15]
///   LE  → [0xCD15, 0x075B]
///   WS1 → [0xCD15, 0x075B]
///   WS2 → [0x075B, 0xCD15]
/// ```
pub fn encode(value: impl Into<RawValue>, base_type: BaseType, word_order: WordOrder) -> Result<Vec<u16>> {
    let value = Value::from_raw(value.into(), base_type)?;
    Ok(encode_value(&value, word_order))
}

/// Encode an exactly typed value into register words.
pub fn encode_value(value: &Value, word_order: WordOrder) -> Vec<u16> {
    let bytes: Vec<u8> = match *value {
        Value::Bool(v) => return vec![u16::from(v)],
        Value::Int16(v) => v.to_be_bytes().to_vec(),
        Value::Uint16(v) => v.to_be_bytes().to_vec(),
        Value::Int32(v) => v.to_be_bytes().to_vec(),
        Value::Uint32(v) => v.to_be_bytes().to_vec(),
        Value::Float32(v) => v.to_be_bytes().to_vec(),
        Value::Int64(v) => v.to_be_bytes().to_vec(),
        Value::Uint64(v) => v.to_be_bytes().to_vec(),
        Value::Float64(v) => v.to_be_bytes().to_vec(),
    };

    let mut words: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    word_order.permute(&mut words);

    trace!(base_type = %value.base_type(), %word_order, ?words, "encoded value");
    words
}

/// Decode register words back into a value.
///
/// `words` must hold exactly `base_type.register_count()` entries. A `bool`
/// register is true when nonzero.
pub fn decode(words: &[u16], base_type: BaseType, word_order: WordOrder) -> Result<Value> {
    let expected = base_type.register_count();
    if words.len() != expected {
        return Err(CodecError::LengthMismatch {
            base_type,
            expected,
            actual: words.len(),
        });
    }

    if base_type == BaseType::Bool {
        return Ok(Value::Bool(words[0] != 0));
    }

    let mut ordered = words.to_vec();
    word_order.permute(&mut ordered);
    let bytes: Vec<u8> = ordered.iter().flat_map(|w| w.to_be_bytes()).collect();

    let value = match base_type {
        BaseType::Bool => Value::Bool(words[0] != 0),
        BaseType::Int16 => Value::Int16(i16::from_be_bytes(array(&bytes))),
        BaseType::Uint16 => Value::Uint16(u16::from_be_bytes(array(&bytes))),
        BaseType::Int32 => Value::Int32(i32::from_be_bytes(array(&bytes))),
        BaseType::Uint32 => Value::Uint32(u32::from_be_bytes(array(&bytes))),
        BaseType::Float32 => Value::Float32(f32::from_be_bytes(array(&bytes))),
        BaseType::Int64 => Value::Int64(i64::from_be_bytes(array(&bytes))),
        BaseType::Uint64 => Value::Uint64(u64::from_be_bytes(array(&bytes))),
        BaseType::Float64 => Value::Float64(f64::from_be_bytes(array(&bytes))),
    };
    Ok(value)
}

/// Parse a register word written as decimal or `0x` hex.
pub fn parse_word(text: &str) -> Result<u16> {
    let trimmed = text.trim();
    let parsed = match trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => trimmed.parse::<u16>(),
    };
    parsed.map_err(|_| CodecError::InvalidLiteral(text.to_string()))
}

// Length is checked against the base type before any call.
fn array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[..N]);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(value: Value) {
        for order in WordOrder::ALL {
            let words = encode_value(&value, order);
            assert_eq!(words.len(), value.base_type().register_count());
            let decoded = decode(&words, value.base_type(), order).unwrap();
            assert_eq!(decoded, value, "{} {order}", value.base_type());
        }
    }

    #[test]
    fn int32_vectors() {
        let v = 123_456_789;
        assert_eq!(encode(v, BaseType::Int32, WordOrder::Be).unwrap(), vec![0x075B, 0xCD15]);
        assert_eq!(encode(v, BaseType::Int32, WordOrder::Le).unwrap(), vec![0xCD15, 0x075B]);
        assert_eq!(encode(v, BaseType::Int32, WordOrder::Ws1).unwrap(), vec![0xCD15, 0x075B]);
        assert_eq!(encode(v, BaseType::Int32, WordOrder::Ws2).unwrap(), vec![0x075B, 0xCD15]);
    }

    #[test]
    fn uint64_vectors() {
        assert_eq!(
            encode(1u64, BaseType::Uint64, WordOrder::Be).unwrap(),
            vec![0x0000, 0x0000, 0x0000, 0x0001]
        );
        assert_eq!(
            encode(1u64, BaseType::Uint64, WordOrder::Ws2).unwrap(),
            vec![0x0000, 0x0001, 0x0000, 0x0000]
        );
        assert_eq!(
            encode(1u64, BaseType::Uint64, WordOrder::Le).unwrap(),
            vec![0x0001, 0x0000, 0x0000, 0x0000]
        );
        assert_eq!(
            encode(0x0102_0304_0506_0708u64, BaseType::Uint64, WordOrder::Ws1).unwrap(),
            vec![0x0304, 0x0102, 0x0708, 0x0506]
        );
    }

    #[test]
    fn float_vectors() {
        assert_eq!(encode(1.0f32, BaseType::Float32, WordOrder::Be).unwrap(), vec![0x3F80, 0x0000]);
        assert_eq!(encode(1.0f32, BaseType::Float32, WordOrder::Le).unwrap(), vec![0x0000, 0x3F80]);
        assert_eq!(
            encode(1.0f64, BaseType::Float64, WordOrder::Be).unwrap(),
            vec![0x3FF0, 0x0000, 0x0000, 0x0000]
        );
    }

    #[test]
    fn sixteen_bit_types_ignore_word_order() {
        for (raw, base_type) in [
            (RawValue::Bool(true), BaseType::Bool),
            (RawValue::Int(-2), BaseType::Int16),
            (RawValue::Int(0xBEEF), BaseType::Uint16),
        ] {
            let be = encode(raw, base_type, WordOrder::Be).unwrap();
            for order in WordOrder::ALL {
                assert_eq!(encode(raw, base_type, order).unwrap(), be, "{base_type} {order}");
            }
        }
        assert_eq!(encode(-2i16, BaseType::Int16, WordOrder::Le).unwrap(), vec![0xFFFE]);
    }

    #[test]
    fn roundtrip_extremes_for_every_type() {
        let values = [
            Value::Bool(false),
            Value::Bool(true),
            Value::Int16(i16::MIN),
            Value::Int16(i16::MAX),
            Value::Uint16(u16::MAX),
            Value::Int32(i32::MIN),
            Value::Int32(-1),
            Value::Uint32(u32::MAX),
            Value::Int64(i64::MIN),
            Value::Int64(0x0123_4567_89AB_CDEF),
            Value::Uint64(u64::MAX),
            Value::Float32(-0.0),
            Value::Float32(f32::MIN_POSITIVE),
            Value::Float32(f32::from_bits(0x7FC0_0001)),
            Value::Float64(std::f64::consts::PI),
            Value::Float64(f64::from_bits(0x7FF8_0000_0000_0ABC)),
            Value::Float64(f64::NEG_INFINITY),
        ];
        for value in values {
            roundtrip(value);
        }
    }

    #[test]
    fn roundtrip_swept_values() {
        let mut seed: u64 = 0x9E37_79B9_7F4A_7C15;
        for _ in 0..256 {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            roundtrip(Value::Uint64(seed));
            roundtrip(Value::Int64(seed as i64));
            roundtrip(Value::Float64(f64::from_bits(seed)));
            roundtrip(Value::Uint32(seed as u32));
            roundtrip(Value::Float32(f32::from_bits((seed >> 32) as u32)));
        }
    }

    #[test]
    fn out_of_range_is_rejected_not_truncated() {
        let err = encode(70_000, BaseType::Uint16, WordOrder::Be).unwrap_err();
        assert!(matches!(
            err,
            CodecError::InvalidRange {
                base_type: BaseType::Uint16,
                ..
            }
        ));
        assert!(encode(-1, BaseType::Uint64, WordOrder::Be).is_err());
        assert!(encode(f64::NAN, BaseType::Float64, WordOrder::Be).is_err());
    }

    #[test]
    fn decode_length_mismatch() {
        let err = decode(&[0x0000, 0x0001], BaseType::Uint64, WordOrder::Be).unwrap_err();
        assert_eq!(
            err,
            CodecError::LengthMismatch {
                base_type: BaseType::Uint64,
                expected: 4,
                actual: 2,
            }
        );
        assert!(decode(&[], BaseType::Bool, WordOrder::Be).is_err());
    }

    #[test]
    fn bool_decode_treats_nonzero_as_true() {
        assert_eq!(decode(&[0], BaseType::Bool, WordOrder::Be).unwrap(), Value::Bool(false));
        assert_eq!(decode(&[0x8000], BaseType::Bool, WordOrder::Le).unwrap(), Value::Bool(true));
    }

    #[test]
    fn decode_undoes_word_order() {
        let value = decode(&[0xCD15, 0x075B], BaseType::Int32, WordOrder::Le).unwrap();
        assert_eq!(value, Value::Int32(123_456_789));
        let value = decode(&[0x0000, 0x0001, 0x0000, 0x0000], BaseType::Uint64, WordOrder::Ws2).unwrap();
        assert_eq!(value, Value::Uint64(1));
    }

    #[test]
    fn parses_register_words() {
        assert_eq!(parse_word("0xCD15").unwrap(), 0xCD15);
        assert_eq!(parse_word("1883").unwrap(), 1883);
        assert!(parse_word("65536").is_err());
        assert!(parse_word("0xZZ").is_err());
    }
}
