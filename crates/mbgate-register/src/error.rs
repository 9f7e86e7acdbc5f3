use crate::types::BaseType;

/// Errors that can occur while encoding or decoding register values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CodecError {
    /// The value does not fit the requested base type.
    #[error("value {value} out of range for {base_type}")]
    InvalidRange { value: String, base_type: BaseType },

    /// The type tag names no known base type.
    #[error("unsupported type tag '{0}'")]
    UnsupportedType(String),

    /// The word order tag names no known word order.
    #[error("unsupported word order '{0}'")]
    InvalidWordOrder(String),

    /// Decode was handed the wrong number of registers.
    #[error("{base_type} needs {expected} register(s), got {actual}")]
    LengthMismatch {
        base_type: BaseType,
        expected: usize,
        actual: usize,
    },

    /// Text could not be read as a value or register word.
    #[error("invalid literal '{0}'")]
    InvalidLiteral(String),

    /// A multi-register value would run past the last register address.
    #[error("{count} register(s) at address {address} overflow the address space")]
    AddressOverflow { address: u16, count: usize },
}

pub type Result<T> = std::result::Result<T, CodecError>;
