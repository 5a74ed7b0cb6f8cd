use crate::tag::Tag;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Asn1DerError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Asn1DerError {
    /// input ended in the middle of an element
    #[error("truncated data")]
    TruncatedData,

    /// element tag does not match the structure being decoded
    #[error("unexpected tag: expected {expected}, found {actual}")]
    UnexpectedTag { expected: Tag, actual: Tag },

    /// element length points past the enclosing element
    #[error("length of {length} bytes exceeds the {available} available bytes")]
    LengthOverflow { length: usize, available: usize },

    /// BER indefinite length form, input must be normalized first
    #[error("indefinite length encoding")]
    IndefiniteLength,

    #[error("invalid length encoding")]
    InvalidLength,

    #[error("invalid object identifier")]
    InvalidObjectIdentifier,

    #[error("invalid integer encoding")]
    InvalidInteger,

    #[error("integer doesn't fit in the target type")]
    IntegerOverflow,

    #[error("unsupported tag: {0}")]
    UnsupportedTag(Tag),

    #[error("invalid data: {context}")]
    InvalidData { context: &'static str },

    /// caller supplied output slice is too small
    #[error("output buffer too small: {required} bytes required, {available} available")]
    BufferTooSmall { required: usize, available: usize },
}
