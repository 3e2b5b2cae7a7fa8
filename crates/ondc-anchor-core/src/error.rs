//! Error types for the ONDC Anchor Core.

use thiserror::Error;

use crate::schema::FieldType;

/// Core errors that can occur during key, encoding and addressing operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid secret key: {0}")]
    InvalidSecretKey(String),

    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid cid: {0}")]
    InvalidCid(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Validation errors for seeds, schemas, content and signed streams.
///
/// These are fatal to the single operation that raised them and are never
/// retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("malformed seed or uri: {0}")]
    MalformedSeed(String),

    #[error("malformed schema: {0}")]
    MalformedSchema(String),

    #[error("field `{0}` is not declared by the schema")]
    UnknownField(String),

    #[error("required field `{0}` is missing")]
    MissingField(String),

    #[error("field `{field}` expects {expected}, found {found}")]
    FieldTypeMismatch {
        field: String,
        expected: FieldType,
        found: &'static str,
    },

    #[error("unsupported value: {0}")]
    UnsupportedValue(String),

    #[error("content is {0} bytes, exceeding the 64 KiB limit")]
    ContentTooLarge(usize),

    #[error("content schema {actual} does not match {expected}")]
    SchemaMismatch { expected: String, actual: String },

    #[error("content hash mismatch: expected {expected}, got {actual}")]
    ContentHashMismatch { expected: String, actual: String },

    #[error("signature verification failed")]
    SignatureFailed,

    #[error("structural error: {0}")]
    StructuralError(String),
}

impl From<CoreError> for ValidationError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidSignature | CoreError::InvalidPublicKey => {
                ValidationError::SignatureFailed
            }
            CoreError::InvalidSecretKey(msg) => ValidationError::MalformedSeed(msg),
            CoreError::InvalidAddress(msg)
            | CoreError::InvalidCid(msg)
            | CoreError::DecodingError(msg) => ValidationError::StructuralError(msg),
        }
    }
}
