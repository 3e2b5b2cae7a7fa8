//! Error types for ledger interaction.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Numeric codes for ledger dispatch failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum DispatchErrorCode {
    /// Transaction signature does not verify against the signer.
    BadSignature = 1,
    /// Account nonce is stale or from the future.
    BadNonce = 2,
    /// Referenced schema is not registered.
    UnknownSchema = 3,
    /// Signer or creator lacks the required authority.
    Unauthorized = 4,
    /// A schema with this id already exists.
    DuplicateSchema = 5,
    /// The delegate was already added.
    DuplicateDelegate = 6,
    /// An anchor with this id or CID already exists.
    DuplicateAnchor = 7,
    /// The creator's signature over the content hash does not verify.
    BadContentSignature = 8,
    /// The linked anchor does not exist.
    UnknownLink = 9,
    /// The link is missing, unexpected, or points at the wrong role.
    InvalidLink = 10,
    /// A required store id or price is absent.
    MissingField = 11,
    /// Rating outside the accepted range.
    InvalidRating = 12,
    /// Store id differs from the linked listing's store.
    StoreMismatch = 13,
}

impl DispatchErrorCode {
    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn name(self) -> &'static str {
        match self {
            DispatchErrorCode::BadSignature => "BadSignature",
            DispatchErrorCode::BadNonce => "BadNonce",
            DispatchErrorCode::UnknownSchema => "UnknownSchema",
            DispatchErrorCode::Unauthorized => "Unauthorized",
            DispatchErrorCode::DuplicateSchema => "DuplicateSchema",
            DispatchErrorCode::DuplicateDelegate => "DuplicateDelegate",
            DispatchErrorCode::DuplicateAnchor => "DuplicateAnchor",
            DispatchErrorCode::BadContentSignature => "BadContentSignature",
            DispatchErrorCode::UnknownLink => "UnknownLink",
            DispatchErrorCode::InvalidLink => "InvalidLink",
            DispatchErrorCode::MissingField => "MissingField",
            DispatchErrorCode::InvalidRating => "InvalidRating",
            DispatchErrorCode::StoreMismatch => "StoreMismatch",
        }
    }
}

impl fmt::Display for DispatchErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}

/// A rejection reported by the ledger for one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct DispatchError {
    pub code: DispatchErrorCode,
    pub message: String,
}

impl DispatchError {
    pub fn new(code: DispatchErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Errors at the ledger collaborator boundary.
#[derive(Debug, Clone, Error)]
pub enum LedgerError {
    /// The ledger rejected the transaction.
    #[error("rejected: {0}")]
    Rejected(#[from] DispatchError),

    /// The endpoint could not be reached or dropped mid-wait.
    #[error("connection error: {0}")]
    Connection(String),

    /// The connection was torn down.
    #[error("ledger disconnected")]
    Disconnected,

    /// The endpoint string is not understood.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// A per-item rejection: the workflow records it and moves on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{name} ({code}): {message}")]
pub struct SubmissionError {
    pub code: u16,
    pub name: String,
    pub message: String,
}

impl From<DispatchError> for SubmissionError {
    fn from(e: DispatchError) -> Self {
        Self {
            code: e.code.code(),
            name: e.code.name().to_owned(),
            message: e.message,
        }
    }
}

/// A connection-level failure: no further submissions can succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    #[error("ledger unreachable: {0}")]
    Unreachable(String),

    #[error("ledger connection closed")]
    Closed,

    #[error("no acknowledgement within {0:?}")]
    Timeout(Duration),
}

/// Outcome classification of a failed submission.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    #[error("submission rejected: {0}")]
    Rejected(#[from] SubmissionError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

impl SubmitError {
    /// Whether the workflow must stop.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SubmitError::Connection(_))
    }
}

impl From<LedgerError> for SubmitError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::Rejected(dispatch) => SubmitError::Rejected(dispatch.into()),
            LedgerError::Connection(msg) | LedgerError::InvalidEndpoint(msg) => {
                SubmitError::Connection(ConnectionError::Unreachable(msg))
            }
            LedgerError::Disconnected => SubmitError::Connection(ConnectionError::Closed),
        }
    }
}
