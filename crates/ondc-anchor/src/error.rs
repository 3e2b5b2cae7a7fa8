//! Error types for the workflow orchestrator.

use ondc_anchor_core::ValidationError;
use ondc_anchor_ledger::{ConnectionError, LedgerError, SubmissionError};
use thiserror::Error;

/// Errors that end a workflow run.
///
/// Per-item rejections are not here: they are recorded in the stage report
/// and the run continues.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Configuration could not be loaded or is inconsistent.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed seed, schema or content.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The ledger is unreachable or dropped mid-wait.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// The schema every later stage depends on was rejected.
    #[error("schema registration rejected: {0}")]
    SchemaRegistration(SubmissionError),

    /// Shutdown was requested. `attempted` counts anchor submissions only;
    /// it is zero while the schema is still being set up.
    #[error("interrupted after {attempted} anchor submission(s)")]
    Interrupted { attempted: usize },
}

impl WorkflowError {
    /// Process exit code for this failure.
    ///
    /// An interrupt after anchoring began leaves valid partial state on the
    /// ledger and exits cleanly; an interrupt during setup does not.
    pub fn exit_code(&self) -> i32 {
        match self {
            WorkflowError::Config(_) | WorkflowError::Validation(_) => 2,
            WorkflowError::Connection(_) | WorkflowError::SchemaRegistration(_) => 1,
            WorkflowError::Interrupted { attempted: 0 } => 130,
            WorkflowError::Interrupted { .. } => 0,
        }
    }
}

impl From<LedgerError> for WorkflowError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::InvalidEndpoint(endpoint) => {
                WorkflowError::Config(format!("invalid ledger endpoint `{endpoint}`"))
            }
            LedgerError::Connection(msg) => ConnectionError::Unreachable(msg).into(),
            LedgerError::Disconnected => ConnectionError::Closed.into(),
            // Item rejections never reach here; anything else rejected is setup.
            LedgerError::Rejected(e) => WorkflowError::SchemaRegistration(e.into()),
        }
    }
}

/// Result type for workflow operations.
pub type Result<T> = std::result::Result<T, WorkflowError>;
