//! # ONDC Anchor Ledger
//!
//! Ledger-side plumbing for anchoring content streams.
//!
//! ## Overview
//!
//! - [`Ledger`] is the collaborator boundary: nonces, submission with a
//!   chosen [`AckLevel`], and explicit teardown.
//! - [`SignedExtrinsic`] models a transaction with two identities: the
//!   content creator inside the [`AnchorDraft`] and the submitting signer.
//! - [`MemoryLedger`] is an in-process node that validates and includes
//!   transactions the way the chain would.
//! - [`AnchorSubmitter`] signs, submits, waits with a timeout and classifies
//!   failures into per-item rejections and fatal connection errors.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ondc_anchor_ledger::{connect, AnchorSubmitter, Ledger, MemoryLedgerConfig, SubmitterConfig};
//!
//! async fn example() {
//!     let ledger = connect("memory://local", MemoryLedgerConfig::default())
//!         .await
//!         .unwrap();
//!     let submitter = AnchorSubmitter::new(ledger.clone(), SubmitterConfig::default());
//!     // submitter.submit(draft, &controller, AckLevel::Included).await?;
//!     ledger.disconnect().await;
//! }
//! ```

pub mod error;
pub mod extrinsic;
pub mod ledger;
pub mod memory;
pub mod submitter;

pub use error::{
    ConnectionError, DispatchError, DispatchErrorCode, LedgerError, Result, SubmissionError,
    SubmitError,
};
pub use extrinsic::{AnchorDraft, AnchorRole, Call, SignedExtrinsic, EXTRINSIC_SIGN_DOMAIN};
pub use ledger::{connect, Ack, AckLevel, Endpoint, Ledger, TxStatus};
pub use memory::{AnchorEntry, MemoryLedger, MemoryLedgerConfig, SchemaEntry, SubmissionRecord};
pub use submitter::{AnchorSubmitter, AnchoredRecord, SubmitterConfig};
