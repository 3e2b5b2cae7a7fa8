//! # ONDC Anchor
//!
//! Anchors a commerce run on a ledger as a chain of linked, signed,
//! content-addressed records.
//!
//! ## Overview
//!
//! - **Schema**: a product schema registered under its controller and
//!   delegated to a seller.
//! - **Products**: content streams over the schema, anchored by the owner.
//! - **Listings**: one per product, linking to it, with a store key and price.
//! - **Orders**: sampled from the listings, linking to the listing.
//! - **Ratings**: sampled from the orders, linking to the order, with a score.
//!
//! Every record is canonically encoded and addressed by a CID; its `link`
//! names the on-chain id of an earlier anchor, so the run forms a DAG.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ondc_anchor::{run, WorkflowConfig};
//! use tokio::sync::watch;
//!
//! async fn example() {
//!     let (_shutdown, rx) = watch::channel(false);
//!     let report = run(WorkflowConfig::default(), rx).await.unwrap();
//!     for line in report.summary_lines() {
//!         println!("{line}");
//!     }
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `ondc_anchor::core` - identities, canonical encoding, CIDs, streams
//! - `ondc_anchor::ledger` - ledger collaborator, in-process node, submitter

pub mod config;
pub mod error;
pub mod workflow;

// Re-export component crates
pub use ondc_anchor_core as core;
pub use ondc_anchor_ledger as ledger;

pub use config::{Args, ParticipantUris, WorkflowConfig, PRODUCT_SCHEMA_JSON};
pub use error::{Result, WorkflowError};
pub use workflow::{
    execute, run, Anchored, FailureReason, ItemFailure, Participants, RunReport, StageReport,
    Workflow,
};
