//! Ledger collaborator abstraction.
//!
//! A ledger connection is process-wide: opened once at startup with
//! [`connect`], passed explicitly to whoever submits, and torn down with
//! [`Ledger::disconnect`] on completion or interrupt.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use ondc_anchor_core::{AccountId, AnchorId, Digest256};

use crate::error::{LedgerError, Result};
use crate::extrinsic::SignedExtrinsic;
use crate::memory::{MemoryLedger, MemoryLedgerConfig};

/// How strong a confirmation to wait for before a submission counts as done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AckLevel {
    /// Validated and queued by the ledger.
    Accepted,
    /// Included in a produced block.
    Included,
}

impl fmt::Display for AckLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AckLevel::Accepted => f.write_str("accepted"),
            AckLevel::Included => f.write_str("included"),
        }
    }
}

/// Transaction status at acknowledgement time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxStatus {
    Ready,
    InBlock {
        block_number: u64,
        block_hash: Digest256,
    },
}

/// Acknowledgement of a submitted transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub tx_hash: Digest256,
    pub status: TxStatus,
}

impl Ack {
    /// Whether the acknowledgement satisfies the requested level.
    pub fn satisfies(&self, level: AckLevel) -> bool {
        match level {
            AckLevel::Accepted => true,
            AckLevel::Included => matches!(self.status, TxStatus::InBlock { .. }),
        }
    }
}

/// Ledger trait for submitting signed transactions.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Next expected nonce for an account.
    async fn account_nonce(&self, account: &AccountId) -> Result<u32>;

    /// Submit a signed transaction and wait until `level` is reached.
    async fn submit(&self, tx: SignedExtrinsic, level: AckLevel) -> Result<Ack>;

    /// Whether an anchor with this on-chain id exists.
    async fn is_anchored(&self, id: &AnchorId) -> Result<bool>;

    /// Release the connection. Later calls fail with a connection error.
    async fn disconnect(&self);

    /// Whether the connection is still open.
    fn is_connected(&self) -> bool;
}

/// A parsed ledger endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// In-process ledger node, `memory://<name>`.
    Memory(String),
    /// Remote node over websockets, `ws://` or `wss://`.
    Remote(String),
}

impl FromStr for Endpoint {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self> {
        if let Some(name) = s.strip_prefix("memory://") {
            if name.is_empty() {
                return Err(LedgerError::InvalidEndpoint(s.to_owned()));
            }
            return Ok(Endpoint::Memory(name.to_owned()));
        }
        if s.starts_with("ws://") || s.starts_with("wss://") {
            return Ok(Endpoint::Remote(s.to_owned()));
        }
        Err(LedgerError::InvalidEndpoint(s.to_owned()))
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Memory(name) => write!(f, "memory://{name}"),
            Endpoint::Remote(url) => f.write_str(url),
        }
    }
}

/// Open a ledger connection.
///
/// Only in-process endpoints are served; remote endpoints fail with a
/// connection error since no remote client is bundled.
pub async fn connect(endpoint: &str, config: MemoryLedgerConfig) -> Result<Arc<dyn Ledger>> {
    match endpoint.parse::<Endpoint>()? {
        Endpoint::Memory(name) => {
            tracing::info!(endpoint = %endpoint, "Connected to in-process ledger");
            Ok(Arc::new(MemoryLedger::new(name, config)))
        }
        Endpoint::Remote(url) => Err(LedgerError::Connection(format!(
            "cannot reach {url}: no remote ledger client available"
        ))),
    }
}
