//! Ledger doubles for failure scenarios.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use ondc_anchor_core::{AccountId, AnchorId};
use ondc_anchor_ledger::{
    Ack, AckLevel, AnchorRole, Call, DispatchError, DispatchErrorCode, Ledger, LedgerError,
    MemoryLedger, Result, SignedExtrinsic,
};

/// Wraps a [`MemoryLedger`] and injects failures.
///
/// Product submissions are counted from zero in arrival order; the ones
/// chosen with [`FaultyLedger::reject_product`] are rejected before they
/// reach the inner ledger. Schema setup calls can be rejected the same way.
pub struct FaultyLedger {
    inner: Arc<MemoryLedger>,
    rejected_products: HashSet<usize>,
    reject_schema: bool,
    reject_delegation: bool,
    drop_after: Option<usize>,
    products_seen: AtomicUsize,
    forwarded: AtomicUsize,
}

impl FaultyLedger {
    pub fn new(inner: Arc<MemoryLedger>) -> Self {
        Self {
            inner,
            rejected_products: HashSet::new(),
            reject_schema: false,
            reject_delegation: false,
            drop_after: None,
            products_seen: AtomicUsize::new(0),
            forwarded: AtomicUsize::new(0),
        }
    }

    /// Reject the product submission at `index` (zero-based).
    pub fn reject_product(mut self, index: usize) -> Self {
        self.rejected_products.insert(index);
        self
    }

    /// Reject every schema registration.
    pub fn reject_schema(mut self) -> Self {
        self.reject_schema = true;
        self
    }

    /// Reject every schema delegation.
    pub fn reject_delegation(mut self) -> Self {
        self.reject_delegation = true;
        self
    }

    /// Drop the connection once `count` submissions have been forwarded.
    pub fn disconnect_after(mut self, count: usize) -> Self {
        self.drop_after = Some(count);
        self
    }

    pub fn inner(&self) -> &Arc<MemoryLedger> {
        &self.inner
    }

    /// Submissions that reached the inner ledger.
    pub fn forwarded(&self) -> usize {
        self.forwarded.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Ledger for FaultyLedger {
    async fn account_nonce(&self, account: &AccountId) -> Result<u32> {
        self.inner.account_nonce(account).await
    }

    async fn submit(&self, tx: SignedExtrinsic, level: AckLevel) -> Result<Ack> {
        match &tx.call {
            Call::CreateSchema { .. } if self.reject_schema => {
                return Err(DispatchError::new(
                    DispatchErrorCode::DuplicateSchema,
                    "injected rejection of schema",
                )
                .into());
            }
            Call::AddSchemaDelegate { .. } if self.reject_delegation => {
                return Err(DispatchError::new(
                    DispatchErrorCode::Unauthorized,
                    "injected rejection of delegation",
                )
                .into());
            }
            Call::Anchor(draft) if draft.role == AnchorRole::Product => {
                let index = self.products_seen.fetch_add(1, Ordering::SeqCst);
                if self.rejected_products.contains(&index) {
                    return Err(DispatchError::new(
                        DispatchErrorCode::Unauthorized,
                        format!("injected rejection of product {index}"),
                    )
                    .into());
                }
            }
            _ => {}
        }

        if let Some(limit) = self.drop_after {
            if self.forwarded.load(Ordering::SeqCst) >= limit {
                self.inner.disconnect().await;
                return Err(LedgerError::Connection("connection reset by peer".into()));
            }
        }

        self.forwarded.fetch_add(1, Ordering::SeqCst);
        self.inner.submit(tx, level).await
    }

    async fn is_anchored(&self, id: &AnchorId) -> Result<bool> {
        self.inner.is_anchored(id).await
    }

    async fn disconnect(&self) {
        self.inner.disconnect().await;
    }

    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }
}

/// A ledger that accepts connections but never acknowledges a submission.
pub struct StalledLedger {
    submitted: AtomicUsize,
    connected: AtomicBool,
}

impl StalledLedger {
    pub fn new() -> Self {
        Self {
            submitted: AtomicUsize::new(0),
            connected: AtomicBool::new(true),
        }
    }

    /// Submissions received so far.
    pub fn submitted(&self) -> usize {
        self.submitted.load(Ordering::SeqCst)
    }
}

impl Default for StalledLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Ledger for StalledLedger {
    async fn account_nonce(&self, _account: &AccountId) -> Result<u32> {
        if !self.is_connected() {
            return Err(LedgerError::Disconnected);
        }
        Ok(0)
    }

    async fn submit(&self, _tx: SignedExtrinsic, _level: AckLevel) -> Result<Ack> {
        if !self.is_connected() {
            return Err(LedgerError::Disconnected);
        }
        self.submitted.fetch_add(1, Ordering::SeqCst);
        std::future::pending().await
    }

    async fn is_anchored(&self, _id: &AnchorId) -> Result<bool> {
        Ok(false)
    }

    async fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::TestFixture;
    use ondc_anchor_ledger::{
        AnchorDraft, AnchorSubmitter, MemoryLedgerConfig, SubmitError, SubmitterConfig,
    };
    use std::time::Duration;

    #[tokio::test]
    async fn test_rejects_chosen_product_only() {
        let fixture = TestFixture::new();
        let inner = Arc::new(MemoryLedger::new("faulty", MemoryLedgerConfig::default()));
        let ledger = Arc::new(FaultyLedger::new(inner.clone()).reject_product(1));
        let submitter = AnchorSubmitter::new(ledger, SubmitterConfig::default());
        submitter
            .register_schema(&fixture.schema, &fixture.owner, AckLevel::Accepted)
            .await
            .unwrap();

        let mut outcomes = Vec::new();
        for name in ["a", "b", "c"] {
            let draft = AnchorDraft::from_stream(AnchorRole::Product, &fixture.product(name));
            outcomes.push(
                submitter
                    .submit(draft, &fixture.owner, AckLevel::Included)
                    .await
                    .is_ok(),
            );
        }
        assert_eq!(outcomes, vec![true, false, true]);
        assert_eq!(inner.anchor_count(AnchorRole::Product).await, 2);
    }

    #[tokio::test]
    async fn test_disconnect_after() {
        let fixture = TestFixture::new();
        let inner = Arc::new(MemoryLedger::new("faulty", MemoryLedgerConfig::default()));
        let ledger = Arc::new(FaultyLedger::new(inner).disconnect_after(1));
        let submitter = AnchorSubmitter::new(ledger.clone(), SubmitterConfig::default());
        submitter
            .register_schema(&fixture.schema, &fixture.owner, AckLevel::Accepted)
            .await
            .unwrap();

        let draft = AnchorDraft::from_stream(AnchorRole::Product, &fixture.product("a"));
        let err = submitter
            .submit(draft, &fixture.owner, AckLevel::Included)
            .await
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(!ledger.is_connected());
    }

    #[tokio::test]
    async fn test_stalled_ledger_times_out() {
        let fixture = TestFixture::new();
        let ledger = Arc::new(StalledLedger::new());
        let submitter = AnchorSubmitter::new(
            ledger.clone(),
            SubmitterConfig {
                ack_timeout: Duration::from_millis(10),
            },
        );
        let err = submitter
            .register_schema(&fixture.schema, &fixture.owner, AckLevel::Accepted)
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::Connection(_)));
        assert_eq!(ledger.submitted(), 1);
    }

    #[tokio::test]
    async fn test_rejects_schema_setup_calls() {
        let fixture = TestFixture::new();
        let inner = Arc::new(MemoryLedger::new("faulty", MemoryLedgerConfig::default()));
        let ledger = Arc::new(FaultyLedger::new(inner.clone()).reject_delegation());
        let submitter = AnchorSubmitter::new(ledger, SubmitterConfig::default());
        submitter
            .register_schema(&fixture.schema, &fixture.owner, AckLevel::Accepted)
            .await
            .unwrap();
        let err = submitter
            .add_delegate(
                &fixture.schema,
                fixture.seller.account_id(),
                &fixture.owner,
                AckLevel::Accepted,
            )
            .await
            .unwrap_err();
        assert!(!err.is_fatal());
        assert!(inner.schema(&fixture.schema.id()).await.is_some());

        let ledger = Arc::new(FaultyLedger::new(inner.clone()).reject_schema());
        let submitter = AnchorSubmitter::new(ledger.clone(), SubmitterConfig::default());
        let err = submitter
            .register_schema(&fixture.schema, &fixture.owner, AckLevel::Accepted)
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitError::Rejected(_)));
        assert_eq!(ledger.forwarded(), 0);
    }
}
