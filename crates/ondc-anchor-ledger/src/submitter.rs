//! Anchor submitter: sign, submit, wait, classify.
//!
//! One submission is in flight at a time. A rejected submission is returned
//! to the caller and never retried; connection failures and acknowledgement
//! timeouts are reported as connection errors.

use std::sync::Arc;
use std::time::Duration;

use ondc_anchor_core::{AccountId, AnchorId, ContentId, Identity, Schema, StoreId};

use crate::error::{ConnectionError, SubmitError};
use crate::extrinsic::{AnchorDraft, AnchorRole, Call, SignedExtrinsic};
use crate::ledger::{Ack, AckLevel, Ledger};

/// Configuration for submission behavior.
#[derive(Debug, Clone)]
pub struct SubmitterConfig {
    /// Upper bound on waiting for the requested acknowledgement.
    pub ack_timeout: Duration,
}

impl Default for SubmitterConfig {
    fn default() -> Self {
        Self {
            // Finality can take several block intervals.
            ack_timeout: Duration::from_secs(120),
        }
    }
}

/// A record the ledger acknowledged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchoredRecord {
    pub role: AnchorRole,
    pub id: AnchorId,
    pub cid: ContentId,
    pub creator: AccountId,
    pub link: Option<AnchorId>,
    pub store_id: Option<StoreId>,
    pub price: Option<u32>,
    pub rating: Option<u8>,
    pub submitted_by: AccountId,
    pub ack: Ack,
}

/// Submits transactions to a ledger connection.
#[derive(Clone)]
pub struct AnchorSubmitter {
    ledger: Arc<dyn Ledger>,
    config: SubmitterConfig,
}

impl AnchorSubmitter {
    pub fn new(ledger: Arc<dyn Ledger>, config: SubmitterConfig) -> Self {
        Self { ledger, config }
    }

    /// The connection this submitter uses.
    pub fn ledger(&self) -> &Arc<dyn Ledger> {
        &self.ledger
    }

    /// Anchor a drafted record, signing the transaction with `controller`.
    pub async fn submit(
        &self,
        draft: AnchorDraft,
        controller: &Identity,
        level: AckLevel,
    ) -> Result<AnchoredRecord, SubmitError> {
        let ack = self
            .submit_call(Call::Anchor(draft.clone()), controller, level)
            .await?;

        Ok(AnchoredRecord {
            role: draft.role,
            id: draft.id,
            cid: draft.cid,
            creator: draft.creator,
            link: draft.link,
            store_id: draft.store_id,
            price: draft.price,
            rating: draft.rating,
            submitted_by: controller.account_id(),
            ack,
        })
    }

    /// Register a schema, signed by its controller.
    pub async fn register_schema(
        &self,
        schema: &Schema,
        controller: &Identity,
        level: AckLevel,
    ) -> Result<Ack, SubmitError> {
        self.submit_call(Call::create_schema(schema), controller, level)
            .await
    }

    /// Delegate authoring rights on a schema.
    pub async fn add_delegate(
        &self,
        schema: &Schema,
        delegate: AccountId,
        controller: &Identity,
        level: AckLevel,
    ) -> Result<Ack, SubmitError> {
        let call = Call::AddSchemaDelegate {
            schema_id: schema.id(),
            delegate,
        };
        self.submit_call(call, controller, level).await
    }

    /// Sign and submit any call, waiting for `level` within the configured timeout.
    pub async fn submit_call(
        &self,
        call: Call,
        signer: &Identity,
        level: AckLevel,
    ) -> Result<Ack, SubmitError> {
        let timeout = self.config.ack_timeout;
        let call_name = call.name();

        let outcome = tokio::time::timeout(timeout, async {
            let nonce = self.ledger.account_nonce(&signer.account_id()).await?;
            let tx = SignedExtrinsic::sign(call, signer, nonce);
            self.ledger.submit(tx, level).await
        })
        .await;

        match outcome {
            Ok(Ok(ack)) => {
                tracing::debug!(
                    call = call_name,
                    tx = %ack.tx_hash.to_hex(),
                    level = %level,
                    "Submission acknowledged"
                );
                Ok(ack)
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => {
                tracing::warn!(call = call_name, ?timeout, "Acknowledgement timed out");
                Err(SubmitError::Connection(ConnectionError::Timeout(timeout)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryLedger, MemoryLedgerConfig};
    use ondc_anchor_core::{Content, ContentStream, KeyKind, SchemaDefinition, Value};

    fn setup() -> (Arc<MemoryLedger>, AnchorSubmitter, Identity, Schema) {
        let ledger = Arc::new(MemoryLedger::new("submitter", MemoryLedgerConfig::default()));
        let submitter = AnchorSubmitter::new(ledger.clone(), SubmitterConfig::default());
        let owner = Identity::derive("//Bob", KeyKind::Sr25519).unwrap();
        let def = SchemaDefinition::from_json(
            r#"{"name":"P","properties":{"name":{"type":"string"}}}"#,
        )
        .unwrap();
        let schema = Schema::new(def, owner.account_id()).unwrap();
        (ledger, submitter, owner, schema)
    }

    fn product(schema: &Schema, owner: &Identity, name: &str) -> AnchorDraft {
        let mut content = Content::new();
        content.insert("name".into(), Value::from(name));
        let stream = ContentStream::build(schema, content, owner, None).unwrap();
        AnchorDraft::from_stream(AnchorRole::Product, &stream)
    }

    #[tokio::test]
    async fn test_submit_product() {
        let (ledger, submitter, owner, schema) = setup();
        submitter
            .register_schema(&schema, &owner, AckLevel::Accepted)
            .await
            .unwrap();

        let draft = product(&schema, &owner, "tv");
        let record = submitter
            .submit(draft.clone(), &owner, AckLevel::Included)
            .await
            .unwrap();

        assert_eq!(record.id, draft.id);
        assert_eq!(record.link, None);
        assert!(record.ack.satisfies(AckLevel::Included));
        assert!(ledger.anchor(&draft.id).await.is_some());
    }

    #[tokio::test]
    async fn test_rejection_is_not_fatal() {
        let (_, submitter, owner, schema) = setup();
        // Schema never registered.
        let err = submitter
            .submit(product(&schema, &owner, "tv"), &owner, AckLevel::Included)
            .await
            .unwrap_err();
        assert!(!err.is_fatal());
        match err {
            SubmitError::Rejected(e) => assert_eq!(e.name, "UnknownSchema"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_disconnected_is_fatal() {
        let (ledger, submitter, owner, schema) = setup();
        ledger.disconnect().await;
        let err = submitter
            .register_schema(&schema, &owner, AckLevel::Accepted)
            .await
            .unwrap_err();
        assert_eq!(err, SubmitError::Connection(ConnectionError::Closed));
    }

    #[tokio::test]
    async fn test_timeout_is_connection_error() {
        let ledger = Arc::new(MemoryLedger::new(
            "slow",
            MemoryLedgerConfig {
                block_time: Duration::from_millis(200),
                ..Default::default()
            },
        ));
        let submitter = AnchorSubmitter::new(
            ledger,
            SubmitterConfig {
                ack_timeout: Duration::from_millis(20),
            },
        );
        let owner = Identity::derive("//Bob", KeyKind::Sr25519).unwrap();
        let def = SchemaDefinition::from_json(
            r#"{"name":"P","properties":{"name":{"type":"string"}}}"#,
        )
        .unwrap();
        let schema = Schema::new(def, owner.account_id()).unwrap();

        let err = submitter
            .register_schema(&schema, &owner, AckLevel::Included)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SubmitError::Connection(ConnectionError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn test_nonce_advances_across_submissions() {
        let (ledger, submitter, owner, schema) = setup();
        submitter
            .register_schema(&schema, &owner, AckLevel::Accepted)
            .await
            .unwrap();
        for name in ["a", "b", "c"] {
            submitter
                .submit(product(&schema, &owner, name), &owner, AckLevel::Included)
                .await
                .unwrap();
        }
        assert_eq!(ledger.account_nonce(&owner.account_id()).await.unwrap(), 4);
    }
}
