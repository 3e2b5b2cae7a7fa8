//! In-process ledger node.
//!
//! Behaves like the remote chain at the interface boundary: it checks
//! transaction signatures and nonces, dispatches schema and anchor calls
//! against its state, and produces blocks. Every submission is validated
//! and applied on arrival; `Included` additionally waits for a block.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use ondc_anchor_core::canonical::content_sign_message;
use ondc_anchor_core::{AccountId, AnchorId, ContentId, Digest256, SchemaId, StoreId};

use crate::error::{DispatchError, DispatchErrorCode, LedgerError, Result};
use crate::extrinsic::{AnchorDraft, AnchorRole, Call, SignedExtrinsic};
use crate::ledger::{Ack, AckLevel, Ledger, TxStatus};

/// Accepted rating range.
pub const RATING_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

/// Configuration for the in-process ledger.
#[derive(Debug, Clone)]
pub struct MemoryLedgerConfig {
    /// Simulated delay before a block is sealed.
    pub block_time: Duration,
    /// SS58 prefix used when rendering accounts in messages.
    pub ss58_prefix: u16,
}

impl Default for MemoryLedgerConfig {
    fn default() -> Self {
        Self {
            block_time: Duration::ZERO,
            ss58_prefix: ondc_anchor_core::CORD_SS58_PREFIX,
        }
    }
}

/// A registered schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaEntry {
    pub cid: ContentId,
    pub controller: AccountId,
    pub delegates: HashSet<AccountId>,
}

impl SchemaEntry {
    fn may_author(&self, account: &AccountId) -> bool {
        self.controller == *account || self.delegates.contains(account)
    }
}

/// An anchored record as the ledger stores it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorEntry {
    pub role: AnchorRole,
    pub cid: ContentId,
    pub creator: AccountId,
    pub link: Option<AnchorId>,
    pub store_id: Option<StoreId>,
    pub price: Option<u32>,
    pub rating: Option<u8>,
    pub block_number: u64,
}

/// A sealed block.
#[derive(Debug, Clone)]
pub struct Block {
    pub number: u64,
    pub hash: Digest256,
    pub parent: Digest256,
    pub extrinsics: Vec<Digest256>,
}

/// One entry of the submission log.
#[derive(Debug, Clone)]
pub struct SubmissionRecord {
    pub tx_hash: Digest256,
    pub signer: AccountId,
    pub call: Call,
    pub outcome: std::result::Result<(), DispatchError>,
}

#[derive(Default)]
struct ChainState {
    nonces: HashMap<AccountId, u32>,
    schemas: HashMap<SchemaId, SchemaEntry>,
    anchors: HashMap<AnchorId, AnchorEntry>,
    cids: HashSet<ContentId>,
    pool: Vec<Digest256>,
    blocks: Vec<Block>,
    log: Vec<SubmissionRecord>,
}

impl ChainState {
    fn next_block_number(&self) -> u64 {
        self.blocks.len() as u64 + 1
    }

    fn seal_block(&mut self) -> (u64, Digest256) {
        let number = self.next_block_number();
        let parent = self
            .blocks
            .last()
            .map_or(Digest256([0; 32]), |b| b.hash);
        let extrinsics = std::mem::take(&mut self.pool);

        let mut preimage = Vec::with_capacity(8 + 32 + 32 * extrinsics.len());
        preimage.extend_from_slice(&number.to_be_bytes());
        preimage.extend_from_slice(parent.as_bytes());
        for tx in &extrinsics {
            preimage.extend_from_slice(tx.as_bytes());
        }
        let hash = Digest256::hash(&preimage);

        tracing::debug!(block = number, txs = extrinsics.len(), "Sealed block");
        self.blocks.push(Block {
            number,
            hash,
            parent,
            extrinsics,
        });
        (number, hash)
    }

    fn dispatch(&mut self, signer: &AccountId, call: &Call) -> std::result::Result<(), DispatchError> {
        match call {
            Call::CreateSchema {
                schema_id,
                cid,
                controller,
            } => {
                if signer != controller {
                    return Err(DispatchError::new(
                        DispatchErrorCode::Unauthorized,
                        "schema must be registered by its controller",
                    ));
                }
                if self.schemas.contains_key(schema_id) {
                    return Err(DispatchError::new(
                        DispatchErrorCode::DuplicateSchema,
                        format!("schema {schema_id} already exists"),
                    ));
                }
                self.schemas.insert(
                    *schema_id,
                    SchemaEntry {
                        cid: *cid,
                        controller: *controller,
                        delegates: HashSet::new(),
                    },
                );
                Ok(())
            }
            Call::AddSchemaDelegate {
                schema_id,
                delegate,
            } => {
                let entry = self.schemas.get_mut(schema_id).ok_or_else(|| {
                    DispatchError::new(
                        DispatchErrorCode::UnknownSchema,
                        format!("schema {schema_id} not found"),
                    )
                })?;
                if entry.controller != *signer {
                    return Err(DispatchError::new(
                        DispatchErrorCode::Unauthorized,
                        "only the schema controller may add delegates",
                    ));
                }
                if !entry.delegates.insert(*delegate) {
                    return Err(DispatchError::new(
                        DispatchErrorCode::DuplicateDelegate,
                        format!("{delegate} is already a delegate"),
                    ));
                }
                Ok(())
            }
            Call::Anchor(draft) => {
                self.check_anchor(draft)?;
                let block_number = self.next_block_number();
                self.cids.insert(draft.cid);
                self.anchors.insert(
                    draft.id,
                    AnchorEntry {
                        role: draft.role,
                        cid: draft.cid,
                        creator: draft.creator,
                        link: draft.link,
                        store_id: draft.store_id,
                        price: draft.price,
                        rating: draft.rating,
                        block_number,
                    },
                );
                Ok(())
            }
        }
    }

    fn check_anchor(&self, draft: &AnchorDraft) -> std::result::Result<(), DispatchError> {
        let message = content_sign_message(&draft.content_hash.to_bytes());
        if draft.creator.verify(&message, &draft.creator_signature).is_err() {
            return Err(DispatchError::new(
                DispatchErrorCode::BadContentSignature,
                "creator signature does not match the content hash",
            ));
        }

        let schema = self.schemas.get(&draft.schema_id).ok_or_else(|| {
            DispatchError::new(
                DispatchErrorCode::UnknownSchema,
                format!("schema {} not found", draft.schema_id),
            )
        })?;

        // Catalogue entries need authoring rights on the schema.
        if matches!(draft.role, AnchorRole::Product | AnchorRole::Listing)
            && !schema.may_author(&draft.creator)
        {
            return Err(DispatchError::new(
                DispatchErrorCode::Unauthorized,
                format!("{} is neither controller nor delegate", draft.creator),
            ));
        }

        if self.anchors.contains_key(&draft.id) || self.cids.contains(&draft.cid) {
            return Err(DispatchError::new(
                DispatchErrorCode::DuplicateAnchor,
                format!("anchor {} already exists", draft.cid),
            ));
        }

        let linked = match (draft.role.link_target(), draft.link) {
            (None, None) => None,
            (None, Some(_)) => {
                return Err(DispatchError::new(
                    DispatchErrorCode::InvalidLink,
                    format!("a {} must not link to another record", draft.role),
                ))
            }
            (Some(target), None) => {
                return Err(DispatchError::new(
                    DispatchErrorCode::InvalidLink,
                    format!("a {} must link to a {}", draft.role, target),
                ))
            }
            (Some(target), Some(link)) => {
                let entry = self.anchors.get(&link).ok_or_else(|| {
                    DispatchError::new(
                        DispatchErrorCode::UnknownLink,
                        format!("linked anchor {link} not found"),
                    )
                })?;
                if entry.role != target {
                    return Err(DispatchError::new(
                        DispatchErrorCode::InvalidLink,
                        format!("a {} must link to a {}, not a {}", draft.role, target, entry.role),
                    ));
                }
                Some(entry)
            }
        };

        if draft.role.is_commercial() {
            let store_id = draft.store_id.ok_or_else(|| {
                DispatchError::new(DispatchErrorCode::MissingField, "store id is required")
            })?;
            if draft.price.is_none() {
                return Err(DispatchError::new(
                    DispatchErrorCode::MissingField,
                    "price is required",
                ));
            }
            // Orders and ratings stay within the store of what they reference.
            if let Some(parent_store) = linked.and_then(|e| e.store_id) {
                if parent_store != store_id {
                    return Err(DispatchError::new(
                        DispatchErrorCode::StoreMismatch,
                        format!("store {store_id} differs from linked store {parent_store}"),
                    ));
                }
            }
        }

        match (draft.role, draft.rating) {
            (AnchorRole::Rating, Some(r)) if RATING_RANGE.contains(&r) => Ok(()),
            (AnchorRole::Rating, r) => Err(DispatchError::new(
                DispatchErrorCode::InvalidRating,
                format!("rating {r:?} outside {RATING_RANGE:?}"),
            )),
            (_, Some(_)) => Err(DispatchError::new(
                DispatchErrorCode::InvalidRating,
                format!("a {} carries no rating", draft.role),
            )),
            (_, None) => Ok(()),
        }
    }
}

/// In-process ledger node.
pub struct MemoryLedger {
    name: String,
    config: MemoryLedgerConfig,
    state: Mutex<ChainState>,
    connected: AtomicBool,
}

impl MemoryLedger {
    /// Create a ledger with an empty genesis state.
    pub fn new(name: impl Into<String>, config: MemoryLedgerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            state: Mutex::new(ChainState::default()),
            connected: AtomicBool::new(true),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A registered schema.
    pub async fn schema(&self, id: &SchemaId) -> Option<SchemaEntry> {
        self.state.lock().await.schemas.get(id).cloned()
    }

    /// An anchored record.
    pub async fn anchor(&self, id: &AnchorId) -> Option<AnchorEntry> {
        self.state.lock().await.anchors.get(id).cloned()
    }

    /// Number of anchors of a role.
    pub async fn anchor_count(&self, role: AnchorRole) -> usize {
        self.state
            .lock()
            .await
            .anchors
            .values()
            .filter(|a| a.role == role)
            .count()
    }

    /// All submissions in arrival order, including rejected ones.
    pub async fn submissions(&self) -> Vec<SubmissionRecord> {
        self.state.lock().await.log.clone()
    }

    /// Height of the last sealed block.
    pub async fn block_height(&self) -> u64 {
        self.state.lock().await.blocks.len() as u64
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(LedgerError::Disconnected)
        }
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    async fn account_nonce(&self, account: &AccountId) -> Result<u32> {
        self.ensure_connected()?;
        Ok(self
            .state
            .lock()
            .await
            .nonces
            .get(account)
            .copied()
            .unwrap_or(0))
    }

    async fn submit(&self, tx: SignedExtrinsic, level: AckLevel) -> Result<Ack> {
        self.ensure_connected()?;

        if !tx.verify() {
            return Err(DispatchError::new(
                DispatchErrorCode::BadSignature,
                "transaction signature does not verify",
            )
            .into());
        }

        let tx_hash = tx.hash();
        {
            let mut state = self.state.lock().await;

            let expected = state.nonces.get(&tx.signer).copied().unwrap_or(0);
            if tx.nonce != expected {
                return Err(DispatchError::new(
                    DispatchErrorCode::BadNonce,
                    format!("nonce {} but expected {}", tx.nonce, expected),
                )
                .into());
            }

            // Past the pool checks the transaction is included and consumes
            // the nonce, even if dispatch fails.
            state.nonces.insert(tx.signer, expected + 1);
            state.pool.push(tx_hash);
            let outcome = state.dispatch(&tx.signer, &tx.call);
            state.log.push(SubmissionRecord {
                tx_hash,
                signer: tx.signer,
                call: tx.call.clone(),
                outcome: outcome.clone(),
            });
            if let Err(e) = outcome {
                tracing::debug!(
                    ledger = %self.name,
                    call = tx.call.name(),
                    signer = %tx.signer.to_ss58(self.config.ss58_prefix),
                    code = e.code.code(),
                    "Dispatch failed"
                );
                return Err(e.into());
            }
        }

        match level {
            AckLevel::Accepted => Ok(Ack {
                tx_hash,
                status: TxStatus::Ready,
            }),
            AckLevel::Included => {
                if !self.config.block_time.is_zero() {
                    tokio::time::sleep(self.config.block_time).await;
                }
                self.ensure_connected()?;
                let (block_number, block_hash) = self.state.lock().await.seal_block();
                Ok(Ack {
                    tx_hash,
                    status: TxStatus::InBlock {
                        block_number,
                        block_hash,
                    },
                })
            }
        }
    }

    async fn is_anchored(&self, id: &AnchorId) -> Result<bool> {
        self.ensure_connected()?;
        Ok(self.state.lock().await.anchors.contains_key(id))
    }

    async fn disconnect(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            tracing::info!(ledger = %self.name, "Ledger connection released");
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ondc_anchor_core::{Content, ContentStream, Identity, KeyKind, Schema, SchemaDefinition, Value};

    struct Chain {
        ledger: MemoryLedger,
        owner: Identity,
        author: Identity,
        schema: Schema,
    }

    impl Chain {
        async fn new() -> Self {
            let ledger = MemoryLedger::new("test", MemoryLedgerConfig::default());
            let owner = Identity::derive("//Bob", KeyKind::Sr25519).unwrap();
            let author = Identity::derive("//Alice", KeyKind::Sr25519).unwrap();
            let def = SchemaDefinition::from_json(
                r#"{"name":"P","properties":{"name":{"type":"string"}}}"#,
            )
            .unwrap();
            let schema = Schema::new(def, owner.account_id()).unwrap();
            let chain = Self {
                ledger,
                owner,
                author,
                schema,
            };
            chain
                .send(&chain.owner, Call::create_schema(&chain.schema), AckLevel::Accepted)
                .await
                .unwrap();
            chain
        }

        async fn send(&self, signer: &Identity, call: Call, level: AckLevel) -> Result<Ack> {
            let nonce = self.ledger.account_nonce(&signer.account_id()).await?;
            self.ledger
                .submit(SignedExtrinsic::sign(call, signer, nonce), level)
                .await
        }

        fn stream(&self, holder: &Identity, name: &str, link: Option<AnchorId>) -> ContentStream {
            let mut content = Content::new();
            content.insert("name".into(), Value::from(name));
            ContentStream::build(&self.schema, content, holder, link).unwrap()
        }
    }

    fn code_of(result: Result<Ack>) -> DispatchErrorCode {
        match result {
            Err(LedgerError::Rejected(e)) => e.code,
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_product_is_included() {
        let chain = Chain::new().await;
        let stream = chain.stream(&chain.owner, "tv", None);
        let draft = AnchorDraft::from_stream(AnchorRole::Product, &stream);

        let ack = chain
            .send(&chain.owner, Call::Anchor(draft), AckLevel::Included)
            .await
            .unwrap();
        assert!(ack.satisfies(AckLevel::Included));
        assert!(chain.ledger.is_anchored(&stream.anchor_id()).await.unwrap());
        assert_eq!(chain.ledger.block_height().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_anchor_rejected() {
        let chain = Chain::new().await;
        let stream = chain.stream(&chain.owner, "tv", None);
        let call = Call::Anchor(AnchorDraft::from_stream(AnchorRole::Product, &stream));

        chain.send(&chain.owner, call.clone(), AckLevel::Included).await.unwrap();
        let second = chain.send(&chain.owner, call, AckLevel::Included).await;
        assert_eq!(code_of(second), DispatchErrorCode::DuplicateAnchor);
    }

    #[tokio::test]
    async fn test_stale_nonce_rejected() {
        let chain = Chain::new().await;
        let call = Call::AddSchemaDelegate {
            schema_id: chain.schema.id(),
            delegate: chain.author.account_id(),
        };
        let tx = SignedExtrinsic::sign(call, &chain.owner, 0);
        assert_eq!(
            code_of(chain.ledger.submit(tx, AckLevel::Accepted).await),
            DispatchErrorCode::BadNonce
        );
    }

    #[tokio::test]
    async fn test_listing_requires_delegation() {
        let chain = Chain::new().await;
        let seller = Identity::derive("//SellerOne", KeyKind::Sr25519).unwrap();

        let product = chain.stream(&chain.owner, "tv", None);
        chain
            .send(
                &chain.owner,
                Call::Anchor(AnchorDraft::from_stream(AnchorRole::Product, &product)),
                AckLevel::Included,
            )
            .await
            .unwrap();

        let listing = chain.stream(&seller, "tv", Some(product.anchor_id()));
        let draft = AnchorDraft::from_stream(AnchorRole::Listing, &listing)
            .with_store(StoreId::from_bytes([1; 32]), 135000);

        let denied = chain
            .send(&chain.author, Call::Anchor(draft.clone()), AckLevel::Included)
            .await;
        assert_eq!(code_of(denied), DispatchErrorCode::Unauthorized);

        chain
            .send(
                &chain.owner,
                Call::AddSchemaDelegate {
                    schema_id: chain.schema.id(),
                    delegate: seller.account_id(),
                },
                AckLevel::Accepted,
            )
            .await
            .unwrap();

        chain
            .send(&chain.author, Call::Anchor(draft), AckLevel::Included)
            .await
            .unwrap();
        let entry = chain.ledger.anchor(&listing.anchor_id()).await.unwrap();
        assert_eq!(entry.link, Some(product.anchor_id()));
        assert_eq!(entry.creator, seller.account_id());
    }

    #[tokio::test]
    async fn test_link_must_exist_and_match_role() {
        let chain = Chain::new().await;
        let buyer = Identity::derive("//BuyerOne", KeyKind::Sr25519).unwrap();
        let product = chain.stream(&chain.owner, "tv", None);
        chain
            .send(
                &chain.owner,
                Call::Anchor(AnchorDraft::from_stream(AnchorRole::Product, &product)),
                AckLevel::Included,
            )
            .await
            .unwrap();

        let store = StoreId::from_bytes([1; 32]);

        let dangling = chain.stream(&buyer, "tv", Some(AnchorId::from_bytes([9; 32])));
        let result = chain
            .send(
                &chain.author,
                Call::Anchor(AnchorDraft::from_stream(AnchorRole::Order, &dangling).with_store(store, 1)),
                AckLevel::Included,
            )
            .await;
        assert_eq!(code_of(result), DispatchErrorCode::UnknownLink);

        // An order must reference a listing, not a product.
        let skipping = chain.stream(&buyer, "tv", Some(product.anchor_id()));
        let result = chain
            .send(
                &chain.author,
                Call::Anchor(AnchorDraft::from_stream(AnchorRole::Order, &skipping).with_store(store, 1)),
                AckLevel::Included,
            )
            .await;
        assert_eq!(code_of(result), DispatchErrorCode::InvalidLink);
    }

    #[tokio::test]
    async fn test_tampered_creator_signature() {
        let chain = Chain::new().await;
        let stream = chain.stream(&chain.owner, "tv", None);
        let mut draft = AnchorDraft::from_stream(AnchorRole::Product, &stream);
        draft.content_hash = chain.stream(&chain.owner, "radio", None).content_hash();

        let result = chain
            .send(&chain.owner, Call::Anchor(draft), AckLevel::Included)
            .await;
        assert_eq!(code_of(result), DispatchErrorCode::BadContentSignature);
    }

    #[tokio::test]
    async fn test_rejections_are_logged() {
        let chain = Chain::new().await;
        let stream = chain.stream(&chain.owner, "tv", None);
        let call = Call::Anchor(AnchorDraft::from_stream(AnchorRole::Product, &stream));
        chain.send(&chain.owner, call.clone(), AckLevel::Included).await.unwrap();
        let _ = chain.send(&chain.owner, call, AckLevel::Included).await;

        let log = chain.ledger.submissions().await;
        assert_eq!(log.len(), 3);
        assert!(log[0].outcome.is_ok());
        assert!(log[1].outcome.is_ok());
        assert!(log[2].outcome.is_err());
    }

    #[tokio::test]
    async fn test_disconnect_stops_submissions() {
        let chain = Chain::new().await;
        chain.ledger.disconnect().await;
        let stream = chain.stream(&chain.owner, "tv", None);
        let tx = SignedExtrinsic::sign(
            Call::Anchor(AnchorDraft::from_stream(AnchorRole::Product, &stream)),
            &chain.owner,
            1,
        );
        assert!(matches!(
            chain.ledger.submit(tx, AckLevel::Included).await,
            Err(LedgerError::Disconnected)
        ));
    }
}
