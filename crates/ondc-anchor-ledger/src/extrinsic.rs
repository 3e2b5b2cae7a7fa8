//! Ledger transactions ("extrinsics").
//!
//! An anchor transaction carries two identities: the content creator, whose
//! signature over the content hash travels inside the call, and the
//! submitting signer, who signs and pays for the transaction itself.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use ondc_anchor_core::{
    canonical_bytes, AccountId, AnchorId, ContentId, ContentStream, Digest256, Identity, Schema,
    SchemaId, Signature, StoreId, Value,
};

/// Domain prefix for transaction signatures.
pub const EXTRINSIC_SIGN_DOMAIN: &[u8] = b"ondc/extrinsic-sig/v1";

/// The role of an anchored record in the commerce chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnchorRole {
    Product,
    Listing,
    Order,
    Rating,
}

impl AnchorRole {
    /// The role a record of this role must link to, if any.
    pub fn link_target(self) -> Option<AnchorRole> {
        match self {
            AnchorRole::Product => None,
            AnchorRole::Listing => Some(AnchorRole::Product),
            AnchorRole::Order => Some(AnchorRole::Listing),
            AnchorRole::Rating => Some(AnchorRole::Order),
        }
    }

    /// Whether this role carries a store id and price.
    pub fn is_commercial(self) -> bool {
        !matches!(self, AnchorRole::Product)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AnchorRole::Product => "product",
            AnchorRole::Listing => "listing",
            AnchorRole::Order => "order",
            AnchorRole::Rating => "rating",
        }
    }

    /// Name of the ledger call anchoring this role.
    pub fn call_name(self) -> &'static str {
        match self {
            AnchorRole::Product => "product.create",
            AnchorRole::Listing => "product.list",
            AnchorRole::Order => "product.order",
            AnchorRole::Rating => "product.order_rating",
        }
    }
}

impl fmt::Display for AnchorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The anchor payload of a transaction, built from a signed stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorDraft {
    pub role: AnchorRole,
    pub id: AnchorId,
    pub cid: ContentId,
    pub content_hash: ContentId,
    pub creator: AccountId,
    pub creator_signature: Signature,
    pub link: Option<AnchorId>,
    pub schema_id: SchemaId,
    pub store_id: Option<StoreId>,
    /// Amount in minor currency units.
    pub price: Option<u32>,
    pub rating: Option<u8>,
}

impl AnchorDraft {
    /// Draft an anchor for a stream. Store, price and rating start empty.
    pub fn from_stream(role: AnchorRole, stream: &ContentStream) -> Self {
        Self {
            role,
            id: stream.anchor_id(),
            cid: stream.cid(),
            content_hash: stream.content_hash(),
            creator: stream.holder(),
            creator_signature: *stream.signature(),
            link: stream.link(),
            schema_id: stream.schema_id(),
            store_id: None,
            price: None,
            rating: None,
        }
    }

    pub fn with_store(mut self, store_id: StoreId, price: u32) -> Self {
        self.store_id = Some(store_id);
        self.price = Some(price);
        self
    }

    pub fn with_rating(mut self, rating: u8) -> Self {
        self.rating = Some(rating);
        self
    }

    fn to_value(&self) -> Value {
        let mut signature = BTreeMap::new();
        signature.insert(
            "kind".to_owned(),
            Value::Integer(self.creator_signature.kind.to_u8().into()),
        );
        signature.insert(
            "bytes".to_owned(),
            Value::Bytes(self.creator_signature.bytes.to_vec()),
        );

        let mut map = BTreeMap::new();
        map.insert("role".to_owned(), Value::from(self.role.as_str()));
        map.insert("id".to_owned(), bytes32(&self.id.0));
        map.insert("cid".to_owned(), Value::Bytes(self.cid.to_bytes()));
        map.insert(
            "content_hash".to_owned(),
            Value::Bytes(self.content_hash.to_bytes()),
        );
        map.insert("creator".to_owned(), bytes32(&self.creator.0));
        map.insert("creator_signature".to_owned(), Value::Map(signature));
        map.insert(
            "link".to_owned(),
            self.link.map_or(Value::Null, |l| bytes32(&l.0)),
        );
        map.insert("schema".to_owned(), bytes32(&self.schema_id.0));
        map.insert(
            "store".to_owned(),
            self.store_id.map_or(Value::Null, |s| bytes32(&s.0)),
        );
        map.insert(
            "price".to_owned(),
            self.price.map_or(Value::Null, Value::from),
        );
        map.insert(
            "rating".to_owned(),
            self.rating.map_or(Value::Null, |r| Value::Integer(r.into())),
        );
        Value::Map(map)
    }
}

fn bytes32(bytes: &[u8; 32]) -> Value {
    Value::Bytes(bytes.to_vec())
}

/// A ledger call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    /// Register a schema under its controller.
    CreateSchema {
        schema_id: SchemaId,
        cid: ContentId,
        controller: AccountId,
    },
    /// Grant authoring rights on a schema to another account.
    AddSchemaDelegate {
        schema_id: SchemaId,
        delegate: AccountId,
    },
    /// Anchor a content stream.
    Anchor(AnchorDraft),
}

impl Call {
    /// Build the registration call for a schema.
    pub fn create_schema(schema: &Schema) -> Self {
        Call::CreateSchema {
            schema_id: schema.id(),
            cid: schema.cid(),
            controller: schema.controller(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Call::CreateSchema { .. } => "schema.create",
            Call::AddSchemaDelegate { .. } => "schema.add_delegate",
            Call::Anchor(draft) => draft.role.call_name(),
        }
    }

    fn to_value(&self) -> Value {
        let mut map = BTreeMap::new();
        map.insert("call".to_owned(), Value::from(self.name()));
        match self {
            Call::CreateSchema {
                schema_id,
                cid,
                controller,
            } => {
                map.insert("schema".to_owned(), bytes32(&schema_id.0));
                map.insert("cid".to_owned(), Value::Bytes(cid.to_bytes()));
                map.insert("controller".to_owned(), bytes32(&controller.0));
            }
            Call::AddSchemaDelegate {
                schema_id,
                delegate,
            } => {
                map.insert("schema".to_owned(), bytes32(&schema_id.0));
                map.insert("delegate".to_owned(), bytes32(&delegate.0));
            }
            Call::Anchor(draft) => {
                map.insert("anchor".to_owned(), draft.to_value());
            }
        }
        Value::Map(map)
    }

    /// Canonical bytes of the call.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        canonical_bytes(&self.to_value())
    }
}

/// A signed transaction ready for submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedExtrinsic {
    pub call: Call,
    pub signer: AccountId,
    pub nonce: u32,
    pub signature: Signature,
}

impl SignedExtrinsic {
    /// Sign a call with the submitting identity at the given account nonce.
    pub fn sign(call: Call, signer: &Identity, nonce: u32) -> Self {
        let account = signer.account_id();
        let signature = signer.sign(&signing_payload(&call, &account, nonce));
        Self {
            call,
            signer: account,
            nonce,
            signature,
        }
    }

    /// Verify the transaction signature.
    pub fn verify(&self) -> bool {
        self.signer
            .verify(
                &signing_payload(&self.call, &self.signer, self.nonce),
                &self.signature,
            )
            .is_ok()
    }

    /// Transaction hash over the signed payload and signature.
    pub fn hash(&self) -> Digest256 {
        let mut buf = signing_payload(&self.call, &self.signer, self.nonce);
        buf.extend_from_slice(&self.signature.bytes);
        Digest256::hash(&buf)
    }
}

fn signing_payload(call: &Call, signer: &AccountId, nonce: u32) -> Vec<u8> {
    let mut map = BTreeMap::new();
    map.insert("call".to_owned(), call.to_value());
    map.insert("signer".to_owned(), bytes32(&signer.0));
    map.insert("nonce".to_owned(), Value::from(nonce));

    let body = canonical_bytes(&Value::Map(map));
    let mut buf = Vec::with_capacity(EXTRINSIC_SIGN_DOMAIN.len() + body.len());
    buf.extend_from_slice(EXTRINSIC_SIGN_DOMAIN);
    buf.extend_from_slice(&body);
    buf
}
