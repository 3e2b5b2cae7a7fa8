//! Content streams: signed, linkable content records.
//!
//! A stream carries its record, the content hash of the record's canonical
//! bytes, the holder's signature over that hash and an optional link to the
//! on-chain id of an earlier anchored stream.
//!
//! The link is a caller precondition: the builder has no ledger access and
//! cannot tell whether the linked id was ever anchored.

use std::collections::BTreeMap;
use std::fmt;

use crate::address::{address_of, ContentId};
use crate::canonical::{canonical_bytes, content_sign_message, decode_value, ANCHOR_ID_DOMAIN};
use crate::crypto::{AccountId, Digest256, KeyKind, Signature};
use crate::error::ValidationError;
use crate::identity::Identity;
use crate::record::ContentRecord;
use crate::schema::Schema;
use crate::types::{AnchorId, SchemaId};
use crate::validation::validate_stream;
use crate::value::{Content, Value};

/// Length of the optional per-stream nonce.
pub const NONCE_LEN: usize = 16;

/// A signed content record.
#[derive(Clone, PartialEq, Eq)]
pub struct ContentStream {
    record: ContentRecord,
    content_hash: ContentId,
    signature: Signature,
    link: Option<AnchorId>,
    nonce: Option<[u8; NONCE_LEN]>,
}

impl ContentStream {
    /// Build and sign a stream from a schema, a payload and the holder identity.
    pub fn build(
        schema: &Schema,
        content: Content,
        holder: &Identity,
        link: Option<AnchorId>,
    ) -> Result<Self, ValidationError> {
        let record = ContentRecord::new(schema, content, holder.account_id())?;
        let mut builder = ContentStreamBuilder::new(record);
        if let Some(link) = link {
            builder = builder.link(link);
        }
        builder.sign(holder)
    }

    pub fn record(&self) -> &ContentRecord {
        &self.record
    }

    pub fn content(&self) -> &Content {
        self.record.content()
    }

    pub fn holder(&self) -> AccountId {
        self.record.holder()
    }

    pub fn schema_id(&self) -> SchemaId {
        self.record.schema_id()
    }

    pub fn content_hash(&self) -> ContentId {
        self.content_hash
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn link(&self) -> Option<AnchorId> {
        self.link
    }

    pub fn nonce(&self) -> Option<&[u8; NONCE_LEN]> {
        self.nonce.as_ref()
    }

    fn to_value(&self) -> Value {
        let mut signature = BTreeMap::new();
        signature.insert(
            "kind".to_owned(),
            Value::Integer(self.signature.kind.to_u8().into()),
        );
        signature.insert("bytes".to_owned(), Value::Bytes(self.signature.bytes.to_vec()));

        let mut map = BTreeMap::new();
        map.insert("record".to_owned(), self.record.to_value());
        map.insert(
            "content_hash".to_owned(),
            Value::Bytes(self.content_hash.to_bytes()),
        );
        map.insert("signature".to_owned(), Value::Map(signature));
        map.insert(
            "link".to_owned(),
            self.link.map_or(Value::Null, |l| Value::Bytes(l.0.to_vec())),
        );
        map.insert(
            "nonce".to_owned(),
            self.nonce.map_or(Value::Null, |n| Value::Bytes(n.to_vec())),
        );
        Value::Map(map)
    }

    /// Encode to canonical CBOR bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        canonical_bytes(&self.to_value())
    }

    /// Decode from canonical bytes, verifying hash and signature.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ValidationError> {
        let Value::Map(mut map) = decode_value(bytes)? else {
            return Err(ValidationError::StructuralError("stream must be a map".into()));
        };

        let record = ContentRecord::from_value(
            map.remove("record")
                .ok_or_else(|| ValidationError::StructuralError("missing record".into()))?,
        )?;

        let content_hash = match map.remove("content_hash") {
            Some(Value::Bytes(b)) => ContentId::from_bytes(&b)?,
            _ => return Err(ValidationError::StructuralError("missing content_hash".into())),
        };

        let signature = match map.remove("signature") {
            Some(Value::Map(mut sig)) => {
                let kind = sig
                    .remove("kind")
                    .and_then(|v| v.as_integer())
                    .and_then(|n| u8::try_from(n).ok())
                    .and_then(KeyKind::from_u8)
                    .ok_or_else(|| ValidationError::StructuralError("bad signature kind".into()))?;
                let bytes: [u8; 64] = match sig.remove("bytes") {
                    Some(Value::Bytes(b)) => b.try_into().map_err(|_| {
                        ValidationError::StructuralError("signature must be 64 bytes".into())
                    })?,
                    _ => return Err(ValidationError::StructuralError("missing signature".into())),
                };
                Signature::from_bytes(kind, bytes)
            }
            _ => return Err(ValidationError::StructuralError("missing signature".into())),
        };

        let link = match map.remove("link") {
            Some(Value::Null) => None,
            Some(Value::Bytes(b)) => Some(AnchorId::try_from(b.as_slice()).map_err(|_| {
                ValidationError::StructuralError("link must be 32 bytes".into())
            })?),
            _ => return Err(ValidationError::StructuralError("missing link".into())),
        };

        let nonce: Option<[u8; NONCE_LEN]> = match map.remove("nonce") {
            Some(Value::Null) => None,
            Some(Value::Bytes(b)) => Some(b.try_into().map_err(|_| {
                ValidationError::StructuralError("nonce must be 16 bytes".into())
            })?),
            _ => return Err(ValidationError::StructuralError("missing nonce".into())),
        };

        if !map.is_empty() {
            return Err(ValidationError::StructuralError("unexpected stream field".into()));
        }

        let stream = Self {
            record,
            content_hash,
            signature,
            link,
            nonce,
        };
        validate_stream(&stream)?;
        Ok(stream)
    }

    /// Content identifier of the canonical stream bytes.
    pub fn cid(&self) -> ContentId {
        address_of(&self.to_bytes())
    }

    /// On-chain identifier: `blake2b256("ondc/anchor-id/v1" || stream_bytes)`.
    pub fn anchor_id(&self) -> AnchorId {
        AnchorId::from(Digest256::hash_with_domain(ANCHOR_ID_DOMAIN, &self.to_bytes()))
    }

    /// Verify the holder's signature over the content hash.
    pub fn verify_signature(&self) -> Result<(), ValidationError> {
        let message = content_sign_message(&self.content_hash.to_bytes());
        self.record
            .holder()
            .verify(&message, &self.signature)
            .map_err(|_| ValidationError::SignatureFailed)
    }
}

impl fmt::Debug for ContentStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentStream")
            .field("anchor_id", &self.anchor_id())
            .field("holder", &self.record.holder())
            .field("content_hash", &self.content_hash)
            .field("link", &self.link)
            .finish()
    }
}

/// Builder for signed content streams.
#[derive(Debug, Clone)]
pub struct ContentStreamBuilder {
    record: ContentRecord,
    link: Option<AnchorId>,
    nonce: Option<[u8; NONCE_LEN]>,
}

impl ContentStreamBuilder {
    pub fn new(record: ContentRecord) -> Self {
        Self {
            record,
            link: None,
            nonce: None,
        }
    }

    /// Link to the on-chain id of a previously anchored stream.
    pub fn link(mut self, link: AnchorId) -> Self {
        self.link = Some(link);
        self
    }

    /// Salt the stream so otherwise identical records get distinct ids.
    pub fn nonce(mut self, nonce: [u8; NONCE_LEN]) -> Self {
        self.nonce = Some(nonce);
        self
    }

    /// Hash and sign the record. The signer must be the record's holder.
    pub fn sign(self, holder: &Identity) -> Result<ContentStream, ValidationError> {
        if holder.account_id() != self.record.holder() {
            return Err(ValidationError::StructuralError(
                "signer is not the record holder".into(),
            ));
        }

        let content_hash = self.record.content_hash();
        let signature = holder.sign(&content_sign_message(&content_hash.to_bytes()));

        Ok(ContentStream {
            record: self.record,
            content_hash,
            signature,
            link: self.link,
            nonce: self.nonce,
        })
    }
}
