//! Content records: a payload checked against a schema, with its holder.

use std::collections::BTreeMap;
use std::fmt;

use crate::address::{address_of, ContentId};
use crate::canonical::{canonical_bytes, canonical_content};
use crate::crypto::AccountId;
use crate::error::ValidationError;
use crate::schema::Schema;
use crate::types::SchemaId;
use crate::value::{Content, Value};
use crate::MAX_CONTENT_LEN;

/// An immutable payload bound to a schema and a holder.
#[derive(Clone, PartialEq, Eq)]
pub struct ContentRecord {
    schema_id: SchemaId,
    content: Content,
    holder: AccountId,
}

impl ContentRecord {
    /// Build a record, checking the payload against the schema and the size limit.
    pub fn new(schema: &Schema, content: Content, holder: AccountId) -> Result<Self, ValidationError> {
        schema.check_content(&content)?;

        let size = canonical_content(&content).len();
        if size > MAX_CONTENT_LEN {
            return Err(ValidationError::ContentTooLarge(size));
        }

        Ok(Self {
            schema_id: schema.id(),
            content,
            holder,
        })
    }

    pub fn schema_id(&self) -> SchemaId {
        self.schema_id
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn holder(&self) -> AccountId {
        self.holder
    }

    pub(crate) fn to_value(&self) -> Value {
        let mut map = BTreeMap::new();
        map.insert("schema".to_owned(), Value::Bytes(self.schema_id.0.to_vec()));
        map.insert("content".to_owned(), Value::Map(self.content.clone()));
        map.insert("holder".to_owned(), Value::Bytes(self.holder.0.to_vec()));
        Value::Map(map)
    }

    /// Rebuild a record from its canonical value, without a schema at hand.
    pub(crate) fn from_value(value: Value) -> Result<Self, ValidationError> {
        let Value::Map(mut map) = value else {
            return Err(ValidationError::StructuralError("record must be a map".into()));
        };
        let schema_id = take_bytes32(&mut map, "schema")?;
        let holder = take_bytes32(&mut map, "holder")?;
        let content = match map.remove("content") {
            Some(Value::Map(content)) => content,
            _ => return Err(ValidationError::StructuralError("missing content".into())),
        };
        if !map.is_empty() {
            return Err(ValidationError::StructuralError("unexpected record field".into()));
        }
        Ok(Self {
            schema_id: SchemaId(schema_id),
            content,
            holder: AccountId(holder),
        })
    }

    /// Canonical bytes of the record.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        canonical_bytes(&self.to_value())
    }

    /// Content hash: the content identifier of the canonical record bytes.
    pub fn content_hash(&self) -> ContentId {
        address_of(&self.canonical_bytes())
    }
}

pub(crate) fn take_bytes32(
    map: &mut BTreeMap<String, Value>,
    key: &str,
) -> Result<[u8; 32], ValidationError> {
    match map.remove(key) {
        Some(Value::Bytes(b)) => b
            .try_into()
            .map_err(|_| ValidationError::StructuralError(format!("`{key}` must be 32 bytes"))),
        _ => Err(ValidationError::StructuralError(format!("missing `{key}`"))),
    }
}

impl fmt::Debug for ContentRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentRecord")
            .field("schema_id", &self.schema_id)
            .field("holder", &self.holder)
            .field("fields", &self.content.len())
            .finish()
    }
}
