//! # ONDC Anchor Core
//!
//! Pure primitives for anchoring commerce records: identities, canonical
//! encoding, content identifiers and signed content streams.
//!
//! This crate contains no I/O, no storage, no networking. It is pure computation
//! over cryptographic data structures.
//!
//! ## Key Types
//!
//! - [`Identity`] - A signing keypair (Ed25519 or Sr25519) plus its SS58 address
//! - [`Schema`] - A content-addressed schema owned by a controller
//! - [`ContentRecord`] - A payload checked against a schema, with its holder
//! - [`ContentStream`] - A signed, linkable content record
//! - [`ContentId`] - CIDv1 over BLAKE2b-256 of canonical bytes
//!
//! ## Canonicalization
//!
//! All records are encoded using deterministic CBOR. See [`canonical`] module.

pub mod address;
pub mod canonical;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod record;
pub mod schema;
pub mod stream;
pub mod types;
pub mod validation;
pub mod value;

pub use address::{address_of, ContentId, STREAM_CODEC};
pub use canonical::{canonical_bytes, canonical_content, decode_value, CONTENT_SIGN_DOMAIN};
pub use crypto::{AccountId, Digest256, KeyKind, Keypair, Signature, CORD_SS58_PREFIX};
pub use error::{CoreError, ValidationError};
pub use identity::{EncryptionKeypair, Identity, RoleKeys, SecretUri};
pub use record::ContentRecord;
pub use schema::{FieldType, PropertyDefinition, Schema, SchemaDefinition};
pub use stream::{ContentStream, ContentStreamBuilder, NONCE_LEN};
pub use types::{AnchorId, SchemaId, StoreId};
pub use validation::{validate_stream, validate_stream_for_schema};
pub use value::{Content, Value};

/// Maximum length of a schema name in bytes.
pub const MAX_SCHEMA_NAME_LEN: usize = 256;

/// Maximum number of properties a schema may declare.
pub const MAX_SCHEMA_FIELDS: usize = 64;

/// Maximum canonical size of a content payload (64 KiB).
pub const MAX_CONTENT_LEN: usize = 64 * 1024;
