//! Canonical CBOR encoding for deterministic serialization.
//!
//! This module implements RFC 8949 Core Deterministic Encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats (amounts are integers in minor units)
//!
//! The canonical encoding is critical: it ensures that structurally identical
//! content produces identical bytes (and thus identical CIDs) regardless of the
//! order in which fields were inserted.

use crate::error::CoreError;
use crate::value::{Content, Value};

/// Domain prefix for a holder's signature over a content hash.
pub const CONTENT_SIGN_DOMAIN: &[u8] = b"ondc/content-sig/v1";

/// Domain prefix for the on-chain identifier of a stream.
pub const ANCHOR_ID_DOMAIN: &[u8] = b"ondc/anchor-id/v1";

/// Domain prefix for schema identifiers.
pub const SCHEMA_ID_DOMAIN: &[u8] = b"ondc/schema-id/v1";

/// Domain prefix for store identifiers.
pub const STORE_ID_DOMAIN: &[u8] = b"ondc/store-id/v1";

/// Encode a value to canonical CBOR bytes.
pub fn canonical_bytes(value: &Value) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_value_to(&mut buf, value);
    buf
}

/// Encode a content payload (a map) to canonical CBOR bytes.
pub fn canonical_content(content: &Content) -> Vec<u8> {
    let mut buf = Vec::new();
    encode_map(&mut buf, content);
    buf
}

/// Construct the message a holder signs: domain || content hash bytes.
pub fn content_sign_message(content_hash: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(CONTENT_SIGN_DOMAIN.len() + content_hash.len());
    buf.extend_from_slice(CONTENT_SIGN_DOMAIN);
    buf.extend_from_slice(content_hash);
    buf
}

/// Recursively encode a value.
fn encode_value_to(buf: &mut Vec<u8>, value: &Value) {
    match value {
        Value::Null => buf.push(0xf6),
        Value::Bool(b) => buf.push(if *b { 0xf5 } else { 0xf4 }),
        Value::Integer(n) => encode_integer(buf, *n),
        Value::Text(s) => encode_text(buf, s),
        Value::Bytes(b) => encode_bytes(buf, b),
        Value::List(items) => {
            encode_uint(buf, 4, items.len() as u64);
            for item in items {
                encode_value_to(buf, item);
            }
        }
        Value::Map(entries) => encode_map(buf, entries),
    }
}

/// Encode a signed integer (major types 0 and 1).
fn encode_integer(buf: &mut Vec<u8>, n: i64) {
    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Encode a map canonically (major type 5).
///
/// Keys are sorted by their encoded byte comparison, which for text keys
/// means shorter keys first, then bytewise.
fn encode_map<'a, I>(buf: &mut Vec<u8>, entries: I)
where
    I: IntoIterator<Item = (&'a String, &'a Value)>,
{
    let mut pairs: Vec<(Vec<u8>, &Value)> = entries
        .into_iter()
        .map(|(k, v)| {
            let mut key_buf = Vec::with_capacity(k.len() + 1);
            encode_text(&mut key_buf, k);
            (key_buf, v)
        })
        .collect();

    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_value_to(buf, value);
    }
}

/// Decode canonical bytes back into a value.
///
/// Input that decodes but is not in canonical form (unsorted keys, long
/// integer heads, indefinite lengths, trailing bytes) is rejected.
pub fn decode_value(bytes: &[u8]) -> Result<Value, CoreError> {
    let raw: ciborium::value::Value =
        ciborium::from_reader(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))?;
    let value = from_cbor(raw)?;

    if canonical_bytes(&value) != bytes {
        return Err(CoreError::DecodingError("non-canonical encoding".into()));
    }
    Ok(value)
}

fn from_cbor(raw: ciborium::value::Value) -> Result<Value, CoreError> {
    use ciborium::value::Value as Cbor;

    Ok(match raw {
        Cbor::Null => Value::Null,
        Cbor::Bool(b) => Value::Bool(b),
        Cbor::Integer(i) => {
            let wide: i128 = i.into();
            Value::Integer(
                i64::try_from(wide)
                    .map_err(|_| CoreError::DecodingError(format!("integer {wide} out of range")))?,
            )
        }
        Cbor::Text(s) => Value::Text(s),
        Cbor::Bytes(b) => Value::Bytes(b),
        Cbor::Array(items) => Value::List(
            items
                .into_iter()
                .map(from_cbor)
                .collect::<Result<_, _>>()?,
        ),
        Cbor::Map(entries) => {
            let mut map = Content::new();
            for (k, v) in entries {
                let key = match k {
                    Cbor::Text(key) => key,
                    _ => return Err(CoreError::DecodingError("map keys must be text".into())),
                };
                if map.insert(key, from_cbor(v)?).is_some() {
                    return Err(CoreError::DecodingError("duplicate map key".into()));
                }
            }
            Value::Map(map)
        }
        Cbor::Float(_) => return Err(CoreError::DecodingError("floats not supported".into())),
        Cbor::Tag(tag, _) => {
            return Err(CoreError::DecodingError(format!("unsupported tag {tag}")))
        }
        _ => return Err(CoreError::DecodingError("unsupported CBOR value".into())),
    })
}
