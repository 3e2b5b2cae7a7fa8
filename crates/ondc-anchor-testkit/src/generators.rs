//! Proptest generators for property-based testing.

use proptest::prelude::*;

use ondc_anchor_core::{AnchorId, Content, KeyKind, Value};

/// Generate a field name.
pub fn field_name() -> impl Strategy<Value = String> {
    "[a-z][a-zA-Z0-9]{0,15}".prop_map(String::from)
}

/// Generate short text.
pub fn text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ]{0,24}".prop_map(String::from)
}

/// Generate a scalar value.
pub fn leaf_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::Integer),
        text().prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..32).prop_map(Value::Bytes),
    ]
}

/// Generate a value, nesting lists and maps a few levels deep.
pub fn value() -> impl Strategy<Value = Value> {
    leaf_value().prop_recursive(3, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::List),
            prop::collection::btree_map(field_name(), inner, 0..4).prop_map(Value::Map),
        ]
    })
}

/// Generate a non-empty content map.
pub fn content() -> impl Strategy<Value = Content> {
    prop::collection::btree_map(field_name(), value(), 1..8)
}

/// Generate a 32-byte seed.
pub fn seed() -> impl Strategy<Value = [u8; 32]> {
    any::<[u8; 32]>()
}

/// Generate a key kind.
pub fn key_kind() -> impl Strategy<Value = KeyKind> {
    prop_oneof![Just(KeyKind::Ed25519), Just(KeyKind::Sr25519)]
}

/// Generate an on-chain id.
pub fn anchor_id() -> impl Strategy<Value = AnchorId> {
    any::<[u8; 32]>().prop_map(AnchorId::from_bytes)
}
