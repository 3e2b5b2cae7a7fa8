//! Golden test vectors for deterministic verification.
//!
//! These vectors pin the canonical encoding and the CID layout so that any
//! other implementation can be checked byte for byte.

use std::collections::BTreeMap;

use ondc_anchor_core::{address_of, canonical_bytes, ContentId, Value};

/// Text form of the CID of the empty byte sequence.
pub const EMPTY_INPUT_CID: &str = "bagqoiava4qbcadsxkhacnzkdwlukwlvqmcm5vior4xpuo54po6d7vk2fzxys7y5i";

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Input value.
    pub value: Value,
    /// Expected canonical bytes (hex).
    pub expected_hex: &'static str,
}

fn map(entries: Vec<(&str, Value)>) -> Value {
    Value::Map(
        entries
            .into_iter()
            .map(|(k, v)| (k.to_owned(), v))
            .collect::<BTreeMap<_, _>>(),
    )
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "map keys sorted",
            value: map(vec![("b", Value::Integer(1)), ("a", Value::Integer(2))]),
            expected_hex: "a2616102616201",
        },
        GoldenVector {
            name: "shorter key first",
            value: map(vec![("aa", Value::Integer(1)), ("b", Value::Integer(2))]),
            expected_hex: "a261620262616101",
        },
        GoldenVector {
            name: "integer head boundaries",
            value: Value::List(
                [0, 23, 24, 255, 256, 65535, 65536, -1, -25]
                    .into_iter()
                    .map(Value::Integer)
                    .collect(),
            ),
            expected_hex: "890017181818ff19010019ffff1a00010000203818",
        },
        GoldenVector {
            name: "i64 minimum",
            value: Value::Integer(i64::MIN),
            expected_hex: "3b7fffffffffffffff",
        },
        GoldenVector {
            name: "scalars",
            value: Value::List(vec![
                Value::Null,
                Value::Bool(true),
                Value::Bool(false),
                Value::Text(String::new()),
                Value::Bytes(Vec::new()),
            ]),
            expected_hex: "85f6f5f46040",
        },
        GoldenVector {
            name: "nested product",
            value: map(vec![
                ("name", Value::from("tv")),
                ("price", Value::from(135_000u32)),
                ("tags", Value::List(vec![Value::from("a")])),
            ]),
            expected_hex: "a3646e616d6562747664746167738161616570726963651a00020f58",
        },
        GoldenVector {
            name: "store key preimage",
            value: map(vec![
                ("store", Value::from("ABC Store")),
                ("seller", Value::Bytes(vec![1; 32])),
            ]),
            expected_hex: "a26573746f7265694142432053746f72656673656c6c65725820\
                           0101010101010101010101010101010101010101010101010101010101010101",
        },
    ]
}

/// The CID of the empty byte sequence.
pub fn empty_input_cid() -> ContentId {
    address_of(b"")
}

/// Check every vector, plus the empty-input CID.
pub fn verify_all_vectors() -> Result<(), String> {
    for vector in all_vectors() {
        let actual = hex::encode(canonical_bytes(&vector.value));
        if actual != vector.expected_hex {
            return Err(format!(
                "{}: expected {}, got {}",
                vector.name, vector.expected_hex, actual
            ));
        }
    }
    let cid = empty_input_cid().to_string();
    if cid != EMPTY_INPUT_CID {
        return Err(format!("empty input: expected {EMPTY_INPUT_CID}, got {cid}"));
    }
    Ok(())
}
