//! Strong type definitions for on-chain identifiers.
//!
//! All identifiers are 32-byte newtypes to prevent misuse at compile time.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::canonical::{canonical_bytes, STORE_ID_DOMAIN};
use crate::crypto::{AccountId, Digest256};
use crate::value::Value;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            /// Create from raw bytes.
            pub const fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// Get the raw bytes.
            pub const fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Convert to hex string.
            pub fn to_hex(&self) -> String {
                hex::encode(self.0)
            }

            /// Parse from hex string.
            pub fn from_hex(s: &str) -> Result<Self, hex::FromHexError> {
                let bytes = hex::decode(s)?;
                if bytes.len() != 32 {
                    return Err(hex::FromHexError::InvalidStringLength);
                }
                let mut arr = [0u8; 32];
                arr.copy_from_slice(&bytes);
                Ok(Self(arr))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "({})"), &self.to_hex()[..16])
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "0x{}", self.to_hex())
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl From<Digest256> for $name {
            fn from(digest: Digest256) -> Self {
                Self(digest.0)
            }
        }

        impl TryFrom<&[u8]> for $name {
            type Error = std::array::TryFromSliceError;

            fn try_from(slice: &[u8]) -> Result<Self, Self::Error> {
                let arr: [u8; 32] = slice.try_into()?;
                Ok(Self(arr))
            }
        }
    };
}

id_type!(
    /// The on-chain identifier of an anchored content stream.
    ///
    /// This is the value later streams embed as their `link`.
    AnchorId,
    "AnchorId"
);

id_type!(
    /// The identifier of a registered schema, derived from its canonical content.
    SchemaId,
    "SchemaId"
);

id_type!(
    /// Grouping key for a seller's store.
    StoreId,
    "StoreId"
);

impl StoreId {
    /// Derive the store key of a seller's named store.
    pub fn derive(store_name: &str, seller: &AccountId) -> Self {
        let mut map = std::collections::BTreeMap::new();
        map.insert("store".to_owned(), Value::from(store_name));
        map.insert("seller".to_owned(), Value::Bytes(seller.0.to_vec()));
        let bytes = canonical_bytes(&Value::Map(map));
        Self::from(Digest256::hash_with_domain(STORE_ID_DOMAIN, &bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchor_id_hex_roundtrip() {
        let id = AnchorId::from_bytes([0x42; 32]);
        let recovered = AnchorId::from_hex(&id.to_hex()).unwrap();
        assert_eq!(id, recovered);
    }

    #[test]
    fn test_from_hex_rejects_short_input() {
        assert!(SchemaId::from_hex("abcd").is_err());
    }

    #[test]
    fn test_display_is_prefixed_hex() {
        let id = StoreId::from_bytes([0xab; 32]);
        let display = id.to_string();
        assert!(display.starts_with("0xabab"));
        assert_eq!(display.len(), 66);
    }

    #[test]
    fn test_debug_is_short() {
        let id = AnchorId::from_bytes([0xcd; 32]);
        assert_eq!(format!("{:?}", id), "AnchorId(cdcdcdcdcdcdcdcd)");
    }

    #[test]
    fn test_store_id_depends_on_seller_and_name() {
        let a = AccountId::from_bytes([1; 32]);
        let b = AccountId::from_bytes([2; 32]);
        assert_eq!(StoreId::derive("ABC Store", &a), StoreId::derive("ABC Store", &a));
        assert_ne!(StoreId::derive("ABC Store", &a), StoreId::derive("ABC Store", &b));
        assert_ne!(StoreId::derive("ABC Store", &a), StoreId::derive("XYZ Store", &a));
    }

    #[test]
    fn test_try_from_slice() {
        let bytes = [7u8; 32];
        assert_eq!(AnchorId::try_from(&bytes[..]).unwrap(), AnchorId(bytes));
        assert!(AnchorId::try_from(&bytes[..31]).is_err());
    }
}
