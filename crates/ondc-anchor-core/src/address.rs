//! Content addressing: BLAKE2b-256 digests wrapped as CIDv1.
//!
//! The addresser never inspects the bytes it is given. Identical bytes always
//! yield the identical identifier, and the empty input is a valid input.

use cid::Cid;
use multihash_codetable::{Code, MultihashDigest};
use std::fmt;
use std::str::FromStr;

use crate::crypto::Digest256;
use crate::error::CoreError;

/// Codec tag identifying "BLAKE2b-256 over canonical CBOR" stream content.
pub const STREAM_CODEC: u64 = 0xb220;

/// Multihash code for BLAKE2b-256.
const BLAKE2B_256: u64 = 0xb220;

/// A version-1 content identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentId(Cid);

impl ContentId {
    /// The raw 32-byte digest carried in the multihash.
    pub fn digest(&self) -> Digest256 {
        let mut out = [0u8; 32];
        out.copy_from_slice(self.0.hash().digest());
        Digest256(out)
    }

    /// The underlying CID.
    pub fn as_cid(&self) -> &Cid {
        &self.0
    }

    /// Binary form: version varint, codec varint, multihash.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.to_bytes()
    }

    /// Decode the binary form, accepting only identifiers this addresser emits.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        let cid = Cid::try_from(bytes).map_err(|e| CoreError::InvalidCid(e.to_string()))?;
        Self::from_cid(cid)
    }

    /// Wrap an existing CID after checking version, codec and hash.
    pub fn from_cid(cid: Cid) -> Result<Self, CoreError> {
        if cid.version() != cid::Version::V1 {
            return Err(CoreError::InvalidCid("expected version 1".into()));
        }
        if cid.codec() != STREAM_CODEC {
            return Err(CoreError::InvalidCid(format!(
                "unexpected codec {:#x}",
                cid.codec()
            )));
        }
        let hash = cid.hash();
        if hash.code() != BLAKE2B_256 || hash.size() != 32 {
            return Err(CoreError::InvalidCid(format!(
                "unexpected multihash {:#x}/{}",
                hash.code(),
                hash.size()
            )));
        }
        Ok(Self(cid))
    }
}

/// Address a byte sequence.
pub fn address_of(bytes: &[u8]) -> ContentId {
    let hash = Code::Blake2b256.digest(bytes);
    ContentId(Cid::new_v1(STREAM_CODEC, hash))
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // CIDv1 renders as multibase base32-lower.
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentId({})", self.0)
    }
}

impl FromStr for ContentId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let cid = Cid::from_str(s).map_err(|e| CoreError::InvalidCid(e.to_string()))?;
        Self::from_cid(cid)
    }
}
