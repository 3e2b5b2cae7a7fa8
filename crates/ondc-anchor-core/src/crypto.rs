//! Cryptographic primitives: BLAKE2b hashing and the two signature schemes.
//!
//! Accounts are 32-byte public keys. A signature carries the scheme that
//! produced it, so one account type serves both Ed25519 and Sr25519 keys.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use multihash_codetable::{Code, MultihashDigest};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Signing context for Sr25519 signatures.
pub const SR25519_CONTEXT: &[u8] = b"ondc-anchor";

/// SS58 address prefix of the CORD network.
pub const CORD_SS58_PREFIX: u16 = 29;

/// Checksum preimage prefix defined by the SS58 address format.
const SS58_CHECKSUM_PREFIX: &[u8] = b"SS58PRE";

/// A 32-byte BLAKE2b-256 digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest256(pub [u8; 32]);

impl Digest256 {
    /// Compute the BLAKE2b-256 digest of data.
    pub fn hash(data: &[u8]) -> Self {
        let multihash = Code::Blake2b256.digest(data);
        let mut out = [0u8; 32];
        out.copy_from_slice(multihash.digest());
        Self(out)
    }

    /// Compute the digest of `domain || data`.
    pub fn hash_with_domain(domain: &[u8], data: &[u8]) -> Self {
        let mut buf = Vec::with_capacity(domain.len() + data.len());
        buf.extend_from_slice(domain);
        buf.extend_from_slice(data);
        Self::hash(&buf)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Digest256 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Blake2b({}...)", &self.to_hex()[..16])
    }
}

impl AsRef<[u8]> for Digest256 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// The signature scheme of a keypair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    Ed25519,
    Sr25519,
}

impl KeyKind {
    /// Wire tag used in canonical encodings.
    pub fn to_u8(self) -> u8 {
        match self {
            KeyKind::Ed25519 => 0,
            KeyKind::Sr25519 => 1,
        }
    }

    /// Try to parse from the wire tag.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(KeyKind::Ed25519),
            1 => Some(KeyKind::Sr25519),
            _ => None,
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyKind::Ed25519 => f.write_str("ed25519"),
            KeyKind::Sr25519 => f.write_str("sr25519"),
        }
    }
}

impl FromStr for KeyKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ed25519" => Ok(KeyKind::Ed25519),
            "sr25519" => Ok(KeyKind::Sr25519),
            other => Err(CoreError::InvalidSecretKey(format!(
                "unknown key kind `{other}`"
            ))),
        }
    }
}

/// A 32-byte account identifier (the public key of either scheme).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId(pub [u8; 32]);

impl AccountId {
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

    /// Encode as an SS58 address with the given network prefix.
    pub fn to_ss58(&self, prefix: u16) -> String {
        let mut data = ss58_prefix_bytes(prefix);
        data.extend_from_slice(&self.0);
        let checksum = ss58_checksum(&data);
        data.extend_from_slice(&checksum[..2]);
        bs58::encode(data).into_string()
    }

    /// Decode an SS58 address, returning the account and its network prefix.
    pub fn from_ss58(address: &str) -> Result<(Self, u16), CoreError> {
        let data = bs58::decode(address)
            .into_vec()
            .map_err(|e| CoreError::InvalidAddress(e.to_string()))?;

        let (prefix, prefix_len) = match data.first() {
            Some(&b) if b < 64 => (b as u16, 1),
            Some(&b) if b < 128 && data.len() > 1 => {
                let lower = (b << 2) | (data[1] >> 6);
                let upper = data[1] & 0b0011_1111;
                ((lower as u16) | ((upper as u16) << 8), 2)
            }
            _ => return Err(CoreError::InvalidAddress("bad prefix".into())),
        };

        if data.len() != prefix_len + 32 + 2 {
            return Err(CoreError::InvalidAddress(format!(
                "unexpected length {}",
                data.len()
            )));
        }

        let body = &data[..prefix_len + 32];
        let checksum = ss58_checksum(body);
        if data[prefix_len + 32..] != checksum[..2] {
            return Err(CoreError::InvalidAddress("checksum mismatch".into()));
        }

        let mut arr = [0u8; 32];
        arr.copy_from_slice(&data[prefix_len..prefix_len + 32]);
        Ok((Self(arr), prefix))
    }

    /// Verify a signature over a message, using the scheme the signature names.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), CoreError> {
        match signature.kind {
            KeyKind::Ed25519 => {
                let verifying_key =
                    VerifyingKey::from_bytes(&self.0).map_err(|_| CoreError::InvalidPublicKey)?;
                let sig = ed25519_dalek::Signature::from_bytes(&signature.bytes);
                verifying_key
                    .verify(message, &sig)
                    .map_err(|_| CoreError::InvalidSignature)
            }
            KeyKind::Sr25519 => {
                let public = schnorrkel::PublicKey::from_bytes(&self.0)
                    .map_err(|_| CoreError::InvalidPublicKey)?;
                let sig = schnorrkel::Signature::from_bytes(&signature.bytes)
                    .map_err(|_| CoreError::InvalidSignature)?;
                public
                    .verify_simple(SR25519_CONTEXT, message, &sig)
                    .map_err(|_| CoreError::InvalidSignature)
            }
        }
    }
}

impl fmt::Debug for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AccountId({})", self.to_ss58(CORD_SS58_PREFIX))
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_ss58(CORD_SS58_PREFIX))
    }
}

impl FromStr for AccountId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_ss58(s).map(|(account, _)| account)
    }
}

impl AsRef<[u8]> for AccountId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for AccountId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

fn ss58_prefix_bytes(prefix: u16) -> Vec<u8> {
    if prefix < 64 {
        vec![prefix as u8]
    } else {
        let first = ((prefix & 0b0000_0000_1111_1100) >> 2) as u8 | 0b0100_0000;
        let second = ((prefix >> 8) as u8) | (((prefix & 0b0000_0000_0000_0011) as u8) << 6);
        vec![first, second]
    }
}

fn ss58_checksum(data: &[u8]) -> Vec<u8> {
    let mut preimage = Vec::with_capacity(SS58_CHECKSUM_PREFIX.len() + data.len());
    preimage.extend_from_slice(SS58_CHECKSUM_PREFIX);
    preimage.extend_from_slice(data);
    Code::Blake2b512.digest(&preimage).digest().to_vec()
}

/// A 64-byte signature tagged with the scheme that produced it.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    pub kind: KeyKind,
    pub bytes: [u8; 64],
}

impl Signature {
    /// Create from a scheme and raw bytes.
    pub const fn from_bytes(kind: KeyKind, bytes: [u8; 64]) -> Self {
        Self { kind, bytes }
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 64] {
        &self.bytes
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sig({}, {}...)", self.kind, &self.to_hex()[..16])
    }
}

/// A signing keypair of either scheme.
#[derive(Clone)]
pub enum Keypair {
    Ed25519(SigningKey),
    Sr25519(schnorrkel::Keypair),
}

impl Keypair {
    /// Create from a 32-byte seed.
    ///
    /// Sr25519 keys expand the seed as a mini secret key in Ed25519 mode,
    /// matching the substrate keyring.
    pub fn from_seed(kind: KeyKind, seed: &[u8; 32]) -> Result<Self, CoreError> {
        match kind {
            KeyKind::Ed25519 => Ok(Self::Ed25519(SigningKey::from_bytes(seed))),
            KeyKind::Sr25519 => {
                let mini = schnorrkel::MiniSecretKey::from_bytes(seed)
                    .map_err(|e| CoreError::InvalidSecretKey(e.to_string()))?;
                Ok(Self::Sr25519(
                    mini.expand_to_keypair(schnorrkel::ExpansionMode::Ed25519),
                ))
            }
        }
    }

    /// The scheme of this keypair.
    pub fn kind(&self) -> KeyKind {
        match self {
            Keypair::Ed25519(_) => KeyKind::Ed25519,
            Keypair::Sr25519(_) => KeyKind::Sr25519,
        }
    }

    /// Get the public key as an account.
    pub fn account_id(&self) -> AccountId {
        match self {
            Keypair::Ed25519(key) => AccountId(key.verifying_key().to_bytes()),
            Keypair::Sr25519(pair) => AccountId(pair.public.to_bytes()),
        }
    }

    /// Sign a message.
    ///
    /// Ed25519 signatures are deterministic; Sr25519 signatures are randomized.
    pub fn sign(&self, message: &[u8]) -> Signature {
        match self {
            Keypair::Ed25519(key) => Signature {
                kind: KeyKind::Ed25519,
                bytes: key.sign(message).to_bytes(),
            },
            Keypair::Sr25519(pair) => Signature {
                kind: KeyKind::Sr25519,
                bytes: pair.sign_simple(SR25519_CONTEXT, message).to_bytes(),
            },
        }
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({}, {:?})", self.kind(), self.account_id())
    }
}
