//! Deterministic identities derived from seeds or dev URIs.
//!
//! A secret is either a `0x`-prefixed 32-byte hex seed or a dev URI made of
//! hard junctions (`//Alice`, `//SellerOne//shop`). Dev URIs hash down to a
//! seed, so the same string and key kind always yield the same keypair.

use std::fmt;
use std::str::FromStr;

use x25519_dalek::{PublicKey as X25519Public, StaticSecret};

use crate::crypto::{AccountId, Digest256, KeyKind, Keypair, Signature, CORD_SS58_PREFIX};
use crate::error::ValidationError;

/// Domain prefix hashing a dev URI path into a seed.
const DEV_URI_DOMAIN: &[u8] = b"ondc/dev-uri/v1";

/// Domain prefix deriving an X25519 box key from a seed.
const BOX_KEY_DOMAIN: &[u8] = b"ondc/box-key/v1";

/// A parsed secret: a raw seed or a dev URI.
#[derive(Clone, PartialEq, Eq)]
pub enum SecretUri {
    Seed([u8; 32]),
    Dev(Vec<String>),
}

impl SecretUri {
    /// Parse a seed string or dev URI.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let input = input.trim();

        if let Some(hex_seed) = input.strip_prefix("0x") {
            let bytes = hex::decode(hex_seed)
                .map_err(|e| ValidationError::MalformedSeed(format!("invalid hex: {e}")))?;
            let seed: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
                ValidationError::MalformedSeed(format!("seed is {} bytes, expected 32", b.len()))
            })?;
            return Ok(SecretUri::Seed(seed));
        }

        if let Some(path) = input.strip_prefix("//") {
            let junctions: Vec<String> = path.split("//").map(str::to_owned).collect();
            if junctions.iter().any(|j| j.is_empty() || j.contains('/')) {
                return Err(ValidationError::MalformedSeed(format!(
                    "invalid junction in `{input}`"
                )));
            }
            return Ok(SecretUri::Dev(junctions));
        }

        Err(ValidationError::MalformedSeed(
            "expected a 0x-prefixed hex seed or a //junction uri".into(),
        ))
    }

    /// The 32-byte seed this secret stands for.
    pub fn seed(&self) -> [u8; 32] {
        match self {
            SecretUri::Seed(seed) => *seed,
            SecretUri::Dev(junctions) => {
                let mut path = Vec::new();
                for junction in junctions {
                    path.extend_from_slice(b"//");
                    path.extend_from_slice(junction.as_bytes());
                }
                Digest256::hash_with_domain(DEV_URI_DOMAIN, &path).0
            }
        }
    }

    /// A child secret one hard junction below this one.
    pub fn child(&self, junction: &str) -> Self {
        match self {
            SecretUri::Seed(seed) => {
                let mut path = seed.to_vec();
                path.extend_from_slice(b"//");
                path.extend_from_slice(junction.as_bytes());
                SecretUri::Seed(Digest256::hash_with_domain(DEV_URI_DOMAIN, &path).0)
            }
            SecretUri::Dev(junctions) => {
                let mut junctions = junctions.clone();
                junctions.push(junction.to_owned());
                SecretUri::Dev(junctions)
            }
        }
    }
}

impl FromStr for SecretUri {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Debug for SecretUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SecretUri::Seed(_) => f.write_str("SecretUri(<seed>)"),
            SecretUri::Dev(junctions) => write!(f, "SecretUri(//{})", junctions.join("//")),
        }
    }
}

/// A signing identity: keypair plus its stable SS58 address.
#[derive(Clone)]
pub struct Identity {
    keypair: Keypair,
    address: String,
}

impl Identity {
    /// Derive an identity from a seed string or dev URI.
    pub fn derive(seed_or_uri: &str, kind: KeyKind) -> Result<Self, ValidationError> {
        let secret = SecretUri::parse(seed_or_uri)?;
        Self::from_secret(&secret, kind)
    }

    /// Derive an identity from an already parsed secret.
    pub fn from_secret(secret: &SecretUri, kind: KeyKind) -> Result<Self, ValidationError> {
        let keypair = Keypair::from_seed(kind, &secret.seed())?;
        let address = keypair.account_id().to_ss58(CORD_SS58_PREFIX);
        Ok(Self { keypair, address })
    }

    pub fn kind(&self) -> KeyKind {
        self.keypair.kind()
    }

    pub fn account_id(&self) -> AccountId {
        self.keypair.account_id()
    }

    /// SS58 address on the CORD network.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn sign(&self, message: &[u8]) -> Signature {
        self.keypair.sign(message)
    }

    pub fn keypair(&self) -> &Keypair {
        &self.keypair
    }
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identity({}, {})", self.kind(), self.address)
    }
}

/// An X25519 keypair for confidentiality.
#[derive(Clone)]
pub struct EncryptionKeypair {
    secret: StaticSecret,
    public: X25519Public,
}

impl EncryptionKeypair {
    /// Derive a box keypair from a seed string or dev URI.
    pub fn derive(seed_or_uri: &str) -> Result<Self, ValidationError> {
        let secret = SecretUri::parse(seed_or_uri)?;
        Ok(Self::from_secret(&secret))
    }

    pub fn from_secret(secret: &SecretUri) -> Self {
        let scalar = Digest256::hash_with_domain(BOX_KEY_DOMAIN, &secret.seed()).0;
        let secret = StaticSecret::from(scalar);
        let public = X25519Public::from(&secret);
        Self { secret, public }
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.public.to_bytes()
    }

    /// Diffie-Hellman agreement with a peer's public key.
    pub fn shared_secret(&self, peer: &[u8; 32]) -> [u8; 32] {
        self.secret
            .diffie_hellman(&X25519Public::from(*peer))
            .to_bytes()
    }
}

impl fmt::Debug for EncryptionKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptionKeypair({}...)", &hex::encode(self.public_key())[..16])
    }
}

/// The per-role key set of a participant.
///
/// Authentication, anchoring and delegation use distinct seeds so that a
/// single participant can hold separate keys per purpose.
#[derive(Debug, Clone)]
pub struct RoleKeys {
    pub authentication: Identity,
    pub anchor: Identity,
    pub delegation: Identity,
    pub encryption: EncryptionKeypair,
}

impl RoleKeys {
    /// Derive all role keys of the given kind from four secrets.
    pub fn derive(
        authentication: &str,
        encryption: &str,
        anchor: &str,
        delegation: &str,
        kind: KeyKind,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            authentication: Identity::derive(authentication, kind)?,
            anchor: Identity::derive(anchor, kind)?,
            delegation: Identity::derive(delegation, kind)?,
            encryption: EncryptionKeypair::derive(encryption)?,
        })
    }

    /// Derive all role keys from one secret.
    ///
    /// The secret itself is the authentication key; the other roles use the
    /// `//anchor`, `//delegation` and `//encryption` children.
    pub fn from_uri(seed_or_uri: &str, kind: KeyKind) -> Result<Self, ValidationError> {
        let secret = SecretUri::parse(seed_or_uri)?;
        Ok(Self {
            authentication: Identity::from_secret(&secret, kind)?,
            anchor: Identity::from_secret(&secret.child("anchor"), kind)?,
            delegation: Identity::from_secret(&secret.child("delegation"), kind)?,
            encryption: EncryptionKeypair::from_secret(&secret.child("encryption")),
        })
    }
}
