//! # Key Management
//!
//! Ed25519 keypairs, public keys, and signatures for fee payers and account
//! updates.
//!
//! Public keys travel in canonical text as Base58Check strings with a one
//! byte version prefix, the same shape users copy-paste as addresses.
//! Signatures travel as lower-case hex.
//!
//! ## Security considerations
//!
//! - Secret keys are zeroized on drop by ed25519-dalek.
//! - `Keypair` does not implement `Serialize`. Exporting a secret is always
//!   an explicit `secret_key_hex()` call.
//! - Key bytes are never logged; `Debug` prints the public half only.

use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Version byte prepended to public keys before Base58Check encoding.
pub const PUBLIC_KEY_VERSION: u8 = 0xCB;

/// Errors that can occur while parsing key material.
///
/// Intentionally vague about *why* something failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    #[error("invalid secret key: expected 32 hex-encoded bytes")]
    InvalidSecretKey,

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("invalid signature: {0}")]
    InvalidSignature(String),
}

// ---------------------------------------------------------------------------
// Keypair
// ---------------------------------------------------------------------------

/// An Ed25519 signing keypair.
///
/// # Examples
///
/// ```
/// use txkit_protocol::crypto::keys::Keypair;
///
/// let kp = Keypair::generate();
/// let sig = kp.sign(b"fee payer commitment");
/// assert!(kp.public_key().verify(b"fee payer commitment", &sig));
/// ```
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a fresh keypair from the OS RNG.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Deterministic keypair from a 32-byte seed. Test accounts use this.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Parse a hex-encoded 32-byte secret key.
    pub fn from_secret_hex(hex_str: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_str.trim()).map_err(|_| KeyError::InvalidSecretKey)?;
        let seed: [u8; 32] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| KeyError::InvalidSecretKey)?;
        Ok(Self::from_seed(&seed))
    }

    /// Hex-encoded secret key. Handle with care.
    pub fn secret_key_hex(&self) -> String {
        hex::encode(self.signing_key.to_bytes())
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            key: self.signing_key.verifying_key(),
        }
    }

    /// Sign raw message bytes. Ed25519 is deterministic (RFC 8032).
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature {
            bytes: self.signing_key.sign(message).to_bytes(),
        }
    }
}

impl Clone for Keypair {
    fn clone(&self) -> Self {
        Self::from_seed(&self.signing_key.to_bytes())
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair(pub={})", self.public_key())
    }
}

// ---------------------------------------------------------------------------
// PublicKey
// ---------------------------------------------------------------------------

/// The public half of a key: identifies a fee payer or an updated account.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct PublicKey {
    key: VerifyingKey,
}

impl PublicKey {
    /// Build from raw bytes, rejecting points that are not valid keys.
    pub fn from_bytes(bytes: &[u8; 32]) -> Result<Self, KeyError> {
        VerifyingKey::from_bytes(bytes)
            .map(|key| Self { key })
            .map_err(|_| KeyError::InvalidPublicKey("not a valid Ed25519 point".into()))
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        self.key.as_bytes()
    }

    /// Base58Check text form: `base58check(PUBLIC_KEY_VERSION ‖ key)`.
    pub fn to_base58(&self) -> String {
        let mut payload = Vec::with_capacity(33);
        payload.push(PUBLIC_KEY_VERSION);
        payload.extend_from_slice(self.as_bytes());
        bs58::encode(payload).with_check().into_string()
    }

    /// Parse the Base58Check text form.
    pub fn from_base58(s: &str) -> Result<Self, KeyError> {
        let payload = bs58::decode(s)
            .with_check(Some(PUBLIC_KEY_VERSION))
            .into_vec()
            .map_err(|e| KeyError::InvalidPublicKey(e.to_string()))?;
        if payload.len() != 33 {
            return Err(KeyError::InvalidPublicKey(format!(
                "expected 33 payload bytes, got {}",
                payload.len()
            )));
        }
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(&payload[1..]);
        Self::from_bytes(&bytes)
    }

    /// Verify `signature` over `message`. Strict verification: rejects
    /// malleable and small-order edge cases.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        let sig = DalekSignature::from_bytes(&signature.bytes);
        self.key.verify_strict(message, &sig).is_ok()
    }
}

impl std::hash::Hash for PublicKey {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.as_bytes().hash(state);
    }
}

impl PartialOrd for PublicKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PublicKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_bytes().cmp(other.as_bytes())
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.to_base58();
        write!(f, "PublicKey({}…)", &text[..12.min(text.len())])
    }
}

impl FromStr for PublicKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base58(s)
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::from_base58(&text).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// A 64-byte Ed25519 signature. Opaque to everything but verification.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature {
    bytes: [u8; 64],
}

impl Signature {
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.bytes
    }

    /// 128 lower-case hex characters.
    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    pub fn from_hex(s: &str) -> Result<Self, KeyError> {
        let raw = hex::decode(s).map_err(|e| KeyError::InvalidSignature(e.to_string()))?;
        let bytes: [u8; 64] = raw.as_slice().try_into().map_err(|_| {
            KeyError::InvalidSignature(format!("expected 64 bytes, got {}", raw.len()))
        })?;
        Ok(Self { bytes })
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex_str = self.to_hex();
        write!(f, "Signature({}...{})", &hex_str[..8], &hex_str[120..])
    }
}
