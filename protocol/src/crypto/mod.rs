//! # Cryptographic Primitives
//!
//! Thin, type-safe wrappers over audited implementations:
//!
//! - **Ed25519** (`ed25519-dalek`) for fee payer and account update signatures.
//! - **BLAKE3** for transaction commitments and hashes.
//! - **Base58Check** (`bs58`) for public key text.
//!
//! Nothing here is clever, and it should stay that way.

pub mod hash;
pub mod keys;
pub mod signatures;

pub use hash::{blake3_hash, blake3_hex};
pub use keys::{KeyError, Keypair, PublicKey, Signature};
pub use signatures::{batch_verify, domain_message, sign_domain, SignatureError};
