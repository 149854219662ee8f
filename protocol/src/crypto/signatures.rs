//! # Domain-Separated Signatures
//!
//! Every signature in a transaction is computed over
//!
//! ```text
//! network signing tag ‖ role tag ‖ 0x00 ‖ commitment (32 bytes)
//! ```
//!
//! The network tag keeps devnet signatures off mainnet. The role tag binds a
//! signature to the slot it authorizes (`feePayer`, `accountUpdate:3`), so a
//! signature cannot be lifted from one slot and replayed in another slot of
//! the same transaction even when both slots share a key.

use thiserror::Error;

use super::keys::{Keypair, PublicKey, Signature};
use crate::config::NetworkId;

/// Failure of a batch verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    /// The item at `index` did not verify.
    #[error("signature verification failed at item {index}")]
    VerificationFailed { index: usize },
}

/// Build the exact bytes a slot signature is computed over.
pub fn domain_message(network: NetworkId, role: &str, commitment: &[u8; 32]) -> Vec<u8> {
    let tag = network.signing_tag();
    let mut msg = Vec::with_capacity(tag.len() + role.len() + 1 + commitment.len());
    msg.extend_from_slice(tag);
    msg.extend_from_slice(role.as_bytes());
    msg.push(0x00);
    msg.extend_from_slice(commitment);
    msg
}

/// Sign `commitment` for `role` on `network`.
pub fn sign_domain(
    keypair: &Keypair,
    network: NetworkId,
    role: &str,
    commitment: &[u8; 32],
) -> Signature {
    keypair.sign(&domain_message(network, role, commitment))
}

/// Verify every `(key, message, signature)` triple; reports the first
/// failing index. Pair with [`domain_message`] to check slot signatures.
pub fn batch_verify(items: &[(PublicKey, Vec<u8>, Signature)]) -> Result<(), SignatureError> {
    for (index, (pk, msg, sig)) in items.iter().enumerate() {
        if !pk.verify(msg, sig) {
            return Err(SignatureError::VerificationFailed { index });
        }
    }
    Ok(())
}
