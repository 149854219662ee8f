//! Local signing with keys held by the caller.

use tracing::debug;

use super::error::SigningError;
use crate::config::NetworkId;
use crate::crypto::keys::Keypair;
use crate::crypto::signatures::sign_domain;
use crate::transaction::{SignedTransaction, Transaction};

/// Sign every required slot whose key is among `keys`, then finalize and
/// verify.
///
/// Slots already signed are signed again with the matching key if one is
/// given, and kept as they are otherwise. Ed25519 is deterministic, so
/// signing the same content twice yields the same signatures.
pub fn sign_with_keys(
    tx: Transaction,
    keys: &[Keypair],
    network: NetworkId,
) -> Result<SignedTransaction, SigningError> {
    let tx = sign_matching(tx, keys, network)?;
    let signed = SignedTransaction::finalize(tx)?;
    signed.verify(network)?;
    Ok(signed)
}

/// Sign the required slots `keys` can sign and leave the rest alone.
pub(crate) fn sign_matching(
    tx: Transaction,
    keys: &[Keypair],
    network: NetworkId,
) -> Result<Transaction, SigningError> {
    let commitment = tx.commitment();
    let mut tx = tx;

    for slot in tx.required_slots() {
        let Some(slot_key) = tx.slot_key(slot) else {
            return Err(SigningError::UnknownSlot { slot });
        };
        if let Some(keypair) = keys.iter().find(|k| k.public_key() == slot_key) {
            let signature = sign_domain(keypair, network, &slot.role(), &commitment);
            debug!(%slot, "signed slot");
            tx = tx.with_signature(slot, signature)?;
        }
    }
    Ok(tx)
}
