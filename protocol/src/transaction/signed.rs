//! Fully signed transactions.

use std::fmt;

use super::builder::Transaction;
use crate::config::NetworkId;
use crate::crypto::signatures::{batch_verify, domain_message, SignatureError};
use crate::signing::SigningError;

/// A [`Transaction`] whose every required slot carries a signature.
///
/// Immutable: there are no mutating accessors. To change anything, take the
/// model back with [`into_transaction`](Self::into_transaction) and sign the
/// result again. `Clone + Send + Sync`, so it can be shared read-only
/// between tasks.
///
/// Completeness is guaranteed by construction; validity is not. Signatures
/// are bound to a network, so [`verify`](Self::verify) takes one.
#[derive(Clone, PartialEq, Eq)]
pub struct SignedTransaction {
    inner: Transaction,
}

impl SignedTransaction {
    /// Promote `tx` if no required slot is missing.
    pub fn finalize(tx: Transaction) -> Result<Self, SigningError> {
        let missing = tx.missing_signatures();
        if !missing.is_empty() {
            return Err(SigningError::IncompleteSignatures { missing });
        }
        Ok(Self { inner: tx })
    }

    pub fn transaction(&self) -> &Transaction {
        &self.inner
    }

    /// Check every signature against its slot's key for `network`.
    ///
    /// Reports the first slot (fee payer first) whose signature does not
    /// verify.
    pub fn verify(&self, network: NetworkId) -> Result<(), SigningError> {
        verify_signatures(&self.inner, network)
    }

    /// Hex BLAKE3 of the canonical text. Ledgers use it for duplicate
    /// detection and receipts.
    pub fn hash(&self) -> String {
        self.inner.hash()
    }

    pub fn into_transaction(self) -> Transaction {
        self.inner
    }
}

/// Verify whatever signatures `tx` carries, complete or not, in slot order.
pub(crate) fn verify_signatures(tx: &Transaction, network: NetworkId) -> Result<(), SigningError> {
    let commitment = tx.commitment();
    let mut slots = Vec::with_capacity(tx.signatures().len());
    let mut items = Vec::with_capacity(tx.signatures().len());
    for (slot, signature) in tx.signatures() {
        let key = tx
            .slot_key(*slot)
            .ok_or(SigningError::UnknownSlot { slot: *slot })?;
        slots.push(*slot);
        items.push((key, domain_message(network, &slot.role(), &commitment), *signature));
    }
    batch_verify(&items).map_err(|err| match err {
        SignatureError::VerificationFailed { index } => match slots.get(index) {
            Some(slot) => SigningError::SignatureKeyMismatch { slot: *slot },
            None => SigningError::PayloadMismatch {
                reason: format!("verification failed at unknown item {}", index),
            },
        },
    })
}

impl AsRef<Transaction> for SignedTransaction {
    fn as_ref(&self) -> &Transaction {
        &self.inner
    }
}

impl fmt::Debug for SignedTransaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignedTransaction")
            .field("fee_payer", &self.inner.fee_payer().public_key)
            .field("nonce", &self.inner.fee_payer().nonce)
            .field("updates", &self.inner.account_updates().len())
            .field("signatures", &self.inner.signatures().len())
            .finish()
    }
}
