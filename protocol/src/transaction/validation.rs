//! Structural validation of transactions.
//!
//! Every [`Transaction`](super::Transaction) passes [`validate`], whether it
//! comes from the builder or from decoded canonical text. The checks are
//! ordered cheapest first and report the first failure.

use std::collections::BTreeMap;

use thiserror::Error;

use super::builder::{AccountUpdate, FeePayer};
use super::types::{AuthorizationKind, SignatureSlot};
use crate::config::MAX_ACCOUNT_UPDATES;
use crate::crypto::keys::Signature;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Bad input to transaction construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The fee payer offers no fee.
    #[error("invalid fee: must be > 0")]
    InvalidFee,

    /// A balance change is not allowed, or helper arithmetic overflowed.
    #[error("invalid amount on update {index}: {reason}")]
    InvalidAmount { index: usize, reason: String },

    /// More account updates than one transaction may carry.
    #[error("too many account updates: {count} (max {max})")]
    TooManyUpdates { count: usize, max: usize },

    /// A proof is attached to an update that is not proof-authorized.
    #[error("update {index} carries a proof but is authorized by {kind}")]
    UnexpectedProof {
        index: usize,
        kind: AuthorizationKind,
    },

    /// An operation named an update index the transaction does not have.
    #[error("no account update at index {index} ({count} updates)")]
    UnknownUpdate { index: usize, count: usize },

    /// A signature sits on a slot that does not require one.
    #[error("signature on {slot}, which does not take a signature")]
    UnexpectedSignature { slot: SignatureSlot },
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Check the construction invariants.
///
/// 1. **Fee**: must be > 0.
/// 2. **Update count**: at most [`MAX_ACCOUNT_UPDATES`].
/// 3. **Debits**: an update authorized by nothing may not be negative.
/// 4. **Proofs**: only proof-authorized updates carry one.
/// 5. **Signatures**: only on the fee payer or signature-authorized updates.
///
/// Signature *validity* is not checked here; that needs a network.
pub fn validate(
    fee_payer: &FeePayer,
    updates: &[AccountUpdate],
    signatures: &BTreeMap<SignatureSlot, Signature>,
) -> Result<(), ValidationError> {
    if fee_payer.fee == 0 {
        return Err(ValidationError::InvalidFee);
    }

    if updates.len() > MAX_ACCOUNT_UPDATES {
        return Err(ValidationError::TooManyUpdates {
            count: updates.len(),
            max: MAX_ACCOUNT_UPDATES,
        });
    }

    for (index, update) in updates.iter().enumerate() {
        if update.authorization_kind == AuthorizationKind::NoneGiven
            && update.balance_change.is_negative()
        {
            return Err(ValidationError::InvalidAmount {
                index,
                reason: "unauthorized update cannot debit".into(),
            });
        }
        if update.proof.is_some() && update.authorization_kind != AuthorizationKind::Proof {
            return Err(ValidationError::UnexpectedProof {
                index,
                kind: update.authorization_kind,
            });
        }
    }

    for slot in signatures.keys() {
        let takes_signature = match slot {
            SignatureSlot::FeePayer => true,
            SignatureSlot::AccountUpdate(i) => updates
                .get(*i)
                .is_some_and(|u| u.authorization_kind == AuthorizationKind::Signature),
        };
        if !takes_signature {
            return Err(ValidationError::UnexpectedSignature { slot: *slot });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
