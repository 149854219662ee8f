//! Signing error types.

use std::time::Duration;

use thiserror::Error;

use super::external::KeyHandle;
use crate::codec::EncodingError;
use crate::transaction::SignatureSlot;

/// Failure reported by an external signer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignerError {
    /// The signer (or its operator) declined to sign.
    #[error("signer rejected the request: {reason}")]
    Rejected { reason: String },

    /// The signer holds no key for the handle.
    #[error("signer has no key for {key}")]
    UnknownKey { key: KeyHandle },

    /// The request failed the signer's own checks.
    #[error("invalid sign request: {reason}")]
    InvalidRequest { reason: String },
}

/// Errors from the signing coordinator and signature checks.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
    /// The signature on `slot` does not verify against the slot's key.
    #[error("signature on {slot} does not match its key")]
    SignatureKeyMismatch { slot: SignatureSlot },

    /// Required slots are still unsigned.
    #[error("missing signatures for {missing:?}")]
    IncompleteSignatures { missing: Vec<SignatureSlot> },

    /// The signer's document changed a fee payer term.
    #[error("fee payer {field} changed by signer: expected {expected:?}, got {got:?}")]
    FeePayerMismatch {
        field: &'static str,
        expected: String,
        got: String,
    },

    /// The signer's memo limit would truncate the memo differently than the
    /// codec did.
    #[error("memo {canonical:?} would be cut to {signer:?} by the signer")]
    MemoMismatch { canonical: String, signer: String },

    /// The signer's document is not the transaction that was sent.
    #[error("signed payload differs from the request: {reason}")]
    PayloadMismatch { reason: String },

    /// A signature was offered for a slot that does not take one.
    #[error("{slot} does not take a signature")]
    UnknownSlot { slot: SignatureSlot },

    /// The external signer did not answer in time.
    #[error("external signer timed out after {after:?}")]
    SignerTimeout { after: Duration },

    #[error(transparent)]
    Signer(#[from] SignerError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),
}
