//! # Canonical Codec
//!
//! Deterministic text form of a transaction, and the way back.
//!
//! Canonical text is compact JSON with a fixed field order:
//!
//! ```text
//! {"feePayer":{"publicKey":"…","fee":"0.15","nonce":"0","memo":"…","validUntil":null},
//!  "accountUpdates":[{"publicKey":"…","authorizationKind":"Signature",
//!    "balanceChange":{"magnitude":"1","sgn":"Negative"},"newAccount":false}],
//!  "signatures":{"feePayer":"<hex>","0":"<hex>"}}
//! ```
//!
//! - Amounts are decimal strings in whole units ([`Denomination::WHOLE`]).
//! - `signatures` is omitted when empty; `proof` is omitted when absent.
//! - The same logical transaction always yields the same bytes.
//!
//! The signing payload is the canonical text with signatures and proofs
//! stripped. Signatures commit to `BLAKE3(signing payload)`, so attaching a
//! signature never changes what the other signatures cover.
//!
//! Decoding never verifies signatures; that needs a network and is the job
//! of [`SignedTransaction::verify`](crate::transaction::SignedTransaction::verify).

pub mod denomination;
pub(crate) mod document;
pub mod error;

pub use denomination::Denomination;
pub use error::EncodingError;

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::transaction::{SignedTransaction, Transaction, Truncated};
use document::{Section, TransactionDoc, TOP_LEVEL_KEYS};

// ---------------------------------------------------------------------------
// CanonicalText
// ---------------------------------------------------------------------------

/// Canonical text of a transaction. Exchanged with external signers and
/// written to disk byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalText(String);

impl CanonicalText {
    /// Wrap text received from elsewhere. Nothing is checked until it is
    /// decoded.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<str> for CanonicalText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for CanonicalText {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl fmt::Display for CanonicalText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Decoded
// ---------------------------------------------------------------------------

/// Result of decoding: signed when every required slot carries a signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    Unsigned(Transaction),
    Signed(SignedTransaction),
}

impl Decoded {
    pub fn transaction(&self) -> &Transaction {
        match self {
            Self::Unsigned(tx) => tx,
            Self::Signed(signed) => signed.transaction(),
        }
    }

    pub fn into_transaction(self) -> Transaction {
        match self {
            Self::Unsigned(tx) => tx,
            Self::Signed(signed) => signed.into_transaction(),
        }
    }

    pub fn is_signed(&self) -> bool {
        matches!(self, Self::Signed(_))
    }

    pub fn into_signed(self) -> Option<SignedTransaction> {
        match self {
            Self::Signed(signed) => Some(signed),
            Self::Unsigned(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// encode / decode
// ---------------------------------------------------------------------------

/// Canonical text of a transaction, signed or not.
pub fn encode<T: AsRef<Transaction>>(value: &T) -> CanonicalText {
    CanonicalText(document::write(value.as_ref(), Section::Full))
}

/// The bytes every signature slot commits to.
pub(crate) fn signing_payload(tx: &Transaction) -> String {
    document::write(tx, Section::SigningPayload)
}

/// Parse canonical text back into the model.
///
/// A memo longer than the canonical limit is truncated and the flag is
/// dropped; use [`decode_reporting`] to see it.
///
/// # Errors
///
/// - [`EncodingError::UnsupportedVersion`] for an unknown top-level key.
/// - [`EncodingError::MalformedTransaction`] for anything structurally
///   wrong, including unknown nested keys and signatures on slots that do
///   not exist.
/// - [`EncodingError::PrecisionLoss`] / [`EncodingError::AmountOutOfRange`]
///   for amounts that do not map exactly onto `u64` smallest units.
pub fn decode<T: AsRef<str> + ?Sized>(text: &T) -> Result<Decoded, EncodingError> {
    decode_reporting(text).map(|decoded| decoded.value)
}

/// Like [`decode`], but reports whether the memo was truncated on import.
///
/// Text with an over-long memo still decodes; its signatures were made over
/// the untruncated memo and will not verify against the result.
pub fn decode_reporting<T: AsRef<str> + ?Sized>(
    text: &T,
) -> Result<Truncated<Decoded>, EncodingError> {
    let text = text.as_ref();

    // Shape check first so unknown formats are told apart from broken ones.
    let value: serde_json::Value = serde_json::from_str(text)
        .map_err(|e| EncodingError::malformed(format!("not valid JSON: {}", e)))?;
    let object = value
        .as_object()
        .ok_or_else(|| EncodingError::malformed("top level is not an object"))?;
    if let Some(key) = object.keys().find(|k| !TOP_LEVEL_KEYS.contains(&k.as_str())) {
        return Err(EncodingError::UnsupportedVersion { key: key.clone() });
    }
    if !object.contains_key("feePayer") {
        return Err(EncodingError::malformed("missing feePayer"));
    }

    // Parse from the text again, not the `Value`, so duplicate keys are seen.
    let doc: TransactionDoc =
        serde_json::from_str(text).map_err(|e| EncodingError::malformed(e.to_string()))?;
    let Truncated {
        value: tx,
        truncated,
    } = doc.into_transaction()?;

    debug!(
        updates = tx.account_updates().len(),
        signatures = tx.signatures().len(),
        memo_truncated = truncated,
        "decoded canonical text"
    );

    let value = if tx.is_fully_signed() {
        SignedTransaction::finalize(tx)
            .map(Decoded::Signed)
            .map_err(|e| EncodingError::malformed(e.to_string()))?
    } else {
        Decoded::Unsigned(tx)
    };
    Ok(Truncated { value, truncated })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
