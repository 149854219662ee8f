//! Codec error types.

use thiserror::Error;

/// Errors produced while encoding amounts or decoding canonical text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodingError {
    /// The input is not a well-formed transaction document: not JSON, not an
    /// object, missing the fee payer, bad key or number text, signature on
    /// a slot that does not exist, and so on.
    #[error("malformed transaction: {reason}")]
    MalformedTransaction { reason: String },

    /// The document carries a top-level key this codec does not know.
    /// Schema versions are implicit, so an unknown shape means a newer or
    /// foreign format.
    #[error("unsupported document shape: unknown top-level key {key:?}")]
    UnsupportedVersion { key: String },

    /// Converting the amount would drop fractional digits.
    #[error(
        "precision loss converting {value:?} (exponent {exponent}, at most {max_fraction_digits} fraction digits)"
    )]
    PrecisionLoss {
        value: String,
        exponent: u32,
        max_fraction_digits: u32,
    },

    /// The amount does not fit in a `u64` of smallest units.
    #[error("amount out of range: {text:?}")]
    AmountOutOfRange { text: String },
}

impl EncodingError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedTransaction {
            reason: reason.into(),
        }
    }
}
