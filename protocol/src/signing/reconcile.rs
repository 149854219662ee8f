//! Fee payer restatement.
//!
//! The signing request repeats the fee payer terms next to the canonical
//! text, expressed in the signer's conventions. Both signing flows go
//! through [`restate`], and the external flow checks the signer's answer
//! with [`check_fee_payer`]. Nothing else in the crate converts fees or
//! truncates memos for a signer.

use serde::{Deserialize, Serialize};

use super::error::SigningError;
use crate::config::SignerConventions;
use crate::crypto::keys::PublicKey;
use crate::transaction::{FeePayer, Memo, Transaction};

/// Fee payer terms restated for a signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeePayerRestatement {
    pub fee_payer: PublicKey,
    /// Fee in the signer's denomination.
    pub fee: String,
    pub nonce: String,
    /// Memo cut to the signer's limit.
    pub memo: String,
}

/// Re-express the fee payer terms of `tx` in `conventions`.
///
/// # Errors
///
/// - [`SigningError::Encoding`] with `PrecisionLoss` if the fee cannot be
///   written exactly in the signer's denomination.
/// - [`SigningError::MemoMismatch`] if the signer's memo limit would cut the
///   memo shorter than the canonical form keeps it.
pub fn restate(
    tx: &Transaction,
    conventions: &SignerConventions,
) -> Result<FeePayerRestatement, SigningError> {
    let fp = tx.fee_payer();
    let fee = conventions.fee_denomination.format(fp.fee)?;

    let memo = Memo::truncate_to(fp.memo.as_str(), conventions.memo_limit);
    if memo.truncated {
        return Err(SigningError::MemoMismatch {
            canonical: fp.memo.as_str().to_string(),
            signer: memo.value.as_str().to_string(),
        });
    }

    Ok(FeePayerRestatement {
        fee_payer: fp.public_key,
        fee,
        nonce: fp.nonce.to_string(),
        memo: memo.value.as_str().to_string(),
    })
}

/// Check that `returned` carries exactly the fee payer terms of `expected`.
pub fn check_fee_payer(expected: &FeePayer, returned: &FeePayer) -> Result<(), SigningError> {
    let mismatch = |field: &'static str, e: String, g: String| SigningError::FeePayerMismatch {
        field,
        expected: e,
        got: g,
    };
    if expected.public_key != returned.public_key {
        return Err(mismatch(
            "publicKey",
            expected.public_key.to_string(),
            returned.public_key.to_string(),
        ));
    }
    if expected.fee != returned.fee {
        return Err(mismatch(
            "fee",
            expected.fee.to_string(),
            returned.fee.to_string(),
        ));
    }
    if expected.nonce != returned.nonce {
        return Err(mismatch(
            "nonce",
            expected.nonce.to_string(),
            returned.nonce.to_string(),
        ));
    }
    if expected.memo != returned.memo {
        return Err(mismatch(
            "memo",
            expected.memo.to_string(),
            returned.memo.to_string(),
        ));
    }
    if expected.valid_until != returned.valid_until {
        return Err(mismatch(
            "validUntil",
            format!("{:?}", expected.valid_until),
            format!("{:?}", returned.valid_until),
        ));
    }
    Ok(())
}
