//! Submission outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::NetworkId;

/// Proof that an endpoint accepted a transaction.
///
/// Acceptance is not inclusion: the receipt says the endpoint took the
/// transaction, not that a block contains it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    /// Hex BLAKE3 of the submitted canonical text, or the hash the remote
    /// node reported.
    pub tx_hash: String,
    pub network: NetworkId,
    pub accepted_at: DateTime<Utc>,
}

impl Receipt {
    pub fn new(tx_hash: impl Into<String>, network: NetworkId) -> Self {
        Self {
            tx_hash: tx_hash.into(),
            network,
            accepted_at: Utc::now(),
        }
    }
}

/// Why an endpoint did not accept a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmissionError {
    /// The fee payer nonce is not the account's current nonce.
    #[error("invalid nonce: {}", describe_nonce(.expected, .got))]
    InvalidNonce {
        expected: Option<u64>,
        got: Option<u64>,
    },

    /// An account cannot cover the fee or a debit.
    #[error("insufficient funds: {reason}")]
    InsufficientFunds { reason: String },

    /// The same transaction was already accepted.
    #[error("duplicate submission of {tx_hash}")]
    DuplicateSubmission { tx_hash: String },

    /// Transport failure or timeout. The transaction may or may not have
    /// been processed; retrying is safe because a second copy is a
    /// duplicate.
    #[error("network error: {reason}")]
    NetworkError { reason: String },

    /// Rejected for any other reason. Terminal.
    #[error("protocol error: {reason}")]
    ProtocolError { reason: String },
}

fn describe_nonce(expected: &Option<u64>, got: &Option<u64>) -> String {
    match (*expected, *got) {
        (Some(e), Some(g)) => format!("expected {}, got {}", e, g),
        (None, Some(g)) => format!("got {}", g),
        (Some(e), None) => format!("expected {}", e),
        (None, None) => "rejected by endpoint".to_string(),
    }
}

impl SubmissionError {
    /// Only transport-level failures are worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::NetworkError { .. })
    }

    pub(crate) fn protocol(reason: impl Into<String>) -> Self {
        Self::ProtocolError {
            reason: reason.into(),
        }
    }

    pub(crate) fn network(reason: impl Into<String>) -> Self {
        Self::NetworkError {
            reason: reason.into(),
        }
    }
}

/// Typed outcome of a submission. Rejections are values, not errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionResult {
    Success(Receipt),
    Rejected(SubmissionError),
}

impl SubmissionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn receipt(&self) -> Option<&Receipt> {
        match self {
            Self::Success(receipt) => Some(receipt),
            Self::Rejected(_) => None,
        }
    }

    pub fn error(&self) -> Option<&SubmissionError> {
        match self {
            Self::Success(_) => None,
            Self::Rejected(err) => Some(err),
        }
    }

    pub fn into_result(self) -> Result<Receipt, SubmissionError> {
        match self {
            Self::Success(receipt) => Ok(receipt),
            Self::Rejected(err) => Err(err),
        }
    }
}

impl From<Result<Receipt, SubmissionError>> for SubmissionResult {
    fn from(result: Result<Receipt, SubmissionError>) -> Self {
        match result {
            Ok(receipt) => Self::Success(receipt),
            Err(err) => Self::Rejected(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_network_errors_are_retryable() {
        assert!(SubmissionError::network("reset").is_retryable());
        assert!(!SubmissionError::protocol("bad").is_retryable());
        assert!(!SubmissionError::InvalidNonce {
            expected: Some(1),
            got: Some(0)
        }
        .is_retryable());
        assert!(!SubmissionError::DuplicateSubmission {
            tx_hash: "ab".into()
        }
        .is_retryable());
        assert!(!SubmissionError::InsufficientFunds {
            reason: "x".into()
        }
        .is_retryable());
    }

    #[test]
    fn nonce_message_includes_known_values() {
        let err = SubmissionError::InvalidNonce {
            expected: Some(3),
            got: Some(1),
        };
        assert_eq!(err.to_string(), "invalid nonce: expected 3, got 1");
    }

    #[test]
    fn result_conversions() {
        let ok: SubmissionResult = Ok(Receipt::new("h", NetworkId::Devnet)).into();
        assert!(ok.is_success());
        assert_eq!(ok.receipt().map(|r| r.tx_hash.as_str()), Some("h"));
        let err: SubmissionResult = Err(SubmissionError::network("down")).into();
        assert!(err.error().is_some_and(SubmissionError::is_retryable));
        assert!(err.into_result().is_err());
    }

    #[test]
    fn receipt_serializes_camel_case() {
        let receipt = Receipt::new("abc", NetworkId::Testnet);
        let json = serde_json::to_value(&receipt).unwrap();
        assert_eq!(json["txHash"], "abc");
        assert_eq!(json["network"], "testnet");
        assert!(json.get("acceptedAt").is_some());
    }
}
