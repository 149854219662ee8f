//! Crate-level error type.
//!
//! Each component reports its own error family. [`PipelineError`] lets
//! callers that drive the whole pipeline use a single `?` chain.

use thiserror::Error;

use crate::codec::EncodingError;
use crate::crypto::keys::KeyError;
use crate::signing::SigningError;
use crate::submission::SubmissionError;
use crate::transaction::ValidationError;

/// Any failure between building a transaction and submitting it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("invalid transaction: {0}")]
    Validation(#[from] ValidationError),

    #[error("encoding failed: {0}")]
    Encoding(#[from] EncodingError),

    #[error("signing failed: {0}")]
    Signing(#[from] SigningError),

    /// A rejection turned into an error with
    /// [`SubmissionResult::into_result`](crate::submission::SubmissionResult::into_result).
    #[error("submission rejected: {0}")]
    Submission(#[from] SubmissionError),

    #[error("key error: {0}")]
    Key(#[from] KeyError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn fails_with_encoding() -> Result<()> {
        crate::codec::decode("[]")?;
        Ok(())
    }

    #[test]
    fn question_mark_converts_component_errors() {
        let err = fails_with_encoding().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Encoding(EncodingError::MalformedTransaction { .. })
        ));
        assert!(err.to_string().starts_with("encoding failed"));

        let err: PipelineError = ValidationError::InvalidFee.into();
        assert!(matches!(err, PipelineError::Validation(_)));
    }
}
