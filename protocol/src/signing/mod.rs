//! # Signing Coordinator
//!
//! Turns a [`Transaction`] into a [`SignedTransaction`], either with keys
//! the caller holds or through an [`ExternalSigner`].
//!
//! ```text
//!                      ┌── Local(keys) ──── sign_with_keys ──────────────┐
//! Transaction ─ restate┤                                                 ├─ SignedTransaction
//!                      └── External ─ SignRequest ─ signer ─ accept_response
//! ```
//!
//! Both flows go through [`restate`] first, so fee denomination and memo
//! limit are reconciled in exactly one place. The external flow then checks
//! that the signer handed back the same transaction: same fee payer terms,
//! same updates, signatures that verify for their slots.
//!
//! Signing must happen before encoding for export. Re-importing canonical
//! text and signing it is allowed, but it signs whatever the text decodes to.

pub mod error;
pub mod external;
pub mod local;
pub mod reconcile;

pub use error::{SignerError, SigningError};
pub use external::{ExternalSigner, KeyHandle, KeyringSigner, SignRequest, SignResponse};
pub use reconcile::{restate, FeePayerRestatement};

use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::codec;
use crate::config::{PipelineConfig, SignerConventions};
use crate::crypto::keys::Keypair;
use crate::transaction::signed::verify_signatures;
use crate::transaction::{SignedTransaction, Transaction};

/// How to sign a transaction.
#[derive(Clone)]
pub enum SigningFlow {
    /// Keys held by the caller.
    Local(Vec<Keypair>),
    /// A signer holding `key`.
    External {
        signer: Arc<dyn ExternalSigner>,
        key: KeyHandle,
    },
}

impl fmt::Debug for SigningFlow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local(keys) => f.debug_tuple("Local").field(&keys.len()).finish(),
            Self::External { key, .. } => f.debug_struct("External").field("key", key).finish(),
        }
    }
}

/// Signs transactions for one configured network.
#[derive(Debug, Clone)]
pub struct SigningCoordinator {
    config: PipelineConfig,
}

impl SigningCoordinator {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Sign `tx` with `flow`.
    pub async fn sign(
        &self,
        tx: Transaction,
        flow: &SigningFlow,
    ) -> Result<SignedTransaction, SigningError> {
        match flow {
            SigningFlow::Local(keys) => self.sign_local(tx, keys),
            SigningFlow::External { signer, key } => {
                self.sign_external(tx, signer.as_ref(), *key).await
            }
        }
    }

    /// Local flow: sign every slot one of `keys` owns.
    pub fn sign_local(
        &self,
        tx: Transaction,
        keys: &[Keypair],
    ) -> Result<SignedTransaction, SigningError> {
        restate(&tx, &SignerConventions::CANONICAL)?;
        let signed = local::sign_with_keys(tx, keys, self.config.network)?;
        info!(
            network = %self.config.network,
            hash = %signed.hash(),
            signatures = signed.transaction().signatures().len(),
            "signed transaction locally"
        );
        Ok(signed)
    }

    /// Build the request an external signer receives.
    pub fn sign_request(
        &self,
        tx: &Transaction,
        key: KeyHandle,
    ) -> Result<SignRequest, SigningError> {
        let fee_payer = restate(tx, &self.config.signer)?;
        Ok(SignRequest {
            id: Uuid::new_v4(),
            zkapp_command: codec::encode(tx),
            fee_payer,
            key,
        })
    }

    /// External flow: one round-trip to `signer`, bounded by the configured
    /// signer timeout.
    pub async fn sign_external(
        &self,
        tx: Transaction,
        signer: &dyn ExternalSigner,
        key: KeyHandle,
    ) -> Result<SignedTransaction, SigningError> {
        let request = self.sign_request(&tx, key)?;
        debug!(request_id = %request.id, %key, "sending sign request");

        let after = self.config.signer_timeout;
        let response = match tokio::time::timeout(after, signer.sign(request.clone())).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(request_id = %request.id, ?after, "external signer timed out");
                return Err(SigningError::SignerTimeout { after });
            }
        };

        self.accept_response(&tx, &request, response)
    }

    /// Check a signer's response against what was sent and finalize it.
    ///
    /// # Errors
    ///
    /// - [`SigningError::PayloadMismatch`] if the response answers another
    ///   request or the update list changed.
    /// - [`SigningError::FeePayerMismatch`] if a fee payer term changed,
    ///   which is how a signer reading the fee or memo differently shows up.
    /// - [`SigningError::SignatureKeyMismatch`] if a signature does not
    ///   verify for its slot.
    /// - [`SigningError::IncompleteSignatures`] if slots are still unsigned.
    pub fn accept_response(
        &self,
        original: &Transaction,
        request: &SignRequest,
        response: SignResponse,
    ) -> Result<SignedTransaction, SigningError> {
        if response.request_id != request.id {
            return Err(SigningError::PayloadMismatch {
                reason: format!(
                    "response answers request {}, expected {}",
                    response.request_id, request.id
                ),
            });
        }

        let returned = codec::decode(&response.zkapp_command)?.into_transaction();

        reconcile::check_fee_payer(original.fee_payer(), returned.fee_payer())?;
        if returned.account_updates() != original.account_updates() {
            return Err(SigningError::PayloadMismatch {
                reason: "account updates differ from the request".into(),
            });
        }

        // Keep whatever the caller had already collected; the signer's
        // signatures win where both exist.
        let mut merged = returned;
        for (slot, signature) in original.signatures() {
            if merged.signature(*slot).is_none() {
                merged = merged.with_signature(*slot, *signature)?;
            }
        }

        // Verify before finalizing so a bad signature is reported as such,
        // not as a missing one.
        let network = self.config.network;
        if let Err(err) = verify_signatures(&merged, network) {
            warn!(request_id = %request.id, error = %err, "signer returned a bad signature");
            return Err(err);
        }

        let signed = SignedTransaction::finalize(merged)?;
        info!(
            request_id = %request.id,
            network = %network,
            hash = %signed.hash(),
            "accepted externally signed transaction"
        );
        Ok(signed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
