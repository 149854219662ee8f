//! # Submission Gateway
//!
//! Sends a signed transaction to an endpoint and reports a typed
//! [`SubmissionResult`]. There are no retries: a [`SubmissionError::NetworkError`]
//! tells the caller a retry is safe, everything else is terminal.
//!
//! Before anything leaves the process the gateway checks that the endpoint
//! serves the configured network and that every signature verifies for it.
//! The endpoint call is bounded by `PipelineConfig::submit_timeout`. A
//! timed-out submission may still have been processed.

pub mod ledger;
pub mod result;
pub mod rpc;

pub use ledger::{AccountState, LocalLedger};
pub use result::{Receipt, SubmissionError, SubmissionResult};
pub use rpc::HttpEndpoint;

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::codec::{self, CanonicalText};
use crate::config::{NetworkId, PipelineConfig};
use crate::transaction::SignedTransaction;

/// Something that accepts canonical text for one network.
#[async_trait]
pub trait SubmissionEndpoint: Send + Sync {
    /// The network this endpoint serves.
    fn network(&self) -> NetworkId;

    /// Hand over a signed transaction's canonical text.
    async fn send(&self, text: &CanonicalText) -> Result<Receipt, SubmissionError>;
}

/// Submits signed transactions to one endpoint.
pub struct SubmissionGateway {
    config: PipelineConfig,
    endpoint: Arc<dyn SubmissionEndpoint>,
}

impl SubmissionGateway {
    pub fn new(config: PipelineConfig, endpoint: Arc<dyn SubmissionEndpoint>) -> Self {
        Self { config, endpoint }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Submit once and report the outcome.
    pub async fn submit(&self, signed: &SignedTransaction) -> SubmissionResult {
        let result = self.try_submit(signed).await;
        match &result {
            Ok(receipt) => info!(
                network = %receipt.network,
                hash = %receipt.tx_hash,
                "transaction accepted"
            ),
            Err(err) => warn!(
                network = %self.config.network,
                retryable = err.is_retryable(),
                error = %err,
                "transaction rejected"
            ),
        }
        result.into()
    }

    async fn try_submit(&self, signed: &SignedTransaction) -> Result<Receipt, SubmissionError> {
        let network = self.config.network;
        let serves = self.endpoint.network();
        if serves != network {
            return Err(SubmissionError::protocol(format!(
                "endpoint serves {}, pipeline is configured for {}",
                serves, network
            )));
        }

        signed
            .verify(network)
            .map_err(|e| SubmissionError::protocol(e.to_string()))?;

        let text = codec::encode(signed);
        debug!(hash = %signed.hash(), bytes = text.len(), "submitting");

        let after = self.config.submit_timeout;
        match tokio::time::timeout(after, self.endpoint.send(&text)).await {
            Ok(result) => result,
            Err(_) => Err(SubmissionError::network(format!(
                "no answer from endpoint after {:?}",
                after
            ))),
        }
    }
}

impl std::fmt::Debug for SubmissionGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubmissionGateway")
            .field("config", &self.config)
            .field("endpoint", &self.endpoint.network())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UNITS_PER_WHOLE;
    use crate::crypto::keys::Keypair;
    use crate::signing::local::sign_with_keys;
    use crate::transaction::TransactionBuilder;
    use std::time::Duration;

    struct Stalled(NetworkId);

    #[async_trait]
    impl SubmissionEndpoint for Stalled {
        fn network(&self) -> NetworkId {
            self.0
        }

        async fn send(&self, _text: &CanonicalText) -> Result<Receipt, SubmissionError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(SubmissionError::protocol("unreachable"))
        }
    }

    fn signed_transfer(keys: &[Keypair], network: NetworkId) -> SignedTransaction {
        let tx = TransactionBuilder::new(keys[0].public_key(), 150_000_000)
            .send(keys[1].public_key(), UNITS_PER_WHOLE)
            .build()
            .unwrap();
        sign_with_keys(tx, &keys[..1], network).unwrap()
    }

    #[tokio::test]
    async fn submits_to_local_ledger() {
        let (ledger, keys) = LocalLedger::with_test_accounts(NetworkId::Devnet, 2, 5 * UNITS_PER_WHOLE);
        let ledger = Arc::new(ledger);
        let gateway = SubmissionGateway::new(PipelineConfig::new(NetworkId::Devnet), ledger.clone());

        let signed = signed_transfer(&keys, NetworkId::Devnet);
        let result = gateway.submit(&signed).await;
        let receipt = result.receipt().cloned().unwrap();
        assert_eq!(receipt.tx_hash, signed.hash());
        assert!(ledger.is_known(&receipt.tx_hash));

        let again = gateway.submit(&signed).await;
        assert!(matches!(
            again.error(),
            Some(SubmissionError::DuplicateSubmission { .. })
        ));
    }

    #[tokio::test]
    async fn endpoint_on_other_network_is_refused() {
        let (ledger, keys) = LocalLedger::with_test_accounts(NetworkId::Testnet, 2, UNITS_PER_WHOLE);
        let gateway = SubmissionGateway::new(PipelineConfig::new(NetworkId::Devnet), Arc::new(ledger));
        let result = gateway.submit(&signed_transfer(&keys, NetworkId::Devnet)).await;
        assert!(matches!(
            result.error(),
            Some(SubmissionError::ProtocolError { .. })
        ));
    }

    #[tokio::test]
    async fn signatures_for_other_network_never_leave() {
        let (ledger, keys) = LocalLedger::with_test_accounts(NetworkId::Devnet, 2, 5 * UNITS_PER_WHOLE);
        let ledger = Arc::new(ledger);
        let gateway = SubmissionGateway::new(PipelineConfig::new(NetworkId::Devnet), ledger.clone());
        let signed = signed_transfer(&keys, NetworkId::Mainnet);
        assert!(!gateway.submit(&signed).await.is_success());
        assert!(!ledger.is_known(&signed.hash()));
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_is_a_network_error() {
        let keys = [Keypair::from_seed(&[1u8; 32]), Keypair::from_seed(&[2u8; 32])];
        let config = PipelineConfig::new(NetworkId::Devnet).with_submit_timeout(Duration::from_secs(5));
        let gateway = SubmissionGateway::new(config, Arc::new(Stalled(NetworkId::Devnet)));
        let result = gateway.submit(&signed_transfer(&keys, NetworkId::Devnet)).await;
        assert!(result.error().is_some_and(SubmissionError::is_retryable));
    }
}
