//! # External Signers
//!
//! The external flow hands the canonical text to a signer that holds keys
//! the caller does not. The request repeats the fee payer terms explicitly
//! in the signer's conventions (see [`super::reconcile`]), because that is
//! what standalone signer clients read the fee and memo from.
//!
//! [`ExternalSigner`] is the capability; [`KeyringSigner`] is an in-process
//! implementation that behaves like a standalone signer client: it decodes
//! the document, applies the restated terms *using its own conventions*,
//! signs what its key can sign and sends the document back.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::error::SignerError;
use super::local::sign_matching;
use super::reconcile::FeePayerRestatement;
use crate::codec::document::parse_integer;
use crate::codec::{self, CanonicalText};
use crate::config::{NetworkId, SignerConventions};
use crate::crypto::keys::{Keypair, PublicKey};
use crate::transaction::{Memo, Transaction};

// ---------------------------------------------------------------------------
// KeyHandle
// ---------------------------------------------------------------------------

/// Names the key an external signer should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeyHandle(pub PublicKey);

impl KeyHandle {
    pub fn public_key(&self) -> PublicKey {
        self.0
    }
}

impl From<PublicKey> for KeyHandle {
    fn from(key: PublicKey) -> Self {
        Self(key)
    }
}

impl fmt::Display for KeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

// ---------------------------------------------------------------------------
// Request / Response
// ---------------------------------------------------------------------------

/// What the coordinator sends to an external signer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignRequest {
    /// Correlates the response with this request in logs.
    pub id: Uuid,
    /// Canonical text of the transaction to sign.
    pub zkapp_command: CanonicalText,
    /// Fee payer terms in the signer's conventions.
    pub fee_payer: FeePayerRestatement,
    pub key: KeyHandle,
}

impl SignRequest {
    /// Check the request against `conventions` and return the transaction
    /// with the restated fee payer terms applied.
    ///
    /// This is the check a signer runs before trusting a request: the
    /// document decodes, the restated fee payer is the document's fee payer,
    /// the key signs at least one slot, and the restated terms parse in the
    /// signer's conventions.
    pub fn validate(&self, conventions: &SignerConventions) -> Result<Transaction, SignerError> {
        let invalid = |reason: String| SignerError::InvalidRequest { reason };

        let tx = codec::decode(&self.zkapp_command)
            .map_err(|e| invalid(e.to_string()))?
            .into_transaction();

        if tx.fee_payer().public_key != self.fee_payer.fee_payer {
            return Err(invalid(format!(
                "restated fee payer {} is not the document's fee payer {}",
                self.fee_payer.fee_payer,
                tx.fee_payer().public_key
            )));
        }

        let key = self.key.public_key();
        let signs_something = tx
            .required_slots()
            .into_iter()
            .any(|slot| tx.slot_key(slot) == Some(key));
        if !signs_something {
            return Err(invalid(format!("{} signs no slot of this transaction", key)));
        }

        let fee = conventions
            .fee_denomination
            .parse(&self.fee_payer.fee)
            .map_err(|e| invalid(format!("fee: {}", e)))?;
        let nonce: u64 =
            parse_integer(&self.fee_payer.nonce, "nonce").map_err(|e| invalid(e.to_string()))?;
        let memo = Memo::truncate_to(&self.fee_payer.memo, conventions.memo_limit).value;

        tx.with_fee_payer_terms(fee, nonce, memo)
            .map_err(|e| invalid(e.to_string()))
    }
}

/// What an external signer sends back: the document with its signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignResponse {
    pub request_id: Uuid,
    pub zkapp_command: CanonicalText,
}

// ---------------------------------------------------------------------------
// ExternalSigner
// ---------------------------------------------------------------------------

/// A signer outside the caller's control.
#[async_trait]
pub trait ExternalSigner: Send + Sync {
    /// Sign what `request.key` can sign and return the document.
    async fn sign(&self, request: SignRequest) -> Result<SignResponse, SignerError>;
}

// ---------------------------------------------------------------------------
// KeyringSigner
// ---------------------------------------------------------------------------

/// In-process [`ExternalSigner`] holding a set of keys.
pub struct KeyringSigner {
    network: NetworkId,
    conventions: SignerConventions,
    keys: HashMap<PublicKey, Keypair>,
}

impl KeyringSigner {
    /// A keyring using the canonical conventions.
    pub fn new(network: NetworkId) -> Self {
        Self::with_conventions(network, SignerConventions::CANONICAL)
    }

    /// A keyring that reads fees and memos its own way.
    pub fn with_conventions(network: NetworkId, conventions: SignerConventions) -> Self {
        Self {
            network,
            conventions,
            keys: HashMap::new(),
        }
    }

    pub fn with_key(mut self, keypair: Keypair) -> Self {
        self.insert(keypair);
        self
    }

    pub fn insert(&mut self, keypair: Keypair) -> KeyHandle {
        let public_key = keypair.public_key();
        self.keys.insert(public_key, keypair);
        KeyHandle(public_key)
    }
}

impl fmt::Debug for KeyringSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyringSigner")
            .field("network", &self.network)
            .field("conventions", &self.conventions)
            .field("keys", &self.keys.len())
            .finish()
    }
}

#[async_trait]
impl ExternalSigner for KeyringSigner {
    async fn sign(&self, request: SignRequest) -> Result<SignResponse, SignerError> {
        let keypair = self
            .keys
            .get(&request.key.public_key())
            .ok_or(SignerError::UnknownKey { key: request.key })?;

        let tx = request.validate(&self.conventions)?;
        debug!(request_id = %request.id, "keyring accepted sign request");

        let tx = sign_matching(tx, std::slice::from_ref(keypair), self.network).map_err(|e| {
            SignerError::Rejected {
                reason: e.to_string(),
            }
        })?;

        info!(
            request_id = %request.id,
            signatures = tx.signatures().len(),
            "keyring signed transaction"
        );
        Ok(SignResponse {
            request_id: request.id,
            zkapp_command: codec::encode(&tx),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Denomination;
    use crate::signing::reconcile::restate;
    use crate::transaction::{SignatureSlot, TransactionBuilder};

    fn request_for(sender: &Keypair, conventions: &SignerConventions) -> (Transaction, SignRequest) {
        let to = Keypair::from_seed(&[9u8; 32]).public_key();
        let tx = TransactionBuilder::new(sender.public_key(), 150_000_000)
            .memo(Memo::new("external").value)
            .send(to, 1)
            .build()
            .unwrap();
        let request = SignRequest {
            id: Uuid::new_v4(),
            zkapp_command: codec::encode(&tx),
            fee_payer: restate(&tx, conventions).unwrap(),
            key: KeyHandle(sender.public_key()),
        };
        (tx, request)
    }

    #[test]
    fn validate_applies_restated_terms() {
        let sender = Keypair::from_seed(&[1u8; 32]);
        let (tx, request) = request_for(&sender, &SignerConventions::CANONICAL);
        let validated = request.validate(&SignerConventions::CANONICAL).unwrap();
        assert_eq!(validated, tx);
    }

    #[test]
    fn validate_rejects_wrong_fee_payer() {
        let sender = Keypair::from_seed(&[1u8; 32]);
        let (_, mut request) = request_for(&sender, &SignerConventions::CANONICAL);
        request.fee_payer.fee_payer = Keypair::from_seed(&[2u8; 32]).public_key();
        assert!(matches!(
            request.validate(&SignerConventions::CANONICAL),
            Err(SignerError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn validate_rejects_key_without_slot() {
        let sender = Keypair::from_seed(&[1u8; 32]);
        let (_, mut request) = request_for(&sender, &SignerConventions::CANONICAL);
        request.key = KeyHandle(Keypair::from_seed(&[5u8; 32]).public_key());
        assert!(matches!(
            request.validate(&SignerConventions::CANONICAL),
            Err(SignerError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn validate_accepts_only_plain_decimal_nonces() {
        let sender = Keypair::from_seed(&[1u8; 32]);
        let (_, mut request) = request_for(&sender, &SignerConventions::CANONICAL);
        for nonce in ["+3", "-0", "03", " 3", "3.0", ""] {
            request.fee_payer.nonce = nonce.to_string();
            assert!(
                matches!(
                    request.validate(&SignerConventions::CANONICAL),
                    Err(SignerError::InvalidRequest { .. })
                ),
                "nonce {:?}",
                nonce
            );
        }
        request.fee_payer.nonce = "3".to_string();
        let validated = request.validate(&SignerConventions::CANONICAL).unwrap();
        assert_eq!(validated.fee_payer().nonce, 3);
    }

    #[test]
    fn validate_reads_fee_in_signer_denomination() {
        let sender = Keypair::from_seed(&[1u8; 32]);
        let (_, request) = request_for(&sender, &SignerConventions::CANONICAL);
        let native = SignerConventions {
            fee_denomination: Denomination::NATIVE,
            ..SignerConventions::CANONICAL
        };
        // "0.15" has fractional digits the native unit cannot hold.
        assert!(matches!(
            request.validate(&native),
            Err(SignerError::InvalidRequest { .. })
        ));
    }

    #[test]
    fn sign_request_serializes_camel_case() {
        let sender = Keypair::from_seed(&[1u8; 32]);
        let (_, request) = request_for(&sender, &SignerConventions::CANONICAL);
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("zkappCommand").is_some());
        assert_eq!(json["feePayer"]["fee"], "0.15");
        let back: SignRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back, request);
    }

    #[tokio::test]
    async fn keyring_signs_its_slots() {
        let sender = Keypair::from_seed(&[1u8; 32]);
        let (_, request) = request_for(&sender, &SignerConventions::CANONICAL);
        let keyring = KeyringSigner::new(NetworkId::Devnet).with_key(sender);
        let response = keyring.sign(request.clone()).await.unwrap();
        assert_eq!(response.request_id, request.id);
        let decoded = codec::decode(&response.zkapp_command).unwrap();
        let signed = decoded.into_signed().unwrap();
        assert!(signed.verify(NetworkId::Devnet).is_ok());
        assert!(signed
            .transaction()
            .signature(SignatureSlot::AccountUpdate(0))
            .is_some());
    }

    #[tokio::test]
    async fn keyring_without_key_reports_unknown_key() {
        let sender = Keypair::from_seed(&[1u8; 32]);
        let (_, request) = request_for(&sender, &SignerConventions::CANONICAL);
        let keyring = KeyringSigner::new(NetworkId::Devnet);
        assert_eq!(
            keyring.sign(request.clone()).await,
            Err(SignerError::UnknownKey { key: request.key })
        );
    }
}
