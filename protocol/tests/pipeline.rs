//! End-to-end tests for the transaction pipeline.
//!
//! Each test builds its own ledger with deterministic funded accounts, so
//! there is no shared state and no ordering dependency.

use std::sync::Arc;

use txkit_protocol::codec::{self, Denomination, EncodingError};
use txkit_protocol::config::{NetworkId, PipelineConfig, SignerConventions, UNITS_PER_WHOLE};
use txkit_protocol::crypto::keys::{Keypair, PublicKey};
use txkit_protocol::signing::{KeyringSigner, SigningCoordinator, SigningFlow};
use txkit_protocol::submission::{LocalLedger, SubmissionError, SubmissionGateway};
use txkit_protocol::transaction::{Memo, SignedTransaction, Transaction, TransactionBuilder};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

const FEE: u64 = 150_000_000;
const AMOUNT: u64 = 1_000_000_000;
const NETWORK: NetworkId = NetworkId::Devnet;

fn fresh_account() -> PublicKey {
    Keypair::from_seed(&[77u8; 32]).public_key()
}

/// A ledger with two funded accounts and a gateway in front of it.
fn setup() -> (Arc<LocalLedger>, SubmissionGateway, Vec<Keypair>) {
    let (ledger, keys) = LocalLedger::with_test_accounts(NETWORK, 2, 100 * UNITS_PER_WHOLE);
    let ledger = Arc::new(ledger);
    let gateway = SubmissionGateway::new(PipelineConfig::new(NETWORK), ledger.clone());
    (ledger, gateway, keys)
}

/// Funds a fresh account with [`AMOUNT`], paying [`FEE`].
fn funding_transaction(sender: &Keypair) -> Transaction {
    TransactionBuilder::new(sender.public_key(), FEE)
        .memo(Memo::new("fund a new account").value)
        .fund_new_account(1)
        .send_to_new_account(fresh_account(), AMOUNT)
        .build()
        .expect("valid transaction")
}

fn decode_signed(text: &codec::CanonicalText) -> SignedTransaction {
    codec::decode(text)
        .expect("decodes")
        .into_signed()
        .expect("fully signed")
}

/// Local flow: sign, encode, decode, submit.
async fn local_scenario(gateway: &SubmissionGateway, sender: &Keypair) -> SignedTransaction {
    let coordinator = SigningCoordinator::new(PipelineConfig::new(NETWORK));
    let tx = funding_transaction(sender);
    let flow = SigningFlow::Local(vec![sender.clone()]);
    let signed = coordinator.sign(tx, &flow).await.expect("local signing");

    let text = codec::encode(&signed);
    let decoded = decode_signed(&text);
    assert_eq!(decoded, signed);

    let result = gateway.submit(&decoded).await;
    assert!(result.is_success(), "local scenario rejected: {:?}", result);
    decoded
}

/// External flow with the fee restated in whole units.
async fn external_scenario(gateway: &SubmissionGateway, sender: &Keypair) -> SignedTransaction {
    let config = PipelineConfig::new(NETWORK).with_signer(SignerConventions {
        fee_denomination: Denomination::WHOLE,
        ..SignerConventions::CANONICAL
    });
    let coordinator = SigningCoordinator::new(config);

    let unsigned = codec::encode(&funding_transaction(sender));
    let tx = codec::decode(&unsigned).expect("decodes").into_transaction();

    let mut keyring = KeyringSigner::new(NETWORK);
    let key = keyring.insert(sender.clone());
    let flow = SigningFlow::External {
        signer: Arc::new(keyring),
        key,
    };
    let signed = coordinator.sign(tx, &flow).await.expect("external signing");

    let decoded = decode_signed(&codec::encode(&signed));
    let result = gateway.submit(&decoded).await;
    assert!(result.is_success(), "external scenario rejected: {:?}", result);
    decoded
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[tokio::test]
async fn local_sign_scenario_succeeds() {
    let (ledger, gateway, keys) = setup();
    let sender = &keys[0];
    let signed = local_scenario(&gateway, sender).await;

    assert!(ledger.is_known(&signed.hash()));
    assert_eq!(ledger.balance(&fresh_account()), Some(AMOUNT));
    let payer = ledger.account(&sender.public_key()).unwrap();
    assert_eq!(payer.nonce, 1);
    assert_eq!(payer.balance, 100 * UNITS_PER_WHOLE - FEE - UNITS_PER_WHOLE - AMOUNT);
}

#[tokio::test]
async fn external_signer_scenario_matches_local() {
    let (_, local_gateway, keys) = setup();
    let local = local_scenario(&local_gateway, &keys[0]).await;

    let (ledger, gateway, keys) = setup();
    let external = external_scenario(&gateway, &keys[0]).await;
    assert!(ledger.is_known(&external.hash()));

    assert_eq!(
        local.transaction().signing_payload(),
        external.transaction().signing_payload()
    );
    assert_eq!(local.verify(NETWORK), external.verify(NETWORK));
    // Ed25519 is deterministic, so both flows produce the same bytes.
    assert_eq!(codec::encode(&local), codec::encode(&external));
}

#[tokio::test]
async fn replayed_submission_is_duplicate() {
    let (_, gateway, keys) = setup();
    let signed = local_scenario(&gateway, &keys[0]).await;
    let again = gateway.submit(&signed).await;
    assert!(matches!(
        again.error(),
        Some(SubmissionError::DuplicateSubmission { .. })
    ));
}

#[tokio::test]
async fn next_transaction_needs_the_next_nonce() {
    let (_, gateway, keys) = setup();
    let coordinator = SigningCoordinator::new(PipelineConfig::new(NETWORK));
    let (a, b) = (&keys[0], &keys[1]);

    let stale = TransactionBuilder::new(a.public_key(), FEE)
        .send(b.public_key(), 1)
        .build()
        .unwrap();
    local_scenario(&gateway, a).await;

    let signed = coordinator.sign_local(stale.clone(), &[a.clone()]).unwrap();
    assert_eq!(
        gateway.submit(&signed).await.into_result().unwrap_err(),
        SubmissionError::InvalidNonce {
            expected: Some(1),
            got: Some(0)
        }
    );

    let current = TransactionBuilder::new(a.public_key(), FEE)
        .nonce(1)
        .send(b.public_key(), 1)
        .build()
        .unwrap();
    let signed = coordinator.sign_local(current, &[a.clone()]).unwrap();
    assert!(gateway.submit(&signed).await.is_success());
}

#[tokio::test]
async fn multi_party_transfer_needs_both_keys() {
    let (ledger, gateway, keys) = setup();
    let (a, b) = (&keys[0], &keys[1]);
    let coordinator = SigningCoordinator::new(PipelineConfig::new(NETWORK));

    // a pays the fee, b sends to a.
    let tx = TransactionBuilder::new(a.public_key(), FEE)
        .update(txkit_protocol::transaction::UpdateSpec::signed_debit(
            b.public_key(),
            AMOUNT,
        ))
        .update(txkit_protocol::transaction::UpdateSpec::credit(
            a.public_key(),
            AMOUNT,
        ))
        .build()
        .unwrap();

    assert!(coordinator.sign_local(tx.clone(), &[a.clone()]).is_err());
    let signed = coordinator
        .sign_local(tx, &[a.clone(), b.clone()])
        .unwrap();
    assert!(gateway.submit(&signed).await.is_success());
    assert_eq!(
        ledger.balance(&b.public_key()),
        Some(100 * UNITS_PER_WHOLE - AMOUNT)
    );
}

// ---------------------------------------------------------------------------
// Codec properties
// ---------------------------------------------------------------------------

#[tokio::test]
async fn decode_is_idempotent() {
    let (_, gateway, keys) = setup();
    let signed = local_scenario(&gateway, &keys[0]).await;
    let once = codec::encode(&signed);
    let twice = codec::encode(&decode_signed(&once));
    assert_eq!(once, twice);
    assert_eq!(codec::encode(&decode_signed(&twice)), twice);
}

/// Funding transaction whose memo is `memo`, taken as given.
fn funding_text_with_memo(sender: &Keypair, memo: &str) -> codec::CanonicalText {
    let placeholder = TransactionBuilder::new(sender.public_key(), FEE)
        .memo(Memo::new("placeholder").value)
        .fund_new_account(1)
        .send_to_new_account(fresh_account(), AMOUNT)
        .build()
        .unwrap();
    let text = codec::encode(&placeholder).into_string();
    codec::CanonicalText::new(text.replace(
        "\"memo\":\"placeholder\"",
        &format!("\"memo\":{}", serde_json::to_string(memo).unwrap()),
    ))
}

#[tokio::test]
async fn memo_truncation_agrees_across_flows() {
    let sender = Keypair::from_seed(&[1u8; 32]);
    let coordinator = SigningCoordinator::new(PipelineConfig::new(NETWORK));

    for len in [0usize, 32, 33, 100] {
        let memo = "m".repeat(len);

        let local_tx = TransactionBuilder::new(sender.public_key(), FEE)
            .memo(Memo::new(&memo).value)
            .fund_new_account(1)
            .send_to_new_account(fresh_account(), AMOUNT)
            .build()
            .unwrap();
        let local = coordinator
            .sign(local_tx, &SigningFlow::Local(vec![sender.clone()]))
            .await
            .expect("local signing");

        let imported = codec::decode_reporting(&funding_text_with_memo(&sender, &memo)).unwrap();
        assert_eq!(imported.truncated, len > 32, "length {}", len);
        let mut keyring = KeyringSigner::new(NETWORK);
        let key = keyring.insert(sender.clone());
        let flow = SigningFlow::External {
            signer: Arc::new(keyring),
            key,
        };
        let external = coordinator
            .sign(imported.value.into_transaction(), &flow)
            .await
            .expect("external signing");

        assert_eq!(
            local.transaction().fee_payer().memo.as_str().len(),
            len.min(32),
            "length {}",
            len
        );
        assert_eq!(
            codec::encode(&local),
            codec::encode(&external),
            "length {}",
            len
        );
        assert!(external.verify(NETWORK).is_ok());
    }
}

#[test]
fn whole_unit_fee_is_exact() {
    assert_eq!(Denomination::WHOLE.format(FEE).unwrap(), "0.15");
    assert_eq!(Denomination::WHOLE.parse("0.15").unwrap(), FEE);
    assert!(matches!(
        Denomination::WHOLE.parse("0.0000000001"),
        Err(EncodingError::PrecisionLoss { .. })
    ));
}

#[tokio::test]
async fn canonical_text_survives_disk_byte_for_byte() {
    let (_, gateway, keys) = setup();
    let signed = local_scenario(&gateway, &keys[0]).await;
    let text = codec::encode(&signed);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tx.json");
    std::fs::write(&path, text.as_bytes()).unwrap();
    let read = std::fs::read_to_string(&path).unwrap();

    assert_eq!(read.as_bytes(), text.as_bytes());
    assert_eq!(decode_signed(&codec::CanonicalText::new(read)), signed);
}
