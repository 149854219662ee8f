//! # Local Ledger
//!
//! An in-memory ledger that executes submitted transactions. It stands in
//! for a real node in tests and for offline dry runs.
//!
//! ## State Transitions
//!
//! A signed transaction is checked in this order, first failure wins:
//!
//! 1. The text decodes and every required slot is signed.
//! 2. Every signature verifies for this ledger's network.
//! 3. The transaction hash has not been accepted before.
//! 4. The fee payer account exists.
//! 5. `fee_payer.nonce == account.nonce`.
//! 6. The current global slot is not past `valid_until`.
//! 7. Every proof-authorized update carries a proof.
//! 8. `Σ deltas + ACCOUNT_CREATION_FEE × new accounts == 0`.
//! 9. The fee payer covers the fee, then each update applies in order
//!    (debits against the running balance, new accounts created on the
//!    spot).
//!
//! On success all balance changes, the fee payer nonce increment and the
//! seen-hash entry are committed together under one write lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::result::{Receipt, SubmissionError};
use super::SubmissionEndpoint;
use crate::codec::{self, CanonicalText, Decoded};
use crate::config::{NetworkId, ACCOUNT_CREATION_FEE};
use crate::crypto::keys::{Keypair, PublicKey};
use crate::transaction::{AuthorizationKind, SignedTransaction};

// ---------------------------------------------------------------------------
// AccountState
// ---------------------------------------------------------------------------

/// Balance and nonce of one ledger account.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountState {
    /// Smallest units.
    pub balance: u64,
    /// Nonce the next fee payer transaction must carry.
    pub nonce: u64,
}

impl AccountState {
    pub fn with_balance(balance: u64) -> Self {
        Self { balance, nonce: 0 }
    }
}

// ---------------------------------------------------------------------------
// LocalLedger
// ---------------------------------------------------------------------------

/// In-memory ledger for one network.
pub struct LocalLedger {
    network: NetworkId,
    accounts: RwLock<HashMap<PublicKey, AccountState>>,
    seen: DashMap<String, DateTime<Utc>>,
    global_slot: AtomicU32,
}

impl LocalLedger {
    pub fn new(network: NetworkId) -> Self {
        Self {
            network,
            accounts: RwLock::new(HashMap::new()),
            seen: DashMap::new(),
            global_slot: AtomicU32::new(0),
        }
    }

    /// A ledger with `count` funded accounts and their keys.
    ///
    /// Keys are deterministic (seed `[i + 1; 32]`), so test runs are
    /// reproducible.
    pub fn with_test_accounts(network: NetworkId, count: u8, balance: u64) -> (Self, Vec<Keypair>) {
        let ledger = Self::new(network);
        let keys: Vec<Keypair> = (0..count)
            .map(|i| Keypair::from_seed(&[i.wrapping_add(1); 32]))
            .collect();
        for key in &keys {
            ledger.fund(key.public_key(), balance);
        }
        (ledger, keys)
    }

    pub fn network(&self) -> NetworkId {
        self.network
    }

    /// Create or top up an account.
    pub fn fund(&self, account: PublicKey, amount: u64) {
        let mut accounts = self.accounts.write();
        let state = accounts.entry(account).or_default();
        state.balance = state.balance.saturating_add(amount);
    }

    pub fn account(&self, account: &PublicKey) -> Option<AccountState> {
        self.accounts.read().get(account).copied()
    }

    pub fn balance(&self, account: &PublicKey) -> Option<u64> {
        self.account(account).map(|a| a.balance)
    }

    pub fn global_slot(&self) -> u32 {
        self.global_slot.load(Ordering::SeqCst)
    }

    pub fn set_global_slot(&self, slot: u32) {
        self.global_slot.store(slot, Ordering::SeqCst);
    }

    /// Whether a transaction with this hash was accepted.
    pub fn is_known(&self, tx_hash: &str) -> bool {
        self.seen.contains_key(tx_hash)
    }

    /// Execute canonical text against the ledger.
    pub fn apply(&self, text: &CanonicalText) -> Result<Receipt, SubmissionError> {
        let signed = match codec::decode(text) {
            Ok(Decoded::Signed(signed)) => signed,
            Ok(Decoded::Unsigned(tx)) => {
                return Err(SubmissionError::protocol(format!(
                    "missing signatures for {:?}",
                    tx.missing_signatures()
                )))
            }
            Err(e) => return Err(SubmissionError::protocol(e.to_string())),
        };
        signed
            .verify(self.network)
            .map_err(|e| SubmissionError::protocol(e.to_string()))?;

        let tx_hash = signed.hash();
        let mut accounts = self.accounts.write();

        if self.seen.contains_key(&tx_hash) {
            return Err(SubmissionError::DuplicateSubmission { tx_hash });
        }

        let updated = self.execute(&signed, &accounts)?;
        for (key, state) in updated {
            accounts.insert(key, state);
        }
        self.seen.insert(tx_hash.clone(), Utc::now());
        drop(accounts);

        info!(
            network = %self.network,
            hash = %tx_hash,
            updates = signed.transaction().account_updates().len(),
            "local ledger applied transaction"
        );
        Ok(Receipt::new(tx_hash, self.network))
    }

    /// Run checks 4..9 against a snapshot and return the accounts to write.
    fn execute(
        &self,
        signed: &SignedTransaction,
        accounts: &HashMap<PublicKey, AccountState>,
    ) -> Result<HashMap<PublicKey, AccountState>, SubmissionError> {
        let tx = signed.transaction();
        let fp = tx.fee_payer();

        let payer = accounts
            .get(&fp.public_key)
            .copied()
            .ok_or_else(|| SubmissionError::protocol(format!("unknown fee payer {}", fp.public_key)))?;

        if fp.nonce != payer.nonce {
            warn!(expected = payer.nonce, got = fp.nonce, "nonce mismatch");
            return Err(SubmissionError::InvalidNonce {
                expected: Some(payer.nonce),
                got: Some(fp.nonce),
            });
        }

        if let Some(valid_until) = fp.valid_until {
            let slot = self.global_slot();
            if slot > valid_until {
                return Err(SubmissionError::protocol(format!(
                    "expired: valid until slot {}, ledger at {}",
                    valid_until, slot
                )));
            }
        }

        for (i, update) in tx.account_updates().iter().enumerate() {
            if update.authorization_kind == AuthorizationKind::Proof && update.proof.is_none() {
                return Err(SubmissionError::protocol(format!(
                    "update {} is proof-authorized but carries no proof",
                    i
                )));
            }
        }

        let creation_fees = ACCOUNT_CREATION_FEE as i128 * tx.new_account_count() as i128;
        let imbalance = tx.net_balance_change() + creation_fees;
        if imbalance != 0 {
            return Err(SubmissionError::protocol(format!(
                "balance changes do not sum to zero (off by {})",
                imbalance
            )));
        }

        let mut working: HashMap<PublicKey, AccountState> = HashMap::new();
        let mut payer = payer;
        payer.balance = payer.balance.checked_sub(fp.fee).ok_or_else(|| {
            SubmissionError::InsufficientFunds {
                reason: format!(
                    "fee payer {} has {} but the fee is {}",
                    fp.public_key, payer.balance, fp.fee
                ),
            }
        })?;
        payer.nonce += 1;
        working.insert(fp.public_key, payer);

        for (i, update) in tx.account_updates().iter().enumerate() {
            let current = working
                .get(&update.public_key)
                .or_else(|| accounts.get(&update.public_key))
                .copied();
            let mut state = match (current, update.new_account) {
                (Some(_), true) => {
                    return Err(SubmissionError::protocol(format!(
                        "update {} creates {}, which already exists",
                        i, update.public_key
                    )))
                }
                (None, false) => {
                    return Err(SubmissionError::protocol(format!(
                        "update {} targets unknown account {}",
                        i, update.public_key
                    )))
                }
                (Some(state), false) => state,
                (None, true) => AccountState::default(),
            };

            let amount = update.balance_change.magnitude();
            state.balance = if update.balance_change.is_negative() {
                state.balance.checked_sub(amount).ok_or_else(|| {
                    SubmissionError::InsufficientFunds {
                        reason: format!(
                            "update {}: {} has {} but debits {}",
                            i, update.public_key, state.balance, amount
                        ),
                    }
                })?
            } else {
                state.balance.checked_add(amount).ok_or_else(|| {
                    SubmissionError::protocol(format!("update {} overflows the balance", i))
                })?
            };
            debug!(index = i, account = %update.public_key, balance = state.balance, "applied update");
            working.insert(update.public_key, state);
        }

        Ok(working)
    }
}

impl std::fmt::Debug for LocalLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalLedger")
            .field("network", &self.network)
            .field("accounts", &self.accounts.read().len())
            .field("seen", &self.seen.len())
            .field("global_slot", &self.global_slot())
            .finish()
    }
}

#[async_trait]
impl SubmissionEndpoint for LocalLedger {
    fn network(&self) -> NetworkId {
        self.network
    }

    async fn send(&self, text: &CanonicalText) -> Result<Receipt, SubmissionError> {
        self.apply(text)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::UNITS_PER_WHOLE;
    use crate::signing::local::sign_with_keys;
    use crate::transaction::{BalanceChange, TransactionBuilder, UpdateSpec};

    const FEE: u64 = 150_000_000;

    fn ledger() -> (LocalLedger, Vec<Keypair>) {
        LocalLedger::with_test_accounts(NetworkId::Devnet, 2, 10 * UNITS_PER_WHOLE)
    }

    fn fresh() -> PublicKey {
        Keypair::from_seed(&[200u8; 32]).public_key()
    }

    fn fund_new(sender: &Keypair, nonce: u64, amount: u64) -> CanonicalText {
        let tx = TransactionBuilder::new(sender.public_key(), FEE)
            .nonce(nonce)
            .fund_new_account(1)
            .send_to_new_account(fresh(), amount)
            .build()
            .unwrap();
        let signed = sign_with_keys(tx, &[sender.clone()], NetworkId::Devnet).unwrap();
        codec::encode(&signed)
    }

    #[test]
    fn test_accounts_are_deterministic() {
        let (a, keys_a) = ledger();
        let (_, keys_b) = ledger();
        assert_eq!(keys_a[0].public_key(), keys_b[0].public_key());
        assert_eq!(a.balance(&keys_a[1].public_key()), Some(10 * UNITS_PER_WHOLE));
    }

    #[test]
    fn funding_a_new_account_moves_balances() {
        let (ledger, keys) = ledger();
        let sender = &keys[0];
        let receipt = ledger.apply(&fund_new(sender, 0, UNITS_PER_WHOLE)).unwrap();
        assert!(ledger.is_known(&receipt.tx_hash));

        let payer = ledger.account(&sender.public_key()).unwrap();
        assert_eq!(payer.nonce, 1);
        assert_eq!(payer.balance, 10 * UNITS_PER_WHOLE - FEE - 2 * UNITS_PER_WHOLE);
        assert_eq!(ledger.balance(&fresh()), Some(UNITS_PER_WHOLE));
    }

    #[test]
    fn duplicate_is_rejected() {
        let (ledger, keys) = ledger();
        let text = fund_new(&keys[0], 0, 1);
        ledger.apply(&text).unwrap();
        assert!(matches!(
            ledger.apply(&text),
            Err(SubmissionError::DuplicateSubmission { .. })
        ));
    }

    #[test]
    fn wrong_nonce_is_rejected() {
        let (ledger, keys) = ledger();
        assert_eq!(
            ledger.apply(&fund_new(&keys[0], 5, 1)),
            Err(SubmissionError::InvalidNonce {
                expected: Some(0),
                got: Some(5)
            })
        );
    }

    #[test]
    fn insufficient_funds_leave_state_untouched() {
        let (ledger, keys) = ledger();
        let before = ledger.account(&keys[0].public_key()).unwrap();
        let err = ledger
            .apply(&fund_new(&keys[0], 0, 50 * UNITS_PER_WHOLE))
            .unwrap_err();
        assert!(matches!(err, SubmissionError::InsufficientFunds { .. }));
        assert_eq!(ledger.account(&keys[0].public_key()), Some(before));
        assert_eq!(ledger.balance(&fresh()), None);
    }

    #[test]
    fn unbalanced_transaction_is_protocol_error() {
        let (ledger, keys) = ledger();
        let sender = &keys[0];
        let tx = TransactionBuilder::new(sender.public_key(), FEE)
            .update(UpdateSpec::signed_debit(sender.public_key(), 5))
            .build()
            .unwrap();
        let signed = sign_with_keys(tx, &[sender.clone()], NetworkId::Devnet).unwrap();
        assert!(matches!(
            ledger.apply(&codec::encode(&signed)),
            Err(SubmissionError::ProtocolError { .. })
        ));
    }

    #[test]
    fn transfer_between_existing_accounts() {
        let (ledger, keys) = ledger();
        let (a, b) = (&keys[0], &keys[1]);
        let tx = TransactionBuilder::new(a.public_key(), FEE)
            .send(b.public_key(), 3 * UNITS_PER_WHOLE)
            .build()
            .unwrap();
        let signed = sign_with_keys(tx, &[a.clone()], NetworkId::Devnet).unwrap();
        ledger.apply(&codec::encode(&signed)).unwrap();
        assert_eq!(ledger.balance(&b.public_key()), Some(13 * UNITS_PER_WHOLE));
    }

    #[test]
    fn expired_transaction_is_rejected() {
        let (ledger, keys) = ledger();
        let (a, b) = (&keys[0], &keys[1]);
        let tx = TransactionBuilder::new(a.public_key(), FEE)
            .valid_until(10)
            .send(b.public_key(), 1)
            .build()
            .unwrap();
        let text = codec::encode(&sign_with_keys(tx, &[a.clone()], NetworkId::Devnet).unwrap());
        ledger.set_global_slot(11);
        assert!(matches!(
            ledger.apply(&text),
            Err(SubmissionError::ProtocolError { .. })
        ));
        ledger.set_global_slot(10);
        assert!(ledger.apply(&text).is_ok());
    }

    #[test]
    fn proof_update_needs_a_proof() {
        let (ledger, keys) = ledger();
        let (a, b) = (&keys[0], &keys[1]);
        let tx = TransactionBuilder::new(a.public_key(), FEE)
            .update(UpdateSpec::new(
                b.public_key(),
                AuthorizationKind::Proof,
                BalanceChange::debit(1),
            ))
            .update(UpdateSpec::credit(a.public_key(), 1))
            .build()
            .unwrap();
        let signed = sign_with_keys(tx.clone(), &[a.clone()], NetworkId::Devnet).unwrap();
        let err = ledger.apply(&codec::encode(&signed)).unwrap_err();
        assert!(matches!(err, SubmissionError::ProtocolError { .. }));

        let proved = tx.with_proof(0, "opaque-proof".into()).unwrap();
        let signed = sign_with_keys(proved, &[a.clone()], NetworkId::Devnet).unwrap();
        assert!(ledger.apply(&codec::encode(&signed)).is_ok());
    }

    #[test]
    fn other_network_signatures_are_rejected() {
        let (ledger, keys) = ledger();
        let tx = TransactionBuilder::new(keys[0].public_key(), FEE)
            .build()
            .unwrap();
        let signed = sign_with_keys(tx, &[keys[0].clone()], NetworkId::Mainnet).unwrap();
        assert!(matches!(
            ledger.apply(&codec::encode(&signed)),
            Err(SubmissionError::ProtocolError { .. })
        ));
    }

    #[test]
    fn unsigned_text_is_rejected() {
        let (ledger, keys) = ledger();
        let tx = TransactionBuilder::new(keys[0].public_key(), FEE)
            .build()
            .unwrap();
        assert!(matches!(
            ledger.apply(&codec::encode(&tx)),
            Err(SubmissionError::ProtocolError { .. })
        ));
    }
}
