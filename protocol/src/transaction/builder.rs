//! Transaction construction via the builder pattern.
//!
//! The [`TransactionBuilder`] collects the fee payer terms and an ordered
//! list of account updates, then validates everything in `.build()`.
//!
//! The builder does not sign; that happens in [`crate::signing`]. This
//! separation keeps construction testable without key material.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use super::types::{AuthorizationKind, BalanceChange, Memo, SignatureSlot};
use super::validation::{validate, ValidationError};
use crate::codec::{self, Denomination};
use crate::config::ACCOUNT_CREATION_FEE;
use crate::crypto::hash::{blake3_hash, blake3_hex};
use crate::crypto::keys::{PublicKey, Signature};
use crate::signing::SigningError;

// ---------------------------------------------------------------------------
// FeePayer / AccountUpdate
// ---------------------------------------------------------------------------

/// The account paying the fee and committing to the nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeePayer {
    pub public_key: PublicKey,
    /// Fee in smallest units.
    pub fee: u64,
    /// Must equal the fee payer's account nonce when the ledger applies it.
    pub nonce: u64,
    pub memo: Memo,
    /// Last global slot at which the transaction may be applied.
    pub valid_until: Option<u32>,
}

/// One balance change against one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountUpdate {
    pub public_key: PublicKey,
    pub authorization_kind: AuthorizationKind,
    pub balance_change: BalanceChange,
    /// The update creates the account; the ledger charges
    /// [`ACCOUNT_CREATION_FEE`] for it.
    pub new_account: bool,
    /// Opaque proof text for proof-authorized updates.
    pub proof: Option<String>,
}

// ---------------------------------------------------------------------------
// Transaction
// ---------------------------------------------------------------------------

/// A fee payer plus an ordered list of account updates, with whatever
/// signatures have been collected so far.
///
/// Update order is significant and nothing in the pipeline reorders it.
/// Values are always valid: the only ways in are the builder and
/// [`Transaction::from_parts`], both of which run
/// [`validate`](super::validation::validate).
///
/// # Identity
///
/// - [`commitment`](Self::commitment) is `BLAKE3(signing payload)`, the
///   canonical text with signatures and proofs removed. Stable across
///   signing.
/// - [`hash`](Self::hash) is the hex BLAKE3 of the full canonical text and
///   changes as signatures are attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    fee_payer: FeePayer,
    account_updates: Vec<AccountUpdate>,
    signatures: BTreeMap<SignatureSlot, Signature>,
}

impl Transaction {
    /// Assemble a transaction from its parts, validating them.
    pub fn from_parts(
        fee_payer: FeePayer,
        account_updates: Vec<AccountUpdate>,
        signatures: BTreeMap<SignatureSlot, Signature>,
    ) -> Result<Self, ValidationError> {
        validate(&fee_payer, &account_updates, &signatures)?;
        Ok(Self {
            fee_payer,
            account_updates,
            signatures,
        })
    }

    pub fn fee_payer(&self) -> &FeePayer {
        &self.fee_payer
    }

    pub fn account_updates(&self) -> &[AccountUpdate] {
        &self.account_updates
    }

    pub fn signatures(&self) -> &BTreeMap<SignatureSlot, Signature> {
        &self.signatures
    }

    pub fn signature(&self, slot: SignatureSlot) -> Option<&Signature> {
        self.signatures.get(&slot)
    }

    /// The key that must sign `slot`, if the slot exists.
    pub fn slot_key(&self, slot: SignatureSlot) -> Option<PublicKey> {
        match slot {
            SignatureSlot::FeePayer => Some(self.fee_payer.public_key),
            SignatureSlot::AccountUpdate(i) => self.account_updates.get(i).map(|u| u.public_key),
        }
    }

    /// Every slot that needs a signature, fee payer first.
    pub fn required_slots(&self) -> Vec<SignatureSlot> {
        std::iter::once(SignatureSlot::FeePayer)
            .chain(
                self.account_updates
                    .iter()
                    .enumerate()
                    .filter(|(_, u)| u.authorization_kind == AuthorizationKind::Signature)
                    .map(|(i, _)| SignatureSlot::AccountUpdate(i)),
            )
            .collect()
    }

    /// Required slots that have no signature yet.
    pub fn missing_signatures(&self) -> Vec<SignatureSlot> {
        self.required_slots()
            .into_iter()
            .filter(|slot| !self.signatures.contains_key(slot))
            .collect()
    }

    pub fn is_fully_signed(&self) -> bool {
        self.missing_signatures().is_empty()
    }

    /// Canonical text without signatures and proofs.
    pub fn signing_payload(&self) -> String {
        codec::signing_payload(self)
    }

    /// `BLAKE3(signing payload)`. What every slot signature commits to.
    pub fn commitment(&self) -> [u8; 32] {
        blake3_hash(self.signing_payload().as_bytes())
    }

    /// Hex BLAKE3 of the full canonical text.
    pub fn hash(&self) -> String {
        blake3_hex(codec::encode(self).as_bytes())
    }

    /// Sum of all balance deltas, in smallest units. The fee is not part of
    /// it.
    pub fn net_balance_change(&self) -> i128 {
        self.account_updates
            .iter()
            .map(|u| u.balance_change.as_i128())
            .sum()
    }

    /// Number of updates that create an account.
    pub fn new_account_count(&self) -> usize {
        self.account_updates.iter().filter(|u| u.new_account).count()
    }

    /// Attach a signature to a required slot, replacing any previous one.
    pub fn with_signature(
        mut self,
        slot: SignatureSlot,
        signature: Signature,
    ) -> Result<Self, SigningError> {
        if !self.required_slots().contains(&slot) {
            return Err(SigningError::UnknownSlot { slot });
        }
        self.signatures.insert(slot, signature);
        Ok(self)
    }

    /// Attach a proof to a proof-authorized update. Proofs are outside the
    /// signing payload, so this does not disturb existing signatures.
    pub fn with_proof(mut self, index: usize, proof: String) -> Result<Self, ValidationError> {
        let count = self.account_updates.len();
        let update = self
            .account_updates
            .get_mut(index)
            .ok_or(ValidationError::UnknownUpdate { index, count })?;
        if update.authorization_kind != AuthorizationKind::Proof {
            return Err(ValidationError::UnexpectedProof {
                index,
                kind: update.authorization_kind,
            });
        }
        update.proof = Some(proof);
        Ok(self)
    }

    /// Replace the fee payer's fee, nonce and memo.
    ///
    /// Changed terms change the signing payload, so every collected
    /// signature is dropped. Restating identical terms keeps them.
    pub fn with_fee_payer_terms(
        mut self,
        fee: u64,
        nonce: u64,
        memo: Memo,
    ) -> Result<Self, ValidationError> {
        if fee == 0 {
            return Err(ValidationError::InvalidFee);
        }
        let fp = &self.fee_payer;
        if fp.fee == fee && fp.nonce == nonce && fp.memo == memo {
            return Ok(self);
        }
        self.fee_payer.fee = fee;
        self.fee_payer.nonce = nonce;
        self.fee_payer.memo = memo;
        self.signatures.clear();
        Ok(self)
    }

    /// Human-readable summary for inspection before submission.
    pub fn to_pretty(&self) -> String {
        let whole = |amount: u64| Denomination::WHOLE.render(amount);
        let fp = &self.fee_payer;
        let mut out = String::new();

        let _ = writeln!(out, "transaction {}", self.hash());
        let _ = writeln!(out, "  fee payer   {}", fp.public_key);
        let _ = writeln!(out, "    fee         {}", whole(fp.fee));
        let _ = writeln!(out, "    nonce       {}", fp.nonce);
        let _ = writeln!(out, "    memo        {:?}", fp.memo.as_str());
        match fp.valid_until {
            Some(slot) => {
                let _ = writeln!(out, "    valid until {}", slot);
            }
            None => {
                let _ = writeln!(out, "    valid until -");
            }
        }

        for (i, u) in self.account_updates.iter().enumerate() {
            let sign = if u.balance_change.is_negative() { "-" } else { "+" };
            let _ = writeln!(
                out,
                "  update {:<4} {}  {}{}  auth={}{}{}",
                i,
                u.public_key,
                sign,
                whole(u.balance_change.magnitude()),
                u.authorization_kind,
                if u.new_account { "  new" } else { "" },
                if u.proof.is_some() { "  proof" } else { "" },
            );
        }

        let required = self.required_slots();
        let missing = self.missing_signatures();
        let _ = write!(
            out,
            "  signatures  {}/{}",
            required.len() - missing.len(),
            required.len()
        );
        if !missing.is_empty() {
            let names: Vec<String> = missing.iter().map(|s| s.role()).collect();
            let _ = write!(out, " (missing: {})", names.join(", "));
        }
        out.push('\n');
        out
    }
}

impl AsRef<Transaction> for Transaction {
    fn as_ref(&self) -> &Transaction {
        self
    }
}

// ---------------------------------------------------------------------------
// UpdateSpec
// ---------------------------------------------------------------------------

/// Intent for one account update, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateSpec {
    pub public_key: PublicKey,
    pub authorization_kind: AuthorizationKind,
    pub balance_change: BalanceChange,
    pub new_account: bool,
    pub proof: Option<String>,
}

impl UpdateSpec {
    pub fn new(
        public_key: PublicKey,
        authorization_kind: AuthorizationKind,
        balance_change: BalanceChange,
    ) -> Self {
        Self {
            public_key,
            authorization_kind,
            balance_change,
            new_account: false,
            proof: None,
        }
    }

    /// A signature-authorized debit of `public_key`.
    pub fn signed_debit(public_key: PublicKey, amount: u64) -> Self {
        Self::new(
            public_key,
            AuthorizationKind::Signature,
            BalanceChange::debit(amount),
        )
    }

    /// An unauthorized credit of `public_key`.
    pub fn credit(public_key: PublicKey, amount: u64) -> Self {
        Self::new(
            public_key,
            AuthorizationKind::NoneGiven,
            BalanceChange::credit(amount),
        )
    }

    /// Mark the update as creating its account.
    pub fn creating_account(mut self) -> Self {
        self.new_account = true;
        self
    }

    pub fn with_proof(mut self, proof: impl Into<String>) -> Self {
        self.proof = Some(proof.into());
        self
    }

    fn into_update(self) -> AccountUpdate {
        AccountUpdate {
            public_key: self.public_key,
            authorization_kind: self.authorization_kind,
            balance_change: self.balance_change,
            new_account: self.new_account,
            proof: self.proof,
        }
    }
}

// ---------------------------------------------------------------------------
// TransactionBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for unsigned [`Transaction`] values.
///
/// # Usage
///
/// ```rust
/// use txkit_protocol::crypto::keys::Keypair;
/// use txkit_protocol::transaction::TransactionBuilder;
///
/// let sender = Keypair::generate().public_key();
/// let receiver = Keypair::generate().public_key();
///
/// let tx = TransactionBuilder::new(sender, 150_000_000)
///     .fund_new_account(1)
///     .send_to_new_account(receiver, 1_000_000_000)
///     .build()
///     .unwrap();
/// assert_eq!(tx.account_updates().len(), 3);
/// ```
///
/// Defaults: nonce 0, empty memo, no validity bound.
pub struct TransactionBuilder {
    sender: PublicKey,
    fee: u64,
    nonce: u64,
    memo: Memo,
    valid_until: Option<u32>,
    updates: Vec<UpdateSpec>,
    error: Option<ValidationError>,
}

impl TransactionBuilder {
    /// Start a transaction whose fee payer is `sender`.
    pub fn new(sender: PublicKey, fee: u64) -> Self {
        Self {
            sender,
            fee,
            nonce: 0,
            memo: Memo::empty(),
            valid_until: None,
            updates: Vec::new(),
            error: None,
        }
    }

    /// Sets the fee payer nonce. Stored verbatim.
    pub fn nonce(mut self, nonce: u64) -> Self {
        self.nonce = nonce;
        self
    }

    /// Sets the memo. Use [`Memo::new`] to truncate and learn whether it did.
    pub fn memo(mut self, memo: Memo) -> Self {
        self.memo = memo;
        self
    }

    pub fn valid_until(mut self, slot: u32) -> Self {
        self.valid_until = Some(slot);
        self
    }

    /// Appends one update.
    pub fn update(mut self, spec: UpdateSpec) -> Self {
        self.updates.push(spec);
        self
    }

    /// Moves `amount` from the sender to an existing account.
    pub fn send(self, to: PublicKey, amount: u64) -> Self {
        let sender = self.sender;
        self.update(UpdateSpec::signed_debit(sender, amount))
            .update(UpdateSpec::credit(to, amount))
    }

    /// Moves `amount` from the sender to an account this transaction
    /// creates. Pair with [`fund_new_account`](Self::fund_new_account).
    pub fn send_to_new_account(self, to: PublicKey, amount: u64) -> Self {
        let sender = self.sender;
        self.update(UpdateSpec::signed_debit(sender, amount))
            .update(UpdateSpec::credit(to, amount).creating_account())
    }

    /// Debits the sender the creation fee for `count` new accounts.
    pub fn fund_new_account(mut self, count: u64) -> Self {
        match ACCOUNT_CREATION_FEE.checked_mul(count) {
            Some(amount) => {
                let sender = self.sender;
                self.update(UpdateSpec::signed_debit(sender, amount))
            }
            None => {
                let index = self.updates.len();
                self.error.get_or_insert(ValidationError::InvalidAmount {
                    index,
                    reason: format!("creation fee for {} accounts overflows", count),
                });
                self
            }
        }
    }

    /// Validates and produces the unsigned transaction.
    pub fn build(self) -> Result<Transaction, ValidationError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        let fee_payer = FeePayer {
            public_key: self.sender,
            fee: self.fee,
            nonce: self.nonce,
            memo: self.memo,
            valid_until: self.valid_until,
        };
        let updates = self
            .updates
            .into_iter()
            .map(UpdateSpec::into_update)
            .collect();
        Transaction::from_parts(fee_payer, updates, BTreeMap::new())
    }
}

/// Build an unsigned transaction from explicit update specs.
pub fn build(
    sender: PublicKey,
    fee: u64,
    updates: impl IntoIterator<Item = UpdateSpec>,
) -> Result<Transaction, ValidationError> {
    updates
        .into_iter()
        .fold(TransactionBuilder::new(sender, fee), TransactionBuilder::update)
        .build()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
