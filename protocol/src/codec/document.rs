//! Wire layout of canonical text.
//!
//! Encoding is a hand-written writer rather than a serde derive: field order
//! is part of the format, and the writer cannot fail. Decoding goes through
//! serde structs with `deny_unknown_fields`, then converts into the model
//! through the same validation the builder uses.

use std::collections::BTreeMap;
use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use tracing::warn;

use super::denomination::Denomination;
use super::error::EncodingError;
use crate::crypto::keys::{PublicKey, Signature};
use crate::transaction::builder::{AccountUpdate, FeePayer, Transaction};
use crate::transaction::types::{
    AuthorizationKind, BalanceChange, Memo, Sign, SignatureSlot, Truncated,
};

/// Top-level keys of a canonical document, in output order.
pub(crate) const TOP_LEVEL_KEYS: [&str; 3] = ["feePayer", "accountUpdates", "signatures"];

// ---------------------------------------------------------------------------
// Writer
// ---------------------------------------------------------------------------

/// What to include when writing a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Section {
    /// Everything: the canonical text proper.
    Full,
    /// Signatures and proofs stripped: the bytes every slot commits to.
    SigningPayload,
}

/// JSON string literal with serde_json's escaping rules.
fn quote(text: &str) -> String {
    serde_json::Value::String(text.to_owned()).to_string()
}

fn sign_name(sign: Sign) -> &'static str {
    match sign {
        Sign::Positive => "Positive",
        Sign::Negative => "Negative",
    }
}

pub(crate) fn write(tx: &Transaction, section: Section) -> String {
    let fee_payer = tx.fee_payer();
    let mut out = String::with_capacity(256 + 192 * tx.account_updates().len());

    out.push_str("{\"feePayer\":{\"publicKey\":");
    out.push_str(&quote(&fee_payer.public_key.to_base58()));
    out.push_str(",\"fee\":");
    out.push_str(&quote(&Denomination::WHOLE.render(fee_payer.fee)));
    out.push_str(",\"nonce\":");
    out.push_str(&quote(&fee_payer.nonce.to_string()));
    out.push_str(",\"memo\":");
    out.push_str(&quote(fee_payer.memo.as_str()));
    out.push_str(",\"validUntil\":");
    match fee_payer.valid_until {
        Some(slot) => out.push_str(&quote(&slot.to_string())),
        None => out.push_str("null"),
    }
    out.push_str("},\"accountUpdates\":[");

    for (i, update) in tx.account_updates().iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str("{\"publicKey\":");
        out.push_str(&quote(&update.public_key.to_base58()));
        out.push_str(",\"authorizationKind\":");
        out.push_str(&quote(&update.authorization_kind.to_string()));
        out.push_str(",\"balanceChange\":{\"magnitude\":");
        out.push_str(&quote(
            &Denomination::WHOLE.render(update.balance_change.magnitude()),
        ));
        out.push_str(",\"sgn\":");
        out.push_str(&quote(sign_name(update.balance_change.sign())));
        out.push_str("},\"newAccount\":");
        out.push_str(if update.new_account { "true" } else { "false" });
        if section == Section::Full {
            if let Some(proof) = &update.proof {
                out.push_str(",\"proof\":");
                out.push_str(&quote(proof));
            }
        }
        out.push('}');
    }
    out.push(']');

    if section == Section::Full && !tx.signatures().is_empty() {
        out.push_str(",\"signatures\":{");
        for (i, (slot, signature)) in tx.signatures().iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            out.push_str(&quote(&slot.key()));
            out.push(':');
            out.push_str(&quote(&signature.to_hex()));
        }
        out.push('}');
    }

    out.push('}');
    out
}

// ---------------------------------------------------------------------------
// Reader
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub(crate) struct TransactionDoc {
    fee_payer: FeePayerDoc,
    account_updates: Vec<AccountUpdateDoc>,
    #[serde(default, deserialize_with = "unique_entries")]
    signatures: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct FeePayerDoc {
    public_key: String,
    fee: String,
    nonce: String,
    memo: String,
    valid_until: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
struct AccountUpdateDoc {
    public_key: String,
    authorization_kind: AuthorizationKind,
    balance_change: BalanceChangeDoc,
    new_account: bool,
    #[serde(default)]
    proof: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BalanceChangeDoc {
    magnitude: String,
    sgn: Sign,
}

/// A string map that refuses repeated keys instead of keeping the last one.
fn unique_entries<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct UniqueVisitor;

    impl<'de> Visitor<'de> for UniqueVisitor {
        type Value = BTreeMap<String, String>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map of slot names to hex signatures")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
            let mut map = BTreeMap::new();
            while let Some((key, value)) = access.next_entry::<String, String>()? {
                if map.contains_key(&key) {
                    return Err(serde::de::Error::custom(format!(
                        "duplicate signature slot {:?}",
                        key
                    )));
                }
                map.insert(key, value);
            }
            Ok(map)
        }
    }

    deserializer.deserialize_map(UniqueVisitor)
}

fn parse_key(text: &str, field: &str) -> Result<PublicKey, EncodingError> {
    PublicKey::from_base58(text)
        .map_err(|e| EncodingError::malformed(format!("{}: {}", field, e)))
}

/// Strict decimal integer: ASCII digits only, no sign, no leading zero.
pub(crate) fn parse_integer<T: std::str::FromStr>(text: &str, field: &str) -> Result<T, EncodingError> {
    let canonical = !text.is_empty()
        && text.bytes().all(|b| b.is_ascii_digit())
        && (text == "0" || !text.starts_with('0'));
    if !canonical {
        return Err(EncodingError::malformed(format!(
            "{}: expected a decimal integer, got {:?}",
            field, text
        )));
    }
    text.parse::<T>()
        .map_err(|_| EncodingError::malformed(format!("{}: {} is out of range", field, text)))
}

impl TransactionDoc {
    /// The flag is set when the memo had to be cut to the canonical limit.
    pub(crate) fn into_transaction(self) -> Result<Truncated<Transaction>, EncodingError> {
        let fp = self.fee_payer;
        let memo = Memo::new(&fp.memo);
        let truncated = memo.truncated;
        if memo.truncated {
            warn!(
                original_bytes = fp.memo.len(),
                kept_bytes = memo.value.len(),
                "memo longer than the canonical limit, truncated on import"
            );
        }
        let fee_payer = FeePayer {
            public_key: parse_key(&fp.public_key, "feePayer.publicKey")?,
            fee: Denomination::WHOLE.parse(&fp.fee)?,
            nonce: parse_integer(&fp.nonce, "feePayer.nonce")?,
            memo: memo.value,
            valid_until: fp
                .valid_until
                .as_deref()
                .map(|v| parse_integer(v, "feePayer.validUntil"))
                .transpose()?,
        };

        let mut updates = Vec::with_capacity(self.account_updates.len());
        for (i, doc) in self.account_updates.into_iter().enumerate() {
            let field = format!("accountUpdates[{}].publicKey", i);
            updates.push(AccountUpdate {
                public_key: parse_key(&doc.public_key, &field)?,
                authorization_kind: doc.authorization_kind,
                balance_change: BalanceChange::new(
                    Denomination::WHOLE.parse(&doc.balance_change.magnitude)?,
                    doc.balance_change.sgn,
                ),
                new_account: doc.new_account,
                proof: doc.proof,
            });
        }

        let mut signatures = BTreeMap::new();
        for (key, hex_sig) in self.signatures {
            let slot: SignatureSlot = key
                .parse()
                .map_err(|e| EncodingError::malformed(format!("signatures: {}", e)))?;
            if let SignatureSlot::AccountUpdate(index) = slot {
                if index >= updates.len() {
                    return Err(EncodingError::malformed(format!(
                        "signature for update {} but only {} updates",
                        index,
                        updates.len()
                    )));
                }
            }
            let signature = Signature::from_hex(&hex_sig)
                .map_err(|e| EncodingError::malformed(format!("signatures.{}: {}", key, e)))?;
            signatures.insert(slot, signature);
        }

        let value = Transaction::from_parts(fee_payer, updates, signatures)
            .map_err(|e| EncodingError::malformed(e.to_string()))?;
        Ok(Truncated { value, truncated })
    }
}
