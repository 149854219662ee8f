//! Core value types for transactions.
//!
//! Small, `Copy`-friendly where possible. None of these types know about the
//! canonical text format; the codec maps them to and from wire documents.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::config::MEMO_MAX_BYTES;

// ---------------------------------------------------------------------------
// AuthorizationKind
// ---------------------------------------------------------------------------

/// What an account update needs before the ledger will apply it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthorizationKind {
    /// A signature by the update's public key.
    Signature,
    /// A proof produced by an external prover. Opaque to this pipeline.
    Proof,
    /// Nothing. Only credits may be unauthorized.
    #[serde(rename = "None")]
    NoneGiven,
}

impl fmt::Display for AuthorizationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signature => write!(f, "Signature"),
            Self::Proof => write!(f, "Proof"),
            Self::NoneGiven => write!(f, "None"),
        }
    }
}

// ---------------------------------------------------------------------------
// BalanceChange
// ---------------------------------------------------------------------------

/// Sign of a balance change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sign {
    Positive,
    Negative,
}

/// A signed balance delta in the smallest unit.
///
/// Zero is always positive, so there is exactly one representation of "no
/// change" and the canonical text stays unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BalanceChange {
    magnitude: u64,
    sign: Sign,
}

impl BalanceChange {
    pub fn new(magnitude: u64, sign: Sign) -> Self {
        let sign = if magnitude == 0 { Sign::Positive } else { sign };
        Self { magnitude, sign }
    }

    /// Money flowing into the account.
    pub fn credit(amount: u64) -> Self {
        Self::new(amount, Sign::Positive)
    }

    /// Money flowing out of the account.
    pub fn debit(amount: u64) -> Self {
        Self::new(amount, Sign::Negative)
    }

    pub fn magnitude(&self) -> u64 {
        self.magnitude
    }

    pub fn sign(&self) -> Sign {
        self.sign
    }

    pub fn is_negative(&self) -> bool {
        self.sign == Sign::Negative
    }

    /// The delta as a signed integer. `i128` holds every `±u64`.
    pub fn as_i128(&self) -> i128 {
        match self.sign {
            Sign::Positive => self.magnitude as i128,
            Sign::Negative => -(self.magnitude as i128),
        }
    }
}

impl fmt::Display for BalanceChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.sign {
            Sign::Positive => write!(f, "+{}", self.magnitude),
            Sign::Negative => write!(f, "-{}", self.magnitude),
        }
    }
}

// ---------------------------------------------------------------------------
// Truncated / Memo
// ---------------------------------------------------------------------------

/// A value together with whether producing it cut something off.
///
/// Truncation is never silent: callers get the flag and decide whether to
/// care.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Truncated<T> {
    pub value: T,
    pub truncated: bool,
}

/// Free-form transaction memo, at most [`MEMO_MAX_BYTES`] bytes of UTF-8.
///
/// Longer input is truncated, never rejected. Truncation always lands on a
/// `char` boundary so the result is valid UTF-8; a multi-byte character that
/// would straddle the limit is dropped whole. Both signing flows and the
/// codec's import path go through [`Memo::truncate_to`], which is what keeps
/// them in agreement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Memo(String);

impl Memo {
    /// The empty memo.
    pub fn empty() -> Self {
        Self(String::new())
    }

    /// Truncate `text` to the canonical limit.
    pub fn new(text: &str) -> Truncated<Memo> {
        Self::truncate_to(text, MEMO_MAX_BYTES)
    }

    /// Truncate `text` to `limit` bytes (capped at the canonical limit).
    pub fn truncate_to(text: &str, limit: usize) -> Truncated<Memo> {
        let limit = limit.min(MEMO_MAX_BYTES);
        if text.len() <= limit {
            return Truncated {
                value: Memo(text.to_string()),
                truncated: false,
            };
        }
        let mut end = limit;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        Truncated {
            value: Memo(text[..end].to_string()),
            truncated: true,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Memo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// SignatureSlot
// ---------------------------------------------------------------------------

/// A position in a transaction that can carry a signature.
///
/// Ordered fee payer first, then updates by index; this is also the order
/// of the `signatures` map in canonical text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SignatureSlot {
    FeePayer,
    AccountUpdate(usize),
}

impl SignatureSlot {
    /// Role tag mixed into the signed message for this slot.
    pub fn role(&self) -> String {
        match self {
            Self::FeePayer => "feePayer".to_string(),
            Self::AccountUpdate(i) => format!("accountUpdate:{}", i),
        }
    }

    /// Key used in the canonical `signatures` map.
    pub fn key(&self) -> String {
        match self {
            Self::FeePayer => "feePayer".to_string(),
            Self::AccountUpdate(i) => i.to_string(),
        }
    }
}

impl fmt::Display for SignatureSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.role())
    }
}

/// Error for a `signatures` map key that is neither `feePayer` nor an index.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid signature slot: {0:?}")]
pub struct InvalidSlot(pub String);

impl FromStr for SignatureSlot {
    type Err = InvalidSlot;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "feePayer" {
            return Ok(Self::FeePayer);
        }
        // Only plain decimal digits, no sign, no leading zeros, so each slot
        // has exactly one spelling.
        let canonical = !s.is_empty()
            && s.bytes().all(|b| b.is_ascii_digit())
            && (s == "0" || !s.starts_with('0'));
        if !canonical {
            return Err(InvalidSlot(s.to_string()));
        }
        s.parse::<usize>()
            .map(Self::AccountUpdate)
            .map_err(|_| InvalidSlot(s.to_string()))
    }
}

impl Serialize for SignatureSlot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.key())
    }
}

impl<'de> Deserialize<'de> for SignatureSlot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_never_negative() {
        let z = BalanceChange::debit(0);
        assert_eq!(z.sign(), Sign::Positive);
        assert_eq!(z, BalanceChange::credit(0));
        assert_eq!(z.as_i128(), 0);
    }

    #[test]
    fn balance_change_as_i128() {
        assert_eq!(BalanceChange::debit(5).as_i128(), -5);
        assert_eq!(
            BalanceChange::credit(u64::MAX).as_i128(),
            u64::MAX as i128
        );
        assert_eq!(BalanceChange::debit(7).to_string(), "-7");
    }

    #[test]
    fn memo_short_is_untouched() {
        let m = Memo::new("hello");
        assert!(!m.truncated);
        assert_eq!(m.value.as_str(), "hello");
    }

    #[test]
    fn memo_lengths_0_32_33_100() {
        let cases = [(0usize, false), (32, false), (33, true), (100, true)];
        for (len, expect_truncated) in cases {
            let text = "m".repeat(len);
            let m = Memo::new(&text);
            assert_eq!(m.truncated, expect_truncated, "len {}", len);
            assert_eq!(m.value.len(), len.min(32));
        }
    }

    #[test]
    fn memo_truncation_respects_char_boundaries() {
        // 31 ASCII bytes then a 3-byte character: the character straddles
        // byte 32 and must be dropped whole.
        let text = format!("{}€tail", "a".repeat(31));
        let m = Memo::new(&text);
        assert!(m.truncated);
        assert_eq!(m.value.as_str(), "a".repeat(31));
        assert!(m.value.len() <= 32);
    }

    #[test]
    fn memo_limit_is_capped_at_canonical() {
        let m = Memo::truncate_to(&"x".repeat(64), 1000);
        assert_eq!(m.value.len(), 32);
        let m = Memo::truncate_to("abcdef", 3);
        assert_eq!(m.value.as_str(), "abc");
        assert!(m.truncated);
    }

    #[test]
    fn slot_keys_parse_back() {
        for slot in [
            SignatureSlot::FeePayer,
            SignatureSlot::AccountUpdate(0),
            SignatureSlot::AccountUpdate(12),
        ] {
            assert_eq!(slot.key().parse::<SignatureSlot>().unwrap(), slot);
        }
        assert!("01".parse::<SignatureSlot>().is_err());
        assert!("-1".parse::<SignatureSlot>().is_err());
        assert!("fee".parse::<SignatureSlot>().is_err());
        assert!("".parse::<SignatureSlot>().is_err());
    }

    #[test]
    fn slot_ordering_puts_fee_payer_first() {
        let mut slots = vec![
            SignatureSlot::AccountUpdate(2),
            SignatureSlot::FeePayer,
            SignatureSlot::AccountUpdate(0),
        ];
        slots.sort();
        assert_eq!(
            slots,
            vec![
                SignatureSlot::FeePayer,
                SignatureSlot::AccountUpdate(0),
                SignatureSlot::AccountUpdate(2),
            ]
        );
    }

    #[test]
    fn authorization_kind_serde_names() {
        assert_eq!(
            serde_json::to_string(&AuthorizationKind::NoneGiven).unwrap(),
            "\"None\""
        );
        assert_eq!(
            serde_json::from_str::<AuthorizationKind>("\"Signature\"").unwrap(),
            AuthorizationKind::Signature
        );
    }
}
