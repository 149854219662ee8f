//! # Pipeline Configuration & Constants
//!
//! Every magic number the pipeline depends on lives here, together with the
//! explicit [`PipelineConfig`] value that is threaded through the signing
//! coordinator, the submission gateway, and the local ledger.
//!
//! There is no process-wide "active network". Whoever builds a coordinator
//! or a gateway says which network it talks to, and signatures are domain
//! separated by that choice, so a devnet signature can never be replayed on
//! mainnet by accident.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::codec::Denomination;

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

/// Number of decimal places between the smallest unit and one whole unit.
/// `1 whole = 10^9 smallest units`.
pub const NATIVE_DECIMALS: u32 = 9;

/// Smallest units in one whole unit.
pub const UNITS_PER_WHOLE: u64 = 1_000_000_000;

/// Fee charged by the ledger for every account an update creates. Paid by
/// whoever funds the new account (see `fund_new_account`).
pub const ACCOUNT_CREATION_FEE: u64 = UNITS_PER_WHOLE;

// ---------------------------------------------------------------------------
// Transaction Limits
// ---------------------------------------------------------------------------

/// Maximum memo length in bytes, after UTF-8 encoding.
pub const MEMO_MAX_BYTES: usize = 32;

/// Upper bound on account updates in a single transaction.
pub const MAX_ACCOUNT_UPDATES: usize = 64;

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// How long the coordinator waits for an external signer to answer.
pub const DEFAULT_SIGNER_TIMEOUT: Duration = Duration::from_secs(30);

/// How long the gateway waits for the endpoint to acknowledge a submission.
pub const DEFAULT_SUBMIT_TIMEOUT: Duration = Duration::from_secs(60);

// ---------------------------------------------------------------------------
// Network
// ---------------------------------------------------------------------------

/// The ledger a transaction is meant for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    /// Production network.
    Mainnet,
    /// Public test network.
    Testnet,
    /// Developer network, also used by the in-memory local ledger.
    Devnet,
}

impl NetworkId {
    /// Lower-case name, as accepted by [`FromStr`].
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
            Self::Devnet => "devnet",
        }
    }

    /// Domain-separation prefix mixed into every signed message.
    pub fn signing_tag(&self) -> &'static [u8] {
        match self {
            Self::Mainnet => b"txkit/mainnet/v1\0",
            Self::Testnet => b"txkit/testnet/v1\0",
            Self::Devnet => b"txkit/devnet/v1\0",
        }
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for an unrecognized network name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown network: {0} (expected mainnet, testnet or devnet)")]
pub struct UnknownNetwork(pub String);

impl FromStr for NetworkId {
    type Err = UnknownNetwork;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            "devnet" => Ok(Self::Devnet),
            other => Err(UnknownNetwork(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Signer conventions
// ---------------------------------------------------------------------------

/// How a signer expects the restated fee payer fields to be expressed.
///
/// The pipeline itself speaks the canonical conventions (fee in whole units,
/// 32-byte memo). An external signer may differ, and the coordinator is the
/// one place where the two are reconciled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignerConventions {
    /// Denomination of the restated fee.
    pub fee_denomination: Denomination,
    /// Memo limit in bytes the signer truncates to.
    pub memo_limit: usize,
}

impl SignerConventions {
    /// The conventions of the canonical codec.
    pub const CANONICAL: Self = Self {
        fee_denomination: Denomination::WHOLE,
        memo_limit: MEMO_MAX_BYTES,
    };
}

impl Default for SignerConventions {
    fn default() -> Self {
        Self::CANONICAL
    }
}

// ---------------------------------------------------------------------------
// PipelineConfig
// ---------------------------------------------------------------------------

/// Explicit configuration for one pipeline instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Network whose signing domain and endpoint are used.
    pub network: NetworkId,
    /// Conventions of the external signer in use.
    pub signer: SignerConventions,
    /// Upper bound on one external signer round-trip.
    pub signer_timeout: Duration,
    /// Upper bound on one submission call.
    pub submit_timeout: Duration,
}

impl PipelineConfig {
    /// Configuration for `network` with canonical signer conventions and
    /// default timeouts.
    pub fn new(network: NetworkId) -> Self {
        Self {
            network,
            signer: SignerConventions::CANONICAL,
            signer_timeout: DEFAULT_SIGNER_TIMEOUT,
            submit_timeout: DEFAULT_SUBMIT_TIMEOUT,
        }
    }

    pub fn with_signer(mut self, signer: SignerConventions) -> Self {
        self.signer = signer;
        self
    }

    pub fn with_signer_timeout(mut self, timeout: Duration) -> Self {
        self.signer_timeout = timeout;
        self
    }

    pub fn with_submit_timeout(mut self, timeout: Duration) -> Self {
        self.submit_timeout = timeout;
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::new(NetworkId::Devnet)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_names_roundtrip() {
        for net in [NetworkId::Mainnet, NetworkId::Testnet, NetworkId::Devnet] {
            assert_eq!(net.as_str().parse::<NetworkId>().unwrap(), net);
        }
        assert_eq!(" DevNet ".parse::<NetworkId>().unwrap(), NetworkId::Devnet);
        assert!("berkeley".parse::<NetworkId>().is_err());
    }

    #[test]
    fn signing_tags_are_distinct() {
        assert_ne!(
            NetworkId::Mainnet.signing_tag(),
            NetworkId::Testnet.signing_tag()
        );
        assert_ne!(
            NetworkId::Testnet.signing_tag(),
            NetworkId::Devnet.signing_tag()
        );
    }

    #[test]
    fn account_creation_fee_is_one_whole_unit() {
        assert_eq!(UNITS_PER_WHOLE, 10u64.pow(NATIVE_DECIMALS));
        assert_eq!(ACCOUNT_CREATION_FEE, UNITS_PER_WHOLE);
    }

    #[test]
    fn default_config_uses_canonical_signer() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.network, NetworkId::Devnet);
        assert_eq!(cfg.signer, SignerConventions::CANONICAL);
        assert_eq!(cfg.signer.memo_limit, MEMO_MAX_BYTES);
    }

    #[test]
    fn network_serde_is_lowercase() {
        let json = serde_json::to_string(&NetworkId::Testnet).unwrap();
        assert_eq!(json, "\"testnet\"");
    }
}
