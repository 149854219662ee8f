//! # CLI Interface
//!
//! Command-line structure for `txkit` using `clap` derive. Each subcommand
//! is one step of the pipeline and reads or writes canonical text files.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use txkit_protocol::codec::Denomination;
use txkit_protocol::config::NetworkId;
use txkit_protocol::crypto::keys::PublicKey;

use crate::logging::LogFormat;

/// Build, sign, inspect and submit zkApp transactions.
#[derive(Parser, Debug)]
#[command(name = "txkit", version, propagate_version = true)]
pub struct TxkitCli {
    /// Network whose signing domain and endpoint are used.
    #[arg(long, global = true, env = "TXKIT_NETWORK", default_value = "devnet")]
    pub network: NetworkId,

    /// Log output format. Logs go to stderr.
    #[arg(long, global = true, value_enum, default_value = "pretty")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a fresh Ed25519 keypair.
    Keygen(KeygenArgs),
    /// Build an unsigned transaction and write its canonical text.
    Build(BuildArgs),
    /// Sign a transaction file with local keys.
    Sign(SignArgs),
    /// Decode a transaction file and print a summary.
    Inspect(InspectArgs),
    /// Submit a signed transaction file to a node.
    Submit(SubmitArgs),
}

#[derive(Args, Debug)]
pub struct KeygenArgs {
    /// Write the secret key (hex) to this file instead of stdout.
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Fee payer public key (Base58Check).
    #[arg(long)]
    pub sender: PublicKey,

    /// Fee in whole units, e.g. `0.15`.
    #[arg(long, value_parser = parse_whole_amount)]
    pub fee: u64,

    /// Fee payer nonce.
    #[arg(long, default_value_t = 0)]
    pub nonce: u64,

    /// Memo. Truncated to 32 bytes with a warning.
    #[arg(long, default_value = "")]
    pub memo: String,

    /// Last global slot at which the transaction is valid.
    #[arg(long)]
    pub valid_until: Option<u32>,

    /// Transfer to an existing account, as `PUBLIC_KEY:AMOUNT` in whole
    /// units. Repeatable.
    #[arg(long = "send", value_parser = parse_transfer)]
    pub sends: Vec<Transfer>,

    /// Transfer to an account this transaction creates. The account
    /// creation fee is debited from the sender. Repeatable.
    #[arg(long = "fund-new", value_parser = parse_transfer)]
    pub fund_new: Vec<Transfer>,

    /// Output file. Stdout when omitted.
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SignArgs {
    /// Transaction file to sign.
    #[arg(long = "in", short = 'i')]
    pub input: PathBuf,

    /// Hex Ed25519 secret keys, comma separated. Every required slot must
    /// be covered by one of them.
    #[arg(
        long = "secret-key",
        env = "TXKIT_SECRET_KEY",
        hide_env_values = true,
        value_delimiter = ',',
        required = true
    )]
    pub secret_keys: Vec<String>,

    /// Output file. Stdout when omitted.
    #[arg(long, short = 'o')]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Transaction file to decode.
    #[arg(long = "in", short = 'i')]
    pub input: PathBuf,

    /// Also check signatures against `--network`.
    #[arg(long)]
    pub verify: bool,
}

#[derive(Args, Debug)]
pub struct SubmitArgs {
    /// Signed transaction file.
    #[arg(long = "in", short = 'i')]
    pub input: PathBuf,

    /// JSON-RPC endpoint of the node.
    #[arg(long, env = "TXKIT_RPC_URL", default_value = "http://127.0.0.1:3085")]
    pub rpc_url: String,

    /// Submission timeout in seconds.
    #[arg(long, default_value_t = 60)]
    pub timeout_secs: u64,

    /// Ask the node which network it serves before submitting.
    #[arg(long)]
    pub check_network: bool,
}

/// One `PUBLIC_KEY:AMOUNT` argument.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub to: PublicKey,
    /// Smallest units.
    pub amount: u64,
}

fn parse_whole_amount(s: &str) -> Result<u64, String> {
    Denomination::WHOLE.parse(s).map_err(|e| e.to_string())
}

fn parse_transfer(s: &str) -> Result<Transfer, String> {
    let (to, amount) = s
        .split_once(':')
        .ok_or_else(|| format!("expected PUBLIC_KEY:AMOUNT, got {:?}", s))?;
    Ok(Transfer {
        to: to.parse().map_err(|e| format!("{}", e))?,
        amount: parse_whole_amount(amount)?,
    })
}
