// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # txkit
//!
//! Entry point for the `txkit` binary. Each subcommand is one pipeline step:
//!
//! - `keygen`  generate a keypair
//! - `build`   write unsigned canonical text
//! - `sign`    sign canonical text with local keys
//! - `inspect` decode and summarize canonical text
//! - `submit`  send signed canonical text to a JSON-RPC node
//!
//! Files are written and read byte-for-byte; stdout is used when no output
//! file is given.

mod cli;
mod logging;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;

use txkit_protocol::codec::{self, CanonicalText, Decoded};
use txkit_protocol::config::{NetworkId, PipelineConfig};
use txkit_protocol::crypto::keys::Keypair;
use txkit_protocol::submission::{HttpEndpoint, SubmissionGateway};
use txkit_protocol::transaction::{Memo, TransactionBuilder};
use txkit_protocol::SigningCoordinator;

use cli::{BuildArgs, Commands, InspectArgs, KeygenArgs, SignArgs, SubmitArgs, TxkitCli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = TxkitCli::parse();
    logging::init_logging("txkit=info,txkit_protocol=info", cli.log_format);

    match cli.command {
        Commands::Keygen(args) => keygen(args),
        Commands::Build(args) => build(args),
        Commands::Sign(args) => sign(args, cli.network),
        Commands::Inspect(args) => inspect(args, cli.network),
        Commands::Submit(args) => submit(args, cli.network).await,
    }
}

fn keygen(args: KeygenArgs) -> Result<()> {
    let keypair = Keypair::generate();
    match args.out {
        Some(path) => {
            std::fs::write(&path, keypair.secret_key_hex())
                .with_context(|| format!("failed to write secret key to {}", path.display()))?;
            println!("{}", keypair.public_key());
            tracing::info!(path = %path.display(), "secret key written");
        }
        None => {
            let out = serde_json::json!({
                "publicKey": keypair.public_key().to_string(),
                "secretKey": keypair.secret_key_hex(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }
    Ok(())
}

fn build(args: BuildArgs) -> Result<()> {
    let memo = Memo::new(&args.memo);
    if memo.truncated {
        tracing::warn!(
            kept = memo.value.len(),
            given = args.memo.len(),
            "memo truncated"
        );
    }

    let mut builder = TransactionBuilder::new(args.sender, args.fee)
        .nonce(args.nonce)
        .memo(memo.value);
    if let Some(slot) = args.valid_until {
        builder = builder.valid_until(slot);
    }
    if !args.fund_new.is_empty() {
        builder = builder.fund_new_account(args.fund_new.len() as u64);
    }
    for transfer in &args.fund_new {
        builder = builder.send_to_new_account(transfer.to, transfer.amount);
    }
    for transfer in &args.sends {
        builder = builder.send(transfer.to, transfer.amount);
    }
    let tx = builder.build().context("invalid transaction")?;

    write_output(args.out.as_deref(), &codec::encode(&tx))?;
    tracing::info!(
        hash = %tx.hash(),
        updates = tx.account_updates().len(),
        "transaction built"
    );
    Ok(())
}

fn sign(args: SignArgs, network: NetworkId) -> Result<()> {
    let tx = read_input(&args.input)?.into_transaction();
    let keys = args
        .secret_keys
        .iter()
        .map(|hex| Keypair::from_secret_hex(hex.trim()))
        .collect::<Result<Vec<_>, _>>()
        .context("invalid secret key")?;

    let coordinator = SigningCoordinator::new(PipelineConfig::new(network));
    let signed = coordinator
        .sign_local(tx, &keys)
        .context("signing failed")?;

    write_output(args.out.as_deref(), &codec::encode(&signed))
}

fn inspect(args: InspectArgs, network: NetworkId) -> Result<()> {
    let decoded = read_input(&args.input)?;
    let tx = decoded.transaction();
    print!("{}", tx.to_pretty());

    let missing = tx.missing_signatures();
    if missing.is_empty() {
        println!("signatures  complete");
    } else {
        let names: Vec<String> = missing.iter().map(ToString::to_string).collect();
        println!("signatures  missing {}", names.join(", "));
    }

    if args.verify {
        match &decoded {
            Decoded::Signed(signed) => {
                signed
                    .verify(network)
                    .with_context(|| format!("signatures do not verify on {}", network))?;
                println!("verified    {}", network);
            }
            Decoded::Unsigned(_) => bail!("cannot verify an incompletely signed transaction"),
        }
    }
    Ok(())
}

async fn submit(args: SubmitArgs, network: NetworkId) -> Result<()> {
    let signed = match read_input(&args.input)? {
        Decoded::Signed(signed) => signed,
        Decoded::Unsigned(tx) => bail!(
            "transaction is missing signatures for {:?}",
            tx.missing_signatures()
        ),
    };

    let timeout = Duration::from_secs(args.timeout_secs);
    let endpoint = HttpEndpoint::with_timeout(&args.rpc_url, network, timeout)?;
    if args.check_network {
        let serves = endpoint
            .query_network()
            .await
            .with_context(|| format!("failed to query {}", args.rpc_url))?;
        if serves != network {
            bail!("{} serves {}, not {}", args.rpc_url, serves, network);
        }
    }

    let config = PipelineConfig::new(network).with_submit_timeout(timeout);
    let gateway = SubmissionGateway::new(config, Arc::new(endpoint));
    let receipt = gateway
        .submit(&signed)
        .await
        .into_result()
        .context("submission rejected")?;

    println!("{}", serde_json::to_string_pretty(&receipt)?);
    Ok(())
}

fn read_input(path: &Path) -> Result<Decoded> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let decoded = codec::decode_reporting(&text)
        .with_context(|| format!("failed to decode {}", path.display()))?;
    if decoded.truncated {
        tracing::warn!(
            path = %path.display(),
            "memo longer than 32 bytes was truncated; existing signatures will not verify"
        );
    }
    Ok(decoded.value)
}

fn write_output(path: Option<&Path>, text: &CanonicalText) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, text.as_bytes())
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            println!("{}", text);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use txkit_protocol::transaction::SignedTransaction;

    fn write_unsigned(dir: &Path, sender: &Keypair) -> std::path::PathBuf {
        let to = Keypair::from_seed(&[9u8; 32]).public_key();
        let path = dir.join("unsigned.json");
        build(BuildArgs {
            sender: sender.public_key(),
            fee: 150_000_000,
            nonce: 0,
            memo: "cli".into(),
            valid_until: None,
            sends: Vec::new(),
            fund_new: vec![cli::Transfer {
                to,
                amount: 1_000_000_000,
            }],
            out: Some(path.clone()),
        })
        .unwrap();
        path
    }

    #[test]
    fn build_then_sign_round_trips_through_files() {
        let dir = tempfile::tempdir().unwrap();
        let sender = Keypair::from_seed(&[1u8; 32]);
        let unsigned = write_unsigned(dir.path(), &sender);
        assert!(!read_input(&unsigned).unwrap().is_signed());

        let signed_path = dir.path().join("signed.json");
        sign(
            SignArgs {
                input: unsigned,
                secret_keys: vec![sender.secret_key_hex()],
                out: Some(signed_path.clone()),
            },
            NetworkId::Devnet,
        )
        .unwrap();

        let bytes = std::fs::read_to_string(&signed_path).unwrap();
        let signed: SignedTransaction = codec::decode(&bytes).unwrap().into_signed().unwrap();
        assert!(signed.verify(NetworkId::Devnet).is_ok());
        assert_eq!(codec::encode(&signed).as_str(), bytes);

        inspect(
            InspectArgs {
                input: signed_path,
                verify: true,
            },
            NetworkId::Devnet,
        )
        .unwrap();
    }

    #[test]
    fn sign_with_wrong_key_fails() {
        let dir = tempfile::tempdir().unwrap();
        let sender = Keypair::from_seed(&[1u8; 32]);
        let unsigned = write_unsigned(dir.path(), &sender);
        let other = Keypair::from_seed(&[2u8; 32]);
        let result = sign(
            SignArgs {
                input: unsigned,
                secret_keys: vec![other.secret_key_hex()],
                out: Some(dir.path().join("signed.json")),
            },
            NetworkId::Devnet,
        );
        assert!(result.is_err());
    }

    #[test]
    fn over_long_memo_still_reads() {
        let dir = tempfile::tempdir().unwrap();
        let sender = Keypair::from_seed(&[1u8; 32]);
        let unsigned = write_unsigned(dir.path(), &sender);
        let text = std::fs::read_to_string(&unsigned).unwrap();
        let long = "x".repeat(40);
        std::fs::write(
            &unsigned,
            text.replace("\"memo\":\"cli\"", &format!("\"memo\":\"{}\"", long)),
        )
        .unwrap();

        let decoded = read_input(&unsigned).unwrap();
        assert_eq!(decoded.transaction().fee_payer().memo.as_str(), &long[..32]);
    }
}
