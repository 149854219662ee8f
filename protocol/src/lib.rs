// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # txkit: zkApp Transaction Pipeline
//!
//! Builds a multi-party transaction, turns it into canonical text, collects
//! signatures locally or from an external signer, and submits it.
//!
//! ## Architecture
//!
//! Leaf-first:
//!
//! - **config**: protocol constants, networks and the explicit
//!   [`PipelineConfig`](config::PipelineConfig).
//! - **crypto**: Ed25519 keys, BLAKE3 hashing, domain-separated signatures.
//! - **transaction**: fee payer plus ordered account updates, and the
//!   [`SignedTransaction`](transaction::SignedTransaction) that only exists
//!   once every slot is signed.
//! - **codec**: deterministic text form and exact amount conversion.
//! - **signing**: the local and external-signer flows, reconciled in one
//!   place.
//! - **submission**: the gateway, an in-memory ledger and a JSON-RPC
//!   endpoint.
//! - **error**: [`PipelineError`](error::PipelineError) over all of the
//!   above.
//!
//! ## Flow
//!
//! ```text
//! TransactionBuilder ─► Transaction ─► codec::encode ─► SigningCoordinator
//!                                                           │
//!                          SubmissionGateway ◄─ SignedTransaction
//! ```
//!
//! Signatures commit to the network they were made for. A transaction signed
//! for devnet never verifies on mainnet, and the gateway refuses to send it.

pub mod codec;
pub mod config;
pub mod crypto;
pub mod error;
pub mod signing;
pub mod submission;
pub mod transaction;

pub use codec::{CanonicalText, Decoded};
pub use config::{NetworkId, PipelineConfig};
pub use error::PipelineError;
pub use signing::{SigningCoordinator, SigningFlow};
pub use submission::{SubmissionGateway, SubmissionResult};
pub use transaction::{SignedTransaction, Transaction, TransactionBuilder};
