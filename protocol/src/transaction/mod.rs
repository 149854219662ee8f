//! # Transaction Module
//!
//! The transaction model: one fee payer, an ordered list of account updates,
//! and the signatures collected for them.
//!
//! ## Architecture
//!
//! ```text
//! types.rs        Value types (AuthorizationKind, BalanceChange, Memo, SignatureSlot)
//! builder.rs      Transaction, UpdateSpec and the fluent TransactionBuilder
//! validation.rs   Construction invariants shared by the builder and the codec
//! signed.rs       SignedTransaction, the immutable fully signed form
//! ```
//!
//! ## Transaction Lifecycle
//!
//! 1. **Build**: [`TransactionBuilder`] or [`build`] from intent.
//! 2. **Round-trip**: zero or more trips through canonical text.
//! 3. **Sign**: signatures accumulate per [`SignatureSlot`].
//! 4. **Finalize**: [`SignedTransaction::finalize`] once no slot is missing.
//! 5. **Submit**: once. The nonce makes resubmission of the same bytes
//!    invalid.
//!
//! ## Design Decisions
//!
//! - All amounts are `u64` in the smallest unit. No floating point anywhere
//!   near monetary values.
//! - A zero balance change is always positive, so "no change" has a single
//!   canonical form.
//! - The memo is truncated, never rejected, and the truncation is reported
//!   through [`Truncated`].

pub mod builder;
pub mod signed;
pub mod types;
pub mod validation;

pub use builder::{build, AccountUpdate, FeePayer, Transaction, TransactionBuilder, UpdateSpec};
pub use signed::SignedTransaction;
pub use types::{AuthorizationKind, BalanceChange, Memo, Sign, SignatureSlot, Truncated};
pub use validation::ValidationError;
