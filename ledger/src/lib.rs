// Copyright (c) 2026 Tally Contributors. MIT License.
// See LICENSE for details.

//! # Tally — Ledger-Backed Community Accounting
//!
//! Tally is the accounting engine behind a community virtual currency: it
//! tracks accounts, balances, authorization tiers, recurring transfers, and
//! wealth taxes — and it trusts none of its own storage. The entire server
//! state is a pure function of an append-only, hash-chained log. Corrupt one
//! byte of history and the server refuses to start, which is exactly what
//! you want from a currency run by volunteers on a VPS.
//!
//! ## Architecture
//!
//! The crate is split into modules that mirror the actual layers of the
//! system, mechanism at the bottom, policy at the top:
//!
//! - **sealing** — SHA3-256 chained digests and salt search. Single-writer
//!   proof-of-work: cheap to append, expensive to rewrite.
//! - **chain** — The append-only log: entry format, verify-on-load,
//!   seal-on-append, and the `Command` vocabulary shared by both.
//! - **amount** — Exact rational money. No floats near balances, ever.
//! - **identity** — Platform identities, proxy wrapping, alias resolution.
//! - **account** — Accounts, authorization tiers, the account store.
//! - **bank** — The accounting state machine. One `apply` handler serves
//!   replay and live traffic, so disk and memory cannot disagree.
//! - **tax** — Wealth-tax brackets and the auto-tax countdown.
//! - **server** — Composition: replay the log, then journal every accepted
//!   mutation. Also the recurring-transfer tick orchestration.
//! - **commands** — Authorization policy and the alias/proxy protocols.
//!   The state machine trusts its caller; this module is the caller.
//! - **signing** — The Ed25519 capability used by alias and proxy checks.
//! - **config** — Every constant in one place.
//!
//! ## Design Philosophy
//!
//! 1. Replay and live traffic share one code path. Divergence is a bug
//!    class we refuse to have.
//! 2. Money is a `BigRational`. Rounding drift is someone else's hobby.
//! 3. Policy sits above mechanism. The state machine never asks "may you?",
//!    only "can this happen?".
//! 4. If it touches a balance, it is logged and it has tests.

pub mod account;
pub mod amount;
pub mod bank;
pub mod chain;
pub mod commands;
pub mod config;
pub mod errors;
pub mod identity;
pub mod sealing;
pub mod server;
pub mod signing;
pub mod tax;

pub use amount::Amount;
pub use errors::{LedgerError, Result};
pub use identity::AccountId;
pub use server::LedgerServer;
