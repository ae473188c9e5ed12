//! Error types for the Tally accounting engine.
//!
//! One tagged enum for every failure mode, so callers (and the presentation
//! layers above them) can phrase an `AccountNotFound` differently from an
//! `Unauthorized` without string-matching on messages. Integrity failures
//! are deliberately separate from invariant failures: the former mean the
//! log cannot be trusted and the server must not start, the latter mean a
//! single operation was rejected and state is unchanged.

use thiserror::Error;

use crate::amount::Amount;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Errors that can occur in the accounting engine.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// An account with this identity already exists (`open` on a taken id).
    #[error("account `{0}` already exists")]
    AccountExists(String),

    /// No account resolves to this identity.
    #[error("no such account: `{0}`")]
    AccountNotFound(String),

    /// No recurring transfer with this id is active.
    #[error("no such recurring transfer: `{0}`")]
    TransferNotFound(String),

    /// No tax bracket registered under this name.
    #[error("no such tax bracket: `{0}`")]
    BracketNotFound(String),

    /// The policy layer rejected the operation. Never raised by the state
    /// machine itself — mechanism trusts its caller.
    #[error("`{author}` is not authorized to {action}")]
    Unauthorized {
        /// The acting identity that was refused.
        author: String,
        /// Human-readable description of the refused operation.
        action: String,
    },

    /// A non-positive amount where a positive one is required.
    #[error("invalid amount: {0}")]
    InvalidAmount(Amount),

    /// The source account cannot cover the requested amount.
    #[error("insufficient balance on `{account}`: have {balance}, need {required}")]
    InsufficientBalance {
        /// The account that would go negative.
        account: String,
        /// Its current balance.
        balance: Amount,
        /// The amount the operation needed.
        required: Amount,
    },

    /// The account is frozen and cannot take part in transfers.
    #[error("account `{0}` is frozen")]
    Frozen(String),

    /// A tax bracket with `start > end`, or an otherwise nonsensical rate.
    #[error("invalid tax bracket `{name}`: {reason}")]
    InvalidBracket {
        /// Name of the offending bracket.
        name: String,
        /// What exactly is wrong with it.
        reason: String,
    },

    /// An alias or proxy signature failed verification.
    #[error("signature verification failed")]
    InvalidSignature,

    /// A stored digest does not match the recomputed chain digest, or does
    /// not meet the difficulty target. Fatal on load: the log has been
    /// tampered with (or truncated mid-entry) and must not be trusted.
    #[error("ledger integrity violation at line {line}: {reason}")]
    IntegrityViolation {
        /// 1-based line number of the offending entry.
        line: usize,
        /// What the verifier found.
        reason: String,
    },

    /// An entry that cannot be tokenized into the expected fields.
    #[error("malformed ledger entry at line {line}: {reason}")]
    MalformedEntry {
        /// 1-based line number of the offending entry.
        line: usize,
        /// What failed to parse.
        reason: String,
    },

    /// A command name the replay dispatcher does not recognize. Fatal on
    /// load — skipping entries would silently diverge state from the log.
    #[error("unknown ledger command `{command}` at line {line}")]
    UnknownCommand {
        /// The unrecognized command token.
        command: String,
        /// 1-based line number of the offending entry.
        line: usize,
    },

    /// The underlying ledger file could not be read or written.
    #[error("ledger I/O error: {0}")]
    Io(#[from] std::io::Error),
}
