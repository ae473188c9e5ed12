//! # The Append-Only Ledger Log
//!
//! One entry per line, space-separated:
//!
//! ```text
//! <hex_digest> <salt> <unix_timestamp> <command> <args...>
//! ```
//!
//! where `digest = seal(prev_digest, [salt, timestamp, command] ++ args)`
//! and must meet the configured leading-zero difficulty. The first entry
//! chains from an empty digest.
//!
//! ## Load
//!
//! [`HashChainJournal::open`] reads the whole file, reverifies every
//! entry's digest and difficulty against the running chain digest, and
//! parses each entry into a typed [`Command`]. Any mismatch, malformed
//! entry, or unrecognized command is fatal — a server must refuse to start
//! on a log it cannot fully trust, because partial replay is silent state
//! divergence.
//!
//! ## Append
//!
//! [`Journal::record`] serializes the command's canonical arguments, finds
//! a salt, writes one line, syncs, and advances the running digest. The
//! `Command` enum is the single source of truth for argument order on both
//! paths, so what replay parses is exactly what live traffic wrote.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::account::Authorization;
use crate::amount::Amount;
use crate::errors::{LedgerError, Result};
use crate::identity::AccountId;
use crate::sealing::{find_salt, meets_difficulty, seal};

/// Serialized form of an absent bracket upper bound.
const NONE_TOKEN: &str = "none";

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

/// The closed vocabulary of state transitions. Every mutation of the bank
/// is one of these, whether it arrives from live traffic or from replay.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Open a new account under `id` with a caller-chosen UUID.
    Open { id: AccountId, uuid: Uuid },
    /// Bind an additional identity to an existing account.
    AddAlias { account: AccountId, alias: AccountId },
    /// Set an account's authorization level.
    Authorize {
        author: AccountId,
        account: AccountId,
        level: Authorization,
    },
    /// Freeze or unfreeze an account.
    SetFrozen {
        author: AccountId,
        account: AccountId,
        frozen: bool,
    },
    /// Mint money into an account.
    PrintMoney {
        author: AccountId,
        account: AccountId,
        amount: Amount,
    },
    /// Destroy money held by an account.
    RemoveFunds {
        author: AccountId,
        account: AccountId,
        amount: Amount,
    },
    /// Move money between two accounts.
    Transfer {
        author: AccountId,
        source: AccountId,
        destination: AccountId,
        amount: Amount,
    },
    /// Register a multi-installment transfer.
    CreateRecurringTransfer {
        author: AccountId,
        source: AccountId,
        destination: AccountId,
        total: Amount,
        tick_count: u32,
        transfer_id: Uuid,
    },
    /// Apply one installment of a recurring transfer.
    PerformRecurringTransfer { transfer_id: Uuid, amount: Amount },
    /// Register an Ed25519 verification key (hex) on an account.
    AddPublicKey { account: AccountId, key: String },
    /// Grant `proxy` the right to act for `account`.
    AddProxy {
        author: AccountId,
        proxy: AccountId,
        account: AccountId,
    },
    /// Revoke `proxy`'s right to act for `account`.
    RemoveProxy {
        author: AccountId,
        proxy: AccountId,
        account: AccountId,
    },
    /// Drop an account and its recurring transfers from the store.
    DeleteAccount { author: AccountId, account: AccountId },
    /// Register a wealth-tax bracket.
    AddTaxBracket {
        author: AccountId,
        start: Amount,
        end: Option<Amount>,
        rate: Amount,
        name: String,
    },
    /// Remove a wealth-tax bracket by name.
    RemoveTaxBracket { author: AccountId, name: String },
    /// Flip the automatic-taxation switch.
    ToggleAutoTax { author: AccountId },
    /// Marker for a completed manual collection; resets the countdown.
    /// The collection's transfers precede this entry in the log.
    ForceTax { author: AccountId },
    /// Set an account's public-listing consent.
    MarkPublic {
        author: AccountId,
        account: AccountId,
        public: bool,
    },
    /// A scheduler tick. Installments and automatic collections triggered
    /// by the tick are logged as their own entries; this one only advances
    /// the clock and the tax countdown.
    Tick,
}

impl Command {
    /// The wire name of this command.
    pub fn name(&self) -> &'static str {
        match self {
            Command::Open { .. } => "open",
            Command::AddAlias { .. } => "add-alias",
            Command::Authorize { .. } => "authorize",
            Command::SetFrozen { .. } => "set-frozen",
            Command::PrintMoney { .. } => "print-money",
            Command::RemoveFunds { .. } => "remove-funds",
            Command::Transfer { .. } => "transfer",
            Command::CreateRecurringTransfer { .. } => "create-recurring-transfer",
            Command::PerformRecurringTransfer { .. } => "perform-recurring-transfer",
            Command::AddPublicKey { .. } => "add-public-key",
            Command::AddProxy { .. } => "add-proxy",
            Command::RemoveProxy { .. } => "remove-proxy",
            Command::DeleteAccount { .. } => "delete-account",
            Command::AddTaxBracket { .. } => "add-tax-bracket",
            Command::RemoveTaxBracket { .. } => "remove-tax-bracket",
            Command::ToggleAutoTax { .. } => "toggle-auto-tax",
            Command::ForceTax { .. } => "force-tax",
            Command::MarkPublic { .. } => "mark-public",
            Command::Tick => "tick",
        }
    }

    /// The canonical argument tokens, in wire order. Every token is
    /// whitespace-free: identities, UUIDs, `numerator/denominator`
    /// amounts, and single-token names.
    pub fn args(&self) -> Vec<String> {
        match self {
            Command::Open { id, uuid } => vec![id.to_string(), uuid.to_string()],
            Command::AddAlias { account, alias } => {
                vec![account.to_string(), alias.to_string()]
            }
            Command::Authorize {
                author,
                account,
                level,
            } => vec![author.to_string(), account.to_string(), level.to_string()],
            Command::SetFrozen {
                author,
                account,
                frozen,
            } => vec![author.to_string(), account.to_string(), frozen.to_string()],
            Command::PrintMoney {
                author,
                account,
                amount,
            } => vec![
                author.to_string(),
                account.to_string(),
                amount.ledger_form(),
            ],
            Command::RemoveFunds {
                author,
                account,
                amount,
            } => vec![
                author.to_string(),
                account.to_string(),
                amount.ledger_form(),
            ],
            Command::Transfer {
                author,
                source,
                destination,
                amount,
            } => vec![
                author.to_string(),
                source.to_string(),
                destination.to_string(),
                amount.ledger_form(),
            ],
            Command::CreateRecurringTransfer {
                author,
                source,
                destination,
                total,
                tick_count,
                transfer_id,
            } => vec![
                author.to_string(),
                source.to_string(),
                destination.to_string(),
                total.ledger_form(),
                tick_count.to_string(),
                transfer_id.to_string(),
            ],
            Command::PerformRecurringTransfer {
                transfer_id,
                amount,
            } => vec![transfer_id.to_string(), amount.ledger_form()],
            Command::AddPublicKey { account, key } => vec![account.to_string(), key.clone()],
            Command::AddProxy {
                author,
                proxy,
                account,
            } => vec![author.to_string(), proxy.to_string(), account.to_string()],
            Command::RemoveProxy {
                author,
                proxy,
                account,
            } => vec![author.to_string(), proxy.to_string(), account.to_string()],
            Command::DeleteAccount { author, account } => {
                vec![author.to_string(), account.to_string()]
            }
            Command::AddTaxBracket {
                author,
                start,
                end,
                rate,
                name,
            } => vec![
                author.to_string(),
                start.ledger_form(),
                end.as_ref()
                    .map(Amount::ledger_form)
                    .unwrap_or_else(|| NONE_TOKEN.to_string()),
                rate.ledger_form(),
                name.clone(),
            ],
            Command::RemoveTaxBracket { author, name } => {
                vec![author.to_string(), name.clone()]
            }
            Command::ToggleAutoTax { author } => vec![author.to_string()],
            Command::ForceTax { author } => vec![author.to_string()],
            Command::MarkPublic {
                author,
                account,
                public,
            } => vec![author.to_string(), account.to_string(), public.to_string()],
            Command::Tick => Vec::new(),
        }
    }

    /// Parses a command from its wire name and argument tokens. `line` is
    /// the 1-based log line, for error context.
    pub fn parse(name: &str, args: &[&str], line: usize) -> Result<Command> {
        let malformed = |reason: String| LedgerError::MalformedEntry { line, reason };
        let arity = |expected: usize| -> Result<()> {
            if args.len() != expected {
                Err(LedgerError::MalformedEntry {
                    line,
                    reason: format!(
                        "`{}` takes {} argument(s), got {}",
                        name,
                        expected,
                        args.len()
                    ),
                })
            } else {
                Ok(())
            }
        };
        let amount = |token: &str| -> Result<Amount> {
            token
                .parse()
                .map_err(|e| malformed(format!("bad amount: {}", e)))
        };
        let uuid = |token: &str| -> Result<Uuid> {
            token
                .parse()
                .map_err(|e| malformed(format!("bad uuid `{}`: {}", token, e)))
        };
        let flag = |token: &str| -> Result<bool> {
            match token {
                "true" => Ok(true),
                "false" => Ok(false),
                other => Err(malformed(format!("bad boolean `{}`", other))),
            }
        };

        match name {
            "open" => {
                arity(2)?;
                Ok(Command::Open {
                    id: AccountId::parse(args[0]),
                    uuid: uuid(args[1])?,
                })
            }
            "add-alias" => {
                arity(2)?;
                Ok(Command::AddAlias {
                    account: AccountId::parse(args[0]),
                    alias: AccountId::parse(args[1]),
                })
            }
            "authorize" => {
                arity(3)?;
                Ok(Command::Authorize {
                    author: AccountId::parse(args[0]),
                    account: AccountId::parse(args[1]),
                    level: args[2]
                        .parse()
                        .map_err(|e: String| malformed(e))?,
                })
            }
            "set-frozen" => {
                arity(3)?;
                Ok(Command::SetFrozen {
                    author: AccountId::parse(args[0]),
                    account: AccountId::parse(args[1]),
                    frozen: flag(args[2])?,
                })
            }
            "print-money" => {
                arity(3)?;
                Ok(Command::PrintMoney {
                    author: AccountId::parse(args[0]),
                    account: AccountId::parse(args[1]),
                    amount: amount(args[2])?,
                })
            }
            "remove-funds" => {
                arity(3)?;
                Ok(Command::RemoveFunds {
                    author: AccountId::parse(args[0]),
                    account: AccountId::parse(args[1]),
                    amount: amount(args[2])?,
                })
            }
            "transfer" => {
                arity(4)?;
                Ok(Command::Transfer {
                    author: AccountId::parse(args[0]),
                    source: AccountId::parse(args[1]),
                    destination: AccountId::parse(args[2]),
                    amount: amount(args[3])?,
                })
            }
            "create-recurring-transfer" => {
                arity(6)?;
                Ok(Command::CreateRecurringTransfer {
                    author: AccountId::parse(args[0]),
                    source: AccountId::parse(args[1]),
                    destination: AccountId::parse(args[2]),
                    total: amount(args[3])?,
                    tick_count: args[4]
                        .parse()
                        .map_err(|e| malformed(format!("bad tick count: {}", e)))?,
                    transfer_id: uuid(args[5])?,
                })
            }
            "perform-recurring-transfer" => {
                arity(2)?;
                Ok(Command::PerformRecurringTransfer {
                    transfer_id: uuid(args[0])?,
                    amount: amount(args[1])?,
                })
            }
            "add-public-key" => {
                arity(2)?;
                Ok(Command::AddPublicKey {
                    account: AccountId::parse(args[0]),
                    key: args[1].to_string(),
                })
            }
            "add-proxy" => {
                arity(3)?;
                Ok(Command::AddProxy {
                    author: AccountId::parse(args[0]),
                    proxy: AccountId::parse(args[1]),
                    account: AccountId::parse(args[2]),
                })
            }
            "remove-proxy" => {
                arity(3)?;
                Ok(Command::RemoveProxy {
                    author: AccountId::parse(args[0]),
                    proxy: AccountId::parse(args[1]),
                    account: AccountId::parse(args[2]),
                })
            }
            "delete-account" => {
                arity(2)?;
                Ok(Command::DeleteAccount {
                    author: AccountId::parse(args[0]),
                    account: AccountId::parse(args[1]),
                })
            }
            "add-tax-bracket" => {
                arity(5)?;
                Ok(Command::AddTaxBracket {
                    author: AccountId::parse(args[0]),
                    start: amount(args[1])?,
                    end: if args[2] == NONE_TOKEN {
                        None
                    } else {
                        Some(amount(args[2])?)
                    },
                    rate: amount(args[3])?,
                    name: args[4].to_string(),
                })
            }
            "remove-tax-bracket" => {
                arity(2)?;
                Ok(Command::RemoveTaxBracket {
                    author: AccountId::parse(args[0]),
                    name: args[1].to_string(),
                })
            }
            "toggle-auto-tax" => {
                arity(1)?;
                Ok(Command::ToggleAutoTax {
                    author: AccountId::parse(args[0]),
                })
            }
            "force-tax" => {
                arity(1)?;
                Ok(Command::ForceTax {
                    author: AccountId::parse(args[0]),
                })
            }
            "mark-public" => {
                arity(3)?;
                Ok(Command::MarkPublic {
                    author: AccountId::parse(args[0]),
                    account: AccountId::parse(args[1]),
                    public: flag(args[2])?,
                })
            }
            "tick" => {
                arity(0)?;
                Ok(Command::Tick)
            }
            other => Err(LedgerError::UnknownCommand {
                command: other.to_string(),
                line,
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Journal
// ---------------------------------------------------------------------------

/// Durable recording of accepted state transitions.
///
/// The accounting semantics live entirely above this trait; swapping the
/// backend cannot change what a command means. Sealing and verification
/// are private to [`HashChainJournal`].
pub trait Journal {
    /// Durably records one accepted command.
    fn record(&mut self, timestamp: i64, command: &Command) -> Result<()>;
}

// ---------------------------------------------------------------------------
// HashChainJournal
// ---------------------------------------------------------------------------

/// The hash-chained, append-only file journal.
pub struct HashChainJournal {
    path: PathBuf,
    difficulty: u32,
    last_digest: Vec<u8>,
}

impl HashChainJournal {
    /// Opens (or creates) the journal at `path`, verifying the whole chain
    /// and returning the parsed entries for replay.
    ///
    /// # Errors
    ///
    /// [`LedgerError::IntegrityViolation`] on a digest or difficulty
    /// failure, [`LedgerError::MalformedEntry`] /
    /// [`LedgerError::UnknownCommand`] on unparseable content. All are
    /// fatal by design.
    pub fn open(path: impl AsRef<Path>, difficulty: u32) -> Result<(Self, Vec<(i64, Command)>)> {
        let path = path.as_ref().to_path_buf();
        let mut contents = String::new();
        match File::open(&path) {
            Ok(mut file) => {
                file.read_to_string(&mut contents)?;
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // A fresh ledger: nothing to replay.
            }
            Err(e) => return Err(e.into()),
        }

        let mut last_digest: Vec<u8> = Vec::new();
        let mut entries = Vec::new();

        for (index, raw) in contents.lines().enumerate() {
            let line = index + 1;
            if raw.trim().is_empty() {
                continue;
            }
            let tokens: Vec<&str> = raw.split_whitespace().collect();
            if tokens.len() < 4 {
                return Err(LedgerError::MalformedEntry {
                    line,
                    reason: format!("expected at least 4 fields, got {}", tokens.len()),
                });
            }

            let stored_digest = hex::decode(tokens[0]).map_err(|e| LedgerError::MalformedEntry {
                line,
                reason: format!("bad digest hex: {}", e),
            })?;

            // The seal covers everything after the digest: salt, timestamp,
            // command, args.
            let expected = seal(&last_digest, tokens[1..].iter().copied());
            if stored_digest != expected {
                return Err(LedgerError::IntegrityViolation {
                    line,
                    reason: format!(
                        "digest mismatch: stored {}, computed {}",
                        tokens[0],
                        hex::encode(expected)
                    ),
                });
            }
            if !meets_difficulty(&stored_digest, difficulty) {
                return Err(LedgerError::IntegrityViolation {
                    line,
                    reason: format!("digest does not have {} leading zero bits", difficulty),
                });
            }

            let timestamp: i64 = tokens[2].parse().map_err(|e| LedgerError::MalformedEntry {
                line,
                reason: format!("bad timestamp `{}`: {}", tokens[2], e),
            })?;
            let command = Command::parse(tokens[3], &tokens[4..], line)?;

            last_digest = stored_digest;
            entries.push((timestamp, command));
        }

        tracing::info!(
            path = %path.display(),
            entries = entries.len(),
            difficulty,
            "ledger chain verified"
        );

        Ok((
            HashChainJournal {
                path,
                difficulty,
                last_digest,
            },
            entries,
        ))
    }

    /// The digest of the most recent entry (empty before the first).
    pub fn last_digest(&self) -> &[u8] {
        &self.last_digest
    }

    /// The configured leading-zero-bit target.
    pub fn difficulty(&self) -> u32 {
        self.difficulty
    }
}

impl Journal for HashChainJournal {
    fn record(&mut self, timestamp: i64, command: &Command) -> Result<()> {
        let mut fields: Vec<String> = vec![timestamp.to_string(), command.name().to_string()];
        fields.extend(command.args());

        let (salt, digest) = find_salt(
            &self.last_digest,
            fields.iter().map(String::as_str),
            self.difficulty,
        );

        let line = format!("{} {} {}\n", hex::encode(digest), salt, fields.join(" "));
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.sync_data()?;

        self.last_digest = digest.to_vec();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryJournal
// ---------------------------------------------------------------------------

/// An in-memory journal: no sealing, no durability. For tests and for
/// running the state machine as a plain library.
#[derive(Default)]
pub struct MemoryJournal {
    entries: Vec<(i64, Command)>,
}

impl MemoryJournal {
    /// An empty journal.
    pub fn new() -> Self {
        MemoryJournal::default()
    }

    /// Everything recorded so far, in order.
    pub fn entries(&self) -> &[(i64, Command)] {
        &self.entries
    }
}

impl Journal for MemoryJournal {
    fn record(&mut self, timestamp: i64, command: &Command) -> Result<()> {
        self.entries.push((timestamp, command.clone()));
        Ok(())
    }
}
