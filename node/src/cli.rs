//! # CLI Interface
//!
//! Defines the command-line argument structure for `tallyd` using `clap`
//! derive. Supports three subcommands: `run`, `init`, and `version`.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use tally_ledger::config::{
    DEFAULT_DIFFICULTY_BITS, DEFAULT_LEDGER_FILE, DEFAULT_TICK_INTERVAL_SECS,
};

/// Tally ledger daemon.
///
/// Runs the single authoritative writer for a community currency: replays
/// the hash-chained ledger on startup, ticks the recurring-transfer and
/// tax schedulers, and serves an operator REPL on stdin.
#[derive(Parser, Debug)]
#[command(
    name = "tallyd",
    about = "Tally ledger daemon",
    version,
    propagate_version = true
)]
pub struct TallyCli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the `tallyd` binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the ledger daemon.
    Run(RunArgs),
    /// Initialize a data directory with an empty ledger.
    Init(InitArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the ledger file.
    #[arg(long, short = 'l', env = "TALLY_LEDGER", default_value = DEFAULT_LEDGER_FILE)]
    pub ledger: PathBuf,

    /// Leading-zero-bit difficulty for sealed entries.
    ///
    /// Must match the difficulty the ledger was written at; entries below
    /// the target are rejected on load.
    #[arg(long, env = "TALLY_DIFFICULTY", default_value_t = DEFAULT_DIFFICULTY_BITS)]
    pub difficulty: u32,

    /// Seconds between scheduler ticks.
    #[arg(long, env = "TALLY_TICK_INTERVAL", default_value_t = DEFAULT_TICK_INTERVAL_SECS)]
    pub tick_interval_secs: u64,

    /// Log output format.
    #[arg(long, env = "TALLY_LOG_FORMAT", value_enum, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Log output format. Both go to stderr; stdout belongs to the REPL.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable output for an operator terminal.
    Pretty,
    /// JSON lines for log aggregation.
    Json,
}

/// Arguments for the `init` subcommand.
#[derive(Parser, Debug)]
pub struct InitArgs {
    /// Path of the ledger file to create.
    #[arg(long, short = 'l', default_value = DEFAULT_LEDGER_FILE)]
    pub ledger: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(argv: &[&str]) -> RunArgs {
        match TallyCli::try_parse_from(argv).unwrap().command {
            Commands::Run(args) => args,
            other => panic!("expected run, parsed {:?}", other),
        }
    }

    #[test]
    fn run_defaults() {
        let args = run_args(&["tallyd", "run"]);
        assert_eq!(args.difficulty, DEFAULT_DIFFICULTY_BITS);
        assert_eq!(args.tick_interval_secs, DEFAULT_TICK_INTERVAL_SECS);
        assert_eq!(args.log_format, LogFormat::Pretty);
    }

    #[test]
    fn log_format_is_a_typed_value() {
        let args = run_args(&["tallyd", "run", "--log-format", "json"]);
        assert_eq!(args.log_format, LogFormat::Json);
        assert!(TallyCli::try_parse_from(["tallyd", "run", "--log-format", "yaml"]).is_err());
    }
}
