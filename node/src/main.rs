// Copyright (c) 2026 Tally Contributors. MIT License.
// See LICENSE for details.

//! # Tally Ledger Daemon
//!
//! Entry point for the `tallyd` binary. Parses CLI arguments, initializes
//! logging, replays the ledger, and runs the daemon loop: a tick interval
//! driving the recurring-transfer and tax schedulers, and an operator REPL
//! on stdin.
//!
//! The binary supports three subcommands:
//!
//! - `run`     — start the daemon
//! - `init`    — create an empty ledger file
//! - `version` — print build version information
//!
//! The core is synchronous and single-writer. The `select!` loop below is
//! the writer: ticks and REPL lines are serialized through it, so the
//! server never needs a lock.

mod cli;
mod repl;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tally_ledger::LedgerServer;

use cli::{Commands, InitArgs, LogFormat, RunArgs, TallyCli};
use repl::Outcome;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = TallyCli::parse();

    match cli.command {
        Commands::Run(args) => run_node(args).await,
        Commands::Init(args) => init_node(args),
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Installs the global `tracing` subscriber. Logs go to stderr, leaving
/// stdout to the REPL; `RUST_LOG` overrides the default filter.
fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("tally_node=info,tally_ledger=info"));
    let stderr = fmt::layer().with_writer(std::io::stderr).with_target(true);
    let registry = tracing_subscriber::registry().with(filter);
    match format {
        LogFormat::Pretty => registry.with(stderr).init(),
        LogFormat::Json => registry.with(stderr.json()).init(),
    }
}

/// Starts the daemon: replay, then serve ticks and REPL lines.
async fn run_node(args: RunArgs) -> Result<()> {
    init_logging(args.log_format);

    tracing::info!(
        ledger = %args.ledger.display(),
        difficulty = args.difficulty,
        tick_interval_secs = args.tick_interval_secs,
        "starting tallyd"
    );

    let mut server = LedgerServer::open(&args.ledger, args.difficulty)
        .with_context(|| format!("failed to open ledger at {}", args.ledger.display()))?;

    let mut ticker = tokio::time::interval(Duration::from_secs(args.tick_interval_secs));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first interval tick fires immediately; the ledger already
    // advanced on its last run, so swallow it.
    ticker.tick().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("tallyd ready; type `help`");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let now = Utc::now().timestamp();
                if let Err(error) = server.notify_tick_elapsed(now) {
                    tracing::error!(%error, "tick failed");
                }
            }
            line = lines.next_line() => {
                match line.context("failed to read from stdin")? {
                    Some(line) => {
                        let now = Utc::now().timestamp();
                        match repl::dispatch(&mut server, &line, now) {
                            Outcome::Reply(reply) => {
                                if !reply.is_empty() {
                                    println!("{}", reply);
                                }
                            }
                            Outcome::Quit => break,
                        }
                    }
                    None => break,
                }
            }
            _ = signal::ctrl_c() => {
                tracing::info!("interrupt received");
                break;
            }
        }
    }

    tracing::info!("tallyd shut down cleanly");
    Ok(())
}

/// Creates an empty ledger file, refusing to clobber an existing one.
fn init_node(args: InitArgs) -> Result<()> {
    if args.ledger.exists() {
        bail!("refusing to overwrite existing ledger {}", args.ledger.display());
    }
    if let Some(parent) = args.ledger.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    std::fs::File::create(&args.ledger)
        .with_context(|| format!("failed to create {}", args.ledger.display()))?;
    println!("initialized empty ledger at {}", args.ledger.display());
    Ok(())
}

/// Prints version information.
fn print_version() {
    println!("tallyd {}", env!("CARGO_PKG_VERSION"));
}
