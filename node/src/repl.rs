//! # Operator REPL
//!
//! A line-oriented command interpreter over the policy layer. Commands
//! run as the government account by default; prefix a line with
//! `as <identity>` to act as someone else (including by proxy, e.g.
//! `as bob:alice ...`), which exercises exactly the authorization checks
//! a chat front-end would.

use tally_ledger::account::Authorization;
use tally_ledger::chain::Journal;
use tally_ledger::commands;
use tally_ledger::identity::AccountId;
use tally_ledger::{Amount, LedgerServer};

const DEFAULT_AUTHOR: &str = "@government";

const HELP: &str = "\
commands (prefix with `as <identity>` to act as someone else):
  open <id>                                  open an account
  balance <id>                               show a balance
  transfer <source> <dest> <amount>          move money
  recurring <source> <dest> <amount> <ticks> transfer <amount> per tick
  print <account> <amount>                   mint money (admin)
  burn <account> <amount>                    destroy money (admin)
  freeze <id> | unfreeze <id>                freeze controls (admin)
  authorize <id> <level>                     set authorization level
  proxy-add <account> <proxy>                grant a proxy (admin)
  proxy-remove <account> <proxy>             revoke a proxy (admin)
  request-alias <new-id>                     start alias linking
  add-alias <account> <signature>            finish alias linking
  public <id>                                toggle public listing
  accounts | public-list | supply            listings and aggregates
  bracket-add <name> <start> <end|none> <rate>
  bracket-remove <name>                      tax bracket admin
  tax | tax? | autotax                       collect / preview / toggle
  tick [n]                                   force scheduler ticks (admin)
  delete <id>                                delete an account (admin)
  help | quit";

/// What the loop should do after one line.
pub enum Outcome {
    /// Print this and keep reading.
    Reply(String),
    /// Leave the loop.
    Quit,
}

/// Executes one REPL line against the server at time `now`.
pub fn dispatch<J: Journal>(server: &mut LedgerServer<J>, line: &str, now: i64) -> Outcome {
    let mut tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.is_empty() {
        return Outcome::Reply(String::new());
    }
    if matches!(tokens[0], "quit" | "exit") {
        return Outcome::Quit;
    }

    let author = if tokens[0] == "as" && tokens.len() >= 2 {
        let author = AccountId::parse(tokens[1]);
        tokens.drain(..2);
        author
    } else {
        AccountId::parse(DEFAULT_AUTHOR)
    };
    if tokens.is_empty() {
        return Outcome::Reply("missing command after `as <identity>`".to_string());
    }

    match execute(server, &author, &tokens, now) {
        Ok(reply) => Outcome::Reply(reply),
        Err(message) => Outcome::Reply(format!("error: {}", message)),
    }
}

fn execute<J: Journal>(
    server: &mut LedgerServer<J>,
    author: &AccountId,
    tokens: &[&str],
    now: i64,
) -> Result<String, String> {
    let arity = |expected: usize| -> Result<(), String> {
        if tokens.len() - 1 != expected {
            Err(format!(
                "`{}` takes {} argument(s); see `help`",
                tokens[0], expected
            ))
        } else {
            Ok(())
        }
    };
    let id = |token: &str| AccountId::parse(token);
    let amount = |token: &str| -> Result<Amount, String> {
        token.parse().map_err(|e| format!("{}", e))
    };
    let fail = |e: tally_ledger::LedgerError| e.to_string();

    match tokens[0] {
        "help" => Ok(HELP.to_string()),
        "open" => {
            arity(1)?;
            let account = id(tokens[1]);
            commands::open_account(server, author, &account, now).map_err(fail)?;
            Ok(format!("opened {}", account.readable()))
        }
        "balance" => {
            arity(1)?;
            let account = id(tokens[1]);
            let balance = commands::balance(server, author, &account).map_err(fail)?;
            Ok(format!("{} holds {}", account.readable(), balance))
        }
        "transfer" => {
            arity(3)?;
            let (source, dest) = (id(tokens[1]), id(tokens[2]));
            let amount = amount(tokens[3])?;
            commands::transfer(server, author, &source, &dest, amount.clone(), now)
                .map_err(fail)?;
            Ok(format!(
                "transferred {} from {} to {}",
                amount,
                source.readable(),
                dest.readable()
            ))
        }
        "recurring" => {
            arity(4)?;
            let (source, dest) = (id(tokens[1]), id(tokens[2]));
            let per_tick = amount(tokens[3])?;
            let ticks: u32 = tokens[4].parse().map_err(|_| "bad tick count".to_string())?;
            let transfer_id = commands::create_recurring_transfer(
                server, author, &source, &dest, per_tick, ticks, now,
            )
            .map_err(fail)?;
            Ok(format!("recurring transfer {} registered", transfer_id))
        }
        "print" => {
            arity(2)?;
            let account = id(tokens[1]);
            let amount = amount(tokens[2])?;
            commands::print_money(server, author, &account, amount.clone(), now).map_err(fail)?;
            Ok(format!("printed {} into {}", amount, account.readable()))
        }
        "burn" => {
            arity(2)?;
            let account = id(tokens[1]);
            let amount = amount(tokens[2])?;
            commands::remove_funds(server, author, &account, amount.clone(), now).map_err(fail)?;
            Ok(format!("removed {} from {}", amount, account.readable()))
        }
        "freeze" | "unfreeze" => {
            arity(1)?;
            let account = id(tokens[1]);
            if tokens[0] == "freeze" {
                commands::freeze_account(server, author, &account, now).map_err(fail)?;
            } else {
                commands::unfreeze_account(server, author, &account, now).map_err(fail)?;
            }
            Ok(format!("{} {}d", account.readable(), tokens[0]))
        }
        "authorize" => {
            arity(2)?;
            let account = id(tokens[1]);
            let level: Authorization = tokens[2].parse()?;
            commands::authorize(server, author, &account, level, now).map_err(fail)?;
            Ok(format!("{} is now {}", account.readable(), level))
        }
        "proxy-add" => {
            arity(2)?;
            let (account, proxy) = (id(tokens[1]), id(tokens[2]));
            commands::add_proxy(server, author, &account, &proxy, now).map_err(fail)?;
            Ok(format!(
                "{} may now act for {}",
                proxy.readable(),
                account.readable()
            ))
        }
        "proxy-remove" => {
            arity(2)?;
            let (account, proxy) = (id(tokens[1]), id(tokens[2]));
            let was_present =
                commands::remove_proxy(server, author, &account, &proxy, now).map_err(fail)?;
            Ok(if was_present {
                format!("{} revoked", proxy.readable())
            } else {
                "that proxy was not present".to_string()
            })
        }
        "request-alias" => {
            arity(1)?;
            let new_id = id(tokens[1]);
            let signature =
                commands::request_alias(server, author, &new_id, now).map_err(fail)?;
            Ok(format!(
                "as {}, run: add-alias {} {}",
                new_id.readable(),
                author,
                signature
            ))
        }
        "add-alias" => {
            arity(2)?;
            let account = id(tokens[1]);
            commands::add_alias(server, author, &account, tokens[2], now).map_err(fail)?;
            Ok(format!(
                "{} is now an alias of {}",
                author.readable(),
                account.readable()
            ))
        }
        "public" => {
            arity(1)?;
            let account = id(tokens[1]);
            let value = commands::toggle_public(server, author, &account, now).map_err(fail)?;
            Ok(format!(
                "{} is {} listed publicly",
                account.readable(),
                if value { "now" } else { "no longer" }
            ))
        }
        "accounts" => {
            arity(0)?;
            let accounts = commands::list_accounts(server, author).map_err(fail)?;
            Ok(render_accounts(accounts))
        }
        "public-list" => {
            arity(0)?;
            Ok(render_accounts(commands::list_public_accounts(server)))
        }
        "supply" => {
            arity(0)?;
            Ok(format!("money supply: {}", commands::money_supply(server)))
        }
        "bracket-add" => {
            arity(4)?;
            let start = amount(tokens[2])?;
            let end = if tokens[3] == "none" {
                None
            } else {
                Some(amount(tokens[3])?)
            };
            let rate = amount(tokens[4])?;
            commands::add_tax_bracket(
                server,
                author,
                start,
                end,
                rate,
                tokens[1].to_string(),
                now,
            )
            .map_err(fail)?;
            Ok(format!("bracket {} registered", tokens[1]))
        }
        "bracket-remove" => {
            arity(1)?;
            commands::remove_tax_bracket(server, author, tokens[1].to_string(), now)
                .map_err(fail)?;
            Ok(format!("bracket {} removed", tokens[1]))
        }
        "tax" => {
            arity(0)?;
            commands::force_tax(server, author, now).map_err(fail)?;
            Ok("tax collected".to_string())
        }
        "tax?" => {
            arity(0)?;
            let report = commands::hypothetical_tax(server, author).map_err(fail)?;
            if report.is_empty() {
                Ok("nobody owes anything".to_string())
            } else {
                Ok(report
                    .iter()
                    .map(|(id, due)| format!("{} owes {}", id.readable(), due))
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
        }
        "autotax" => {
            arity(0)?;
            let enabled = commands::auto_tax(server, author, now).map_err(fail)?;
            Ok(format!(
                "automatic taxation is {}",
                if enabled { "on" } else { "off" }
            ))
        }
        "tick" => {
            let count: u32 = match tokens.len() {
                1 => 1,
                2 => tokens[1].parse().map_err(|_| "bad tick count".to_string())?,
                _ => return Err("`tick` takes at most one argument".to_string()),
            };
            commands::force_ticks(server, author, count, now).map_err(fail)?;
            Ok(format!("ran {} tick(s)", count))
        }
        "delete" => {
            arity(1)?;
            let account = id(tokens[1]);
            commands::delete_account(server, author, &account, now).map_err(fail)?;
            Ok(format!("{} deleted", account.readable()))
        }
        other => Err(format!("unknown command `{}`; try `help`", other)),
    }
}

fn render_accounts(accounts: Vec<(&AccountId, &tally_ledger::account::Account)>) -> String {
    if accounts.is_empty() {
        return "no accounts".to_string();
    }
    accounts
        .iter()
        .map(|(id, account)| {
            format!(
                "{:<30} {:>12}  {}{}",
                id.readable(),
                account.balance.to_string(),
                account.authorization,
                if account.frozen { "  [frozen]" } else { "" }
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run<J: Journal>(server: &mut LedgerServer<J>, line: &str) -> String {
        match dispatch(server, line, 0) {
            Outcome::Reply(reply) => reply,
            Outcome::Quit => panic!("unexpected quit"),
        }
    }

    #[test]
    fn a_session_drives_the_policy_layer() {
        let mut server = LedgerServer::in_memory();
        assert_eq!(run(&mut server, "as alice open alice"), "opened alice");
        run(&mut server, "print alice 100");
        assert_eq!(run(&mut server, "as alice balance alice"), "alice holds 100");

        run(&mut server, "as bob open bob");
        run(&mut server, "as alice transfer alice bob 5/2");
        assert_eq!(run(&mut server, "balance bob"), "bob holds 5/2");
    }

    #[test]
    fn authorization_failures_come_back_as_errors() {
        let mut server = LedgerServer::in_memory();
        run(&mut server, "as alice open alice");
        let reply = run(&mut server, "as alice print alice 100");
        assert!(reply.starts_with("error:"), "{}", reply);
    }

    #[test]
    fn unknown_verbs_point_at_help() {
        let mut server = LedgerServer::in_memory();
        assert!(run(&mut server, "frobnicate").contains("help"));
    }

    #[test]
    fn quit_quits() {
        let mut server = LedgerServer::in_memory();
        assert!(matches!(dispatch(&mut server, "quit", 0), Outcome::Quit));
    }

    #[test]
    fn tax_cycle_through_the_repl() {
        let mut server = LedgerServer::in_memory();
        run(&mut server, "as alice open alice");
        run(&mut server, "print alice 2000");
        run(&mut server, "bracket-add low 0 500 10");
        run(&mut server, "bracket-add mid 500 1000 20");
        run(&mut server, "bracket-add high 1000 2000 50");
        assert_eq!(run(&mut server, "tax?"), "alice owes 575");
        run(&mut server, "tax");
        assert_eq!(run(&mut server, "balance alice"), "alice holds 1425");
    }
}
