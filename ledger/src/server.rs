//! # The Ledger-Backed Server
//!
//! [`LedgerServer`] composes the state machine with a journal. Opening a
//! server replays the verified log through [`Bank::apply`]; every live
//! mutation goes through the same handler, then is recorded. State is a
//! pure function of the log.
//!
//! ## Durability window
//!
//! A mutation is applied in memory first and journaled second. A crash
//! between the two steps loses that one mutation (memory is gone, the log
//! never saw it) — the next start replays a log that is simply one entry
//! shorter. What cannot happen is the reverse: a recorded entry that was
//! never applied. During a tick, the tick entry is recorded before the
//! collection transfers it triggered, so a crash mid-collection loses the
//! unrecorded tail of the collection but never collects twice.
//!
//! ## Tick orchestration
//!
//! [`LedgerServer::notify_tick_elapsed`] does the only multi-entry work in
//! the system, in a fixed order: executable installments (each applied and
//! recorded individually, failures isolated), then the `tick` entry, then
//! — if the tax countdown fired — one transfer per taxable account into
//! the government account. Replaying those entries reproduces the state
//! without re-running any scheduling logic.

use std::path::Path;
use tracing::{info, warn};
use uuid::Uuid;

use crate::account::Authorization;
use crate::amount::Amount;
use crate::bank::Bank;
use crate::chain::{Command, HashChainJournal, Journal, MemoryJournal};
use crate::config::GOVERNMENT_ID;
use crate::errors::Result;
use crate::identity::AccountId;

/// A bank fronted by a journal: replayed on open, appended on mutation.
pub struct LedgerServer<J: Journal> {
    bank: Bank,
    journal: J,
}

impl LedgerServer<HashChainJournal> {
    /// Opens (or creates) a ledger file, verifies the whole chain, and
    /// replays it into a fresh bank.
    pub fn open(path: impl AsRef<Path>, difficulty: u32) -> Result<Self> {
        let (journal, entries) = HashChainJournal::open(path, difficulty)?;
        let mut bank = Bank::new();
        for (timestamp, command) in &entries {
            bank.apply(command, *timestamp)?;
        }
        info!(entries = entries.len(), "ledger replayed");
        Ok(LedgerServer { bank, journal })
    }
}

impl LedgerServer<MemoryJournal> {
    /// A server with no durable backing. Semantics are identical to the
    /// file-backed server; only persistence differs.
    pub fn in_memory() -> Self {
        LedgerServer {
            bank: Bank::new(),
            journal: MemoryJournal::new(),
        }
    }
}

impl<J: Journal> LedgerServer<J> {
    /// Read access to the accounting state.
    pub fn bank(&self) -> &Bank {
        &self.bank
    }

    /// The journal backing this server.
    pub fn journal(&self) -> &J {
        &self.journal
    }

    /// Applies a command and, on success, records it. The order is
    /// deliberate: a command the state machine rejects must never reach
    /// the log.
    fn commit(&mut self, command: Command, timestamp: i64) -> Result<()> {
        self.bank.apply(&command, timestamp)?;
        self.journal.record(timestamp, &command)
    }

    // -- account lifecycle --------------------------------------------------

    /// Opens an account under `id` and returns its UUID.
    pub fn open_account(&mut self, id: &AccountId, timestamp: i64) -> Result<Uuid> {
        let uuid = Uuid::new_v4();
        self.commit(
            Command::Open {
                id: id.unwrap_proxies().clone(),
                uuid,
            },
            timestamp,
        )?;
        Ok(uuid)
    }

    /// Binds `alias` to the account `account` resolves to.
    pub fn add_alias(
        &mut self,
        account: &AccountId,
        alias: &AccountId,
        timestamp: i64,
    ) -> Result<()> {
        self.commit(
            Command::AddAlias {
                account: account.clone(),
                alias: alias.unwrap_proxies().clone(),
            },
            timestamp,
        )
    }

    /// Registers a verification key (hex) on an account.
    pub fn add_public_key(
        &mut self,
        account: &AccountId,
        key: String,
        timestamp: i64,
    ) -> Result<()> {
        self.commit(
            Command::AddPublicKey {
                account: account.clone(),
                key,
            },
            timestamp,
        )
    }

    /// Deletes an account, unbinding its identities and cancelling its
    /// recurring transfers.
    pub fn delete_account(
        &mut self,
        author: &AccountId,
        account: &AccountId,
        timestamp: i64,
    ) -> Result<()> {
        self.commit(
            Command::DeleteAccount {
                author: author.clone(),
                account: account.clone(),
            },
            timestamp,
        )
    }

    // -- administration -----------------------------------------------------

    /// Sets an account's authorization level.
    pub fn authorize(
        &mut self,
        author: &AccountId,
        account: &AccountId,
        level: Authorization,
        timestamp: i64,
    ) -> Result<()> {
        self.commit(
            Command::Authorize {
                author: author.clone(),
                account: account.clone(),
                level,
            },
            timestamp,
        )
    }

    /// Freezes or unfreezes an account.
    pub fn set_frozen(
        &mut self,
        author: &AccountId,
        account: &AccountId,
        frozen: bool,
        timestamp: i64,
    ) -> Result<()> {
        self.commit(
            Command::SetFrozen {
                author: author.clone(),
                account: account.clone(),
                frozen,
            },
            timestamp,
        )
    }

    /// Sets an account's public-listing consent.
    pub fn mark_public(
        &mut self,
        author: &AccountId,
        account: &AccountId,
        public: bool,
        timestamp: i64,
    ) -> Result<()> {
        self.commit(
            Command::MarkPublic {
                author: author.clone(),
                account: account.clone(),
                public,
            },
            timestamp,
        )
    }

    /// Mints money into an account.
    pub fn print_money(
        &mut self,
        author: &AccountId,
        account: &AccountId,
        amount: Amount,
        timestamp: i64,
    ) -> Result<()> {
        self.commit(
            Command::PrintMoney {
                author: author.clone(),
                account: account.clone(),
                amount,
            },
            timestamp,
        )
    }

    /// Destroys money held by an account.
    pub fn remove_funds(
        &mut self,
        author: &AccountId,
        account: &AccountId,
        amount: Amount,
        timestamp: i64,
    ) -> Result<()> {
        self.commit(
            Command::RemoveFunds {
                author: author.clone(),
                account: account.clone(),
                amount,
            },
            timestamp,
        )
    }

    // -- transfers ----------------------------------------------------------

    /// Moves money between two accounts.
    pub fn transfer(
        &mut self,
        author: &AccountId,
        source: &AccountId,
        destination: &AccountId,
        amount: Amount,
        timestamp: i64,
    ) -> Result<()> {
        self.commit(
            Command::Transfer {
                author: author.clone(),
                source: source.clone(),
                destination: destination.clone(),
                amount,
            },
            timestamp,
        )
    }

    /// Registers a transfer of `total` spread over `tick_count` ticks and
    /// returns its id.
    pub fn create_recurring_transfer(
        &mut self,
        author: &AccountId,
        source: &AccountId,
        destination: &AccountId,
        total: Amount,
        tick_count: u32,
        timestamp: i64,
    ) -> Result<Uuid> {
        let transfer_id = Uuid::new_v4();
        self.commit(
            Command::CreateRecurringTransfer {
                author: author.clone(),
                source: source.clone(),
                destination: destination.clone(),
                total,
                tick_count,
                transfer_id,
            },
            timestamp,
        )?;
        Ok(transfer_id)
    }

    // -- proxies ------------------------------------------------------------

    /// Grants `proxy` the right to act for `account`. Idempotent.
    pub fn add_proxy(
        &mut self,
        author: &AccountId,
        proxy: &AccountId,
        account: &AccountId,
        timestamp: i64,
    ) -> Result<()> {
        self.commit(
            Command::AddProxy {
                author: author.clone(),
                proxy: proxy.clone(),
                account: account.clone(),
            },
            timestamp,
        )
    }

    /// Revokes `proxy`'s right to act for `account`. Returns whether the
    /// relation existed; revoking an absent relation is reported, not
    /// raised, and writes nothing to the log.
    pub fn remove_proxy(
        &mut self,
        author: &AccountId,
        proxy: &AccountId,
        account: &AccountId,
        timestamp: i64,
    ) -> Result<bool> {
        let proxy_uuid = self.bank.resolve(proxy)?;
        if !self.bank.account(account)?.proxies.contains(&proxy_uuid) {
            return Ok(false);
        }
        self.commit(
            Command::RemoveProxy {
                author: author.clone(),
                proxy: proxy.clone(),
                account: account.clone(),
            },
            timestamp,
        )?;
        Ok(true)
    }

    // -- tax ----------------------------------------------------------------

    /// Registers a tax bracket.
    pub fn add_tax_bracket(
        &mut self,
        author: &AccountId,
        start: Amount,
        end: Option<Amount>,
        rate: Amount,
        name: String,
        timestamp: i64,
    ) -> Result<()> {
        self.commit(
            Command::AddTaxBracket {
                author: author.clone(),
                start,
                end,
                rate,
                name,
            },
            timestamp,
        )
    }

    /// Removes a tax bracket by name.
    pub fn remove_tax_bracket(
        &mut self,
        author: &AccountId,
        name: String,
        timestamp: i64,
    ) -> Result<()> {
        self.commit(
            Command::RemoveTaxBracket {
                author: author.clone(),
                name,
            },
            timestamp,
        )
    }

    /// Flips automatic taxation; returns the new state.
    pub fn toggle_auto_tax(&mut self, author: &AccountId, timestamp: i64) -> Result<bool> {
        self.commit(
            Command::ToggleAutoTax {
                author: author.clone(),
            },
            timestamp,
        )?;
        Ok(self.bank.tax_engine().auto_enabled())
    }

    /// Collects tax from every liable account immediately and resets the
    /// countdown. The marker entry follows the collection's transfers in
    /// the log.
    pub fn force_tax(&mut self, author: &AccountId, timestamp: i64) -> Result<()> {
        self.collect_taxes(timestamp)?;
        self.commit(
            Command::ForceTax {
                author: author.clone(),
            },
            timestamp,
        )
    }

    /// One pass over all accounts, transferring each non-zero liability to
    /// the government. Per-account failures (an account frozen mid-pass)
    /// are isolated: that account is skipped, the pass continues.
    fn collect_taxes(&mut self, timestamp: i64) -> Result<()> {
        let government = AccountId::parse(GOVERNMENT_ID);
        let engine = self.bank.tax_engine();
        let mut due: Vec<(AccountId, Amount)> = Vec::new();
        for (id, account) in self.bank.accounts_in_order() {
            let liability = engine.assess(id, &account.balance);
            if !liability.is_positive() {
                continue;
            }
            // An account cannot owe more than it holds.
            let amount = if liability > account.balance {
                account.balance.clone()
            } else {
                liability
            };
            due.push((id.clone(), amount));
        }

        let collected = due.len();
        for (id, amount) in due {
            let command = Command::Transfer {
                author: government.clone(),
                source: id.clone(),
                destination: government.clone(),
                amount: amount.clone(),
            };
            match self.bank.apply(&command, timestamp) {
                Ok(()) => self.journal.record(timestamp, &command)?,
                Err(error) => {
                    warn!(account = %id, %amount, %error, "tax collection skipped");
                }
            }
        }
        info!(accounts = collected, "tax collected");
        Ok(())
    }

    // -- ticking ------------------------------------------------------------

    /// Advances the server by one tick: executes due installments, records
    /// the tick, and runs an automatic tax collection when the countdown
    /// fires. Always takes an explicit timestamp so callers (and tests)
    /// control the clock.
    pub fn notify_tick_elapsed(&mut self, timestamp: i64) -> Result<()> {
        for (transfer_id, amount) in self.bank.due_installments() {
            let command = Command::PerformRecurringTransfer {
                transfer_id,
                amount: amount.clone(),
            };
            // The pre-check ran against pre-installment balances; an
            // earlier installment this tick may have drained the source.
            // Skipped is skipped.
            match self.bank.apply(&command, timestamp) {
                Ok(()) => self.journal.record(timestamp, &command)?,
                Err(error) => {
                    warn!(id = %transfer_id, %amount, %error, "installment skipped");
                }
            }
        }

        let fired = self.bank.apply_tick(timestamp);
        self.journal.record(timestamp, &Command::Tick)?;
        if fired {
            self.collect_taxes(timestamp)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_DIFFICULTY_BITS;

    fn gov() -> AccountId {
        AccountId::parse(GOVERNMENT_ID)
    }

    fn setup_pair(server: &mut LedgerServer<MemoryJournal>) -> (AccountId, AccountId) {
        let alice = AccountId::parse("alice");
        let bob = AccountId::parse("bob");
        server.open_account(&alice, 0).unwrap();
        server.open_account(&bob, 0).unwrap();
        (alice, bob)
    }

    #[test]
    fn recurring_transfer_delivers_total_over_its_ticks() {
        let mut server = LedgerServer::in_memory();
        let (alice, bob) = setup_pair(&mut server);
        server.print_money(&gov(), &alice, Amount::from_int(20), 0).unwrap();
        server.print_money(&gov(), &bob, Amount::from_int(20), 0).unwrap();

        let id = server
            .create_recurring_transfer(&alice, &alice, &bob, Amount::from_int(20), 10, 1)
            .unwrap();

        for tick in 0..10 {
            server.notify_tick_elapsed(2 + tick).unwrap();
        }

        assert!(server.bank().balance(&alice).unwrap().is_zero());
        assert_eq!(server.bank().balance(&bob).unwrap(), Amount::from_int(40));
        assert!(server.bank().recurring_transfer(id).is_none());
    }

    #[test]
    fn skipped_installments_are_lost_not_retried() {
        let mut server = LedgerServer::in_memory();
        let (alice, bob) = setup_pair(&mut server);
        // Only enough for one of the two 5-unit installments.
        server.print_money(&gov(), &alice, Amount::from_int(5), 0).unwrap();
        server
            .create_recurring_transfer(&alice, &alice, &bob, Amount::from_int(10), 2, 0)
            .unwrap();

        server.notify_tick_elapsed(1).unwrap();
        assert!(server.bank().balance(&alice).unwrap().is_zero());
        // Second installment cannot execute; the tick still consumes its
        // slot and the transfer ends under-delivered.
        server.notify_tick_elapsed(2).unwrap();
        assert_eq!(server.bank().balance(&bob).unwrap(), Amount::from_int(5));
        assert_eq!(server.bank().recurring_transfers().count(), 0);
    }

    #[test]
    fn force_tax_matches_the_bracket_arithmetic() {
        let mut server = LedgerServer::in_memory();
        let alice = AccountId::parse("alice");
        server.open_account(&alice, 0).unwrap();
        server.print_money(&gov(), &alice, Amount::from_int(2000), 0).unwrap();

        let brackets = [
            (0, Some(500), 10, "low"),
            (500, Some(1000), 20, "mid"),
            (1000, Some(2000), 50, "high"),
        ];
        for (start, end, rate, name) in brackets {
            server
                .add_tax_bracket(
                    &gov(),
                    Amount::from_int(start),
                    end.map(Amount::from_int),
                    Amount::from_int(rate),
                    name.to_string(),
                    0,
                )
                .unwrap();
        }

        server.force_tax(&gov(), 1).unwrap();
        assert_eq!(server.bank().balance(&alice).unwrap(), Amount::from_int(1425));
        assert_eq!(server.bank().balance(&gov()).unwrap(), Amount::from_int(575));
    }

    #[test]
    fn auto_tax_fires_when_the_countdown_elapses() {
        let mut server = LedgerServer::in_memory();
        let alice = AccountId::parse("alice");
        server.open_account(&alice, 0).unwrap();
        server.print_money(&gov(), &alice, Amount::from_int(1000), 0).unwrap();
        server
            .add_tax_bracket(
                &gov(),
                Amount::zero(),
                None,
                Amount::from_int(10),
                "flat".to_string(),
                0,
            )
            .unwrap();
        server.toggle_auto_tax(&gov(), 0).unwrap();

        let period = server.bank().tax_engine().ticks_until_collection();
        for tick in 0..period - 1 {
            server.notify_tick_elapsed(i64::from(tick)).unwrap();
            assert_eq!(server.bank().balance(&alice).unwrap(), Amount::from_int(1000));
        }
        server.notify_tick_elapsed(i64::from(period)).unwrap();
        assert_eq!(server.bank().balance(&alice).unwrap(), Amount::from_int(900));
        assert_eq!(server.bank().balance(&gov()).unwrap(), Amount::from_int(100));
    }

    #[test]
    fn rejected_commands_never_reach_the_journal() {
        let mut server = LedgerServer::in_memory();
        let (alice, bob) = setup_pair(&mut server);
        let before = server.journal().entries().len();
        let result = server.transfer(&alice, &alice, &bob, Amount::from_int(5), 1);
        assert!(result.is_err());
        assert_eq!(server.journal().entries().len(), before);
    }

    #[test]
    fn replay_reproduces_live_state() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ledger.txt");
        let difficulty = 4; // keep the salt search fast

        let alice = AccountId::parse("alice");
        let bob = AccountId::parse("bob");
        {
            let mut server = LedgerServer::open(&path, difficulty).unwrap();
            server.open_account(&alice, 10).unwrap();
            server.open_account(&bob, 11).unwrap();
            server.print_money(&gov(), &alice, Amount::from_int(100), 12).unwrap();
            server
                .transfer(&alice, &alice, &bob, Amount::from_ratio(5, 3), 13)
                .unwrap();
            server
                .create_recurring_transfer(&alice, &alice, &bob, Amount::from_int(9), 3, 14)
                .unwrap();
            server.notify_tick_elapsed(15).unwrap();
            server
                .authorize(&gov(), &bob, Authorization::Officer, 16)
                .unwrap();

            let reopened = LedgerServer::open(&path, difficulty).unwrap();
            for id in [&alice, &bob] {
                assert_eq!(
                    reopened.bank().balance(id).unwrap(),
                    server.bank().balance(id).unwrap()
                );
            }
            assert_eq!(
                reopened.bank().account(&bob).unwrap().authorization,
                Authorization::Officer
            );
            assert_eq!(reopened.bank().recurring_transfers().count(), 1);
            let live = server.bank().recurring_transfers().next().unwrap();
            let replayed = reopened.bank().recurring_transfers().next().unwrap();
            assert_eq!(replayed.remaining(), live.remaining());
            assert_eq!(replayed.remaining_ticks(), live.remaining_ticks());
        }
    }

    #[test]
    fn default_difficulty_is_what_ships() {
        // Pin the deployed difficulty; tests elsewhere lower it for speed.
        assert_eq!(DEFAULT_DIFFICULTY_BITS, 12);
    }
}
