//! # The Accounting State Machine
//!
//! [`Bank`] holds the whole in-memory state: identity bindings, accounts,
//! active recurring transfers, and the tax engine. It mutates through
//! exactly one entry point, [`Bank::apply`], which handles every ledger
//! [`Command`] — replay and live traffic run the identical code, which is
//! what makes reconstruction from the log deterministic.
//!
//! The bank is **mechanism, not policy**: it enforces balance
//! non-negativity, freeze rules, and positive amounts, but it never asks
//! who the author is. Authorization lives in [`crate::commands`], layered
//! above. The bank trusts its caller.
//!
//! ## Replay contract
//!
//! Tick-driven side effects (installments, tax collections) are logged as
//! their own entries by the server, so applying a `tick` entry only
//! consumes scheduler tick slots and advances the tax countdown. Likewise
//! `force-tax` is a marker: the collection's transfers precede it in the
//! log, and applying it only resets the countdown.

use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};
use uuid::Uuid;

use crate::account::Account;
use crate::amount::Amount;
use crate::chain::Command;
use crate::config::GOVERNMENT_ID;
use crate::errors::{LedgerError, Result};
use crate::identity::AccountId;
use crate::signing::decode_key;
use crate::tax::{TaxBracket, TaxEngine};

// ---------------------------------------------------------------------------
// RecurringTransfer
// ---------------------------------------------------------------------------

/// A transfer spread over `tick_count` ticks.
///
/// Each tick consumes one tick slot whether or not the installment could
/// execute; a skipped installment is lost, never carried forward. The
/// slots are consumed by `tick` entries and the money moves via
/// `perform-recurring-transfer` entries, so replay reconstructs both
/// counters exactly.
#[derive(Clone, Debug)]
pub struct RecurringTransfer {
    id: Uuid,
    source: Uuid,
    destination: Uuid,
    total: Amount,
    tick_count: u32,
    remaining_ticks: u32,
    remaining: Amount,
}

impl RecurringTransfer {
    /// The transfer's unique id.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// UUID of the paying account.
    pub fn source(&self) -> Uuid {
        self.source
    }

    /// UUID of the receiving account.
    pub fn destination(&self) -> Uuid {
        self.destination
    }

    /// The total amount agreed to be transferred.
    pub fn total(&self) -> &Amount {
        &self.total
    }

    /// The number of ticks the total is spread over.
    pub fn tick_count(&self) -> u32 {
        self.tick_count
    }

    /// Tick slots not yet consumed.
    pub fn remaining_ticks(&self) -> u32 {
        self.remaining_ticks
    }

    /// The amount not yet delivered.
    pub fn remaining(&self) -> &Amount {
        &self.remaining
    }

    /// The exact per-tick installment, `total / tick_count`.
    pub fn per_tick(&self) -> Amount {
        self.total.clone() / Amount::from(self.tick_count)
    }

    /// The installment due next tick: `per_tick`, or whatever remains on
    /// the final partial installment.
    pub fn next_installment(&self) -> Amount {
        let per_tick = self.per_tick();
        if self.remaining < per_tick {
            self.remaining.clone()
        } else {
            per_tick
        }
    }
}

// ---------------------------------------------------------------------------
// Bank
// ---------------------------------------------------------------------------

/// The in-memory accounting state, reconstructible from the ledger.
pub struct Bank {
    /// Every bound identity (primary and aliases) to its account.
    ids: HashMap<AccountId, Uuid>,
    accounts: HashMap<Uuid, Account>,
    /// Identities bound per account, in binding order; the first is the
    /// identity the account was opened under.
    bound_ids: HashMap<Uuid, Vec<AccountId>>,
    /// BTreeMap so tick passes visit transfers in a stable order.
    recurring: BTreeMap<Uuid, RecurringTransfer>,
    tax: TaxEngine,
    last_tick: i64,
}

impl Bank {
    /// A fresh bank containing only the government account. The government
    /// is created outside the log (every deployment has one; logging it
    /// would make the first entry of every ledger identical boilerplate)
    /// and holds developer authorization.
    pub fn new() -> Self {
        let mut bank = Bank {
            ids: HashMap::new(),
            accounts: HashMap::new(),
            bound_ids: HashMap::new(),
            recurring: BTreeMap::new(),
            tax: TaxEngine::default(),
            last_tick: 0,
        };
        let government = AccountId::parse(GOVERNMENT_ID);
        let uuid = Uuid::new_v4();
        let mut account = Account::new(uuid);
        account.authorization = crate::account::Authorization::Developer;
        bank.accounts.insert(uuid, account);
        bank.ids.insert(government.clone(), uuid);
        bank.bound_ids.insert(uuid, vec![government]);
        bank
    }

    // -- queries ------------------------------------------------------------

    /// Resolves an identity (stripping proxy wrappers) to its account UUID.
    pub fn resolve(&self, id: &AccountId) -> Result<Uuid> {
        let target = id.unwrap_proxies();
        self.ids
            .get(target)
            .copied()
            .ok_or_else(|| LedgerError::AccountNotFound(target.to_string()))
    }

    /// `true` if `id` resolves to an account.
    pub fn contains(&self, id: &AccountId) -> bool {
        self.ids.contains_key(id.unwrap_proxies())
    }

    /// The account an identity resolves to.
    pub fn account(&self, id: &AccountId) -> Result<&Account> {
        let uuid = self.resolve(id)?;
        self.accounts
            .get(&uuid)
            .ok_or_else(|| LedgerError::AccountNotFound(id.to_string()))
    }

    fn account_mut(&mut self, id: &AccountId) -> Result<&mut Account> {
        let uuid = self.resolve(id)?;
        self.accounts
            .get_mut(&uuid)
            .ok_or_else(|| LedgerError::AccountNotFound(id.to_string()))
    }

    /// The balance an identity resolves to.
    pub fn balance(&self, id: &AccountId) -> Result<Amount> {
        Ok(self.account(id)?.balance.clone())
    }

    /// The total amount of money across all accounts.
    pub fn money_supply(&self) -> Amount {
        let mut total = Amount::zero();
        for account in self.accounts.values() {
            total += account.balance.clone();
        }
        total
    }

    /// The identity an account was opened under.
    pub fn primary_id(&self, uuid: Uuid) -> Option<&AccountId> {
        self.bound_ids.get(&uuid).and_then(|ids| ids.first())
    }

    /// Every identity bound to the account `id` resolves to.
    pub fn aliases_of(&self, id: &AccountId) -> Result<&[AccountId]> {
        let uuid = self.resolve(id)?;
        Ok(self
            .bound_ids
            .get(&uuid)
            .map(Vec::as_slice)
            .unwrap_or_default())
    }

    /// All accounts with their primary identity, ordered by canonical
    /// identity. The stable order matters: batch passes (listings, tax
    /// collection) must visit accounts deterministically.
    pub fn accounts_in_order(&self) -> Vec<(&AccountId, &Account)> {
        let mut accounts: Vec<(&AccountId, &Account)> = self
            .accounts
            .iter()
            .filter_map(|(uuid, account)| Some((self.primary_id(*uuid)?, account)))
            .collect();
        accounts.sort_by(|a, b| a.0.cmp(b.0));
        accounts
    }

    /// An active recurring transfer by id.
    pub fn recurring_transfer(&self, id: Uuid) -> Option<&RecurringTransfer> {
        self.recurring.get(&id)
    }

    /// All active recurring transfers, in id order.
    pub fn recurring_transfers(&self) -> impl Iterator<Item = &RecurringTransfer> {
        self.recurring.values()
    }

    /// The tax engine (read-only; mutation goes through [`Bank::apply`]).
    pub fn tax_engine(&self) -> &TaxEngine {
        &self.tax
    }

    /// The timestamp of the most recent tick (0 before the first).
    pub fn last_tick_timestamp(&self) -> i64 {
        self.last_tick
    }

    /// `true` if a transfer of `amount` from `source` to `destination`
    /// would currently be accepted.
    pub fn can_transfer(
        &self,
        source: &AccountId,
        destination: &AccountId,
        amount: &Amount,
    ) -> bool {
        match (self.resolve(source), self.resolve(destination)) {
            (Ok(s), Ok(d)) => self.check_transfer(s, d, amount).is_ok(),
            _ => false,
        }
    }

    /// The executable installments due on the next tick: `(transfer_id,
    /// amount)` for every active transfer whose installment passes the
    /// transfer checks right now. Skipped ones simply don't appear; their
    /// tick slot is consumed by the tick all the same.
    pub fn due_installments(&self) -> Vec<(Uuid, Amount)> {
        self.recurring
            .values()
            .filter_map(|transfer| {
                let installment = transfer.next_installment();
                if installment.is_positive()
                    && self
                        .check_transfer(transfer.source, transfer.destination, &installment)
                        .is_ok()
                {
                    Some((transfer.id, installment))
                } else {
                    None
                }
            })
            .collect()
    }

    fn check_transfer(&self, source: Uuid, destination: Uuid, amount: &Amount) -> Result<()> {
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(amount.clone()));
        }
        let label = |uuid: Uuid| {
            self.primary_id(uuid)
                .map(AccountId::to_string)
                .unwrap_or_else(|| uuid.to_string())
        };
        let src = self
            .accounts
            .get(&source)
            .ok_or_else(|| LedgerError::AccountNotFound(label(source)))?;
        let dst = self
            .accounts
            .get(&destination)
            .ok_or_else(|| LedgerError::AccountNotFound(label(destination)))?;
        if src.frozen {
            return Err(LedgerError::Frozen(label(source)));
        }
        if dst.frozen {
            return Err(LedgerError::Frozen(label(destination)));
        }
        if src.balance.clone() - amount.clone() < Amount::zero() {
            return Err(LedgerError::InsufficientBalance {
                account: label(source),
                balance: src.balance.clone(),
                required: amount.clone(),
            });
        }
        Ok(())
    }

    fn move_money(&mut self, source: Uuid, destination: Uuid, amount: &Amount) -> Result<()> {
        self.check_transfer(source, destination, amount)?;
        // Checked above; both accounts exist.
        if let Some(src) = self.accounts.get_mut(&source) {
            src.balance -= amount.clone();
        }
        if let Some(dst) = self.accounts.get_mut(&destination) {
            dst.balance += amount.clone();
        }
        Ok(())
    }

    // -- mutation -----------------------------------------------------------

    /// Applies one command to the state. The single handler for both
    /// replay and live traffic; on error, state is unchanged.
    pub fn apply(&mut self, command: &Command, timestamp: i64) -> Result<()> {
        match command {
            Command::Open { id, uuid } => {
                let id = id.unwrap_proxies().clone();
                if self.ids.contains_key(&id) {
                    return Err(LedgerError::AccountExists(id.to_string()));
                }
                self.accounts.insert(*uuid, Account::new(*uuid));
                self.ids.insert(id.clone(), *uuid);
                self.bound_ids.insert(*uuid, vec![id.clone()]);
                info!(account = %id, "account opened");
                Ok(())
            }
            Command::AddAlias { account, alias } => {
                let uuid = self.resolve(account)?;
                let alias = alias.unwrap_proxies().clone();
                if self.ids.contains_key(&alias) {
                    return Err(LedgerError::AccountExists(alias.to_string()));
                }
                self.ids.insert(alias.clone(), uuid);
                if let Some(bound) = self.bound_ids.get_mut(&uuid) {
                    bound.push(alias.clone());
                }
                info!(account = %account, alias = %alias, "alias bound");
                Ok(())
            }
            Command::Authorize { account, level, .. } => {
                self.account_mut(account)?.authorization = *level;
                info!(account = %account, %level, "authorization set");
                Ok(())
            }
            Command::SetFrozen {
                account, frozen, ..
            } => {
                self.account_mut(account)?.frozen = *frozen;
                info!(account = %account, frozen, "freeze flag set");
                Ok(())
            }
            Command::PrintMoney {
                account, amount, ..
            } => {
                if !amount.is_positive() {
                    return Err(LedgerError::InvalidAmount(amount.clone()));
                }
                self.account_mut(account)?.balance += amount.clone();
                info!(account = %account, amount = %amount, "money printed");
                Ok(())
            }
            Command::RemoveFunds {
                account, amount, ..
            } => {
                if !amount.is_positive() {
                    return Err(LedgerError::InvalidAmount(amount.clone()));
                }
                let target = self.account_mut(account)?;
                if target.balance.clone() - amount.clone() < Amount::zero() {
                    return Err(LedgerError::InsufficientBalance {
                        account: account.to_string(),
                        balance: target.balance.clone(),
                        required: amount.clone(),
                    });
                }
                target.balance -= amount.clone();
                info!(account = %account, amount = %amount, "funds removed");
                Ok(())
            }
            Command::Transfer {
                source,
                destination,
                amount,
                ..
            } => {
                let src = self.resolve(source)?;
                let dst = self.resolve(destination)?;
                self.move_money(src, dst, amount)?;
                debug!(source = %source, destination = %destination, amount = %amount, "transfer");
                Ok(())
            }
            Command::CreateRecurringTransfer {
                source,
                destination,
                total,
                tick_count,
                transfer_id,
                ..
            } => {
                if !total.is_positive() || *tick_count == 0 {
                    return Err(LedgerError::InvalidAmount(total.clone()));
                }
                let source = self.resolve(source)?;
                let destination = self.resolve(destination)?;
                self.recurring.insert(
                    *transfer_id,
                    RecurringTransfer {
                        id: *transfer_id,
                        source,
                        destination,
                        total: total.clone(),
                        tick_count: *tick_count,
                        remaining_ticks: *tick_count,
                        remaining: total.clone(),
                    },
                );
                info!(id = %transfer_id, total = %total, ticks = tick_count, "recurring transfer created");
                Ok(())
            }
            Command::PerformRecurringTransfer {
                transfer_id,
                amount,
            } => {
                let (source, destination) = {
                    let transfer = self
                        .recurring
                        .get(transfer_id)
                        .ok_or_else(|| LedgerError::TransferNotFound(transfer_id.to_string()))?;
                    (transfer.source, transfer.destination)
                };
                self.move_money(source, destination, amount)?;
                if let Some(transfer) = self.recurring.get_mut(transfer_id) {
                    transfer.remaining -= amount.clone();
                }
                debug!(id = %transfer_id, amount = %amount, "installment performed");
                Ok(())
            }
            Command::AddPublicKey { account, key } => {
                let key = decode_key(key)?;
                let target = self.account_mut(account)?;
                if !target.has_public_key(&key) {
                    target.public_keys.push(key);
                }
                Ok(())
            }
            Command::AddProxy { proxy, account, .. } => {
                let proxy_uuid = self.resolve(proxy)?;
                let target = self.account_mut(account)?;
                // Idempotent: re-granting an existing relation is a no-op.
                target.proxies.insert(proxy_uuid);
                Ok(())
            }
            Command::RemoveProxy { proxy, account, .. } => {
                let proxy_uuid = self.resolve(proxy)?;
                let target = self.account_mut(account)?;
                target.proxies.remove(&proxy_uuid);
                Ok(())
            }
            Command::DeleteAccount { account, .. } => {
                let uuid = self.resolve(account)?;
                self.accounts.remove(&uuid);
                if let Some(bound) = self.bound_ids.remove(&uuid) {
                    for id in bound {
                        self.ids.remove(&id);
                    }
                }
                self.recurring
                    .retain(|_, t| t.source != uuid && t.destination != uuid);
                for other in self.accounts.values_mut() {
                    other.proxies.remove(&uuid);
                }
                info!(account = %account, "account deleted");
                Ok(())
            }
            Command::AddTaxBracket {
                start,
                end,
                rate,
                name,
                ..
            } => {
                let bracket =
                    TaxBracket::new(name.clone(), start.clone(), end.clone(), rate.clone())?;
                self.tax.add_bracket(bracket);
                info!(bracket = %name, "tax bracket added");
                Ok(())
            }
            Command::RemoveTaxBracket { name, .. } => {
                self.tax.remove_bracket(name)?;
                info!(bracket = %name, "tax bracket removed");
                Ok(())
            }
            Command::ToggleAutoTax { .. } => {
                let enabled = self.tax.toggle_auto();
                info!(enabled, "auto-tax toggled");
                Ok(())
            }
            Command::ForceTax { .. } => {
                // Marker entry: the collection's transfers precede it in
                // the log. Only the countdown needs restoring.
                self.tax.reset_countdown();
                Ok(())
            }
            Command::MarkPublic {
                account, public, ..
            } => {
                self.account_mut(account)?.public = *public;
                Ok(())
            }
            Command::Tick => {
                self.apply_tick(timestamp);
                Ok(())
            }
        }
    }

    /// Consumes one tick: every active recurring transfer loses a tick
    /// slot (exhausted and fully delivered ones are removed after the
    /// pass), and the tax countdown advances. Returns `true` when an
    /// automatic collection is due on this tick.
    ///
    /// Moves no money. The server turns the due work into ordinary logged
    /// entries; this keeps replay of a `tick` entry free of side effects
    /// that are already in the log.
    pub fn apply_tick(&mut self, timestamp: i64) -> bool {
        self.last_tick = timestamp;
        for transfer in self.recurring.values_mut() {
            transfer.remaining_ticks = transfer.remaining_ticks.saturating_sub(1);
        }
        self.recurring
            .retain(|_, t| t.remaining_ticks > 0 && t.remaining.is_positive());
        self.tax.advance_tick()
    }
}

impl Default for Bank {
    fn default() -> Self {
        Bank::new()
    }
}
