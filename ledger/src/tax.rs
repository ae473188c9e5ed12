//! # Wealth Tax — Brackets and the Auto-Tax Countdown
//!
//! Taxation is marginal-by-bracket: a bracket `[start, end]` at `rate`
//! percent taxes only the slice of wealth that falls inside it. An account
//! below `start` owes the bracket nothing; above `end` it owes the full
//! slice `rate * (end - start) / 100`; in between, `rate * (balance -
//! start) / 100`. Each bracket's due is rounded to the whole unit.
//!
//! Brackets are assessed in ascending `start` order against the balance
//! *net of slices already taken this assessment* — wealth taxed by a lower
//! bracket is not taxed again by a higher one. A 2000-unit account under
//! `[0,500]@10`, `[500,1000]@20`, `[1000,2000]@50` owes 50 + 100 + 425 =
//! 575, not 650.
//!
//! Accounts whose canonical identity starts with an exempt prefix (by
//! default `&` for organizations and `@` for government) are skipped per
//! bracket. The engine itself moves no money: the server turns assessments
//! into ordinary logged transfers to the government account.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::amount::Amount;
use crate::config::{DEFAULT_EXEMPT_PREFIXES, DEFAULT_TAX_PERIOD_TICKS};
use crate::errors::{LedgerError, Result};
use crate::identity::AccountId;

// ---------------------------------------------------------------------------
// TaxBracket
// ---------------------------------------------------------------------------

/// One wealth-tax bracket. Immutable between administrative commands.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaxBracket {
    /// Administrative name, unique within the engine.
    pub name: String,
    /// Lower bound of the taxed slice.
    pub start: Amount,
    /// Upper bound of the taxed slice; `None` means unbounded.
    pub end: Option<Amount>,
    /// Tax rate in percent.
    pub rate: Amount,
    /// Identity prefixes exempt from this bracket.
    pub exempt_prefixes: Vec<String>,
}

impl TaxBracket {
    /// Builds a bracket with the default exempt prefixes, validating
    /// `start <= end` and a non-negative rate.
    pub fn new(name: impl Into<String>, start: Amount, end: Option<Amount>, rate: Amount) -> Result<Self> {
        let name = name.into();
        if let Some(end) = &end {
            if *end < start {
                return Err(LedgerError::InvalidBracket {
                    name,
                    reason: format!("start {} exceeds end {}", start, end),
                });
            }
        }
        if rate.is_negative() {
            return Err(LedgerError::InvalidBracket {
                name,
                reason: format!("negative rate {}", rate),
            });
        }
        Ok(TaxBracket {
            name,
            start,
            end,
            rate,
            exempt_prefixes: DEFAULT_EXEMPT_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
        })
    }

    /// `true` if `id`'s canonical form starts with an exempt prefix.
    pub fn exempts(&self, id: &AccountId) -> bool {
        let canonical = id.canonical();
        self.exempt_prefixes
            .iter()
            .any(|prefix| canonical.starts_with(prefix.as_str()))
    }

    /// The tax this bracket levies on a balance, rounded to the whole unit.
    pub fn slice_tax(&self, balance: &Amount) -> Amount {
        let hundred = Amount::from_int(100);
        if *balance < self.start {
            return Amount::zero();
        }
        let taxable = match &self.end {
            Some(end) if balance > end => end.clone() - self.start.clone(),
            _ => balance.clone() - self.start.clone(),
        };
        (self.rate.clone() * taxable / hundred).round()
    }
}

// ---------------------------------------------------------------------------
// TaxEngine
// ---------------------------------------------------------------------------

/// Bracket table plus the auto-tax tick countdown.
///
/// The countdown is part of replayed state: `tick` entries advance it and
/// `force-tax` entries reset it, so a reloaded server fires its next
/// automatic collection on exactly the tick the original would have.
#[derive(Clone, Debug)]
pub struct TaxEngine {
    brackets: BTreeMap<String, TaxBracket>,
    period: u32,
    countdown: u32,
    auto: bool,
}

impl TaxEngine {
    /// An engine with no brackets, auto-tax off, and a full countdown.
    pub fn new(period: u32) -> Self {
        TaxEngine {
            brackets: BTreeMap::new(),
            period,
            countdown: period,
            auto: false,
        }
    }

    /// Registers a bracket, replacing any existing bracket of that name.
    pub fn add_bracket(&mut self, bracket: TaxBracket) {
        self.brackets.insert(bracket.name.clone(), bracket);
    }

    /// Removes a bracket by name.
    pub fn remove_bracket(&mut self, name: &str) -> Result<TaxBracket> {
        self.brackets
            .remove(name)
            .ok_or_else(|| LedgerError::BracketNotFound(name.to_string()))
    }

    /// Looks up a bracket by name.
    pub fn bracket(&self, name: &str) -> Option<&TaxBracket> {
        self.brackets.get(name)
    }

    /// All brackets in assessment order: ascending start, ties by name.
    pub fn brackets_in_order(&self) -> Vec<&TaxBracket> {
        let mut ordered: Vec<&TaxBracket> = self.brackets.values().collect();
        ordered.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.name.cmp(&b.name)));
        ordered
    }

    /// Whether automatic collection is enabled.
    pub fn auto_enabled(&self) -> bool {
        self.auto
    }

    /// Ticks remaining until the next automatic collection.
    pub fn ticks_until_collection(&self) -> u32 {
        self.countdown
    }

    /// Flips the auto-tax switch; returns the new state.
    pub fn toggle_auto(&mut self) -> bool {
        self.auto = !self.auto;
        self.auto
    }

    /// Restarts the countdown, as a completed collection does.
    pub fn reset_countdown(&mut self) {
        self.countdown = self.period;
    }

    /// Advances the countdown by one tick. Returns `true` when a collection
    /// is due this tick; the countdown resets itself in that case. No-op
    /// while auto-tax is off.
    pub fn advance_tick(&mut self) -> bool {
        if !self.auto {
            return false;
        }
        self.countdown = self.countdown.saturating_sub(1);
        if self.countdown == 0 {
            self.countdown = self.period;
            true
        } else {
            false
        }
    }

    /// Total liability of one account, assessed across all brackets that do
    /// not exempt it, lower brackets first, each against the balance net of
    /// slices already taken.
    pub fn assess(&self, id: &AccountId, balance: &Amount) -> Amount {
        let mut effective = balance.clone();
        let mut total = Amount::zero();
        for bracket in self.brackets_in_order() {
            if bracket.exempts(id) {
                continue;
            }
            let due = bracket.slice_tax(&effective);
            effective -= due.clone();
            total += due;
        }
        total
    }
}

impl Default for TaxEngine {
    fn default() -> Self {
        TaxEngine::new(DEFAULT_TAX_PERIOD_TICKS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bracket(name: &str, start: i64, end: Option<i64>, rate: i64) -> TaxBracket {
        TaxBracket::new(
            name,
            Amount::from_int(start),
            end.map(Amount::from_int),
            Amount::from_int(rate),
        )
        .unwrap()
    }

    #[test]
    fn slice_below_start_is_zero() {
        let b = bracket("mid", 500, Some(1000), 20);
        assert_eq!(b.slice_tax(&Amount::from_int(400)), Amount::zero());
    }

    #[test]
    fn slice_within_range_is_marginal() {
        let b = bracket("mid", 500, Some(1000), 20);
        // 20% of (800 - 500) = 60.
        assert_eq!(b.slice_tax(&Amount::from_int(800)), Amount::from_int(60));
    }

    #[test]
    fn slice_above_end_is_capped() {
        let b = bracket("mid", 500, Some(1000), 20);
        // Capped at 20% of (1000 - 500) = 100.
        assert_eq!(b.slice_tax(&Amount::from_int(5000)), Amount::from_int(100));
    }

    #[test]
    fn unbounded_bracket_taxes_everything_above_start() {
        let b = bracket("top", 1000, None, 50);
        assert_eq!(b.slice_tax(&Amount::from_int(3000)), Amount::from_int(1000));
    }

    #[test]
    fn slice_tax_rounds_to_whole_units() {
        let b = bracket("mid", 0, None, 10);
        // 10% of 15 = 1.5, rounds away from zero to 2.
        assert_eq!(b.slice_tax(&Amount::from_int(15)), Amount::from_int(2));
    }

    #[test]
    fn start_above_end_is_rejected() {
        let result = TaxBracket::new(
            "bad",
            Amount::from_int(1000),
            Some(Amount::from_int(500)),
            Amount::from_int(10),
        );
        assert!(matches!(result, Err(LedgerError::InvalidBracket { .. })));
    }

    #[test]
    fn government_prefixes_are_exempt_by_default() {
        let b = bracket("any", 0, None, 10);
        assert!(b.exempts(&AccountId::parse("@government")));
        assert!(b.exempts(&AccountId::parse("&redcross")));
        assert!(!b.exempts(&AccountId::parse("alice")));
    }

    #[test]
    fn assessment_matches_worked_example() {
        // The canonical example: 2000 units under three stacked brackets
        // owes 50 + 100 + 425 = 575.
        let mut engine = TaxEngine::default();
        engine.add_bracket(bracket("low", 0, Some(500), 10));
        engine.add_bracket(bracket("mid", 500, Some(1000), 20));
        engine.add_bracket(bracket("high", 1000, Some(2000), 50));

        let due = engine.assess(&AccountId::parse("alice"), &Amount::from_int(2000));
        assert_eq!(due, Amount::from_int(575));
    }

    #[test]
    fn assessment_skips_exempt_accounts() {
        let mut engine = TaxEngine::default();
        engine.add_bracket(bracket("flat", 0, None, 10));
        let due = engine.assess(&AccountId::parse("@government"), &Amount::from_int(1000));
        assert!(due.is_zero());
    }

    #[test]
    fn countdown_fires_on_schedule() {
        let mut engine = TaxEngine::new(3);
        // Off by default: ticks don't move the countdown.
        assert!(!engine.advance_tick());
        assert_eq!(engine.ticks_until_collection(), 3);

        engine.toggle_auto();
        assert!(!engine.advance_tick());
        assert!(!engine.advance_tick());
        assert!(engine.advance_tick());
        // Reset after firing.
        assert_eq!(engine.ticks_until_collection(), 3);
    }

    #[test]
    fn force_reset_restarts_the_schedule() {
        let mut engine = TaxEngine::new(3);
        engine.toggle_auto();
        engine.advance_tick();
        engine.reset_countdown();
        assert_eq!(engine.ticks_until_collection(), 3);
    }

    #[test]
    fn removing_a_missing_bracket_reports_not_found() {
        let mut engine = TaxEngine::default();
        assert!(matches!(
            engine.remove_bracket("ghost"),
            Err(LedgerError::BracketNotFound(_))
        ));
    }
}
