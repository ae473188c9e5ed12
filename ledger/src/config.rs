//! # Engine Configuration & Constants
//!
//! Every magic number in Tally lives here. If you're hardcoding a constant
//! somewhere else, you're doing it wrong and you owe the team coffee.
//!
//! Several of these are load-bearing for replay compatibility: changing the
//! difficulty or the salt range invalidates existing ledgers, so treat them
//! like a wire format, not like tuning knobs.

// ---------------------------------------------------------------------------
// Sealing
// ---------------------------------------------------------------------------

/// Required number of leading zero bits in a sealed entry's digest.
///
/// 12 bits means ~4096 hash attempts per append — imperceptible for a
/// human-driven currency, but rewriting a year of history means redoing
/// that work for every subsequent entry. That asymmetry is the whole point.
pub const DEFAULT_DIFFICULTY_BITS: u32 = 12;

/// Inclusive upper bound of the random salt search space. Salts are decimal
/// strings drawn uniformly from `1..=MAX_SALT`; at difficulty 12 the search
/// succeeds with overwhelming probability well before exhausting the range.
pub const MAX_SALT: u64 = 1_000_000;

/// Digest length in bytes. SHA3-256 output.
pub const DIGEST_LENGTH: usize = 32;

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

/// Identity of the built-in government account. Created at server
/// construction (outside the log) with developer authorization; it is the
/// destination of all tax revenue.
pub const GOVERNMENT_ID: &str = "@government";

/// Identity-prefixes exempt from taxation by default: `&` marks
/// organizations, `@` marks government accounts.
pub const DEFAULT_EXEMPT_PREFIXES: &[&str] = &["&", "@"];

// ---------------------------------------------------------------------------
// Ticking & taxes
// ---------------------------------------------------------------------------

/// Number of ticks between automatic tax collections, when auto-tax is on.
pub const DEFAULT_TAX_PERIOD_TICKS: u32 = 28;

/// Default wall-clock seconds between ticks, for schedulers that don't
/// override it. One hour: recurring transfers and taxes are measured in
/// hours and days, not milliseconds.
pub const DEFAULT_TICK_INTERVAL_SECS: u64 = 3_600;

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Default ledger file name, relative to the data directory.
pub const DEFAULT_LEDGER_FILE: &str = "ledger.txt";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn difficulty_fits_in_digest() {
        // The difficulty target must be expressible in the digest width.
        assert!(DEFAULT_DIFFICULTY_BITS as usize <= DIGEST_LENGTH * 8);
    }

    #[test]
    fn salt_space_dwarfs_difficulty() {
        // Expected attempts is 2^difficulty; the salt space must leave a
        // comfortable margin or `find_salt` could plausibly exhaust it.
        assert!(MAX_SALT > (1u64 << DEFAULT_DIFFICULTY_BITS) * 16);
    }

    #[test]
    fn government_id_is_exempt() {
        assert!(DEFAULT_EXEMPT_PREFIXES
            .iter()
            .any(|p| GOVERNMENT_ID.starts_with(p)));
    }
}
