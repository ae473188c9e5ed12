//! # Identities, Aliases, and Proxies
//!
//! An [`AccountId`] names an actor on some chat platform. It is either
//! atomic — a platform plus a platform-local name — or a proxy wrapper: an
//! outer identity temporarily acting *for* an inner one. The wrapper is
//! recursive, so `a:b:c` means "a, acting for b, acting for c".
//!
//! Two rules keep this honest:
//!
//! 1. **Lookup unwraps, permission doesn't.** [`AccountId::unwrap_proxies`]
//!    strips wrappers to find the account an operation targets, but the
//!    outer (acting) identity is what the policy layer judges. Wrapping
//!    yourself in someone else's id buys you nothing.
//! 2. **Equality is canonical-string equality.** Identities are compared,
//!    ordered, and hashed by their canonical form, so an id parsed from the
//!    ledger and an id built programmatically collide exactly when they
//!    should.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

/// The chat platform an atomic identity lives on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Platform {
    /// Reddit usernames; the canonical form is the bare name.
    Reddit,
    /// Discord user ids; the canonical form is `discord/<id>`.
    Discord,
}

// ---------------------------------------------------------------------------
// AccountId
// ---------------------------------------------------------------------------

/// An identity that can own or act on an account.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum AccountId {
    /// A platform-local identity.
    Atomic {
        /// Which platform the name belongs to.
        platform: Platform,
        /// The platform-local name or id.
        name: String,
    },
    /// `outer` acting on behalf of `inner`.
    Proxy {
        /// The identity actually issuing the command.
        outer: Box<AccountId>,
        /// The identity being acted for (possibly itself a proxy).
        inner: Box<AccountId>,
    },
}

impl AccountId {
    /// A Reddit identity.
    pub fn reddit(name: impl Into<String>) -> Self {
        AccountId::Atomic {
            platform: Platform::Reddit,
            name: name.into(),
        }
    }

    /// A Discord identity.
    pub fn discord(id: impl Into<String>) -> Self {
        AccountId::Atomic {
            platform: Platform::Discord,
            name: id.into(),
        }
    }

    /// Wraps `outer` around `inner` as a proxy access.
    pub fn proxy(outer: AccountId, inner: AccountId) -> Self {
        AccountId::Proxy {
            outer: Box::new(outer),
            inner: Box::new(inner),
        }
    }

    /// Recursively strips proxy wrappers to find the account-resolution
    /// target. Lookup only — authorization always judges the outer identity.
    pub fn unwrap_proxies(&self) -> &AccountId {
        match self {
            AccountId::Proxy { inner, .. } => inner.unwrap_proxies(),
            atomic => atomic,
        }
    }

    /// `true` if this id carries at least one proxy wrapper.
    pub fn is_proxied(&self) -> bool {
        matches!(self, AccountId::Proxy { .. })
    }

    /// The canonical machine-readable form; identical to `Display`.
    pub fn canonical(&self) -> String {
        self.to_string()
    }

    /// A human-friendly rendering for chat replies: Discord ids become
    /// mentions, proxy accesses spell out who is acting for whom.
    pub fn readable(&self) -> String {
        match self {
            AccountId::Atomic {
                platform: Platform::Reddit,
                name,
            } => name.clone(),
            AccountId::Atomic {
                platform: Platform::Discord,
                name,
            } => format!("<@{}>", name),
            AccountId::Proxy { outer, inner } => {
                format!("{} (by proxy: {})", inner.readable(), outer.readable())
            }
        }
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountId::Atomic {
                platform: Platform::Reddit,
                name,
            } => write!(f, "{}", name),
            AccountId::Atomic {
                platform: Platform::Discord,
                name,
            } => write!(f, "discord/{}", name),
            AccountId::Proxy { outer, inner } => write!(f, "{}:{}", outer, inner),
        }
    }
}

/// Parses an atomic (non-proxy) identity. Accepts Discord mention syntax
/// (`<@123>`, `<@!123>`) and the canonical `discord/123` form; anything
/// else is a Reddit name.
fn parse_atomic(value: &str) -> AccountId {
    if let Some(rest) = value.strip_prefix("<@").and_then(|v| v.strip_suffix('>')) {
        return AccountId::discord(rest.strip_prefix('!').unwrap_or(rest));
    }
    if let Some(rest) = value.strip_prefix("discord/") {
        return AccountId::discord(rest);
    }
    AccountId::reddit(value)
}

impl AccountId {
    /// Parses an identity. Parsing never fails: an unrecognized form is
    /// simply a Reddit name. Proxy chains split on `:` and fold right, so
    /// `a:b:c` parses as `Proxy(a, Proxy(b, c))`.
    pub fn parse(value: &str) -> AccountId {
        let mut parts = value.split(':').rev();
        // split() always yields at least one element.
        let mut id = parse_atomic(parts.next().unwrap_or(""));
        for outer in parts {
            id = AccountId::proxy(parse_atomic(outer), id);
        }
        id
    }
}

impl FromStr for AccountId {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(AccountId::parse(s))
    }
}

// Equality, ordering, and hashing are all defined over the canonical string
// form. Structural derives would *almost* work, but nothing stops a caller
// from constructing `reddit("discord/9")`, and that must equal
// `discord("9")` or map lookups become form-sensitive.

impl PartialEq for AccountId {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for AccountId {}

impl PartialOrd for AccountId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AccountId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.canonical().cmp(&other.canonical())
    }
}

impl Hash for AccountId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.canonical().hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reddit_round_trip() {
        let id = AccountId::parse("taumember");
        assert_eq!(id, AccountId::reddit("taumember"));
        assert_eq!(id.to_string(), "taumember");
        assert_eq!(id.readable(), "taumember");
    }

    #[test]
    fn discord_forms_normalize() {
        let canonical = AccountId::parse("discord/123456");
        assert_eq!(AccountId::parse("<@123456>"), canonical);
        assert_eq!(AccountId::parse("<@!123456>"), canonical);
        assert_eq!(canonical.to_string(), "discord/123456");
        assert_eq!(canonical.readable(), "<@123456>");
    }

    #[test]
    fn proxy_parse_folds_right() {
        let id = AccountId::parse("alice:bob:carol");
        match &id {
            AccountId::Proxy { outer, inner } => {
                assert_eq!(**outer, AccountId::reddit("alice"));
                assert_eq!(
                    **inner,
                    AccountId::proxy(AccountId::reddit("bob"), AccountId::reddit("carol"))
                );
            }
            other => panic!("expected proxy, got {:?}", other),
        }
        assert_eq!(id.to_string(), "alice:bob:carol");
    }

    #[test]
    fn unwrap_finds_innermost() {
        let id = AccountId::parse("alice:bob:carol");
        assert_eq!(*id.unwrap_proxies(), AccountId::reddit("carol"));
        assert_eq!(
            *AccountId::reddit("solo").unwrap_proxies(),
            AccountId::reddit("solo")
        );
    }

    #[test]
    fn proxy_readable_names_both_parties() {
        let id = AccountId::proxy(AccountId::reddit("alice"), AccountId::reddit("bob"));
        assert_eq!(id.readable(), "bob (by proxy: alice)");
    }

    #[test]
    fn equality_is_canonical_not_structural() {
        // A Reddit name that happens to spell a Discord canonical form must
        // compare equal to the real thing: both render `discord/9`.
        assert_eq!(AccountId::reddit("discord/9"), AccountId::discord("9"));
    }

    #[test]
    fn ordering_follows_canonical_strings() {
        let mut ids = vec![
            AccountId::reddit("zeta"),
            AccountId::discord("1"),
            AccountId::reddit("alpha"),
        ];
        ids.sort();
        assert_eq!(
            ids.iter().map(|i| i.to_string()).collect::<Vec<_>>(),
            vec!["alpha", "discord/1", "zeta"]
        );
    }

    #[test]
    fn mention_round_trips_through_canonical() {
        let id = AccountId::parse("<@42>");
        let reparsed = AccountId::parse(&id.to_string());
        assert_eq!(id, reparsed);
    }
}
