//! # Accounts and Authorization Tiers
//!
//! An [`Account`] is the unit of ownership: a UUID, an exact balance, a
//! couple of administrative flags, registered verification keys, and the
//! set of accounts allowed to act for it by proxy. Identities are bound to
//! accounts elsewhere (the bank's store) — an account knows nothing about
//! which names point at it, which is what makes aliasing cheap.
//!
//! [`Authorization`] is a strict ordinal ladder. The derived `Ord` is
//! load-bearing: policy checks are `author.level >= required` comparisons.

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::amount::Amount;

// ---------------------------------------------------------------------------
// Authorization
// ---------------------------------------------------------------------------

/// Ordinal authorization levels. Citizens hold money; officers can inspect
/// others' balances; admins run the economy; developers run the server.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Authorization {
    /// The default tier for a freshly opened account.
    #[default]
    Citizen,
    /// May read other accounts' balances.
    Officer,
    /// May mint, freeze, tax, and manage other accounts.
    Admin,
    /// Full control, including granting admin.
    Developer,
}

impl Authorization {
    /// All levels, ascending.
    pub const ALL: [Authorization; 4] = [
        Authorization::Citizen,
        Authorization::Officer,
        Authorization::Admin,
        Authorization::Developer,
    ];
}

impl fmt::Display for Authorization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Authorization::Citizen => "citizen",
            Authorization::Officer => "officer",
            Authorization::Admin => "admin",
            Authorization::Developer => "developer",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Authorization {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "citizen" => Ok(Authorization::Citizen),
            "officer" => Ok(Authorization::Officer),
            "admin" => Ok(Authorization::Admin),
            "developer" => Ok(Authorization::Developer),
            other => Err(format!("unknown authorization level `{}`", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Account
// ---------------------------------------------------------------------------

/// The state of a single account. Every field is reconstructed from the
/// ledger on startup; nothing here is persisted independently. The serde
/// derives exist for collaborator-facing queries, not storage.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Account {
    /// Globally unique, stable across aliasing and renames.
    uuid: Uuid,
    /// Exact rational balance. The bank enforces non-negativity.
    pub balance: Amount,
    /// Frozen accounts can neither send nor receive transfers.
    pub frozen: bool,
    /// Whether the account consents to appearing in public listings.
    pub public: bool,
    /// Position on the authorization ladder.
    pub authorization: Authorization,
    /// Ed25519 keys registered for alias linking and proxy signatures.
    pub public_keys: Vec<VerifyingKey>,
    /// UUIDs of accounts authorized to act for this one by proxy.
    pub proxies: BTreeSet<Uuid>,
}

impl Account {
    /// A fresh, empty citizen account with the given UUID.
    pub fn new(uuid: Uuid) -> Self {
        Account {
            uuid,
            balance: Amount::zero(),
            frozen: false,
            public: false,
            authorization: Authorization::Citizen,
            public_keys: Vec::new(),
            proxies: BTreeSet::new(),
        }
    }

    /// The account's globally unique identifier.
    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// `true` if any registered key equals `key`. Registration is
    /// append-only but idempotence is checked here so replays of the same
    /// `add-public-key` entry don't grow the list.
    pub fn has_public_key(&self, key: &VerifyingKey) -> bool {
        self.public_keys.iter().any(|k| k == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorization_ladder_is_ordered() {
        assert!(Authorization::Citizen < Authorization::Officer);
        assert!(Authorization::Officer < Authorization::Admin);
        assert!(Authorization::Admin < Authorization::Developer);
    }

    #[test]
    fn authorization_names_round_trip() {
        for level in Authorization::ALL {
            let parsed: Authorization = level.to_string().parse().unwrap();
            assert_eq!(parsed, level);
        }
        assert!("emperor".parse::<Authorization>().is_err());
    }

    #[test]
    fn account_state_serializes_for_queries() {
        let mut account = Account::new(Uuid::new_v4());
        account.balance = Amount::from_ratio(5, 2);
        account.public = true;
        account.authorization = Authorization::Officer;
        account
            .public_keys
            .push(crate::signing::generate_signing_key().verifying_key());

        let json = serde_json::to_string(&account).unwrap();
        assert!(json.contains("\"5/2\""));
        assert!(json.contains("\"officer\""));

        let back: Account = serde_json::from_str(&json).unwrap();
        assert_eq!(back.uuid(), account.uuid());
        assert_eq!(back.balance, account.balance);
        assert_eq!(back.authorization, account.authorization);
        assert_eq!(back.public_keys, account.public_keys);
    }

    #[test]
    fn new_account_is_an_empty_citizen() {
        let account = Account::new(Uuid::new_v4());
        assert!(account.balance.is_zero());
        assert!(!account.frozen);
        assert!(!account.public);
        assert_eq!(account.authorization, Authorization::Citizen);
        assert!(account.public_keys.is_empty());
        assert!(account.proxies.is_empty());
    }
}
