//! # The Policy Layer
//!
//! Free functions, one per user-facing operation, that decide *who may do
//! what* and then call into the mechanism ([`LedgerServer`]). The state
//! machine below never sees an authorization question; everything here
//! answers one before touching state. Presentation layers (chat
//! front-ends, the REPL) call these and phrase the typed errors.
//!
//! ## The authorization rule
//!
//! Every check is an instance of one rule: the acting account passes if it
//! holds an administrative level (per-operation, usually admin), or if it
//! *is* the account being operated on and holds a per-operation minimum.
//! Raising someone's level is the interesting case: the threshold is the
//! maximum of admin, the level being granted, and the target's current
//! level — so nobody can grant a level above their own, and nobody can
//! demote someone who outranks them.
//!
//! ## Acting by proxy
//!
//! A proxied author like `a:b` means "a acting as b". The proxy wrapper is
//! judged, not stripped: every acting identity in the chain must hold a
//! proxy grant on the account it acts for, and the effective authorization
//! is the *inner* account's. Wrapping yourself in an admin's identity
//! without a grant is refused before any operation runs.

use uuid::Uuid;

use crate::account::{Account, Authorization};
use crate::amount::Amount;
use crate::bank::Bank;
use crate::chain::Journal;
use crate::errors::{LedgerError, Result};
use crate::identity::AccountId;
use crate::server::LedgerServer;
use crate::signing::{
    decode_signature, encode_key, generate_signing_key, sign_message, verify_with_any,
};

// ---------------------------------------------------------------------------
// Authorization helpers
// ---------------------------------------------------------------------------

/// The resolved acting party: the account the author ends up acting as.
struct Actor {
    uuid: Uuid,
    authorization: Authorization,
}

fn unauthorized(author: &AccountId, action: &str) -> LedgerError {
    LedgerError::Unauthorized {
        author: author.to_string(),
        action: action.to_string(),
    }
}

/// Validates every proxy wrapper in `id`: each acting identity must hold a
/// registered proxy grant on the account it acts for.
fn validate_proxy_chain(bank: &Bank, id: &AccountId) -> Result<()> {
    if let AccountId::Proxy { outer, inner } = id {
        validate_proxy_chain(bank, outer)?;
        let outer_uuid = bank.resolve(outer)?;
        let target = bank.account(inner)?;
        if !target.proxies.contains(&outer_uuid) {
            return Err(unauthorized(id, "act by proxy"));
        }
        validate_proxy_chain(bank, inner)?;
    }
    Ok(())
}

/// Resolves the author to the account it acts as, refusing unregistered
/// proxy wrappers.
fn actor(bank: &Bank, author: &AccountId) -> Result<Actor> {
    validate_proxy_chain(bank, author)?;
    let account = bank.account(author)?;
    Ok(Actor {
        uuid: account.uuid(),
        authorization: account.authorization,
    })
}

/// The single authorization rule: administrative level passes outright;
/// otherwise the actor must *be* the object and hold `min_level`.
fn assert_authorized(
    author: &AccountId,
    actor: &Actor,
    object: Option<&Account>,
    admin_level: Authorization,
    min_level: Authorization,
    action: &str,
) -> Result<()> {
    if actor.authorization >= admin_level {
        return Ok(());
    }
    if let Some(object) = object {
        if actor.uuid == object.uuid() && actor.authorization >= min_level {
            return Ok(());
        }
    }
    Err(unauthorized(author, action))
}

// ---------------------------------------------------------------------------
// Account lifecycle
// ---------------------------------------------------------------------------

/// Opens an account under `account`. A fresh identity may open its own
/// account; opening on behalf of another identity requires admin.
pub fn open_account<J: Journal>(
    server: &mut LedgerServer<J>,
    author: &AccountId,
    account: &AccountId,
    timestamp: i64,
) -> Result<Uuid> {
    if server.bank().contains(account) {
        return Err(LedgerError::AccountExists(account.to_string()));
    }
    if server.bank().contains(author) {
        let actor = actor(server.bank(), author)?;
        assert_authorized(
            author,
            &actor,
            None,
            Authorization::Admin,
            Authorization::Citizen,
            "open an account for someone else",
        )?;
    }
    server.open_account(account, timestamp)
}

/// Deletes an account. Admin only.
pub fn delete_account<J: Journal>(
    server: &mut LedgerServer<J>,
    author: &AccountId,
    account: &AccountId,
    timestamp: i64,
) -> Result<()> {
    let actor = actor(server.bank(), author)?;
    assert_authorized(
        author,
        &actor,
        None,
        Authorization::Admin,
        Authorization::Citizen,
        "delete an account",
    )?;
    server.delete_account(author, account, timestamp)
}

// ---------------------------------------------------------------------------
// Aliases
// ---------------------------------------------------------------------------

/// First half of alias linking, run *as the existing account*: generates a
/// disposable keypair, registers its public half on the account (logged),
/// and returns a signature over the new identity's canonical form. The
/// private half is dropped here; only the signature travels.
pub fn request_alias<J: Journal>(
    server: &mut LedgerServer<J>,
    author: &AccountId,
    new_id: &AccountId,
    timestamp: i64,
) -> Result<String> {
    if server.bank().contains(new_id) {
        return Err(LedgerError::AccountExists(new_id.to_string()));
    }
    // Author must have an account to link to.
    server.bank().account(author)?;
    let key = generate_signing_key();
    let signature = sign_message(&key, &new_id.unwrap_proxies().canonical());
    server.add_public_key(author, encode_key(&key.verifying_key()), timestamp)?;
    Ok(signature)
}

/// Second half of alias linking, run *as the new identity*: presents the
/// signature from [`request_alias`], proving control of the existing
/// account, and binds the new identity to it.
pub fn add_alias<J: Journal>(
    server: &mut LedgerServer<J>,
    author: &AccountId,
    account: &AccountId,
    signature: &str,
    timestamp: i64,
) -> Result<()> {
    let new_id = author.unwrap_proxies().clone();
    if server.bank().contains(&new_id) {
        return Err(LedgerError::AccountExists(new_id.to_string()));
    }
    let target = server.bank().account(account)?;
    let signature = decode_signature(signature)?;
    verify_with_any(&target.public_keys, &new_id.canonical(), &signature)?;
    server.add_alias(account, &new_id, timestamp)
}

/// Registers a verification key on an account. Self or admin.
pub fn add_public_key<J: Journal>(
    server: &mut LedgerServer<J>,
    author: &AccountId,
    account: &AccountId,
    key: String,
    timestamp: i64,
) -> Result<()> {
    let actor = actor(server.bank(), author)?;
    assert_authorized(
        author,
        &actor,
        Some(server.bank().account(account)?),
        Authorization::Admin,
        Authorization::Citizen,
        "register a key on this account",
    )?;
    server.add_public_key(account, key, timestamp)
}

// ---------------------------------------------------------------------------
// Balances and transfers
// ---------------------------------------------------------------------------

/// The balance of `account`. Self, or officer and above.
pub fn balance<J: Journal>(
    server: &LedgerServer<J>,
    author: &AccountId,
    account: &AccountId,
) -> Result<Amount> {
    let actor = actor(server.bank(), author)?;
    let target = server.bank().account(account)?;
    assert_authorized(
        author,
        &actor,
        Some(target),
        Authorization::Officer,
        Authorization::Citizen,
        "read this account's balance",
    )?;
    Ok(target.balance.clone())
}

/// The total money supply. Unrestricted: an aggregate leaks no single
/// account's balance.
pub fn money_supply<J: Journal>(server: &LedgerServer<J>) -> Amount {
    server.bank().money_supply()
}

/// Transfers money out of `source`. The author must be `source` or admin.
pub fn transfer<J: Journal>(
    server: &mut LedgerServer<J>,
    author: &AccountId,
    source: &AccountId,
    destination: &AccountId,
    amount: Amount,
    timestamp: i64,
) -> Result<()> {
    let actor = actor(server.bank(), author)?;
    assert_authorized(
        author,
        &actor,
        Some(server.bank().account(source)?),
        Authorization::Admin,
        Authorization::Citizen,
        "transfer from this account",
    )?;
    server.bank().account(destination)?;
    server.transfer(author, source, destination, amount, timestamp)
}

/// Registers a recurring transfer of `amount` **per tick** for
/// `tick_count` ticks (total `amount * tick_count`). The author must be
/// the sender or admin.
pub fn create_recurring_transfer<J: Journal>(
    server: &mut LedgerServer<J>,
    author: &AccountId,
    source: &AccountId,
    destination: &AccountId,
    amount: Amount,
    tick_count: u32,
    timestamp: i64,
) -> Result<Uuid> {
    let actor = actor(server.bank(), author)?;
    assert_authorized(
        author,
        &actor,
        Some(server.bank().account(source)?),
        Authorization::Admin,
        Authorization::Citizen,
        "create a recurring transfer from this account",
    )?;
    server.bank().account(destination)?;
    let total = amount * Amount::from(tick_count);
    server.create_recurring_transfer(author, source, destination, total, tick_count, timestamp)
}

// ---------------------------------------------------------------------------
// Administration
// ---------------------------------------------------------------------------

/// Sets `account`'s authorization to `level`. The required threshold is
/// the maximum of admin, the granted level, and the target's current
/// level — no escalation above your own rank, no demoting your superiors.
pub fn authorize<J: Journal>(
    server: &mut LedgerServer<J>,
    author: &AccountId,
    account: &AccountId,
    level: Authorization,
    timestamp: i64,
) -> Result<()> {
    let actor = actor(server.bank(), author)?;
    let target = server.bank().account(account)?;
    let required = Authorization::Admin.max(level).max(target.authorization);
    assert_authorized(
        author,
        &actor,
        Some(target),
        required,
        required,
        "change this account's authorization",
    )?;
    server.authorize(author, account, level, timestamp)
}

/// Freezes an account. Admin only.
pub fn freeze_account<J: Journal>(
    server: &mut LedgerServer<J>,
    author: &AccountId,
    account: &AccountId,
    timestamp: i64,
) -> Result<()> {
    set_frozen(server, author, account, true, timestamp)
}

/// Unfreezes an account. Admin only.
pub fn unfreeze_account<J: Journal>(
    server: &mut LedgerServer<J>,
    author: &AccountId,
    account: &AccountId,
    timestamp: i64,
) -> Result<()> {
    set_frozen(server, author, account, false, timestamp)
}

fn set_frozen<J: Journal>(
    server: &mut LedgerServer<J>,
    author: &AccountId,
    account: &AccountId,
    frozen: bool,
    timestamp: i64,
) -> Result<()> {
    let actor = actor(server.bank(), author)?;
    assert_authorized(
        author,
        &actor,
        Some(server.bank().account(account)?),
        Authorization::Admin,
        Authorization::Admin,
        "freeze or unfreeze an account",
    )?;
    server.set_frozen(author, account, frozen, timestamp)
}

/// Mints money. Admin only.
pub fn print_money<J: Journal>(
    server: &mut LedgerServer<J>,
    author: &AccountId,
    account: &AccountId,
    amount: Amount,
    timestamp: i64,
) -> Result<()> {
    let actor = actor(server.bank(), author)?;
    assert_authorized(
        author,
        &actor,
        None,
        Authorization::Admin,
        Authorization::Citizen,
        "print money",
    )?;
    server.bank().account(account)?;
    server.print_money(author, account, amount, timestamp)
}

/// Destroys money. Admin only.
pub fn remove_funds<J: Journal>(
    server: &mut LedgerServer<J>,
    author: &AccountId,
    account: &AccountId,
    amount: Amount,
    timestamp: i64,
) -> Result<()> {
    let actor = actor(server.bank(), author)?;
    assert_authorized(
        author,
        &actor,
        None,
        Authorization::Admin,
        Authorization::Citizen,
        "remove funds",
    )?;
    server.bank().account(account)?;
    server.remove_funds(author, account, amount, timestamp)
}

/// Flips an account's public-listing consent; returns the new value. Self
/// or admin.
pub fn toggle_public<J: Journal>(
    server: &mut LedgerServer<J>,
    author: &AccountId,
    account: &AccountId,
    timestamp: i64,
) -> Result<bool> {
    let actor = actor(server.bank(), author)?;
    let target = server.bank().account(account)?;
    assert_authorized(
        author,
        &actor,
        Some(target),
        Authorization::Admin,
        Authorization::Citizen,
        "change this account's public listing",
    )?;
    let value = !target.public;
    server.mark_public(author, account, value, timestamp)?;
    Ok(value)
}

/// Every account with its primary identity. Admin only.
pub fn list_accounts<'a, J: Journal>(
    server: &'a LedgerServer<J>,
    author: &AccountId,
) -> Result<Vec<(&'a AccountId, &'a Account)>> {
    let actor = actor(server.bank(), author)?;
    assert_authorized(
        author,
        &actor,
        None,
        Authorization::Admin,
        Authorization::Citizen,
        "list all accounts",
    )?;
    Ok(server.bank().accounts_in_order())
}

/// Accounts that consented to public listing. Unrestricted.
pub fn list_public_accounts<J: Journal>(
    server: &LedgerServer<J>,
) -> Vec<(&AccountId, &Account)> {
    server
        .bank()
        .accounts_in_order()
        .into_iter()
        .filter(|(_, account)| account.public)
        .collect()
}

// ---------------------------------------------------------------------------
// Proxies
// ---------------------------------------------------------------------------

/// Grants `proxy` the right to act for `account`. Admin only — a grant
/// lets someone spend the account's money, so it is an administrative act
/// even on one's own account.
pub fn add_proxy<J: Journal>(
    server: &mut LedgerServer<J>,
    author: &AccountId,
    account: &AccountId,
    proxy: &AccountId,
    timestamp: i64,
) -> Result<()> {
    let actor = actor(server.bank(), author)?;
    assert_authorized(
        author,
        &actor,
        None,
        Authorization::Admin,
        Authorization::Citizen,
        "grant a proxy",
    )?;
    server.bank().account(proxy)?;
    server.add_proxy(author, proxy, account, timestamp)
}

/// Revokes a proxy grant; returns whether it existed. Admin only.
pub fn remove_proxy<J: Journal>(
    server: &mut LedgerServer<J>,
    author: &AccountId,
    account: &AccountId,
    proxy: &AccountId,
    timestamp: i64,
) -> Result<bool> {
    let actor = actor(server.bank(), author)?;
    assert_authorized(
        author,
        &actor,
        None,
        Authorization::Admin,
        Authorization::Citizen,
        "revoke a proxy",
    )?;
    server.remove_proxy(author, proxy, account, timestamp)
}

/// Verifies that `author` may act for `account`: either through a
/// registered proxy grant (no signature supplied) or by presenting a
/// signature over `message` from one of `account`'s registered keys.
pub fn verify_proxy<J: Journal>(
    server: &LedgerServer<J>,
    author: &AccountId,
    account: &AccountId,
    signature: Option<&str>,
    message: &str,
) -> Result<bool> {
    let author_uuid = server.bank().resolve(author)?;
    let target = server.bank().account(account)?;
    match signature {
        None => Ok(target.proxies.contains(&author_uuid)),
        Some(signature) => {
            let signature = decode_signature(signature)?;
            Ok(verify_with_any(&target.public_keys, message, &signature).is_ok())
        }
    }
}

// ---------------------------------------------------------------------------
// Tax and ticking
// ---------------------------------------------------------------------------

/// Registers a tax bracket. Admin only.
pub fn add_tax_bracket<J: Journal>(
    server: &mut LedgerServer<J>,
    author: &AccountId,
    start: Amount,
    end: Option<Amount>,
    rate: Amount,
    name: String,
    timestamp: i64,
) -> Result<()> {
    let actor = actor(server.bank(), author)?;
    assert_authorized(
        author,
        &actor,
        None,
        Authorization::Admin,
        Authorization::Citizen,
        "manage tax brackets",
    )?;
    server.add_tax_bracket(author, start, end, rate, name, timestamp)
}

/// Removes a tax bracket. Admin only.
pub fn remove_tax_bracket<J: Journal>(
    server: &mut LedgerServer<J>,
    author: &AccountId,
    name: String,
    timestamp: i64,
) -> Result<()> {
    let actor = actor(server.bank(), author)?;
    assert_authorized(
        author,
        &actor,
        None,
        Authorization::Admin,
        Authorization::Citizen,
        "manage tax brackets",
    )?;
    server.remove_tax_bracket(author, name, timestamp)
}

/// Collects tax from all liable accounts now. Admin only.
pub fn force_tax<J: Journal>(
    server: &mut LedgerServer<J>,
    author: &AccountId,
    timestamp: i64,
) -> Result<()> {
    let actor = actor(server.bank(), author)?;
    assert_authorized(
        author,
        &actor,
        None,
        Authorization::Admin,
        Authorization::Citizen,
        "force tax collection",
    )?;
    server.force_tax(author, timestamp)
}

/// What each account would owe if tax were collected now, without
/// collecting. Admin only.
pub fn hypothetical_tax<J: Journal>(
    server: &LedgerServer<J>,
    author: &AccountId,
) -> Result<Vec<(AccountId, Amount)>> {
    let actor = actor(server.bank(), author)?;
    assert_authorized(
        author,
        &actor,
        None,
        Authorization::Admin,
        Authorization::Citizen,
        "inspect tax liabilities",
    )?;
    let engine = server.bank().tax_engine();
    Ok(server
        .bank()
        .accounts_in_order()
        .into_iter()
        .filter_map(|(id, account)| {
            let due = engine.assess(id, &account.balance);
            due.is_positive().then(|| (id.clone(), due))
        })
        .collect())
}

/// Toggles automatic taxation; returns the new state. Admin only.
pub fn auto_tax<J: Journal>(
    server: &mut LedgerServer<J>,
    author: &AccountId,
    timestamp: i64,
) -> Result<bool> {
    let actor = actor(server.bank(), author)?;
    assert_authorized(
        author,
        &actor,
        None,
        Authorization::Admin,
        Authorization::Citizen,
        "toggle automatic taxation",
    )?;
    server.toggle_auto_tax(author, timestamp)
}

/// Forcibly runs `count` ticks. Admin only; the regular cadence comes
/// from the scheduler, this is an operator tool.
pub fn force_ticks<J: Journal>(
    server: &mut LedgerServer<J>,
    author: &AccountId,
    count: u32,
    timestamp: i64,
) -> Result<()> {
    let actor = actor(server.bank(), author)?;
    assert_authorized(
        author,
        &actor,
        None,
        Authorization::Admin,
        Authorization::Citizen,
        "force ticks",
    )?;
    for _ in 0..count {
        server.notify_tick_elapsed(timestamp)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::MemoryJournal;
    use crate::config::GOVERNMENT_ID;

    fn gov() -> AccountId {
        AccountId::parse(GOVERNMENT_ID)
    }

    fn server_with(names: &[&str]) -> LedgerServer<MemoryJournal> {
        let mut server = LedgerServer::in_memory();
        for name in names {
            let id = AccountId::parse(name);
            open_account(&mut server, &id, &id, 0).unwrap();
        }
        server
    }

    #[test]
    fn fresh_identity_opens_its_own_account() {
        let mut server = LedgerServer::in_memory();
        let alice = AccountId::parse("alice");
        open_account(&mut server, &alice, &alice, 0).unwrap();
        assert!(server.bank().contains(&alice));
    }

    #[test]
    fn citizens_cannot_open_accounts_for_others() {
        let mut server = server_with(&["alice"]);
        let alice = AccountId::parse("alice");
        let result = open_account(&mut server, &alice, &AccountId::parse("bob"), 0);
        assert!(matches!(result, Err(LedgerError::Unauthorized { .. })));
    }

    #[test]
    fn no_privilege_escalation() {
        let mut server = server_with(&["alice", "bob"]);
        let alice = AccountId::parse("alice");
        let bob = AccountId::parse("bob");

        // A citizen cannot raise anyone, including itself.
        for target in [&alice, &bob] {
            let result = authorize(&mut server, &alice, target, Authorization::Admin, 1);
            assert!(matches!(result, Err(LedgerError::Unauthorized { .. })));
        }

        // An admin cannot grant developer (above its own rank)...
        authorize(&mut server, &gov(), &alice, Authorization::Admin, 2).unwrap();
        let result = authorize(&mut server, &alice, &bob, Authorization::Developer, 3);
        assert!(matches!(result, Err(LedgerError::Unauthorized { .. })));
        // ...nor demote the developer-level government.
        let result = authorize(&mut server, &alice, &gov(), Authorization::Citizen, 4);
        assert!(matches!(result, Err(LedgerError::Unauthorized { .. })));
        // Granting at or below its own rank works.
        authorize(&mut server, &alice, &bob, Authorization::Officer, 5).unwrap();
    }

    #[test]
    fn balance_is_private_to_self_and_officers() {
        let mut server = server_with(&["alice", "bob"]);
        let alice = AccountId::parse("alice");
        let bob = AccountId::parse("bob");

        balance(&server, &alice, &alice).unwrap();
        assert!(matches!(
            balance(&server, &alice, &bob),
            Err(LedgerError::Unauthorized { .. })
        ));

        authorize(&mut server, &gov(), &alice, Authorization::Officer, 1).unwrap();
        balance(&server, &alice, &bob).unwrap();
    }

    #[test]
    fn transfer_requires_owning_the_source() {
        let mut server = server_with(&["alice", "bob"]);
        let alice = AccountId::parse("alice");
        let bob = AccountId::parse("bob");
        print_money(&mut server, &gov(), &bob, Amount::from_int(50), 0).unwrap();

        let result = transfer(&mut server, &alice, &bob, &alice, Amount::from_int(10), 1);
        assert!(matches!(result, Err(LedgerError::Unauthorized { .. })));
        // An admin may move anyone's money.
        transfer(&mut server, &gov(), &bob, &alice, Amount::from_int(10), 2).unwrap();
    }

    #[test]
    fn printing_money_is_administrative() {
        let mut server = server_with(&["alice"]);
        let alice = AccountId::parse("alice");
        let result = print_money(&mut server, &alice, &alice, Amount::from_int(9), 0);
        assert!(matches!(result, Err(LedgerError::Unauthorized { .. })));
    }

    #[test]
    fn recurring_transfer_takes_a_per_tick_amount() {
        let mut server = server_with(&["alice", "bob"]);
        let alice = AccountId::parse("alice");
        let bob = AccountId::parse("bob");
        print_money(&mut server, &gov(), &alice, Amount::from_int(100), 0).unwrap();

        // 2 per tick over 10 ticks: total 20.
        let id = create_recurring_transfer(
            &mut server,
            &alice,
            &alice,
            &bob,
            Amount::from_int(2),
            10,
            1,
        )
        .unwrap();
        let transfer = server.bank().recurring_transfer(id).unwrap();
        assert_eq!(*transfer.total(), Amount::from_int(20));
        assert_eq!(transfer.per_tick(), Amount::from_int(2));
    }

    #[test]
    fn alias_linking_round_trip() {
        let mut server = server_with(&["alice"]);
        let alice = AccountId::parse("alice");
        let discord = AccountId::parse("discord/42");

        let signature = request_alias(&mut server, &alice, &discord, 1).unwrap();
        add_alias(&mut server, &discord, &alice, &signature, 2).unwrap();

        assert_eq!(
            server.bank().resolve(&alice).unwrap(),
            server.bank().resolve(&discord).unwrap()
        );
    }

    #[test]
    fn alias_with_a_bogus_signature_is_rejected() {
        let mut server = server_with(&["alice"]);
        let alice = AccountId::parse("alice");
        let discord = AccountId::parse("discord/42");

        // A signature from a key the account never registered.
        let rogue = generate_signing_key();
        let signature = sign_message(&rogue, &discord.canonical());
        // Give the account one legitimate key so the list is non-empty.
        request_alias(&mut server, &alice, &AccountId::parse("discord/7"), 1).unwrap();

        let result = add_alias(&mut server, &discord, &alice, &signature, 2);
        assert!(matches!(result, Err(LedgerError::InvalidSignature)));
        assert!(!server.bank().contains(&discord));
    }

    #[test]
    fn proxy_grant_gates_proxied_authors() {
        let mut server = server_with(&["alice", "bob"]);
        let alice = AccountId::parse("alice");
        let bob = AccountId::parse("bob");
        print_money(&mut server, &gov(), &alice, Amount::from_int(50), 0).unwrap();

        // bob:alice = bob acting as alice, without a grant: refused.
        let proxied = AccountId::parse("bob:alice");
        let result = transfer(&mut server, &proxied, &alice, &bob, Amount::from_int(5), 1);
        assert!(matches!(result, Err(LedgerError::Unauthorized { .. })));

        add_proxy(&mut server, &gov(), &alice, &bob, 2).unwrap();
        transfer(&mut server, &proxied, &alice, &bob, Amount::from_int(5), 3).unwrap();
        assert_eq!(balance(&server, &alice, &alice).unwrap(), Amount::from_int(45));

        // Revocation closes the door again; a second revoke reports absent.
        assert!(remove_proxy(&mut server, &gov(), &alice, &bob, 4).unwrap());
        assert!(!remove_proxy(&mut server, &gov(), &alice, &bob, 5).unwrap());
        let result = transfer(&mut server, &proxied, &alice, &bob, Amount::from_int(5), 6);
        assert!(matches!(result, Err(LedgerError::Unauthorized { .. })));
    }

    #[test]
    fn verify_proxy_accepts_grant_or_signature() {
        let mut server = server_with(&["alice", "bob"]);
        let alice = AccountId::parse("alice");
        let bob = AccountId::parse("bob");

        assert!(!verify_proxy(&server, &bob, &alice, None, "").unwrap());
        add_proxy(&mut server, &gov(), &alice, &bob, 1).unwrap();
        assert!(verify_proxy(&server, &bob, &alice, None, "").unwrap());

        // Signature path: sign with a key registered on alice.
        let key = generate_signing_key();
        add_public_key(
            &mut server,
            &alice,
            &alice,
            encode_key(&key.verifying_key()),
            2,
        )
        .unwrap();
        let signature = sign_message(&key, "pay bob 5");
        assert!(verify_proxy(&server, &bob, &alice, Some(&signature), "pay bob 5").unwrap());
        assert!(!verify_proxy(&server, &bob, &alice, Some(&signature), "pay bob 500").unwrap());
    }

    #[test]
    fn listing_accounts_is_administrative_but_public_list_is_free() {
        let mut server = server_with(&["alice", "bob"]);
        let alice = AccountId::parse("alice");
        assert!(matches!(
            list_accounts(&server, &alice),
            Err(LedgerError::Unauthorized { .. })
        ));
        assert!(list_public_accounts(&server).is_empty());
        assert!(toggle_public(&mut server, &alice, &alice, 1).unwrap());
        assert_eq!(list_public_accounts(&server).len(), 1);
    }

    #[test]
    fn tax_administration_is_gated() {
        let mut server = server_with(&["alice"]);
        let alice = AccountId::parse("alice");
        let result = add_tax_bracket(
            &mut server,
            &alice,
            Amount::zero(),
            None,
            Amount::from_int(10),
            "flat".to_string(),
            0,
        );
        assert!(matches!(result, Err(LedgerError::Unauthorized { .. })));
        assert!(matches!(
            force_tax(&mut server, &alice, 1),
            Err(LedgerError::Unauthorized { .. })
        ));
        assert!(matches!(
            auto_tax(&mut server, &alice, 2),
            Err(LedgerError::Unauthorized { .. })
        ));
    }

    #[test]
    fn hypothetical_tax_reports_without_collecting() {
        let mut server = server_with(&["alice"]);
        let alice = AccountId::parse("alice");
        print_money(&mut server, &gov(), &alice, Amount::from_int(1000), 0).unwrap();
        add_tax_bracket(
            &mut server,
            &gov(),
            Amount::zero(),
            None,
            Amount::from_int(10),
            "flat".to_string(),
            1,
        )
        .unwrap();

        let report = hypothetical_tax(&server, &gov()).unwrap();
        assert_eq!(report, vec![(alice.clone(), Amount::from_int(100))]);
        assert_eq!(balance(&server, &gov(), &alice).unwrap(), Amount::from_int(1000));
    }
}
