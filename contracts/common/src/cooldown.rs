//! Per-address wall-clock cooldowns.
//!
//! Each guarded operation picks a *channel* symbol so that, for example,
//! submissions and aggregation requests are throttled independently. The
//! cooldown is measured against the ledger timestamp of the caller's last
//! successful action on that channel; it does not reset at any batch or cycle
//! boundary.
//!
//! Callers enforce authorization themselves; this module only tracks time.

use soroban_sdk::{symbol_short, Address, Env, Symbol};

use crate::ttl::extend_persistent;
use crate::CommonError;

const CD_LAST: Symbol = symbol_short!("CD_LAST");

fn last_key(channel: &Symbol, who: &Address) -> (Symbol, Symbol, Address) {
    (CD_LAST, channel.clone(), who.clone())
}

/// Timestamp of `who`'s last recorded action on `channel`, if any.
pub fn last_action(env: &Env, channel: &Symbol, who: &Address) -> Option<u64> {
    env.storage().persistent().get(&last_key(channel, who))
}

/// Returns `CommonError::CooldownActive` while
/// `now < last_action + cooldown_secs`.
///
/// An address that never acted on the channel is always allowed.
pub fn check_cooldown(
    env: &Env,
    channel: &Symbol,
    who: &Address,
    cooldown_secs: u64,
) -> Result<(), CommonError> {
    if cooldown_secs == 0 {
        return Ok(());
    }
    if let Some(last) = last_action(env, channel, who) {
        let ready_at = last.saturating_add(cooldown_secs);
        if env.ledger().timestamp() < ready_at {
            return Err(CommonError::CooldownActive);
        }
    }
    Ok(())
}

/// Stamps `who`'s last action on `channel` with the current ledger time.
pub fn record_action(env: &Env, channel: &Symbol, who: &Address) {
    let key = last_key(channel, who);
    env.storage()
        .persistent()
        .set(&key, &env.ledger().timestamp());
    extend_persistent(env, &key);
}

/// Seconds left before `who` may act again on `channel` (0 when ready).
pub fn remaining_cooldown(env: &Env, channel: &Symbol, who: &Address, cooldown_secs: u64) -> u64 {
    match last_action(env, channel, who) {
        Some(last) => last
            .saturating_add(cooldown_secs)
            .saturating_sub(env.ledger().timestamp()),
        None => 0,
    }
}
