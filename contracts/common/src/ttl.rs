use soroban_sdk::{Env, IntoVal, Val};

/// Ledgers before expiry at which an entry's TTL gets bumped (~300 days @ ~5s/ledger).
pub const TTL_THRESHOLD: u32 = 5_184_000;
/// Ledgers an entry's TTL is extended to (~600 days @ ~5s/ledger).
pub const TTL_EXTEND_TO: u32 = 10_368_000;

/// Extends the TTL of a persistent entry. The entry must exist.
pub fn extend_persistent<K>(env: &Env, key: &K)
where
    K: IntoVal<Env, Val>,
{
    env.storage()
        .persistent()
        .extend_ttl(key, TTL_THRESHOLD, TTL_EXTEND_TO);
}

/// Extends the TTL of the contract instance and everything stored in it.
pub fn extend_instance(env: &Env) {
    env.storage()
        .instance()
        .extend_ttl(TTL_THRESHOLD, TTL_EXTEND_TO);
}
