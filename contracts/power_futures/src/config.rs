use soroban_sdk::{contracttype, symbol_short, BytesN, Env, Symbol};

use crate::ContractError;

const CONFIG: Symbol = symbol_short!("CONFIG");

/// Requests left unanswered for a day may be expired.
pub const DEFAULT_REQUEST_TTL_SECS: u64 = 86_400;

/// Owner-tunable parameters.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Config {
    /// Minimum spacing between two submissions (or two aggregate requests)
    /// from the same address.
    pub cooldown_secs: u64,
    /// Age after which an unanswered decryption request may be expired.
    /// 0 disables expiry.
    pub request_ttl_secs: u64,
    /// ed25519 public key whose signatures authenticate decryption results.
    pub oracle_key: BytesN<32>,
}

impl Config {
    pub fn load(env: &Env) -> Result<Self, ContractError> {
        env.storage()
            .instance()
            .get(&CONFIG)
            .ok_or(ContractError::NotInitialized)
    }

    pub fn save(&self, env: &Env) {
        env.storage().instance().set(&CONFIG, self);
    }
}
