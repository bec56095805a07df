//! Events emitted by the power-futures contract.
//!
//! Every event is published under the topic pair
//! `("PWR_FUT", <event name>)` with one of the structs below as data.
//! `DecReq` doubles as the outbound request to the decryption oracle.

use soroban_sdk::{symbol_short, Address, Bytes, BytesN, Env, String, Symbol, Vec};

// ── Internal helper ───────────────────────────────────────────────────────────

fn emit<T: soroban_sdk::IntoVal<Env, soroban_sdk::Val>>(env: &Env, topic: &str, data: T) {
    #[allow(deprecated)]
    env.events()
        .publish((symbol_short!("PWR_FUT"), Symbol::new(env, topic)), data);
}

// ── Event structs ─────────────────────────────────────────────────────────────

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InitializedEvent {
    pub owner: Address,
    pub cooldown_secs: u64,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OwnershipTransferredEvent {
    pub previous_owner: Address,
    pub new_owner: Address,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProviderChangedEvent {
    pub provider: Address,
    pub allowed: bool,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PauseChangedEvent {
    pub caller: Address,
    pub paused: bool,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ConfigChangedEvent {
    pub cooldown_secs: u64,
    pub request_ttl_secs: u64,
    pub oracle_key: BytesN<32>,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BatchOpenedEvent {
    pub batch_id: u64,
    /// Batch closed as a side effect of opening this one (0 if none).
    pub auto_closed: u64,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BatchClosedEvent {
    pub batch_id: u64,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SubmittedEvent {
    pub record_id: String,
    pub provider: Address,
    pub batch_id: u64,
    pub replaced: bool,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RecordStatusEvent {
    pub record_id: String,
    pub caller: Address,
    pub settled: bool,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PriceChangedEvent {
    pub record_id: String,
    pub percent: i128,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DecryptionRequestedEvent {
    pub request_id: u64,
    pub batch_id: u64,
    pub state_hash: BytesN<32>,
    pub ciphertexts: Vec<Bytes>,
    /// Entry point the oracle must call with the result.
    pub callback: Symbol,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ResultPublishedEvent {
    pub request_id: u64,
    pub batch_id: u64,
    pub count: i128,
    pub average_power: i128,
    pub average_price: i128,
    pub timestamp: u64,
}

#[soroban_sdk::contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RequestExpiredEvent {
    pub request_id: u64,
    pub batch_id: u64,
    pub timestamp: u64,
}

// ── Publishers ────────────────────────────────────────────────────────────────

pub fn publish_initialized(env: &Env, owner: Address, cooldown_secs: u64) {
    emit(
        env,
        "Init",
        InitializedEvent {
            owner,
            cooldown_secs,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_ownership_transferred(env: &Env, previous_owner: Address, new_owner: Address) {
    emit(
        env,
        "OwnerXfer",
        OwnershipTransferredEvent {
            previous_owner,
            new_owner,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_provider_changed(env: &Env, provider: Address, allowed: bool) {
    emit(
        env,
        "Provider",
        ProviderChangedEvent {
            provider,
            allowed,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_pause_changed(env: &Env, caller: Address, paused: bool) {
    emit(
        env,
        if paused { "Paused" } else { "Unpaused" },
        PauseChangedEvent {
            caller,
            paused,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_config_changed(
    env: &Env,
    cooldown_secs: u64,
    request_ttl_secs: u64,
    oracle_key: BytesN<32>,
) {
    emit(
        env,
        "Config",
        ConfigChangedEvent {
            cooldown_secs,
            request_ttl_secs,
            oracle_key,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_batch_opened(env: &Env, batch_id: u64, auto_closed: u64) {
    emit(
        env,
        "BatchOpen",
        BatchOpenedEvent {
            batch_id,
            auto_closed,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_batch_closed(env: &Env, batch_id: u64) {
    emit(
        env,
        "BatchClose",
        BatchClosedEvent {
            batch_id,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_submitted(
    env: &Env,
    record_id: String,
    provider: Address,
    batch_id: u64,
    replaced: bool,
) {
    emit(
        env,
        "Submitted",
        SubmittedEvent {
            record_id,
            provider,
            batch_id,
            replaced,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_record_status(env: &Env, record_id: String, caller: Address, settled: bool) {
    emit(
        env,
        if settled { "Settled" } else { "Expired" },
        RecordStatusEvent {
            record_id,
            caller,
            settled,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_price_changed(env: &Env, record_id: String, percent: i128) {
    emit(
        env,
        "PriceChg",
        PriceChangedEvent {
            record_id,
            percent,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_decryption_requested(
    env: &Env,
    request_id: u64,
    batch_id: u64,
    state_hash: BytesN<32>,
    ciphertexts: Vec<Bytes>,
) {
    emit(
        env,
        "DecReq",
        DecryptionRequestedEvent {
            request_id,
            batch_id,
            state_hash,
            ciphertexts,
            callback: Symbol::new(env, "on_decryption_result"),
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_result(
    env: &Env,
    request_id: u64,
    batch_id: u64,
    count: i128,
    average_power: i128,
    average_price: i128,
) {
    emit(
        env,
        "Published",
        ResultPublishedEvent {
            request_id,
            batch_id,
            count,
            average_power,
            average_price,
            timestamp: env.ledger().timestamp(),
        },
    );
}

pub fn publish_request_expired(env: &Env, request_id: u64, batch_id: u64) {
    emit(
        env,
        "ReqExpired",
        RequestExpiredEvent {
            request_id,
            batch_id,
            timestamp: env.ledger().timestamp(),
        },
    );
}
