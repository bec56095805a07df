//! # DAO Governance Power Futures
//!
//! Stores encrypted governance-power snapshots submitted by allow-listed
//! providers, groups them into sequential batches, and settles per-batch
//! aggregates through an asynchronous decryption oracle.
//!
//! ## Write path
//! ```text
//! submit ─► gate (pause, provider, cooldown) ─► batch (open?) ─► store
//! ```
//!
//! ## Settlement path
//! ```text
//! request_aggregate ─► snapshot + state hash ─► DecReq event ─► oracle
//! oracle ─► on_decryption_result ─► hash re-check ─► proof check ─► publish
//! ```
//!
//! ## Roles
//! | Role     | May                                                        |
//! |----------|------------------------------------------------------------|
//! | Owner    | transfer ownership, manage providers, pause, configure, run batches |
//! | Provider | submit snapshots, write application data                   |
//! | Anyone   | request aggregates, deliver oracle results, expire requests |
//!
//! While paused, every mutating call other than the owner's administrative
//! ones fails with `SystemPaused`.
#![no_std]
#![allow(clippy::too_many_arguments)]

extern crate alloc;

pub mod access;
pub mod aggregation;
pub mod batch;
pub mod challenge;
pub mod codec;
pub mod config;
pub mod events;
pub mod gate;
pub mod json;
pub mod store;

use access::AccessControlState;
use aggregation::{AggregateResult, AggregateSnapshot, DecryptionRequest, OracleProof};
use batch::Batch;
use codec::{CiphertextCodec, CodecError, EnvelopeCodec};
use config::{Config, DEFAULT_REQUEST_TTL_SECS};
use gate::SubmitOutcome;
use store::{Record, RecordStatus, FIELD_PRICE};

use pf_common::{cooldown, ttl, CommonError};
use soroban_sdk::{
    contract, contracterror, contractimpl, Address, Bytes, BytesN, Env, Map, String, Symbol, Vec,
};

/// Codec used for every ciphertext operation in this contract.
pub type ActiveCodec = EnvelopeCodec;

/// Largest page served by `list_records`.
const MAX_PAGE: u32 = 100;

// ── Contract errors ───────────────────────────────────────────────────────────

/// # Code ranges
/// | Range   | Category                                   |
/// |---------|--------------------------------------------|
/// | 1 – 9   | Initialisation                             |
/// | 10 – 19 | Authorization (acquire a role to proceed)  |
/// | 20 – 29 | Temporal (retry later)                     |
/// | 30 – 39 | Batch / record lifecycle                   |
/// | 40 – 49 | Integrity (never retry the same request)   |
/// | 50 – 59 | Availability                               |
/// | 60 – 69 | Data                                       |
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum ContractError {
    NotInitialized = 1,
    AlreadyInitialized = 2,

    NotOwner = 10,
    NotAuthorizedProvider = 11,
    NotRecordOwner = 12,

    CooldownActive = 20,
    RequestExpired = 21,
    RequestNotExpired = 22,

    BatchClosed = 30,
    AlreadyClosed = 31,
    InvalidBatch = 32,
    RecordNotActive = 33,

    StateMismatch = 40,
    ProofInvalid = 41,
    ReplayRejected = 42,
    UnknownRequest = 43,

    SystemPaused = 50,

    MalformedCiphertext = 60,
    NotFound = 61,
    InvalidInput = 62,
    MalformedCleartext = 63,
    ReservedKey = 64,
    ArithmeticOverflow = 65,
    /// The id index or the current batch log is full.
    CapacityExceeded = 66,
}

pub(crate) fn map_common_error(e: CommonError) -> ContractError {
    match e {
        CommonError::NotInitialized => ContractError::NotInitialized,
        CommonError::AlreadyInitialized => ContractError::AlreadyInitialized,
        CommonError::AccessDenied => ContractError::NotOwner,
        CommonError::CooldownActive => ContractError::CooldownActive,
        CommonError::InvalidInput => ContractError::InvalidInput,
        CommonError::Paused => ContractError::SystemPaused,
    }
}

pub(crate) fn map_codec_error(e: CodecError) -> ContractError {
    match e {
        CodecError::Malformed => ContractError::MalformedCiphertext,
        CodecError::Overflow => ContractError::ArithmeticOverflow,
    }
}

// ── Contract ──────────────────────────────────────────────────────────────────

#[contract]
pub struct PowerFuturesContract;

#[contractimpl]
impl PowerFuturesContract {
    // ── Initialisation ────────────────────────────────────────────────────────

    /// Set the owner, the oracle's signing key and the per-address cooldown,
    /// and open batch 1.
    pub fn initialize(
        env: Env,
        owner: Address,
        oracle_key: BytesN<32>,
        cooldown_secs: u64,
    ) -> Result<(), ContractError> {
        if AccessControlState::exists(&env) {
            return Err(ContractError::AlreadyInitialized);
        }
        owner.require_auth();

        AccessControlState::new(&env, owner.clone()).save(&env);
        Config {
            cooldown_secs,
            request_ttl_secs: DEFAULT_REQUEST_TTL_SECS,
            oracle_key,
        }
        .save(&env);
        ttl::extend_instance(&env);

        let (first, _) = batch::open_next(&env);
        events::publish_initialized(&env, owner, cooldown_secs);
        events::publish_batch_opened(&env, first, 0);
        Ok(())
    }

    // ── Access control ────────────────────────────────────────────────────────

    pub fn get_owner(env: Env) -> Result<Address, ContractError> {
        Ok(AccessControlState::load(&env)?.owner)
    }

    pub fn transfer_ownership(
        env: Env,
        caller: Address,
        new_owner: Address,
    ) -> Result<(), ContractError> {
        caller.require_auth();
        let mut access = Self::load_access(&env)?;
        access.require_owner(&caller)?;

        access.owner = new_owner.clone();
        access.save(&env);
        events::publish_ownership_transferred(&env, caller, new_owner);
        Ok(())
    }

    pub fn add_provider(env: Env, caller: Address, provider: Address) -> Result<(), ContractError> {
        caller.require_auth();
        let mut access = Self::load_access(&env)?;
        access.require_owner(&caller)?;

        if access.add_provider(&provider) {
            access.save(&env);
            events::publish_provider_changed(&env, provider, true);
        }
        Ok(())
    }

    pub fn remove_provider(
        env: Env,
        caller: Address,
        provider: Address,
    ) -> Result<(), ContractError> {
        caller.require_auth();
        let mut access = Self::load_access(&env)?;
        access.require_owner(&caller)?;

        if access.remove_provider(&provider) {
            access.save(&env);
            events::publish_provider_changed(&env, provider, false);
        }
        Ok(())
    }

    pub fn is_provider(env: Env, who: Address) -> bool {
        AccessControlState::load(&env)
            .map(|a| a.is_provider(&who))
            .unwrap_or(false)
    }

    pub fn list_providers(env: Env) -> Vec<Address> {
        AccessControlState::load(&env)
            .map(|a| a.providers)
            .unwrap_or(Vec::new(&env))
    }

    pub fn pause(env: Env, caller: Address) -> Result<(), ContractError> {
        Self::set_paused(&env, caller, true)
    }

    pub fn unpause(env: Env, caller: Address) -> Result<(), ContractError> {
        Self::set_paused(&env, caller, false)
    }

    pub fn is_paused(env: Env) -> bool {
        AccessControlState::load(&env)
            .map(|a| a.paused)
            .unwrap_or(false)
    }

    // ── Configuration ─────────────────────────────────────────────────────────

    pub fn get_config(env: Env) -> Result<Config, ContractError> {
        Config::load(&env)
    }

    pub fn set_cooldown(env: Env, caller: Address, secs: u64) -> Result<(), ContractError> {
        Self::update_config(&env, caller, |c| c.cooldown_secs = secs)
    }

    /// 0 disables request expiry.
    pub fn set_request_ttl(env: Env, caller: Address, secs: u64) -> Result<(), ContractError> {
        Self::update_config(&env, caller, |c| c.request_ttl_secs = secs)
    }

    /// Rotate the oracle key. Results for pending requests must then be signed
    /// with the new key.
    pub fn set_oracle_key(
        env: Env,
        caller: Address,
        oracle_key: BytesN<32>,
    ) -> Result<(), ContractError> {
        Self::update_config(&env, caller, |c| c.oracle_key = oracle_key)
    }

    /// Seconds before `who` may submit again.
    pub fn submit_cooldown_remaining(env: Env, who: Address) -> u64 {
        let secs = Config::load(&env).map(|c| c.cooldown_secs).unwrap_or(0);
        cooldown::remaining_cooldown(&env, &gate::SUBMIT_CHANNEL, &who, secs)
    }

    // ── Batches ───────────────────────────────────────────────────────────────

    /// Open batch `current + 1`, closing the current batch first if it is
    /// still open. Returns the new id.
    pub fn open_new_batch(env: Env, caller: Address) -> Result<u64, ContractError> {
        caller.require_auth();
        let access = Self::load_access(&env)?;
        access.require_owner(&caller)?;
        access.require_not_paused()?;

        let (id, auto_closed) = batch::open_next(&env);
        if auto_closed != 0 {
            events::publish_batch_closed(&env, auto_closed);
        }
        events::publish_batch_opened(&env, id, auto_closed);
        Ok(id)
    }

    pub fn close_current_batch(env: Env, caller: Address) -> Result<u64, ContractError> {
        caller.require_auth();
        let access = Self::load_access(&env)?;
        access.require_owner(&caller)?;
        access.require_not_paused()?;

        let id = batch::close_current(&env)?;
        events::publish_batch_closed(&env, id);
        Ok(id)
    }

    pub fn current_batch_id(env: Env) -> u64 {
        batch::current_id(&env)
    }

    pub fn get_batch(env: Env, batch_id: u64) -> Option<Batch> {
        batch::get(&env, batch_id)
    }

    pub fn is_batch_closed(env: Env, batch_id: u64) -> bool {
        batch::is_closed(&env, batch_id)
    }

    /// Record ids submitted to a batch, in submission order.
    pub fn batch_records(env: Env, batch_id: u64) -> Vec<String> {
        batch::records(&env, batch_id)
    }

    // ── Submissions & records ─────────────────────────────────────────────────

    /// Submit (or, for the record's owner, replace) a snapshot in the current
    /// batch. `fields` must hold well-formed `power` and `price` ciphertexts.
    pub fn submit(
        env: Env,
        provider: Address,
        id: String,
        dao: String,
        fields: Map<Symbol, Bytes>,
    ) -> Result<Record, ContractError> {
        provider.require_auth();
        let access = Self::load_access(&env)?;
        let config = Config::load(&env)?;

        let (record, outcome) = gate::submit(
            &env,
            &access,
            config.cooldown_secs,
            &provider,
            &id,
            &dao,
            &fields,
        )?;
        events::publish_submitted(
            &env,
            id,
            provider,
            record.batch_id,
            outcome == SubmitOutcome::Replaced,
        );
        Ok(record)
    }

    pub fn get_record(env: Env, id: String) -> Result<Record, ContractError> {
        store::get(&env, &id)
    }

    /// Every record id in insertion order.
    pub fn list_ids(env: Env) -> Vec<String> {
        store::list_ids(&env)
    }

    /// Page through records in insertion order, skipping any that fail to
    /// decode. `limit` is capped at 100.
    pub fn list_records(env: Env, offset: u32, limit: u32) -> Vec<Record> {
        store::list_records(&env, offset, limit.min(MAX_PAGE))
    }

    /// Settle an active record. Callable by the record's owner or the
    /// contract owner; ciphertexts are left untouched.
    pub fn settle(env: Env, caller: Address, id: String) -> Result<Record, ContractError> {
        caller.require_auth();
        let access = Self::load_access(&env)?;
        access.require_not_paused()?;

        let mut record = Self::load_active_record(&env, &id)?;
        if caller != record.owner && caller != access.owner {
            return Err(ContractError::NotRecordOwner);
        }
        record.status = RecordStatus::Settled;
        record.updated_at = env.ledger().timestamp();
        store::put(&env, &id, &record)?;

        events::publish_record_status(&env, id, caller, true);
        Ok(record)
    }

    /// Expire an active record. Owner only.
    pub fn expire_record(env: Env, caller: Address, id: String) -> Result<Record, ContractError> {
        caller.require_auth();
        let access = Self::load_access(&env)?;
        access.require_owner(&caller)?;
        access.require_not_paused()?;

        let mut record = Self::load_active_record(&env, &id)?;
        record.status = RecordStatus::Expired;
        record.updated_at = env.ledger().timestamp();
        store::put(&env, &id, &record)?;

        events::publish_record_status(&env, id, caller, false);
        Ok(record)
    }

    /// Re-price an active record by `percent` (e.g. `-20` for a 20 % drop)
    /// without decrypting it on the caller's side.
    pub fn apply_price_change(
        env: Env,
        caller: Address,
        id: String,
        percent: i128,
    ) -> Result<Record, ContractError> {
        caller.require_auth();
        let access = Self::load_access(&env)?;
        access.require_not_paused()?;

        let mut record = Self::load_active_record(&env, &id)?;
        if caller != record.owner && caller != access.owner {
            return Err(ContractError::NotRecordOwner);
        }
        let price = record
            .fields
            .get(FIELD_PRICE)
            .ok_or(ContractError::MalformedCiphertext)?;
        let scaled = ActiveCodec::scale(&env, &price, percent).map_err(map_codec_error)?;
        record.fields.set(FIELD_PRICE, scaled);
        record.updated_at = env.ledger().timestamp();
        store::put(&env, &id, &record)?;

        events::publish_price_changed(&env, id, percent);
        Ok(record)
    }

    // ── Raw data boundary ─────────────────────────────────────────────────────

    /// Stored blob for `key`; empty when nothing is stored.
    pub fn get_data(env: Env, key: String) -> Bytes {
        store::get_data(&env, &key.to_bytes())
    }

    /// Store an application blob. Providers and the owner only; the
    /// `contract_*` namespace is reserved for records.
    pub fn set_data(
        env: Env,
        caller: Address,
        key: String,
        value: Bytes,
    ) -> Result<(), ContractError> {
        caller.require_auth();
        let access = Self::load_access(&env)?;
        access.require_not_paused()?;
        if caller != access.owner {
            access.require_provider(&caller)?;
        }

        let key = key.to_bytes();
        if key.is_empty() {
            return Err(ContractError::InvalidInput);
        }
        if store::is_reserved(&key) {
            return Err(ContractError::ReservedKey);
        }
        store::set_data(&env, &key, &value);
        Ok(())
    }

    // ── Codec ─────────────────────────────────────────────────────────────────

    pub fn encrypt(env: Env, value: i128) -> Bytes {
        ActiveCodec::encrypt(&env, value)
    }

    pub fn decrypt(env: Env, ciphertext: Bytes) -> Result<i128, ContractError> {
        ActiveCodec::decrypt(&env, &ciphertext).map_err(map_codec_error)
    }

    pub fn scale_ciphertext(
        env: Env,
        ciphertext: Bytes,
        percent: i128,
    ) -> Result<Bytes, ContractError> {
        ActiveCodec::scale(&env, &ciphertext, percent).map_err(map_codec_error)
    }

    // ── Aggregation / decryption ──────────────────────────────────────────────

    /// Snapshot the encrypted aggregate of `batch_id` and ask the oracle to
    /// decrypt it. Returns the request id; the request itself goes out as a
    /// `DecReq` event.
    pub fn request_aggregate(
        env: Env,
        caller: Address,
        batch_id: u64,
    ) -> Result<u64, ContractError> {
        caller.require_auth();
        let access = Self::load_access(&env)?;
        access.require_not_paused()?;
        batch::require_known(&env, batch_id)?;

        let config = Config::load(&env)?;
        cooldown::check_cooldown(
            &env,
            &aggregation::REQUEST_CHANNEL,
            &caller,
            config.cooldown_secs,
        )
        .map_err(map_common_error)?;

        let (req, snap) = aggregation::request(&env, &caller, batch_id)?;
        cooldown::record_action(&env, &aggregation::REQUEST_CHANNEL, &caller);

        events::publish_decryption_requested(
            &env,
            req.request_id,
            batch_id,
            req.state_hash,
            snap.ciphertexts,
        );
        Ok(req.request_id)
    }

    /// Current encrypted aggregate and fingerprint of a batch, without
    /// opening a request.
    pub fn preview_aggregate(env: Env, batch_id: u64) -> Result<AggregateSnapshot, ContractError> {
        aggregation::snapshot(&env, batch_id)
    }

    /// The exact bytes the oracle must sign for `cleartexts`.
    pub fn decryption_message(
        env: Env,
        request_id: u64,
        cleartexts: Bytes,
    ) -> Result<Bytes, ContractError> {
        let req = aggregation::get_request(&env, request_id).ok_or(ContractError::UnknownRequest)?;
        Ok(aggregation::decryption_message(
            &env,
            request_id,
            &req.state_hash,
            &cleartexts,
        ))
    }

    /// Oracle callback. `cleartexts` holds one big-endian i128 per requested
    /// ciphertext: total power, total price, count.
    pub fn on_decryption_result(
        env: Env,
        request_id: u64,
        cleartexts: Bytes,
        proof: OracleProof,
    ) -> Result<AggregateResult, ContractError> {
        let access = Self::load_access(&env)?;
        access.require_not_paused()?;
        let config = Config::load(&env)?;

        let result = aggregation::apply_result(&env, &config, request_id, &cleartexts, &proof)?;
        events::publish_result(
            &env,
            result.request_id,
            result.batch_id,
            result.count,
            result.average_power,
            result.average_price,
        );
        Ok(result)
    }

    /// Mark a request that outlived the configured TTL as expired.
    pub fn expire_request(
        env: Env,
        caller: Address,
        request_id: u64,
    ) -> Result<DecryptionRequest, ContractError> {
        caller.require_auth();
        let access = Self::load_access(&env)?;
        access.require_not_paused()?;
        let config = Config::load(&env)?;

        let req = aggregation::expire(&env, request_id, config.request_ttl_secs)?;
        events::publish_request_expired(&env, req.request_id, req.batch_id);
        Ok(req)
    }

    pub fn get_request(env: Env, request_id: u64) -> Option<DecryptionRequest> {
        aggregation::get_request(&env, request_id)
    }

    pub fn get_result(env: Env, request_id: u64) -> Option<AggregateResult> {
        aggregation::get_result(&env, request_id)
    }

    pub fn latest_result(env: Env, batch_id: u64) -> Option<AggregateResult> {
        aggregation::latest_result(&env, batch_id)
    }

    // ── Reveal challenge ──────────────────────────────────────────────────────

    pub fn reveal_challenge(
        env: Env,
        public_key: String,
        chain_id: u32,
        start_timestamp: u64,
        duration_days: u32,
    ) -> Bytes {
        challenge::reveal_challenge(&env, &public_key, chain_id, start_timestamp, duration_days)
    }
}

// ── Internal helpers ──────────────────────────────────────────────────────────

impl PowerFuturesContract {
    fn load_access(env: &Env) -> Result<AccessControlState, ContractError> {
        let access = AccessControlState::load(env)?;
        ttl::extend_instance(env);
        Ok(access)
    }

    fn set_paused(env: &Env, caller: Address, paused: bool) -> Result<(), ContractError> {
        caller.require_auth();
        let mut access = Self::load_access(env)?;
        access.require_owner(&caller)?;

        access.paused = paused;
        access.save(env);
        events::publish_pause_changed(env, caller, paused);
        Ok(())
    }

    fn update_config<F: FnOnce(&mut Config)>(
        env: &Env,
        caller: Address,
        apply: F,
    ) -> Result<(), ContractError> {
        caller.require_auth();
        let access = Self::load_access(env)?;
        access.require_owner(&caller)?;

        let mut config = Config::load(env)?;
        apply(&mut config);
        config.save(env);
        events::publish_config_changed(
            env,
            config.cooldown_secs,
            config.request_ttl_secs,
            config.oracle_key,
        );
        Ok(())
    }

    fn load_active_record(env: &Env, id: &String) -> Result<Record, ContractError> {
        let record = store::get(env, id)?;
        if record.status != RecordStatus::Active {
            return Err(ContractError::RecordNotActive);
        }
        Ok(record)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
