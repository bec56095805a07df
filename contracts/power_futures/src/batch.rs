//! Batch lifecycle and per-batch submission logs.
//!
//! ## Lifecycle
//! 1. `initialize` opens batch 1.
//! 2. Providers submit into the current batch while it is open.
//! 3. `close_current`: the owner closes the current batch.
//! 4. `open_next`: the owner opens `current + 1`. A still-open current batch
//!    is closed first, so at most one batch is ever open.
//!
//! Each batch keeps an append-only log of the record ids submitted to it, in
//! submission order. The aggregation protocol reads its inputs from this log.
//! A log is one storage entry and is folded in full by every aggregate
//! request, so it holds at most [`MAX_BATCH_SUBMISSIONS`] ids.

use soroban_sdk::{contracttype, symbol_short, Env, String, Symbol, Vec};

use crate::ContractError;
use pf_common::ttl::extend_persistent;

pub const BATCH_CTR: Symbol = symbol_short!("BATCH_CTR");
const BATCH_KEY: Symbol = symbol_short!("BATCH");
const BATCH_LOG: Symbol = symbol_short!("BATCH_LOG");

/// Most records one batch accepts.
pub const MAX_BATCH_SUBMISSIONS: u32 = 100;

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Batch {
    pub id: u64,
    pub opened_at: u64,
    pub closed_at: u64, // 0 while still open
    pub closed: bool,
    /// Distinct records submitted to this batch.
    pub submissions: u32,
}

fn batch_key(id: u64) -> (Symbol, u64) {
    (BATCH_KEY, id)
}

fn log_key(id: u64) -> (Symbol, u64) {
    (BATCH_LOG, id)
}

fn save(env: &Env, batch: &Batch) {
    let key = batch_key(batch.id);
    env.storage().persistent().set(&key, batch);
    extend_persistent(env, &key);
}

/// Id of the current batch (0 before initialisation).
pub fn current_id(env: &Env) -> u64 {
    env.storage().instance().get(&BATCH_CTR).unwrap_or(0)
}

pub fn get(env: &Env, id: u64) -> Option<Batch> {
    let key = batch_key(id);
    let batch: Option<Batch> = env.storage().persistent().get(&key);
    if batch.is_some() {
        extend_persistent(env, &key);
    }
    batch
}

pub fn current(env: &Env) -> Result<Batch, ContractError> {
    get(env, current_id(env)).ok_or(ContractError::NotInitialized)
}

/// `true` for closed batches; unknown ids are reported as closed.
pub fn is_closed(env: &Env, id: u64) -> bool {
    get(env, id).map(|b| b.closed).unwrap_or(true)
}

/// `InvalidBatch` unless `1 <= id <= current`.
pub fn require_known(env: &Env, id: u64) -> Result<(), ContractError> {
    if id == 0 || id > current_id(env) {
        return Err(ContractError::InvalidBatch);
    }
    Ok(())
}

/// Open batch `current + 1`. Returns `(new_id, implicitly_closed_id)`, the
/// latter being 0 when the previous batch was already closed.
pub fn open_next(env: &Env) -> (u64, u64) {
    let current = current_id(env);
    let mut auto_closed = 0;
    if let Some(mut prev) = get(env, current) {
        if !prev.closed {
            prev.closed = true;
            prev.closed_at = env.ledger().timestamp();
            save(env, &prev);
            auto_closed = prev.id;
        }
    }

    let id = current.saturating_add(1);
    save(
        env,
        &Batch {
            id,
            opened_at: env.ledger().timestamp(),
            closed_at: 0,
            closed: false,
            submissions: 0,
        },
    );
    env.storage().instance().set(&BATCH_CTR, &id);
    (id, auto_closed)
}

/// Close the current batch. Returns the closed id.
pub fn close_current(env: &Env) -> Result<u64, ContractError> {
    let mut batch = current(env)?;
    if batch.closed {
        return Err(ContractError::AlreadyClosed);
    }
    batch.closed = true;
    batch.closed_at = env.ledger().timestamp();
    save(env, &batch);
    Ok(batch.id)
}

/// `BatchClosed` when the current batch no longer accepts submissions.
pub fn require_open(env: &Env) -> Result<Batch, ContractError> {
    let batch = current(env)?;
    if batch.closed {
        return Err(ContractError::BatchClosed);
    }
    Ok(batch)
}

/// `CapacityExceeded` once `batch` holds `MAX_BATCH_SUBMISSIONS` records.
pub fn require_room(batch: &Batch) -> Result<(), ContractError> {
    if batch.submissions >= MAX_BATCH_SUBMISSIONS {
        return Err(ContractError::CapacityExceeded);
    }
    Ok(())
}

/// Append `record_id` to the log of the current (open) batch.
pub fn append_submission(env: &Env, record_id: &String) -> Result<u64, ContractError> {
    let mut batch = require_open(env)?;
    require_room(&batch)?;

    let key = log_key(batch.id);
    let mut log = records(env, batch.id);
    log.push_back(record_id.clone());
    env.storage().persistent().set(&key, &log);
    extend_persistent(env, &key);

    batch.submissions = batch.submissions.saturating_add(1);
    save(env, &batch);
    Ok(batch.id)
}

/// Record ids submitted to batch `id`, in submission order.
pub fn records(env: &Env, id: u64) -> Vec<String> {
    let key = log_key(id);
    let log: Option<Vec<String>> = env.storage().persistent().get(&key);
    match log {
        Some(log) => {
            extend_persistent(env, &key);
            log
        }
        None => Vec::new(env),
    }
}
