//! Record store on top of a raw key/value boundary.
//!
//! ## Layout
//! Values are byte blobs in persistent storage, addressed by UTF-8 keys:
//!
//! | Key             | Value                                 |
//! |-----------------|---------------------------------------|
//! | `contract_keys` | JSON array of every record id         |
//! | `contract_<id>` | JSON object for one record            |
//! | anything else   | opaque application data               |
//!
//! Payloads are UTF-8 JSON (see [`crate::json`]). An empty blob means "not
//! found". The `contract_` namespace belongs to this module; the public raw
//! setter refuses it, and the id `keys` is refused because its record key
//! would be the index key.
//!
//! ## Index discipline
//! The record is written before its id is appended to the index, and an id is
//! appended at most once. Each invocation runs in isolation, so the
//! read-modify-write of the index cannot lose a concurrent append.
//!
//! The index is a single storage entry, so it holds at most [`MAX_RECORDS`]
//! ids; a new id beyond that fails with `CapacityExceeded`.

use soroban_sdk::{contracttype, symbol_short, Address, Bytes, Env, Map, String, Symbol, Vec};

use crate::json;
use crate::ContractError;
use pf_common::ttl::extend_persistent;

const DATA: Symbol = symbol_short!("DATA");

const INDEX_KEY: &[u8] = b"contract_keys";
const RECORD_PREFIX: &[u8] = b"contract_";

/// Longest accepted record id, in bytes.
pub const MAX_ID_LEN: u32 = 64;

/// Most ids the index entry may hold. At `MAX_ID_LEN` each the JSON array
/// stays well under the ledger's per-entry size limit.
pub const MAX_RECORDS: u32 = 500;

/// Field holding the encrypted governance power of a snapshot.
pub const FIELD_POWER: Symbol = symbol_short!("power");
/// Field holding the encrypted price of a snapshot.
pub const FIELD_PRICE: Symbol = symbol_short!("price");

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RecordStatus {
    Active,
    Settled,
    Expired,
}

/// One provider snapshot of a DAO's governance power.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Record {
    pub id: String,
    pub owner: Address,
    /// Human-readable DAO name, e.g. "Alpha".
    pub dao: String,
    /// Batch the record was submitted to.
    pub batch_id: u64,
    pub created_at: u64,
    pub updated_at: u64,
    pub status: RecordStatus,
    /// Field name → ciphertext.
    pub fields: Map<Symbol, Bytes>,
}

// ── Raw boundary ──────────────────────────────────────────────────────────────

fn data_key(key: &Bytes) -> (Symbol, Bytes) {
    (DATA, key.clone())
}

/// Returns the stored blob, or empty bytes when nothing is stored.
pub fn get_data(env: &Env, key: &Bytes) -> Bytes {
    let k = data_key(key);
    match env.storage().persistent().get::<_, Bytes>(&k) {
        Some(value) => {
            extend_persistent(env, &k);
            value
        }
        None => Bytes::new(env),
    }
}

pub fn set_data(env: &Env, key: &Bytes, value: &Bytes) {
    let k = data_key(key);
    env.storage().persistent().set(&k, value);
    extend_persistent(env, &k);
}

/// True for keys owned by the record store (`contract_*`).
pub fn is_reserved(key: &Bytes) -> bool {
    let prefix_len = RECORD_PREFIX.len() as u32;
    if key.len() < prefix_len {
        return false;
    }
    let mut head = [0u8; 9];
    key.slice(..prefix_len).copy_into_slice(&mut head);
    head == *RECORD_PREFIX
}

fn index_key(env: &Env) -> Bytes {
    Bytes::from_slice(env, INDEX_KEY)
}

pub fn record_key(env: &Env, id: &String) -> Bytes {
    let mut key = Bytes::from_slice(env, RECORD_PREFIX);
    key.append(&id.to_bytes());
    key
}

// ── Record API ────────────────────────────────────────────────────────────────

/// Ids are 1..=64 bytes of UTF-8 and may not alias the index key.
pub fn validate_id(id: &String) -> Result<(), ContractError> {
    let len = id.len();
    if len == 0 || len > MAX_ID_LEN {
        return Err(ContractError::InvalidInput);
    }
    let mut buf = [0u8; MAX_ID_LEN as usize];
    id.copy_into_slice(&mut buf[..len as usize]);
    let raw = &buf[..len as usize];
    if core::str::from_utf8(raw).is_err() || raw == &INDEX_KEY[RECORD_PREFIX.len()..] {
        return Err(ContractError::InvalidInput);
    }
    Ok(())
}

/// Upserts `record` under `id` and indexes the id on first write.
pub fn put(env: &Env, id: &String, record: &Record) -> Result<(), ContractError> {
    validate_id(id)?;
    let mut ids = list_ids(env);
    let is_new = !ids.contains(id);
    if is_new && ids.len() >= MAX_RECORDS {
        return Err(ContractError::CapacityExceeded);
    }

    set_data(env, &record_key(env, id), &json::encode_record(env, record)?);
    if is_new {
        ids.push_back(id.clone());
        set_data(env, &index_key(env), &json::encode_ids(env, &ids)?);
    }
    Ok(())
}

/// A payload that no longer parses as a record is reported as `NotFound`.
pub fn get(env: &Env, id: &String) -> Result<Record, ContractError> {
    let blob = get_data(env, &record_key(env, id));
    if blob.is_empty() {
        return Err(ContractError::NotFound);
    }
    json::decode_record(env, &blob)
}

pub fn exists(env: &Env, id: &String) -> bool {
    !get_data(env, &record_key(env, id)).is_empty()
}

/// Snapshot of every record id in insertion order.
pub fn list_ids(env: &Env) -> Vec<String> {
    let blob = get_data(env, &index_key(env));
    if blob.is_empty() {
        return Vec::new(env);
    }
    json::decode_ids(env, &blob).unwrap_or_else(|_| Vec::new(env))
}

/// Page of records in index order. Entries that fail to decode are skipped
/// and do not count against `limit`.
pub fn list_records(env: &Env, offset: u32, limit: u32) -> Vec<Record> {
    let ids = list_ids(env);
    let mut out = Vec::new(env);
    let mut i = offset;
    while i < ids.len() && out.len() < limit {
        if let Some(id) = ids.get(i) {
            if let Ok(record) = get(env, &id) {
                out.push_back(record);
            }
        }
        i += 1;
    }
    out
}
