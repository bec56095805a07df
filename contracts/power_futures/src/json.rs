//! UTF-8 JSON payloads behind the record store's raw key/value boundary.
//!
//! ```text
//! contract_keys  ["alpha-1","alpha-2"]
//! contract_<id>  {"id":"alpha-1","owner":"G…","dao":"Alpha","batchId":1,
//!                 "createdAt":0,"updatedAt":0,"status":"active",
//!                 "fields":{"power":"[FHE]…[/FHE]","price":"[FHE]…[/FHE]"}}
//! ```
//!
//! Soroban host values are converted to guest-heap mirrors and run through
//! `serde_json`. Text that is not valid UTF-8 cannot be stored and is reported
//! as `InvalidInput`; a blob that does not parse is reported as `NotFound`.

use alloc::{collections::BTreeMap, string::String as Text, vec::Vec as TextVec};

use serde::{Deserialize, Serialize};
use soroban_sdk::{xdr::ToXdr, Address, Bytes, Env, Map, String, Symbol, Vec};

use crate::store::{Record, RecordStatus};
use crate::ContractError;

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum StatusJson {
    Active,
    Settled,
    Expired,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecordJson {
    id: Text,
    owner: Text,
    dao: Text,
    batch_id: u64,
    created_at: u64,
    updated_at: u64,
    status: StatusJson,
    fields: BTreeMap<Text, Text>,
}

// ── Host ⇄ guest text ─────────────────────────────────────────────────────────

fn text_from_string(s: &String) -> Result<Text, ContractError> {
    let mut buf = alloc::vec![0u8; s.len() as usize];
    s.copy_into_slice(&mut buf);
    Text::from_utf8(buf).map_err(|_| ContractError::InvalidInput)
}

fn text_from_bytes(b: &Bytes) -> Result<Text, ContractError> {
    Text::from_utf8(b.to_alloc_vec()).map_err(|_| ContractError::InvalidInput)
}

/// Name of a symbol, read from its `ScVal::Symbol` XDR:
/// 4-byte tag, 4-byte big-endian length, then the characters.
pub(crate) fn symbol_name(env: &Env, sym: &Symbol) -> Result<Text, ContractError> {
    let xdr = sym.clone().to_xdr(env);
    if xdr.len() < 8 {
        return Err(ContractError::InvalidInput);
    }
    let mut len = [0u8; 4];
    xdr.slice(4..8).copy_into_slice(&mut len);
    let end = 8u32.saturating_add(u32::from_be_bytes(len));
    if xdr.len() < end {
        return Err(ContractError::InvalidInput);
    }
    text_from_bytes(&xdr.slice(8..end))
}

// ── Record ────────────────────────────────────────────────────────────────────

pub fn encode_record(env: &Env, record: &Record) -> Result<Bytes, ContractError> {
    let mut fields = BTreeMap::new();
    for (name, ciphertext) in record.fields.iter() {
        fields.insert(symbol_name(env, &name)?, text_from_bytes(&ciphertext)?);
    }
    let json = RecordJson {
        id: text_from_string(&record.id)?,
        owner: text_from_string(&record.owner.to_string())?,
        dao: text_from_string(&record.dao)?,
        batch_id: record.batch_id,
        created_at: record.created_at,
        updated_at: record.updated_at,
        status: match record.status {
            RecordStatus::Active => StatusJson::Active,
            RecordStatus::Settled => StatusJson::Settled,
            RecordStatus::Expired => StatusJson::Expired,
        },
        fields,
    };
    let raw = serde_json::to_vec(&json).map_err(|_| ContractError::InvalidInput)?;
    Ok(Bytes::from_slice(env, &raw))
}

/// The owner strkey is trusted: only this module writes `contract_<id>`.
pub fn decode_record(env: &Env, blob: &Bytes) -> Result<Record, ContractError> {
    let raw = blob.to_alloc_vec();
    let json: RecordJson = serde_json::from_slice(&raw).map_err(|_| ContractError::NotFound)?;

    let mut fields = Map::new(env);
    for (name, ciphertext) in json.fields.iter() {
        if name.is_empty() || name.len() > 32 {
            return Err(ContractError::NotFound);
        }
        fields.set(
            Symbol::new(env, name),
            Bytes::from_slice(env, ciphertext.as_bytes()),
        );
    }
    Ok(Record {
        id: String::from_str(env, &json.id),
        owner: Address::from_str(env, &json.owner),
        dao: String::from_str(env, &json.dao),
        batch_id: json.batch_id,
        created_at: json.created_at,
        updated_at: json.updated_at,
        status: match json.status {
            StatusJson::Active => RecordStatus::Active,
            StatusJson::Settled => RecordStatus::Settled,
            StatusJson::Expired => RecordStatus::Expired,
        },
        fields,
    })
}

// ── Id index ──────────────────────────────────────────────────────────────────

pub fn encode_ids(env: &Env, ids: &Vec<String>) -> Result<Bytes, ContractError> {
    let mut out = TextVec::with_capacity(ids.len() as usize);
    for id in ids.iter() {
        out.push(text_from_string(&id)?);
    }
    let raw = serde_json::to_vec(&out).map_err(|_| ContractError::InvalidInput)?;
    Ok(Bytes::from_slice(env, &raw))
}

pub fn decode_ids(env: &Env, blob: &Bytes) -> Result<Vec<String>, ContractError> {
    let raw = blob.to_alloc_vec();
    let parsed: TextVec<Text> =
        serde_json::from_slice(&raw).map_err(|_| ContractError::NotFound)?;
    let mut ids = Vec::new(env);
    for id in parsed.iter() {
        ids.push_back(String::from_str(env, id));
    }
    Ok(ids)
}
