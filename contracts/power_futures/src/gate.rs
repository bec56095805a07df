//! Submission gate: role, pause and cooldown checks in front of the batch
//! manager and record store.

use soroban_sdk::{symbol_short, Address, Bytes, Env, Map, String, Symbol};

use crate::access::AccessControlState;
use crate::codec::CiphertextCodec;
use crate::store::{self, Record, RecordStatus, FIELD_POWER, FIELD_PRICE};
use crate::{batch, map_common_error, ActiveCodec, ContractError};
use pf_common::cooldown;

/// Cooldown channel for provider submissions.
pub const SUBMIT_CHANNEL: Symbol = symbol_short!("SUBMIT");

/// Whether a submission created a record or replaced its fields.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SubmitOutcome {
    Created,
    Replaced,
}

/// Checks pause, provider role and cooldown for `submitter`.
pub fn authorize(
    env: &Env,
    access: &AccessControlState,
    submitter: &Address,
    cooldown_secs: u64,
) -> Result<(), ContractError> {
    access.require_not_paused()?;
    access.require_provider(submitter)?;
    cooldown::check_cooldown(env, &SUBMIT_CHANNEL, submitter, cooldown_secs)
        .map_err(map_common_error)
}

fn validate_fields(env: &Env, fields: &Map<Symbol, Bytes>) -> Result<(), ContractError> {
    if !fields.contains_key(FIELD_POWER) || !fields.contains_key(FIELD_PRICE) {
        return Err(ContractError::InvalidInput);
    }
    for (_, ciphertext) in fields.iter() {
        if !ActiveCodec::is_well_formed(env, &ciphertext) {
            return Err(ContractError::MalformedCiphertext);
        }
    }
    Ok(())
}

/// Authorise, then write the record into the current batch.
///
/// A new id creates an `Active` record and appends it to the batch log. An
/// existing id may only be re-submitted by its owner while the record is
/// active and belongs to the current open batch; its fields are replaced.
pub fn submit(
    env: &Env,
    access: &AccessControlState,
    cooldown_secs: u64,
    submitter: &Address,
    id: &String,
    dao: &String,
    fields: &Map<Symbol, Bytes>,
) -> Result<(Record, SubmitOutcome), ContractError> {
    authorize(env, access, submitter, cooldown_secs)?;
    let open = batch::require_open(env)?;

    store::validate_id(id)?;
    if dao.len() == 0 {
        return Err(ContractError::InvalidInput);
    }
    validate_fields(env, fields)?;

    let now = env.ledger().timestamp();
    let (record, outcome) = if store::exists(env, id) {
        let mut existing = store::get(env, id)?;
        if existing.owner != *submitter {
            return Err(ContractError::NotRecordOwner);
        }
        if existing.status != RecordStatus::Active {
            return Err(ContractError::RecordNotActive);
        }
        if existing.batch_id != open.id {
            return Err(ContractError::BatchClosed);
        }
        existing.dao = dao.clone();
        existing.fields = fields.clone();
        existing.updated_at = now;
        store::put(env, id, &existing)?;
        (existing, SubmitOutcome::Replaced)
    } else {
        batch::require_room(&open)?;
        let record = Record {
            id: id.clone(),
            owner: submitter.clone(),
            dao: dao.clone(),
            batch_id: open.id,
            created_at: now,
            updated_at: now,
            status: RecordStatus::Active,
            fields: fields.clone(),
        };
        store::put(env, id, &record)?;
        batch::append_submission(env, id)?;
        (record, SubmitOutcome::Created)
    };

    cooldown::record_action(env, &SUBMIT_CHANNEL, submitter);
    Ok((record, outcome))
}
