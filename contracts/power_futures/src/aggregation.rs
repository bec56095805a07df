//! Aggregation / decryption request protocol.
//!
//! ## Request
//! `request` snapshots the encrypted aggregate of a batch (`[Σ power,
//! Σ price, count]`, folded with the codec over the batch's submission log),
//! fingerprints it, and stores a pending [`DecryptionRequest`] under a fresh id.
//! The contract then emits the ciphertexts for the off-chain oracle.
//!
//! ## Callback
//! `apply_result` accepts the oracle's cleartexts only if
//! 1. the request exists, is still pending and has not outlived its TTL,
//! 2. recomputing the aggregate from *current* storage yields the same
//!    fingerprint (the data was not changed in flight), and
//! 3. the ed25519 proof over the result was produced by the configured oracle
//!    key (the cleartexts were not forged).
//!
//! Checks 2 and 3 are independent; both always run.
//!
//! ## Determinism
//! `gather` reads only durable state (the batch log and the records it
//! names) and walks it in log order, so recomputation is bit-identical as long
//! as nothing changed.

use soroban_sdk::{
    contracttype, symbol_short, xdr::ToXdr, Address, Bytes, BytesN, Env, Symbol, Vec,
};

use ed25519_dalek::{Signature, VerifyingKey};

use crate::codec::CiphertextCodec;
use crate::config::Config;
use crate::store::{self, FIELD_POWER, FIELD_PRICE};
use crate::{batch, map_codec_error, ActiveCodec, ContractError};
use pf_common::ttl::extend_persistent;

const REQ_CTR: Symbol = symbol_short!("REQ_CTR");
const REQ_KEY: Symbol = symbol_short!("DEC_REQ");
const RESULT_KEY: Symbol = symbol_short!("AGG_RES");
const LATEST_KEY: Symbol = symbol_short!("AGG_LAST");

/// Cooldown channel for aggregate requests.
pub const REQUEST_CHANNEL: Symbol = symbol_short!("AGG_REQ");

const STATE_DOMAIN: &[u8] = b"PWRFUT-AGG-v1";
const MESSAGE_DOMAIN: &[u8] = b"PWRFUT-DEC-v1";

/// Number of ciphertexts (and expected cleartexts) per request.
pub const AGGREGATE_WIDTH: u32 = 3;
/// Width of one encoded cleartext (big-endian i128).
pub const CLEARTEXT_LEN: u32 = 16;

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum RequestStatus {
    /// Waiting for the oracle.
    Requested,
    /// Result accepted and published. Terminal.
    Completed,
    /// Abandoned after its TTL. Terminal.
    Expired,
}

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DecryptionRequest {
    pub request_id: u64,
    pub batch_id: u64,
    /// Fingerprint of the aggregate ciphertexts at request time.
    pub state_hash: BytesN<32>,
    pub requester: Address,
    pub requested_at: u64,
    pub ciphertext_count: u32,
    pub status: RequestStatus,
}

impl DecryptionRequest {
    pub fn processed(&self) -> bool {
        self.status == RequestStatus::Completed
    }
}

/// Authenticity proof attached to a decryption result.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OracleProof {
    /// ed25519 public key of the signer.
    pub signer: BytesN<32>,
    /// Signature over [`decryption_message`].
    pub signature: BytesN<64>,
}

/// Published cleartext aggregate of a batch.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AggregateResult {
    pub request_id: u64,
    pub batch_id: u64,
    pub total_power: i128,
    pub total_price: i128,
    pub count: i128,
    pub average_power: i128,
    pub average_price: i128,
    pub published_at: u64,
}

/// Encrypted aggregate inputs of a batch and their fingerprint.
#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AggregateSnapshot {
    pub batch_id: u64,
    pub ciphertexts: Vec<Bytes>,
    pub state_hash: BytesN<32>,
}

fn request_key(id: u64) -> (Symbol, u64) {
    (REQ_KEY, id)
}

fn result_key(request_id: u64) -> (Symbol, u64) {
    (RESULT_KEY, request_id)
}

fn latest_key(batch_id: u64) -> (Symbol, u64) {
    (LATEST_KEY, batch_id)
}

fn save_request(env: &Env, req: &DecryptionRequest) {
    let key = request_key(req.request_id);
    env.storage().persistent().set(&key, req);
    extend_persistent(env, &key);
}

fn push_u32(buf: &mut Bytes, v: u32) {
    buf.extend_from_slice(&v.to_be_bytes());
}

fn push_u64(buf: &mut Bytes, v: u64) {
    buf.extend_from_slice(&v.to_be_bytes());
}

// ── Snapshot ──────────────────────────────────────────────────────────────────

/// Fold the batch's submissions into `[Σ power, Σ price, count]`.
///
/// Records that no longer decode, or lack one of the fields, are skipped;
/// the skip is itself a function of storage, so it is reproducible.
pub fn gather(env: &Env, batch_id: u64) -> Result<Vec<Bytes>, ContractError> {
    let mut power = ActiveCodec::encrypt(env, 0);
    let mut price = ActiveCodec::encrypt(env, 0);
    let mut count = ActiveCodec::encrypt(env, 0);
    let one = ActiveCodec::encrypt(env, 1);

    for id in batch::records(env, batch_id).iter() {
        let record = match store::get(env, &id) {
            Ok(r) => r,
            Err(_) => continue,
        };
        let (p, q) = match (record.fields.get(FIELD_POWER), record.fields.get(FIELD_PRICE)) {
            (Some(p), Some(q)) => (p, q),
            _ => continue,
        };
        power = ActiveCodec::add(env, &power, &p).map_err(map_codec_error)?;
        price = ActiveCodec::add(env, &price, &q).map_err(map_codec_error)?;
        count = ActiveCodec::add(env, &count, &one).map_err(map_codec_error)?;
    }

    let mut out = Vec::new(env);
    out.push_back(power);
    out.push_back(price);
    out.push_back(count);
    Ok(out)
}

/// `sha256(domain ‖ contract ‖ batch_id ‖ (len ‖ ciphertext)*)`.
pub fn state_hash(env: &Env, batch_id: u64, ciphertexts: &Vec<Bytes>) -> BytesN<32> {
    let mut buf = Bytes::from_slice(env, STATE_DOMAIN);
    buf.append(&env.current_contract_address().to_xdr(env));
    push_u64(&mut buf, batch_id);
    for ct in ciphertexts.iter() {
        push_u32(&mut buf, ct.len());
        buf.append(&ct);
    }
    env.crypto().sha256(&buf).into()
}

pub fn snapshot(env: &Env, batch_id: u64) -> Result<AggregateSnapshot, ContractError> {
    batch::require_known(env, batch_id)?;
    let ciphertexts = gather(env, batch_id)?;
    let state_hash = state_hash(env, batch_id, &ciphertexts);
    Ok(AggregateSnapshot {
        batch_id,
        ciphertexts,
        state_hash,
    })
}

// ── Request table ─────────────────────────────────────────────────────────────

pub fn get_request(env: &Env, request_id: u64) -> Option<DecryptionRequest> {
    let key = request_key(request_id);
    let req: Option<DecryptionRequest> = env.storage().persistent().get(&key);
    if req.is_some() {
        extend_persistent(env, &key);
    }
    req
}

/// Last issued request id (0 if none).
pub fn last_request_id(env: &Env) -> u64 {
    env.storage().instance().get(&REQ_CTR).unwrap_or(0)
}

/// Snapshot batch `batch_id` and register a pending request for it.
///
/// Callers have already enforced pause and cooldown.
pub fn request(
    env: &Env,
    requester: &Address,
    batch_id: u64,
) -> Result<(DecryptionRequest, AggregateSnapshot), ContractError> {
    let snap = snapshot(env, batch_id)?;

    let request_id = last_request_id(env).saturating_add(1);
    env.storage().instance().set(&REQ_CTR, &request_id);

    let req = DecryptionRequest {
        request_id,
        batch_id,
        state_hash: snap.state_hash.clone(),
        requester: requester.clone(),
        requested_at: env.ledger().timestamp(),
        ciphertext_count: snap.ciphertexts.len(),
        status: RequestStatus::Requested,
    };
    save_request(env, &req);
    Ok((req, snap))
}

fn is_past_ttl(env: &Env, req: &DecryptionRequest, ttl_secs: u64) -> bool {
    ttl_secs > 0 && env.ledger().timestamp() > req.requested_at.saturating_add(ttl_secs)
}

/// Move an abandoned request to `Expired`.
pub fn expire(env: &Env, request_id: u64, ttl_secs: u64) -> Result<DecryptionRequest, ContractError> {
    let mut req = get_request(env, request_id).ok_or(ContractError::UnknownRequest)?;
    match req.status {
        RequestStatus::Completed => return Err(ContractError::ReplayRejected),
        RequestStatus::Expired => return Err(ContractError::RequestExpired),
        RequestStatus::Requested => {}
    }
    if !is_past_ttl(env, &req, ttl_secs) {
        return Err(ContractError::RequestNotExpired);
    }
    req.status = RequestStatus::Expired;
    save_request(env, &req);
    Ok(req)
}

// ── Callback ──────────────────────────────────────────────────────────────────

/// Bytes the oracle signs for a result:
/// `domain ‖ contract ‖ request_id ‖ state_hash ‖ cleartexts`.
pub fn decryption_message(
    env: &Env,
    request_id: u64,
    state_hash: &BytesN<32>,
    cleartexts: &Bytes,
) -> Bytes {
    let mut msg = Bytes::from_slice(env, MESSAGE_DOMAIN);
    msg.append(&env.current_contract_address().to_xdr(env));
    push_u64(&mut msg, request_id);
    msg.extend_from_slice(&state_hash.to_array());
    msg.append(cleartexts);
    msg
}

fn verify_proof(
    env: &Env,
    config: &Config,
    req: &DecryptionRequest,
    cleartexts: &Bytes,
    proof: &OracleProof,
) -> Result<(), ContractError> {
    if proof.signer != config.oracle_key {
        return Err(ContractError::ProofInvalid);
    }
    let key = VerifyingKey::from_bytes(&config.oracle_key.to_array())
        .map_err(|_| ContractError::ProofInvalid)?;
    let signature = Signature::from_bytes(&proof.signature.to_array());
    let msg = decryption_message(env, req.request_id, &req.state_hash, cleartexts);
    key.verify_strict(&msg.to_alloc_vec(), &signature)
        .map_err(|_| ContractError::ProofInvalid)
}

/// Split `cleartexts` into `expected` big-endian i128 values.
pub fn decode_cleartexts(cleartexts: &Bytes, expected: u32) -> Result<[i128; 3], ContractError> {
    if expected != AGGREGATE_WIDTH || cleartexts.len() != expected * CLEARTEXT_LEN {
        return Err(ContractError::MalformedCleartext);
    }
    let mut raw = [0u8; (AGGREGATE_WIDTH * CLEARTEXT_LEN) as usize];
    cleartexts.copy_into_slice(&mut raw);

    let mut values = [0i128; 3];
    for (i, chunk) in raw.chunks_exact(CLEARTEXT_LEN as usize).enumerate() {
        let mut be = [0u8; 16];
        be.copy_from_slice(chunk);
        values[i] = i128::from_be_bytes(be);
    }
    Ok(values)
}

fn average(total: i128, count: i128) -> i128 {
    if count == 0 {
        return 0;
    }
    total / count
}

/// Validate and apply an oracle result. Pause is enforced by the caller.
pub fn apply_result(
    env: &Env,
    config: &Config,
    request_id: u64,
    cleartexts: &Bytes,
    proof: &OracleProof,
) -> Result<AggregateResult, ContractError> {
    let mut req = get_request(env, request_id).ok_or(ContractError::UnknownRequest)?;
    match req.status {
        RequestStatus::Completed => return Err(ContractError::ReplayRejected),
        RequestStatus::Expired => return Err(ContractError::RequestExpired),
        RequestStatus::Requested => {}
    }
    if is_past_ttl(env, &req, config.request_ttl_secs) {
        return Err(ContractError::RequestExpired);
    }

    let current = gather(env, req.batch_id)?;
    if state_hash(env, req.batch_id, &current) != req.state_hash {
        return Err(ContractError::StateMismatch);
    }

    verify_proof(env, config, &req, cleartexts, proof)?;

    let [total_power, total_price, count] = decode_cleartexts(cleartexts, req.ciphertext_count)?;

    let result = AggregateResult {
        request_id,
        batch_id: req.batch_id,
        total_power,
        total_price,
        count,
        average_power: average(total_power, count),
        average_price: average(total_price, count),
        published_at: env.ledger().timestamp(),
    };

    req.status = RequestStatus::Completed;
    save_request(env, &req);

    let rk = result_key(request_id);
    env.storage().persistent().set(&rk, &result);
    extend_persistent(env, &rk);
    let lk = latest_key(req.batch_id);
    env.storage().persistent().set(&lk, &result);
    extend_persistent(env, &lk);

    Ok(result)
}

pub fn get_result(env: &Env, request_id: u64) -> Option<AggregateResult> {
    env.storage().persistent().get(&result_key(request_id))
}

/// Most recently published result for a batch.
pub fn latest_result(env: &Env, batch_id: u64) -> Option<AggregateResult> {
    env.storage().persistent().get(&latest_key(batch_id))
}
