#![no_main]

//! Fuzz harness for the contract's submission and settlement surface.
//!
//! Drives arbitrary action sequences through the client and checks that the
//! key index stays duplicate-free and that every contract-level refusal,
//! forged oracle results included, is a typed `ContractError` rather than a
//! trap.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use power_futures::{aggregation::OracleProof, PowerFuturesContract, PowerFuturesContractClient};
use soroban_sdk::{
    symbol_short, testutils::Address as _, testutils::Ledger, Address, Bytes, BytesN, Env, Map,
    String,
};

#[derive(Arbitrary, Debug)]
pub enum FuzzAction {
    Submit { provider: u8, slot: u8, power: i64, price: i64 },
    SubmitRaw { provider: u8, slot: u8, power: Vec<u8> },
    Reprice { slot: u8, percent: i16 },
    Settle { slot: u8 },
    SetData { key: Vec<u8>, value: Vec<u8> },
    CloseBatch,
    OpenBatch,
    Request { batch: u8 },
    Deliver { request: u8, clear: Vec<u8>, signature: [u8; 32] },
    Advance { secs: u16 },
}

const ORACLE_KEY: [u8; 32] = [3u8; 32];

fn id(env: &Env, slot: u8) -> String {
    let name = format!("rec-{}", slot % 8);
    String::from_str(env, &name)
}

fuzz_target!(|actions: Vec<FuzzAction>| {
    let env = Env::default();
    env.mock_all_auths();
    let contract_id = env.register(PowerFuturesContract, ());
    let client = PowerFuturesContractClient::new(&env, &contract_id);

    let owner = Address::generate(&env);
    let providers = [Address::generate(&env), Address::generate(&env)];
    client.initialize(&owner, &BytesN::from_array(&env, &ORACLE_KEY), &0u64);
    for p in &providers {
        client.add_provider(&owner, p);
    }
    let dao = String::from_str(&env, "Alpha");

    for action in actions.iter().take(64) {
        match action {
            FuzzAction::Submit { provider, slot, power, price } => {
                let mut fields = Map::new(&env);
                fields.set(symbol_short!("power"), client.encrypt(&(*power as i128)));
                fields.set(symbol_short!("price"), client.encrypt(&(*price as i128)));
                let p = &providers[*provider as usize % providers.len()];
                let _ = client.try_submit(p, &id(&env, *slot), &dao, &fields);
            }
            FuzzAction::SubmitRaw { provider, slot, power } => {
                let mut fields = Map::new(&env);
                fields.set(symbol_short!("power"), Bytes::from_slice(&env, power));
                fields.set(symbol_short!("price"), client.encrypt(&1));
                let p = &providers[*provider as usize % providers.len()];
                let r = client.try_submit(p, &id(&env, *slot), &dao, &fields);
                assert!(!matches!(r, Err(Err(_))), "submit trapped");
            }
            FuzzAction::Reprice { slot, percent } => {
                let r = client.try_apply_price_change(&owner, &id(&env, *slot), &(*percent as i128));
                assert!(!matches!(r, Err(Err(_))), "reprice trapped");
            }
            FuzzAction::Settle { slot } => {
                let _ = client.try_settle(&owner, &id(&env, *slot));
            }
            FuzzAction::SetData { key, value } => {
                if let Ok(key) = std::str::from_utf8(key) {
                    let key = String::from_str(&env, key);
                    let value = Bytes::from_slice(&env, value);
                    let _ = client.try_set_data(&owner, &key, &value);
                }
            }
            FuzzAction::CloseBatch => {
                let _ = client.try_close_current_batch(&owner);
            }
            FuzzAction::OpenBatch => {
                let _ = client.try_open_new_batch(&owner);
            }
            FuzzAction::Request { batch } => {
                let r = client.try_request_aggregate(&owner, &(*batch as u64 % 4));
                assert!(!matches!(r, Err(Err(_))), "request trapped");
            }
            FuzzAction::Deliver { request, clear, signature } => {
                let mut sig = [0u8; 64];
                sig[..32].copy_from_slice(signature);
                let proof = OracleProof {
                    signer: BytesN::from_array(&env, &ORACLE_KEY),
                    signature: BytesN::from_array(&env, &sig),
                };
                let r = client.try_on_decryption_result(
                    &(*request as u64 % 4),
                    &Bytes::from_slice(&env, clear),
                    &proof,
                );
                assert!(!matches!(r, Err(Err(_))), "oracle result trapped");
            }
            FuzzAction::Advance { secs } => {
                let now = env.ledger().timestamp();
                env.ledger().set_timestamp(now + *secs as u64);
            }
        }

        let ids = client.list_ids();
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                assert_ne!(ids.get(i), ids.get(j), "duplicate index entry");
            }
        }
        assert_eq!(client.list_records(&0, &100).len(), ids.len());
    }
});
