//! # Power Futures Testing Framework: Integration Tests
//!
//! - Property-based tests over the codec and aggregation
//! - Random action sequences with invariant checks after every step
//! - Framework self-checks (invariants catch corrupted snapshots)

extern crate std;

use proptest::prelude::*;
use soroban_sdk::{Bytes, String};

use power_futures::{aggregation::RequestStatus, ContractError};
use test_framework::generators::*;
use test_framework::invariants::*;
use test_framework::*;

// ═════════════════════════════════════════════════════════════════════════════
//  Property-Based Tests
// ═════════════════════════════════════════════════════════════════════════════

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    /// **Property**: decrypt(encrypt(v)) == v for every i128.
    #[test]
    fn prop_codec_identity(v in cleartext_strategy()) {
        let mut env = TestEnv::new();
        let h = PowerFuturesHarness::new(&mut env, 1, 0);
        let ct = h.client.encrypt(&v);
        prop_assert_eq!(ct.len(), 35);
        prop_assert_eq!(h.client.decrypt(&ct), v);
    }

    /// **Property**: malformed ciphertexts are refused, never misread.
    #[test]
    fn prop_malformed_ciphertext_rejected(raw in malformed_ciphertext_strategy()) {
        let mut env = TestEnv::new();
        let h = PowerFuturesHarness::new(&mut env, 1, 0);
        let ct = Bytes::from_slice(&h.env.env, &raw);
        if let Ok(Ok(v)) = h.client.try_decrypt(&ct) {
            // Only a genuine envelope may decode.
            prop_assert_eq!(h.client.encrypt(&v), ct);
        } else {
            prop_assert_eq!(
                h.client.try_decrypt(&ct),
                Err(Ok(ContractError::MalformedCiphertext))
            );
        }
    }

    /// **Property**: the settled aggregate equals the cleartext sums and
    /// integer averages of the batch.
    #[test]
    fn prop_aggregate_matches_cleartext_sums(batch in batch_strategy(6)) {
        let mut env = TestEnv::new();
        let h = PowerFuturesHarness::new(&mut env, 3, 0);
        for (i, (power, price)) in batch.iter().enumerate() {
            h.submit(i, &record_id(i), *power, *price).unwrap();
        }

        let req = h.request(1).unwrap();
        let result = h.fulfil(req).unwrap();

        let n = batch.len() as i128;
        let total_power: i128 = batch.iter().map(|(p, _)| p).sum();
        let total_price: i128 = batch.iter().map(|(_, q)| q).sum();
        prop_assert_eq!(result.count, n);
        prop_assert_eq!(result.total_power, total_power);
        prop_assert_eq!(result.total_price, total_price);
        if n == 0 {
            prop_assert_eq!(result.average_power, 0);
        } else {
            prop_assert_eq!(result.average_power, total_power / n);
            prop_assert_eq!(result.average_price, total_price / n);
        }
    }

    /// **Property**: two requests with no mutation in between carry the same
    /// fingerprint.
    #[test]
    fn prop_state_hash_deterministic(batch in batch_strategy(4)) {
        let mut env = TestEnv::new();
        let h = PowerFuturesHarness::new(&mut env, 2, 0);
        for (i, (power, price)) in batch.iter().enumerate() {
            h.submit(i, &record_id(i), *power, *price).unwrap();
        }
        let a = h.request(1).unwrap();
        let b = h.request(1).unwrap();
        prop_assert_eq!(
            h.client.get_request(&a).unwrap().state_hash,
            h.client.get_request(&b).unwrap().state_hash
        );
    }

    /// **Property**: any repricing between request and callback that moves the
    /// price is caught.
    #[test]
    fn prop_reprice_in_flight_is_detected(
        price in 1i128..=1_000_000i128,
        percent in percent_strategy(),
    ) {
        let mut env = TestEnv::new();
        let h = PowerFuturesHarness::new(&mut env, 1, 0);
        h.submit(0, &record_id(0), 100, price).unwrap();
        let req = h.request(1).unwrap();
        let (cleartexts, proof) = h.oracle_answer(req).unwrap();

        let id = h.string(&record_id(0));
        h.client.apply_price_change(&h.owner, &id, &percent);

        let moved = price * (100 + percent) / 100 != price;
        let outcome = h.client.try_on_decryption_result(&req, &cleartexts, &proof);
        if moved {
            prop_assert_eq!(outcome, Err(Ok(ContractError::StateMismatch)));
        } else {
            prop_assert!(matches!(outcome, Ok(Ok(_))));
        }
    }

    /// **Property**: a second callback for the same request never changes the
    /// stored result.
    #[test]
    fn prop_callback_applies_once(power in power_strategy(), price in price_strategy()) {
        let mut env = TestEnv::new();
        let h = PowerFuturesHarness::new(&mut env, 1, 0);
        h.submit(0, &record_id(0), power, price).unwrap();
        let req = h.request(1).unwrap();
        let first = h.fulfil(req).unwrap();

        prop_assert_eq!(h.fulfil(req), Err(ContractError::ReplayRejected));
        prop_assert_eq!(h.client.get_result(&req).unwrap(), first);
    }

    /// **Property**: random action sequences preserve every state invariant.
    #[test]
    fn prop_random_sequences_preserve_invariants(actions in action_sequence(3, 5, 40)) {
        let mut env = TestEnv::new();
        let h = PowerFuturesHarness::new(&mut env, 3, 0);
        let invariants = InvariantSet::power_futures_defaults();
        let transitions = TransitionInvariantSet::power_futures_defaults();

        let mut before = h.snapshot();
        invariants.assert_all(&before);
        for (seq, action) in actions.iter().enumerate() {
            h.apply(action, seq);
            let after = h.snapshot();
            invariants.assert_all(&after);
            transitions.assert_all(&before, &after);
            before = after;
        }
    }

    /// **Property**: with a cooldown, back-to-back submissions from one
    /// provider never both succeed.
    #[test]
    fn prop_cooldown_throttles(cooldown in 1u64..=3_600u64, gap in 0u64..=7_200u64) {
        let mut env = TestEnv::new();
        env.set_timestamp(1_000);
        let h = PowerFuturesHarness::new(&mut env, 1, cooldown);
        h.submit(0, &record_id(0), 1, 1).unwrap();
        h.env.advance_time(gap);

        let second = h.submit(0, &record_id(1), 1, 1);
        if gap < cooldown {
            prop_assert_eq!(second.err(), Some(ContractError::CooldownActive));
        } else {
            prop_assert!(second.is_ok());
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════════
//  Deterministic Scenarios
// ═════════════════════════════════════════════════════════════════════════════

#[test]
fn test_multi_batch_lifecycle_keeps_invariants() {
    let mut env = TestEnv::new();
    let h = PowerFuturesHarness::new(&mut env, 2, 0);
    let invariants = InvariantSet::power_futures_defaults();

    h.submit(0, "a", 100, 10).unwrap();
    h.submit(1, "b", 200, 30).unwrap();
    h.client.close_current_batch(&h.owner);
    assert_eq!(h.submit(0, "c", 1, 1).err(), Some(ContractError::BatchClosed));

    h.client.open_new_batch(&h.owner);
    h.submit(0, "c", 300, 50).unwrap();
    h.client.open_new_batch(&h.owner);

    let snap = h.snapshot();
    invariants.assert_all(&snap);
    assert_eq!(snap.current_batch, 3);
    assert_eq!(snap.batches[0].log.len(), 2);
    assert_eq!(snap.batches[1].log.len(), 1);
    assert!(snap.batches[1].closed);

    let r1 = h.request(1).unwrap();
    let r2 = h.request(2).unwrap();
    assert_eq!(h.fulfil(r1).unwrap().average_power, 150);
    assert_eq!(h.fulfil(r2).unwrap().average_power, 300);
}

#[test]
fn test_expiry_then_reissue() {
    let mut env = TestEnv::new();
    let h = PowerFuturesHarness::new(&mut env, 1, 0);
    h.submit(0, "a", 10, 1).unwrap();
    let stale = h.request(1).unwrap();

    h.env.advance_time(86_401);
    h.client.expire_request(&h.owner, &stale);
    assert_eq!(
        h.client.get_request(&stale).unwrap().status,
        RequestStatus::Expired
    );
    assert_eq!(h.fulfil(stale), Err(ContractError::RequestExpired));

    let fresh = h.request(1).unwrap();
    assert_eq!(h.fulfil(fresh).unwrap().total_power, 10);
}

// ═════════════════════════════════════════════════════════════════════════════
//  Framework Self-Checks
// ═════════════════════════════════════════════════════════════════════════════

#[test]
fn test_invariants_detect_duplicate_index_entry() {
    let mut env = TestEnv::new();
    let h = PowerFuturesHarness::new(&mut env, 1, 0);
    h.submit(0, "a", 1, 1).unwrap();

    let mut snap = h.snapshot();
    snap.index.push(String::from_str(&h.env.env, "a"));
    let violations = InvariantSet::power_futures_defaults().check_all(&snap);
    assert!(violations
        .iter()
        .any(|(name, _)| name == "key index has no duplicate ids"));
}

#[test]
fn test_invariants_detect_second_open_batch() {
    let mut env = TestEnv::new();
    let h = PowerFuturesHarness::new(&mut env, 1, 0);
    h.client.open_new_batch(&h.owner);

    let mut snap = h.snapshot();
    snap.batches[0].closed = false;
    let violations = InvariantSet::power_futures_defaults().check_all(&snap);
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].0, "at most the current batch is open");
}

#[test]
fn test_invariants_detect_dangling_index_entry() {
    let mut env = TestEnv::new();
    let h = PowerFuturesHarness::new(&mut env, 1, 0);
    h.submit(0, "a", 1, 1).unwrap();

    let mut snap = h.snapshot();
    snap.records.clear();
    let violations = InvariantSet::power_futures_defaults().check_all(&snap);
    assert!(violations
        .iter()
        .any(|(name, _)| name == "key index == stored records"));
}

#[test]
fn test_transition_invariants_detect_reordered_index() {
    let mut env = TestEnv::new();
    let h = PowerFuturesHarness::new(&mut env, 1, 0);
    h.submit(0, "a", 1, 1).unwrap();
    h.submit(0, "b", 1, 1).unwrap();

    let before = h.snapshot();
    let mut after = before.clone();
    after.index.swap(0, 1);
    assert!(IndexAppendOnly.check(&before, &after).is_err());
    assert!(IndexAppendOnly.check(&before, &before).is_ok());
}
