#![no_main]

//! Fuzz harness for the ciphertext codec.
//!
//! | Target          | What we are looking for                            |
//! |-----------------|----------------------------------------------------|
//! | `decrypt`       | Never panics on arbitrary bytes                    |
//! | accepted input  | Re-encrypting the decoded value yields the input   |
//! | `add` / `scale` | Match checked i128 arithmetic, report overflow     |

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use power_futures::codec::{CiphertextCodec, CodecError, EnvelopeCodec};
use soroban_sdk::{Bytes, Env};

#[derive(Arbitrary, Debug)]
pub struct FuzzInput {
    raw: Vec<u8>,
    a: i128,
    b: i128,
    percent: i16,
}

fuzz_target!(|input: FuzzInput| {
    let env = Env::default();

    let ct = Bytes::from_slice(&env, &input.raw);
    if let Ok(v) = EnvelopeCodec::decrypt(&env, &ct) {
        assert_eq!(EnvelopeCodec::encrypt(&env, v), ct);
    }

    let ea = EnvelopeCodec::encrypt(&env, input.a);
    let eb = EnvelopeCodec::encrypt(&env, input.b);
    match (EnvelopeCodec::add(&env, &ea, &eb), input.a.checked_add(input.b)) {
        (Ok(sum), Some(expected)) => {
            assert_eq!(EnvelopeCodec::decrypt(&env, &sum), Ok(expected))
        }
        (Err(CodecError::Overflow), None) => {}
        (got, want) => panic!("add mismatch: {:?} vs {:?}", got, want),
    }

    let percent = input.percent as i128;
    let expected = input.a.checked_mul(100 + percent).map(|v| v / 100);
    match (EnvelopeCodec::scale(&env, &ea, percent), expected) {
        (Ok(scaled), Some(v)) => assert_eq!(EnvelopeCodec::decrypt(&env, &scaled), Ok(v)),
        (Err(CodecError::Overflow), None) => {}
        (got, want) => panic!("scale mismatch: {:?} vs {:?}", got, want),
    }
});
