//! Human-readable challenge shown to a user before a decrypted value is
//! revealed locally. It only asks the wallet to confirm intent; nothing in the
//! settlement path depends on it.

use soroban_sdk::{Bytes, Env, String};

fn push_decimal(buf: &mut Bytes, mut v: u64) {
    let mut digits = [0u8; 20];
    let mut i = digits.len();
    loop {
        i -= 1;
        digits[i] = b'0' + (v % 10) as u8;
        v /= 10;
        if v == 0 {
            break;
        }
    }
    buf.extend_from_slice(&digits[i..]);
}

/// ```text
/// publickey:<public_key>
/// contractAddresses:<this contract>
/// chainId:<chain_id>
/// startTimestamp:<start_timestamp>
/// durationDays:<duration_days>
/// ```
pub fn reveal_challenge(
    env: &Env,
    public_key: &String,
    chain_id: u32,
    start_timestamp: u64,
    duration_days: u32,
) -> Bytes {
    let mut msg = Bytes::from_slice(env, b"publickey:");
    msg.append(&public_key.to_bytes());
    msg.extend_from_slice(b"\ncontractAddresses:");
    msg.append(&env.current_contract_address().to_string().to_bytes());
    msg.extend_from_slice(b"\nchainId:");
    push_decimal(&mut msg, chain_id as u64);
    msg.extend_from_slice(b"\nstartTimestamp:");
    push_decimal(&mut msg, start_timestamp);
    msg.extend_from_slice(b"\ndurationDays:");
    push_decimal(&mut msg, duration_days as u64);
    msg
}
