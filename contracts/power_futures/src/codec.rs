//! Ciphertext codec.
//!
//! Everything outside this module treats ciphertexts as opaque `Bytes`. The
//! contract is written against [`CiphertextCodec`]; [`EnvelopeCodec`] is the
//! scheme currently deployed. It is *not* homomorphic encryption: the value is
//! base64-encoded and wrapped in sentinel tags, and the "homomorphic"
//! operations decode, compute and re-encode. Swapping in a real scheme only
//! requires another implementation of the trait.

use base64::{engine::general_purpose::STANDARD, Engine};
use soroban_sdk::{Bytes, Env};

const OPEN_TAG: &[u8] = b"[FHE]";
const CLOSE_TAG: &[u8] = b"[/FHE]";
/// base64 of a 16-byte big-endian i128 (with padding).
const BODY_LEN: usize = 24;
/// Total length of an envelope ciphertext.
pub const ENVELOPE_LEN: usize = OPEN_TAG.len() + BODY_LEN + CLOSE_TAG.len();

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CodecError {
    /// Missing tags, bad base64, or a body of the wrong width.
    Malformed,
    /// The cleartext result does not fit the numeric domain.
    Overflow,
}

/// Operations the contract is allowed to perform on ciphertexts.
pub trait CiphertextCodec {
    fn encrypt(env: &Env, value: i128) -> Bytes;

    fn decrypt(env: &Env, ciphertext: &Bytes) -> Result<i128, CodecError>;

    fn is_well_formed(env: &Env, ciphertext: &Bytes) -> bool {
        Self::decrypt(env, ciphertext).is_ok()
    }

    /// `E(a) ⊕ E(b) = E(a + b)`.
    fn add(env: &Env, a: &Bytes, b: &Bytes) -> Result<Bytes, CodecError> {
        let sum = Self::decrypt(env, a)?
            .checked_add(Self::decrypt(env, b)?)
            .ok_or(CodecError::Overflow)?;
        Ok(Self::encrypt(env, sum))
    }

    /// `E(v) ↦ E(v * (100 + percent) / 100)`, truncating toward zero.
    fn scale(env: &Env, ciphertext: &Bytes, percent: i128) -> Result<Bytes, CodecError> {
        let value = Self::decrypt(env, ciphertext)?;
        let factor = percent.checked_add(100).ok_or(CodecError::Overflow)?;
        let scaled = value
            .checked_mul(factor)
            .ok_or(CodecError::Overflow)?
            / 100;
        Ok(Self::encrypt(env, scaled))
    }
}

/// `[FHE]` ‖ base64(i128 big-endian) ‖ `[/FHE]`.
pub struct EnvelopeCodec;

impl CiphertextCodec for EnvelopeCodec {
    fn encrypt(env: &Env, value: i128) -> Bytes {
        let mut body = [0u8; BODY_LEN];
        // A 16-byte input always encodes to exactly BODY_LEN bytes.
        let written = STANDARD
            .encode_slice(value.to_be_bytes(), &mut body)
            .unwrap_or(0);

        let mut out = Bytes::from_slice(env, OPEN_TAG);
        out.extend_from_slice(&body[..written]);
        out.extend_from_slice(CLOSE_TAG);
        out
    }

    fn decrypt(_env: &Env, ciphertext: &Bytes) -> Result<i128, CodecError> {
        if ciphertext.len() as usize != ENVELOPE_LEN {
            return Err(CodecError::Malformed);
        }
        let mut raw = [0u8; ENVELOPE_LEN];
        ciphertext.copy_into_slice(&mut raw);

        let body_end = ENVELOPE_LEN - CLOSE_TAG.len();
        if &raw[..OPEN_TAG.len()] != OPEN_TAG || &raw[body_end..] != CLOSE_TAG {
            return Err(CodecError::Malformed);
        }

        let mut decoded = [0u8; 18];
        let n = STANDARD
            .decode_slice(&raw[OPEN_TAG.len()..body_end], &mut decoded)
            .map_err(|_| CodecError::Malformed)?;
        if n != 16 {
            return Err(CodecError::Malformed);
        }

        let mut be = [0u8; 16];
        be.copy_from_slice(&decoded[..16]);
        Ok(i128::from_be_bytes(be))
    }
}
