//! Shared utilities and error types for the power-futures contract suite.
//!
//! This crate provides:
//! - [`CommonError`]: standardised error codes for shared helpers.
//! - [`cooldown`]: per-address, per-channel wall-clock rate limiting.
//! - [`ttl`]: storage TTL constants and extension helpers.
//!
//! Contract-specific errors define their own enums and map `CommonError`
//! values at the contract boundary.

#![no_std]
#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

use soroban_sdk::contracterror;

// ── Modules ──────────────────────────────────────────────────────────────────

pub mod cooldown;
pub mod ttl;

pub use cooldown::*;
pub use ttl::*;

// ── Shared error enum ────────────────────────────────────────────────────────

/// Standardised error codes returned by the shared helpers.
///
/// # Code ranges
/// | Range   | Purpose                        |
/// |---------|--------------------------------|
/// | 1 – 9   | Lifecycle / initialisation     |
/// | 10 – 19 | Authentication & authorisation |
/// | 20 – 29 | Temporal (rate limiting)       |
/// | 30 – 39 | Validation / input             |
/// | 40 – 49 | Contract state                 |
#[contracterror]
#[derive(Clone, Debug, Eq, PartialEq, Copy)]
#[repr(u32)]
pub enum CommonError {
    NotInitialized = 1,
    AlreadyInitialized = 2,
    AccessDenied = 10,
    /// The caller acted on this channel too recently.
    CooldownActive = 20,
    InvalidInput = 30,
    /// The contract is currently paused and cannot process requests.
    Paused = 40,
}
