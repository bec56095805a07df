//! Owner / provider / pause state.
//!
//! The whole role state lives in one instance-storage value. Entry points load
//! it once and hand `&AccessControlState` to every guard and component that
//! needs it, so no component reads roles from ambient storage on its own.

use soroban_sdk::{contracttype, symbol_short, Address, Env, Symbol, Vec};

use crate::ContractError;

const ACCESS: Symbol = symbol_short!("ACCESS");

#[contracttype]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AccessControlState {
    pub owner: Address,
    /// Allow-list of addresses that may submit snapshots.
    pub providers: Vec<Address>,
    pub paused: bool,
}

impl AccessControlState {
    pub fn new(env: &Env, owner: Address) -> Self {
        AccessControlState {
            owner,
            providers: Vec::new(env),
            paused: false,
        }
    }

    pub fn exists(env: &Env) -> bool {
        env.storage().instance().has(&ACCESS)
    }

    pub fn load(env: &Env) -> Result<Self, ContractError> {
        env.storage()
            .instance()
            .get(&ACCESS)
            .ok_or(ContractError::NotInitialized)
    }

    pub fn save(&self, env: &Env) {
        env.storage().instance().set(&ACCESS, self);
    }

    pub fn is_provider(&self, who: &Address) -> bool {
        self.providers.contains(who)
    }

    pub fn require_owner(&self, caller: &Address) -> Result<(), ContractError> {
        if *caller != self.owner {
            return Err(ContractError::NotOwner);
        }
        Ok(())
    }

    pub fn require_provider(&self, caller: &Address) -> Result<(), ContractError> {
        if !self.is_provider(caller) {
            return Err(ContractError::NotAuthorizedProvider);
        }
        Ok(())
    }

    /// Guard for every state-mutating entry point except `unpause` and the
    /// owner's administrative calls.
    pub fn require_not_paused(&self) -> Result<(), ContractError> {
        if self.paused {
            return Err(ContractError::SystemPaused);
        }
        Ok(())
    }

    /// Returns `false` when `who` was already listed.
    pub fn add_provider(&mut self, who: &Address) -> bool {
        if self.is_provider(who) {
            return false;
        }
        self.providers.push_back(who.clone());
        true
    }

    /// Returns `false` when `who` was not listed.
    pub fn remove_provider(&mut self, who: &Address) -> bool {
        match self.providers.first_index_of(who) {
            Some(i) => {
                self.providers.remove(i);
                true
            }
            None => false,
        }
    }
}
