//! Balances and allowances of the simulated chain.

use std::collections::HashMap;

use ethers::types::{Address, H160, U256};

use super::ContractError;

/// Pseudo-token address for the chain's native asset.
pub const NATIVE_TOKEN: Address = H160([0u8; 20]);

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TokenLedger {
    balances: HashMap<(Address, Address), U256>,
    allowances: HashMap<(Address, Address, Address), U256>,
}

impl TokenLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn balance_of(&self, token: Address, holder: Address) -> U256 {
        self.balances.get(&(token, holder)).copied().unwrap_or_default()
    }

    pub fn allowance(&self, token: Address, owner: Address, spender: Address) -> U256 {
        self.allowances
            .get(&(token, owner, spender))
            .copied()
            .unwrap_or_default()
    }

    pub fn mint(&mut self, token: Address, to: Address, amount: U256) -> Result<(), ContractError> {
        let balance = self.balances.entry((token, to)).or_default();
        *balance = balance.checked_add(amount).ok_or(ContractError::Overflow)?;
        Ok(())
    }

    pub fn approve(&mut self, token: Address, owner: Address, spender: Address, amount: U256) {
        self.allowances.insert((token, owner, spender), amount);
    }

    pub fn transfer(
        &mut self,
        token: Address,
        from: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), ContractError> {
        let available = self.balance_of(token, from);
        if available < amount {
            return Err(ContractError::InsufficientBalance {
                token,
                holder: from,
                required: amount,
                available,
            });
        }
        self.balances.insert((token, from), available - amount);
        self.mint(token, to, amount)
    }

    /// `transferFrom`: `spender` moves `owner`'s tokens using its allowance.
    pub fn transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        owner: Address,
        to: Address,
        amount: U256,
    ) -> Result<(), ContractError> {
        let allowed = self.allowance(token, owner, spender);
        if allowed < amount {
            return Err(ContractError::InsufficientAllowance {
                token,
                spender,
                required: amount,
                available: allowed,
            });
        }
        self.transfer(token, owner, to, amount)?;
        self.allowances.insert((token, owner, spender), allowed - amount);
        Ok(())
    }
}
