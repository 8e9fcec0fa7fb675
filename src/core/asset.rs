//! Collateral asset interface and reference fungible asset.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::core::ledger::CollateralAmount;
use crate::error::{Error, Result};
use crate::utils::crypto::{Address, AssetId};

/// Fungible asset accepted as collateral
///
/// Transfers report refusal with `Ok(false)`.
pub trait CollateralAsset: Send + Sync {
    /// Asset address, as registered with the engine
    fn id(&self) -> AssetId;

    /// Move `amount` from `from` to `to` using the caller's allowance
    fn transfer_from(
        &self,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: CollateralAmount,
    ) -> Result<bool>;

    /// Move `amount` from the caller's own balance to `to`
    fn transfer(&self, caller: &Address, to: &Address, amount: CollateralAmount) -> Result<bool>;

    /// Balance of an account
    fn balance_of(&self, owner: &Address) -> CollateralAmount;

    /// Mark a point that [`CollateralAsset::revert`] can return to
    fn checkpoint(&self) {}

    /// Discard the last checkpoint, keeping all changes
    fn commit(&self) {}

    /// Undo every change since the last checkpoint
    fn revert(&self) {}
}

#[derive(Debug, Clone, Default)]
struct AssetState {
    total_supply: u128,
    balances: HashMap<Address, CollateralAmount>,
    allowances: HashMap<(Address, Address), CollateralAmount>,
}

impl AssetState {
    fn balance(&self, owner: &Address) -> CollateralAmount {
        self.balances.get(owner).copied().unwrap_or_default()
    }

    fn move_balance(&mut self, from: &Address, to: &Address, amount: CollateralAmount) -> bool {
        let Some(remaining) = self.balance(from).checked_sub(amount) else {
            return false;
        };
        if from == to {
            return true;
        }
        let Some(credited) = self.balance(to).checked_add(amount) else {
            return false;
        };
        self.balances.insert(*from, remaining);
        self.balances.insert(*to, credited);
        true
    }
}

/// In-memory allowance-based fungible asset
#[derive(Debug)]
pub struct FungibleAsset {
    id: AssetId,
    symbol: String,
    state: RwLock<AssetState>,
    saved: RwLock<Option<AssetState>>,
}

impl FungibleAsset {
    /// Create an empty asset
    pub fn new(id: AssetId, symbol: impl Into<String>) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            state: RwLock::new(AssetState::default()),
            saved: RwLock::new(None),
        }
    }

    /// Asset symbol
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Total supply
    pub fn total_supply(&self) -> CollateralAmount {
        self.state
            .read()
            .map(|s| CollateralAmount::from_raw(s.total_supply))
            .unwrap_or_default()
    }

    /// Credit `amount` to `to` out of thin air
    pub fn mint(&self, to: &Address, amount: CollateralAmount) -> Result<()> {
        if to.is_zero() {
            return Err(Error::ZeroAddress);
        }

        let mut state = self.state.write().map_err(|_| Error::Lock)?;
        state.total_supply = state.total_supply.checked_add(amount.raw()).ok_or_else(|| Error::Overflow {
            operation: format!("{} supply", self.symbol),
        })?;
        let balance = state.balance(to);
        state.balances.insert(*to, CollateralAmount::from_raw(balance.raw() + amount.raw()));
        Ok(())
    }

    /// Let `spender` move up to `amount` of `owner`'s balance
    pub fn approve(&self, owner: &Address, spender: &Address, amount: CollateralAmount) -> Result<()> {
        let mut state = self.state.write().map_err(|_| Error::Lock)?;
        state.allowances.insert((*owner, *spender), amount);
        Ok(())
    }

    /// Allowance granted by `owner` to `spender`
    pub fn allowance(&self, owner: &Address, spender: &Address) -> CollateralAmount {
        self.state
            .read()
            .ok()
            .and_then(|s| s.allowances.get(&(*owner, *spender)).copied())
            .unwrap_or_default()
    }
}

impl CollateralAsset for FungibleAsset {
    fn id(&self) -> AssetId {
        self.id
    }

    fn transfer_from(
        &self,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: CollateralAmount,
    ) -> Result<bool> {
        let mut state = self.state.write().map_err(|_| Error::Lock)?;

        let allowance = state.allowances.get(&(*from, *caller)).copied().unwrap_or_default();
        let Some(remaining) = allowance.checked_sub(amount) else {
            return Ok(false);
        };
        if !state.move_balance(from, to, amount) {
            return Ok(false);
        }
        state.allowances.insert((*from, *caller), remaining);

        Ok(true)
    }

    fn transfer(&self, caller: &Address, to: &Address, amount: CollateralAmount) -> Result<bool> {
        let mut state = self.state.write().map_err(|_| Error::Lock)?;
        Ok(state.move_balance(caller, to, amount))
    }

    fn balance_of(&self, owner: &Address) -> CollateralAmount {
        self.state.read().map(|s| s.balance(owner)).unwrap_or_default()
    }

    fn checkpoint(&self) {
        if let (Ok(state), Ok(mut saved)) = (self.state.read(), self.saved.write()) {
            *saved = Some(state.clone());
        }
    }

    fn commit(&self) {
        if let Ok(mut saved) = self.saved.write() {
            *saved = None;
        }
    }

    fn revert(&self) {
        if let (Ok(mut state), Ok(mut saved)) = (self.state.write(), self.saved.write()) {
            if let Some(previous) = saved.take() {
                *state = previous;
            }
        }
    }
}
