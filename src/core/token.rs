//! Stable token interface and reference implementation.
//!
//! The engine never touches token balances directly. It calls a
//! [`TokenAuthority`], which holds the exclusive right to create and destroy
//! stable token units and only honors calls from its single authorized caller.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use crate::error::{Error, Result};
use crate::utils::constants::TOKEN_DECIMALS;
use crate::utils::crypto::Address;
use crate::utils::math::format_fixed;

// ═══════════════════════════════════════════════════════════════════════════════
// TOKEN AMOUNT
// ═══════════════════════════════════════════════════════════════════════════════

/// Strongly-typed stable token amount (18 decimals, pegged 1:1 to USD)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct TokenAmount(u128);

impl TokenAmount {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Create from smallest units
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Create from whole tokens
    pub const fn from_units(units: u128) -> Self {
        Self(units * 10u128.pow(TOKEN_DECIMALS))
    }

    /// Get raw value
    pub const fn raw(&self) -> u128 {
        self.0
    }

    /// Check if zero
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    /// Checked subtraction
    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Saturating addition
    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_fixed(self.0, TOKEN_DECIMALS))
    }
}

impl From<u128> for TokenAmount {
    fn from(raw: u128) -> Self {
        Self(raw)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TOKEN AUTHORITY INTERFACE
// ═══════════════════════════════════════════════════════════════════════════════

/// Privileged stable token operations consumed by the engine
///
/// `Ok(false)` means the call was refused; `Err` means it failed outright.
pub trait TokenAuthority: Send + Sync {
    /// Token address
    fn id(&self) -> Address;

    /// Create `amount` new units for `to`
    fn mint(&self, caller: &Address, to: &Address, amount: TokenAmount) -> Result<bool>;

    /// Destroy `amount` units from the caller's own balance
    fn burn(&self, caller: &Address, amount: TokenAmount) -> Result<()>;

    /// Move `amount` from `from` to `to` using the caller's allowance
    fn transfer_from(
        &self,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: TokenAmount,
    ) -> Result<bool>;

    /// Balance of an account
    fn balance_of(&self, owner: &Address) -> TokenAmount;

    /// Mark a point that [`TokenAuthority::revert`] can return to
    fn checkpoint(&self) {}

    /// Discard the last checkpoint, keeping all changes
    fn commit(&self) {}

    /// Undo every change since the last checkpoint
    fn revert(&self) {}
}

// ═══════════════════════════════════════════════════════════════════════════════
// STABLE TOKEN
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default)]
struct TokenState {
    /// Total supply
    total_supply: TokenAmount,
    /// Balances by address
    balances: HashMap<Address, TokenAmount>,
    /// Allowances by (owner, spender)
    allowances: HashMap<(Address, Address), TokenAmount>,
}

/// In-memory stable token owned by a single authorized caller
#[derive(Debug)]
pub struct StableToken {
    /// Token address
    id: Address,
    /// Token symbol
    symbol: String,
    /// The only address allowed to mint and burn
    authorized: Address,
    /// Live state
    state: RwLock<TokenState>,
    /// State saved at the last checkpoint
    saved: RwLock<Option<TokenState>>,
}

impl StableToken {
    /// Create a new token controlled by `authorized`
    pub fn new(id: Address, symbol: impl Into<String>, authorized: Address) -> Self {
        Self {
            id,
            symbol: symbol.into(),
            authorized,
            state: RwLock::new(TokenState::default()),
            saved: RwLock::new(None),
        }
    }

    /// Token symbol
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// The authorized caller
    pub fn authorized_caller(&self) -> Address {
        self.authorized
    }

    /// Total supply
    pub fn total_supply(&self) -> TokenAmount {
        self.state.read().map(|s| s.total_supply).unwrap_or_default()
    }

    /// Allowance granted by `owner` to `spender`
    pub fn allowance(&self, owner: &Address, spender: &Address) -> TokenAmount {
        self.state
            .read()
            .ok()
            .and_then(|s| s.allowances.get(&(*owner, *spender)).copied())
            .unwrap_or_default()
    }

    /// Let `spender` move up to `amount` of `owner`'s tokens
    pub fn approve(&self, owner: &Address, spender: &Address, amount: TokenAmount) -> Result<()> {
        let mut state = self.state.write().map_err(|_| Error::Lock)?;
        state.allowances.insert((*owner, *spender), amount);
        Ok(())
    }

    /// Move tokens from the owner's own balance
    pub fn transfer(&self, from: &Address, to: &Address, amount: TokenAmount) -> Result<bool> {
        let mut state = self.state.write().map_err(|_| Error::Lock)?;
        Ok(Self::move_balance(&mut state, from, to, amount))
    }

    fn ensure_authorized(&self, caller: &Address) -> Result<()> {
        if *caller != self.authorized {
            return Err(Error::Unauthorized(format!(
                "{} is not the {} owner",
                caller.short(),
                self.symbol
            )));
        }
        Ok(())
    }

    fn move_balance(state: &mut TokenState, from: &Address, to: &Address, amount: TokenAmount) -> bool {
        let from_balance = state.balances.get(from).copied().unwrap_or_default();
        let Some(new_from) = from_balance.checked_sub(amount) else {
            return false;
        };
        state.balances.insert(*from, new_from);

        let to_balance = state.balances.entry(*to).or_default();
        *to_balance = to_balance.saturating_add(amount);
        true
    }
}

impl TokenAuthority for StableToken {
    fn id(&self) -> Address {
        self.id
    }

    fn mint(&self, caller: &Address, to: &Address, amount: TokenAmount) -> Result<bool> {
        self.ensure_authorized(caller)?;
        if to.is_zero() || amount.is_zero() {
            return Ok(false);
        }

        let mut state = self.state.write().map_err(|_| Error::Lock)?;
        let Some(supply) = state.total_supply.checked_add(amount) else {
            return Ok(false);
        };
        state.total_supply = supply;
        let balance = state.balances.entry(*to).or_default();
        *balance = balance.saturating_add(amount);

        Ok(true)
    }

    fn burn(&self, caller: &Address, amount: TokenAmount) -> Result<()> {
        self.ensure_authorized(caller)?;
        if amount.is_zero() {
            return Err(Error::InvalidAmount);
        }

        let mut state = self.state.write().map_err(|_| Error::Lock)?;
        let balance = state.balances.get(caller).copied().unwrap_or_default();
        let remaining = balance.checked_sub(amount).ok_or(Error::BurnAmountExceedsBalance {
            amount: amount.raw(),
            balance: balance.raw(),
        })?;

        state.balances.insert(*caller, remaining);
        state.total_supply = state.total_supply.checked_sub(amount).ok_or_else(|| Error::Underflow {
            operation: "burn total supply".into(),
        })?;

        Ok(())
    }

    fn transfer_from(
        &self,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: TokenAmount,
    ) -> Result<bool> {
        let mut state = self.state.write().map_err(|_| Error::Lock)?;

        if caller != from {
            let allowance = state.allowances.get(&(*from, *caller)).copied().unwrap_or_default();
            let Some(remaining) = allowance.checked_sub(amount) else {
                return Ok(false);
            };
            if !Self::move_balance(&mut state, from, to, amount) {
                return Ok(false);
            }
            state.allowances.insert((*from, *caller), remaining);
            return Ok(true);
        }

        Ok(Self::move_balance(&mut state, from, to, amount))
    }

    fn balance_of(&self, owner: &Address) -> TokenAmount {
        self.state
            .read()
            .ok()
            .and_then(|s| s.balances.get(owner).copied())
            .unwrap_or_default()
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

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> Address {
        Address::from_label("engine")
    }

    fn alice() -> Address {
        Address::from_label("alice")
    }

    fn test_token() -> StableToken {
        StableToken::new(Address::from_label("dsc"), "DSC", engine())
    }

    #[test]
    fn test_token_amount() {
        let amount = TokenAmount::from_units(100);
        assert_eq!(amount.raw(), 100 * 10u128.pow(18));
        assert_eq!(amount.to_string(), "100");
        assert_eq!(TokenAmount::from_raw(5 * 10u128.pow(17)).to_string(), "0.5");
    }

    #[test]
    fn test_mint_requires_authorized_caller() {
        let token = test_token();

        let result = token.mint(&alice(), &alice(), TokenAmount::from_units(1));
        assert!(matches!(result, Err(Error::Unauthorized(_))));

        assert!(token.mint(&engine(), &alice(), TokenAmount::from_units(1)).unwrap());
        assert_eq!(token.balance_of(&alice()), TokenAmount::from_units(1));
        assert_eq!(token.total_supply(), TokenAmount::from_units(1));
    }

    #[test]
    fn test_mint_refuses_zero() {
        let token = test_token();
        assert!(!token.mint(&engine(), &Address::ZERO, TokenAmount::from_units(1)).unwrap());
        assert!(!token.mint(&engine(), &alice(), TokenAmount::ZERO).unwrap());
    }

    #[test]
    fn test_burn_exceeds_balance() {
        let token = test_token();
        token.mint(&engine(), &engine(), TokenAmount::from_units(1)).unwrap();

        let result = token.burn(&engine(), TokenAmount::from_units(2));
        assert!(matches!(result, Err(Error::BurnAmountExceedsBalance { .. })));

        token.burn(&engine(), TokenAmount::from_units(1)).unwrap();
        assert_eq!(token.total_supply(), TokenAmount::ZERO);
    }

    #[test]
    fn test_transfer_from_uses_allowance() {
        let token = test_token();
        token.mint(&engine(), &alice(), TokenAmount::from_units(10)).unwrap();

        // No allowance yet
        assert!(!token
            .transfer_from(&engine(), &alice(), &engine(), TokenAmount::from_units(5))
            .unwrap());

        token.approve(&alice(), &engine(), TokenAmount::from_units(5)).unwrap();
        assert!(token
            .transfer_from(&engine(), &alice(), &engine(), TokenAmount::from_units(5))
            .unwrap());

        assert_eq!(token.balance_of(&engine()), TokenAmount::from_units(5));
        assert_eq!(token.allowance(&alice(), &engine()), TokenAmount::ZERO);
    }

    #[test]
    fn test_checkpoint_revert() {
        let token = test_token();
        token.mint(&engine(), &alice(), TokenAmount::from_units(3)).unwrap();

        token.checkpoint();
        token.mint(&engine(), &alice(), TokenAmount::from_units(7)).unwrap();
        token.revert();
        assert_eq!(token.balance_of(&alice()), TokenAmount::from_units(3));

        token.checkpoint();
        token.mint(&engine(), &alice(), TokenAmount::from_units(7)).unwrap();
        token.commit();
        token.revert();
        assert_eq!(token.balance_of(&alice()), TokenAmount::from_units(10));
    }
}
