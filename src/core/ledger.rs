//! Collateral ledger and collateral registry.
//!
//! The ledger is the authoritative store of per-account collateral balances and
//! debt. The registry fixes, once, which collateral assets are accepted and
//! which oracle prices each of them.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::core::token::TokenAmount;
use crate::error::{Error, Result};
use crate::utils::constants::TOKEN_DECIMALS;
use crate::utils::crypto::{Address, AssetId, OracleId};
use crate::utils::math::{format_fixed, safe_add};

// ═══════════════════════════════════════════════════════════════════════════════
// COLLATERAL AMOUNT
// ═══════════════════════════════════════════════════════════════════════════════

/// Strongly-typed collateral amount in the asset's smallest unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct CollateralAmount(u128);

impl CollateralAmount {
    /// Zero amount
    pub const ZERO: Self = Self(0);

    /// Create from smallest units
    pub const fn from_raw(raw: u128) -> Self {
        Self(raw)
    }

    /// Create from whole units (18 decimals)
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
}

impl fmt::Display for CollateralAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", format_fixed(self.0, TOKEN_DECIMALS))
    }
}

impl From<u128> for CollateralAmount {
    fn from(raw: u128) -> Self {
        Self(raw)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COLLATERAL REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

/// Supported collateral types and their oracle bindings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralRegistry {
    /// Registered assets, in registration order
    order: Vec<AssetId>,
    /// Oracle bound to each asset
    bindings: HashMap<AssetId, OracleId>,
}

impl CollateralRegistry {
    /// Build a registry from parallel asset and oracle lists
    pub fn register(types: &[AssetId], oracle_bindings: &[OracleId]) -> Result<Self> {
        if types.len() != oracle_bindings.len() {
            return Err(Error::ConfigurationMismatch {
                collateral_types: types.len(),
                oracle_bindings: oracle_bindings.len(),
            });
        }

        let mut registry = Self::default();
        for (asset, oracle) in types.iter().zip(oracle_bindings) {
            if registry.bindings.insert(*asset, *oracle).is_some() {
                return Err(Error::DuplicateCollateral(*asset));
            }
            registry.order.push(*asset);
        }

        Ok(registry)
    }

    /// Registered assets, in registry order
    pub fn collateral_types(&self) -> &[AssetId] {
        &self.order
    }

    /// Oracle bound to an asset
    pub fn oracle_of(&self, asset: &AssetId) -> Option<OracleId> {
        self.bindings.get(asset).copied()
    }

    /// Check whether an asset is registered
    pub fn is_supported(&self, asset: &AssetId) -> bool {
        self.bindings.contains_key(asset)
    }

    /// Require that an asset is registered
    pub fn ensure_supported(&self, asset: &AssetId) -> Result<OracleId> {
        self.oracle_of(asset)
            .ok_or(Error::UnsupportedCollateral(*asset))
    }

    /// Number of registered assets
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ACCOUNT POSITION
// ═══════════════════════════════════════════════════════════════════════════════

/// Collateral and debt recorded for one account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountPosition {
    /// Collateral per asset
    pub collateral_balances: BTreeMap<AssetId, CollateralAmount>,
    /// Stable tokens minted against the collateral
    pub debt_minted: TokenAmount,
}

impl AccountPosition {
    /// Collateral held for an asset
    pub fn collateral_of(&self, asset: &AssetId) -> CollateralAmount {
        self.collateral_balances
            .get(asset)
            .copied()
            .unwrap_or(CollateralAmount::ZERO)
    }

    /// Check if the account has outstanding debt
    pub fn has_debt(&self) -> bool {
        !self.debt_minted.is_zero()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COLLATERAL LEDGER
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-account collateral and debt store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralLedger {
    /// Supported collateral
    registry: CollateralRegistry,
    /// Positions by account
    positions: HashMap<Address, AccountPosition>,
}

impl CollateralLedger {
    /// Create a ledger with its registry
    pub fn new(registry: CollateralRegistry) -> Self {
        Self {
            registry,
            positions: HashMap::new(),
        }
    }

    /// Registered collateral
    pub fn registry(&self) -> &CollateralRegistry {
        &self.registry
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // COLLATERAL
    // ═══════════════════════════════════════════════════════════════════════════

    /// Record newly deposited collateral
    pub fn increase_collateral(
        &mut self,
        account: Address,
        asset: AssetId,
        amount: CollateralAmount,
    ) -> Result<CollateralAmount> {
        if amount.is_zero() {
            return Err(Error::InvalidAmount);
        }
        self.registry.ensure_supported(&asset)?;

        let position = self.positions.entry(account).or_default();
        let balance = position.collateral_balances.entry(asset).or_default();
        *balance = balance.checked_add(amount).ok_or_else(|| Error::Overflow {
            operation: "increase collateral".into(),
        })?;

        Ok(*balance)
    }

    /// Remove collateral from an account's recorded balance
    pub fn decrease_collateral(
        &mut self,
        account: Address,
        asset: AssetId,
        amount: CollateralAmount,
    ) -> Result<CollateralAmount> {
        if amount.is_zero() {
            return Err(Error::InvalidAmount);
        }

        let available = self.collateral_of(&account, &asset);
        let remaining = available.checked_sub(amount).ok_or(Error::InsufficientCollateral {
            required: amount.raw(),
            available: available.raw(),
        })?;

        // Zero balances stay recorded; positions persist once created
        let position = self.positions.entry(account).or_default();
        position.collateral_balances.insert(asset, remaining);

        Ok(remaining)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // DEBT
    // ═══════════════════════════════════════════════════════════════════════════

    /// Record newly minted debt
    pub fn increase_debt(&mut self, account: Address, amount: TokenAmount) -> Result<TokenAmount> {
        let position = self.positions.entry(account).or_default();
        let debt = safe_add(position.debt_minted.raw(), amount.raw(), "increase debt")?;
        position.debt_minted = TokenAmount::from_raw(debt);
        Ok(position.debt_minted)
    }

    /// Record repaid debt; repaying more than is owed is a hard failure
    pub fn decrease_debt(&mut self, account: Address, amount: TokenAmount) -> Result<TokenAmount> {
        let current = self.debt_of(&account);
        let remaining = current.checked_sub(amount).ok_or_else(|| Error::Underflow {
            operation: format!("decrease debt of {} by {}", account.short(), amount.raw()),
        })?;

        let position = self.positions.entry(account).or_default();
        position.debt_minted = remaining;
        Ok(remaining)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // QUERIES
    // ═══════════════════════════════════════════════════════════════════════════

    /// Collateral recorded for an account and asset
    pub fn collateral_of(&self, account: &Address, asset: &AssetId) -> CollateralAmount {
        self.positions
            .get(account)
            .map(|p| p.collateral_of(asset))
            .unwrap_or(CollateralAmount::ZERO)
    }

    /// Debt recorded for an account
    pub fn debt_of(&self, account: &Address) -> TokenAmount {
        self.positions
            .get(account)
            .map(|p| p.debt_minted)
            .unwrap_or(TokenAmount::ZERO)
    }

    /// Full position of an account (zero-valued if never seen)
    pub fn position(&self, account: &Address) -> AccountPosition {
        self.positions.get(account).cloned().unwrap_or_default()
    }

    /// Number of accounts that have ever interacted
    pub fn account_count(&self) -> usize {
        self.positions.len()
    }

    /// Accounts that have ever interacted, in address order
    pub fn accounts(&self) -> Vec<Address> {
        let mut accounts: Vec<_> = self.positions.keys().copied().collect();
        accounts.sort();
        accounts
    }

    /// Total collateral recorded for an asset across all accounts
    pub fn total_collateral(&self, asset: &AssetId) -> CollateralAmount {
        let total = self
            .positions
            .values()
            .map(|p| p.collateral_of(asset).raw())
            .sum();
        CollateralAmount::from_raw(total)
    }

    /// Total debt across all accounts
    pub fn total_debt(&self) -> TokenAmount {
        TokenAmount::from_raw(self.positions.values().map(|p| p.debt_minted.raw()).sum())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // PERSISTENCE
    // ═══════════════════════════════════════════════════════════════════════════

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// Deserialize from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes).map_err(|e| Error::Deserialization(e.to_string()))
    }

    /// Compute a deterministic hash of all positions
    pub fn state_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();

        for asset in self.registry.collateral_types() {
            hasher.update(asset.as_bytes());
        }

        // Sort for deterministic hashing
        for account in self.accounts() {
            let position = &self.positions[&account];
            hasher.update(account.as_bytes());
            hasher.update(position.debt_minted.raw().to_be_bytes());
            for (asset, amount) in &position.collateral_balances {
                hasher.update(asset.as_bytes());
                hasher.update(amount.raw().to_be_bytes());
            }
        }

        hasher.finalize().into()
    }
}
