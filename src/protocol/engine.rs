//! Stablecoin engine - collateral custody, debt issuance and the solvency gate.
//!
//! Every mutating entry point runs as one transaction under the reentrancy
//! guard. A failure anywhere, including a panicking collaborator, restores the
//! ledger, reverts the collaborators and drops the notifications staged so far.
//! A panic is resumed after the rollback.

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard};

use tracing::{info, warn};

use crate::core::asset::CollateralAsset;
use crate::core::config::EngineParams;
use crate::core::health::{calculate_health_factor, AccountStatus, HealthCheck, HealthFactor};
use crate::core::ledger::{AccountPosition, CollateralAmount, CollateralLedger, CollateralRegistry};
use crate::core::token::{TokenAmount, TokenAuthority};
use crate::core::valuation::{UsdValue, Valuation};
use crate::error::{Error, Result};
use crate::liquidation::engine::{LiquidationOutcome, LiquidationStats};
use crate::oracle::adapter::PriceOracleAdapter;
use crate::protocol::events::*;
use crate::protocol::guard::ReentrancyGuard;
use crate::utils::crypto::{Address, AssetId, OracleId};
use crate::utils::validation::{validate_address, validate_non_zero};

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Collateral / health factor / liquidation engine
pub struct StablecoinEngine {
    /// Custody address holding deposited collateral
    address: Address,
    /// Solvency parameters
    params: EngineParams,
    /// Supported collateral (immutable)
    registry: CollateralRegistry,
    /// Collateral asset contracts by id
    assets: HashMap<AssetId, Arc<dyn CollateralAsset>>,
    /// Stable token authority
    token: Arc<dyn TokenAuthority>,
    /// Price source
    oracle: Arc<dyn PriceOracleAdapter>,
    /// Per-account collateral and debt
    ledger: RwLock<CollateralLedger>,
    /// Published notifications
    events: RwLock<EventLog>,
    /// Running liquidation totals
    stats: RwLock<LiquidationStats>,
    /// Serializes mutating operations
    guard: ReentrancyGuard,
}

impl StablecoinEngine {
    /// Create an engine
    ///
    /// `collateral` and `oracle_bindings` are parallel lists; a length mismatch
    /// fails with [`Error::ConfigurationMismatch`] before any state exists.
    pub fn new(
        address: Address,
        collateral: Vec<Arc<dyn CollateralAsset>>,
        oracle_bindings: &[OracleId],
        token: Arc<dyn TokenAuthority>,
        oracle: Arc<dyn PriceOracleAdapter>,
        params: EngineParams,
    ) -> Result<Self> {
        validate_address(&address)?;
        params.validate()?;

        let types: Vec<AssetId> = collateral.iter().map(|asset| asset.id()).collect();
        let registry = CollateralRegistry::register(&types, oracle_bindings)?;
        let assets = collateral.into_iter().map(|asset| (asset.id(), asset)).collect();

        info!(
            "Engine {} created with {} collateral types",
            address.short(),
            registry.len()
        );

        Ok(Self {
            address,
            params,
            ledger: RwLock::new(CollateralLedger::new(registry.clone())),
            registry,
            assets,
            token,
            oracle,
            events: RwLock::new(EventLog::new()),
            stats: RwLock::new(LiquidationStats::default()),
            guard: ReentrancyGuard::new(),
        })
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // TRANSACTIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Run `body` as one all-or-nothing operation
    pub(crate) fn atomically<T>(
        &self,
        operation: &'static str,
        body: impl FnOnce(&mut Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        let _token = self.guard.enter(operation)?;

        let checkpoint = self.read_ledger()?.clone();
        self.checkpoint_collaborators();

        let mut tx = Transaction {
            engine: self,
            staged: Vec::new(),
            liquidations: Vec::new(),
        };

        let result = match panic::catch_unwind(AssertUnwindSafe(|| body(&mut tx))) {
            Ok(result) => result,
            Err(payload) => {
                self.rollback(checkpoint);
                warn!("{} reverted: collaborator panicked", operation);
                panic::resume_unwind(payload);
            }
        };

        match result {
            Ok(value) => {
                self.commit_collaborators();
                let Transaction { staged, liquidations, .. } = tx;

                self.events
                    .write()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend(staged);
                let mut stats = self.stats.write().unwrap_or_else(PoisonError::into_inner);
                for outcome in &liquidations {
                    stats.record(outcome);
                }

                Ok(value)
            }
            Err(e) => {
                self.rollback(checkpoint);
                warn!("{} reverted: {}", operation, e);
                Err(e)
            }
        }
    }

    fn rollback(&self, checkpoint: CollateralLedger) {
        *self.ledger.write().unwrap_or_else(PoisonError::into_inner) = checkpoint;
        self.revert_collaborators();
    }

    fn checkpoint_collaborators(&self) {
        self.token.checkpoint();
        for asset in self.assets.values() {
            asset.checkpoint();
        }
    }

    fn commit_collaborators(&self) {
        self.token.commit();
        for asset in self.assets.values() {
            asset.commit();
        }
    }

    fn revert_collaborators(&self) {
        self.token.revert();
        for asset in self.assets.values() {
            asset.revert();
        }
    }

    fn read_ledger(&self) -> Result<RwLockReadGuard<'_, CollateralLedger>> {
        self.ledger.read().map_err(|_| Error::Lock)
    }

    fn position(&self, account: &Address) -> Result<AccountPosition> {
        Ok(self.read_ledger()?.position(account))
    }

    pub(crate) fn valuation(&self) -> Valuation<'_> {
        Valuation::new(&self.registry, self.oracle.as_ref())
    }

    pub(crate) fn health_check(&self) -> HealthCheck<'_> {
        HealthCheck::new(self.valuation(), &self.params)
    }

    fn asset(&self, asset: &AssetId) -> Result<&Arc<dyn CollateralAsset>> {
        self.assets
            .get(asset)
            .ok_or(Error::UnsupportedCollateral(*asset))
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // GATEWAY OPERATIONS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Deposit collateral for `account`, pulled with the engine's allowance
    pub fn deposit_collateral(
        &self,
        account: Address,
        asset: AssetId,
        amount: CollateralAmount,
    ) -> Result<()> {
        self.atomically("deposit_collateral", |tx| {
            tx.deposit(account, asset, amount)?;
            tx.check_health(&account)?;
            Ok(())
        })?;

        info!("Deposited {} of {} for {}", amount, asset.short(), account.short());
        Ok(())
    }

    /// Mint stable tokens against `account`'s collateral
    pub fn mint_debt(&self, account: Address, amount: TokenAmount) -> Result<()> {
        self.atomically("mint_debt", |tx| tx.mint(account, amount))?;

        info!("Minted {} for {}", amount, account.short());
        Ok(())
    }

    /// Repay `account`'s own debt with its stable tokens
    pub fn burn_debt(&self, account: Address, amount: TokenAmount) -> Result<()> {
        self.atomically("burn_debt", |tx| {
            tx.burn_on_behalf(account, account, amount)?;
            tx.check_health(&account)?;
            Ok(())
        })?;

        info!("Burned {} for {}", amount, account.short());
        Ok(())
    }

    /// Withdraw `account`'s collateral back to it
    pub fn redeem_collateral(
        &self,
        account: Address,
        asset: AssetId,
        amount: CollateralAmount,
    ) -> Result<()> {
        self.atomically("redeem_collateral", |tx| {
            tx.redeem_from(asset, amount, account, account)?;
            tx.check_health(&account)?;
            Ok(())
        })?;

        info!("Redeemed {} of {} for {}", amount, asset.short(), account.short());
        Ok(())
    }

    /// Deposit collateral and mint in one step
    pub fn deposit_and_mint(
        &self,
        account: Address,
        asset: AssetId,
        collateral: CollateralAmount,
        debt: TokenAmount,
    ) -> Result<()> {
        self.atomically("deposit_and_mint", |tx| {
            tx.deposit(account, asset, collateral)?;
            tx.mint(account, debt)
        })?;

        info!(
            "Deposited {} of {} and minted {} for {}",
            collateral,
            asset.short(),
            debt,
            account.short()
        );
        Ok(())
    }

    /// Burn debt and withdraw collateral in one step
    pub fn redeem_and_burn(
        &self,
        account: Address,
        asset: AssetId,
        collateral: CollateralAmount,
        debt: TokenAmount,
    ) -> Result<()> {
        self.atomically("redeem_and_burn", |tx| {
            // Burn first so the gate sees the reduced debt
            tx.burn_on_behalf(account, account, debt)?;
            tx.redeem_from(asset, collateral, account, account)?;
            tx.check_health(&account)?;
            Ok(())
        })?;

        info!(
            "Burned {} and redeemed {} of {} for {}",
            debt,
            collateral,
            asset.short(),
            account.short()
        );
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // VIEWS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Engine custody address
    pub fn address(&self) -> Address {
        self.address
    }

    /// Solvency parameters
    pub fn params(&self) -> &EngineParams {
        &self.params
    }

    /// Stable token authority
    pub fn token(&self) -> &Arc<dyn TokenAuthority> {
        &self.token
    }

    /// Registered collateral, in registry order
    pub fn collateral_types(&self) -> &[AssetId] {
        self.registry.collateral_types()
    }

    /// Oracle bound to a collateral type
    pub fn price_feed_of(&self, asset: &AssetId) -> Option<OracleId> {
        self.registry.oracle_of(asset)
    }

    /// Debt and total collateral value of an account
    pub fn account_information(&self, account: &Address) -> Result<(TokenAmount, UsdValue)> {
        let position = self.position(account)?;
        let collateral_value = self.valuation().total_collateral_value(&position)?;
        Ok((position.debt_minted, collateral_value))
    }

    /// Recorded collateral of an account
    pub fn collateral_balance_of(&self, account: &Address, asset: &AssetId) -> Result<CollateralAmount> {
        Ok(self.read_ledger()?.collateral_of(account, asset))
    }

    /// Recorded debt of an account
    pub fn debt_of(&self, account: &Address) -> Result<TokenAmount> {
        Ok(self.read_ledger()?.debt_of(account))
    }

    /// Total USD value of an account's collateral
    pub fn account_collateral_value(&self, account: &Address) -> Result<UsdValue> {
        let position = self.position(account)?;
        self.valuation().total_collateral_value(&position)
    }

    /// USD value of an amount of collateral
    pub fn usd_value(&self, asset: &AssetId, amount: CollateralAmount) -> Result<UsdValue> {
        self.valuation().value_of(asset, amount)
    }

    /// Collateral amount worth a USD value
    pub fn token_amount_from_usd(&self, asset: &AssetId, value: UsdValue) -> Result<CollateralAmount> {
        self.valuation().amount_for(asset, value)
    }

    /// Current health factor of an account
    pub fn health_factor(&self, account: &Address) -> Result<HealthFactor> {
        let position = self.position(account)?;
        self.health_check().health_factor(&position)
    }

    /// Current classification of an account
    pub fn account_status(&self, account: &Address) -> Result<AccountStatus> {
        let position = self.position(account)?;
        self.health_check().status(&position)
    }

    /// Health factor a position with these totals would have
    pub fn calculate_health_factor(
        &self,
        debt: TokenAmount,
        collateral_value: UsdValue,
    ) -> Result<HealthFactor> {
        calculate_health_factor(collateral_value, debt, self.params.liquidation_threshold_pct)
    }

    /// Total outstanding debt
    pub fn total_debt(&self) -> Result<TokenAmount> {
        Ok(self.read_ledger()?.total_debt())
    }

    /// Accounts that have interacted with the engine
    pub fn accounts(&self) -> Result<Vec<Address>> {
        Ok(self.read_ledger()?.accounts())
    }

    /// Copy of the ledger
    pub fn ledger_snapshot(&self) -> Result<CollateralLedger> {
        Ok(self.read_ledger()?.clone())
    }

    /// Deterministic hash of the ledger
    pub fn state_hash(&self) -> Result<[u8; 32]> {
        Ok(self.read_ledger()?.state_hash())
    }

    /// Published notifications still retained
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.read().map(|log| log.events()).unwrap_or_default()
    }

    /// Take the retained notifications
    pub fn drain_events(&self) -> Vec<EngineEvent> {
        self.events.write().map(|mut log| log.drain()).unwrap_or_default()
    }

    /// Running liquidation totals
    pub fn liquidation_stats(&self) -> LiquidationStats {
        self.stats.read().map(|s| s.clone()).unwrap_or_default()
    }
}

impl fmt::Debug for StablecoinEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StablecoinEngine")
            .field("address", &self.address)
            .field("params", &self.params)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSACTION
// ═══════════════════════════════════════════════════════════════════════════════

/// An in-flight operation
///
/// Steps here run without the guard checks of the public entry points, so an
/// operation can compose several of them.
pub(crate) struct Transaction<'e> {
    engine: &'e StablecoinEngine,
    staged: Vec<EngineEvent>,
    liquidations: Vec<LiquidationOutcome>,
}

impl<'e> Transaction<'e> {
    pub(crate) fn engine(&self) -> &'e StablecoinEngine {
        self.engine
    }

    fn with_ledger<R>(&self, f: impl FnOnce(&mut CollateralLedger) -> Result<R>) -> Result<R> {
        let mut ledger = self.engine.ledger.write().map_err(|_| Error::Lock)?;
        f(&mut ledger)
    }

    pub(crate) fn emit(&mut self, event: EngineEvent) {
        self.staged.push(event);
    }

    pub(crate) fn record_liquidation(&mut self, outcome: LiquidationOutcome) {
        self.liquidations.push(outcome);
    }

    pub(crate) fn deposit(
        &mut self,
        account: Address,
        asset: AssetId,
        amount: CollateralAmount,
    ) -> Result<()> {
        validate_non_zero(amount.raw())?;
        let contract = self.engine.asset(&asset)?;

        // Record first, then pull the funds
        self.with_ledger(|ledger| ledger.increase_collateral(account, asset, amount))?;
        self.emit(EngineEvent::CollateralDeposited(CollateralDepositedEvent {
            account,
            asset,
            amount,
        }));

        let engine = self.engine.address;
        if !contract.transfer_from(&engine, &account, &engine, amount)? {
            return Err(Error::TransferFailed {
                asset,
                from: account,
                to: engine,
                amount: amount.raw(),
            });
        }

        Ok(())
    }

    pub(crate) fn mint(&mut self, account: Address, amount: TokenAmount) -> Result<()> {
        validate_non_zero(amount.raw())?;

        self.with_ledger(|ledger| ledger.increase_debt(account, amount))?;
        self.check_health(&account)?;

        if !self.engine.token.mint(&self.engine.address, &account, amount)? {
            return Err(Error::MintFailed {
                to: account,
                amount: amount.raw(),
            });
        }

        Ok(())
    }

    pub(crate) fn burn_on_behalf(
        &mut self,
        on_behalf_of: Address,
        payer: Address,
        amount: TokenAmount,
    ) -> Result<()> {
        validate_non_zero(amount.raw())?;

        self.with_ledger(|ledger| ledger.decrease_debt(on_behalf_of, amount))?;

        // Pull to the engine, then destroy from its own balance
        let engine = self.engine.address;
        let token = &self.engine.token;
        if !token.transfer_from(&engine, &payer, &engine, amount)? {
            return Err(Error::TransferFailed {
                asset: token.id(),
                from: payer,
                to: engine,
                amount: amount.raw(),
            });
        }
        token.burn(&engine, amount)
    }

    pub(crate) fn redeem_from(
        &mut self,
        asset: AssetId,
        amount: CollateralAmount,
        from: Address,
        to: Address,
    ) -> Result<()> {
        validate_non_zero(amount.raw())?;
        let contract = self.engine.asset(&asset)?;

        self.with_ledger(|ledger| ledger.decrease_collateral(from, asset, amount))?;
        self.emit(EngineEvent::CollateralRedeemed(CollateralRedeemedEvent {
            from,
            to,
            asset,
            amount,
        }));

        let engine = self.engine.address;
        if !contract.transfer(&engine, &to, amount)? {
            return Err(Error::TransferFailed {
                asset,
                from: engine,
                to,
                amount: amount.raw(),
            });
        }

        Ok(())
    }

    pub(crate) fn health_factor(&self, account: &Address) -> Result<HealthFactor> {
        let position = self.engine.position(account)?;
        self.engine.health_check().health_factor(&position)
    }

    pub(crate) fn check_health(&self, account: &Address) -> Result<HealthFactor> {
        let position = self.engine.position(account)?;
        self.engine.health_check().assert_healthy(&position)
    }
}
