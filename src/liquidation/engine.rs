//! Liquidation of undercollateralized accounts.
//!
//! A liquidator repays part or all of an at-risk account's debt with their own
//! stable tokens and receives the equivalent collateral plus a bonus. The
//! liquidation must strictly improve the account and leave it healthy, or the
//! whole operation is rolled back.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::core::health::HealthFactor;
use crate::core::ledger::CollateralAmount;
use crate::core::token::TokenAmount;
use crate::core::valuation::UsdValue;
use crate::error::{Error, Result};
use crate::protocol::engine::StablecoinEngine;
use crate::protocol::events::{EngineEvent, LiquidatedEvent};
use crate::utils::crypto::{Address, AssetId};
use crate::utils::math::apply_percentage;
use crate::utils::validation::validate_non_zero;

// ═══════════════════════════════════════════════════════════════════════════════
// LIQUIDATION PLAN
// ═══════════════════════════════════════════════════════════════════════════════

/// Collateral a liquidator would receive for covering some debt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationPlan {
    /// Collateral asset to seize
    pub asset: AssetId,
    /// Debt the liquidator repays
    pub debt_to_cover: TokenAmount,
    /// Collateral worth exactly the debt
    pub base_collateral: CollateralAmount,
    /// Extra collateral awarded on top
    pub bonus_collateral: CollateralAmount,
}

impl LiquidationPlan {
    /// Collateral seized in total
    pub fn total_collateral(&self) -> Result<CollateralAmount> {
        self.base_collateral
            .checked_add(self.bonus_collateral)
            .ok_or_else(|| Error::Overflow {
                operation: "liquidation collateral".into(),
            })
    }
}

/// Result of a successful liquidation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationOutcome {
    /// Liquidated account
    pub account: Address,
    /// Liquidator
    pub liquidator: Address,
    /// Collateral asset seized
    pub asset: AssetId,
    /// Debt repaid
    pub debt_covered: TokenAmount,
    /// Collateral worth the debt
    pub base_collateral: CollateralAmount,
    /// Bonus collateral
    pub bonus_collateral: CollateralAmount,
    /// Health factor before
    pub starting_health_factor: HealthFactor,
    /// Health factor after
    pub ending_health_factor: HealthFactor,
}

impl LiquidationOutcome {
    /// Collateral delivered to the liquidator
    pub fn collateral_seized(&self) -> CollateralAmount {
        CollateralAmount::from_raw(self.base_collateral.raw().saturating_add(self.bonus_collateral.raw()))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LIQUIDATION STATS
// ═══════════════════════════════════════════════════════════════════════════════

/// Running totals over successful liquidations
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidationStats {
    /// Liquidations performed
    pub total_liquidations: u64,
    /// Debt repaid by liquidators
    pub total_debt_covered: TokenAmount,
    /// Collateral seized per asset
    pub collateral_seized: BTreeMap<AssetId, CollateralAmount>,
}

impl LiquidationStats {
    /// Fold in one outcome
    pub fn record(&mut self, outcome: &LiquidationOutcome) {
        self.total_liquidations += 1;
        self.total_debt_covered = self.total_debt_covered.saturating_add(outcome.debt_covered);

        let seized = self.collateral_seized.entry(outcome.asset).or_default();
        *seized = CollateralAmount::from_raw(seized.raw().saturating_add(outcome.collateral_seized().raw()));
    }

    /// Collateral seized for an asset
    pub fn seized_of(&self, asset: &AssetId) -> CollateralAmount {
        self.collateral_seized.get(asset).copied().unwrap_or_default()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// LIQUIDATION PROTOCOL
// ═══════════════════════════════════════════════════════════════════════════════

impl StablecoinEngine {
    /// Quote the collateral a liquidator would receive for `debt_to_cover`
    pub fn plan_liquidation(&self, asset: &AssetId, debt_to_cover: TokenAmount) -> Result<LiquidationPlan> {
        validate_non_zero(debt_to_cover.raw())?;

        let base_collateral = self
            .valuation()
            .amount_for(asset, UsdValue::from(debt_to_cover))?;
        let bonus = apply_percentage(base_collateral.raw(), self.params().liquidation_bonus_pct)?;

        Ok(LiquidationPlan {
            asset: *asset,
            debt_to_cover,
            base_collateral,
            bonus_collateral: CollateralAmount::from_raw(bonus),
        })
    }

    /// Repay `debt_to_cover` of `account`'s debt and seize its collateral
    pub fn liquidate(
        &self,
        liquidator: Address,
        account: Address,
        asset: AssetId,
        debt_to_cover: TokenAmount,
    ) -> Result<LiquidationOutcome> {
        let outcome = self.atomically("liquidate", |tx| {
            validate_non_zero(debt_to_cover.raw())?;

            // Only at-risk accounts
            let starting = tx.health_factor(&account)?;
            if starting >= self.params().min_health_factor {
                return Err(Error::HealthFactorOk(starting));
            }

            let plan = tx.engine().plan_liquidation(&asset, debt_to_cover)?;

            // Seize collateral, then repay with the liquidator's tokens
            tx.redeem_from(asset, plan.total_collateral()?, account, liquidator)?;
            tx.burn_on_behalf(account, liquidator, debt_to_cover)?;

            let ending = tx.health_factor(&account)?;
            if ending <= starting {
                return Err(Error::HealthFactorNotImproved { starting, ending });
            }
            tx.check_health(&account)?;

            let outcome = LiquidationOutcome {
                account,
                liquidator,
                asset,
                debt_covered: debt_to_cover,
                base_collateral: plan.base_collateral,
                bonus_collateral: plan.bonus_collateral,
                starting_health_factor: starting,
                ending_health_factor: ending,
            };

            tx.emit(EngineEvent::Liquidated(LiquidatedEvent {
                account,
                liquidator,
                asset,
                debt_covered: debt_to_cover,
                collateral_seized: outcome.collateral_seized(),
                starting_health_factor: starting,
                ending_health_factor: ending,
            }));
            tx.record_liquidation(outcome.clone());

            Ok(outcome)
        })?;

        info!(
            "Liquidated {} by {}: covered {}, seized {} (health {} -> {})",
            account.short(),
            liquidator.short(),
            outcome.debt_covered,
            outcome.collateral_seized(),
            outcome.starting_health_factor,
            outcome.ending_health_factor
        );
        Ok(outcome)
    }

    /// Accounts currently eligible for liquidation, worst first
    pub fn find_liquidatable(&self) -> Result<Vec<(Address, HealthFactor)>> {
        let min = self.params().min_health_factor;
        let mut at_risk = Vec::new();

        for account in self.accounts()? {
            let health_factor = self.health_factor(&account)?;
            if health_factor < min {
                at_risk.push((account, health_factor));
            }
        }

        at_risk.sort_by_key(|(_, hf)| *hf);
        Ok(at_risk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::asset::{CollateralAsset, FungibleAsset};
    use crate::core::config::EngineParams;
    use crate::core::token::{StableToken, TokenAuthority};
    use crate::oracle::price_feed::InMemoryPriceFeed;
    use std::sync::Arc;

    struct Fixture {
        engine: StablecoinEngine,
        weth: AssetId,
        dsc: Arc<StableToken>,
        feed: Arc<InMemoryPriceFeed>,
    }

    fn user() -> Address {
        Address::from_label("user")
    }

    fn liquidator() -> Address {
        Address::from_label("liquidator")
    }

    fn eth_usd() -> Address {
        Address::from_label("eth-usd")
    }

    fn usd(dollars: i128) -> i128 {
        dollars * 1_0000_0000
    }

    /// User: 10 WETH and 100 DSC debt. Liquidator: 20 WETH and 100 DSC, approved.
    fn fixture() -> Fixture {
        let address = Address::from_label("engine");
        let weth = Arc::new(FungibleAsset::new(Address::from_label("weth"), "WETH"));
        let dsc = Arc::new(StableToken::new(Address::from_label("dsc"), "DSC", address));
        let feed = Arc::new(InMemoryPriceFeed::new());
        feed.set_price(eth_usd(), usd(2000)).unwrap();

        let collateral: Arc<dyn CollateralAsset> = weth.clone();
        let engine = StablecoinEngine::new(
            address,
            vec![collateral],
            &[eth_usd()],
            dsc.clone(),
            feed.clone(),
            EngineParams::default(),
        )
        .unwrap();

        for (who, units) in [(user(), 10), (liquidator(), 20)] {
            weth.mint(&who, CollateralAmount::from_units(units)).unwrap();
            weth.approve(&who, &address, CollateralAmount::from_units(units)).unwrap();
            engine
                .deposit_and_mint(who, weth.id(), CollateralAmount::from_units(units), TokenAmount::from_units(100))
                .unwrap();
        }
        dsc.approve(&liquidator(), &address, TokenAmount::from_units(100)).unwrap();

        Fixture {
            engine,
            weth: weth.id(),
            dsc,
            feed,
        }
    }

    #[test]
    fn test_plan_liquidation() {
        let f = fixture();
        let plan = f.engine.plan_liquidation(&f.weth, TokenAmount::from_units(100)).unwrap();

        assert_eq!(plan.base_collateral, CollateralAmount::from_raw(5 * 10u128.pow(16)));
        assert_eq!(plan.bonus_collateral, CollateralAmount::from_raw(5 * 10u128.pow(15)));
        assert_eq!(plan.total_collateral().unwrap(), CollateralAmount::from_raw(55 * 10u128.pow(15)));
    }

    #[test]
    fn test_healthy_account_rejected() {
        let f = fixture();
        let before = f.engine.ledger_snapshot().unwrap();

        let result = f.engine.liquidate(liquidator(), user(), f.weth, TokenAmount::from_units(100));
        assert!(matches!(result, Err(Error::HealthFactorOk(_))));
        assert_eq!(f.engine.ledger_snapshot().unwrap(), before);
    }

    #[test]
    fn test_full_liquidation() {
        let f = fixture();
        f.feed.set_price(eth_usd(), usd(18)).unwrap();

        // 10 WETH at $18 counts as $90 against $100
        assert_eq!(f.engine.health_factor(&user()).unwrap().to_string(), "0.9");
        assert_eq!(f.engine.find_liquidatable().unwrap().len(), 1);

        let outcome = f
            .engine
            .liquidate(liquidator(), user(), f.weth, TokenAmount::from_units(100))
            .unwrap();

        // $100 / $18 = 5.555... WETH plus 10%
        assert_eq!(outcome.base_collateral.raw(), 5_555_555_555_555_555_555);
        assert_eq!(outcome.bonus_collateral.raw(), 555_555_555_555_555_555);
        assert!(outcome.ending_health_factor.is_max());

        assert_eq!(f.engine.debt_of(&user()).unwrap(), TokenAmount::ZERO);
        assert_eq!(
            f.engine.collateral_balance_of(&user(), &f.weth).unwrap().raw(),
            10 * 10u128.pow(18) - 6_111_111_111_111_111_110
        );
        assert_eq!(f.dsc.balance_of(&liquidator()), TokenAmount::ZERO);

        let stats = f.engine.liquidation_stats();
        assert_eq!(stats.total_liquidations, 1);
        assert_eq!(stats.total_debt_covered, TokenAmount::from_units(100));
        assert_eq!(stats.seized_of(&f.weth), outcome.collateral_seized());

        let liquidated = f
            .engine
            .events()
            .into_iter()
            .filter(|e| e.event_type() == "Liquidated")
            .count();
        assert_eq!(liquidated, 1);
    }

    #[test]
    fn test_partial_liquidation_rejected() {
        let f = fixture();
        f.feed.set_price(eth_usd(), usd(18)).unwrap();
        let events_before = f.engine.events().len();

        // Improves 0.9 to ~0.94 but stays below 1.0
        let result = f.engine.liquidate(liquidator(), user(), f.weth, TokenAmount::from_units(10));
        assert!(matches!(result, Err(Error::HealthFactorBroken(_))));

        assert_eq!(f.engine.debt_of(&user()).unwrap(), TokenAmount::from_units(100));
        assert_eq!(f.engine.collateral_balance_of(&user(), &f.weth).unwrap(), CollateralAmount::from_units(10));
        assert_eq!(f.dsc.balance_of(&liquidator()), TokenAmount::from_units(100));
        assert_eq!(f.engine.events().len(), events_before);
        assert_eq!(f.engine.liquidation_stats().total_liquidations, 0);
    }

    #[test]
    fn test_liquidation_must_improve() {
        let f = fixture();
        // Collateral worth less than debt plus bonus: seizing makes it worse
        f.feed.set_price(eth_usd(), usd(10)).unwrap();

        let result = f.engine.liquidate(liquidator(), user(), f.weth, TokenAmount::from_units(50));
        assert!(matches!(result, Err(Error::HealthFactorNotImproved { starting, ending }) if ending < starting));
    }

    #[test]
    fn test_zero_debt_to_cover() {
        let f = fixture();
        let result = f.engine.liquidate(liquidator(), user(), f.weth, TokenAmount::ZERO);
        assert_eq!(result.unwrap_err(), Error::InvalidAmount);
    }
}
