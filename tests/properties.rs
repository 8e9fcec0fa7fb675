//! Property tests for valuation and the solvency gate.

use proptest::prelude::*;

use dsc::core::asset::CollateralAsset;
use dsc::core::health::{calculate_health_factor, AccountStatus, HealthFactor};
use dsc::core::ledger::CollateralAmount;
use dsc::core::token::{TokenAmount, TokenAuthority};
use dsc::core::valuation::{amount_from_usd, usd_value, UsdValue};
use dsc::error::Error;
use dsc::protocol::deployment::InMemoryDeployment;
use dsc::utils::constants::{LIQUIDATION_THRESHOLD_PCT, MIN_HEALTH_FACTOR};
use dsc::utils::crypto::Address;

/// 8-decimal prices from $0.01 to $1,000,000
fn price() -> impl Strategy<Value = u128> {
    1_000_000u128..=100_000_000_000_000u128
}

/// Collateral amounts up to one billion units
fn amount() -> impl Strategy<Value = u128> {
    0u128..=1_000_000_000 * 10u128.pow(18)
}

proptest! {
    #[test]
    fn prop_amount_for_value_round_trips_within_one_unit(price in price(), raw in amount()) {
        let value = usd_value(price, CollateralAmount::from_raw(raw)).unwrap();
        let back = amount_from_usd(price, value).unwrap();

        prop_assert!(back.raw() <= raw);
        // Each conversion rounds down once
        let tolerance = 10u128.pow(8) / price + 1;
        prop_assert!(raw - back.raw() <= tolerance, "{} -> {} -> {}", raw, value, back);
    }

    #[test]
    fn prop_zero_debt_is_healthy(raw in amount()) {
        let hf = calculate_health_factor(UsdValue::from_raw(raw), TokenAmount::ZERO, LIQUIDATION_THRESHOLD_PCT).unwrap();
        prop_assert_eq!(hf, HealthFactor::MAX);
        prop_assert_eq!(
            AccountStatus::classify(hf, HealthFactor::from_raw(MIN_HEALTH_FACTOR)),
            AccountStatus::Healthy
        );
    }

    #[test]
    fn prop_more_collateral_never_lowers_health(
        collateral in amount(),
        extra in amount(),
        debt in 1u128..=1_000_000_000 * 10u128.pow(18),
    ) {
        let debt = TokenAmount::from_raw(debt);
        let low = calculate_health_factor(UsdValue::from_raw(collateral), debt, LIQUIDATION_THRESHOLD_PCT).unwrap();
        let high = calculate_health_factor(UsdValue::from_raw(collateral + extra), debt, LIQUIDATION_THRESHOLD_PCT).unwrap();
        prop_assert!(high >= low);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Balances never go negative and every accepted mint leaves the account healthy
    #[test]
    fn prop_ledger_stays_non_negative_and_gated(
        ops in prop::collection::vec((0u8..4, 1u128..=20), 1..24),
    ) {
        let deployment = InMemoryDeployment::with_symbols(&["weth"], 1_700_000_000).unwrap();
        deployment.set_price("weth", 2000_0000_0000).unwrap();
        let engine = deployment.engine();
        let weth = deployment.asset_id("weth").unwrap();
        let alice = Address::from_label("alice");

        deployment.fund(&alice, "weth", CollateralAmount::from_units(100)).unwrap();
        deployment.approve_stablecoin(&alice, TokenAmount::from_units(1_000_000)).unwrap();

        for (kind, n) in ops {
            let result = match kind {
                0 => engine.deposit_collateral(alice, weth, CollateralAmount::from_units(n)),
                1 => engine.redeem_collateral(alice, weth, CollateralAmount::from_units(n)),
                2 => engine.mint_debt(alice, TokenAmount::from_units(n * 1000)),
                _ => engine.burn_debt(alice, TokenAmount::from_units(n * 1000)),
            };

            match result {
                Ok(()) => {
                    let status = engine.account_status(&alice).unwrap();
                    prop_assert_eq!(status, AccountStatus::Healthy);
                }
                Err(e) => prop_assert!(
                    matches!(
                        e,
                        Error::HealthFactorBroken(_)
                            | Error::InsufficientCollateral { .. }
                            | Error::Underflow { .. }
                            | Error::TransferFailed { .. }
                    ),
                    "unexpected error {:?}",
                    e
                ),
            }

            let deposited = engine.collateral_balance_of(&alice, &weth).unwrap();
            let wallet = deployment.asset("weth").unwrap().balance_of(&alice);
            prop_assert_eq!(deposited.raw() + wallet.raw(), CollateralAmount::from_units(100).raw());
            prop_assert_eq!(engine.debt_of(&alice).unwrap(), deployment.token().balance_of(&alice));
        }
    }
}
