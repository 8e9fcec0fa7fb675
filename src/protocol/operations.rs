//! Engine operations as data.
//!
//! Each variant maps onto one mutating entry point of [`StablecoinEngine`], so a
//! batch of operations can be recorded, replayed or loaded from a file.

use serde::{Deserialize, Serialize};

use crate::core::ledger::CollateralAmount;
use crate::core::token::TokenAmount;
use crate::error::Result;
use crate::liquidation::engine::LiquidationOutcome;
use crate::protocol::engine::StablecoinEngine;
use crate::utils::crypto::{Address, AssetId};

/// All mutating engine operations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineOperation {
    /// Deposit collateral
    Deposit {
        /// Depositing account
        account: Address,
        /// Collateral asset
        asset: AssetId,
        /// Amount
        amount: CollateralAmount,
    },
    /// Mint debt
    Mint {
        /// Minting account
        account: Address,
        /// Amount
        amount: TokenAmount,
    },
    /// Burn debt
    Burn {
        /// Repaying account
        account: Address,
        /// Amount
        amount: TokenAmount,
    },
    /// Redeem collateral
    Redeem {
        /// Redeeming account
        account: Address,
        /// Collateral asset
        asset: AssetId,
        /// Amount
        amount: CollateralAmount,
    },
    /// Deposit collateral and mint debt
    DepositAndMint {
        /// Account
        account: Address,
        /// Collateral asset
        asset: AssetId,
        /// Collateral deposited
        collateral: CollateralAmount,
        /// Debt minted
        debt: TokenAmount,
    },
    /// Burn debt and redeem collateral
    RedeemAndBurn {
        /// Account
        account: Address,
        /// Collateral asset
        asset: AssetId,
        /// Collateral redeemed
        collateral: CollateralAmount,
        /// Debt burned
        debt: TokenAmount,
    },
    /// Liquidate an at-risk account
    Liquidate {
        /// Liquidator paying the debt
        liquidator: Address,
        /// Account being liquidated
        account: Address,
        /// Collateral asset to seize
        asset: AssetId,
        /// Debt to cover
        debt_to_cover: TokenAmount,
    },
}

impl EngineOperation {
    /// Get the operation type name
    pub fn operation_type(&self) -> &'static str {
        match self {
            Self::Deposit { .. } => "Deposit",
            Self::Mint { .. } => "Mint",
            Self::Burn { .. } => "Burn",
            Self::Redeem { .. } => "Redeem",
            Self::DepositAndMint { .. } => "DepositAndMint",
            Self::RedeemAndBurn { .. } => "RedeemAndBurn",
            Self::Liquidate { .. } => "Liquidate",
        }
    }

    /// Account that submits the operation
    pub fn initiator(&self) -> Address {
        match self {
            Self::Deposit { account, .. }
            | Self::Mint { account, .. }
            | Self::Burn { account, .. }
            | Self::Redeem { account, .. }
            | Self::DepositAndMint { account, .. }
            | Self::RedeemAndBurn { account, .. } => *account,
            Self::Liquidate { liquidator, .. } => *liquidator,
        }
    }
}

/// Result of executing an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationResult {
    /// The operation completed with no further output
    Completed,
    /// A liquidation completed
    Liquidated(LiquidationOutcome),
}

impl StablecoinEngine {
    /// Execute an operation
    pub fn execute(&self, op: EngineOperation) -> Result<OperationResult> {
        match op {
            EngineOperation::Deposit { account, asset, amount } => {
                self.deposit_collateral(account, asset, amount)?
            }
            EngineOperation::Mint { account, amount } => self.mint_debt(account, amount)?,
            EngineOperation::Burn { account, amount } => self.burn_debt(account, amount)?,
            EngineOperation::Redeem { account, asset, amount } => {
                self.redeem_collateral(account, asset, amount)?
            }
            EngineOperation::DepositAndMint { account, asset, collateral, debt } => {
                self.deposit_and_mint(account, asset, collateral, debt)?
            }
            EngineOperation::RedeemAndBurn { account, asset, collateral, debt } => {
                self.redeem_and_burn(account, asset, collateral, debt)?
            }
            EngineOperation::Liquidate { liquidator, account, asset, debt_to_cover } => {
                let outcome = self.liquidate(liquidator, account, asset, debt_to_cover)?;
                return Ok(OperationResult::Liquidated(outcome));
            }
        }

        Ok(OperationResult::Completed)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════
