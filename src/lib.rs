//! # DSC Engine
//!
//! Collateral accounting, health factor and liquidation engine for an
//! overcollateralized, USD-pegged stable token.
//!
//! ## Architecture
//!
//! The engine consists of several core modules:
//!
//! - **Core**: Amount types, collateral ledger, valuation and health factor
//! - **Oracle**: Price adapter interface and a round-based in-memory feed
//! - **Protocol**: The engine, its atomic operations and notifications
//! - **Liquidation**: Third-party repayment of at-risk accounts
//!
//! Every mutating operation is all-or-nothing and runs under a reentrancy
//! guard. Any account with debt must stay above the minimum health factor after
//! each of its own operations.
//!
//! ## Example
//!
//! ```rust,ignore
//! use dsc::prelude::*;
//!
//! let deployment = InMemoryDeployment::with_symbols(&["weth"], now)?;
//! deployment.set_price("weth", 2000_0000_0000)?;
//! deployment.fund(&alice, "weth", CollateralAmount::from_units(10))?;
//!
//! let weth = deployment.asset_id("weth")?;
//! deployment
//!     .engine()
//!     .deposit_and_mint(alice, weth, CollateralAmount::from_units(10), TokenAmount::from_units(1000))?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    trivial_casts,
    unused_lifetimes,
    unused_qualifications
)]

pub mod cli;
pub mod core;
pub mod error;
pub mod liquidation;
pub mod oracle;
pub mod protocol;
pub mod utils;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        asset::{CollateralAsset, FungibleAsset},
        config::{CollateralSpec, DeploymentConfig, EngineParams},
        health::{AccountStatus, HealthFactor},
        ledger::{AccountPosition, CollateralAmount, CollateralLedger},
        token::{StableToken, TokenAmount, TokenAuthority},
        valuation::UsdValue,
    };
    pub use crate::error::{Error, Result};
    pub use crate::liquidation::engine::{LiquidationOutcome, LiquidationPlan, LiquidationStats};
    pub use crate::oracle::{
        adapter::{PriceAnswer, PriceOracleAdapter},
        price_feed::{Clock, InMemoryPriceFeed, RoundData},
    };
    pub use crate::protocol::{
        deployment::InMemoryDeployment,
        engine::StablecoinEngine,
        events::EngineEvent,
        operations::{EngineOperation, OperationResult},
    };
    pub use crate::utils::crypto::{Address, AssetId, OracleId};
}

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name
pub const ENGINE_NAME: &str = "DSC Engine";
