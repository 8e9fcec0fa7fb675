//! In-memory deployment wiring.
//!
//! Builds an engine together with reference collaborators from a
//! [`DeploymentConfig`]: one fungible asset per collateral entry, a shared price
//! feed and a stable token owned by the engine.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::core::asset::{CollateralAsset, FungibleAsset};
use crate::core::config::{CollateralSpec, DeploymentConfig, EngineParams};
use crate::core::ledger::CollateralAmount;
use crate::core::token::{StableToken, TokenAmount};
use crate::error::{Error, Result};
use crate::oracle::price_feed::{Clock, InMemoryPriceFeed};
use crate::protocol::engine::StablecoinEngine;
use crate::utils::crypto::{Address, AssetId, OracleId};

/// Label of the engine's custody address
pub const ENGINE_LABEL: &str = "dsc-engine";

/// Label of the stable token address
pub const TOKEN_LABEL: &str = "dsc";

/// An engine wired to in-memory collaborators
#[derive(Debug)]
pub struct InMemoryDeployment {
    config: DeploymentConfig,
    engine: Arc<StablecoinEngine>,
    token: Arc<StableToken>,
    feed: Arc<InMemoryPriceFeed>,
    assets: BTreeMap<String, Arc<FungibleAsset>>,
}

impl InMemoryDeployment {
    /// Deploy from a configuration on the system clock
    pub fn new(config: DeploymentConfig) -> Result<Self> {
        Self::with_clock(config, Clock::System)
    }

    /// Deploy from a configuration on the given clock
    pub fn with_clock(config: DeploymentConfig, clock: Clock) -> Result<Self> {
        let address = Address::from_label(ENGINE_LABEL);
        let token = Arc::new(StableToken::new(Address::from_label(TOKEN_LABEL), "DSC", address));
        let feed = Arc::new(InMemoryPriceFeed::with_clock(clock));

        let mut assets = BTreeMap::new();
        let mut collateral: Vec<Arc<dyn CollateralAsset>> = Vec::new();
        for spec in &config.collateral {
            let asset = Arc::new(FungibleAsset::new(spec.asset, spec.symbol.clone()));
            assets.insert(spec.symbol.to_ascii_uppercase(), Arc::clone(&asset));
            collateral.push(asset);
        }

        let oracles: Vec<OracleId> = config.collateral.iter().map(|spec| spec.oracle).collect();
        let engine = StablecoinEngine::new(
            address,
            collateral,
            &oracles,
            token.clone(),
            feed.clone(),
            config.params.clone(),
        )?;

        Ok(Self {
            config,
            engine: Arc::new(engine),
            token,
            feed,
            assets,
        })
    }

    /// Configuration with label-derived addresses for each symbol
    pub fn config_for(symbols: &[&str], params: EngineParams) -> DeploymentConfig {
        let collateral = symbols
            .iter()
            .map(|symbol| CollateralSpec {
                symbol: symbol.to_ascii_uppercase(),
                asset: Address::from_label(&symbol.to_ascii_lowercase()),
                oracle: Address::from_label(&format!("{}-usd", symbol.to_ascii_lowercase())),
            })
            .collect();

        DeploymentConfig { collateral, params }
    }

    /// Deploy the given symbols with default parameters on a fixed clock
    pub fn with_symbols(symbols: &[&str], now: i64) -> Result<Self> {
        Self::with_clock(Self::config_for(symbols, EngineParams::default()), Clock::Fixed(now))
    }

    /// The deployment description
    pub fn config(&self) -> &DeploymentConfig {
        &self.config
    }

    /// The engine
    pub fn engine(&self) -> &Arc<StablecoinEngine> {
        &self.engine
    }

    /// The stable token
    pub fn token(&self) -> &Arc<StableToken> {
        &self.token
    }

    /// The price feed
    pub fn feed(&self) -> &Arc<InMemoryPriceFeed> {
        &self.feed
    }

    /// Collateral asset by symbol (case-insensitive)
    pub fn asset(&self, symbol: &str) -> Result<&Arc<FungibleAsset>> {
        self.assets
            .get(&symbol.to_ascii_uppercase())
            .ok_or_else(|| Error::InvalidParameter {
                name: "symbol".into(),
                reason: format!("unknown collateral {}", symbol),
            })
    }

    /// Asset id by symbol
    pub fn asset_id(&self, symbol: &str) -> Result<AssetId> {
        self.asset(symbol).map(|asset| asset.id())
    }

    /// Symbols in registry order
    pub fn symbols(&self) -> Vec<String> {
        self.config.collateral.iter().map(|spec| spec.symbol.clone()).collect()
    }

    /// Mint collateral to an account and approve the engine to pull it
    pub fn fund(&self, account: &Address, symbol: &str, amount: CollateralAmount) -> Result<()> {
        let asset = self.asset(symbol)?;
        asset.mint(account, amount)?;

        let allowance = asset.allowance(account, &self.engine.address());
        let allowance = allowance.checked_add(amount).ok_or_else(|| Error::Overflow {
            operation: "collateral allowance".into(),
        })?;
        asset.approve(account, &self.engine.address(), allowance)
    }

    /// Let the engine pull `amount` of an account's stable tokens
    pub fn approve_stablecoin(&self, account: &Address, amount: TokenAmount) -> Result<()> {
        self.token.approve(account, &self.engine.address(), amount)
    }

    /// Publish an 8-decimal price for a symbol
    pub fn set_price(&self, symbol: &str, price: i128) -> Result<()> {
        let spec = self.config.by_symbol(symbol).ok_or_else(|| Error::InvalidParameter {
            name: "symbol".into(),
            reason: format!("unknown collateral {}", symbol),
        })?;
        self.feed.set_price(spec.oracle, price).map(|_| ())
    }
}
