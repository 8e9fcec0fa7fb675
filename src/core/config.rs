//! Engine configuration and parameters.
//!
//! Parameters are divided into:
//! - Solvency parameters: fixed at construction, read by every health check
//! - Deployment description: which collateral assets map to which oracles

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::health::HealthFactor;
use crate::error::{Error, Result};
use crate::utils::constants::*;
use crate::utils::crypto::{AssetId, OracleId};
use crate::utils::validation::validate_percentage;

/// Environment variable naming a deployment file
pub const CONFIG_ENV_VAR: &str = "DSC_CONFIG";

// ═══════════════════════════════════════════════════════════════════════════════
// ENGINE PARAMETERS
// ═══════════════════════════════════════════════════════════════════════════════

/// Solvency parameters (immutable once the engine is built)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineParams {
    /// Share of collateral value counted toward solvency, in percent
    pub liquidation_threshold_pct: u128,

    /// Extra collateral awarded to liquidators, in percent
    pub liquidation_bonus_pct: u128,

    /// Health factor at or below which an account is at risk
    pub min_health_factor: HealthFactor,
}

impl Default for EngineParams {
    fn default() -> Self {
        Self {
            liquidation_threshold_pct: LIQUIDATION_THRESHOLD_PCT,
            liquidation_bonus_pct: LIQUIDATION_BONUS_PCT,
            min_health_factor: HealthFactor::from_raw(MIN_HEALTH_FACTOR),
        }
    }
}

impl EngineParams {
    /// Override the liquidation threshold
    pub fn with_threshold(mut self, pct: u128) -> Self {
        self.liquidation_threshold_pct = pct;
        self
    }

    /// Override the liquidation bonus
    pub fn with_bonus(mut self, pct: u128) -> Self {
        self.liquidation_bonus_pct = pct;
        self
    }

    /// Override the minimum health factor
    pub fn with_min_health_factor(mut self, min: HealthFactor) -> Self {
        self.min_health_factor = min;
        self
    }

    /// Validate parameters are consistent
    pub fn validate(&self) -> Result<()> {
        validate_percentage(self.liquidation_threshold_pct, 1, "liquidation_threshold_pct")?;
        validate_percentage(self.liquidation_bonus_pct, 0, "liquidation_bonus_pct")?;

        if self.min_health_factor == HealthFactor::ZERO || self.min_health_factor == HealthFactor::MAX {
            return Err(Error::InvalidParameter {
                name: "min_health_factor".into(),
                reason: "must be a finite, non-zero ratio".into(),
            });
        }

        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DEPLOYMENT DESCRIPTION
// ═══════════════════════════════════════════════════════════════════════════════

/// One supported collateral asset and its price feed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralSpec {
    /// Display symbol (e.g. "WETH")
    pub symbol: String,
    /// Asset address
    pub asset: AssetId,
    /// Oracle bound to the asset
    pub oracle: OracleId,
}

/// Description of a deployment, loadable from JSON
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentConfig {
    /// Supported collateral, in registry order
    pub collateral: Vec<CollateralSpec>,
    /// Solvency parameters
    #[serde(default)]
    pub params: EngineParams,
}

impl DeploymentConfig {
    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

        serde_json::from_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load from the file named by `DSC_CONFIG`, if set
    pub fn from_env() -> Result<Option<Self>> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(path) => Self::load(Path::new(&path)).map(Some),
            Err(_) => Ok(None),
        }
    }

    /// Save to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| Error::Serialization(e.to_string()))?;

        std::fs::write(path, content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Split into the parallel asset and oracle lists used at registration
    pub fn into_parts(&self) -> (Vec<AssetId>, Vec<OracleId>) {
        self.collateral
            .iter()
            .map(|spec| (spec.asset, spec.oracle))
            .unzip()
    }

    /// Find a collateral entry by symbol (case-insensitive)
    pub fn by_symbol(&self, symbol: &str) -> Option<&CollateralSpec> {
        self.collateral
            .iter()
            .find(|spec| spec.symbol.eq_ignore_ascii_case(symbol))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::crypto::Address;

    fn sample_config() -> DeploymentConfig {
        DeploymentConfig {
            collateral: vec![
                CollateralSpec {
                    symbol: "WETH".into(),
                    asset: Address::from_label("weth"),
                    oracle: Address::from_label("eth-usd"),
                },
                CollateralSpec {
                    symbol: "WBTC".into(),
                    asset: Address::from_label("wbtc"),
                    oracle: Address::from_label("btc-usd"),
                },
            ],
            params: EngineParams::default(),
        }
    }

    #[test]
    fn test_params_default_valid() {
        let params = EngineParams::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.liquidation_threshold_pct, LIQUIDATION_THRESHOLD_PCT);
    }

    #[test]
    fn test_params_rejects_bad_values() {
        assert!(EngineParams::default().with_threshold(0).validate().is_err());
        assert!(EngineParams::default().with_threshold(150).validate().is_err());
        assert!(EngineParams::default().with_bonus(101).validate().is_err());
        assert!(EngineParams::default()
            .with_min_health_factor(HealthFactor::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn test_into_parts_preserves_order() {
        let config = sample_config();
        let (assets, oracles) = config.into_parts();

        assert_eq!(assets, vec![Address::from_label("weth"), Address::from_label("wbtc")]);
        assert_eq!(oracles, vec![Address::from_label("eth-usd"), Address::from_label("btc-usd")]);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deployment.json");

        let config = sample_config();
        config.save(&path).unwrap();

        let loaded = DeploymentConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
        assert_eq!(loaded.by_symbol("weth").unwrap().oracle, Address::from_label("eth-usd"));
    }

    #[test]
    fn test_params_optional_in_json() {
        let json = format!(
            r#"{{"collateral":[{{"symbol":"WETH","asset":"{}","oracle":"{}"}}]}}"#,
            Address::from_label("weth"),
            Address::from_label("eth-usd"),
        );
        let config: DeploymentConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config.params, EngineParams::default());
    }

    #[test]
    fn test_load_missing_file() {
        let result = DeploymentConfig::load(Path::new("/nonexistent/deployment.json"));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
