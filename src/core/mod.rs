//! Core modules for the DSC engine.
//!
//! This module contains the fundamental building blocks:
//! - Configuration and solvency parameters
//! - Collateral ledger and registry
//! - Stable token and collateral asset interfaces
//! - Valuation and health factor computation

pub mod asset;
pub mod config;
pub mod health;
pub mod ledger;
pub mod token;
pub mod valuation;

pub use asset::*;
pub use config::*;
pub use health::*;
pub use ledger::*;
pub use token::*;
pub use valuation::*;
