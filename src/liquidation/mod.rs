//! Liquidation module for the DSC engine.
//!
//! This module handles liquidations:
//! - Detection of at-risk accounts
//! - Quoting seized collateral and bonus
//! - Atomic repay-and-seize with an improvement guarantee

pub mod engine;

pub use engine::*;
