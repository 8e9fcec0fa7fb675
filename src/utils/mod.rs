//! Utility modules for the DSC engine.
//!
//! This module contains shared utilities used across the engine:
//! - Constants
//! - Address identifiers
//! - Fixed-point arithmetic
//! - Validation helpers

pub mod constants;
pub mod crypto;
pub mod math;
pub mod validation;

pub use constants::*;
pub use crypto::*;
pub use math::*;
pub use validation::*;
