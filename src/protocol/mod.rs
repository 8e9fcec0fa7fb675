//! Protocol module - the engine and its orchestration.
//!
//! This module provides the engine that runs every collateral and debt
//! operation atomically under a reentrancy guard, the notifications it emits,
//! and in-memory deployment wiring.

pub mod deployment;
pub mod engine;
pub mod events;
pub mod guard;
pub mod operations;

pub use deployment::*;
pub use engine::*;
pub use events::*;
pub use guard::*;
pub use operations::*;
