//! Oracle module for price feeds.
//!
//! This module provides price feed functionality:
//! - The adapter interface the engine consumes
//! - Price validation shared by every adapter
//! - An in-memory, round-based reference feed

pub mod adapter;
pub mod price_feed;

pub use adapter::*;
pub use price_feed::*;
