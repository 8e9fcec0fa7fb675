//! In-memory round-based price feed.
//!
//! This module provides a reference oracle adapter:
//! - Round data storage per oracle
//! - Staleness and round-consistency validation
//! - A settable clock for deterministic tests

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{Error, Result};
use crate::oracle::adapter::{PriceAnswer, PriceOracleAdapter};
use crate::utils::constants::{FEED_DECIMALS, PRICE_FEED_TIMEOUT_SECS};
use crate::utils::crypto::OracleId;
use crate::utils::math::format_fixed;

// ═══════════════════════════════════════════════════════════════════════════════
// ROUND DATA
// ═══════════════════════════════════════════════════════════════════════════════

/// One reported price round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundData {
    /// Round identifier
    pub round_id: u64,
    /// Reported price with 8 decimals
    pub answer: i128,
    /// Unix timestamp when the round started
    pub started_at: i64,
    /// Unix timestamp of the last update, 0 if the round never completed
    pub updated_at: i64,
    /// Round in which the answer was computed
    pub answered_in_round: u64,
}

impl RoundData {
    /// Age of the round in seconds
    pub fn age(&self, now: i64) -> i64 {
        now.saturating_sub(self.updated_at)
    }

    /// Check the round is complete, consistent and fresh
    pub fn is_valid(&self, now: i64, timeout_secs: i64) -> bool {
        self.updated_at != 0
            && self.answered_in_round >= self.round_id
            && self.age(now) <= timeout_secs
    }

    /// Format price for display
    pub fn format_price(&self) -> String {
        if self.answer < 0 {
            return format!("-${}", format_fixed(self.answer.unsigned_abs(), FEED_DECIMALS));
        }
        format!("${}", format_fixed(self.answer.unsigned_abs(), FEED_DECIMALS))
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CLOCK
// ═══════════════════════════════════════════════════════════════════════════════

/// Time source used for staleness checks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clock {
    /// Wall clock
    System,
    /// Fixed unix timestamp
    Fixed(i64),
}

impl Clock {
    /// Current unix timestamp
    pub fn now(&self) -> i64 {
        match self {
            Clock::System => Utc::now().timestamp(),
            Clock::Fixed(ts) => *ts,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PRICE FEED
// ═══════════════════════════════════════════════════════════════════════════════

/// Price feed holding the latest round of each oracle
#[derive(Debug)]
pub struct InMemoryPriceFeed {
    /// Latest round per oracle
    rounds: RwLock<HashMap<OracleId, RoundData>>,
    /// Time source
    clock: RwLock<Clock>,
    /// Maximum round age in seconds
    timeout_secs: i64,
}

impl Default for InMemoryPriceFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPriceFeed {
    /// Create a feed on the system clock with the default timeout
    pub fn new() -> Self {
        Self::with_clock(Clock::System)
    }

    /// Create a feed on the given clock
    pub fn with_clock(clock: Clock) -> Self {
        Self {
            rounds: RwLock::new(HashMap::new()),
            clock: RwLock::new(clock),
            timeout_secs: PRICE_FEED_TIMEOUT_SECS,
        }
    }

    /// Override the staleness timeout
    pub fn with_timeout(mut self, timeout_secs: i64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    /// Staleness timeout in seconds
    pub fn timeout_secs(&self) -> i64 {
        self.timeout_secs
    }

    /// Current time according to the feed's clock
    pub fn now(&self) -> i64 {
        self.clock.read().map(|c| c.now()).unwrap_or_else(|_| Utc::now().timestamp())
    }

    /// Pin the clock to `timestamp`
    pub fn set_time(&self, timestamp: i64) -> Result<()> {
        *self.clock.write().map_err(|_| Error::Lock)? = Clock::Fixed(timestamp);
        Ok(())
    }

    /// Move a fixed clock forward by `secs`
    pub fn advance(&self, secs: i64) -> Result<()> {
        let now = self.now();
        self.set_time(now.saturating_add(secs))
    }

    /// Store a raw round
    pub fn set_round(&self, oracle: OracleId, round: RoundData) -> Result<()> {
        self.rounds.write().map_err(|_| Error::Lock)?.insert(oracle, round);
        Ok(())
    }

    /// Publish a new answer as the next complete round, stamped with the current time
    pub fn set_price(&self, oracle: OracleId, answer: i128) -> Result<RoundData> {
        let now = self.now();
        let mut rounds = self.rounds.write().map_err(|_| Error::Lock)?;
        let round_id = rounds.get(&oracle).map(|r| r.round_id + 1).unwrap_or(1);

        let round = RoundData {
            round_id,
            answer,
            started_at: now,
            updated_at: now,
            answered_in_round: round_id,
        };
        rounds.insert(oracle, round);

        Ok(round)
    }

    /// Latest stored round
    pub fn latest_round(&self, oracle: &OracleId) -> Option<RoundData> {
        self.rounds.read().ok().and_then(|r| r.get(oracle).copied())
    }
}

impl PriceOracleAdapter for InMemoryPriceFeed {
    fn latest_price(&self, oracle: &OracleId) -> Result<PriceAnswer> {
        let round = self.latest_round(oracle).ok_or_else(|| Error::OraclePriceUnavailable {
            oracle: *oracle,
            reason: "no round reported".into(),
        })?;

        Ok(PriceAnswer {
            price: round.answer,
            valid: round.is_valid(self.now(), self.timeout_secs),
        })
    }
}
