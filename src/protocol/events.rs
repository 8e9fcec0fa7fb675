//! Engine notifications for external consumers.
//!
//! Events are staged while an operation runs and published only when it
//! succeeds, so each successful mutation emits its events exactly once and a
//! rolled-back one emits none.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::VecDeque;

use crate::core::health::HealthFactor;
use crate::core::ledger::CollateralAmount;
use crate::core::token::TokenAmount;
use crate::utils::constants::MAX_RETAINED_EVENTS;
use crate::utils::crypto::{Address, AssetId};

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// All engine event types
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EngineEvent {
    /// Collateral was recorded for an account
    CollateralDeposited(CollateralDepositedEvent),
    /// Collateral left an account's balance
    CollateralRedeemed(CollateralRedeemedEvent),
    /// An account was liquidated
    Liquidated(LiquidatedEvent),
}

impl EngineEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::CollateralDeposited(_) => "CollateralDeposited",
            Self::CollateralRedeemed(_) => "CollateralRedeemed",
            Self::Liquidated(_) => "Liquidated",
        }
    }

    /// Account whose position changed
    pub fn account(&self) -> Address {
        match self {
            Self::CollateralDeposited(e) => e.account,
            Self::CollateralRedeemed(e) => e.from,
            Self::Liquidated(e) => e.account,
        }
    }

    /// Compute event hash
    pub fn hash(&self) -> [u8; 32] {
        let data = bincode::serialize(self).unwrap_or_default();
        Sha256::digest(&data).into()
    }
}

/// Event emitted when collateral is deposited
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralDepositedEvent {
    /// Depositing account
    pub account: Address,
    /// Collateral asset
    pub asset: AssetId,
    /// Amount deposited
    pub amount: CollateralAmount,
}

/// Event emitted when collateral is redeemed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralRedeemedEvent {
    /// Account the collateral was taken from
    pub from: Address,
    /// Recipient (the liquidator during a liquidation)
    pub to: Address,
    /// Collateral asset
    pub asset: AssetId,
    /// Amount redeemed
    pub amount: CollateralAmount,
}

/// Event emitted when a liquidation succeeds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidatedEvent {
    /// Liquidated account
    pub account: Address,
    /// Liquidator
    pub liquidator: Address,
    /// Collateral asset seized
    pub asset: AssetId,
    /// Debt repaid by the liquidator
    pub debt_covered: TokenAmount,
    /// Collateral seized, bonus included
    pub collateral_seized: CollateralAmount,
    /// Health factor before
    pub starting_health_factor: HealthFactor,
    /// Health factor after
    pub ending_health_factor: HealthFactor,
}

// ═══════════════════════════════════════════════════════════════════════════════
// EVENT LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// Published events, oldest first, bounded to the most recent entries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog {
    events: VecDeque<EngineEvent>,
    capacity: usize,
    total_published: u64,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    /// Create a new empty event log
    pub fn new() -> Self {
        Self::with_capacity(MAX_RETAINED_EVENTS)
    }

    /// Create a log retaining at most `capacity` events
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            capacity: capacity.max(1),
            total_published: 0,
        }
    }

    /// Add an event to the log
    pub fn push(&mut self, event: EngineEvent) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
        self.total_published += 1;
    }

    /// Publish a batch of staged events in order
    pub fn extend(&mut self, staged: Vec<EngineEvent>) {
        for event in staged {
            self.push(event);
        }
    }

    /// Get retained events
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.iter().cloned().collect()
    }

    /// Remove and return retained events
    pub fn drain(&mut self) -> Vec<EngineEvent> {
        self.events.drain(..).collect()
    }

    /// Get events of a specific type
    pub fn filter_by_type(&self, event_type: &str) -> Vec<&EngineEvent> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Get the number of retained events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events published since creation, including evicted ones
    pub fn total_published(&self) -> u64 {
        self.total_published
    }

    /// Hash chain over retained events
    pub fn digest(&self) -> [u8; 32] {
        self.events.iter().fold([0u8; 32], |acc, event| {
            let mut hasher = Sha256::new();
            hasher.update(acc);
            hasher.update(event.hash());
            hasher.finalize().into()
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TESTS
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn deposit(units: u128) -> EngineEvent {
        EngineEvent::CollateralDeposited(CollateralDepositedEvent {
            account: Address::from_label("alice"),
            asset: Address::from_label("weth"),
            amount: CollateralAmount::from_units(units),
        })
    }

    #[test]
    fn test_event_types() {
        let event = EngineEvent::CollateralRedeemed(CollateralRedeemedEvent {
            from: Address::from_label("alice"),
            to: Address::from_label("bob"),
            asset: Address::from_label("weth"),
            amount: CollateralAmount::from_units(1),
        });

        assert_eq!(event.event_type(), "CollateralRedeemed");
        assert_eq!(event.account(), Address::from_label("alice"));
    }

    #[test]
    fn test_event_log() {
        let mut log = EventLog::new();
        assert!(log.is_empty());

        log.extend(vec![deposit(1), deposit(2)]);
        assert_eq!(log.len(), 2);
        assert_eq!(log.filter_by_type("CollateralDeposited").len(), 2);
        assert!(log.filter_by_type("Liquidated").is_empty());

        let drained = log.drain();
        assert_eq!(drained, vec![deposit(1), deposit(2)]);
        assert!(log.is_empty());
        assert_eq!(log.total_published(), 2);
    }

    #[test]
    fn test_event_log_capacity() {
        let mut log = EventLog::with_capacity(2);
        log.extend(vec![deposit(1), deposit(2), deposit(3)]);

        assert_eq!(log.events(), vec![deposit(2), deposit(3)]);
        assert_eq!(log.total_published(), 3);
    }

    #[test]
    fn test_digest_changes() {
        let mut log = EventLog::new();
        let empty = log.digest();
        assert_eq!(empty, [0u8; 32]);

        log.push(deposit(1));
        assert_ne!(log.digest(), empty);
        assert_eq!(deposit(1).hash(), deposit(1).hash());
    }
}
