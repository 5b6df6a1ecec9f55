//! Floor price engine and the one-way BOOTSTRAP → OPEN_MARKET transition.
//!
//! ```text
//! BOOTSTRAP:    floor = aggregate_value / total_issued            (0 if none issued)
//! OPEN_MARKET:  floor = fungible_balance / item_count / ratio     (0 if vault empty)
//! ```
//!
//! The transition fires the first time `total_issued >= max_issuable` is
//! observed. Re-evaluating afterwards is a no-op; nothing moves the engine
//! back to BOOTSTRAP.

use kvault_types::{KvaultError, MarketMode, Result};

/// Aggregate value accumulator plus the current pricing regime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PricingEngine {
    /// Cumulative net issuance proceeds. Never decreases.
    aggregate_value: u128,
    mode: MarketMode,
}

impl PricingEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn mode(&self) -> MarketMode {
        self.mode
    }

    #[must_use]
    pub fn aggregate_value(&self) -> u128 {
        self.aggregate_value
    }

    /// Add reported proceeds to the accumulator. Returns the new total.
    ///
    /// # Errors
    /// Returns `ArithmeticOverflow` (accumulator unchanged) on overflow.
    pub fn accumulate(&mut self, amount: u128) -> Result<u128> {
        self.aggregate_value = self
            .aggregate_value
            .checked_add(amount)
            .ok_or(KvaultError::ArithmeticOverflow {
                context: "aggregate value",
            })?;
        Ok(self.aggregate_value)
    }

    /// Apply the transition rule. Returns `true` only on the call that
    /// actually moved the engine to OPEN_MARKET.
    pub fn evaluate_transition(&mut self, total_issued: u64, max_issuable: u64) -> bool {
        if self.mode.is_terminal() || total_issued < max_issuable {
            return false;
        }
        self.mode = MarketMode::OpenMarket;
        true
    }

    /// Floor price under the current mode.
    #[must_use]
    pub fn floor_price(
        &self,
        total_issued: u64,
        item_count: usize,
        fungible_balance: u128,
        conversion_ratio: u128,
    ) -> u128 {
        match self.mode {
            MarketMode::Bootstrap => bootstrap_floor(self.aggregate_value, total_issued),
            MarketMode::OpenMarket => {
                open_market_floor(fungible_balance, item_count, conversion_ratio)
            }
        }
    }
}

/// Average net proceeds per item ever issued.
#[must_use]
pub fn bootstrap_floor(aggregate_value: u128, total_issued: u64) -> u128 {
    if total_issued == 0 {
        return 0;
    }
    aggregate_value / u128::from(total_issued)
}

/// Fungible units per held item, expressed in items.
#[must_use]
pub fn open_market_floor(fungible_balance: u128, item_count: usize, conversion_ratio: u128) -> u128 {
    if item_count == 0 || conversion_ratio == 0 {
        return 0;
    }
    fungible_balance / item_count as u128 / conversion_ratio
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_in_bootstrap_with_zero_value() {
        let engine = PricingEngine::new();
        assert_eq!(engine.mode(), MarketMode::Bootstrap);
        assert_eq!(engine.aggregate_value(), 0);
        assert_eq!(engine.floor_price(0, 0, 0, 10_000), 0);
    }

    #[test]
    fn bootstrap_floor_is_average_proceeds() {
        let mut engine = PricingEngine::new();
        engine.accumulate(950).unwrap();
        engine.accumulate(950).unwrap();
        // Vault composition is irrelevant during bootstrap.
        assert_eq!(engine.floor_price(2, 0, 0, 10_000), 950);
        assert_eq!(engine.floor_price(2, 7, 123_456, 10_000), 950);
        assert_eq!(engine.floor_price(3, 0, 0, 10_000), 633);
    }

    #[test]
    fn bootstrap_floor_with_nothing_issued_is_zero() {
        assert_eq!(bootstrap_floor(1_000, 0), 0);
    }

    #[test]
    fn accumulate_overflow_leaves_value_unchanged() {
        let mut engine = PricingEngine::new();
        engine.accumulate(u128::MAX - 1).unwrap();
        let err = engine.accumulate(2).unwrap_err();
        assert!(matches!(err, KvaultError::ArithmeticOverflow { .. }));
        assert_eq!(engine.aggregate_value(), u128::MAX - 1);
    }

    #[test]
    fn transition_fires_once_at_max_issuance() {
        let mut engine = PricingEngine::new();
        assert!(!engine.evaluate_transition(9, 10));
        assert_eq!(engine.mode(), MarketMode::Bootstrap);

        assert!(engine.evaluate_transition(10, 10));
        assert_eq!(engine.mode(), MarketMode::OpenMarket);

        // Idempotent afterwards, whatever the registry reports.
        assert!(!engine.evaluate_transition(10, 10));
        assert!(!engine.evaluate_transition(0, 10));
        assert_eq!(engine.mode(), MarketMode::OpenMarket);
    }

    #[test]
    fn open_market_floor_uses_composition() {
        let mut engine = PricingEngine::new();
        engine.accumulate(1_000_000).unwrap();
        engine.evaluate_transition(4, 4);
        // 60_000 units over 2 items at 10_000 per item → 3
        assert_eq!(engine.floor_price(4, 2, 60_000, 10_000), 3);
        assert_eq!(engine.floor_price(4, 0, 60_000, 10_000), 0);
    }

    #[test]
    fn open_market_floor_rounds_down() {
        assert_eq!(open_market_floor(19_999, 1, 10_000), 1);
        assert_eq!(open_market_floor(9_999, 1, 10_000), 0);
        assert_eq!(open_market_floor(20_000, 2, 10_000), 1);
    }
}
