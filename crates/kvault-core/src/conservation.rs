//! Value conservation invariant checker.
//!
//! Invariant enforced after every vault operation:
//! ```text
//! item_count × ratio + fungible_balance == Σ(preloaded value) − Σ(emergency withdrawals)
//! ```
//!
//! Swaps only move value between the two representations, so they never
//! touch the expected total. Preload and the emergency paths are the only
//! operations allowed to change it, and they record that change here. If
//! the check ever fails the vault's bookkeeping is corrupt and the call is
//! aborted with a critical alert.

use kvault_types::{KvaultError, Result};

/// Tracks the value the vault should hold and validates it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConservationMonitor {
    /// Total value brought in by preloads, in fungible units.
    inflows: u128,
    /// Total value taken out by emergency withdrawals, in fungible units.
    outflows: u128,
}

impl ConservationMonitor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record value entering outside the swap protocol.
    ///
    /// # Errors
    /// Returns `ArithmeticOverflow` (monitor unchanged) on overflow.
    pub fn record_inflow(&mut self, value: u128) -> Result<()> {
        self.inflows = self
            .inflows
            .checked_add(value)
            .ok_or(KvaultError::ArithmeticOverflow {
                context: "conservation inflow",
            })?;
        Ok(())
    }

    /// Record value leaving outside the swap protocol.
    ///
    /// # Errors
    /// Returns `ArithmeticOverflow` (monitor unchanged) on overflow.
    pub fn record_outflow(&mut self, value: u128) -> Result<()> {
        self.outflows = self
            .outflows
            .checked_add(value)
            .ok_or(KvaultError::ArithmeticOverflow {
                context: "conservation outflow",
            })?;
        Ok(())
    }

    /// Undo a previously recorded inflow (failed call rollback).
    pub fn revert_inflow(&mut self, value: u128) {
        self.inflows = self.inflows.saturating_sub(value);
    }

    /// Undo a previously recorded outflow (failed call rollback).
    pub fn revert_outflow(&mut self, value: u128) {
        self.outflows = self.outflows.saturating_sub(value);
    }

    /// Value the vault should currently hold.
    #[must_use]
    pub fn expected_value(&self) -> u128 {
        self.inflows.saturating_sub(self.outflows)
    }

    /// Value implied by the vault's composition.
    ///
    /// # Errors
    /// Returns `ArithmeticOverflow` if the composition does not fit in `u128`.
    pub fn composition_value(
        item_count: usize,
        fungible_balance: u128,
        conversion_ratio: u128,
    ) -> Result<u128> {
        (item_count as u128)
            .checked_mul(conversion_ratio)
            .and_then(|items| items.checked_add(fungible_balance))
            .ok_or(KvaultError::ArithmeticOverflow {
                context: "composition value",
            })
    }

    /// Verify the vault's composition against the expected value.
    ///
    /// # Errors
    /// Returns [`KvaultError::InvariantViolation`] if they differ.
    pub fn verify(
        &self,
        item_count: usize,
        fungible_balance: u128,
        conversion_ratio: u128,
    ) -> Result<()> {
        let actual = Self::composition_value(item_count, fungible_balance, conversion_ratio)?;
        let expected = self.expected_value();
        if actual != expected {
            return Err(KvaultError::InvariantViolation {
                reason: format!(
                    "composition value {actual} != expected {expected} \
                     (items={item_count}, fungible={fungible_balance}, \
                     inflows={}, outflows={})",
                    self.inflows, self.outflows,
                ),
            });
        }
        Ok(())
    }
}
