//! Pricing regime and pool statistics.
//!
//! The pool starts in **BOOTSTRAP**, where the floor price is the average
//! net proceeds per issued item, and moves once, never back, to
//! **OPEN_MARKET** when the registry has issued every item it can.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The two pricing regimes of the pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketMode {
    /// Primary issuance in progress; price follows cumulative proceeds.
    #[default]
    Bootstrap,
    /// Issuance exhausted; price follows the vault's own composition.
    OpenMarket,
}

impl MarketMode {
    /// Whether this mode is terminal (no further transitions).
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::OpenMarket)
    }
}

impl fmt::Display for MarketMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bootstrap => write!(f, "BOOTSTRAP"),
            Self::OpenMarket => write!(f, "OPEN_MARKET"),
        }
    }
}

/// Point-in-time snapshot of the pool, as returned by `stats()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultStats {
    /// Number of items held by the vault.
    pub item_count: usize,
    /// Fungible units held by the vault.
    pub fungible_balance: u128,
    /// Floor price computed for the current mode.
    pub floor_price: u128,
    /// Current pricing regime.
    pub mode: MarketMode,
    /// Items issued so far by the registry.
    pub total_issued: u64,
    /// Maximum the registry will ever issue.
    pub max_issuable: u64,
}

impl VaultStats {
    /// Items the registry can still issue.
    #[must_use]
    pub fn remaining_issuance(&self) -> u64 {
        self.max_issuable.saturating_sub(self.total_issued)
    }
}
