//! Vault events for the kvault audit trail.
//!
//! Every committed mutation of the vault produces one or more
//! [`VaultEvent`]s, wrapped in a sequenced [`EventRecord`]. External
//! consumers follow the floor price through `FloorPriceUpdated` instead of
//! polling individual state variables.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Address, ItemId, MarketMode};

/// What happened to the vault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VaultEvent {
    /// A holder swapped an item for fungible units.
    ItemDeposited {
        holder: Address,
        item: ItemId,
        fungible_out: u128,
    },
    /// A holder swapped fungible units for items (lowest ids first).
    FungibleDeposited {
        holder: Address,
        amount: u128,
        released: Vec<ItemId>,
    },
    /// Liquidity seeded without a counterparty payout.
    Preloaded {
        by: Address,
        items: Vec<ItemId>,
        fungible_amount: u128,
    },
    /// The router reported net issuance proceeds.
    ValueReported {
        by: Address,
        amount: u128,
        aggregate_value: u128,
    },
    /// The pricing regime changed. Emitted at most once per vault.
    ModeChanged { from: MarketMode, to: MarketMode },
    /// Floor price recomputed after a mutation.
    FloorPriceUpdated { price: u128, mode: MarketMode },
    /// Admin pulled fungible units out, bypassing conservation.
    EmergencyFungibleWithdrawal { to: Address, amount: u128 },
    /// Admin pulled an item out, bypassing conservation.
    EmergencyItemWithdrawal { to: Address, item: ItemId },
    /// Swaps were enabled or disabled.
    SwapToggled { enabled: bool },
    /// The admin role moved to a new address.
    AdminChanged { previous: Address, new: Address },
    /// The router role moved to a new address (or was cleared).
    RouterChanged {
        previous: Option<Address>,
        new: Option<Address>,
    },
}

impl VaultEvent {
    /// Stable upper-snake name, used as the `event` field in logs.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ItemDeposited { .. } => "ITEM_DEPOSITED",
            Self::FungibleDeposited { .. } => "FUNGIBLE_DEPOSITED",
            Self::Preloaded { .. } => "PRELOADED",
            Self::ValueReported { .. } => "VALUE_REPORTED",
            Self::ModeChanged { .. } => "MODE_CHANGED",
            Self::FloorPriceUpdated { .. } => "FLOOR_PRICE_UPDATED",
            Self::EmergencyFungibleWithdrawal { .. } => "EMERGENCY_FUNGIBLE_WITHDRAWAL",
            Self::EmergencyItemWithdrawal { .. } => "EMERGENCY_ITEM_WITHDRAWAL",
            Self::SwapToggled { .. } => "SWAP_TOGGLED",
            Self::AdminChanged { .. } => "ADMIN_CHANGED",
            Self::RouterChanged { .. } => "ROUTER_CHANGED",
        }
    }
}

impl std::fmt::Display for VaultEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A vault event with its position in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Monotonic sequence number, starting at 0.
    pub sequence: u64,
    /// The event itself.
    pub event: VaultEvent,
    /// When the event was committed.
    pub emitted_at: DateTime<Utc>,
}
