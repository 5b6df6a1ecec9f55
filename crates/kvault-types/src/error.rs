//! Error types for the kvault pool.
//!
//! All errors use the `KV_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Inventory / swap errors
//! - 2xx: Pricing errors
//! - 3xx: Access errors
//! - 4xx: Collaborator (registry / ledger) errors
//! - 5xx: Router errors
//! - 9xx: General / internal errors

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{Address, ItemId};

/// Central error enum for all kvault operations.
#[derive(Debug, Error)]
pub enum KvaultError {
    // =================================================================
    // Inventory / Swap Errors (1xx)
    // =================================================================
    /// The caller does not own the item it tried to deposit.
    #[error("KV_ERR_100: {caller} does not own item {item}")]
    NotOwner { item: ItemId, caller: Address },

    /// The item is already in the vault's inventory.
    #[error("KV_ERR_101: Item already held by the vault: {0}")]
    AlreadyHeld(ItemId),

    /// The item is not in the vault's inventory.
    #[error("KV_ERR_102: Item not held by the vault: {0}")]
    NotHeld(ItemId),

    /// The vault does not hold enough fungible units for the payout.
    #[error("KV_ERR_103: Insufficient pool balance: need {needed}, have {available}")]
    InsufficientPoolBalance { needed: u128, available: u128 },

    /// Amount is below the conversion ratio or not a multiple of it.
    #[error("KV_ERR_104: Invalid amount {amount}: must be a positive multiple of {ratio}")]
    InvalidAmount { amount: u128, ratio: u128 },

    /// The vault holds no items at all.
    #[error("KV_ERR_105: No items available in the vault")]
    NoItemsAvailable,

    /// The vault holds fewer items than requested.
    #[error("KV_ERR_106: Insufficient inventory: requested {requested}, held {held}")]
    InsufficientInventory { requested: u128, held: usize },

    /// Swaps are currently disabled.
    #[error("KV_ERR_107: Swaps are disabled")]
    SwapDisabled,

    // =================================================================
    // Pricing Errors (2xx)
    // =================================================================
    /// A checked arithmetic operation overflowed.
    #[error("KV_ERR_200: Arithmetic overflow in {context}")]
    ArithmeticOverflow { context: &'static str },

    // =================================================================
    // Access Errors (3xx)
    // =================================================================
    /// The caller lacks the role required for the action.
    #[error("KV_ERR_300: {caller} is not authorized to {action}")]
    NotAuthorized {
        caller: Address,
        action: &'static str,
    },

    /// A state-mutating entry point was invoked while another was running.
    #[error("KV_ERR_301: Reentrant call rejected")]
    Reentrant,

    // =================================================================
    // Collaborator Errors (4xx)
    // =================================================================
    /// An item registry or balance ledger call failed.
    #[error("KV_ERR_400: Transfer failed: {reason}")]
    TransferFailed { reason: String },

    /// Fewer items were released than requested (internal consistency fault).
    #[error("KV_ERR_401: Transfer incomplete: requested {requested}, released {released}")]
    TransferIncomplete { requested: usize, released: usize },

    /// The registry has never issued this item.
    #[error("KV_ERR_402: Unknown item: {0}")]
    UnknownItem(ItemId),

    /// The registry has issued its maximum number of items.
    #[error("KV_ERR_403: Supply exhausted: all {max} items issued")]
    SupplyExhausted { max: u64 },

    /// Not enough fungible balance for a ledger transfer.
    #[error("KV_ERR_404: Insufficient balance: need {needed}, have {available}")]
    InsufficientBalance { needed: u128, available: u128 },

    /// Not enough allowance for a `transfer_from`.
    #[error("KV_ERR_405: Insufficient allowance: need {needed}, have {available}")]
    InsufficientAllowance { needed: u128, available: u128 },

    /// The ledger refuses every transfer touching this account.
    #[error("KV_ERR_406: Account blocked: {0}")]
    AccountBlocked(Address),

    /// A receiver hook refused an incoming item.
    #[error("KV_ERR_407: Transfer rejected by receiver: {reason}")]
    TransferRejected { reason: String },

    // =================================================================
    // Router Errors (5xx)
    // =================================================================
    /// Payment collection or fee forwarding failed.
    #[error("KV_ERR_500: Payment failed: {reason}")]
    PaymentFailed { reason: String },

    /// Fee rate outside `[0, 1]`.
    #[error("KV_ERR_501: Invalid fee rate: {0}")]
    InvalidFeeRate(Decimal),

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// Value conservation invariant violated. Critical safety alert.
    #[error("KV_ERR_900: Invariant violation: {reason}")]
    InvariantViolation { reason: String },

    /// Configuration error (zero ratio, clashing addresses, etc.).
    #[error("KV_ERR_901: Configuration error: {0}")]
    Configuration(String),
}

impl KvaultError {
    /// Whether this error signals a bug rather than a user mistake.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::TransferIncomplete { .. } | Self::InvariantViolation { .. }
        )
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, KvaultError>;
