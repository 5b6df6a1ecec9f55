//! # kvault-ledgers
//!
//! **Collaborator plane**: in-memory implementations of the two external
//! ledgers the vault is bound to.
//!
//! ## Architecture
//!
//! 1. **MemoryItemRegistry**: issues unique items up to a fixed maximum,
//!    tracks ownership, and runs receiver hooks after each transfer
//! 2. **MemoryBalanceLedger**: fungible balances with allowance accounting;
//!    [`LedgerAccount`] is the account-bound handle the vault and router hold
//!
//! Both use interior mutability and release every internal borrow before a
//! hook runs, so hooks may call back into the vault (or into the ledgers)
//! to exercise reentrancy and rollback paths.

pub mod balance_ledger;
pub mod item_registry;

pub use balance_ledger::{LedgerAccount, MemoryBalanceLedger};
pub use item_registry::{MemoryItemRegistry, TransferHook, TransferNotice};
