//! # kvault-core
//!
//! **Vault plane**: the item/fungible pool ledger and its floor-price engine.
//!
//! ## Architecture
//!
//! The [`Vault`] owns every piece of pool state and is bound for life to
//! one item registry and one balance ledger:
//! 1. **Inventory**: ordered index of held item ids (lowest id released first)
//! 2. **PricingEngine**: aggregate value accumulator, BOOTSTRAP → OPEN_MARKET
//!    transition, floor price formula
//! 3. **ConservationMonitor**: `items × ratio + fungible` checked after every call
//! 4. **ReentrancyGuard**: rejects nested calls into mutating entry points
//! 5. **EventLog**: sequenced, append-only record of committed mutations
//!
//! ## Call Discipline
//!
//! ```text
//! guard.enter() → checks → internal effects → verify conservation
//!     → external transfers (on failure: compensate + revert) → commit events
//! ```
//!
//! No internal borrow is held across an external call, so collaborators
//! re-entering the vault see fully-updated state and get `Reentrant` back
//! from any mutating entry point.

pub mod conservation;
pub mod event_log;
pub mod guard;
pub mod inventory;
pub mod pricing;
pub mod vault;

mod admin;
mod swap;

pub use conservation::ConservationMonitor;
pub use event_log::EventLog;
pub use guard::ReentrancyGuard;
pub use inventory::Inventory;
pub use pricing::PricingEngine;
pub use vault::Vault;
