//! # kvault-types
//!
//! Shared types, errors, and configuration for the **kvault** item pool.
//!
//! This crate is the leaf dependency of the workspace: every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`Address`], [`ItemId`]
//! - **Pricing model**: [`MarketMode`], [`VaultStats`]
//! - **Events**: [`VaultEvent`], [`EventRecord`]
//! - **Configuration**: [`VaultConfig`], [`RouterConfig`]
//! - **Collaborator interfaces**: [`ItemRegistry`], [`ItemIssuer`], [`BalanceLedger`], [`PoolSink`]
//! - **Errors**: [`KvaultError`] with `KV_ERR_` prefix codes
//! - **Constants**: system-wide limits and defaults

pub mod config;
pub mod constants;
pub mod error;
pub mod event;
pub mod ids;
pub mod interfaces;
pub mod mode;

// Re-export all primary types at crate root for ergonomic imports:
//   use kvault_types::{Address, ItemId, KvaultError, VaultConfig, ...};

pub use config::*;
pub use error::*;
pub use event::*;
pub use ids::*;
pub use interfaces::*;
pub use mode::*;

// Constants are accessed via `kvault_types::constants::FOO`
// (not re-exported to avoid name collisions).
