//! # kvault-router
//!
//! **Issuance plane**: the payment/minting router that feeds the vault.
//!
//! ## Architecture
//!
//! The [`IssuanceRouter`] sits between buyers and the vault:
//! 1. Pulls the mint price from the buyer's payment balance
//! 2. Issues one item to the buyer
//! 3. Forwards the fee share to the treasury ([`MintQuote`])
//! 4. Reports the net proceeds to the vault's aggregate value
//!
//! It also seeds vault liquidity on request, either from items and
//! kTokens it already holds or from freshly issued items.
//!
//! The vault is reached only through the [`PoolSink`](kvault_types::PoolSink)
//! capability, so this crate does not depend on `kvault-core`.

pub mod fees;
pub mod router;

pub use fees::MintQuote;
pub use router::IssuanceRouter;
