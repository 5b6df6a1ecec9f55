//! Narrow capability interfaces between the vault and its collaborators.
//!
//! The vault is bound at construction to one [`ItemRegistry`] and one
//! [`BalanceLedger`] handle and never swaps them. The router reaches the
//! vault only through [`PoolSink`].
//!
//! All methods take `&self`: execution is single-threaded and serialized,
//! and implementations use interior mutability so a collaborator may call
//! back into the vault while a transfer is in flight. That callback is
//! exactly the reentrancy the vault has to reject.

use std::rc::Rc;

use crate::{Address, ItemId, Result};

/// Read and transfer access to the unique-item registry.
pub trait ItemRegistry {
    /// Current owner of `id`, or `None` if it was never issued.
    fn owner_of(&self, id: ItemId) -> Option<Address>;

    /// Move `id` from `from` to `to`. Fails unless `from` owns `id`.
    fn transfer(&self, from: Address, to: Address, id: ItemId) -> Result<()>;

    /// Number of items issued so far.
    fn total_issued(&self) -> u64;

    /// Maximum number of items the registry will ever issue.
    fn max_issuable(&self) -> u64;
}

/// Issuance capability, held by the router only.
pub trait ItemIssuer: ItemRegistry {
    /// Issue the next item to `to`.
    fn issue(&self, to: Address) -> Result<ItemId>;
}

/// Fungible ledger handle bound to one account (the capability holder).
pub trait BalanceLedger {
    /// The account this handle acts for.
    fn account(&self) -> Address;

    /// Move `amount` from the bound account to `to`.
    fn transfer(&self, to: Address, amount: u128) -> Result<()>;

    /// Move `amount` from `from` to `to`, spending the allowance `from`
    /// granted to the bound account.
    fn transfer_from(&self, from: Address, to: Address, amount: u128) -> Result<()>;

    /// Allow `spender` to move up to `amount` out of the bound account.
    fn approve(&self, spender: Address, amount: u128) -> Result<()>;

    fn balance_of(&self, owner: Address) -> u128;
}

/// What the issuance router may do to the pool.
pub trait PoolSink {
    /// The pool's own account (target of approvals).
    fn pool_address(&self) -> Address;

    /// Fail exactly as `report_value(caller, amount)` would right now,
    /// without changing anything.
    fn check_report(&self, caller: Address, amount: u128) -> Result<()>;

    /// Add net issuance proceeds to the aggregate value accumulator.
    fn report_value(&self, caller: Address, amount: u128) -> Result<()>;

    /// Seed items and fungible units without a counterparty payout.
    fn preload(&self, caller: Address, items: &[ItemId], fungible_amount: u128) -> Result<()>;
}

// ---------------------------------------------------------------------------
// Shared-handle forwarding
// ---------------------------------------------------------------------------

impl<T: ItemRegistry + ?Sized> ItemRegistry for Rc<T> {
    fn owner_of(&self, id: ItemId) -> Option<Address> {
        (**self).owner_of(id)
    }
    fn transfer(&self, from: Address, to: Address, id: ItemId) -> Result<()> {
        (**self).transfer(from, to, id)
    }
    fn total_issued(&self) -> u64 {
        (**self).total_issued()
    }
    fn max_issuable(&self) -> u64 {
        (**self).max_issuable()
    }
}

impl<T: ItemIssuer + ?Sized> ItemIssuer for Rc<T> {
    fn issue(&self, to: Address) -> Result<ItemId> {
        (**self).issue(to)
    }
}

impl<T: BalanceLedger + ?Sized> BalanceLedger for Rc<T> {
    fn account(&self) -> Address {
        (**self).account()
    }
    fn transfer(&self, to: Address, amount: u128) -> Result<()> {
        (**self).transfer(to, amount)
    }
    fn transfer_from(&self, from: Address, to: Address, amount: u128) -> Result<()> {
        (**self).transfer_from(from, to, amount)
    }
    fn approve(&self, spender: Address, amount: u128) -> Result<()> {
        (**self).approve(spender, amount)
    }
    fn balance_of(&self, owner: Address) -> u128 {
        (**self).balance_of(owner)
    }
}

impl<T: PoolSink + ?Sized> PoolSink for Rc<T> {
    fn pool_address(&self) -> Address {
        (**self).pool_address()
    }
    fn check_report(&self, caller: Address, amount: u128) -> Result<()> {
        (**self).check_report(caller, amount)
    }
    fn report_value(&self, caller: Address, amount: u128) -> Result<()> {
        (**self).report_value(caller, amount)
    }
    fn preload(&self, caller: Address, items: &[ItemId], fungible_amount: u128) -> Result<()> {
        (**self).preload(caller, items, fungible_amount)
    }
}

impl<T: ItemRegistry + ?Sized> ItemRegistry for &T {
    fn owner_of(&self, id: ItemId) -> Option<Address> {
        (**self).owner_of(id)
    }
    fn transfer(&self, from: Address, to: Address, id: ItemId) -> Result<()> {
        (**self).transfer(from, to, id)
    }
    fn total_issued(&self) -> u64 {
        (**self).total_issued()
    }
    fn max_issuable(&self) -> u64 {
        (**self).max_issuable()
    }
}

impl<T: BalanceLedger + ?Sized> BalanceLedger for &T {
    fn account(&self) -> Address {
        (**self).account()
    }
    fn transfer(&self, to: Address, amount: u128) -> Result<()> {
        (**self).transfer(to, amount)
    }
    fn transfer_from(&self, from: Address, to: Address, amount: u128) -> Result<()> {
        (**self).transfer_from(from, to, amount)
    }
    fn approve(&self, spender: Address, amount: u128) -> Result<()> {
        (**self).approve(spender, amount)
    }
    fn balance_of(&self, owner: Address) -> u128 {
        (**self).balance_of(owner)
    }
}
