//! Holder conversions between items and fungible units.
//!
//! ```text
//! deposit_item:      1 item   → ratio units        (vault pays out of its balance)
//! deposit_fungible:  n×ratio  → n items            (lowest held ids first)
//! ```
//!
//! Neither conversion changes the vault's total value.

use kvault_types::{Address, BalanceLedger, ItemId, ItemRegistry, KvaultError, Result, VaultEvent};

use crate::vault::{Vault, transfer_failed};

impl<R: ItemRegistry, L: BalanceLedger> Vault<R, L> {
    /// Swap one item the caller owns for `conversion_ratio` fungible units.
    ///
    /// Returns the amount paid out.
    ///
    /// # Errors
    /// In check order: `SwapDisabled`, `NotOwner`, `AlreadyHeld`,
    /// `InsufficientPoolBalance`; `TransferFailed` if either leg fails, in
    /// which case the item is returned and nothing changes.
    pub fn deposit_item(&self, caller: Address, item: ItemId) -> Result<u128> {
        let _token = self.guard.enter()?;
        let ratio = self.conversion_ratio;

        if !self.state().swap_enabled {
            return Err(KvaultError::SwapDisabled);
        }
        if self.registry.owner_of(item) != Some(caller) {
            return Err(KvaultError::NotOwner { item, caller });
        }
        {
            let state = self.state();
            if state.inventory.contains(item) {
                return Err(KvaultError::AlreadyHeld(item));
            }
            if state.fungible_balance < ratio {
                return Err(KvaultError::InsufficientPoolBalance {
                    needed: ratio,
                    available: state.fungible_balance,
                });
            }
        }

        {
            let mut state = self.state_mut();
            state.inventory.insert(item)?;
            state.fungible_balance -= ratio;
        }
        let revert = || {
            let mut state = self.state_mut();
            let _ = state.inventory.remove(item);
            state.fungible_balance += ratio;
        };
        if let Err(err) = self.verify_conservation() {
            revert();
            return Err(err);
        }

        if let Err(err) = self.registry.transfer(caller, self.address, item) {
            tracing::warn!(holder = %caller, item = %item, error = %err, "Item intake failed");
            revert();
            return Err(transfer_failed(&err));
        }
        if let Err(err) = self.ledger.transfer(caller, ratio) {
            tracing::warn!(holder = %caller, item = %item, error = %err, "Payout failed, returning item");
            let returned = self.compensate_item(self.address, caller, item);
            revert();
            if !returned {
                self.adopt_stranded(&[item]);
            }
            return Err(transfer_failed(&err));
        }

        tracing::info!(
            vault = %self.address,
            holder = %caller,
            item = %item,
            fungible_out = ratio,
            "Item deposited"
        );
        self.commit_with_price(vec![VaultEvent::ItemDeposited {
            holder: caller,
            item,
            fungible_out: ratio,
        }]);
        Ok(ratio)
    }

    /// Swap `amount` fungible units for `amount / ratio` items, lowest
    /// held ids first. The caller must have approved the vault for
    /// `amount` on the ledger.
    ///
    /// Returns the released ids in ascending order.
    ///
    /// # Errors
    /// In check order: `SwapDisabled`, `NoItemsAvailable`, `InvalidAmount`,
    /// `InsufficientInventory`. `TransferFailed` if the payment cannot be
    /// pulled. `TransferIncomplete` if an item transfer fails midway; the
    /// items already released are pulled back and the payment refunded.
    pub fn deposit_fungible(&self, caller: Address, amount: u128) -> Result<Vec<ItemId>> {
        let _token = self.guard.enter()?;
        let ratio = self.conversion_ratio;

        let count = {
            let state = self.state();
            if !state.swap_enabled {
                return Err(KvaultError::SwapDisabled);
            }
            if state.inventory.is_empty() {
                return Err(KvaultError::NoItemsAvailable);
            }
            if amount == 0 || amount % ratio != 0 {
                return Err(KvaultError::InvalidAmount { amount, ratio });
            }
            let requested = amount / ratio;
            let held = state.inventory.len();
            match usize::try_from(requested) {
                Ok(count) if count <= held => count,
                _ => return Err(KvaultError::InsufficientInventory { requested, held }),
            }
        };

        let released = {
            let mut state = self.state_mut();
            let balance = state.fungible_balance.checked_add(amount).ok_or(
                KvaultError::ArithmeticOverflow {
                    context: "vault fungible balance",
                },
            )?;
            let released = state.inventory.take_lowest(count)?;
            state.fungible_balance = balance;
            released
        };
        let revert = || {
            let mut state = self.state_mut();
            for id in &released {
                let _ = state.inventory.insert(*id);
            }
            state.fungible_balance -= amount;
        };
        if let Err(err) = self.verify_conservation() {
            revert();
            return Err(err);
        }

        if let Err(err) = self.ledger.transfer_from(caller, self.address, amount) {
            tracing::warn!(holder = %caller, amount, error = %err, "Payment pull failed");
            revert();
            return Err(transfer_failed(&err));
        }

        let mut delivered = 0;
        for id in &released {
            if let Err(err) = self.registry.transfer(self.address, caller, *id) {
                tracing::error!(
                    vault = %self.address,
                    holder = %caller,
                    item = %id,
                    delivered,
                    error = %err,
                    "Item release failed midway"
                );
                break;
            }
            delivered += 1;
            tracing::debug!(holder = %caller, item = %id, "Item released");
        }

        if delivered < released.len() {
            self.unwind_partial_release(caller, amount, &released[..delivered], &released);
            return Err(KvaultError::TransferIncomplete {
                requested: released.len(),
                released: delivered,
            });
        }

        tracing::info!(
            vault = %self.address,
            holder = %caller,
            amount,
            released = released.len(),
            "Fungible deposited"
        );
        self.commit_with_price(vec![VaultEvent::FungibleDeposited {
            holder: caller,
            amount,
            released: released.clone(),
        }]);
        Ok(released)
    }

    /// Undo a `deposit_fungible` whose item releases stopped midway.
    ///
    /// Normally every delivered item comes back and the payment is
    /// refunded, restoring the pre-call state exactly. If a compensating
    /// transfer itself fails, internal state is brought in line with what
    /// the collaborators actually hold and the difference is booked on the
    /// conservation monitor.
    fn unwind_partial_release(
        &self,
        caller: Address,
        amount: u128,
        delivered: &[ItemId],
        released: &[ItemId],
    ) {
        let mut lost_items: u128 = 0;
        for id in delivered.iter().rev() {
            if !self.compensate_item(caller, self.address, *id) {
                lost_items += 1;
            }
        }
        let refunded = match self.ledger.transfer(caller, amount) {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(
                    vault = %self.address,
                    holder = %caller,
                    amount,
                    error = %err,
                    "Refund failed"
                );
                false
            }
        };

        let mut state = self.state_mut();
        for id in released {
            if self.registry.owner_of(*id) == Some(self.address) {
                let _ = state.inventory.insert(*id);
            }
        }
        if refunded {
            state.fungible_balance -= amount;
        } else {
            // The vault kept the payment.
            let _ = state.conservation.record_inflow(amount);
        }
        if lost_items > 0 {
            let _ = state
                .conservation
                .record_outflow(lost_items.saturating_mul(self.conversion_ratio));
        }
    }
}
