//! Privileged entry points: preload, value reports, emergency withdrawals,
//! and role/toggle configuration.

use std::collections::BTreeSet;

use kvault_types::{Address, BalanceLedger, ItemId, ItemRegistry, KvaultError, Result, VaultEvent};

use crate::vault::{Vault, transfer_failed};

impl<R: ItemRegistry, L: BalanceLedger> Vault<R, L> {
    /// Seed the vault with items and fungible units without paying the
    /// caller anything. Raises the vault's expected value by
    /// `items.len() × ratio + fungible_amount`.
    ///
    /// Items move by registry transfer; fungible units are pulled with
    /// `transfer_from`, so the caller must have approved the vault.
    ///
    /// # Errors
    /// `NotAuthorized` unless the caller is the admin or router,
    /// `AlreadyHeld` for a duplicate or already-held id, `NotOwner` for an
    /// id the caller does not own, `TransferFailed` if a pull fails (every
    /// item already pulled is returned).
    pub fn preload(&self, caller: Address, items: &[ItemId], fungible_amount: u128) -> Result<()> {
        let _token = self.guard.enter()?;
        self.require_admin_or_router(caller, "preload")?;
        let ratio = self.conversion_ratio;

        {
            let state = self.state();
            let mut seen = BTreeSet::new();
            for id in items {
                if !seen.insert(*id) || state.inventory.contains(*id) {
                    return Err(KvaultError::AlreadyHeld(*id));
                }
            }
        }
        for id in items {
            if self.registry.owner_of(*id) != Some(caller) {
                return Err(KvaultError::NotOwner { item: *id, caller });
            }
        }
        let value = (items.len() as u128)
            .checked_mul(ratio)
            .and_then(|v| v.checked_add(fungible_amount))
            .ok_or(KvaultError::ArithmeticOverflow {
                context: "preload value",
            })?;

        {
            let mut state = self.state_mut();
            let balance = state.fungible_balance.checked_add(fungible_amount).ok_or(
                KvaultError::ArithmeticOverflow {
                    context: "vault fungible balance",
                },
            )?;
            state.conservation.record_inflow(value)?;
            for id in items {
                // Unique and not held: checked above.
                let _ = state.inventory.insert(*id);
            }
            state.fungible_balance = balance;
        }
        let revert = || {
            let mut state = self.state_mut();
            for id in items {
                let _ = state.inventory.remove(*id);
            }
            state.fungible_balance -= fungible_amount;
            state.conservation.revert_inflow(value);
        };
        if let Err(err) = self.verify_conservation() {
            revert();
            return Err(err);
        }

        for (pulled, id) in items.iter().enumerate() {
            if let Err(err) = self.registry.transfer(caller, self.address, *id) {
                tracing::warn!(by = %caller, item = %id, error = %err, "Preload item pull failed");
                self.return_preloaded(caller, &items[..pulled]);
                revert();
                self.adopt_stranded(&items[..pulled]);
                return Err(transfer_failed(&err));
            }
        }
        if fungible_amount > 0 {
            if let Err(err) = self
                .ledger
                .transfer_from(caller, self.address, fungible_amount)
            {
                tracing::warn!(by = %caller, amount = fungible_amount, error = %err, "Preload fungible pull failed");
                self.return_preloaded(caller, items);
                revert();
                self.adopt_stranded(items);
                return Err(transfer_failed(&err));
            }
        }

        tracing::info!(
            vault = %self.address,
            by = %caller,
            items = items.len(),
            fungible_amount,
            "Preloaded"
        );
        let mut events = vec![VaultEvent::Preloaded {
            by: caller,
            items: items.to_vec(),
            fungible_amount,
        }];
        self.evaluate_mode(&mut events);
        self.commit_with_price(events);
        Ok(())
    }

    /// Send already-pulled preload items back to `caller`, newest first.
    fn return_preloaded(&self, caller: Address, pulled: &[ItemId]) {
        for id in pulled.iter().rev() {
            self.compensate_item(self.address, caller, *id);
        }
    }

    /// Add net issuance proceeds to the aggregate value. Router only.
    ///
    /// # Errors
    /// `NotAuthorized` unless the caller is the router; `ArithmeticOverflow`
    /// if the accumulator would overflow.
    pub fn report_value(&self, caller: Address, amount: u128) -> Result<()> {
        let _token = self.guard.enter()?;
        self.validate_report(caller, amount)?;

        let aggregate_value = self.state_mut().pricing.accumulate(amount)?;
        tracing::info!(
            vault = %self.address,
            by = %caller,
            amount,
            aggregate_value,
            "Value reported"
        );

        let mut events = vec![VaultEvent::ValueReported {
            by: caller,
            amount,
            aggregate_value,
        }];
        self.evaluate_mode(&mut events);
        self.commit_with_price(events);
        Ok(())
    }

    /// Dry run of [`report_value`](Self::report_value): the same errors,
    /// no state change. Lets the router refuse a mint before taking
    /// payment.
    ///
    /// # Errors
    /// `Reentrant` while another entry point is running, otherwise as
    /// `report_value`.
    pub fn check_report_value(&self, caller: Address, amount: u128) -> Result<()> {
        if self.guard.is_entered() {
            return Err(KvaultError::Reentrant);
        }
        self.validate_report(caller, amount)
    }

    fn validate_report(&self, caller: Address, amount: u128) -> Result<()> {
        self.require_router(caller, "report value")?;
        if self
            .state()
            .pricing
            .aggregate_value()
            .checked_add(amount)
            .is_none()
        {
            return Err(KvaultError::ArithmeticOverflow {
                context: "aggregate value",
            });
        }
        Ok(())
    }

    /// Move fungible units out of the vault outside the swap protocol.
    /// Admin only. Lowers the expected value by `amount`.
    ///
    /// # Errors
    /// `NotAuthorized`, `InsufficientPoolBalance`, or `TransferFailed`.
    pub fn emergency_withdraw_fungible(
        &self,
        caller: Address,
        to: Address,
        amount: u128,
    ) -> Result<()> {
        let _token = self.guard.enter()?;
        self.require_admin(caller, "withdraw fungible")?;

        {
            let mut state = self.state_mut();
            if state.fungible_balance < amount {
                return Err(KvaultError::InsufficientPoolBalance {
                    needed: amount,
                    available: state.fungible_balance,
                });
            }
            state.conservation.record_outflow(amount)?;
            state.fungible_balance -= amount;
        }
        let revert = || {
            let mut state = self.state_mut();
            state.fungible_balance += amount;
            state.conservation.revert_outflow(amount);
        };
        if let Err(err) = self.verify_conservation() {
            revert();
            return Err(err);
        }

        if let Err(err) = self.ledger.transfer(to, amount) {
            revert();
            return Err(transfer_failed(&err));
        }

        tracing::warn!(vault = %self.address, by = %caller, to = %to, amount, "Emergency fungible withdrawal");
        self.commit_with_price(vec![VaultEvent::EmergencyFungibleWithdrawal { to, amount }]);
        Ok(())
    }

    /// Move one held item out of the vault outside the swap protocol.
    /// Admin only. Lowers the expected value by one ratio.
    ///
    /// # Errors
    /// `NotAuthorized`, `NotHeld`, or `TransferFailed`.
    pub fn emergency_withdraw_item(&self, caller: Address, to: Address, item: ItemId) -> Result<()> {
        let _token = self.guard.enter()?;
        self.require_admin(caller, "withdraw item")?;
        let ratio = self.conversion_ratio;

        {
            let mut state = self.state_mut();
            if !state.inventory.contains(item) {
                return Err(KvaultError::NotHeld(item));
            }
            state.conservation.record_outflow(ratio)?;
            state.inventory.remove(item)?;
        }
        let revert = || {
            let mut state = self.state_mut();
            let _ = state.inventory.insert(item);
            state.conservation.revert_outflow(ratio);
        };
        if let Err(err) = self.verify_conservation() {
            revert();
            return Err(err);
        }

        if let Err(err) = self.registry.transfer(self.address, to, item) {
            revert();
            return Err(transfer_failed(&err));
        }

        tracing::warn!(vault = %self.address, by = %caller, to = %to, item = %item, "Emergency item withdrawal");
        self.commit_with_price(vec![VaultEvent::EmergencyItemWithdrawal { to, item }]);
        Ok(())
    }

    /// Enable or disable holder swaps. Owner or admin.
    ///
    /// # Errors
    /// `NotAuthorized`.
    pub fn set_swap_enabled(&self, caller: Address, enabled: bool) -> Result<()> {
        let _token = self.guard.enter()?;
        self.require_owner_or_admin(caller, "toggle swaps")?;

        self.state_mut().swap_enabled = enabled;
        tracing::info!(vault = %self.address, by = %caller, enabled, "Swaps toggled");
        self.commit(vec![VaultEvent::SwapToggled { enabled }]);
        Ok(())
    }

    /// Hand the admin role to `new_admin`. Owner only.
    ///
    /// # Errors
    /// `NotAuthorized`; `Configuration` for the zero address or the vault
    /// itself.
    pub fn set_admin(&self, caller: Address, new_admin: Address) -> Result<()> {
        let _token = self.guard.enter()?;
        self.require_owner(caller, "set admin")?;
        if new_admin.is_zero() || new_admin == self.address {
            return Err(KvaultError::Configuration(format!(
                "{new_admin} cannot hold the admin role"
            )));
        }

        let previous = std::mem::replace(&mut self.state_mut().admin, new_admin);
        tracing::info!(vault = %self.address, previous = %previous, new = %new_admin, "Admin changed");
        self.commit(vec![VaultEvent::AdminChanged {
            previous,
            new: new_admin,
        }]);
        Ok(())
    }

    /// Set or clear the router role. Owner only.
    ///
    /// # Errors
    /// `NotAuthorized`; `Configuration` for the zero address or the vault
    /// itself.
    pub fn set_router(&self, caller: Address, router: Option<Address>) -> Result<()> {
        let _token = self.guard.enter()?;
        self.require_owner(caller, "set router")?;
        if let Some(addr) = router {
            if addr.is_zero() || addr == self.address {
                return Err(KvaultError::Configuration(format!(
                    "{addr} cannot hold the router role"
                )));
            }
        }

        let previous = std::mem::replace(&mut self.state_mut().router, router);
        tracing::info!(vault = %self.address, previous = ?previous, new = ?router, "Router changed");
        self.commit(vec![VaultEvent::RouterChanged {
            previous,
            new: router,
        }]);
        Ok(())
    }
}
