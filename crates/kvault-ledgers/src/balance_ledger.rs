//! In-memory fungible balance ledger.
//!
//! Tracks per-account balances and per-(owner, spender) allowances. All
//! mutations are atomic: either the full transfer succeeds or balances and
//! allowances are unchanged. Callers act through [`LedgerAccount`], a handle
//! bound to one account, which is what the vault and router are given.

use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, HashSet},
    rc::Rc,
};

use kvault_types::{Address, BalanceLedger, KvaultError, Result};

/// Fungible balance ledger with allowance accounting.
pub struct MemoryBalanceLedger {
    /// Ticker, used only in log fields.
    symbol: String,
    /// Per-account balances.
    balances: RefCell<HashMap<Address, u128>>,
    /// `(owner, spender) -> remaining allowance`.
    allowances: RefCell<HashMap<(Address, Address), u128>>,
    /// Accounts every transfer refuses to touch.
    blocked: RefCell<HashSet<Address>>,
    /// Sum of all balances.
    total_supply: Cell<u128>,
}

impl MemoryBalanceLedger {
    /// Create a new empty ledger.
    #[must_use]
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            balances: RefCell::new(HashMap::new()),
            allowances: RefCell::new(HashMap::new()),
            blocked: RefCell::new(HashSet::new()),
            total_supply: Cell::new(0),
        }
    }

    /// Handle acting for `account`.
    #[must_use]
    pub fn account(self: &Rc<Self>, account: Address) -> LedgerAccount {
        LedgerAccount {
            ledger: Rc::clone(self),
            account,
        }
    }

    #[must_use]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Create new units in `to`'s balance.
    ///
    /// # Errors
    /// Returns `ArithmeticOverflow` if the total supply would overflow.
    pub fn mint(&self, to: Address, amount: u128) -> Result<()> {
        let supply = self
            .total_supply
            .get()
            .checked_add(amount)
            .ok_or(KvaultError::ArithmeticOverflow {
                context: "ledger mint",
            })?;
        *self.balances.borrow_mut().entry(to).or_insert(0) += amount;
        self.total_supply.set(supply);
        tracing::debug!(symbol = %self.symbol, to = %to, amount, "Minted");
        Ok(())
    }

    #[must_use]
    pub fn balance(&self, owner: Address) -> u128 {
        self.balances.borrow().get(&owner).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn allowance(&self, owner: Address, spender: Address) -> u128 {
        self.allowances
            .borrow()
            .get(&(owner, spender))
            .copied()
            .unwrap_or(0)
    }

    #[must_use]
    pub fn total_supply(&self) -> u128 {
        self.total_supply.get()
    }

    /// Make every transfer touching `account` fail with `AccountBlocked`.
    pub fn block_account(&self, account: Address) {
        self.blocked.borrow_mut().insert(account);
    }

    pub fn unblock_account(&self, account: Address) {
        self.blocked.borrow_mut().remove(&account);
    }

    fn check_not_blocked(&self, from: Address, to: Address) -> Result<()> {
        let blocked = self.blocked.borrow();
        for account in [from, to] {
            if blocked.contains(&account) {
                return Err(KvaultError::AccountBlocked(account));
            }
        }
        Ok(())
    }

    /// Move funds between two accounts. Nothing changes on failure.
    fn move_funds(&self, from: Address, to: Address, amount: u128) -> Result<()> {
        self.check_not_blocked(from, to)?;
        let mut balances = self.balances.borrow_mut();
        let available = balances.get(&from).copied().unwrap_or(0);
        if available < amount {
            return Err(KvaultError::InsufficientBalance {
                needed: amount,
                available,
            });
        }
        if from != to {
            balances.insert(from, available - amount);
            *balances.entry(to).or_insert(0) += amount;
        }
        Ok(())
    }

    fn spend_allowance(&self, owner: Address, spender: Address, amount: u128) -> Result<()> {
        let mut allowances = self.allowances.borrow_mut();
        let available = allowances.get(&(owner, spender)).copied().unwrap_or(0);
        if available < amount {
            return Err(KvaultError::InsufficientAllowance {
                needed: amount,
                available,
            });
        }
        allowances.insert((owner, spender), available - amount);
        Ok(())
    }

    fn restore_allowance(&self, owner: Address, spender: Address, amount: u128) {
        *self
            .allowances
            .borrow_mut()
            .entry((owner, spender))
            .or_insert(0) += amount;
    }
}

/// A [`MemoryBalanceLedger`] handle bound to one account.
#[derive(Clone)]
pub struct LedgerAccount {
    ledger: Rc<MemoryBalanceLedger>,
    account: Address,
}

impl LedgerAccount {
    /// The ledger behind this handle.
    #[must_use]
    pub fn ledger(&self) -> &Rc<MemoryBalanceLedger> {
        &self.ledger
    }
}

impl BalanceLedger for LedgerAccount {
    fn account(&self) -> Address {
        self.account
    }

    fn transfer(&self, to: Address, amount: u128) -> Result<()> {
        self.ledger.move_funds(self.account, to, amount)
    }

    fn transfer_from(&self, from: Address, to: Address, amount: u128) -> Result<()> {
        self.ledger.spend_allowance(from, self.account, amount)?;
        if let Err(err) = self.ledger.move_funds(from, to, amount) {
            self.ledger.restore_allowance(from, self.account, amount);
            return Err(err);
        }
        Ok(())
    }

    fn approve(&self, spender: Address, amount: u128) -> Result<()> {
        self.ledger
            .allowances
            .borrow_mut()
            .insert((self.account, spender), amount);
        Ok(())
    }

    fn balance_of(&self, owner: Address) -> u128 {
        self.ledger.balance(owner)
    }
}
