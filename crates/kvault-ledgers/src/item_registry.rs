//! In-memory unique-item registry.
//!
//! Issues items with ascending ids starting at [`constants::FIRST_ITEM_ID`]
//! up to a fixed maximum, and records the owner of each. A receiver may
//! install a [`TransferHook`] that runs after every item it receives; the
//! hook can re-enter other components or refuse the item, in which case the
//! transfer is undone and fails with `TransferRejected`.

use std::{
    cell::{Cell, RefCell},
    collections::{BTreeMap, HashMap},
    rc::Rc,
};

use kvault_types::{
    Address, ItemId, ItemIssuer, ItemRegistry, KvaultError, Result, constants,
};

/// Details of a completed ownership change, handed to receiver hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferNotice {
    pub item: ItemId,
    pub from: Address,
    pub to: Address,
}

/// Receiver callback. Returning `Err(reason)` refuses the item.
pub type TransferHook = Rc<dyn Fn(&TransferNotice) -> std::result::Result<(), String>>;

/// Fixed-capacity item registry with ownership tracking.
pub struct MemoryItemRegistry {
    /// Owner of every issued item.
    owners: RefCell<BTreeMap<ItemId, Address>>,
    /// Id the next `issue` will assign.
    next_id: Cell<ItemId>,
    /// Issuance cap.
    max_issuable: u64,
    /// Receiver hooks keyed by the receiving account.
    hooks: RefCell<HashMap<Address, TransferHook>>,
}

impl MemoryItemRegistry {
    /// Create an empty registry that will issue at most `max_issuable` items.
    #[must_use]
    pub fn new(max_issuable: u64) -> Self {
        Self {
            owners: RefCell::new(BTreeMap::new()),
            next_id: Cell::new(ItemId(constants::FIRST_ITEM_ID)),
            max_issuable,
            hooks: RefCell::new(HashMap::new()),
        }
    }

    /// Install (or replace) the receiver hook for `receiver`.
    pub fn set_hook<F>(&self, receiver: Address, hook: F)
    where
        F: Fn(&TransferNotice) -> std::result::Result<(), String> + 'static,
    {
        self.hooks.borrow_mut().insert(receiver, Rc::new(hook));
    }

    /// Remove the receiver hook for `receiver`, if any.
    pub fn clear_hook(&self, receiver: Address) {
        self.hooks.borrow_mut().remove(&receiver);
    }

    /// Number of items `owner` holds.
    #[must_use]
    pub fn balance_of(&self, owner: Address) -> usize {
        self.owners
            .borrow()
            .values()
            .filter(|o| **o == owner)
            .count()
    }

    /// Items held by `owner`, ascending.
    #[must_use]
    pub fn items_of(&self, owner: Address) -> Vec<ItemId> {
        self.owners
            .borrow()
            .iter()
            .filter(|(_, o)| **o == owner)
            .map(|(id, _)| *id)
            .collect()
    }

    fn hook_for(&self, receiver: Address) -> Option<TransferHook> {
        self.hooks.borrow().get(&receiver).cloned()
    }
}

impl ItemRegistry for MemoryItemRegistry {
    fn owner_of(&self, id: ItemId) -> Option<Address> {
        self.owners.borrow().get(&id).copied()
    }

    fn transfer(&self, from: Address, to: Address, id: ItemId) -> Result<()> {
        {
            let mut owners = self.owners.borrow_mut();
            let owner = owners.get_mut(&id).ok_or(KvaultError::UnknownItem(id))?;
            if *owner != from {
                return Err(KvaultError::NotOwner {
                    item: id,
                    caller: from,
                });
            }
            *owner = to;
        }

        // Borrow released: the hook may call back into this registry.
        if let Some(hook) = self.hook_for(to) {
            let notice = TransferNotice { item: id, from, to };
            if let Err(reason) = hook(&notice) {
                let mut owners = self.owners.borrow_mut();
                if let Some(owner) = owners.get_mut(&id) {
                    if *owner == to {
                        *owner = from;
                    }
                }
                tracing::debug!(item = %id, to = %to, %reason, "Receiver refused item");
                return Err(KvaultError::TransferRejected { reason });
            }
        }
        Ok(())
    }

    fn total_issued(&self) -> u64 {
        self.owners.borrow().len() as u64
    }

    fn max_issuable(&self) -> u64 {
        self.max_issuable
    }
}

impl ItemIssuer for MemoryItemRegistry {
    fn issue(&self, to: Address) -> Result<ItemId> {
        if self.total_issued() >= self.max_issuable {
            return Err(KvaultError::SupplyExhausted {
                max: self.max_issuable,
            });
        }
        let id = self.next_id.get();
        self.owners.borrow_mut().insert(id, to);
        self.next_id.set(id.next());
        Ok(id)
    }
}
