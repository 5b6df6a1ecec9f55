//! Ordered index of the items held by the vault.
//!
//! Uses a `BTreeSet<ItemId>` so that membership, insertion and removal are
//! O(log N) and the lowest held ids come out first without scanning the
//! registry's id space. The item count is the set's length, so it can never
//! drift from the membership set.

use std::collections::BTreeSet;
use std::ops::Bound;

use kvault_types::{ItemId, KvaultError, Result};
use sha2::{Digest, Sha256};

/// The set of item ids currently held by the vault.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    held: BTreeSet<ItemId>,
}

impl Inventory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.held.contains(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.held.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    /// Add an item.
    ///
    /// # Errors
    /// Returns `AlreadyHeld` if the id is already in the inventory.
    pub fn insert(&mut self, id: ItemId) -> Result<()> {
        if !self.held.insert(id) {
            return Err(KvaultError::AlreadyHeld(id));
        }
        Ok(())
    }

    /// Remove an item.
    ///
    /// # Errors
    /// Returns `NotHeld` if the id is not in the inventory.
    pub fn remove(&mut self, id: ItemId) -> Result<()> {
        if !self.held.remove(&id) {
            return Err(KvaultError::NotHeld(id));
        }
        Ok(())
    }

    /// Remove and return the `count` lowest ids, ascending.
    ///
    /// # Errors
    /// Returns `InsufficientInventory` (and removes nothing) if fewer than
    /// `count` items are held.
    pub fn take_lowest(&mut self, count: usize) -> Result<Vec<ItemId>> {
        if count > self.held.len() {
            return Err(KvaultError::InsufficientInventory {
                requested: count as u128,
                held: self.held.len(),
            });
        }
        let mut taken = Vec::with_capacity(count);
        for _ in 0..count {
            match self.held.pop_first() {
                Some(id) => taken.push(id),
                None => break,
            }
        }
        Ok(taken)
    }

    /// Up to `max` held ids, ascending.
    #[must_use]
    pub fn ascending(&self, max: usize) -> Vec<ItemId> {
        self.held.iter().take(max).copied().collect()
    }

    /// Up to `max` held ids strictly greater than `cursor`, ascending.
    #[must_use]
    pub fn ascending_after(&self, cursor: ItemId, max: usize) -> Vec<ItemId> {
        self.held
            .range((Bound::Excluded(cursor), Bound::Unbounded))
            .take(max)
            .copied()
            .collect()
    }

    /// SHA-256 commitment over the held ids in ascending order.
    ///
    /// Two inventories with the same membership always produce the same
    /// root, independent of the order items arrived in.
    #[must_use]
    pub fn root(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(b"kvault:inventory_root:v1:");
        hasher.update((self.held.len() as u64).to_le_bytes());
        for id in &self.held {
            hasher.update(id.0.to_le_bytes());
        }
        hasher.finalize().into()
    }
}
