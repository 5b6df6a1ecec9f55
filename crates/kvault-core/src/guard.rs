//! Reentrancy guard for the vault's mutating entry points.
//!
//! Every mutating entry point holds a [`GuardToken`] for its whole
//! duration. A collaborator that calls back into the vault while a
//! transfer is in flight hits [`KvaultError::Reentrant`] instead of
//! observing or mutating half-finished state. The token releases the
//! guard on drop, so early returns through `?` cannot leave it stuck.

use std::cell::Cell;

use kvault_types::{KvaultError, Result};

/// Single-flag guard: at most one mutating call in progress at a time.
#[derive(Debug, Default)]
pub struct ReentrancyGuard {
    entered: Cell<bool>,
}

impl ReentrancyGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enter the guarded section.
    ///
    /// # Errors
    /// Returns [`KvaultError::Reentrant`] if a guarded call is already running.
    pub fn enter(&self) -> Result<GuardToken<'_>> {
        if self.entered.replace(true) {
            tracing::warn!("Reentrant call rejected");
            return Err(KvaultError::Reentrant);
        }
        Ok(GuardToken { guard: self })
    }

    /// Whether a guarded call is currently running.
    #[must_use]
    pub fn is_entered(&self) -> bool {
        self.entered.get()
    }
}

/// Proof of entry; releases the guard when dropped.
#[must_use = "the guard is released as soon as the token is dropped"]
pub struct GuardToken<'a> {
    guard: &'a ReentrancyGuard,
}

impl Drop for GuardToken<'_> {
    fn drop(&mut self) {
        self.guard.entered.set(false);
    }
}
