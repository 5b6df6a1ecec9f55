//! Identifiers used throughout kvault.
//!
//! Accounts are 20-byte addresses; items are plain integers issued in
//! ascending order by the item registry, which gives the vault a natural
//! total order for deterministic release.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// Address
// ---------------------------------------------------------------------------

/// A 20-byte account identifier (holders, admin, router, the vault itself).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The all-zero address. Never a valid vault address.
    pub const ZERO: Self = Self([0u8; 20]);

    #[must_use]
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Deterministic address derived from a human-readable label.
    ///
    /// The same label always yields the same address, so configs and
    /// fixtures can name accounts (`"treasury"`, `"alice"`) instead of
    /// spelling out raw bytes.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"kvault:address:v1:");
        hasher.update(label.as_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&hash[..20]);
        Self(bytes)
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    #[must_use]
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// First four bytes as hex, for compact log fields.
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..4])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

// ---------------------------------------------------------------------------
// ItemId
// ---------------------------------------------------------------------------

/// Identifier of a unique, non-divisible item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ItemId(pub u64);

impl ItemId {
    #[must_use]
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }

    #[must_use]
    pub fn value(self) -> u64 {
        self.0
    }
}

impl From<u64> for ItemId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
