//! Configuration types for the vault and its issuance router.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{Address, KvaultError, Result, constants};

/// Construction-time configuration of a vault.
///
/// The conversion ratio and the vault address are fixed for the vault's
/// lifetime; the role addresses and the swap toggle are only the initial
/// values and change later through access-gated setters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultConfig {
    /// The vault's own account on the registry and the ledger.
    pub address: Address,
    /// Contract owner: manages the admin and router roles.
    pub owner: Address,
    /// Elevated operator: preload, emergency withdrawals, swap toggle.
    pub admin: Address,
    /// Issuance router allowed to report value and request preloads.
    pub router: Option<Address>,
    /// Fungible units equivalent to one item.
    pub conversion_ratio: u128,
    /// Whether holder swaps start enabled.
    pub swap_enabled: bool,
}

impl VaultConfig {
    /// Config with the default conversion ratio and swaps enabled.
    #[must_use]
    pub fn new(address: Address, owner: Address, admin: Address) -> Self {
        Self {
            address,
            owner,
            admin,
            router: None,
            conversion_ratio: constants::DEFAULT_CONVERSION_RATIO,
            swap_enabled: true,
        }
    }

    #[must_use]
    pub fn with_conversion_ratio(mut self, ratio: u128) -> Self {
        self.conversion_ratio = ratio;
        self
    }

    #[must_use]
    pub fn with_router(mut self, router: Address) -> Self {
        self.router = Some(router);
        self
    }

    #[must_use]
    pub fn with_swap_enabled(mut self, enabled: bool) -> Self {
        self.swap_enabled = enabled;
        self
    }

    /// Reject configurations the vault cannot operate under.
    ///
    /// # Errors
    /// Returns [`KvaultError::Configuration`] for a zero ratio, a zero vault
    /// address, or a vault address that doubles as the owner or admin.
    pub fn validate(&self) -> Result<()> {
        if self.conversion_ratio == 0 {
            return Err(KvaultError::Configuration(
                "conversion_ratio must be positive".to_string(),
            ));
        }
        if self.address.is_zero() {
            return Err(KvaultError::Configuration(
                "vault address must not be zero".to_string(),
            ));
        }
        if self.address == self.owner || self.address == self.admin {
            return Err(KvaultError::Configuration(format!(
                "vault address {} must differ from owner and admin",
                self.address
            )));
        }
        Ok(())
    }
}

/// A placeholder config for tests. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl VaultConfig {
    /// Labelled vault/owner/admin addresses with the default ratio.
    pub fn dummy() -> Self {
        Self::new(
            Address::from_label("vault"),
            Address::from_label("owner"),
            Address::from_label("admin"),
        )
    }
}

/// Configuration of the issuance/payment router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// The router's own account.
    pub address: Address,
    /// Receives the fee share of every mint payment.
    pub treasury: Address,
    /// Payment units charged per issued item.
    pub mint_price: u128,
    /// Share of the mint price forwarded to the treasury, in `[0, 1]`.
    pub fee_rate: Decimal,
}

impl RouterConfig {
    /// Config with the default 5% fee rate.
    #[must_use]
    pub fn new(address: Address, treasury: Address, mint_price: u128) -> Self {
        let (mantissa, scale) = constants::DEFAULT_FEE_RATE_PARTS;
        Self {
            address,
            treasury,
            mint_price,
            fee_rate: Decimal::new(mantissa, scale),
        }
    }

    #[must_use]
    pub fn with_fee_rate(mut self, fee_rate: Decimal) -> Self {
        self.fee_rate = fee_rate;
        self
    }

    /// # Errors
    /// Returns [`KvaultError::InvalidFeeRate`] if the fee rate is outside
    /// `[0, 1]`, or [`KvaultError::Configuration`] for a zero router address.
    pub fn validate(&self) -> Result<()> {
        if self.fee_rate < Decimal::ZERO || self.fee_rate > Decimal::ONE {
            return Err(KvaultError::InvalidFeeRate(self.fee_rate));
        }
        if self.address.is_zero() {
            return Err(KvaultError::Configuration(
                "router address must not be zero".to_string(),
            ));
        }
        Ok(())
    }
}
