//! Mint price split between the treasury fee and the net proceeds
//! reported to the vault.
//!
//! ```text
//! fee = floor(price × fee_rate)
//! net = price − fee
//! ```

use kvault_types::{KvaultError, Result};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};

/// Breakdown of one mint payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintQuote {
    /// Payment units charged to the buyer.
    pub price: u128,
    /// Share forwarded to the treasury.
    pub fee: u128,
    /// Share reported to the vault.
    pub net: u128,
}

impl MintQuote {
    /// Split `price` at `fee_rate`.
    ///
    /// # Errors
    /// [`KvaultError::InvalidFeeRate`] if the rate is outside `[0, 1]`;
    /// `ArithmeticOverflow` if the price does not fit a `Decimal`.
    pub fn compute(price: u128, fee_rate: Decimal) -> Result<Self> {
        if fee_rate < Decimal::ZERO || fee_rate > Decimal::ONE {
            return Err(KvaultError::InvalidFeeRate(fee_rate));
        }
        let overflow = KvaultError::ArithmeticOverflow {
            context: "mint fee",
        };
        let fee = Decimal::from_u128(price)
            .and_then(|p| p.checked_mul(fee_rate))
            .and_then(|f| f.floor().to_u128())
            .ok_or(overflow)?;
        Ok(Self {
            price,
            fee,
            net: price - fee,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn five_percent_split() {
        let q = MintQuote::compute(1_000, Decimal::new(5, 2)).unwrap();
        assert_eq!(q.fee, 50);
        assert_eq!(q.net, 950);
        assert_eq!(q.fee + q.net, q.price);
    }

    #[test]
    fn fee_rounds_down() {
        let q = MintQuote::compute(999, Decimal::new(5, 2)).unwrap();
        // 49.95 → 49
        assert_eq!(q.fee, 49);
        assert_eq!(q.net, 950);
    }

    #[test]
    fn zero_and_full_rates() {
        let free = MintQuote::compute(1_000, Decimal::ZERO).unwrap();
        assert_eq!((free.fee, free.net), (0, 1_000));
        let all = MintQuote::compute(1_000, Decimal::ONE).unwrap();
        assert_eq!((all.fee, all.net), (1_000, 0));
    }

    #[test]
    fn out_of_range_rate_rejected() {
        assert!(matches!(
            MintQuote::compute(1_000, Decimal::new(101, 2)),
            Err(KvaultError::InvalidFeeRate(_))
        ));
        assert!(matches!(
            MintQuote::compute(1_000, Decimal::new(-1, 2)),
            Err(KvaultError::InvalidFeeRate(_))
        ));
    }

    #[test]
    fn oversized_price_reported_as_overflow() {
        let err = MintQuote::compute(u128::MAX, Decimal::new(5, 2)).unwrap_err();
        assert!(matches!(err, KvaultError::ArithmeticOverflow { .. }));
    }

    #[test]
    fn quote_serializes() {
        let q = MintQuote::compute(2_000, Decimal::new(5, 2)).unwrap();
        let json = serde_json::to_string(&q).unwrap();
        let back: MintQuote = serde_json::from_str(&json).unwrap();
        assert_eq!(back, q);
    }
}
