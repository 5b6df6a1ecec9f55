//! System-wide constants for the kvault pool.

/// Fungible units equivalent to one item unless configured otherwise.
pub const DEFAULT_CONVERSION_RATIO: u128 = 10_000;

/// Page size used by `held_items` when the caller asks for zero results.
pub const DEFAULT_HELD_ITEMS_PAGE: usize = 100;

/// Hard cap on the number of ids a single `held_items` query returns.
pub const MAX_HELD_ITEMS_PAGE: usize = 1_000;

/// Identifier assigned to the first issued item.
pub const FIRST_ITEM_ID: u64 = 1;

/// Default share of each mint payment forwarded to the treasury (5%).
/// Expressed as (mantissa, scale) for `Decimal::new`.
pub const DEFAULT_FEE_RATE_PARTS: (i64, u32) = (5, 2);

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name.
pub const ENGINE_NAME: &str = "kvault";
