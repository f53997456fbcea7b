//! Common types used across the ledger.

pub mod id;
pub mod money;
pub mod pagination;

pub use id::*;
pub use money::{CURRENCY_SCALE, Currency, has_currency_precision};
pub use pagination::{MAX_PER_PAGE, PageRequest, PageResponse};
