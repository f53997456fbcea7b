//! Currency and amount precision.
//!
//! CRITICAL: Never use floating-point for money calculations.
//! Every amount in the ledger is a `rust_decimal::Decimal` carrying at most
//! [`CURRENCY_SCALE`] fractional digits.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Maximum number of fractional digits an amount may carry (paise, cents).
pub const CURRENCY_SCALE: u32 = 2;

/// Returns true if `amount` has no more than [`CURRENCY_SCALE`] significant
/// fractional digits. Trailing zeros do not count, so `10.500` is accepted.
#[must_use]
pub fn has_currency_precision(amount: Decimal) -> bool {
    amount.normalize().scale() <= CURRENCY_SCALE
}

/// ISO 4217 base currency of a deployment.
///
/// A deployment keeps its books in exactly one currency; no conversion
/// happens inside the ledger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Indian Rupee
    #[default]
    Inr,
    /// US Dollar
    Usd,
    /// Euro
    Eur,
    /// Singapore Dollar
    Sgd,
    /// Indonesian Rupiah
    Idr,
}

impl Currency {
    /// ISO 4217 code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Inr => "INR",
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Sgd => "SGD",
            Self::Idr => "IDR",
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

impl std::str::FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "INR" => Ok(Self::Inr),
            "USD" => Ok(Self::Usd),
            "EUR" => Ok(Self::Eur),
            "SGD" => Ok(Self::Sgd),
            "IDR" => Ok(Self::Idr),
            _ => Err(format!("Unknown currency: {s}")),
        }
    }
}
