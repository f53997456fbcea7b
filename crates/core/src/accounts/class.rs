//! Account classes and sign conventions.
//!
//! - Asset/Expense: balance += debit - credit (debit-normal)
//! - Liability/Equity/Income: balance += credit - debit (credit-normal)

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Top-level classification of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountClass {
    /// Things the institution owns (cash, bank, hundi, fixed assets).
    Asset,
    /// Amounts owed (advances received, payables).
    Liability,
    /// Funds and accumulated surplus.
    Equity,
    /// Donations, seva receipts, interest.
    Income,
    /// Salaries, pooja materials, utilities.
    Expense,
}

/// The side on which an account's balance grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalSide {
    /// Debits increase the balance.
    Debit,
    /// Credits increase the balance.
    Credit,
}

impl AccountClass {
    /// All classes in chart order.
    pub const ALL: [Self; 5] = [
        Self::Asset,
        Self::Liability,
        Self::Equity,
        Self::Income,
        Self::Expense,
    ];

    /// Natural side of the class.
    #[must_use]
    pub const fn normal_side(self) -> NormalSide {
        match self {
            Self::Asset | Self::Expense => NormalSide::Debit,
            Self::Liability | Self::Equity | Self::Income => NormalSide::Credit,
        }
    }

    /// Returns true for Asset and Expense.
    #[must_use]
    pub const fn is_debit_normal(self) -> bool {
        matches!(self.normal_side(), NormalSide::Debit)
    }

    /// Returns true for classes carried on the balance sheet.
    #[must_use]
    pub const fn is_balance_sheet(self) -> bool {
        matches!(self, Self::Asset | Self::Liability | Self::Equity)
    }

    /// Balance effect of a debit/credit pair under this class's sign convention.
    #[must_use]
    pub fn balance_change(self, debit: Decimal, credit: Decimal) -> Decimal {
        match self.normal_side() {
            NormalSide::Debit => debit - credit,
            NormalSide::Credit => credit - debit,
        }
    }

    /// Splits a natural-signed balance back into a (debit, credit) pair.
    ///
    /// Exactly one side is non-zero unless the balance is zero.
    #[must_use]
    pub fn to_sides(self, balance: Decimal) -> (Decimal, Decimal) {
        let magnitude = balance.abs();
        let on_natural_side = !balance.is_sign_negative();
        match (self.normal_side(), on_natural_side) {
            (NormalSide::Debit, true) | (NormalSide::Credit, false) => (magnitude, Decimal::ZERO),
            (NormalSide::Debit, false) | (NormalSide::Credit, true) => (Decimal::ZERO, magnitude),
        }
    }

    /// Leading digit every code of this class starts with.
    #[must_use]
    pub const fn code_prefix(self) -> char {
        match self {
            Self::Asset => '1',
            Self::Liability => '2',
            Self::Equity => '3',
            Self::Income => '4',
            Self::Expense => '5',
        }
    }

    /// Class implied by a code's leading digit.
    #[must_use]
    pub const fn from_code_prefix(prefix: char) -> Option<Self> {
        match prefix {
            '1' => Some(Self::Asset),
            '2' => Some(Self::Liability),
            '3' => Some(Self::Equity),
            '4' => Some(Self::Income),
            '5' => Some(Self::Expense),
            _ => None,
        }
    }

    /// Lowercase name, as stored.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Liability => "liability",
            Self::Equity => "equity",
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl std::fmt::Display for AccountClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccountClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asset" => Ok(Self::Asset),
            "liability" => Ok(Self::Liability),
            "equity" => Ok(Self::Equity),
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            _ => Err(format!("Unknown account class: {s}")),
        }
    }
}
