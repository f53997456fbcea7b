//! Opening balances.
//!
//! An opening balance is attached to the start of a period. Exactly one side
//! is non-zero; a zero balance is represented by the absence of a record.

use kosh_shared::types::{AccountId, PeriodId, has_currency_precision};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::class::AccountClass;
use crate::ledger::LedgerError;

/// Opening balance of one account at the start of one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningBalance {
    /// Account the balance belongs to.
    pub account_id: AccountId,
    /// Period whose start the balance is attached to.
    pub period_id: PeriodId,
    /// Debit side.
    pub debit: Decimal,
    /// Credit side.
    pub credit: Decimal,
}

impl OpeningBalance {
    /// Validates a (debit, credit) pair and builds a record.
    ///
    /// Returns `Ok(None)` when both sides are zero.
    pub fn new(
        account_id: AccountId,
        period_id: PeriodId,
        debit: Decimal,
        credit: Decimal,
    ) -> Result<Option<Self>, LedgerError> {
        if debit.is_sign_negative() || credit.is_sign_negative() {
            return Err(LedgerError::InvalidOpeningBalance {
                account_id,
                reason: "amounts cannot be negative".to_string(),
            });
        }
        if !debit.is_zero() && !credit.is_zero() {
            return Err(LedgerError::InvalidOpeningBalance {
                account_id,
                reason: "only one of debit or credit may be non-zero".to_string(),
            });
        }
        if !has_currency_precision(debit) || !has_currency_precision(credit) {
            return Err(LedgerError::InvalidOpeningBalance {
                account_id,
                reason: "amounts carry more than two decimal places".to_string(),
            });
        }
        if debit.is_zero() && credit.is_zero() {
            return Ok(None);
        }
        Ok(Some(Self {
            account_id,
            period_id,
            debit,
            credit,
        }))
    }

    /// Builds the record for a natural-signed closing balance.
    ///
    /// Returns `None` for a zero balance.
    #[must_use]
    pub fn from_balance(
        account_id: AccountId,
        period_id: PeriodId,
        class: AccountClass,
        balance: Decimal,
    ) -> Option<Self> {
        if balance.is_zero() {
            return None;
        }
        let (debit, credit) = class.to_sides(balance);
        Some(Self {
            account_id,
            period_id,
            debit,
            credit,
        })
    }

    /// The balance in the account's natural sign.
    #[must_use]
    pub fn signed_balance(&self, class: AccountClass) -> Decimal {
        class.balance_change(self.debit, self.credit)
    }
}

/// Aggregate debit and credit of a set of opening balances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpeningTotals {
    /// Sum of debit sides.
    pub debit: Decimal,
    /// Sum of credit sides.
    pub credit: Decimal,
}

impl OpeningTotals {
    /// Sums a set of opening balances.
    #[must_use]
    pub fn of<'a>(balances: impl IntoIterator<Item = &'a OpeningBalance>) -> Self {
        balances.into_iter().fold(Self::default(), |acc, b| Self {
            debit: acc.debit + b.debit,
            credit: acc.credit + b.credit,
        })
    }

    /// Returns true if debits equal credits.
    #[must_use]
    pub fn is_balanced(&self) -> bool {
        self.debit == self.credit
    }

    /// Fails with `UnbalancedOpening` unless debits equal credits.
    pub fn ensure_balanced(&self) -> Result<(), LedgerError> {
        if self.is_balanced() {
            Ok(())
        } else {
            Err(LedgerError::UnbalancedOpening {
                debit: self.debit,
                credit: self.credit,
            })
        }
    }
}
