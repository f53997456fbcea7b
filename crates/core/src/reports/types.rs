//! Report data types.

use chrono::NaiveDate;
use kosh_shared::types::{AccountId, Currency};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::accounts::{Account, AccountClass, AccountCode};

/// The slice of an account a report shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportAccount {
    /// Account ID.
    pub account_id: AccountId,
    /// Account code.
    pub code: AccountCode,
    /// Account name.
    pub name: String,
    /// Account class.
    pub class: AccountClass,
}

impl From<&Account> for ReportAccount {
    fn from(account: &Account) -> Self {
        Self {
            account_id: account.id,
            code: account.code.clone(),
            name: account.name.clone(),
            class: account.class,
        }
    }
}

/// One account of a trial balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    /// The account.
    pub account: ReportAccount,
    /// Debits, including the opening's debit side.
    pub debit_total: Decimal,
    /// Credits, including the opening's credit side.
    pub credit_total: Decimal,
    /// Balance in the account's natural sign.
    pub balance: Decimal,
}

/// Trial balance totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalanceTotals {
    /// Total debit.
    pub total_debit: Decimal,
    /// Total credit.
    pub total_credit: Decimal,
    /// Whether debits equal credits.
    pub is_balanced: bool,
}

/// Trial balance report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialBalanceReport {
    /// As of date.
    pub as_of: NaiveDate,
    /// Reporting currency.
    pub currency: Currency,
    /// Rows ordered by account code.
    pub rows: Vec<TrialBalanceRow>,
    /// Totals.
    pub totals: TrialBalanceTotals,
}

/// An account and the amount it contributes to a section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportLine {
    /// The account.
    pub account: ReportAccount,
    /// Amount in the account's natural sign.
    pub amount: Decimal,
}

/// A titled group of report lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSection {
    /// Section total.
    pub total: Decimal,
    /// Lines ordered by account code.
    pub lines: Vec<ReportLine>,
}

impl ReportSection {
    pub(crate) fn push(&mut self, account: ReportAccount, amount: Decimal) {
        self.total += amount;
        self.lines.push(ReportLine { account, amount });
    }
}

/// Balance sheet report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSheetReport {
    /// As of date.
    pub as_of: NaiveDate,
    /// Reporting currency.
    pub currency: Currency,
    /// Assets section.
    pub assets: ReportSection,
    /// Liabilities section.
    pub liabilities: ReportSection,
    /// Equity accounts.
    pub equity: ReportSection,
    /// Income minus expense not yet transferred by a year-end close.
    pub current_surplus: Decimal,
    /// Total assets.
    pub total_assets: Decimal,
    /// Total liabilities.
    pub total_liabilities: Decimal,
    /// Equity accounts plus current surplus.
    pub total_equity: Decimal,
    /// Liabilities plus equity.
    pub liabilities_and_equity: Decimal,
    /// Whether assets equal liabilities plus equity.
    pub is_balanced: bool,
}

/// Profit and loss report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfitAndLossReport {
    /// First date included.
    pub from: NaiveDate,
    /// Last date included.
    pub to: NaiveDate,
    /// Reporting currency.
    pub currency: Currency,
    /// Income accounts.
    pub income: ReportSection,
    /// Expense accounts.
    pub expenses: ReportSection,
    /// Income minus expenses.
    pub net_surplus: Decimal,
}
