//! Report generation service.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use kosh_shared::types::{AccountId, Currency};
use rust_decimal::Decimal;

use super::error::ReportError;
use super::types::{
    BalanceSheetReport, ProfitAndLossReport, ReportAccount, ReportSection, TrialBalanceReport,
    TrialBalanceRow, TrialBalanceTotals,
};
use crate::accounts::AccountClass;
use crate::ledger::{BalanceAnchor, LedgerBalance, PostedLine, Projector, reference_types};

/// Service for generating financial reports.
pub struct ReportService;

impl ReportService {
    /// Generates a trial balance as of `as_of`.
    ///
    /// Accounts with no opening and no activity are left out.
    ///
    /// # Errors
    ///
    /// `UnknownAccount` if a line references an account not in `accounts`.
    pub fn trial_balance(
        accounts: &[ReportAccount],
        anchors: &HashMap<AccountId, Vec<BalanceAnchor>>,
        lines: &[PostedLine],
        as_of: NaiveDate,
        currency: Currency,
    ) -> Result<TrialBalanceReport, ReportError> {
        let balances = Self::project(accounts, anchors, lines, as_of)?;

        let mut rows: Vec<TrialBalanceRow> = accounts
            .iter()
            .zip(balances)
            .filter(|(_, b)| !b.debit_total().is_zero() || !b.credit_total().is_zero())
            .map(|(account, b)| TrialBalanceRow {
                account: account.clone(),
                debit_total: b.debit_total(),
                credit_total: b.credit_total(),
                balance: b.closing_balance,
            })
            .collect();
        rows.sort_by(|a, b| a.account.code.cmp(&b.account.code));

        let total_debit: Decimal = rows.iter().map(|r| r.debit_total).sum();
        let total_credit: Decimal = rows.iter().map(|r| r.credit_total).sum();

        Ok(TrialBalanceReport {
            as_of,
            currency,
            rows,
            totals: TrialBalanceTotals {
                total_debit,
                total_credit,
                is_balanced: total_debit == total_credit,
            },
        })
    }

    /// Generates a balance sheet as of `as_of`.
    ///
    /// Income and expense not yet closed into a fund appear as
    /// `current_surplus` so the equation holds between year-end closes.
    ///
    /// # Errors
    ///
    /// `UnknownAccount` if a line references an account not in `accounts`.
    pub fn balance_sheet(
        accounts: &[ReportAccount],
        anchors: &HashMap<AccountId, Vec<BalanceAnchor>>,
        lines: &[PostedLine],
        as_of: NaiveDate,
        currency: Currency,
    ) -> Result<BalanceSheetReport, ReportError> {
        let balances = Self::project(accounts, anchors, lines, as_of)?;

        let mut assets = ReportSection::default();
        let mut liabilities = ReportSection::default();
        let mut equity = ReportSection::default();
        let mut current_surplus = Decimal::ZERO;

        for (account, balance) in Self::sorted(accounts, balances) {
            let amount = balance.closing_balance;
            match account.class {
                AccountClass::Income => current_surplus += amount,
                AccountClass::Expense => current_surplus -= amount,
                _ if amount.is_zero() => {}
                AccountClass::Asset => assets.push(account, amount),
                AccountClass::Liability => liabilities.push(account, amount),
                AccountClass::Equity => equity.push(account, amount),
            }
        }

        let total_assets = assets.total;
        let total_liabilities = liabilities.total;
        let total_equity = equity.total + current_surplus;
        let liabilities_and_equity = total_liabilities + total_equity;

        Ok(BalanceSheetReport {
            as_of,
            currency,
            assets,
            liabilities,
            equity,
            current_surplus,
            total_assets,
            total_liabilities,
            total_equity,
            liabilities_and_equity,
            is_balanced: total_assets == liabilities_and_equity,
        })
    }

    /// Generates a profit and loss statement over `from..=to`.
    ///
    /// Year-end surplus transfers are not income or expense and are skipped.
    ///
    /// # Errors
    ///
    /// `InvalidDateRange` if `from` is after `to`; `UnknownAccount` if a line
    /// references an account not in `accounts`.
    pub fn profit_and_loss(
        accounts: &[ReportAccount],
        lines: &[PostedLine],
        from: NaiveDate,
        to: NaiveDate,
        currency: Currency,
    ) -> Result<ProfitAndLossReport, ReportError> {
        if from > to {
            return Err(ReportError::InvalidDateRange { start: from, end: to });
        }
        Self::ensure_known(accounts, lines)?;

        let operating: Vec<PostedLine> = lines
            .iter()
            .filter(|l| l.reference_type != reference_types::PERIOD_CLOSE)
            .cloned()
            .collect();
        let activity = Projector::activity(&operating, from, to);

        let mut ordered: Vec<&ReportAccount> = accounts.iter().collect();
        ordered.sort_by(|a, b| a.code.cmp(&b.code));

        let mut income = ReportSection::default();
        let mut expenses = ReportSection::default();
        for account in ordered {
            let Some(activity) = activity.get(&account.account_id) else {
                continue;
            };
            let amount = account.class.balance_change(activity.debit, activity.credit);
            if amount.is_zero() {
                continue;
            }
            match account.class {
                AccountClass::Income => income.push(account.clone(), amount),
                AccountClass::Expense => expenses.push(account.clone(), amount),
                _ => {}
            }
        }

        let net_surplus = income.total - expenses.total;
        Ok(ProfitAndLossReport {
            from,
            to,
            currency,
            income,
            expenses,
            net_surplus,
        })
    }

    fn project(
        accounts: &[ReportAccount],
        anchors: &HashMap<AccountId, Vec<BalanceAnchor>>,
        lines: &[PostedLine],
        as_of: NaiveDate,
    ) -> Result<Vec<LedgerBalance>, ReportError> {
        Self::ensure_known(accounts, lines)?;
        let keys: Vec<(AccountId, AccountClass)> =
            accounts.iter().map(|a| (a.account_id, a.class)).collect();
        Ok(Projector::balances(&keys, anchors, lines, as_of))
    }

    fn ensure_known(accounts: &[ReportAccount], lines: &[PostedLine]) -> Result<(), ReportError> {
        let known: HashSet<AccountId> = accounts.iter().map(|a| a.account_id).collect();
        match lines.iter().find(|l| !known.contains(&l.account_id)) {
            Some(line) => Err(ReportError::UnknownAccount(line.account_id)),
            None => Ok(()),
        }
    }

    fn sorted(
        accounts: &[ReportAccount],
        balances: Vec<LedgerBalance>,
    ) -> Vec<(ReportAccount, LedgerBalance)> {
        let mut pairs: Vec<(ReportAccount, LedgerBalance)> =
            accounts.iter().cloned().zip(balances).collect();
        pairs.sort_by(|a, b| a.0.code.cmp(&b.0.code));
        pairs
    }
}
