//! Ledger projector: balances and running-balance ledgers.
//!
//! Everything here is a pure function of posted lines and opening balances,
//! so any view can be recomputed from scratch for any date.
//!
//! A balance as of `D` starts from the most recent set of opening balances
//! whose period starts on or before `D`, plus every posted line dated from
//! that period start through `D`. Opening sets are tenant-wide: an account
//! missing from the latest set opens at zero rather than at an older
//! period's figure. Lines of Voided entries are included together with
//! their posted mirror, which is dated on the same day and cancels them.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use kosh_shared::types::{AccountId, JournalEntryId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::LedgerError;
use crate::accounts::AccountClass;

/// A line of a Posted or Voided entry, as fed to the projector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostedLine {
    /// Entry the line belongs to.
    pub entry_id: JournalEntryId,
    /// Entry number, for display and ordering.
    pub entry_number: String,
    /// Entry date.
    pub entry_date: NaiveDate,
    /// Entry narration.
    pub narration: String,
    /// Origin of the entry (`donation`, `period_close`, ...).
    pub reference_type: String,
    /// Position within the entry.
    pub line_number: u32,
    /// Account posted to.
    pub account_id: AccountId,
    /// Debit amount or zero.
    pub debit: Decimal,
    /// Credit amount or zero.
    pub credit: Decimal,
}

/// An opening balance positioned at its period's start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceAnchor {
    /// Start date of the period the opening belongs to.
    pub period_start: NaiveDate,
    /// Opening balance in the account's natural sign.
    pub balance: Decimal,
}

/// Derived balance of one account as of a date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerBalance {
    /// The account.
    pub account_id: AccountId,
    /// Its class (decides the sign convention).
    pub class: AccountClass,
    /// Inclusive cut-off date.
    pub as_of_date: NaiveDate,
    /// Opening balance the computation started from.
    pub opening_balance: Decimal,
    /// Debits since the opening.
    pub period_debit_total: Decimal,
    /// Credits since the opening.
    pub period_credit_total: Decimal,
    /// `opening ± (debits − credits)` per natural sign.
    pub closing_balance: Decimal,
}

impl LedgerBalance {
    /// All debits including the opening's debit side.
    #[must_use]
    pub fn debit_total(&self) -> Decimal {
        self.class.to_sides(self.opening_balance).0 + self.period_debit_total
    }

    /// All credits including the opening's credit side.
    #[must_use]
    pub fn credit_total(&self) -> Decimal {
        self.class.to_sides(self.opening_balance).1 + self.period_credit_total
    }
}

/// One row of an account ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerRow {
    /// Entry date.
    pub entry_date: NaiveDate,
    /// Entry reference.
    pub entry_id: JournalEntryId,
    /// Entry number.
    pub entry_number: String,
    /// Entry narration.
    pub narration: String,
    /// Debit amount or zero.
    pub debit: Decimal,
    /// Credit amount or zero.
    pub credit: Decimal,
    /// Balance after this row.
    pub running_balance: Decimal,
}

/// Ordered ledger of one account over a date range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountLedger {
    /// The account.
    pub account_id: AccountId,
    /// First date included.
    pub from: NaiveDate,
    /// Last date included.
    pub to: NaiveDate,
    /// Balance before the first row.
    pub opening_balance: Decimal,
    /// Rows ordered by date, entry number and line.
    pub rows: Vec<LedgerRow>,
    /// Balance after the last row.
    pub closing_balance: Decimal,
}

/// Debit and credit activity of one account over a range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    /// Sum of debits.
    pub debit: Decimal,
    /// Sum of credits.
    pub credit: Decimal,
}

/// Stateless projector over posted lines.
pub struct Projector;

impl Projector {
    /// Gives every account in `accounts` one anchor per period start found
    /// anywhere in `anchors`, zero where the account has no opening there.
    ///
    /// Single-account projections must be fed aligned anchors; `balances`
    /// aligns on its own.
    #[must_use]
    pub fn align_anchors<I>(
        anchors: &HashMap<AccountId, Vec<BalanceAnchor>>,
        accounts: I,
    ) -> HashMap<AccountId, Vec<BalanceAnchor>>
    where
        I: IntoIterator<Item = AccountId>,
    {
        let starts: BTreeSet<NaiveDate> = anchors.values().flatten().map(|a| a.period_start).collect();
        accounts
            .into_iter()
            .map(|account_id| {
                let own = anchors.get(&account_id).map_or(&[][..], Vec::as_slice);
                let aligned = starts
                    .iter()
                    .map(|start| BalanceAnchor {
                        period_start: *start,
                        balance: own
                            .iter()
                            .filter(|a| a.period_start == *start)
                            .map(|a| a.balance)
                            .sum(),
                    })
                    .collect();
                (account_id, aligned)
            })
            .collect()
    }

    /// Latest anchor whose period starts on or before `as_of`.
    #[must_use]
    pub fn latest_anchor(anchors: &[BalanceAnchor], as_of: NaiveDate) -> Option<BalanceAnchor> {
        anchors
            .iter()
            .filter(|a| a.period_start <= as_of)
            .max_by_key(|a| a.period_start)
            .copied()
    }

    /// Balance of one account as of `as_of`.
    ///
    /// `lines` may contain other accounts' lines; they are ignored.
    #[must_use]
    pub fn balance(
        account_id: AccountId,
        class: AccountClass,
        anchors: &[BalanceAnchor],
        lines: &[PostedLine],
        as_of: NaiveDate,
    ) -> LedgerBalance {
        let anchor = Self::latest_anchor(anchors, as_of);
        let (opening_balance, since) = match anchor {
            Some(a) => (a.balance, Some(a.period_start)),
            None => (Decimal::ZERO, None),
        };

        let mut debit = Decimal::ZERO;
        let mut credit = Decimal::ZERO;
        for line in lines.iter().filter(|l| {
            l.account_id == account_id
                && l.entry_date <= as_of
                && since.is_none_or(|start| l.entry_date >= start)
        }) {
            debit += line.debit;
            credit += line.credit;
        }

        LedgerBalance {
            account_id,
            class,
            as_of_date: as_of,
            opening_balance,
            period_debit_total: debit,
            period_credit_total: credit,
            closing_balance: opening_balance + class.balance_change(debit, credit),
        }
    }

    /// Balances of many accounts as of `as_of`, in the order given.
    #[must_use]
    pub fn balances(
        accounts: &[(AccountId, AccountClass)],
        anchors: &HashMap<AccountId, Vec<BalanceAnchor>>,
        lines: &[PostedLine],
        as_of: NaiveDate,
    ) -> Vec<LedgerBalance> {
        let mut by_account: HashMap<AccountId, Vec<PostedLine>> = HashMap::new();
        for line in lines.iter().filter(|l| l.entry_date <= as_of) {
            by_account.entry(line.account_id).or_default().push(line.clone());
        }
        let anchors = Self::align_anchors(anchors, accounts.iter().map(|(id, _)| *id));

        accounts
            .iter()
            .map(|(account_id, class)| {
                let own_lines = by_account.get(account_id).map_or(&[][..], Vec::as_slice);
                let own_anchors = anchors.get(account_id).map_or(&[][..], Vec::as_slice);
                Self::balance(*account_id, *class, own_anchors, own_lines, as_of)
            })
            .collect()
    }

    /// Running-balance ledger of one account over `from..=to`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidDateRange` if `from` is after `to`.
    pub fn account_ledger(
        account_id: AccountId,
        class: AccountClass,
        anchors: &[BalanceAnchor],
        lines: &[PostedLine],
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<AccountLedger, LedgerError> {
        if from > to {
            return Err(LedgerError::InvalidDateRange { start: from, end: to });
        }

        let opening_balance = match Self::latest_anchor(anchors, from) {
            Some(anchor) if anchor.period_start == from => anchor.balance,
            _ => from.pred_opt().map_or(Decimal::ZERO, |day_before| {
                Self::balance(account_id, class, anchors, lines, day_before).closing_balance
            }),
        };

        let mut in_range: Vec<&PostedLine> = lines
            .iter()
            .filter(|l| l.account_id == account_id && l.entry_date >= from && l.entry_date <= to)
            .collect();
        in_range.sort_by(|a, b| {
            (a.entry_date, &a.entry_number, a.line_number)
                .cmp(&(b.entry_date, &b.entry_number, b.line_number))
        });

        // An opening attached to a period starting inside the range re-bases
        // the running balance on that day.
        let mut rebases: Vec<BalanceAnchor> = anchors
            .iter()
            .filter(|a| a.period_start > from && a.period_start <= to)
            .copied()
            .collect();
        rebases.sort_by_key(|a| a.period_start);
        let mut rebases = rebases.into_iter().peekable();

        let mut running = opening_balance;
        let mut rows = Vec::with_capacity(in_range.len());
        for line in in_range {
            while let Some(anchor) = rebases.next_if(|a| a.period_start <= line.entry_date) {
                running = anchor.balance;
            }
            running += class.balance_change(line.debit, line.credit);
            rows.push(LedgerRow {
                entry_date: line.entry_date,
                entry_id: line.entry_id,
                entry_number: line.entry_number.clone(),
                narration: line.narration.clone(),
                debit: line.debit,
                credit: line.credit,
                running_balance: running,
            });
        }

        let closing_balance = Self::balance(account_id, class, anchors, lines, to).closing_balance;

        Ok(AccountLedger {
            account_id,
            from,
            to,
            opening_balance,
            rows,
            closing_balance,
        })
    }

    /// Per-account debit/credit activity dated within `from..=to`.
    ///
    /// Unlike balances this is not cumulative: openings are ignored.
    #[must_use]
    pub fn activity(
        lines: &[PostedLine],
        from: NaiveDate,
        to: NaiveDate,
    ) -> HashMap<AccountId, Activity> {
        let mut activity: HashMap<AccountId, Activity> = HashMap::new();
        for line in lines.iter().filter(|l| l.entry_date >= from && l.entry_date <= to) {
            let entry = activity.entry(line.account_id).or_default();
            entry.debit += line.debit;
            entry.credit += line.credit;
        }
        activity
    }
}
