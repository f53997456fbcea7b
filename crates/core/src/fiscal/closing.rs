//! Period closing: checklist, surplus transfer and carry-forward.
//!
//! `kosh-db` runs the steps inside one transaction:
//! 1. `validate_start_closing` and flip the period to Closing
//! 2. `run_checklist` over earlier periods, drafts, balances and openings
//! 3. `plan` the surplus transfer and next-period openings
//! 4. `next_period` to find or describe the period receiving the openings

use std::fmt;

use chrono::NaiveDate;
use kosh_shared::types::{AccountId, JournalEntryId, PeriodId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::period::{FinancialPeriod, PeriodStatus, PeriodType, validate_new_period};
use crate::accounts::{AccountClass, OpeningBalance, OpeningTotals};
use crate::ledger::{JournalLineInput, LedgerBalance, LedgerError};

/// A condition blocking a period from closing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChecklistItem {
    /// Drafts dated inside the period are still unposted.
    UnpostedDrafts {
        /// Number of drafts.
        count: usize,
        /// Their entry numbers.
        entry_numbers: Vec<String>,
    },
    /// Debit-side and credit-side balances do not net to zero.
    TrialBalanceMismatch {
        /// Sum of debit-side balances.
        debit: Decimal,
        /// Sum of credit-side balances.
        credit: Decimal,
    },
    /// The period's opening balances do not balance.
    UnbalancedOpening {
        /// Aggregate opening debit.
        debit: Decimal,
        /// Aggregate opening credit.
        credit: Decimal,
    },
    /// An earlier period still accepts postings, which would change the
    /// balances carried forward from this one.
    EarlierPeriodOpen {
        /// The earlier period.
        period_id: PeriodId,
        /// Its name.
        name: String,
        /// Open or Closing.
        status: PeriodStatus,
    },
}

impl fmt::Display for ChecklistItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnpostedDrafts { count, .. } => write!(f, "{count} draft entries are unposted"),
            Self::TrialBalanceMismatch { debit, credit } => {
                write!(f, "trial balance does not net to zero ({debit} vs {credit})")
            }
            Self::UnbalancedOpening { debit, credit } => {
                write!(f, "opening balances are unbalanced ({debit} vs {credit})")
            }
            Self::EarlierPeriodOpen { name, status, .. } => {
                write!(f, "earlier period {name} is still {}", status.as_str())
            }
        }
    }
}

/// Result of `start_closing` and `run_closing_checklist`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChecklistStatus {
    /// The period being closed.
    pub period_id: PeriodId,
    /// Its status after the call.
    pub status: PeriodStatus,
    /// Blocking items, empty when the period can close.
    pub items: Vec<ChecklistItem>,
}

impl ChecklistStatus {
    /// Returns true if nothing blocks closing.
    #[must_use]
    pub fn is_clear(&self) -> bool {
        self.items.is_empty()
    }
}

/// What closing a period will write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClosingPlan {
    /// Balances as of the period end, before the surplus transfer.
    pub closing_balances: Vec<LedgerBalance>,
    /// Lines of the surplus-transfer entry; empty when none is needed.
    pub surplus_lines: Vec<JournalLineInput>,
    /// Income minus expense for the period's fiscal year.
    pub net_surplus: Decimal,
    /// Opening balances for the next period.
    pub openings: Vec<OpeningBalance>,
}

/// Outcome of a completed close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClosingSummary {
    /// The closed period.
    pub period_id: PeriodId,
    /// The period holding the carried-forward openings.
    pub next_period_id: PeriodId,
    /// Balances as of the period end, before the surplus transfer.
    pub closing_balances: Vec<LedgerBalance>,
    /// Surplus-transfer entry, for year-end closes with income or expense.
    pub surplus_entry_id: Option<JournalEntryId>,
    /// Net surplus transferred.
    pub net_surplus: Decimal,
    /// Number of opening balance records written.
    pub openings_carried: usize,
}

/// The period that receives carried-forward openings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPeriod {
    /// An Open period already starts the day after.
    Existing(PeriodId),
    /// No such period; create it.
    Create {
        /// Generated name.
        name: String,
        /// Day after the closed period's end.
        start_date: NaiveDate,
        /// Same length as the closed period.
        end_date: NaiveDate,
        /// Same type as the closed period.
        period_type: PeriodType,
    },
}

/// Stateless service for closing periods.
pub struct ClosingService;

impl ClosingService {
    /// Requires an Open period.
    pub fn validate_start_closing(period: &FinancialPeriod) -> Result<(), LedgerError> {
        if period.status.can_transition_to(PeriodStatus::Closing) {
            Ok(())
        } else {
            Err(LedgerError::InvalidPeriodTransition {
                period_id: period.id,
                from: period.status,
                to: PeriodStatus::Closing,
            })
        }
    }

    /// Requires a Closing period with a clear checklist.
    pub fn validate_close(
        period: &FinancialPeriod,
        items: Vec<ChecklistItem>,
    ) -> Result<(), LedgerError> {
        if !period.status.can_transition_to(PeriodStatus::Closed) {
            return Err(LedgerError::InvalidPeriodTransition {
                period_id: period.id,
                from: period.status,
                to: PeriodStatus::Closed,
            });
        }
        if !items.is_empty() {
            return Err(LedgerError::ChecklistIncomplete(items));
        }
        Ok(())
    }

    /// Collects the items blocking a close.
    ///
    /// `periods` are all of the tenant's periods, `balances` the tenant's
    /// balances as of the period end and `openings` the opening totals
    /// attached to the period's start. Periods close in date order: an
    /// earlier period that is not Closed blocks the close.
    #[must_use]
    pub fn run_checklist(
        period: &FinancialPeriod,
        periods: &[FinancialPeriod],
        draft_numbers: &[String],
        balances: &[LedgerBalance],
        openings: OpeningTotals,
    ) -> Vec<ChecklistItem> {
        let mut earlier: Vec<&FinancialPeriod> = periods
            .iter()
            .filter(|p| p.end_date < period.start_date && p.status != PeriodStatus::Closed)
            .collect();
        earlier.sort_by_key(|p| p.start_date);
        let mut items: Vec<ChecklistItem> = earlier
            .into_iter()
            .map(|p| ChecklistItem::EarlierPeriodOpen {
                period_id: p.id,
                name: p.name.clone(),
                status: p.status,
            })
            .collect();

        if !draft_numbers.is_empty() {
            items.push(ChecklistItem::UnpostedDrafts {
                count: draft_numbers.len(),
                entry_numbers: draft_numbers.to_vec(),
            });
        }

        let (debit, credit) = Self::trial_totals(balances);
        if debit != credit {
            items.push(ChecklistItem::TrialBalanceMismatch { debit, credit });
        }

        if !openings.is_balanced() {
            items.push(ChecklistItem::UnbalancedOpening {
                debit: openings.debit,
                credit: openings.credit,
            });
        }

        items
    }

    /// Sum of debit-side and credit-side closing balances.
    #[must_use]
    pub fn trial_totals(balances: &[LedgerBalance]) -> (Decimal, Decimal) {
        balances.iter().fold((Decimal::ZERO, Decimal::ZERO), |(d, c), b| {
            let (debit, credit) = b.class.to_sides(b.closing_balance);
            (d + debit, c + credit)
        })
    }

    /// Plans the surplus transfer and the next period's openings.
    ///
    /// On a year-end close every Income and Expense balance is moved into
    /// `surplus_account`; otherwise balances carry forward unchanged.
    ///
    /// # Errors
    ///
    /// `Validation` if `surplus_account` is not an Equity account.
    pub fn plan(
        next_period_id: PeriodId,
        balances: Vec<LedgerBalance>,
        surplus_account: (AccountId, AccountClass),
        year_end: bool,
    ) -> Result<ClosingPlan, LedgerError> {
        let (surplus_id, surplus_class) = surplus_account;
        if surplus_class != AccountClass::Equity {
            return Err(LedgerError::Validation(format!(
                "surplus account {surplus_id} must be an equity account, got {surplus_class}"
            )));
        }

        let mut net_surplus = Decimal::ZERO;
        let mut surplus_lines = Vec::new();
        let mut carried: Vec<(AccountId, AccountClass, Decimal)> = Vec::with_capacity(balances.len() + 1);

        for balance in &balances {
            let is_result = matches!(balance.class, AccountClass::Income | AccountClass::Expense);
            if year_end && is_result {
                match balance.class {
                    AccountClass::Income => net_surplus += balance.closing_balance,
                    _ => net_surplus -= balance.closing_balance,
                }
                if let Some(line) = Self::zeroing_line(balance) {
                    surplus_lines.push(line);
                }
            } else {
                carried.push((balance.account_id, balance.class, balance.closing_balance));
            }
        }

        if !surplus_lines.is_empty() {
            if !net_surplus.is_zero() {
                let line = if net_surplus.is_sign_positive() {
                    JournalLineInput::credit(surplus_id, net_surplus)
                } else {
                    JournalLineInput::debit(surplus_id, -net_surplus)
                };
                surplus_lines.push(line.with_memo("Net surplus for the year"));
            }

            match carried.iter_mut().find(|(id, _, _)| *id == surplus_id) {
                Some((_, _, amount)) => *amount += net_surplus,
                None => carried.push((surplus_id, surplus_class, net_surplus)),
            }
        }

        let openings = carried
            .into_iter()
            .filter_map(|(account_id, class, amount)| {
                OpeningBalance::from_balance(account_id, next_period_id, class, amount)
            })
            .collect();

        Ok(ClosingPlan {
            closing_balances: balances,
            surplus_lines,
            net_surplus,
            openings,
        })
    }

    /// Finds the period starting the day after `period`, or describes it.
    ///
    /// # Errors
    ///
    /// `PeriodNotOpen` if that period exists and is already Closed;
    /// `OverlappingPeriod` if a new one would collide with another period.
    ///
    /// A following period that is Closing still takes the carried openings,
    /// its own close re-runs the checklist against them.
    pub fn next_period(
        period: &FinancialPeriod,
        existing: &[FinancialPeriod],
    ) -> Result<NextPeriod, LedgerError> {
        let Some((start_date, end_date)) = period.next_range() else {
            return Err(LedgerError::Internal(format!(
                "no date follows period {}",
                period.id
            )));
        };

        if let Some(next) = existing.iter().find(|p| p.start_date == start_date) {
            if next.status == PeriodStatus::Closed {
                return Err(LedgerError::PeriodNotOpen {
                    period_id: next.id,
                    status: next.status,
                });
            }
            return Ok(NextPeriod::Existing(next.id));
        }

        validate_new_period(start_date, end_date, existing)?;
        Ok(NextPeriod::Create {
            name: FinancialPeriod::name_for(period.period_type, start_date),
            start_date,
            end_date,
            period_type: period.period_type,
        })
    }

    /// Narration of the surplus-transfer entry.
    #[must_use]
    pub fn surplus_narration(period: &FinancialPeriod) -> String {
        format!("Transfer of net surplus for {}", period.name)
    }

    fn zeroing_line(balance: &LedgerBalance) -> Option<JournalLineInput> {
        if balance.closing_balance.is_zero() {
            return None;
        }
        let (debit, credit) = balance.class.to_sides(balance.closing_balance);
        let line = if debit.is_zero() {
            JournalLineInput::debit(balance.account_id, credit)
        } else {
            JournalLineInput::credit(balance.account_id, debit)
        };
        Some(line.with_memo("Year-end closing"))
    }
}
