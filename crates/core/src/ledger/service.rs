//! Journal service for entry validation and state transitions.
//!
//! This module provides the core business logic for validating journal
//! entries before they are persisted, posted, voided or reversed. It never
//! touches storage: callers load the entry, its covering period and its
//! accounts, ask the service, then write what it allowed.

use chrono::NaiveDate;
use kosh_shared::types::{AccountId, has_currency_precision};
use rust_decimal::Decimal;

use super::entry::JournalEntry;
use super::error::LedgerError;
use super::types::{EntryStatus, EntryTotals, JournalLineInput, NewJournalEntry, ValidatedLine};
use crate::fiscal::{FinancialPeriod, PeriodStatus};

/// Information about an account needed for posting.
#[derive(Debug, Clone, Copy)]
pub struct AccountInfo {
    /// The account ID.
    pub id: AccountId,
    /// Whether the account accepts new postings.
    pub is_active: bool,
}

/// What `post` should do with an entry in its current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostDecision {
    /// Draft: validate and post.
    Post,
    /// Already posted: return it unchanged.
    AlreadyPosted,
}

/// Journal service for entry validation.
///
/// This service contains pure business logic with no database dependencies.
pub struct JournalService;

impl JournalService {
    /// Validates a draft and normalises its lines.
    ///
    /// Drafts do not need to balance; that is checked at posting time.
    ///
    /// # Errors
    ///
    /// - `EmptyEntry` for fewer than two lines
    /// - `MixedLine` when a line has both or neither side set
    /// - `NonPositiveAmount` / `InvalidAmountPrecision` for bad amounts
    pub fn validate_draft(input: &NewJournalEntry) -> Result<Vec<ValidatedLine>, LedgerError> {
        if input.lines.len() < 2 {
            return Err(LedgerError::EmptyEntry {
                lines: input.lines.len(),
            });
        }
        if input.reference_type.trim().is_empty() {
            return Err(LedgerError::Validation(
                "reference_type cannot be empty".to_string(),
            ));
        }

        input
            .lines
            .iter()
            .enumerate()
            .map(|(index, line)| Self::validate_line(index + 1, line))
            .collect()
    }

    fn validate_line(line_number: usize, line: &JournalLineInput) -> Result<ValidatedLine, LedgerError> {
        let (debit, credit) = match (line.debit, line.credit) {
            (Some(amount), None) => (amount, Decimal::ZERO),
            (None, Some(amount)) => (Decimal::ZERO, amount),
            _ => return Err(LedgerError::MixedLine { line: line_number }),
        };

        let amount = debit + credit;
        if amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount { line: line_number });
        }
        if !has_currency_precision(amount) {
            return Err(LedgerError::InvalidAmountPrecision {
                line: line_number,
                amount,
            });
        }

        Ok(ValidatedLine {
            line_number: u32::try_from(line_number).unwrap_or(u32::MAX),
            account_id: line.account_id,
            debit,
            credit,
            memo: line.memo.clone(),
        })
    }

    /// Sums validated lines.
    #[must_use]
    pub fn calculate_totals(lines: &[ValidatedLine]) -> EntryTotals {
        let debit: Decimal = lines.iter().map(|l| l.debit).sum();
        let credit: Decimal = lines.iter().map(|l| l.credit).sum();
        EntryTotals::new(debit, credit)
    }

    /// Fails with `UnbalancedEntry` (reporting the delta) unless balanced.
    pub fn ensure_balanced(totals: &EntryTotals) -> Result<(), LedgerError> {
        if totals.is_balanced {
            Ok(())
        } else {
            Err(LedgerError::UnbalancedEntry {
                debit: totals.debit,
                credit: totals.credit,
                delta: totals.delta(),
            })
        }
    }

    /// Decides how `post` treats an entry in its current status.
    ///
    /// Posting twice is a no-op; posting a voided entry is an error.
    pub fn check_post_status(entry: &JournalEntry) -> Result<PostDecision, LedgerError> {
        match entry.status {
            EntryStatus::Draft => Ok(PostDecision::Post),
            EntryStatus::Posted => Ok(PostDecision::AlreadyPosted),
            EntryStatus::Voided => Err(LedgerError::AlreadyVoided(entry.id)),
        }
    }

    /// Requires an Open period covering `date`.
    pub fn ensure_period_open(
        period: Option<&FinancialPeriod>,
        date: NaiveDate,
    ) -> Result<(), LedgerError> {
        let period = period.ok_or(LedgerError::NoPeriodForDate(date))?;
        if period.status != PeriodStatus::Open {
            return Err(LedgerError::PeriodClosed {
                period_id: period.id,
                date,
                status: period.status,
            });
        }
        Ok(())
    }

    /// Validates a draft for posting.
    ///
    /// Checks, in order: line count, balance, covering period, active accounts.
    ///
    /// # Errors
    ///
    /// Returns the first rule the entry breaks; the entry stays Draft.
    pub fn validate_posting<A>(
        entry: &JournalEntry,
        period: Option<&FinancialPeriod>,
        account_lookup: A,
    ) -> Result<EntryTotals, LedgerError>
    where
        A: Fn(AccountId) -> Result<AccountInfo, LedgerError>,
    {
        if entry.lines.len() < 2 {
            return Err(LedgerError::EmptyEntry {
                lines: entry.lines.len(),
            });
        }

        let totals = entry.totals();
        Self::ensure_balanced(&totals)?;

        Self::ensure_period_open(period, entry.entry_date)?;

        for account_id in entry.account_ids() {
            let info = account_lookup(account_id)?;
            if !info.is_active {
                return Err(LedgerError::InactiveAccount(info.id));
            }
        }

        Ok(totals)
    }

    /// Validates voiding a posted entry.
    ///
    /// The mirror entry is dated on the original date, so the original's
    /// period must still be Open.
    pub fn validate_void(
        entry: &JournalEntry,
        original_period: Option<&FinancialPeriod>,
    ) -> Result<(), LedgerError> {
        match entry.status {
            EntryStatus::Voided => return Err(LedgerError::AlreadyVoided(entry.id)),
            EntryStatus::Draft => {
                return Err(LedgerError::NotPosted {
                    entry_id: entry.id,
                    status: entry.status,
                });
            }
            EntryStatus::Posted => {}
        }
        if entry.reversed_by_entry_id.is_some() {
            return Err(LedgerError::AlreadyReversed(entry.id));
        }
        Self::ensure_period_open(original_period, entry.entry_date)
    }

    /// Validates reversing a posted entry into the period covering `reversal_date`.
    pub fn validate_reverse(
        entry: &JournalEntry,
        reversal_date: NaiveDate,
        reversal_period: Option<&FinancialPeriod>,
    ) -> Result<(), LedgerError> {
        match entry.status {
            EntryStatus::Voided => return Err(LedgerError::AlreadyVoided(entry.id)),
            EntryStatus::Draft => {
                return Err(LedgerError::NotPosted {
                    entry_id: entry.id,
                    status: entry.status,
                });
            }
            EntryStatus::Posted => {}
        }
        if entry.reversed_by_entry_id.is_some() {
            return Err(LedgerError::AlreadyReversed(entry.id));
        }
        Self::ensure_period_open(reversal_period, reversal_date)
    }

    /// Only drafts can be discarded.
    pub fn validate_discard(entry: &JournalEntry) -> Result<(), LedgerError> {
        if entry.status.is_editable() {
            Ok(())
        } else {
            Err(LedgerError::CanOnlyDiscardDraft(entry.id))
        }
    }
}
