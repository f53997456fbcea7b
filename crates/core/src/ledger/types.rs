//! Ledger domain types for journal entry creation and validation.
//!
//! This module defines the input and status types used for creating and
//! posting journal entries in the double-entry bookkeeping system.

use chrono::NaiveDate;
use kosh_shared::types::AccountId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Well-known `reference_type` values.
pub mod reference_types {
    /// Entered by hand.
    pub const MANUAL: &str = "manual";
    /// Raised by the donation module.
    pub const DONATION: &str = "donation";
    /// Raised by the seva booking module.
    pub const SEVA: &str = "seva";
    /// Reversal or void mirror of another entry.
    pub const REVERSAL: &str = "reversal";
    /// Year-end surplus transfer.
    pub const PERIOD_CLOSE: &str = "period_close";
}

/// Side of a journal line.
///
/// In double-entry bookkeeping:
/// - Debits increase asset/expense accounts, decrease liability/equity/income accounts
/// - Credits decrease asset/expense accounts, increase liability/equity/income accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// Debit line.
    Debit,
    /// Credit line.
    Credit,
}

impl EntryType {
    /// The other side.
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Debit => Self::Credit,
            Self::Credit => Self::Debit,
        }
    }
}

/// Journal entry lifecycle.
///
/// `Draft --post--> Posted --void--> Voided`. Posted and Voided are
/// immutable; Voided is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    /// Editable, no balance effect.
    Draft,
    /// Balance-affecting history.
    Posted,
    /// Cancelled by a mirror reversing entry.
    Voided,
}

impl EntryStatus {
    /// Returns true if the entry can still be changed or discarded.
    #[must_use]
    pub fn is_editable(self) -> bool {
        matches!(self, Self::Draft)
    }

    /// Returns true if the entry is part of the permanent record.
    #[must_use]
    pub fn is_immutable(self) -> bool {
        matches!(self, Self::Posted | Self::Voided)
    }

    /// Returns true if lines of an entry in this status reach the projector.
    ///
    /// Voided entries count because their posted mirror cancels them.
    #[must_use]
    pub fn affects_balances(self) -> bool {
        matches!(self, Self::Posted | Self::Voided)
    }

    /// Returns true if `self -> next` is a legal transition.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Posted) | (Self::Posted, Self::Voided)
        )
    }

    /// Lowercase name, as stored.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Posted => "posted",
            Self::Voided => "voided",
        }
    }
}

impl std::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input for a single journal line.
///
/// Exactly one of `debit` and `credit` must be set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLineInput {
    /// The account to post to.
    pub account_id: AccountId,
    /// Debit amount.
    pub debit: Option<Decimal>,
    /// Credit amount.
    pub credit: Option<Decimal>,
    /// Optional line memo.
    pub memo: Option<String>,
}

impl JournalLineInput {
    /// A debit line.
    #[must_use]
    pub fn debit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: Some(amount),
            credit: None,
            memo: None,
        }
    }

    /// A credit line.
    #[must_use]
    pub fn credit(account_id: AccountId, amount: Decimal) -> Self {
        Self {
            account_id,
            debit: None,
            credit: Some(amount),
            memo: None,
        }
    }

    /// A line on `side`.
    #[must_use]
    pub fn on_side(account_id: AccountId, side: EntryType, amount: Decimal) -> Self {
        match side {
            EntryType::Debit => Self::debit(account_id, amount),
            EntryType::Credit => Self::credit(account_id, amount),
        }
    }

    /// Attaches a memo.
    #[must_use]
    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }
}

/// Input for creating a draft journal entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJournalEntry {
    /// Accounting date; decides the covering period.
    pub entry_date: NaiveDate,
    /// Origin of the entry, e.g. `donation`.
    pub reference_type: String,
    /// Weak back-link to the originating record.
    pub reference_id: Option<Uuid>,
    /// Free-text description.
    pub narration: String,
    /// Lines in order (at least 2).
    pub lines: Vec<JournalLineInput>,
}

impl NewJournalEntry {
    /// A manual entry with no back-link.
    #[must_use]
    pub fn manual(entry_date: NaiveDate, narration: impl Into<String>, lines: Vec<JournalLineInput>) -> Self {
        Self {
            entry_date,
            reference_type: reference_types::MANUAL.to_string(),
            reference_id: None,
            narration: narration.into(),
            lines,
        }
    }

    /// Sets the origin of the entry.
    #[must_use]
    pub fn with_reference(mut self, reference_type: impl Into<String>, reference_id: Option<Uuid>) -> Self {
        self.reference_type = reference_type.into();
        self.reference_id = reference_id;
        self
    }
}

/// A line after validation: one side positive, the other zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedLine {
    /// 1-based position.
    pub line_number: u32,
    /// Target account.
    pub account_id: AccountId,
    /// Debit amount or zero.
    pub debit: Decimal,
    /// Credit amount or zero.
    pub credit: Decimal,
    /// Optional memo.
    pub memo: Option<String>,
}

/// Journal entry totals for validation and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryTotals {
    /// Sum of debit lines.
    pub debit: Decimal,
    /// Sum of credit lines.
    pub credit: Decimal,
    /// Whether debits equal credits exactly.
    pub is_balanced: bool,
}

impl EntryTotals {
    /// Creates totals from debit and credit sums.
    #[must_use]
    pub fn new(debit: Decimal, credit: Decimal) -> Self {
        Self {
            debit,
            credit,
            is_balanced: debit == credit,
        }
    }

    /// Debit minus credit.
    #[must_use]
    pub fn delta(&self) -> Decimal {
        self.debit - self.credit
    }
}

/// Filter options for listing journal entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntryFilter {
    /// Filter by status.
    pub status: Option<EntryStatus>,
    /// Filter by origin.
    pub reference_type: Option<String>,
    /// Entries dated on or after.
    pub date_from: Option<NaiveDate>,
    /// Entries dated on or before.
    pub date_to: Option<NaiveDate>,
}
