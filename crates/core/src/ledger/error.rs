//! Ledger error types for validation, state and concurrency errors.
//!
//! Every failure the engine can report, from a malformed line to a lost
//! row-lock race, is a variant of [`LedgerError`].

use chrono::NaiveDate;
use kosh_shared::types::{AccountId, JournalEntryId, PeriodId};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::accounts::{AccountClass, AccountCodeError};
use crate::fiscal::{ChecklistItem, PeriodStatus};
use crate::ledger::types::EntryStatus;

/// Broad classification of a [`LedgerError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caller mistake; never retried.
    Validation,
    /// Conflict with current state (closed period, voided entry).
    State,
    /// Referenced record does not exist.
    NotFound,
    /// Lost a lock or serialization race; safe to retry.
    Concurrency,
    /// Infrastructure failure.
    Internal,
}

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Entry has fewer than two lines.
    #[error("Journal entry must have at least 2 lines, got {lines}")]
    EmptyEntry {
        /// Number of lines supplied.
        lines: usize,
    },

    /// Line has both or neither of debit and credit set.
    #[error("Line {line} must have exactly one of debit or credit")]
    MixedLine {
        /// 1-based line number.
        line: usize,
    },

    /// Line amount is zero or negative.
    #[error("Line {line} amount must be positive")]
    NonPositiveAmount {
        /// 1-based line number.
        line: usize,
    },

    /// Line amount has more than two decimal places.
    #[error("Line {line} amount {amount} has more than 2 decimal places")]
    InvalidAmountPrecision {
        /// 1-based line number.
        line: usize,
        /// The offending amount.
        amount: Decimal,
    },

    /// Debits and credits differ.
    #[error("Journal entry is not balanced. Debit: {debit}, Credit: {credit}, Delta: {delta}")]
    UnbalancedEntry {
        /// Total debit.
        debit: Decimal,
        /// Total credit.
        credit: Decimal,
        /// Debit minus credit.
        delta: Decimal,
    },

    /// Account code already used by the tenant.
    #[error("Account code {0} already exists")]
    DuplicateCode(String),

    /// Account code is malformed or belongs to another class.
    #[error(transparent)]
    InvalidAccountCode(#[from] AccountCodeError),

    /// Parent and child account classes differ.
    #[error("A {parent} account cannot parent a {child} account")]
    InvalidHierarchy {
        /// Parent class.
        parent: AccountClass,
        /// Child class.
        child: AccountClass,
    },

    /// Opening balance has both sides, a negative side or too many decimals.
    #[error("Invalid opening balance for account {account_id}: {reason}")]
    InvalidOpeningBalance {
        /// Account the balance was set for.
        account_id: AccountId,
        /// What is wrong with it.
        reason: String,
    },

    /// Aggregate opening debits and credits differ.
    #[error("Opening balances are not balanced. Debit: {debit}, Credit: {credit}")]
    UnbalancedOpening {
        /// Aggregate debit.
        debit: Decimal,
        /// Aggregate credit.
        credit: Decimal,
    },

    /// Start date after end date.
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Range start.
        start: NaiveDate,
        /// Range end.
        end: NaiveDate,
    },

    /// Link key is not dotted lowercase.
    #[error("Invalid account link key: {0}")]
    InvalidLinkKey(String),

    /// Other input validation failure.
    #[error("Validation failed: {0}")]
    Validation(String),

    // ========== State Errors ==========
    /// Operation needs an Open period.
    #[error("Period {period_id} is {status}, expected open")]
    PeriodNotOpen {
        /// The period.
        period_id: PeriodId,
        /// Its current status.
        status: PeriodStatus,
    },

    /// Entry date falls in a Closing or Closed period.
    #[error("Period {period_id} covering {date} is {status}, no posting allowed")]
    PeriodClosed {
        /// Covering period.
        period_id: PeriodId,
        /// Date that was rejected.
        date: NaiveDate,
        /// The period's status.
        status: PeriodStatus,
    },

    /// No period covers the date.
    #[error("No financial period covers {0}")]
    NoPeriodForDate(NaiveDate),

    /// New period overlaps an existing one.
    #[error("Period {start}..={end} overlaps an existing period")]
    OverlappingPeriod {
        /// Requested start.
        start: NaiveDate,
        /// Requested end.
        end: NaiveDate,
    },

    /// Period cannot move between these statuses.
    #[error("Period {period_id} cannot move from {from} to {to}")]
    InvalidPeriodTransition {
        /// The period.
        period_id: PeriodId,
        /// Current status.
        from: PeriodStatus,
        /// Requested status.
        to: PeriodStatus,
    },

    /// Referenced account is inactive.
    #[error("Account {0} is inactive")]
    InactiveAccount(AccountId),

    /// Account code is frozen because lines reference the account.
    #[error("Account {0} has postings; its code can no longer change")]
    CodeInUse(AccountId),

    /// Entry already voided.
    #[error("Journal entry {0} is already voided")]
    AlreadyVoided(JournalEntryId),

    /// Entry already has a reversing entry.
    #[error("Journal entry {0} has already been reversed")]
    AlreadyReversed(JournalEntryId),

    /// Operation requires a Posted entry.
    #[error("Journal entry {entry_id} is {status}, expected posted")]
    NotPosted {
        /// The entry.
        entry_id: JournalEntryId,
        /// Its current status.
        status: EntryStatus,
    },

    /// Only drafts can be discarded.
    #[error("Journal entry {0} is not a draft and cannot be discarded")]
    CanOnlyDiscardDraft(JournalEntryId),

    /// Closing checklist has blocking items.
    #[error("Period cannot be closed: {} unresolved checklist item(s)", .0.len())]
    ChecklistIncomplete(Vec<ChecklistItem>),

    // ========== Not Found Errors ==========
    /// Account not found.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Account code not found.
    #[error("No account with code {0}")]
    AccountCodeNotFound(String),

    /// Journal entry not found.
    #[error("Journal entry not found: {0}")]
    EntryNotFound(JournalEntryId),

    /// Period not found.
    #[error("Financial period not found: {0}")]
    PeriodNotFound(PeriodId),

    /// No account linked to the key.
    #[error("No account linked to {0}")]
    MissingLink(String),

    // ========== Concurrency Errors ==========
    /// Serialization failure or deadlock; retry.
    #[error("Concurrent modification detected, please retry")]
    ConcurrentModification,

    // ========== Internal Errors ==========
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Returns the broad category of the error.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::EmptyEntry { .. }
            | Self::MixedLine { .. }
            | Self::NonPositiveAmount { .. }
            | Self::InvalidAmountPrecision { .. }
            | Self::UnbalancedEntry { .. }
            | Self::DuplicateCode(_)
            | Self::InvalidAccountCode(_)
            | Self::InvalidHierarchy { .. }
            | Self::InvalidOpeningBalance { .. }
            | Self::UnbalancedOpening { .. }
            | Self::InvalidDateRange { .. }
            | Self::InvalidLinkKey(_)
            | Self::Validation(_) => ErrorCategory::Validation,

            Self::PeriodNotOpen { .. }
            | Self::PeriodClosed { .. }
            | Self::NoPeriodForDate(_)
            | Self::OverlappingPeriod { .. }
            | Self::InvalidPeriodTransition { .. }
            | Self::InactiveAccount(_)
            | Self::CodeInUse(_)
            | Self::AlreadyVoided(_)
            | Self::AlreadyReversed(_)
            | Self::NotPosted { .. }
            | Self::CanOnlyDiscardDraft(_)
            | Self::ChecklistIncomplete(_) => ErrorCategory::State,

            Self::AccountNotFound(_)
            | Self::AccountCodeNotFound(_)
            | Self::EntryNotFound(_)
            | Self::PeriodNotFound(_)
            | Self::MissingLink(_) => ErrorCategory::NotFound,

            Self::ConcurrentModification => ErrorCategory::Concurrency,

            Self::Database(_) | Self::Internal(_) => ErrorCategory::Internal,
        }
    }

    /// Returns the stable error code for callers.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyEntry { .. } => "EMPTY_ENTRY",
            Self::MixedLine { .. } => "MIXED_LINE",
            Self::NonPositiveAmount { .. } => "NON_POSITIVE_AMOUNT",
            Self::InvalidAmountPrecision { .. } => "INVALID_AMOUNT_PRECISION",
            Self::UnbalancedEntry { .. } => "UNBALANCED_ENTRY",
            Self::DuplicateCode(_) => "DUPLICATE_CODE",
            Self::InvalidAccountCode(_) => "INVALID_ACCOUNT_CODE",
            Self::InvalidHierarchy { .. } => "INVALID_HIERARCHY",
            Self::InvalidOpeningBalance { .. } => "INVALID_OPENING_BALANCE",
            Self::UnbalancedOpening { .. } => "UNBALANCED_OPENING",
            Self::InvalidDateRange { .. } => "INVALID_DATE_RANGE",
            Self::InvalidLinkKey(_) => "INVALID_LINK_KEY",
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::PeriodNotOpen { .. } => "PERIOD_NOT_OPEN",
            Self::PeriodClosed { .. } => "PERIOD_CLOSED",
            Self::NoPeriodForDate(_) => "NO_PERIOD_FOR_DATE",
            Self::OverlappingPeriod { .. } => "OVERLAPPING_PERIOD",
            Self::InvalidPeriodTransition { .. } => "INVALID_PERIOD_TRANSITION",
            Self::InactiveAccount(_) => "INACTIVE_ACCOUNT",
            Self::CodeInUse(_) => "CODE_IN_USE",
            Self::AlreadyVoided(_) => "ALREADY_VOIDED",
            Self::AlreadyReversed(_) => "ALREADY_REVERSED",
            Self::NotPosted { .. } => "NOT_POSTED",
            Self::CanOnlyDiscardDraft(_) => "CAN_ONLY_DISCARD_DRAFT",
            Self::ChecklistIncomplete(_) => "CHECKLIST_INCOMPLETE",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::AccountCodeNotFound(_) => "ACCOUNT_CODE_NOT_FOUND",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::PeriodNotFound(_) => "PERIOD_NOT_FOUND",
            Self::MissingLink(_) => "MISSING_LINK",
            Self::ConcurrentModification => "CONCURRENT_MODIFICATION",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code a transport layer should use.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self.category() {
            ErrorCategory::Validation => 400,
            ErrorCategory::State => 422,
            ErrorCategory::NotFound => 404,
            ErrorCategory::Concurrency => 409,
            ErrorCategory::Internal => 500,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.category() == ErrorCategory::Concurrency
    }
}
