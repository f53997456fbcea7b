//! Journal entries and their lines.

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use kosh_shared::types::{AccountId, JournalEntryId, JournalLineId, TenantId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::types::{EntryStatus, EntryTotals, EntryType};

/// A single debit or credit line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalLine {
    /// Unique identifier.
    pub id: JournalLineId,
    /// 1-based position within the entry.
    pub line_number: u32,
    /// Referenced account.
    pub account_id: AccountId,
    /// Debit amount (zero on credit lines).
    pub debit: Decimal,
    /// Credit amount (zero on debit lines).
    pub credit: Decimal,
    /// Optional memo.
    pub memo: Option<String>,
}

impl JournalLine {
    /// Side this line is on.
    #[must_use]
    pub fn side(&self) -> EntryType {
        if self.debit.is_zero() {
            EntryType::Credit
        } else {
            EntryType::Debit
        }
    }

    /// The non-zero amount.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        self.debit + self.credit
    }
}

/// A journal entry header with its owned lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Unique identifier.
    pub id: JournalEntryId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// `JE-YYYY-NNNNNN`, sequential per tenant and year.
    pub entry_number: String,
    /// Accounting date.
    pub entry_date: NaiveDate,
    /// Lifecycle status.
    pub status: EntryStatus,
    /// Origin, e.g. `donation`.
    pub reference_type: String,
    /// Weak back-link to the originating record.
    pub reference_id: Option<Uuid>,
    /// Description.
    pub narration: String,
    /// Set on a reversing entry: the entry it reverses.
    pub reverses_entry_id: Option<JournalEntryId>,
    /// Set on a reversed original: its reversing entry.
    pub reversed_by_entry_id: Option<JournalEntryId>,
    /// Why the entry was voided.
    pub void_reason: Option<String>,
    /// When it was posted.
    pub posted_at: Option<DateTime<Utc>>,
    /// When it was voided.
    pub voided_at: Option<DateTime<Utc>>,
    /// Lines in order.
    pub lines: Vec<JournalLine>,
}

impl JournalEntry {
    /// Sum of debits and credits.
    #[must_use]
    pub fn totals(&self) -> EntryTotals {
        let debit: Decimal = self.lines.iter().map(|l| l.debit).sum();
        let credit: Decimal = self.lines.iter().map(|l| l.credit).sum();
        EntryTotals::new(debit, credit)
    }

    /// Distinct accounts referenced, sorted by id.
    ///
    /// Row locks are taken in this order.
    #[must_use]
    pub fn account_ids(&self) -> Vec<AccountId> {
        let mut ids: Vec<AccountId> = self.lines.iter().map(|l| l.account_id).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

/// Formats an entry number: `{prefix}-{year}-{sequence:06}`.
#[must_use]
pub fn format_entry_number(prefix: &str, entry_date: NaiveDate, sequence: i64) -> String {
    format!("{prefix}-{}-{sequence:06}", entry_date.year())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(account_id: AccountId, debit: Decimal, credit: Decimal) -> JournalLine {
        JournalLine {
            id: JournalLineId::new(),
            line_number: 1,
            account_id,
            debit,
            credit,
            memo: None,
        }
    }

    #[test]
    fn test_entry_number_format() {
        let date = NaiveDate::from_ymd_opt(2025, 4, 1).unwrap();
        assert_eq!(format_entry_number("JE", date, 1), "JE-2025-000001");
        assert_eq!(format_entry_number("JV", date, 1_234_567), "JV-2025-1234567");
    }

    #[test]
    fn test_line_side_and_amount() {
        let debit = line(AccountId::new(), dec!(10), dec!(0));
        let credit = line(AccountId::new(), dec!(0), dec!(15.50));
        assert_eq!(debit.side(), EntryType::Debit);
        assert_eq!(credit.side(), EntryType::Credit);
        assert_eq!(credit.amount(), dec!(15.50));
    }

    #[test]
    fn test_account_ids_sorted_and_deduplicated() {
        let a = AccountId::new();
        let b = AccountId::new();
        let entry = JournalEntry {
            id: JournalEntryId::new(),
            tenant_id: TenantId::new(),
            entry_number: "JE-2025-000001".to_string(),
            entry_date: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            status: EntryStatus::Draft,
            reference_type: "manual".to_string(),
            reference_id: None,
            narration: String::new(),
            reverses_entry_id: None,
            reversed_by_entry_id: None,
            void_reason: None,
            posted_at: None,
            voided_at: None,
            lines: vec![
                line(b, dec!(10), dec!(0)),
                line(a, dec!(0), dec!(4)),
                line(b, dec!(0), dec!(6)),
            ],
        };
        let mut expected = vec![a, b];
        expected.sort_unstable();
        assert_eq!(entry.account_ids(), expected);
        assert!(entry.totals().is_balanced);
    }
}
