//! Reversing entries.
//!
//! Posted history is never edited. Both `void` and `reverse` produce a new
//! entry whose lines swap debit and credit; `void` dates it on the original
//! date, `reverse` on a caller-chosen date.

use chrono::NaiveDate;

use super::entry::JournalEntry;
use super::types::{JournalLineInput, NewJournalEntry, reference_types};

/// Stateless service for building reversing entries.
pub struct ReversalService;

impl ReversalService {
    /// Lines of `original` with debit and credit swapped.
    ///
    /// Accounts, amounts, order and memos are preserved.
    #[must_use]
    pub fn reversing_lines(original: &JournalEntry) -> Vec<JournalLineInput> {
        original
            .lines
            .iter()
            .map(|line| JournalLineInput {
                account_id: line.account_id,
                debit: (!line.credit.is_zero()).then_some(line.credit),
                credit: (!line.debit.is_zero()).then_some(line.debit),
                memo: line.memo.clone(),
            })
            .collect()
    }

    /// Builds the reversing entry for `original`, dated `entry_date`.
    #[must_use]
    pub fn build_reversal(
        original: &JournalEntry,
        entry_date: NaiveDate,
        reason: Option<&str>,
    ) -> NewJournalEntry {
        let narration = match reason {
            Some(reason) => format!("Reversal of {}: {reason}", original.entry_number),
            None => format!("Reversal of {}", original.entry_number),
        };

        NewJournalEntry {
            entry_date,
            reference_type: reference_types::REVERSAL.to_string(),
            reference_id: Some(original.id.into_inner()),
            narration,
            lines: Self::reversing_lines(original),
        }
    }
}
