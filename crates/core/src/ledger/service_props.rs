//! Property-based tests for the journal engine.
//!
//! - Balanced entries are accepted, unbalanced ones rejected with their delta
//! - A reversal nets every touched account back to zero
//! - Reversing twice restores the original lines

use chrono::NaiveDate;
use kosh_shared::types::{AccountId, JournalEntryId, JournalLineId, TenantId};
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::entry::{JournalEntry, JournalLine};
use super::error::LedgerError;
use super::projector::{PostedLine, Projector};
use super::reversal::ReversalService;
use super::service::JournalService;
use super::types::{EntryStatus, EntryType, JournalLineInput, NewJournalEntry};
use crate::accounts::AccountClass;

/// Strategy to generate positive amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate a list of debit amounts and a credit split count.
fn balanced_lines() -> impl Strategy<Value = (Vec<Decimal>, usize)> {
    (prop::collection::vec(positive_amount(), 1..6), 1usize..4)
}

fn entry_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 8, 15).unwrap()
}

/// Builds balanced lines: the given debits against `splits` credits summing to the same total.
fn make_balanced(debits: &[Decimal], splits: usize) -> Vec<JournalLineInput> {
    let total: Decimal = debits.iter().copied().sum();
    let mut lines: Vec<JournalLineInput> = debits
        .iter()
        .map(|amount| JournalLineInput::debit(AccountId::new(), *amount))
        .collect();

    let cents = (total * Decimal::ONE_HUNDRED).trunc();
    let splits_dec = Decimal::from(u32::try_from(splits).unwrap());
    let share = (cents / splits_dec).trunc();
    let mut remaining = total;
    for i in 0..splits {
        let amount = if i + 1 == splits {
            remaining
        } else {
            share / Decimal::ONE_HUNDRED
        };
        if amount > Decimal::ZERO {
            lines.push(JournalLineInput::credit(AccountId::new(), amount));
            remaining -= amount;
        }
    }
    lines
}

/// Materialises validated input as a posted entry.
fn as_posted(input: &NewJournalEntry) -> JournalEntry {
    let lines = JournalService::validate_draft(input).unwrap();
    JournalEntry {
        id: JournalEntryId::new(),
        tenant_id: TenantId::new(),
        entry_number: "JE-2025-000001".to_string(),
        entry_date: input.entry_date,
        status: EntryStatus::Posted,
        reference_type: input.reference_type.clone(),
        reference_id: input.reference_id,
        narration: input.narration.clone(),
        reverses_entry_id: None,
        reversed_by_entry_id: None,
        void_reason: None,
        posted_at: None,
        voided_at: None,
        lines: lines
            .into_iter()
            .map(|l| JournalLine {
                id: JournalLineId::new(),
                line_number: l.line_number,
                account_id: l.account_id,
                debit: l.debit,
                credit: l.credit,
                memo: l.memo,
            })
            .collect(),
    }
}

fn posted_lines(entry: &JournalEntry) -> Vec<PostedLine> {
    entry
        .lines
        .iter()
        .map(|l| PostedLine {
            entry_id: entry.id,
            entry_number: entry.entry_number.clone(),
            entry_date: entry.entry_date,
            narration: entry.narration.clone(),
            reference_type: entry.reference_type.clone(),
            line_number: l.line_number,
            account_id: l.account_id,
            debit: l.debit,
            credit: l.credit,
        })
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// *For any* set of debits matched by credits summing to the same total,
    /// the draft validates and its totals are balanced.
    #[test]
    fn prop_balanced_entry_accepted((debits, splits) in balanced_lines()) {
        let input = NewJournalEntry::manual(entry_date(), "prop", make_balanced(&debits, splits));
        let lines = JournalService::validate_draft(&input).unwrap();
        let totals = JournalService::calculate_totals(&lines);
        prop_assert!(totals.is_balanced);
        prop_assert_eq!(totals.debit, debits.iter().copied().sum::<Decimal>());
        prop_assert!(JournalService::ensure_balanced(&totals).is_ok());
    }

    /// *For any* two different amounts, the entry is rejected and the error
    /// reports debit minus credit as the delta.
    #[test]
    fn prop_unbalanced_entry_reports_delta(debit in positive_amount(), credit in positive_amount()) {
        prop_assume!(debit != credit);
        let input = NewJournalEntry::manual(
            entry_date(),
            "prop",
            vec![
                JournalLineInput::debit(AccountId::new(), debit),
                JournalLineInput::credit(AccountId::new(), credit),
            ],
        );
        let lines = JournalService::validate_draft(&input).unwrap();
        let totals = JournalService::calculate_totals(&lines);
        match JournalService::ensure_balanced(&totals) {
            Err(LedgerError::UnbalancedEntry { delta, .. }) => prop_assert_eq!(delta, debit - credit),
            other => prop_assert!(false, "expected UnbalancedEntry, got {:?}", other),
        }
    }

    /// *For any* posted entry, adding its reversal leaves every touched
    /// account with a zero balance.
    #[test]
    fn prop_reversal_nets_to_zero((debits, splits) in balanced_lines()) {
        let original = as_posted(&NewJournalEntry::manual(entry_date(), "prop", make_balanced(&debits, splits)));
        let reversal = as_posted(&ReversalService::build_reversal(&original, entry_date(), None));

        let mut lines = posted_lines(&original);
        lines.extend(posted_lines(&reversal));

        for line in &original.lines {
            let class = match line.side() {
                EntryType::Debit => AccountClass::Asset,
                EntryType::Credit => AccountClass::Income,
            };
            let balance = Projector::balance(line.account_id, class, &[], &lines, entry_date());
            prop_assert_eq!(balance.closing_balance, Decimal::ZERO);
        }
    }

    /// *For any* posted entry, reversing its reversal restores the original lines.
    #[test]
    fn prop_double_reversal_is_identity((debits, splits) in balanced_lines()) {
        let original = as_posted(&NewJournalEntry::manual(entry_date(), "prop", make_balanced(&debits, splits)));
        let once = as_posted(&ReversalService::build_reversal(&original, entry_date(), None));
        let twice = ReversalService::reversing_lines(&once);

        prop_assert_eq!(twice.len(), original.lines.len());
        for (restored, line) in twice.iter().zip(&original.lines) {
            prop_assert_eq!(restored.account_id, line.account_id);
            prop_assert_eq!(restored.debit.unwrap_or_default(), line.debit);
            prop_assert_eq!(restored.credit.unwrap_or_default(), line.credit);
        }
    }
}
