//! Concurrent posting tests.
//!
//! Posts sharing an account serialise on the account row lock; the final
//! balance must equal the sum of every posted amount and entry numbers must
//! stay unique and sequential. Nothing is discarded here, so they are also
//! contiguous.

mod common;

use std::collections::HashSet;

use common::{date, setup};
use futures::future::join_all;
use kosh_core::ledger::{EntryStatus, JournalLineInput, NewJournalEntry};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[tokio::test]
async fn test_concurrent_posts_on_one_account_keep_balance() {
    let Some(t) = setup().await else { return };

    let amounts: Vec<Decimal> = (1..=50).map(|i| Decimal::new(i * 100 + 25, 2)).collect();
    let expected: Decimal = amounts.iter().copied().sum();

    let results = join_all(amounts.iter().map(|amount| {
        let journal = t.journal.clone();
        let input = t.donation(date(2025, 6, 15), *amount);
        let tenant = t.tenant;
        async move { journal.post_or_defer(tenant, input).await }
    }))
    .await;

    let mut numbers = HashSet::new();
    for result in results {
        let outcome = result.unwrap();
        assert!(outcome.is_posted(), "deferred: {:?}", outcome.warning);
        assert!(numbers.insert(outcome.entry.entry_number));
    }

    assert_eq!(numbers.len(), 50);
    for seq in 1..=50 {
        assert!(numbers.contains(&format!("JE-2025-{seq:06}")));
    }
    assert_eq!(t.balance_of(&t.cash, date(2025, 6, 30)).await, expected);
    assert_eq!(t.balance_of(&t.donations, date(2025, 6, 30)).await, expected);

    let account = t.accounts.get_account(t.tenant, t.cash.id).await.unwrap();
    assert_eq!(account.version, 50);
}

#[tokio::test]
async fn test_concurrent_posts_of_one_draft_post_once() {
    let Some(t) = setup().await else { return };

    let draft = t.journal.create_draft(t.tenant, t.donation(date(2025, 6, 1), dec!(40))).await.unwrap();

    let results = join_all((0..10).map(|_| {
        let journal = t.journal.clone();
        let tenant = t.tenant;
        async move { journal.post(tenant, draft.id).await }
    }))
    .await;

    for result in results {
        assert_eq!(result.unwrap().status, EntryStatus::Posted);
    }
    assert_eq!(t.balance_of(&t.cash, date(2025, 6, 30)).await, dec!(40));
}

#[tokio::test]
async fn test_crossing_account_order_does_not_deadlock() {
    let Some(t) = setup().await else { return };

    // Half the entries list cash first, half bank first.
    let results = join_all((0..20).map(|i| {
        let journal = t.journal.clone();
        let tenant = t.tenant;
        let lines = if i % 2 == 0 {
            vec![
                JournalLineInput::debit(t.cash.id, dec!(10)),
                JournalLineInput::credit(t.bank.id, dec!(10)),
            ]
        } else {
            vec![
                JournalLineInput::credit(t.bank.id, dec!(5)),
                JournalLineInput::debit(t.cash.id, dec!(5)),
            ]
        };
        let input = NewJournalEntry::manual(date(2025, 7, 1), "Cash withdrawal", lines);
        async move { journal.post_or_defer(tenant, input).await }
    }))
    .await;

    for result in results {
        assert!(result.unwrap().is_posted());
    }
    assert_eq!(t.balance_of(&t.cash, date(2025, 7, 1)).await, dec!(150));
    assert_eq!(t.balance_of(&t.bank, date(2025, 7, 1)).await, dec!(-150));
}
