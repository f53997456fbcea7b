//! Chart of accounts and collaborator link tests.

mod common;

use common::{date, setup};
use kosh_core::accounts::{AccountClass, CodeScheme, NewAccount};
use kosh_core::ledger::LedgerError;
use rust_decimal_macros::dec;

#[tokio::test]
async fn test_duplicate_and_misclassified_codes_are_rejected() {
    let Some(t) = setup().await else { return };

    let err = t
        .accounts
        .create_account(t.tenant, NewAccount::new("1100", "Petty Cash", AccountClass::Asset))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::DuplicateCode(code) if code == "1100"));

    let err = t
        .accounts
        .create_account(t.tenant, NewAccount::new("4200", "Misfiled", AccountClass::Expense))
        .await
        .unwrap_err();
    assert!(matches!(err, LedgerError::InvalidAccountCode(_)));

    // Codes are per tenant.
    let Some(other) = setup().await else { return };
    assert_eq!(other.cash.code.as_str(), "1100");
}

#[tokio::test]
async fn test_child_account_must_share_parent_class() {
    let Some(t) = setup().await else { return };

    let mut input = NewAccount::new("1101", "Hundi Box 1", AccountClass::Asset);
    input.parent_id = Some(t.cash.id);
    let child = t.accounts.create_account(t.tenant, input).await.unwrap();
    assert_eq!(child.parent_id, Some(t.cash.id));

    let mut input = NewAccount::new("5101", "Flowers", AccountClass::Expense);
    input.parent_id = Some(t.cash.id);
    let err = t.accounts.create_account(t.tenant, input).await.unwrap_err();
    assert!(matches!(err, LedgerError::InvalidHierarchy { .. }));
}

#[tokio::test]
async fn test_code_is_frozen_after_first_posting() {
    let Some(t) = setup().await else { return };

    let renamed = t.accounts.rename_code(t.tenant, t.bank.id, "1210").await.unwrap();
    assert_eq!(renamed.code.as_str(), "1210");
    let found = t.accounts.find_by_code(t.tenant, "1210").await.unwrap();
    assert_eq!(found.id, t.bank.id);

    t.journal
        .post_or_defer(t.tenant, t.donation(date(2025, 5, 1), dec!(1)))
        .await
        .unwrap();
    let err = t.accounts.rename_code(t.tenant, t.cash.id, "1110").await.unwrap_err();
    assert!(matches!(err, LedgerError::CodeInUse(_)));

    let err = t.accounts.find_by_code(t.tenant, "1200").await.unwrap_err();
    assert!(matches!(err, LedgerError::AccountCodeNotFound(_)));
}

#[tokio::test]
async fn test_remap_chart_keeps_history() {
    let Some(t) = setup().await else { return };

    t.journal
        .post_or_defer(t.tenant, t.donation(date(2025, 5, 1), dec!(75)))
        .await
        .unwrap();

    let changed = t.accounts.remap_codes(t.tenant, CodeScheme::FiveDigit).await.unwrap();
    assert_eq!(changed.len(), 5);

    let cash = t.accounts.get_account(t.tenant, t.cash.id).await.unwrap();
    assert_eq!(cash.code.as_str(), "11000");
    assert_eq!(t.balance_of(&t.cash, date(2025, 5, 31)).await, dec!(75));

    let back = t.accounts.remap_codes(t.tenant, CodeScheme::FourDigit).await.unwrap();
    assert_eq!(back.len(), 5);
}

#[tokio::test]
async fn test_links_resolve_without_fallback() {
    let Some(t) = setup().await else { return };

    let err = t.accounts.resolve_link(t.tenant, "donation.general").await.unwrap_err();
    assert!(matches!(err, LedgerError::MissingLink(_)));

    t.accounts.link_account(t.tenant, "donation.general", t.cash.id).await.unwrap();
    t.accounts.link_account(t.tenant, "donation.general", t.bank.id).await.unwrap();

    let resolved = t.accounts.resolve_link(t.tenant, "donation.general").await.unwrap();
    assert_eq!(resolved.id, t.bank.id);
}

#[tokio::test]
async fn test_deactivated_accounts_are_hidden_from_listing() {
    let Some(t) = setup().await else { return };

    t.accounts.deactivate(t.tenant, t.pooja_expense.id).await.unwrap();

    let active = t.accounts.list_accounts(t.tenant, false).await.unwrap();
    assert_eq!(active.len(), 4);
    let all = t.accounts.list_accounts(t.tenant, true).await.unwrap();
    assert_eq!(all.len(), 5);
    assert_eq!(all[0].code.as_str(), "1100");
}
