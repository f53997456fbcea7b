//! Ledger reads: balances and running-balance ledgers.
//!
//! Balances are never stored. Every read loads posted lines and opening
//! balances and hands them to the `Projector`, so a balance can be
//! recomputed for any date.

use std::collections::HashMap;

use chrono::NaiveDate;
use kosh_core::accounts::{Account, AccountClass};
use kosh_core::ledger::{AccountLedger, BalanceAnchor, LedgerBalance, LedgerError, PostedLine, Projector};
use kosh_shared::types::{AccountId, JournalEntryId, TenantId};
use rust_decimal::Decimal;
use sea_orm::{
    AccessMode, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    FromQueryResult, IsolationLevel, JoinType, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
    TransactionTrait,
};
use uuid::Uuid;

use super::convert;
use super::error::db_err;
use crate::entities::{
    accounts, financial_periods, journal_entries, journal_lines, opening_balances,
    sea_orm_active_enums::EntryStatus,
};

#[derive(Debug, FromQueryResult)]
struct PostedLineRow {
    entry_id: Uuid,
    line_number: i32,
    account_id: Uuid,
    debit: Decimal,
    credit: Decimal,
    entry_number: String,
    entry_date: NaiveDate,
    narration: String,
    reference_type: String,
}

#[derive(Debug, FromQueryResult)]
struct AnchorRow {
    account_id: Uuid,
    debit: Decimal,
    credit: Decimal,
    period_start: NaiveDate,
}

/// Opens a read-only snapshot so multi-query reads see one committed state.
pub(crate) async fn snapshot(db: &DatabaseConnection) -> Result<DatabaseTransaction, LedgerError> {
    db.begin_with_config(Some(IsolationLevel::RepeatableRead), Some(AccessMode::ReadOnly))
        .await
        .map_err(db_err)
}

/// Loads a tenant's chart ordered by code.
pub(crate) async fn load_accounts<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
) -> Result<Vec<Account>, LedgerError> {
    accounts::Entity::find()
        .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
        .order_by_asc(accounts::Column::Code)
        .all(conn)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(convert::account)
        .collect()
}

/// Loads one account of a tenant.
pub(crate) async fn load_account<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
    account_id: AccountId,
) -> Result<Account, LedgerError> {
    let model = accounts::Entity::find_by_id(account_id.into_inner())
        .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or(LedgerError::AccountNotFound(account_id))?;
    convert::account(model)
}

/// Loads lines of Posted and Voided entries dated on or before `to`.
///
/// Voided entries are kept: their mirror entry cancels them on the same date.
pub(crate) async fn load_posted_lines<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
    account_id: Option<AccountId>,
    to: NaiveDate,
) -> Result<Vec<PostedLine>, LedgerError> {
    let mut query = journal_lines::Entity::find()
        .select_only()
        .column(journal_lines::Column::EntryId)
        .column(journal_lines::Column::LineNumber)
        .column(journal_lines::Column::AccountId)
        .column(journal_lines::Column::Debit)
        .column(journal_lines::Column::Credit)
        .join(JoinType::InnerJoin, journal_lines::Relation::JournalEntries.def())
        .column_as(journal_entries::Column::EntryNumber, "entry_number")
        .column_as(journal_entries::Column::EntryDate, "entry_date")
        .column_as(journal_entries::Column::Narration, "narration")
        .column_as(journal_entries::Column::ReferenceType, "reference_type")
        .filter(journal_lines::Column::TenantId.eq(tenant_id.into_inner()))
        .filter(journal_entries::Column::Status.ne(EntryStatus::Draft))
        .filter(journal_entries::Column::EntryDate.lte(to));

    if let Some(account_id) = account_id {
        query = query.filter(journal_lines::Column::AccountId.eq(account_id.into_inner()));
    }

    let rows = query
        .order_by_asc(journal_entries::Column::EntryDate)
        .order_by_asc(journal_entries::Column::EntryNumber)
        .order_by_asc(journal_lines::Column::LineNumber)
        .into_model::<PostedLineRow>()
        .all(conn)
        .await
        .map_err(db_err)?;

    rows.into_iter().map(posted_line).collect()
}

fn posted_line(row: PostedLineRow) -> Result<PostedLine, LedgerError> {
    let line_number = u32::try_from(row.line_number).map_err(|_| {
        LedgerError::Internal(format!(
            "entry {} has stored line number {}",
            row.entry_id, row.line_number
        ))
    })?;
    Ok(PostedLine {
        entry_id: JournalEntryId::from_uuid(row.entry_id),
        entry_number: row.entry_number,
        entry_date: row.entry_date,
        narration: row.narration,
        reference_type: row.reference_type,
        line_number,
        account_id: AccountId::from_uuid(row.account_id),
        debit: row.debit,
        credit: row.credit,
    })
}

/// Loads opening balances as anchors in each account's natural sign,
/// aligned so every account in `classes` has an anchor at every period
/// start that carries openings.
///
/// Openings of accounts missing from `classes` are skipped.
pub(crate) async fn load_anchors<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
    classes: &HashMap<AccountId, AccountClass>,
) -> Result<HashMap<AccountId, Vec<BalanceAnchor>>, LedgerError> {
    let rows = opening_balances::Entity::find()
        .select_only()
        .column(opening_balances::Column::AccountId)
        .column(opening_balances::Column::Debit)
        .column(opening_balances::Column::Credit)
        .join(JoinType::InnerJoin, opening_balances::Relation::FinancialPeriods.def())
        .column_as(financial_periods::Column::StartDate, "period_start")
        .filter(opening_balances::Column::TenantId.eq(tenant_id.into_inner()))
        .into_model::<AnchorRow>()
        .all(conn)
        .await
        .map_err(db_err)?;

    let mut anchors: HashMap<AccountId, Vec<BalanceAnchor>> = HashMap::new();
    for row in rows {
        let account_id = AccountId::from_uuid(row.account_id);
        let Some(class) = classes.get(&account_id) else {
            continue;
        };
        anchors.entry(account_id).or_default().push(BalanceAnchor {
            period_start: row.period_start,
            balance: class.balance_change(row.debit, row.credit),
        });
    }
    Ok(Projector::align_anchors(&anchors, classes.keys().copied()))
}

/// Classes of a tenant's whole chart.
async fn load_classes<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
) -> Result<HashMap<AccountId, AccountClass>, LedgerError> {
    Ok(load_accounts(conn, tenant_id)
        .await?
        .into_iter()
        .map(|a| (a.id, a.class))
        .collect())
}

/// Balances of every account of a tenant as of `as_of`, in code order.
pub(crate) async fn project_all<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
    as_of: NaiveDate,
) -> Result<(Vec<Account>, Vec<LedgerBalance>), LedgerError> {
    let chart = load_accounts(conn, tenant_id).await?;
    let classes: HashMap<AccountId, AccountClass> = chart.iter().map(|a| (a.id, a.class)).collect();
    let anchors = load_anchors(conn, tenant_id, &classes).await?;
    let lines = load_posted_lines(conn, tenant_id, None, as_of).await?;

    let keys: Vec<(AccountId, AccountClass)> = chart.iter().map(|a| (a.id, a.class)).collect();
    let balances = Projector::balances(&keys, &anchors, &lines, as_of);
    Ok((chart, balances))
}

/// Read access to derived balances.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
}

impl LedgerRepository {
    /// Creates a new ledger repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Balance of one account as of `as_of` (inclusive).
    ///
    /// # Errors
    ///
    /// `AccountNotFound` if the account does not belong to the tenant.
    pub async fn get_balance(
        &self,
        tenant_id: TenantId,
        account_id: AccountId,
        as_of: NaiveDate,
    ) -> Result<LedgerBalance, LedgerError> {
        let txn = snapshot(&self.db).await?;
        let account = load_account(&txn, tenant_id, account_id).await?;
        // Every account's openings decide which period's set is in force.
        let classes = load_classes(&txn, tenant_id).await?;
        let anchors = load_anchors(&txn, tenant_id, &classes).await?;
        let lines = load_posted_lines(&txn, tenant_id, Some(account_id), as_of).await?;
        txn.commit().await.map_err(db_err)?;

        let own = anchors.get(&account_id).map_or(&[][..], Vec::as_slice);
        Ok(Projector::balance(account_id, account.class, own, &lines, as_of))
    }

    /// Running-balance ledger of one account over `from..=to`.
    ///
    /// # Errors
    ///
    /// `InvalidDateRange` if `from` is after `to`; `AccountNotFound`.
    pub async fn account_ledger(
        &self,
        tenant_id: TenantId,
        account_id: AccountId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<AccountLedger, LedgerError> {
        if from > to {
            return Err(LedgerError::InvalidDateRange { start: from, end: to });
        }
        let txn = snapshot(&self.db).await?;
        let account = load_account(&txn, tenant_id, account_id).await?;
        // Every account's openings decide which period's set is in force.
        let classes = load_classes(&txn, tenant_id).await?;
        let anchors = load_anchors(&txn, tenant_id, &classes).await?;
        let lines = load_posted_lines(&txn, tenant_id, Some(account_id), to).await?;
        txn.commit().await.map_err(db_err)?;

        let own = anchors.get(&account_id).map_or(&[][..], Vec::as_slice);
        Projector::account_ledger(account_id, account.class, own, &lines, from, to)
    }

    /// Balances of every account as of `as_of`, in code order.
    pub async fn balances(
        &self,
        tenant_id: TenantId,
        as_of: NaiveDate,
    ) -> Result<Vec<LedgerBalance>, LedgerError> {
        let txn = snapshot(&self.db).await?;
        let (_, balances) = project_all(&txn, tenant_id, as_of).await?;
        txn.commit().await.map_err(db_err)?;
        Ok(balances)
    }
}
