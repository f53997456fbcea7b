//! Chart of accounts, opening balances and collaborator links.

use std::collections::HashSet;

use chrono::Utc;
use kosh_core::accounts::{
    Account, AccountCode, AccountLink, AccountRegistry, CodeScheme, NewAccount, OpeningBalance,
    OpeningTotals,
};
use kosh_core::fiscal::PeriodStatus;
use kosh_core::ledger::LedgerError;
use kosh_shared::types::{AccountId, PeriodId, TenantId};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait, sea_query::LockType,
};
use tracing::info;
use uuid::Uuid;

use super::convert;
use super::error::{db_err, is_unique_violation};
use super::ledger::{load_account, load_accounts};
use super::period::load_period;
use crate::entities::{account_links, accounts, journal_lines, opening_balances};

/// One row of a bulk opening-balance import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpeningBalanceInput {
    /// Account the balance is for.
    pub account_id: AccountId,
    /// Debit side.
    pub debit: Decimal,
    /// Credit side.
    pub credit: Decimal,
}

/// Account repository.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates an account.
    ///
    /// # Errors
    ///
    /// - `InvalidAccountCode` if the code is malformed or of another class
    /// - `DuplicateCode` if the tenant already uses the code
    /// - `InvalidHierarchy` if the parent is of another class
    /// - `AccountNotFound` if the parent does not exist
    pub async fn create_account(
        &self,
        tenant_id: TenantId,
        input: NewAccount,
    ) -> Result<Account, LedgerError> {
        let parent = match input.parent_id {
            Some(parent_id) => Some(load_account(&self.db, tenant_id, parent_id).await?),
            None => None,
        };

        let taken = self.codes_in_use(tenant_id).await?;
        let code = AccountRegistry::validate_new_account(&input, parent.as_ref(), |c| {
            taken.contains(c.as_str())
        })?;

        let now = Utc::now().into();
        let model = accounts::ActiveModel {
            id: Set(AccountId::new().into_inner()),
            tenant_id: Set(tenant_id.into_inner()),
            code: Set(code.as_str().to_string()),
            name: Set(input.name.trim().to_string()),
            class: Set(input.class.into()),
            parent_id: Set(input.parent_id.map(AccountId::into_inner)),
            is_active: Set(true),
            version: Set(0),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                LedgerError::DuplicateCode(code.to_string())
            } else {
                db_err(e)
            }
        })?;

        let account = convert::account(model)?;
        info!(
            tenant_id = %tenant_id,
            account_id = %account.id,
            code = %account.code,
            "Account created"
        );
        Ok(account)
    }

    /// Gets an account by id.
    pub async fn get_account(
        &self,
        tenant_id: TenantId,
        account_id: AccountId,
    ) -> Result<Account, LedgerError> {
        load_account(&self.db, tenant_id, account_id).await
    }

    /// Gets an account by code.
    ///
    /// # Errors
    ///
    /// `AccountCodeNotFound` if no account carries the code.
    pub async fn find_by_code(&self, tenant_id: TenantId, code: &str) -> Result<Account, LedgerError> {
        let model = accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(accounts::Column::Code.eq(code.trim()))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| LedgerError::AccountCodeNotFound(code.to_string()))?;
        convert::account(model)
    }

    /// Lists the chart in code order.
    pub async fn list_accounts(
        &self,
        tenant_id: TenantId,
        include_inactive: bool,
    ) -> Result<Vec<Account>, LedgerError> {
        let chart = load_accounts(&self.db, tenant_id).await?;
        Ok(chart
            .into_iter()
            .filter(|a| include_inactive || a.is_active)
            .collect())
    }

    /// Hides an account from new postings. Existing history is untouched.
    pub async fn deactivate(
        &self,
        tenant_id: TenantId,
        account_id: AccountId,
    ) -> Result<Account, LedgerError> {
        let model = self.find_model(tenant_id, account_id).await?;
        let mut active: accounts::ActiveModel = model.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(&self.db).await.map_err(db_err)?;

        info!(tenant_id = %tenant_id, account_id = %account_id, "Account deactivated");
        convert::account(updated)
    }

    /// Changes an account's code.
    ///
    /// # Errors
    ///
    /// `CodeInUse` once any journal line references the account;
    /// `DuplicateCode`; `InvalidAccountCode`.
    pub async fn rename_code(
        &self,
        tenant_id: TenantId,
        account_id: AccountId,
        new_code: &str,
    ) -> Result<Account, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        // Same row lock as posting, so a concurrent post cannot slip in.
        let model = accounts::Entity::find_by_id(account_id.into_inner())
            .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .lock(LockType::Update)
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::AccountNotFound(account_id))?;
        let account = convert::account(model.clone())?;

        let has_postings = journal_lines::Entity::find()
            .filter(journal_lines::Column::AccountId.eq(account_id.into_inner()))
            .count(&txn)
            .await
            .map_err(db_err)?
            > 0;
        let taken = self.codes_in_use(tenant_id).await?;
        let code = AccountRegistry::validate_code_change(&account, new_code, has_postings, |c| {
            taken.contains(c.as_str())
        })?;

        let mut active: accounts::ActiveModel = model.into();
        active.code = Set(code.as_str().to_string());
        active.updated_at = Set(Utc::now().into());
        let updated = active.update(&txn).await.map_err(|e| {
            if is_unique_violation(&e) {
                LedgerError::DuplicateCode(code.to_string())
            } else {
                db_err(e)
            }
        })?;
        txn.commit().await.map_err(db_err)?;

        info!(
            tenant_id = %tenant_id,
            account_id = %account_id,
            from = %account.code,
            to = %code,
            "Account code changed"
        );
        convert::account(updated)
    }

    /// Rewrites every code of the chart into `scheme`.
    ///
    /// Journal lines reference accounts by id, so history is untouched.
    /// Returns the accounts whose code changed.
    pub async fn remap_codes(
        &self,
        tenant_id: TenantId,
        scheme: CodeScheme,
    ) -> Result<Vec<(AccountId, AccountCode)>, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let chart = load_accounts(&txn, tenant_id).await?;
        let changed = AccountRegistry::remap_chart(&chart, scheme)?;

        let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
        for (account_id, code) in &changed {
            accounts::ActiveModel {
                id: Set(account_id.into_inner()),
                code: Set(code.as_str().to_string()),
                updated_at: Set(now),
                ..Default::default()
            }
            .update(&txn)
            .await
            .map_err(db_err)?;
        }
        txn.commit().await.map_err(db_err)?;

        info!(
            tenant_id = %tenant_id,
            scheme = ?scheme,
            changed = changed.len(),
            "Account codes remapped"
        );
        Ok(changed)
    }

    /// Sets the opening balance of one account at the start of a period.
    ///
    /// A zero balance removes the record. Returns the stored record.
    ///
    /// # Errors
    ///
    /// - `PeriodNotOpen` if the period is Closing or Closed
    /// - `InvalidOpeningBalance` for both sides set, negatives or sub-paisa amounts
    pub async fn set_opening_balance(
        &self,
        tenant_id: TenantId,
        period_id: PeriodId,
        input: OpeningBalanceInput,
    ) -> Result<Option<OpeningBalance>, LedgerError> {
        let opening = OpeningBalance::new(input.account_id, period_id, input.debit, input.credit)?;

        let txn = self.db.begin().await.map_err(db_err)?;
        Self::ensure_period_open(&txn, tenant_id, period_id).await?;
        load_account(&txn, tenant_id, input.account_id).await?;

        Self::delete_openings(&txn, period_id, Some(input.account_id)).await?;
        if let Some(opening) = &opening {
            insert_opening(&txn, tenant_id, opening).await?;
        }
        txn.commit().await.map_err(db_err)?;

        info!(
            tenant_id = %tenant_id,
            period_id = %period_id,
            account_id = %input.account_id,
            debit = %input.debit,
            credit = %input.credit,
            "Opening balance set"
        );
        Ok(opening)
    }

    /// Replaces all opening balances of a period.
    ///
    /// # Errors
    ///
    /// As `set_opening_balance`, plus `UnbalancedOpening` if the rows'
    /// aggregate debit differs from their aggregate credit. Nothing is
    /// written on error.
    pub async fn set_opening_balances(
        &self,
        tenant_id: TenantId,
        period_id: PeriodId,
        rows: &[OpeningBalanceInput],
    ) -> Result<Vec<OpeningBalance>, LedgerError> {
        let mut openings = Vec::with_capacity(rows.len());
        let mut seen = HashSet::with_capacity(rows.len());
        for row in rows {
            if !seen.insert(row.account_id) {
                return Err(LedgerError::InvalidOpeningBalance {
                    account_id: row.account_id,
                    reason: "account appears more than once".to_string(),
                });
            }
            if let Some(opening) = OpeningBalance::new(row.account_id, period_id, row.debit, row.credit)? {
                openings.push(opening);
            }
        }
        OpeningTotals::of(&openings).ensure_balanced()?;

        let txn = self.db.begin().await.map_err(db_err)?;
        Self::ensure_period_open(&txn, tenant_id, period_id).await?;
        for opening in &openings {
            load_account(&txn, tenant_id, opening.account_id).await?;
        }
        Self::delete_openings(&txn, period_id, None).await?;
        for opening in &openings {
            insert_opening(&txn, tenant_id, opening).await?;
        }
        txn.commit().await.map_err(db_err)?;

        info!(
            tenant_id = %tenant_id,
            period_id = %period_id,
            rows = openings.len(),
            "Opening balances replaced"
        );
        Ok(openings)
    }

    /// Opening balances attached to a period.
    pub async fn list_opening_balances(
        &self,
        tenant_id: TenantId,
        period_id: PeriodId,
    ) -> Result<Vec<OpeningBalance>, LedgerError> {
        load_period(&self.db, tenant_id, period_id, None).await?;
        Ok(opening_models(&self.db, period_id)
            .await?
            .iter()
            .map(convert::opening)
            .collect())
    }

    /// The activation check: a period's openings must balance.
    ///
    /// # Errors
    ///
    /// `UnbalancedOpening` with the aggregate totals.
    pub async fn validate_opening_balances(
        &self,
        tenant_id: TenantId,
        period_id: PeriodId,
    ) -> Result<OpeningTotals, LedgerError> {
        let openings = self.list_opening_balances(tenant_id, period_id).await?;
        let totals = OpeningTotals::of(&openings);
        totals.ensure_balanced()?;
        Ok(totals)
    }

    /// Links `link_key` to an account, replacing any previous link.
    pub async fn link_account(
        &self,
        tenant_id: TenantId,
        link_key: &str,
        account_id: AccountId,
    ) -> Result<AccountLink, LedgerError> {
        let link = AccountLink::new(link_key, account_id)?;
        load_account(&self.db, tenant_id, account_id).await?;

        let existing = account_links::Entity::find_by_id((tenant_id.into_inner(), link.link_key.clone()))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        let now = Utc::now().into();
        match existing {
            Some(model) => {
                let mut active: account_links::ActiveModel = model.into();
                active.account_id = Set(account_id.into_inner());
                active.updated_at = Set(now);
                active.update(&self.db).await.map_err(db_err)?;
            }
            None => {
                account_links::ActiveModel {
                    tenant_id: Set(tenant_id.into_inner()),
                    link_key: Set(link.link_key.clone()),
                    account_id: Set(account_id.into_inner()),
                    updated_at: Set(now),
                }
                .insert(&self.db)
                .await
                .map_err(db_err)?;
            }
        }

        info!(
            tenant_id = %tenant_id,
            link_key = %link.link_key,
            account_id = %account_id,
            "Account linked"
        );
        Ok(link)
    }

    /// Account linked to `link_key`.
    ///
    /// # Errors
    ///
    /// `MissingLink` if nothing is linked. There is no default account.
    pub async fn resolve_link(&self, tenant_id: TenantId, link_key: &str) -> Result<Account, LedgerError> {
        let link = account_links::Entity::find_by_id((tenant_id.into_inner(), link_key.to_string()))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| LedgerError::MissingLink(link_key.to_string()))?;
        load_account(&self.db, tenant_id, AccountId::from_uuid(link.account_id)).await
    }

    async fn find_model(
        &self,
        tenant_id: TenantId,
        account_id: AccountId,
    ) -> Result<accounts::Model, LedgerError> {
        accounts::Entity::find_by_id(account_id.into_inner())
            .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::AccountNotFound(account_id))
    }

    async fn codes_in_use(&self, tenant_id: TenantId) -> Result<HashSet<String>, LedgerError> {
        let codes: Vec<String> = accounts::Entity::find()
            .select_only()
            .column(accounts::Column::Code)
            .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .order_by_asc(accounts::Column::Code)
            .into_tuple()
            .all(&self.db)
            .await
            .map_err(db_err)?;
        Ok(codes.into_iter().collect())
    }

    /// Openings can only change while the period is Open. The period row is
    /// share-locked so `start_closing` waits for the write.
    async fn ensure_period_open<C: ConnectionTrait>(
        conn: &C,
        tenant_id: TenantId,
        period_id: PeriodId,
    ) -> Result<(), LedgerError> {
        let period = load_period(conn, tenant_id, period_id, Some(LockType::Share)).await?;
        if period.status != PeriodStatus::Open {
            return Err(LedgerError::PeriodNotOpen {
                period_id,
                status: period.status,
            });
        }
        Ok(())
    }

    async fn delete_openings<C: ConnectionTrait>(
        conn: &C,
        period_id: PeriodId,
        account_id: Option<AccountId>,
    ) -> Result<(), LedgerError> {
        let mut delete = opening_balances::Entity::delete_many()
            .filter(opening_balances::Column::PeriodId.eq(period_id.into_inner()));
        if let Some(account_id) = account_id {
            delete = delete.filter(opening_balances::Column::AccountId.eq(account_id.into_inner()));
        }
        delete.exec(conn).await.map_err(db_err)?;
        Ok(())
    }
}

/// Inserts one opening balance row.
pub(crate) async fn insert_opening<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
    opening: &OpeningBalance,
) -> Result<(), LedgerError> {
    opening_balances::ActiveModel {
        id: Set(Uuid::now_v7()),
        tenant_id: Set(tenant_id.into_inner()),
        account_id: Set(opening.account_id.into_inner()),
        period_id: Set(opening.period_id.into_inner()),
        debit: Set(opening.debit),
        credit: Set(opening.credit),
        created_at: Set(Utc::now().into()),
    }
    .insert(conn)
    .await
    .map_err(db_err)?;
    Ok(())
}

/// Opening balance rows of a period.
pub(crate) async fn opening_models<C: ConnectionTrait>(
    conn: &C,
    period_id: PeriodId,
) -> Result<Vec<opening_balances::Model>, LedgerError> {
    opening_balances::Entity::find()
        .filter(opening_balances::Column::PeriodId.eq(period_id.into_inner()))
        .all(conn)
        .await
        .map_err(db_err)
}
