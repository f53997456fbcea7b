//! Financial periods and period closing.

use chrono::{NaiveDate, Utc};
use kosh_core::accounts::{AccountCode, OpeningTotals};
use kosh_core::fiscal::{
    ChecklistItem, ChecklistStatus, ClosingService, ClosingSummary, FinancialPeriod, NextPeriod,
    PeriodStatus, PeriodType, validate_new_period,
};
use kosh_core::ledger::{LedgerError, LedgerEvent, NewJournalEntry, reference_types};
use kosh_shared::config::LedgerConfig;
use kosh_shared::types::{JournalEntryId, PeriodId, TenantId};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait, sea_query::LockType,
};
use tracing::info;

use super::account::{insert_opening, opening_models};
use super::convert;
use super::error::{db_err, is_exclusion_violation};
use super::journal::insert_posted;
use super::ledger::project_all;
use super::outbox;
use super::retry::with_retry;
use crate::entities::{
    accounts, financial_periods, journal_entries, opening_balances,
    sea_orm_active_enums::{EntryStatus, PeriodStatus as DbPeriodStatus},
};

/// Loads a period, optionally locking its row.
///
/// # Errors
///
/// `PeriodNotFound` if the tenant has no such period.
pub(crate) async fn load_period<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
    period_id: PeriodId,
    lock: Option<LockType>,
) -> Result<FinancialPeriod, LedgerError> {
    let mut query = financial_periods::Entity::find_by_id(period_id.into_inner())
        .filter(financial_periods::Column::TenantId.eq(tenant_id.into_inner()));
    if let Some(lock) = lock {
        query = query.lock(lock);
    }
    query
        .one(conn)
        .await
        .map_err(db_err)?
        .map(convert::period)
        .ok_or(LedgerError::PeriodNotFound(period_id))
}

/// The period covering `date`, optionally locking its row.
pub(crate) async fn covering_period<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
    date: NaiveDate,
    lock: Option<LockType>,
) -> Result<Option<FinancialPeriod>, LedgerError> {
    let mut query = financial_periods::Entity::find()
        .filter(financial_periods::Column::TenantId.eq(tenant_id.into_inner()))
        .filter(financial_periods::Column::StartDate.lte(date))
        .filter(financial_periods::Column::EndDate.gte(date));
    if let Some(lock) = lock {
        query = query.lock(lock);
    }
    Ok(query.one(conn).await.map_err(db_err)?.map(convert::period))
}

async fn load_periods<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
) -> Result<Vec<FinancialPeriod>, LedgerError> {
    Ok(financial_periods::Entity::find()
        .filter(financial_periods::Column::TenantId.eq(tenant_id.into_inner()))
        .order_by_asc(financial_periods::Column::StartDate)
        .all(conn)
        .await
        .map_err(db_err)?
        .into_iter()
        .map(convert::period)
        .collect())
}

async fn insert_period<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
    name: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
    period_type: PeriodType,
) -> Result<FinancialPeriod, LedgerError> {
    let now = Utc::now().into();
    let model = financial_periods::ActiveModel {
        id: Set(PeriodId::new().into_inner()),
        tenant_id: Set(tenant_id.into_inner()),
        name: Set(name.trim().to_string()),
        start_date: Set(start_date),
        end_date: Set(end_date),
        period_type: Set(period_type.into()),
        status: Set(DbPeriodStatus::Open),
        closed_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await
    .map_err(|e| {
        // Lost a race against another insert of an overlapping range.
        if is_exclusion_violation(&e) {
            LedgerError::OverlappingPeriod {
                start: start_date,
                end: end_date,
            }
        } else {
            db_err(e)
        }
    })?;
    Ok(convert::period(model))
}

async fn set_status<C: ConnectionTrait>(
    conn: &C,
    period_id: PeriodId,
    status: PeriodStatus,
) -> Result<FinancialPeriod, LedgerError> {
    let now = Utc::now().into();
    let active = financial_periods::ActiveModel {
        id: Set(period_id.into_inner()),
        status: Set(status.into()),
        closed_at: Set((status == PeriodStatus::Closed).then_some(now)),
        updated_at: Set(now),
        ..Default::default()
    };
    Ok(convert::period(active.update(conn).await.map_err(db_err)?))
}

/// Gathers earlier periods, drafts dated inside the period, balances and
/// openings, and returns the blocking checklist items.
async fn checklist<C: ConnectionTrait>(
    conn: &C,
    period: &FinancialPeriod,
) -> Result<Vec<ChecklistItem>, LedgerError> {
    let draft_numbers: Vec<String> = journal_entries::Entity::find()
        .select_only()
        .column(journal_entries::Column::EntryNumber)
        .filter(journal_entries::Column::TenantId.eq(period.tenant_id.into_inner()))
        .filter(journal_entries::Column::Status.eq(EntryStatus::Draft))
        .filter(journal_entries::Column::EntryDate.between(period.start_date, period.end_date))
        .order_by_asc(journal_entries::Column::EntryNumber)
        .into_tuple()
        .all(conn)
        .await
        .map_err(db_err)?;

    let (_, balances) = project_all(conn, period.tenant_id, period.end_date).await?;
    let openings: Vec<_> = opening_models(conn, period.id)
        .await?
        .iter()
        .map(convert::opening)
        .collect();

    let periods = load_periods(conn, period.tenant_id).await?;

    Ok(ClosingService::run_checklist(
        period,
        &periods,
        &draft_numbers,
        &balances,
        OpeningTotals::of(&openings),
    ))
}

/// Period repository.
#[derive(Debug, Clone)]
pub struct PeriodRepository {
    db: DatabaseConnection,
    config: LedgerConfig,
}

impl PeriodRepository {
    /// Creates a new period repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, config: LedgerConfig) -> Self {
        Self { db, config }
    }

    /// Creates an Open period.
    ///
    /// # Errors
    ///
    /// `InvalidDateRange` when `start_date > end_date`, `OverlappingPeriod`
    /// when any existing period of the tenant shares a day with the range.
    pub async fn create_period(
        &self,
        tenant_id: TenantId,
        name: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
        period_type: PeriodType,
    ) -> Result<FinancialPeriod, LedgerError> {
        if name.trim().is_empty() {
            return Err(LedgerError::Validation("period name cannot be empty".to_string()));
        }
        let existing = load_periods(&self.db, tenant_id).await?;
        validate_new_period(start_date, end_date, &existing)?;

        let period = insert_period(&self.db, tenant_id, name, start_date, end_date, period_type).await?;
        info!(
            tenant_id = %tenant_id,
            period_id = %period.id,
            name = %period.name,
            start_date = %start_date,
            end_date = %end_date,
            "Financial period created"
        );
        Ok(period)
    }

    /// Gets a period.
    pub async fn get_period(
        &self,
        tenant_id: TenantId,
        period_id: PeriodId,
    ) -> Result<FinancialPeriod, LedgerError> {
        load_period(&self.db, tenant_id, period_id, None).await
    }

    /// Periods of the tenant by start date.
    pub async fn list_periods(&self, tenant_id: TenantId) -> Result<Vec<FinancialPeriod>, LedgerError> {
        load_periods(&self.db, tenant_id).await
    }

    /// The period covering `date`, if any.
    pub async fn find_covering(
        &self,
        tenant_id: TenantId,
        date: NaiveDate,
    ) -> Result<Option<FinancialPeriod>, LedgerError> {
        covering_period(&self.db, tenant_id, date, None).await
    }

    /// Moves an Open period to Closing and reports the checklist.
    ///
    /// Posting into the period is refused from here on.
    ///
    /// # Errors
    ///
    /// `InvalidPeriodTransition` unless the period is Open.
    pub async fn start_closing(
        &self,
        tenant_id: TenantId,
        period_id: PeriodId,
    ) -> Result<ChecklistStatus, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let period = load_period(&txn, tenant_id, period_id, Some(LockType::Update)).await?;
        ClosingService::validate_start_closing(&period)?;
        let period = set_status(&txn, period_id, PeriodStatus::Closing).await?;
        txn.commit().await.map_err(db_err)?;

        info!(
            tenant_id = %tenant_id,
            period_id = %period_id,
            name = %period.name,
            "Period closing started"
        );

        // Posts queued behind the period lock now see Closing and fail.
        let items = checklist(&self.db, &period).await?;
        Ok(ChecklistStatus {
            period_id,
            status: period.status,
            items,
        })
    }

    /// Re-runs the checklist of a Closing period.
    pub async fn run_closing_checklist(
        &self,
        tenant_id: TenantId,
        period_id: PeriodId,
    ) -> Result<ChecklistStatus, LedgerError> {
        let period = load_period(&self.db, tenant_id, period_id, None).await?;
        let items = checklist(&self.db, &period).await?;
        Ok(ChecklistStatus {
            period_id,
            status: period.status,
            items,
        })
    }

    /// Closes a Closing period.
    ///
    /// In one transaction: checks the checklist, posts the surplus transfer
    /// on a year-end close, writes the next period's opening balances
    /// (creating that period when needed) and marks the period Closed.
    ///
    /// # Errors
    ///
    /// - `InvalidPeriodTransition` unless the period is Closing
    /// - `ChecklistIncomplete` with the blocking items
    /// - `AccountCodeNotFound` if the surplus account is missing
    /// - `PeriodNotOpen` if the following period is already Closed
    pub async fn close_period(
        &self,
        tenant_id: TenantId,
        period_id: PeriodId,
    ) -> Result<ClosingSummary, LedgerError> {
        with_retry(&self.config.retry, "close_period", move || {
            self.close_period_once(tenant_id, period_id)
        })
        .await
    }

    async fn close_period_once(
        &self,
        tenant_id: TenantId,
        period_id: PeriodId,
    ) -> Result<ClosingSummary, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let period = load_period(&txn, tenant_id, period_id, Some(LockType::Update)).await?;
        let items = checklist(&txn, &period).await?;
        ClosingService::validate_close(&period, items)?;

        let surplus_code = AccountCode::parse(&self.config.surplus_account_code).map_err(|e| {
            LedgerError::Validation(format!(
                "configured surplus account code {} is invalid: {e}",
                self.config.surplus_account_code
            ))
        })?;
        let surplus_account = accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(accounts::Column::Code.eq(surplus_code.as_str()))
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| LedgerError::AccountCodeNotFound(surplus_code.to_string()))
            .and_then(convert::account)?;

        let existing = load_periods(&txn, tenant_id).await?;
        let next_period_id = match ClosingService::next_period(&period, &existing)? {
            NextPeriod::Existing(id) => id,
            NextPeriod::Create {
                name,
                start_date,
                end_date,
                period_type,
            } => {
                let next = insert_period(&txn, tenant_id, &name, start_date, end_date, period_type).await?;
                info!(
                    tenant_id = %tenant_id,
                    period_id = %next.id,
                    name = %next.name,
                    "Next financial period created"
                );
                next.id
            }
        };

        let year_end = period.is_year_end(self.config.fiscal_year_start_month);
        let (_, balances) = project_all(&txn, tenant_id, period.end_date).await?;
        let plan = ClosingService::plan(
            next_period_id,
            balances,
            (surplus_account.id, surplus_account.class),
            year_end,
        )?;

        let mut surplus_entry_id: Option<JournalEntryId> = None;
        if !plan.surplus_lines.is_empty() {
            let input = NewJournalEntry {
                entry_date: period.end_date,
                reference_type: reference_types::PERIOD_CLOSE.to_string(),
                reference_id: Some(period.id.into_inner()),
                narration: ClosingService::surplus_narration(&period),
                lines: plan.surplus_lines.clone(),
            };
            let entry = insert_posted(&txn, tenant_id, &self.config.entry_number_prefix, &input, None).await?;
            surplus_entry_id = Some(entry.id);
        }

        // Carried balances replace whatever the next period held.
        opening_balances::Entity::delete_many()
            .filter(opening_balances::Column::PeriodId.eq(next_period_id.into_inner()))
            .exec(&txn)
            .await
            .map_err(db_err)?;
        for opening in &plan.openings {
            insert_opening(&txn, tenant_id, opening).await?;
        }

        set_status(&txn, period_id, PeriodStatus::Closed).await?;
        outbox::enqueue(
            &txn,
            tenant_id,
            &LedgerEvent::PeriodClosed {
                period_id,
                next_period_id,
                surplus_entry_id,
                net_surplus: plan.net_surplus,
            },
        )
        .await?;
        txn.commit().await.map_err(db_err)?;

        info!(
            tenant_id = %tenant_id,
            period_id = %period_id,
            next_period_id = %next_period_id,
            year_end,
            net_surplus = %plan.net_surplus,
            openings = plan.openings.len(),
            "Period closed"
        );

        Ok(ClosingSummary {
            period_id,
            next_period_id,
            closing_balances: plan.closing_balances,
            surplus_entry_id,
            net_surplus: plan.net_surplus,
            openings_carried: plan.openings.len(),
        })
    }
}
