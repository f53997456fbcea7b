//! Journal repository: drafts, posting, voids and reversals.
//!
//! Every write runs in one database transaction. Posting locks, in order:
//! the entry row (`FOR UPDATE`), the covering period row (`FOR SHARE`) and
//! the referenced account rows (`FOR UPDATE`, ordered by id). Posts over
//! disjoint accounts run in parallel; posts sharing an account serialise.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate, Utc};
use kosh_core::accounts::Account;
use kosh_core::ledger::{
    AccountInfo, EntryFilter, JournalEntry, JournalService, LedgerError, LedgerEvent,
    NewJournalEntry, PostDecision, ReversalService, ValidatedLine, format_entry_number,
};
use kosh_shared::config::LedgerConfig;
use kosh_shared::types::{AccountId, JournalEntryId, PageRequest, PageResponse, TenantId};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, ModelTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait,
    sea_query::{Expr, LockType},
};
use tracing::{info, warn};
use uuid::Uuid;

use super::convert;
use super::error::{db_err, is_unique_violation};
use super::outbox;
use super::period::covering_period;
use super::retry::with_retry;
use crate::entities::{
    accounts, journal_entries, journal_lines, journal_sequences,
    sea_orm_active_enums::EntryStatus,
};

/// Result of `void` and `reverse`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReversalOutcome {
    /// The original entry after the operation.
    pub original: JournalEntry,
    /// The posted reversing entry.
    pub reversal: JournalEntry,
}

/// Result of `post_or_defer`.
#[derive(Debug)]
pub struct PostOutcome {
    /// The entry, Posted on success or still Draft.
    pub entry: JournalEntry,
    /// Why posting was deferred.
    pub warning: Option<LedgerError>,
}

impl PostOutcome {
    /// Returns true if the entry was posted.
    #[must_use]
    pub fn is_posted(&self) -> bool {
        self.warning.is_none()
    }
}

/// Journal repository.
#[derive(Debug, Clone)]
pub struct JournalRepository {
    db: DatabaseConnection,
    config: LedgerConfig,
}

impl JournalRepository {
    /// Creates a new journal repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, config: LedgerConfig) -> Self {
        Self { db, config }
    }

    /// Creates a Draft entry and assigns its number.
    ///
    /// Drafts need not balance and may be dated in any period.
    ///
    /// # Errors
    ///
    /// - `EmptyEntry`, `MixedLine`, `NonPositiveAmount`, `InvalidAmountPrecision`
    /// - `AccountNotFound` for accounts outside the tenant's chart
    pub async fn create_draft(
        &self,
        tenant_id: TenantId,
        input: NewJournalEntry,
    ) -> Result<JournalEntry, LedgerError> {
        let lines = JournalService::validate_draft(&input)?;
        with_retry(&self.config.retry, "create_draft", move || {
            self.create_draft_once(tenant_id, input.clone(), lines.clone())
        })
        .await
    }

    async fn create_draft_once(
        &self,
        tenant_id: TenantId,
        input: NewJournalEntry,
        lines: Vec<ValidatedLine>,
    ) -> Result<JournalEntry, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let mut ids: Vec<AccountId> = lines.iter().map(|l| l.account_id).collect();
        ids.sort_unstable();
        ids.dedup();
        load_accounts_by_id(&txn, tenant_id, &ids, None).await?;

        let entry = insert_entry(&txn, tenant_id, &self.config.entry_number_prefix, &input, &lines, None)
            .await?;
        txn.commit().await.map_err(db_err)?;

        info!(
            tenant_id = %tenant_id,
            entry_id = %entry.id,
            entry_number = %entry.entry_number,
            reference_type = %entry.reference_type,
            "Journal entry drafted"
        );
        Ok(entry)
    }

    /// Posts a Draft.
    ///
    /// Posting a Posted entry returns it unchanged. A failed post leaves the
    /// entry Draft.
    ///
    /// # Errors
    ///
    /// - `UnbalancedEntry` with the delta
    /// - `NoPeriodForDate`, `PeriodClosed`
    /// - `InactiveAccount`
    /// - `AlreadyVoided`
    /// - `ConcurrentModification` once retries are exhausted
    pub async fn post(
        &self,
        tenant_id: TenantId,
        entry_id: JournalEntryId,
    ) -> Result<JournalEntry, LedgerError> {
        with_retry(&self.config.retry, "post", move || {
            self.post_once(tenant_id, entry_id)
        })
        .await
    }

    async fn post_once(
        &self,
        tenant_id: TenantId,
        entry_id: JournalEntryId,
    ) -> Result<JournalEntry, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let (header, entry) = load_entry(&txn, tenant_id, entry_id, Some(LockType::Update)).await?;

        if JournalService::check_post_status(&entry)? == PostDecision::AlreadyPosted {
            txn.commit().await.map_err(db_err)?;
            return Ok(entry);
        }

        let period = covering_period(&txn, tenant_id, entry.entry_date, Some(LockType::Share)).await?;
        let ids = entry.account_ids();
        let locked = load_accounts_by_id(&txn, tenant_id, &ids, Some(LockType::Update)).await?;
        let totals = JournalService::validate_posting(&entry, period.as_ref(), |id| {
            locked
                .get(&id)
                .map(|a| AccountInfo {
                    id,
                    is_active: a.is_active,
                })
                .ok_or(LedgerError::AccountNotFound(id))
        })?;

        bump_versions(&txn, &ids).await?;
        let header = mark_posted(&txn, header).await?;
        let posted = convert::entry(header, line_models(&txn, entry_id).await?);

        outbox::enqueue(
            &txn,
            tenant_id,
            &LedgerEvent::EntryPosted {
                entry_id,
                entry_number: posted.entry_number.clone(),
                entry_date: posted.entry_date,
                reference_type: posted.reference_type.clone(),
                reference_id: posted.reference_id,
                amount: totals.debit,
            },
        )
        .await?;
        txn.commit().await.map_err(db_err)?;

        info!(
            tenant_id = %tenant_id,
            entry_id = %entry_id,
            entry_number = %posted.entry_number,
            amount = %totals.debit,
            "Journal entry posted"
        );
        Ok(posted)
    }

    /// Collaborator write path: creates a draft and tries to post it.
    ///
    /// Draft validation errors are returned as errors. A posting failure is
    /// not: the Draft is returned with the failure as a warning and can be
    /// posted again later.
    pub async fn post_or_defer(
        &self,
        tenant_id: TenantId,
        input: NewJournalEntry,
    ) -> Result<PostOutcome, LedgerError> {
        let draft = self.create_draft(tenant_id, input).await?;
        match self.post(tenant_id, draft.id).await {
            Ok(entry) => Ok(PostOutcome {
                entry,
                warning: None,
            }),
            Err(err) => {
                warn!(
                    tenant_id = %tenant_id,
                    entry_id = %draft.id,
                    entry_number = %draft.entry_number,
                    error_code = err.error_code(),
                    error = %err,
                    "Posting deferred, entry left as draft"
                );
                Ok(PostOutcome {
                    entry: draft,
                    warning: Some(err),
                })
            }
        }
    }

    /// Voids a Posted entry.
    ///
    /// A mirror entry dated on the original date is posted and the original
    /// is marked Voided, in one transaction.
    ///
    /// # Errors
    ///
    /// `AlreadyVoided`, `NotPosted`, `AlreadyReversed`, and `PeriodClosed` if
    /// the original's period is no longer Open.
    pub async fn void(
        &self,
        tenant_id: TenantId,
        entry_id: JournalEntryId,
        reason: &str,
    ) -> Result<ReversalOutcome, LedgerError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(LedgerError::Validation("void reason cannot be empty".to_string()));
        }
        with_retry(&self.config.retry, "void", move || {
            self.void_once(tenant_id, entry_id, reason)
        })
        .await
    }

    async fn void_once(
        &self,
        tenant_id: TenantId,
        entry_id: JournalEntryId,
        reason: &str,
    ) -> Result<ReversalOutcome, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let (header, entry) = load_entry(&txn, tenant_id, entry_id, Some(LockType::Update)).await?;

        let period = covering_period(&txn, tenant_id, entry.entry_date, Some(LockType::Share)).await?;
        JournalService::validate_void(&entry, period.as_ref())?;

        let mirror_input = ReversalService::build_reversal(&entry, entry.entry_date, Some(reason));
        let reversal = insert_posted(
            &txn,
            tenant_id,
            &self.config.entry_number_prefix,
            &mirror_input,
            Some(entry_id),
        )
        .await?;

        let now = Utc::now().into();
        let mut active: journal_entries::ActiveModel = header.into();
        active.status = Set(EntryStatus::Voided);
        active.void_reason = Set(Some(reason.to_string()));
        active.voided_at = Set(Some(now));
        active.reversed_by_entry_id = Set(Some(reversal.id.into_inner()));
        active.updated_at = Set(now);
        let header = active.update(&txn).await.map_err(db_err)?;
        let original = convert::entry(header, line_models(&txn, entry_id).await?);

        outbox::enqueue(
            &txn,
            tenant_id,
            &LedgerEvent::EntryVoided {
                entry_id,
                reversal_entry_id: reversal.id,
                reason: reason.to_string(),
            },
        )
        .await?;
        txn.commit().await.map_err(db_err)?;

        info!(
            tenant_id = %tenant_id,
            entry_id = %entry_id,
            entry_number = %original.entry_number,
            reversal_entry_id = %reversal.id,
            reversal_entry_number = %reversal.entry_number,
            "Journal entry voided"
        );
        Ok(ReversalOutcome { original, reversal })
    }

    /// Posts a reversing entry dated `reversal_date`.
    ///
    /// The original stays Posted and is linked to its reversal.
    ///
    /// # Errors
    ///
    /// `NotPosted`, `AlreadyVoided`, `AlreadyReversed`, and `PeriodClosed`
    /// or `NoPeriodForDate` for `reversal_date`.
    pub async fn reverse(
        &self,
        tenant_id: TenantId,
        entry_id: JournalEntryId,
        reversal_date: NaiveDate,
    ) -> Result<ReversalOutcome, LedgerError> {
        with_retry(&self.config.retry, "reverse", move || {
            self.reverse_once(tenant_id, entry_id, reversal_date)
        })
        .await
    }

    async fn reverse_once(
        &self,
        tenant_id: TenantId,
        entry_id: JournalEntryId,
        reversal_date: NaiveDate,
    ) -> Result<ReversalOutcome, LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let (header, entry) = load_entry(&txn, tenant_id, entry_id, Some(LockType::Update)).await?;

        let period = covering_period(&txn, tenant_id, reversal_date, Some(LockType::Share)).await?;
        JournalService::validate_reverse(&entry, reversal_date, period.as_ref())?;

        let input = ReversalService::build_reversal(&entry, reversal_date, None);
        let reversal = insert_posted(
            &txn,
            tenant_id,
            &self.config.entry_number_prefix,
            &input,
            Some(entry_id),
        )
        .await?;

        let mut active: journal_entries::ActiveModel = header.into();
        active.reversed_by_entry_id = Set(Some(reversal.id.into_inner()));
        active.updated_at = Set(Utc::now().into());
        let header = active.update(&txn).await.map_err(db_err)?;
        let original = convert::entry(header, line_models(&txn, entry_id).await?);

        outbox::enqueue(
            &txn,
            tenant_id,
            &LedgerEvent::EntryReversed {
                entry_id,
                reversal_entry_id: reversal.id,
                reversal_date,
            },
        )
        .await?;
        txn.commit().await.map_err(db_err)?;

        info!(
            tenant_id = %tenant_id,
            entry_id = %entry_id,
            entry_number = %original.entry_number,
            reversal_entry_id = %reversal.id,
            reversal_date = %reversal_date,
            "Journal entry reversed"
        );
        Ok(ReversalOutcome { original, reversal })
    }

    /// Deletes a Draft and its lines.
    ///
    /// # Errors
    ///
    /// `CanOnlyDiscardDraft` for Posted or Voided entries.
    pub async fn discard_draft(
        &self,
        tenant_id: TenantId,
        entry_id: JournalEntryId,
    ) -> Result<(), LedgerError> {
        let txn = self.db.begin().await.map_err(db_err)?;
        let (header, entry) = load_entry(&txn, tenant_id, entry_id, Some(LockType::Update)).await?;
        JournalService::validate_discard(&entry)?;
        header.delete(&txn).await.map_err(db_err)?;
        txn.commit().await.map_err(db_err)?;

        info!(
            tenant_id = %tenant_id,
            entry_id = %entry_id,
            entry_number = %entry.entry_number,
            "Draft discarded"
        );
        Ok(())
    }

    /// Gets an entry with its lines.
    pub async fn get_entry(
        &self,
        tenant_id: TenantId,
        entry_id: JournalEntryId,
    ) -> Result<JournalEntry, LedgerError> {
        let (_, entry) = load_entry(&self.db, tenant_id, entry_id, None).await?;
        Ok(entry)
    }

    /// Drafts in entry-number order, optionally of one origin.
    pub async fn list_drafts(
        &self,
        tenant_id: TenantId,
        reference_type: Option<&str>,
    ) -> Result<Vec<JournalEntry>, LedgerError> {
        let mut query = journal_entries::Entity::find()
            .filter(journal_entries::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(journal_entries::Column::Status.eq(EntryStatus::Draft));
        if let Some(reference_type) = reference_type {
            query = query.filter(journal_entries::Column::ReferenceType.eq(reference_type));
        }
        let headers = query
            .order_by_asc(journal_entries::Column::EntryNumber)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        with_lines(&self.db, headers).await
    }

    /// Entries matching `filter`, newest first.
    pub async fn list_entries(
        &self,
        tenant_id: TenantId,
        filter: &EntryFilter,
        page: &PageRequest,
    ) -> Result<PageResponse<JournalEntry>, LedgerError> {
        let mut query = journal_entries::Entity::find()
            .filter(journal_entries::Column::TenantId.eq(tenant_id.into_inner()));
        if let Some(status) = filter.status {
            query = query.filter(journal_entries::Column::Status.eq(EntryStatus::from(status)));
        }
        if let Some(reference_type) = &filter.reference_type {
            query = query.filter(journal_entries::Column::ReferenceType.eq(reference_type.as_str()));
        }
        if let Some(date_from) = filter.date_from {
            query = query.filter(journal_entries::Column::EntryDate.gte(date_from));
        }
        if let Some(date_to) = filter.date_to {
            query = query.filter(journal_entries::Column::EntryDate.lte(date_to));
        }

        let total = query.clone().count(&self.db).await.map_err(db_err)?;
        let headers = query
            .order_by_desc(journal_entries::Column::EntryDate)
            .order_by_desc(journal_entries::Column::EntryNumber)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(db_err)?;
        let entries = with_lines(&self.db, headers).await?;

        Ok(PageResponse::new(entries, page, total))
    }
}

/// Loads an entry header and its lines, optionally locking the header.
pub(crate) async fn load_entry<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
    entry_id: JournalEntryId,
    lock: Option<LockType>,
) -> Result<(journal_entries::Model, JournalEntry), LedgerError> {
    let mut query = journal_entries::Entity::find_by_id(entry_id.into_inner())
        .filter(journal_entries::Column::TenantId.eq(tenant_id.into_inner()));
    if let Some(lock) = lock {
        query = query.lock(lock);
    }
    let header = query
        .one(conn)
        .await
        .map_err(db_err)?
        .ok_or(LedgerError::EntryNotFound(entry_id))?;
    let entry = convert::entry(header.clone(), line_models(conn, entry_id).await?);
    Ok((header, entry))
}

async fn line_models<C: ConnectionTrait>(
    conn: &C,
    entry_id: JournalEntryId,
) -> Result<Vec<journal_lines::Model>, LedgerError> {
    journal_lines::Entity::find()
        .filter(journal_lines::Column::EntryId.eq(entry_id.into_inner()))
        .order_by_asc(journal_lines::Column::LineNumber)
        .all(conn)
        .await
        .map_err(db_err)
}

async fn with_lines<C: ConnectionTrait>(
    conn: &C,
    headers: Vec<journal_entries::Model>,
) -> Result<Vec<JournalEntry>, LedgerError> {
    if headers.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = headers.iter().map(|h| h.id).collect();
    let mut by_entry: HashMap<Uuid, Vec<journal_lines::Model>> = HashMap::new();
    for line in journal_lines::Entity::find()
        .filter(journal_lines::Column::EntryId.is_in(ids))
        .all(conn)
        .await
        .map_err(db_err)?
    {
        by_entry.entry(line.entry_id).or_default().push(line);
    }

    Ok(headers
        .into_iter()
        .map(|header| {
            let lines = by_entry.remove(&header.id).unwrap_or_default();
            convert::entry(header, lines)
        })
        .collect())
}

/// Loads accounts by id, in id order.
///
/// # Errors
///
/// `AccountNotFound` for the first id missing from the tenant's chart.
pub(crate) async fn load_accounts_by_id<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
    ids: &[AccountId],
    lock: Option<LockType>,
) -> Result<HashMap<AccountId, Account>, LedgerError> {
    let mut query = accounts::Entity::find()
        .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
        .filter(accounts::Column::Id.is_in(ids.iter().map(|id| id.into_inner())))
        .order_by_asc(accounts::Column::Id);
    if let Some(lock) = lock {
        query = query.lock(lock);
    }

    let mut found = HashMap::with_capacity(ids.len());
    for model in query.all(conn).await.map_err(db_err)? {
        let account = convert::account(model)?;
        found.insert(account.id, account);
    }
    if let Some(missing) = ids.iter().find(|id| !found.contains_key(id)) {
        return Err(LedgerError::AccountNotFound(*missing));
    }
    Ok(found)
}

async fn bump_versions(txn: &DatabaseTransaction, ids: &[AccountId]) -> Result<(), LedgerError> {
    let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
    accounts::Entity::update_many()
        .col_expr(accounts::Column::Version, Expr::col(accounts::Column::Version).add(1))
        .col_expr(accounts::Column::UpdatedAt, Expr::value(now))
        .filter(accounts::Column::Id.is_in(ids.iter().map(|id| id.into_inner())))
        .exec(txn)
        .await
        .map_err(db_err)?;
    Ok(())
}

/// Claims the next number of the tenant's sequence for the entry's year.
///
/// The sequence row stays locked until the transaction ends, so numbers are
/// unique and sequential and a rolled-back entry gives its number back. A
/// discarded draft keeps its number, which leaves a gap.
async fn next_entry_number(
    txn: &DatabaseTransaction,
    tenant_id: TenantId,
    prefix: &str,
    entry_date: NaiveDate,
) -> Result<String, LedgerError> {
    let year = entry_date.year();
    let current = journal_sequences::Entity::find_by_id((tenant_id.into_inner(), year))
        .lock(LockType::Update)
        .one(txn)
        .await
        .map_err(db_err)?;

    let next = match current {
        Some(model) => {
            let next = model.last_value + 1;
            let mut active: journal_sequences::ActiveModel = model.into();
            active.last_value = Set(next);
            active.update(txn).await.map_err(db_err)?;
            next
        }
        None => {
            journal_sequences::ActiveModel {
                tenant_id: Set(tenant_id.into_inner()),
                year: Set(year),
                last_value: Set(1),
            }
            .insert(txn)
            .await
            .map_err(|e| {
                // Another transaction opened the year first.
                if is_unique_violation(&e) {
                    LedgerError::ConcurrentModification
                } else {
                    db_err(e)
                }
            })?;
            1
        }
    };

    Ok(format_entry_number(prefix, entry_date, next))
}

/// Inserts a Draft header with its lines.
async fn insert_entry(
    txn: &DatabaseTransaction,
    tenant_id: TenantId,
    prefix: &str,
    input: &NewJournalEntry,
    lines: &[ValidatedLine],
    reverses: Option<JournalEntryId>,
) -> Result<JournalEntry, LedgerError> {
    let entry_number = next_entry_number(txn, tenant_id, prefix, input.entry_date).await?;
    let entry_id = JournalEntryId::new();
    let now = Utc::now().into();

    let header = journal_entries::ActiveModel {
        id: Set(entry_id.into_inner()),
        tenant_id: Set(tenant_id.into_inner()),
        entry_number: Set(entry_number),
        entry_date: Set(input.entry_date),
        status: Set(EntryStatus::Draft),
        reference_type: Set(input.reference_type.trim().to_string()),
        reference_id: Set(input.reference_id),
        narration: Set(input.narration.clone()),
        reverses_entry_id: Set(reverses.map(JournalEntryId::into_inner)),
        reversed_by_entry_id: Set(None),
        void_reason: Set(None),
        posted_at: Set(None),
        voided_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(txn)
    .await
    .map_err(db_err)?;

    let mut line_rows = Vec::with_capacity(lines.len());
    for line in lines {
        let line_number = i32::try_from(line.line_number)
            .map_err(|_| LedgerError::Validation("too many journal lines".to_string()))?;
        let row = journal_lines::ActiveModel {
            id: Set(Uuid::now_v7()),
            entry_id: Set(entry_id.into_inner()),
            tenant_id: Set(tenant_id.into_inner()),
            line_number: Set(line_number),
            account_id: Set(line.account_id.into_inner()),
            debit: Set(line.debit),
            credit: Set(line.credit),
            memo: Set(line.memo.clone()),
        }
        .insert(txn)
        .await
        .map_err(db_err)?;
        line_rows.push(row);
    }

    Ok(convert::entry(header, line_rows))
}

async fn mark_posted(
    txn: &DatabaseTransaction,
    header: journal_entries::Model,
) -> Result<journal_entries::Model, LedgerError> {
    let now = Utc::now().into();
    let mut active: journal_entries::ActiveModel = header.into();
    active.status = Set(EntryStatus::Posted);
    active.posted_at = Set(Some(now));
    active.updated_at = Set(now);
    active.update(txn).await.map_err(db_err)
}

/// Writes and posts a system-generated entry (void mirror, reversal,
/// surplus transfer) inside `txn`.
///
/// The caller has already checked the period. Inactive accounts are
/// accepted: these entries move existing balances, they are not new
/// business.
pub(crate) async fn insert_posted(
    txn: &DatabaseTransaction,
    tenant_id: TenantId,
    prefix: &str,
    input: &NewJournalEntry,
    reverses: Option<JournalEntryId>,
) -> Result<JournalEntry, LedgerError> {
    let lines = JournalService::validate_draft(input)?;
    JournalService::ensure_balanced(&JournalService::calculate_totals(&lines))?;

    let mut ids: Vec<AccountId> = lines.iter().map(|l| l.account_id).collect();
    ids.sort_unstable();
    ids.dedup();
    load_accounts_by_id(txn, tenant_id, &ids, Some(LockType::Update)).await?;
    bump_versions(txn, &ids).await?;

    let draft = insert_entry(txn, tenant_id, prefix, input, &lines, reverses).await?;
    let header = journal_entries::Entity::find_by_id(draft.id.into_inner())
        .one(txn)
        .await
        .map_err(db_err)?
        .ok_or(LedgerError::EntryNotFound(draft.id))?;
    let header = mark_posted(txn, header).await?;

    let mut posted = draft;
    posted.status = header.status.into();
    posted.posted_at = header.posted_at.map(|at| at.with_timezone(&Utc));
    Ok(posted)
}
