//! Ledger outbox.
//!
//! Events are inserted in the transaction that performs the state change.
//! An external consumer polls `pending_events` and acknowledges with
//! `mark_delivered`; delivery never blocks a posting.

use chrono::{DateTime, Utc};
use kosh_core::ledger::{LedgerError, LedgerEvent};
use kosh_shared::types::{EventId, TenantId};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, sea_query::Expr,
};

use super::error::db_err;
use crate::entities::ledger_outbox;

/// An undelivered outbox event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboxEvent {
    /// Event id, used to acknowledge delivery.
    pub id: EventId,
    /// Tenant the event belongs to.
    pub tenant_id: TenantId,
    /// Decoded payload.
    pub event: LedgerEvent,
    /// When the state change was committed.
    pub created_at: DateTime<Utc>,
}

/// Writes `event` through `conn`, normally an open transaction.
pub(crate) async fn enqueue<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
    event: &LedgerEvent,
) -> Result<EventId, LedgerError> {
    let id = EventId::new();
    let payload = serde_json::to_value(event)
        .map_err(|e| LedgerError::Internal(format!("cannot encode ledger event: {e}")))?;

    ledger_outbox::ActiveModel {
        id: Set(id.into_inner()),
        tenant_id: Set(tenant_id.into_inner()),
        event_type: Set(event.event_type().to_string()),
        aggregate_id: Set(event.aggregate_id()),
        payload: Set(payload),
        created_at: Set(Utc::now().into()),
        delivered_at: Set(None),
    }
    .insert(conn)
    .await
    .map_err(db_err)?;

    Ok(id)
}

/// Read and acknowledge side of the outbox.
#[derive(Debug, Clone)]
pub struct OutboxRepository {
    db: DatabaseConnection,
}

impl OutboxRepository {
    /// Creates a new outbox repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Oldest undelivered events of a tenant, at most `limit`.
    pub async fn pending_events(
        &self,
        tenant_id: TenantId,
        limit: u64,
    ) -> Result<Vec<OutboxEvent>, LedgerError> {
        let rows = ledger_outbox::Entity::find()
            .filter(ledger_outbox::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(ledger_outbox::Column::DeliveredAt.is_null())
            .order_by_asc(ledger_outbox::Column::CreatedAt)
            .order_by_asc(ledger_outbox::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        rows.into_iter()
            .map(|row| {
                let event: LedgerEvent = serde_json::from_value(row.payload).map_err(|e| {
                    LedgerError::Internal(format!("cannot decode outbox event {}: {e}", row.id))
                })?;
                Ok(OutboxEvent {
                    id: EventId::from_uuid(row.id),
                    tenant_id: TenantId::from_uuid(row.tenant_id),
                    event,
                    created_at: row.created_at.with_timezone(&Utc),
                })
            })
            .collect()
    }

    /// Marks events as delivered and returns how many rows changed.
    ///
    /// Already delivered ids are ignored.
    pub async fn mark_delivered(
        &self,
        tenant_id: TenantId,
        ids: &[EventId],
    ) -> Result<u64, LedgerError> {
        if ids.is_empty() {
            return Ok(0);
        }
        let now: sea_orm::prelude::DateTimeWithTimeZone = Utc::now().into();
        let result = ledger_outbox::Entity::update_many()
            .col_expr(ledger_outbox::Column::DeliveredAt, Expr::value(now))
            .filter(ledger_outbox::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(ledger_outbox::Column::Id.is_in(ids.iter().map(|id| id.into_inner())))
            .filter(ledger_outbox::Column::DeliveredAt.is_null())
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }
}
