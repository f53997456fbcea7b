//! Domain events written to the ledger outbox.
//!
//! Events are recorded in the same transaction as the state change and
//! delivered later by an external consumer (receipts, SMS, dashboards).

use chrono::NaiveDate;
use kosh_shared::types::{JournalEntryId, PeriodId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A ledger state change other modules may react to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// A draft became Posted.
    EntryPosted {
        /// The entry.
        entry_id: JournalEntryId,
        /// Its number.
        entry_number: String,
        /// Its date.
        entry_date: NaiveDate,
        /// Origin of the entry.
        reference_type: String,
        /// Back-link to the originating record.
        reference_id: Option<Uuid>,
        /// Total debit (equal to total credit).
        amount: Decimal,
    },
    /// A posted entry was voided by a mirror entry.
    EntryVoided {
        /// The voided entry.
        entry_id: JournalEntryId,
        /// The mirror entry.
        reversal_entry_id: JournalEntryId,
        /// Reason given.
        reason: String,
    },
    /// A posted entry was reversed on a later date.
    EntryReversed {
        /// The original entry.
        entry_id: JournalEntryId,
        /// The reversing entry.
        reversal_entry_id: JournalEntryId,
        /// Date of the reversing entry.
        reversal_date: NaiveDate,
    },
    /// A period was closed and balances carried forward.
    PeriodClosed {
        /// The closed period.
        period_id: PeriodId,
        /// The period that received the opening balances.
        next_period_id: PeriodId,
        /// Year-end surplus transfer, if one was posted.
        surplus_entry_id: Option<JournalEntryId>,
        /// Income minus expense transferred.
        net_surplus: Decimal,
    },
}

impl LedgerEvent {
    /// Stable event type name, stored alongside the payload.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::EntryPosted { .. } => "entry_posted",
            Self::EntryVoided { .. } => "entry_voided",
            Self::EntryReversed { .. } => "entry_reversed",
            Self::PeriodClosed { .. } => "period_closed",
        }
    }

    /// Id of the entry or period the event is about.
    #[must_use]
    pub fn aggregate_id(&self) -> Uuid {
        match self {
            Self::EntryPosted { entry_id, .. }
            | Self::EntryVoided { entry_id, .. }
            | Self::EntryReversed { entry_id, .. } => entry_id.into_inner(),
            Self::PeriodClosed { period_id, .. } => period_id.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_payload_is_tagged() {
        let entry_id = JournalEntryId::new();
        let event = LedgerEvent::EntryPosted {
            entry_id,
            entry_number: "JE-2025-000001".to_string(),
            entry_date: NaiveDate::from_ymd_opt(2025, 4, 2).unwrap(),
            reference_type: "donation".to_string(),
            reference_id: None,
            amount: dec!(1000.00),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "entry_posted");
        assert_eq!(json["type"], event.event_type());
        assert_eq!(json["amount"], "1000.00");
        assert_eq!(event.aggregate_id(), entry_id.into_inner());

        let back: LedgerEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
