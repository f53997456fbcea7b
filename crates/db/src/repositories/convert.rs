//! Conversions from `SeaORM` models to domain types.

use chrono::Utc;
use kosh_core::accounts::{Account, AccountCode, OpeningBalance};
use kosh_core::fiscal::FinancialPeriod;
use kosh_core::ledger::{JournalEntry, JournalLine, LedgerError};
use kosh_shared::types::{AccountId, JournalEntryId, JournalLineId, PeriodId, TenantId};

use crate::entities::{accounts, financial_periods, journal_entries, journal_lines, opening_balances};

/// Builds a domain account.
///
/// A stored code that no longer parses is reported as `Internal`: the
/// column check constraint should have rejected it on write.
pub fn account(model: accounts::Model) -> Result<Account, LedgerError> {
    let code = AccountCode::parse(&model.code).map_err(|e| {
        LedgerError::Internal(format!("stored account code {} is invalid: {e}", model.code))
    })?;
    Ok(Account {
        id: AccountId::from_uuid(model.id),
        tenant_id: TenantId::from_uuid(model.tenant_id),
        code,
        name: model.name,
        class: model.class.into(),
        parent_id: model.parent_id.map(AccountId::from_uuid),
        is_active: model.is_active,
        version: model.version,
    })
}

/// Builds a domain period.
pub fn period(model: financial_periods::Model) -> FinancialPeriod {
    FinancialPeriod {
        id: PeriodId::from_uuid(model.id),
        tenant_id: TenantId::from_uuid(model.tenant_id),
        name: model.name,
        start_date: model.start_date,
        end_date: model.end_date,
        period_type: model.period_type.into(),
        status: model.status.into(),
        closed_at: model.closed_at.map(|at| at.with_timezone(&Utc)),
    }
}

/// Builds a domain opening balance.
pub fn opening(model: &opening_balances::Model) -> OpeningBalance {
    OpeningBalance {
        account_id: AccountId::from_uuid(model.account_id),
        period_id: PeriodId::from_uuid(model.period_id),
        debit: model.debit,
        credit: model.credit,
    }
}

/// Builds a domain line.
pub fn line(model: journal_lines::Model) -> JournalLine {
    JournalLine {
        id: JournalLineId::from_uuid(model.id),
        line_number: u32::try_from(model.line_number).unwrap_or_default(),
        account_id: AccountId::from_uuid(model.account_id),
        debit: model.debit,
        credit: model.credit,
        memo: model.memo,
    }
}

/// Builds a domain entry from its header and lines.
pub fn entry(header: journal_entries::Model, lines: Vec<journal_lines::Model>) -> JournalEntry {
    let mut lines: Vec<JournalLine> = lines.into_iter().map(line).collect();
    lines.sort_by_key(|l| l.line_number);

    JournalEntry {
        id: JournalEntryId::from_uuid(header.id),
        tenant_id: TenantId::from_uuid(header.tenant_id),
        entry_number: header.entry_number,
        entry_date: header.entry_date,
        status: header.status.into(),
        reference_type: header.reference_type,
        reference_id: header.reference_id,
        narration: header.narration,
        reverses_entry_id: header.reverses_entry_id.map(JournalEntryId::from_uuid),
        reversed_by_entry_id: header.reversed_by_entry_id.map(JournalEntryId::from_uuid),
        void_reason: header.void_reason,
        posted_at: header.posted_at.map(|at| at.with_timezone(&Utc)),
        voided_at: header.voided_at.map(|at| at.with_timezone(&Utc)),
        lines,
    }
}
