//! `SeaORM` entity definitions for the ledger schema.

pub mod account_links;
pub mod accounts;
pub mod financial_periods;
pub mod journal_entries;
pub mod journal_lines;
pub mod journal_sequences;
pub mod ledger_outbox;
pub mod opening_balances;
pub mod sea_orm_active_enums;
