//! Double-entry bookkeeping logic.
//!
//! This module implements the journal engine and the read-side projector:
//! - Journal entries and lines
//! - Draft validation and posting rules
//! - Void and reversal entries
//! - Balance and running-balance projection
//! - Outbox events
//! - Error types for ledger operations

pub mod entry;
pub mod error;
pub mod events;
pub mod projector;
pub mod reversal;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use entry::{JournalEntry, JournalLine, format_entry_number};
pub use error::{ErrorCategory, LedgerError};
pub use events::LedgerEvent;
pub use projector::{
    AccountLedger, Activity, BalanceAnchor, LedgerBalance, LedgerRow, PostedLine, Projector,
};
pub use reversal::ReversalService;
pub use service::{AccountInfo, JournalService, PostDecision};
pub use types::{
    EntryFilter, EntryStatus, EntryTotals, EntryType, JournalLineInput, NewJournalEntry,
    ValidatedLine, reference_types,
};
