//! Repository abstractions for data access.
//!
//! Repositories hold the `SeaORM` queries and transactions. Every rule is
//! decided by `kosh-core`; a repository loads the rows, locks what the rule
//! depends on, asks the core service, and writes the outcome.

mod convert;
mod error;
mod retry;

pub mod account;
pub mod journal;
pub mod ledger;
pub mod outbox;
pub mod period;
pub mod report;

pub use account::{AccountRepository, OpeningBalanceInput};
pub use error::{db_err, is_concurrency_conflict};
pub use journal::{JournalRepository, PostOutcome, ReversalOutcome};
pub use ledger::LedgerRepository;
pub use outbox::{OutboxEvent, OutboxRepository};
pub use period::PeriodRepository;
pub use report::ReportRepository;
pub use retry::with_retry;
