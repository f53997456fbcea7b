//! Database layer with `SeaORM` entities and ledger repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Repositories for accounts, journal entries, periods, balances and reports
//! - The ledger outbox
//! - Database migrations, including the integrity triggers

pub mod entities;
pub mod migration;
pub mod repositories;

pub use repositories::{
    AccountRepository, JournalRepository, LedgerRepository, OutboxRepository, PeriodRepository,
    ReportRepository,
};

use std::time::Duration;

use kosh_shared::config::DatabaseConfig;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Establishes a pooled connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    Database::connect(options).await
}
