//! Ledger schema migrations.
//!
//! The schema migration creates the tables; the guard migration installs the
//! triggers that keep posted history immutable and balanced.

pub use sea_orm_migration::prelude::*;

mod m20250101_000001_ledger_schema;
mod m20250101_000002_ledger_guards;

/// Applies the ledger migrations in order.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_ledger_schema::Migration),
            Box::new(m20250101_000002_ledger_guards::Migration),
        ]
    }
}
