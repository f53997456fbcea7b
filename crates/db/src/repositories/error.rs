//! Mapping of database errors onto `LedgerError`.

use kosh_core::ledger::LedgerError;
use sea_orm::{DbErr, RuntimeErr, SqlErr};

/// SQLSTATE of a serialization failure.
const SERIALIZATION_FAILURE: &str = "40001";
/// SQLSTATE of a detected deadlock.
const DEADLOCK_DETECTED: &str = "40P01";
/// SQLSTATE of an exclusion constraint violation.
const EXCLUSION_VIOLATION: &str = "23P01";

/// Converts a `DbErr` into a `LedgerError`.
///
/// Serialization failures and deadlocks become `ConcurrentModification` so
/// the retry loop picks them up; everything else is `Database`.
pub fn db_err(err: DbErr) -> LedgerError {
    if is_concurrency_conflict(&err) {
        LedgerError::ConcurrentModification
    } else {
        LedgerError::Database(err.to_string())
    }
}

/// Returns true for SQLSTATE 40001 and 40P01.
pub fn is_concurrency_conflict(err: &DbErr) -> bool {
    sqlstate(err).is_some_and(|code| code == SERIALIZATION_FAILURE || code == DEADLOCK_DETECTED)
}

/// Returns true if the error is a unique constraint violation.
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

/// Returns true for SQLSTATE 23P01, raised by the period overlap constraint.
pub fn is_exclusion_violation(err: &DbErr) -> bool {
    sqlstate(err).is_some_and(|code| code == EXCLUSION_VIOLATION)
}

fn sqlstate(err: &DbErr) -> Option<String> {
    let runtime = match err {
        DbErr::Exec(e) | DbErr::Query(e) | DbErr::Conn(e) => e,
        _ => return None,
    };
    match runtime {
        RuntimeErr::SqlxError(e) => e
            .as_database_error()
            .and_then(|db| db.code())
            .map(|code| code.into_owned()),
        _ => None,
    }
}
