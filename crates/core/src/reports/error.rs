//! Report error types.

use chrono::NaiveDate;
use kosh_shared::types::AccountId;
use thiserror::Error;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// A posted line references an account missing from the chart.
    #[error("Posted line references unknown account {0}")]
    UnknownAccount(AccountId),

    /// Invalid date range.
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Start date.
        start: NaiveDate,
        /// End date.
        end: NaiveDate,
    },
}
