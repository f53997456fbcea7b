//! Financial report generation.
//!
//! Pure functions over the chart of accounts, opening anchors and posted
//! lines:
//! - Trial Balance
//! - Balance Sheet (with unclosed current surplus)
//! - Profit & Loss

pub mod error;
pub mod service;
pub mod types;


pub use error::ReportError;
pub use service::ReportService;
pub use types::*;
