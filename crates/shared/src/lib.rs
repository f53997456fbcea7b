//! Shared types and configuration for Kosh.
//!
//! Everything the ledger crates agree on without depending on each other:
//! typed identifiers, currency precision rules, pagination and the layered
//! application configuration.

pub mod config;
pub mod types;

pub use config::AppConfig;
