//! Core ledger logic for Kosh.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here; `kosh-db`
//! loads rows, calls into these services and persists what they decide.
//!
//! # Modules
//!
//! - `accounts` - Chart of accounts, account codes, opening balances, links
//! - `ledger` - Double-entry journal entries, posting rules, the balance projector
//! - `fiscal` - Financial periods and period closing
//! - `reports` - Trial balance, balance sheet, profit & loss

pub mod accounts;
pub mod fiscal;
pub mod ledger;
pub mod reports;

#[cfg(test)]
mod scenarios;
