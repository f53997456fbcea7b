//! Account records.

use kosh_shared::types::{AccountId, TenantId};
use serde::{Deserialize, Serialize};

use super::class::AccountClass;
use super::code::AccountCode;

/// An account in a tenant's chart of accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier.
    pub id: AccountId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Class-prefixed code, unique per tenant.
    pub code: AccountCode,
    /// Display name.
    pub name: String,
    /// Account class.
    pub class: AccountClass,
    /// Grouping parent of the same class.
    pub parent_id: Option<AccountId>,
    /// Inactive accounts are hidden from new postings.
    pub is_active: bool,
    /// Bumped by every posting touching the account.
    pub version: i64,
}

/// Input for creating an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    /// Raw code, validated against `class`.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Account class.
    pub class: AccountClass,
    /// Optional parent.
    pub parent_id: Option<AccountId>,
}

impl NewAccount {
    /// Builds a top-level account input.
    #[must_use]
    pub fn new(code: impl Into<String>, name: impl Into<String>, class: AccountClass) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            class,
            parent_id: None,
        }
    }

    /// Sets the parent.
    #[must_use]
    pub fn with_parent(mut self, parent_id: AccountId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}
