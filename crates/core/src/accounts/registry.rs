//! Chart-of-accounts rules.
//!
//! Stateless checks run by the persistence layer before it writes account
//! rows. Lookups it cannot answer itself (does a code exist, does an account
//! have postings) are passed in.

use std::collections::HashMap;

use kosh_shared::types::AccountId;

use super::account::{Account, NewAccount};
use super::class::AccountClass;
use super::code::{AccountCode, CodeScheme};
use crate::ledger::LedgerError;

/// Stateless service for chart-of-accounts validation.
pub struct AccountRegistry;

impl AccountRegistry {
    /// Validates a new account and returns its parsed code.
    ///
    /// # Errors
    ///
    /// - `InvalidAccountCode` if the code is malformed or belongs to another class
    /// - `DuplicateCode` if `code_exists` reports the code as taken
    /// - `InvalidHierarchy` if the parent's class differs
    pub fn validate_new_account<F>(
        input: &NewAccount,
        parent: Option<&Account>,
        code_exists: F,
    ) -> Result<AccountCode, LedgerError>
    where
        F: Fn(&AccountCode) -> bool,
    {
        if input.name.trim().is_empty() {
            return Err(LedgerError::Validation(
                "account name cannot be empty".to_string(),
            ));
        }

        let code = AccountCode::parse_for(&input.code, input.class)?;
        if code_exists(&code) {
            return Err(LedgerError::DuplicateCode(code.to_string()));
        }

        if let Some(parent) = parent {
            Self::validate_hierarchy(parent, input.class)?;
        }

        Ok(code)
    }

    /// A parent must be of the same class as its child.
    pub fn validate_hierarchy(parent: &Account, child: AccountClass) -> Result<(), LedgerError> {
        if parent.class != child {
            return Err(LedgerError::InvalidHierarchy {
                parent: parent.class,
                child,
            });
        }
        Ok(())
    }

    /// Validates renaming an account's code.
    ///
    /// The code is frozen once any journal line references the account.
    pub fn validate_code_change<F>(
        account: &Account,
        new_code: &str,
        has_postings: bool,
        code_exists: F,
    ) -> Result<AccountCode, LedgerError>
    where
        F: Fn(&AccountCode) -> bool,
    {
        if has_postings {
            return Err(LedgerError::CodeInUse(account.id));
        }
        let code = AccountCode::parse_for(new_code, account.class)?;
        if code != account.code && code_exists(&code) {
            return Err(LedgerError::DuplicateCode(code.to_string()));
        }
        Ok(code)
    }

    /// Rejects inactive accounts for new postings.
    pub fn ensure_postable(account: &Account) -> Result<(), LedgerError> {
        if account.is_active {
            Ok(())
        } else {
            Err(LedgerError::InactiveAccount(account.id))
        }
    }

    /// Remaps every code of a chart into `scheme`.
    ///
    /// Returns only the accounts whose code changes. Fails without partial
    /// output if any code cannot be remapped or two accounts would collide.
    pub fn remap_chart(
        accounts: &[Account],
        scheme: CodeScheme,
    ) -> Result<Vec<(AccountId, AccountCode)>, LedgerError> {
        let mut seen: HashMap<AccountCode, AccountId> = HashMap::with_capacity(accounts.len());
        let mut changed = Vec::new();

        for account in accounts {
            let remapped = account.code.remap(scheme)?;
            if let Some(other) = seen.insert(remapped.clone(), account.id) {
                if other != account.id {
                    return Err(LedgerError::DuplicateCode(remapped.to_string()));
                }
            }
            if remapped != account.code {
                changed.push((account.id, remapped));
            }
        }

        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kosh_shared::types::TenantId;

    fn account(code: &str, class: AccountClass) -> Account {
        Account {
            id: AccountId::new(),
            tenant_id: TenantId::new(),
            code: AccountCode::parse(code).unwrap(),
            name: format!("Account {code}"),
            class,
            parent_id: None,
            is_active: true,
            version: 0,
        }
    }

    #[test]
    fn test_new_account_ok() {
        let input = NewAccount::new("1110", "Hundi Cash", AccountClass::Asset);
        let parent = account("1100", AccountClass::Asset);
        let code = AccountRegistry::validate_new_account(&input, Some(&parent), |_| false).unwrap();
        assert_eq!(code.as_str(), "1110");
    }

    #[test]
    fn test_duplicate_code() {
        let input = NewAccount::new("1100", "Cash", AccountClass::Asset);
        let err = AccountRegistry::validate_new_account(&input, None, |c| c.as_str() == "1100")
            .unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateCode(code) if code == "1100"));
    }

    #[test]
    fn test_income_cannot_parent_asset() {
        let input = NewAccount::new("1110", "Cash", AccountClass::Asset);
        let parent = account("4100", AccountClass::Income);
        let err = AccountRegistry::validate_new_account(&input, Some(&parent), |_| false)
            .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::InvalidHierarchy {
                parent: AccountClass::Income,
                child: AccountClass::Asset,
            }
        ));
    }

    #[test]
    fn test_code_must_match_class() {
        let input = NewAccount::new("4100", "Cash", AccountClass::Asset);
        let err = AccountRegistry::validate_new_account(&input, None, |_| false).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAccountCode(_)));
    }

    #[test]
    fn test_code_frozen_after_postings() {
        let cash = account("1100", AccountClass::Asset);
        let err = AccountRegistry::validate_code_change(&cash, "1101", true, |_| false).unwrap_err();
        assert!(matches!(err, LedgerError::CodeInUse(id) if id == cash.id));
        assert!(AccountRegistry::validate_code_change(&cash, "1101", false, |_| false).is_ok());
    }

    #[test]
    fn test_inactive_not_postable() {
        let mut cash = account("1100", AccountClass::Asset);
        assert!(AccountRegistry::ensure_postable(&cash).is_ok());
        cash.is_active = false;
        assert!(matches!(
            AccountRegistry::ensure_postable(&cash),
            Err(LedgerError::InactiveAccount(_))
        ));
    }

    #[test]
    fn test_remap_chart_to_five_digits() {
        let chart = vec![
            account("1100", AccountClass::Asset),
            account("41000", AccountClass::Income),
            account("5100", AccountClass::Expense),
        ];
        let changed = AccountRegistry::remap_chart(&chart, CodeScheme::FiveDigit).unwrap();
        let codes: Vec<&str> = changed.iter().map(|(_, c)| c.as_str()).collect();
        assert_eq!(codes, vec!["11000", "51000"]);
    }

    #[test]
    fn test_remap_chart_detects_collisions() {
        let chart = vec![
            account("1100", AccountClass::Asset),
            account("11000", AccountClass::Asset),
        ];
        let err = AccountRegistry::remap_chart(&chart, CodeScheme::FiveDigit).unwrap_err();
        assert!(matches!(err, LedgerError::DuplicateCode(code) if code == "11000"));
    }
}
