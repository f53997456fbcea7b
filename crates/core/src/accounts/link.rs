//! Collaborator account links.
//!
//! Modules outside the ledger (donations, seva bookings, payroll) never hard
//! code account codes. They ask for the account linked to a key such as
//! `donation.general`; an unlinked key is an error, not a fallback.

use kosh_shared::types::AccountId;
use serde::{Deserialize, Serialize};

use crate::ledger::LedgerError;

/// Mapping from a link key to an account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountLink {
    /// Dotted lowercase key, e.g. `seva.archana`.
    pub link_key: String,
    /// Linked account.
    pub account_id: AccountId,
}

impl AccountLink {
    /// Validates the key and builds a link.
    pub fn new(link_key: &str, account_id: AccountId) -> Result<Self, LedgerError> {
        Self::validate_key(link_key)?;
        Ok(Self {
            link_key: link_key.to_string(),
            account_id,
        })
    }

    /// Keys are dot-separated segments of `[a-z0-9_]`.
    pub fn validate_key(key: &str) -> Result<(), LedgerError> {
        let valid = !key.is_empty()
            && key.split('.').all(|segment| {
                !segment.is_empty()
                    && segment
                        .chars()
                        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
            });
        if valid {
            Ok(())
        } else {
            Err(LedgerError::InvalidLinkKey(key.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("donation")]
    #[case("donation.general")]
    #[case("seva.archana_special.v2")]
    fn test_valid_keys(#[case] key: &str) {
        assert!(AccountLink::validate_key(key).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("Donation.General")]
    #[case("donation..general")]
    #[case(".donation")]
    #[case("donation general")]
    fn test_invalid_keys(#[case] key: &str) {
        assert!(matches!(
            AccountLink::validate_key(key),
            Err(LedgerError::InvalidLinkKey(_))
        ));
    }
}
