//! Validated account codes.
//!
//! A code is a 4- or 5-digit base whose leading digit encodes the account
//! class, optionally followed by `-`-separated numeric sub-segments
//! (`1100`, `41000`, `1100-02`). Journal lines reference accounts by id, so
//! moving between the 4-digit and 5-digit schemes only rewrites codes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::class::AccountClass;

/// Errors produced while parsing or remapping an account code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountCodeError {
    /// Empty or whitespace-only code.
    #[error("Account code cannot be empty")]
    Empty,

    /// Code does not follow the `NNNN[N](-N+)*` layout.
    #[error("Invalid account code format: {0}")]
    InvalidFormat(String),

    /// Leading digit belongs to another class.
    #[error("Account code {code} does not belong to class {class}")]
    ClassMismatch {
        /// The offending code.
        code: String,
        /// The class the account was declared with.
        class: AccountClass,
    },

    /// A 5-digit code with a significant last digit has no 4-digit form.
    #[error("Account code {0} cannot be expressed in the 4-digit scheme")]
    NotRemappable(String),
}

/// Numbering scheme of a code's base segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeScheme {
    /// `CGNN`: class, group, two-digit serial.
    FourDigit,
    /// `CGSNN`: class, group, subgroup, two-digit serial.
    FiveDigit,
}

impl CodeScheme {
    const fn base_len(self) -> usize {
        match self {
            Self::FourDigit => 4,
            Self::FiveDigit => 5,
        }
    }
}

/// A parsed, class-prefixed account code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountCode(String);

impl AccountCode {
    /// Parses a code, checking layout only.
    pub fn parse(raw: &str) -> Result<Self, AccountCodeError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AccountCodeError::Empty);
        }

        let mut segments = trimmed.split('-');
        let base = segments.next().unwrap_or_default();
        let base_ok = matches!(base.len(), 4 | 5)
            && base.chars().all(|c| c.is_ascii_digit())
            && base
                .chars()
                .next()
                .and_then(AccountClass::from_code_prefix)
                .is_some();
        let rest_ok = segments.all(|s| {
            (1..=4).contains(&s.len()) && s.chars().all(|c| c.is_ascii_digit())
        });

        if !base_ok || !rest_ok {
            return Err(AccountCodeError::InvalidFormat(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Parses a code and checks that it belongs to `class`.
    pub fn parse_for(raw: &str, class: AccountClass) -> Result<Self, AccountCodeError> {
        let code = Self::parse(raw)?;
        if code.class() != class {
            return Err(AccountCodeError::ClassMismatch {
                code: code.0,
                class,
            });
        }
        Ok(code)
    }

    /// The code as stored.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Class encoded by the leading digit.
    #[must_use]
    pub fn class(&self) -> AccountClass {
        self.0
            .chars()
            .next()
            .and_then(AccountClass::from_code_prefix)
            .unwrap_or(AccountClass::Asset)
    }

    fn base(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }

    fn suffix(&self) -> &str {
        let base_len = self.base().len();
        &self.0[base_len..]
    }

    /// Scheme of the base segment.
    #[must_use]
    pub fn scheme(&self) -> CodeScheme {
        if self.base().len() == CodeScheme::FiveDigit.base_len() {
            CodeScheme::FiveDigit
        } else {
            CodeScheme::FourDigit
        }
    }

    /// Rewrites the code into `scheme`.
    ///
    /// 4 -> 5 appends a zero serial digit (`1100` -> `11000`); 5 -> 4 drops it
    /// and fails when that digit is significant. Sub-segments are kept.
    pub fn remap(&self, scheme: CodeScheme) -> Result<Self, AccountCodeError> {
        if self.scheme() == scheme {
            return Ok(self.clone());
        }
        let base = self.base();
        let new_base = match scheme {
            CodeScheme::FiveDigit => format!("{base}0"),
            CodeScheme::FourDigit => base
                .strip_suffix('0')
                .map(str::to_string)
                .ok_or_else(|| AccountCodeError::NotRemappable(self.0.clone()))?,
        };
        Ok(Self(format!("{new_base}{}", self.suffix())))
    }
}

impl TryFrom<String> for AccountCode {
    type Error = AccountCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AccountCode> for String {
    fn from(code: AccountCode) -> Self {
        code.0
    }
}

impl std::fmt::Display for AccountCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for AccountCode {
    type Err = AccountCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("1100", AccountClass::Asset, CodeScheme::FourDigit)]
    #[case("41000", AccountClass::Income, CodeScheme::FiveDigit)]
    #[case("5100-02", AccountClass::Expense, CodeScheme::FourDigit)]
    #[case(" 2100 ", AccountClass::Liability, CodeScheme::FourDigit)]
    fn test_parse_valid(
        #[case] raw: &str,
        #[case] class: AccountClass,
        #[case] scheme: CodeScheme,
    ) {
        let code = AccountCode::parse(raw).unwrap();
        assert_eq!(code.class(), class);
        assert_eq!(code.scheme(), scheme);
        assert_eq!(code.as_str(), raw.trim());
    }

    #[rstest]
    #[case("110")]
    #[case("110000")]
    #[case("9100")]
    #[case("0100")]
    #[case("11a0")]
    #[case("1100-")]
    #[case("1100-12345")]
    #[case("1100--1")]
    fn test_parse_invalid_format(#[case] raw: &str) {
        assert!(matches!(
            AccountCode::parse(raw),
            Err(AccountCodeError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(AccountCode::parse("  "), Err(AccountCodeError::Empty));
    }

    #[test]
    fn test_parse_for_rejects_wrong_class() {
        let err = AccountCode::parse_for("4100", AccountClass::Asset).unwrap_err();
        assert_eq!(
            err,
            AccountCodeError::ClassMismatch {
                code: "4100".to_string(),
                class: AccountClass::Asset,
            }
        );
        assert!(AccountCode::parse_for("4100", AccountClass::Income).is_ok());
    }

    #[rstest]
    #[case("1100", CodeScheme::FiveDigit, "11000")]
    #[case("1100-02", CodeScheme::FiveDigit, "11000-02")]
    #[case("41000", CodeScheme::FourDigit, "4100")]
    #[case("3100", CodeScheme::FourDigit, "3100")]
    fn test_remap(#[case] raw: &str, #[case] scheme: CodeScheme, #[case] expected: &str) {
        let code = AccountCode::parse(raw).unwrap();
        let remapped = code.remap(scheme).unwrap();
        assert_eq!(remapped.as_str(), expected);
        assert_eq!(remapped.class(), code.class());
    }

    #[test]
    fn test_remap_rejects_significant_digit() {
        let code = AccountCode::parse("41005").unwrap();
        assert_eq!(
            code.remap(CodeScheme::FourDigit),
            Err(AccountCodeError::NotRemappable("41005".to_string()))
        );
    }

    #[test]
    fn test_four_five_four_is_identity() {
        let code = AccountCode::parse("5230-1").unwrap();
        let back = code
            .remap(CodeScheme::FiveDigit)
            .and_then(|c| c.remap(CodeScheme::FourDigit))
            .unwrap();
        assert_eq!(back, code);
    }

    #[test]
    fn test_serde_validates() {
        let code: AccountCode = serde_json::from_str("\"1100\"").unwrap();
        assert_eq!(code.as_str(), "1100");
        assert!(serde_json::from_str::<AccountCode>("\"cash\"").is_err());
    }
}
