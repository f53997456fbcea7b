//! Financial period types.

use std::fmt;

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use kosh_shared::types::{PeriodId, TenantId};
use serde::{Deserialize, Serialize};

use crate::ledger::LedgerError;

/// Status of a financial period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodStatus {
    /// Period accepts postings.
    Open,
    /// Closing has started; postings are rejected.
    Closing,
    /// Period is closed and its balances carried forward.
    Closed,
}

impl PeriodStatus {
    /// Database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }

    /// Open → Closing → Closed, nothing else.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Open, Self::Closing) | (Self::Closing, Self::Closed)
        )
    }

    /// Returns true if entries dated in the period may be posted.
    #[must_use]
    pub fn allows_posting(self) -> bool {
        self == Self::Open
    }
}

impl fmt::Display for PeriodStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Length of a financial period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    /// A calendar month.
    Month,
    /// A fiscal year.
    Year,
}

impl PeriodType {
    /// Database representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Month => "month",
            Self::Year => "year",
        }
    }

    const fn months(self) -> u32 {
        match self {
            Self::Month => 1,
            Self::Year => 12,
        }
    }
}

/// A financial period of a tenant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialPeriod {
    /// Unique identifier.
    pub id: PeriodId,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Display name (e.g. "FY 2025-26", "April 2025").
    pub name: String,
    /// First day, inclusive.
    pub start_date: NaiveDate,
    /// Last day, inclusive.
    pub end_date: NaiveDate,
    /// Month or year.
    pub period_type: PeriodType,
    /// Current status.
    pub status: PeriodStatus,
    /// When the period was closed.
    pub closed_at: Option<DateTime<Utc>>,
}

impl FinancialPeriod {
    /// Returns true if the given date falls within this period.
    #[must_use]
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Returns true if `start..=end` shares at least one day with this period.
    #[must_use]
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        start <= self.end_date && end >= self.start_date
    }

    /// Date range of the period that follows this one, with the same length.
    ///
    /// Returns `None` only at the end of the calendar.
    #[must_use]
    pub fn next_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let start = self.end_date.succ_opt()?;
        let end = start
            .checked_add_months(Months::new(self.period_type.months()))?
            .pred_opt()?;
        Some((start, end))
    }

    /// Name for a period of `period_type` starting on `start`.
    #[must_use]
    pub fn name_for(period_type: PeriodType, start: NaiveDate) -> String {
        match period_type {
            PeriodType::Month => start.format("%B %Y").to_string(),
            PeriodType::Year if start.month() == 1 => format!("FY {}", start.year()),
            PeriodType::Year => {
                format!("FY {}-{:02}", start.year(), (start.year() + 1) % 100)
            }
        }
    }

    /// Returns true if closing this period ends a fiscal year.
    ///
    /// Year periods always do; a month does when the next day starts the
    /// fiscal year.
    #[must_use]
    pub fn is_year_end(&self, fiscal_year_start_month: u32) -> bool {
        match self.period_type {
            PeriodType::Year => true,
            PeriodType::Month => self
                .end_date
                .succ_opt()
                .is_some_and(|next| next.month() == fiscal_year_start_month && next.day() == 1),
        }
    }
}

/// Validates a new period against the tenant's existing periods.
///
/// # Errors
///
/// `InvalidDateRange` when `start > end`, `OverlappingPeriod` when any
/// existing period shares a day with the range.
pub fn validate_new_period(
    start: NaiveDate,
    end: NaiveDate,
    existing: &[FinancialPeriod],
) -> Result<(), LedgerError> {
    if start > end {
        return Err(LedgerError::InvalidDateRange { start, end });
    }
    if existing.iter().any(|p| p.overlaps(start, end)) {
        return Err(LedgerError::OverlappingPeriod { start, end });
    }
    Ok(())
}

/// The period covering `date`, if any.
#[must_use]
pub fn find_covering(periods: &[FinancialPeriod], date: NaiveDate) -> Option<&FinancialPeriod> {
    periods.iter().find(|p| p.contains_date(date))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn period(start: NaiveDate, end: NaiveDate, period_type: PeriodType) -> FinancialPeriod {
        FinancialPeriod {
            id: PeriodId::new(),
            tenant_id: TenantId::new(),
            name: FinancialPeriod::name_for(period_type, start),
            start_date: start,
            end_date: end,
            period_type,
            status: PeriodStatus::Open,
            closed_at: None,
        }
    }

    #[rstest]
    #[case(PeriodStatus::Open, PeriodStatus::Closing, true)]
    #[case(PeriodStatus::Closing, PeriodStatus::Closed, true)]
    #[case(PeriodStatus::Open, PeriodStatus::Closed, false)]
    #[case(PeriodStatus::Closed, PeriodStatus::Open, false)]
    #[case(PeriodStatus::Closing, PeriodStatus::Open, false)]
    fn test_status_transitions(
        #[case] from: PeriodStatus,
        #[case] to: PeriodStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed);
    }

    #[test]
    fn test_contains_date_is_inclusive() {
        let fy = period(date(2025, 4, 1), date(2026, 3, 31), PeriodType::Year);
        assert!(fy.contains_date(date(2025, 4, 1)));
        assert!(fy.contains_date(date(2026, 3, 31)));
        assert!(!fy.contains_date(date(2026, 4, 1)));
        assert!(!fy.contains_date(date(2025, 3, 31)));
    }

    #[test]
    fn test_next_range() {
        let fy = period(date(2025, 4, 1), date(2026, 3, 31), PeriodType::Year);
        assert_eq!(fy.next_range(), Some((date(2026, 4, 1), date(2027, 3, 31))));

        let jan = period(date(2025, 1, 1), date(2025, 1, 31), PeriodType::Month);
        assert_eq!(jan.next_range(), Some((date(2025, 2, 1), date(2025, 2, 28))));
    }

    #[rstest]
    #[case(PeriodType::Year, date(2025, 4, 1), "FY 2025-26")]
    #[case(PeriodType::Year, date(2099, 4, 1), "FY 2099-00")]
    #[case(PeriodType::Year, date(2025, 1, 1), "FY 2025")]
    #[case(PeriodType::Month, date(2025, 4, 1), "April 2025")]
    fn test_name_for(#[case] period_type: PeriodType, #[case] start: NaiveDate, #[case] expected: &str) {
        assert_eq!(FinancialPeriod::name_for(period_type, start), expected);
    }

    #[test]
    fn test_year_end() {
        let fy = period(date(2025, 4, 1), date(2026, 3, 31), PeriodType::Year);
        assert!(fy.is_year_end(4));

        let march = period(date(2026, 3, 1), date(2026, 3, 31), PeriodType::Month);
        assert!(march.is_year_end(4));
        assert!(!march.is_year_end(1));

        let december = period(date(2025, 12, 1), date(2025, 12, 31), PeriodType::Month);
        assert!(december.is_year_end(1));
    }

    #[test]
    fn test_validate_new_period() {
        let fy = period(date(2025, 4, 1), date(2026, 3, 31), PeriodType::Year);
        let existing = vec![fy];

        assert!(validate_new_period(date(2026, 4, 1), date(2027, 3, 31), &existing).is_ok());
        assert!(matches!(
            validate_new_period(date(2026, 3, 31), date(2027, 3, 30), &existing),
            Err(LedgerError::OverlappingPeriod { .. })
        ));
        assert!(matches!(
            validate_new_period(date(2027, 3, 31), date(2026, 4, 1), &existing),
            Err(LedgerError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn test_find_covering() {
        let fy1 = period(date(2025, 4, 1), date(2026, 3, 31), PeriodType::Year);
        let fy2 = period(date(2026, 4, 1), date(2027, 3, 31), PeriodType::Year);
        let periods = vec![fy1.clone(), fy2.clone()];

        assert_eq!(find_covering(&periods, date(2026, 4, 1)).map(|p| p.id), Some(fy2.id));
        assert_eq!(find_covering(&periods, date(2025, 12, 1)).map(|p| p.id), Some(fy1.id));
        assert!(find_covering(&periods, date(2024, 12, 1)).is_none());
    }
}
