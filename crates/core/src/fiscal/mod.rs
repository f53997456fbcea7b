//! Financial periods and period closing.

pub mod closing;
pub mod period;


pub use closing::{
    ChecklistItem, ChecklistStatus, ClosingPlan, ClosingService, ClosingSummary, NextPeriod,
};
pub use period::{FinancialPeriod, PeriodStatus, PeriodType, find_covering, validate_new_period};
