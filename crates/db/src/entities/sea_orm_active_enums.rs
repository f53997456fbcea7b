//! `SeaORM` active enums mirroring the Postgres enum types.

use kosh_core::accounts::AccountClass as CoreAccountClass;
use kosh_core::fiscal::{PeriodStatus as CorePeriodStatus, PeriodType as CorePeriodType};
use kosh_core::ledger::EntryStatus as CoreEntryStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "account_class")]
pub enum AccountClass {
    #[sea_orm(string_value = "asset")]
    Asset,
    #[sea_orm(string_value = "liability")]
    Liability,
    #[sea_orm(string_value = "equity")]
    Equity,
    #[sea_orm(string_value = "income")]
    Income,
    #[sea_orm(string_value = "expense")]
    Expense,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "entry_status")]
pub enum EntryStatus {
    #[sea_orm(string_value = "draft")]
    Draft,
    #[sea_orm(string_value = "posted")]
    Posted,
    #[sea_orm(string_value = "voided")]
    Voided,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "period_status")]
pub enum PeriodStatus {
    #[sea_orm(string_value = "open")]
    Open,
    #[sea_orm(string_value = "closing")]
    Closing,
    #[sea_orm(string_value = "closed")]
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "period_type")]
pub enum PeriodType {
    #[sea_orm(string_value = "month")]
    Month,
    #[sea_orm(string_value = "year")]
    Year,
}

impl From<CoreAccountClass> for AccountClass {
    fn from(class: CoreAccountClass) -> Self {
        match class {
            CoreAccountClass::Asset => Self::Asset,
            CoreAccountClass::Liability => Self::Liability,
            CoreAccountClass::Equity => Self::Equity,
            CoreAccountClass::Income => Self::Income,
            CoreAccountClass::Expense => Self::Expense,
        }
    }
}

impl From<AccountClass> for CoreAccountClass {
    fn from(class: AccountClass) -> Self {
        match class {
            AccountClass::Asset => Self::Asset,
            AccountClass::Liability => Self::Liability,
            AccountClass::Equity => Self::Equity,
            AccountClass::Income => Self::Income,
            AccountClass::Expense => Self::Expense,
        }
    }
}

impl From<CoreEntryStatus> for EntryStatus {
    fn from(status: CoreEntryStatus) -> Self {
        match status {
            CoreEntryStatus::Draft => Self::Draft,
            CoreEntryStatus::Posted => Self::Posted,
            CoreEntryStatus::Voided => Self::Voided,
        }
    }
}

impl From<EntryStatus> for CoreEntryStatus {
    fn from(status: EntryStatus) -> Self {
        match status {
            EntryStatus::Draft => Self::Draft,
            EntryStatus::Posted => Self::Posted,
            EntryStatus::Voided => Self::Voided,
        }
    }
}

impl From<CorePeriodStatus> for PeriodStatus {
    fn from(status: CorePeriodStatus) -> Self {
        match status {
            CorePeriodStatus::Open => Self::Open,
            CorePeriodStatus::Closing => Self::Closing,
            CorePeriodStatus::Closed => Self::Closed,
        }
    }
}

impl From<PeriodStatus> for CorePeriodStatus {
    fn from(status: PeriodStatus) -> Self {
        match status {
            PeriodStatus::Open => Self::Open,
            PeriodStatus::Closing => Self::Closing,
            PeriodStatus::Closed => Self::Closed,
        }
    }
}

impl From<CorePeriodType> for PeriodType {
    fn from(period_type: CorePeriodType) -> Self {
        match period_type {
            CorePeriodType::Month => Self::Month,
            CorePeriodType::Year => Self::Year,
        }
    }
}

impl From<PeriodType> for CorePeriodType {
    fn from(period_type: PeriodType) -> Self {
        match period_type {
            PeriodType::Month => Self::Month,
            PeriodType::Year => Self::Year,
        }
    }
}
