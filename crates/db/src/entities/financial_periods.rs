//! `SeaORM` Entity for financial_periods table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{PeriodStatus, PeriodType};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "financial_periods")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub start_date: Date,
    pub end_date: Date,
    pub period_type: PeriodType,
    pub status: PeriodStatus,
    pub closed_at: Option<DateTimeWithTimeZone>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::opening_balances::Entity")]
    OpeningBalances,
}

impl Related<super::opening_balances::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OpeningBalances.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
