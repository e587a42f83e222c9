//! `SeaORM` Entity for the per-year workday calendar.

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "calendars")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub year: i32,
    /// `YYYYMM`
    pub month: String,
    /// `YYYYMMDD`
    #[sea_orm(unique)]
    pub date: String,
    pub week: i16,
    /// 1 = workday, 2 = rest day
    pub workday: i16,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
