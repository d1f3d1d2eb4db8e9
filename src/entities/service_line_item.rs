use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sub-item of a service line; `planned_qty` drives the proportional
/// distribution when a remainder order is spawned.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "service_line_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub service_line_id: Uuid,
    pub description: String,
    pub planned_qty: Decimal,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::service_line::Entity",
        from = "Column::ServiceLineId",
        to = "super::service_line::Column::Id"
    )]
    ServiceLine,
}

impl Related<super::service_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ServiceLine.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
