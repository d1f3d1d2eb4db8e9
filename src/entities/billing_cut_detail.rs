use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One line's contribution to a cut. References exactly one service line
/// or one legacy order item. Price and amount are snapshots frozen at cut
/// time; never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "billing_cut_details")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub cut_id: Uuid,
    pub service_line_id: Option<Uuid>,
    pub order_item_id: Option<Uuid>,
    pub concept: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::billing_cut::Entity",
        from = "Column::CutId",
        to = "super::billing_cut::Column::Id"
    )]
    BillingCut,
}

impl Related<super::billing_cut::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BillingCut.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
