use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Immutable progress-ledger entry reported against exactly one line
/// (`service_line_id` or `order_item_id`). Owned by the progress-reporting
/// subsystem; this service only reads aggregates. `request_id` is the
/// upstream idempotency key.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "execution_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub order_id: Uuid,
    pub service_line_id: Option<Uuid>,
    pub order_item_id: Option<Uuid>,
    pub quantity: Decimal,
    pub unit_price_snapshot: Decimal,
    pub reported_by: Uuid,
    pub reported_at: DateTime<Utc>,
    pub request_id: Uuid,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::service_line::Entity",
        from = "Column::ServiceLineId",
        to = "super::service_line::Column::Id"
    )]
    ServiceLine,
    #[sea_orm(
        belongs_to = "super::order_item::Entity",
        from = "Column::OrderItemId",
        to = "super::order_item::Column::Id"
    )]
    OrderItem,
}

impl ActiveModelBehavior for ActiveModel {}
