use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A work order ("OT"): the billable unit of contracted work.
///
/// `status` tracks the business workflow; `split_status` independently
/// tracks whether the contracted quantity has been fully cut.
/// `parent_order_id` always points at the top-most ancestor, so
/// parent/child chains stay one level deep.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "work_orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[validate(length(min = 1, max = 50, message = "Folio must be between 1 and 50 characters"))]
    pub folio: String,

    pub site_id: Uuid,
    pub area_id: Option<Uuid>,
    pub service_type_id: Option<Uuid>,
    pub team_lead_id: Option<Uuid>,
    pub description: Option<String>,
    pub status: String,
    pub split_status: String,
    pub quality_result: Option<String>,
    pub parent_order_id: Option<Uuid>,
    pub split_index: i32,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::service_line::Entity")]
    ServiceLines,
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
    #[sea_orm(has_many = "super::billing_cut::Entity")]
    BillingCuts,
}

impl Related<super::service_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ServiceLines.def()
    }
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::billing_cut::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BillingCuts.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
