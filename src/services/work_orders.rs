use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::work_order;
use crate::errors::ServiceError;
use crate::services::lines::{self, LineRef};

#[derive(Debug, Serialize, ToSchema)]
pub struct LineResponse {
    pub line: LineRef,
    pub concept: String,
    pub contracted: Decimal,
    pub unit_price: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChildOrderSummary {
    pub id: Uuid,
    pub folio: String,
    pub split_index: i32,
    pub split_status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WorkOrderResponse {
    pub id: Uuid,
    pub folio: String,
    pub site_id: Uuid,
    pub description: Option<String>,
    pub status: String,
    pub split_status: String,
    pub quality_result: Option<String>,
    pub parent_order_id: Option<Uuid>,
    pub split_index: i32,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
    pub lines: Vec<LineResponse>,
    pub children: Vec<ChildOrderSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WorkOrderListResponse {
    pub orders: Vec<WorkOrderSummary>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WorkOrderSummary {
    pub id: Uuid,
    pub folio: String,
    pub status: String,
    pub split_status: String,
    pub total: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Read-side queries over work orders: the surface used to inspect
/// parents, spawned children and billable lines.
#[derive(Clone)]
pub struct WorkOrderService {
    db: Arc<DbPool>,
}

impl WorkOrderService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_order(&self, order_id: Uuid) -> Result<WorkOrderResponse, ServiceError> {
        let db = &*self.db;
        let order = work_order::Entity::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("work order {} not found", order_id)))?;

        let billable = lines::load_billable_lines(db, order_id, false).await?;
        let children = work_order::Entity::find()
            .filter(work_order::Column::ParentOrderId.eq(order_id))
            .order_by_asc(work_order::Column::SplitIndex)
            .all(db)
            .await?;

        Ok(WorkOrderResponse {
            id: order.id,
            folio: order.folio,
            site_id: order.site_id,
            description: order.description,
            status: order.status,
            split_status: order.split_status,
            quality_result: order.quality_result,
            parent_order_id: order.parent_order_id,
            split_index: order.split_index,
            subtotal: order.subtotal,
            tax: order.tax,
            total: order.total,
            created_at: order.created_at,
            lines: billable
                .into_iter()
                .map(|l| LineResponse {
                    line: l.line,
                    concept: l.concept,
                    contracted: l.contracted,
                    unit_price: l.unit_price,
                })
                .collect(),
            children: children
                .into_iter()
                .map(|c| ChildOrderSummary {
                    id: c.id,
                    folio: c.folio,
                    split_index: c.split_index,
                    split_status: c.split_status,
                })
                .collect(),
        })
    }

    #[instrument(skip(self))]
    pub async fn list_orders(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<WorkOrderListResponse, ServiceError> {
        let db = &*self.db;
        let paginator = work_order::Entity::find()
            .order_by_desc(work_order::Column::CreatedAt)
            .paginate(db, per_page.max(1));

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(WorkOrderListResponse {
            orders: orders
                .into_iter()
                .map(|o| WorkOrderSummary {
                    id: o.id,
                    folio: o.folio,
                    status: o.status,
                    split_status: o.split_status,
                    total: o.total,
                    created_at: o.created_at,
                })
                .collect(),
            total,
            page,
            per_page,
        })
    }
}
