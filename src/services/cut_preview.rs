use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::EntityTrait;
use serde::Serialize;
use tracing::instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::work_order;
use crate::errors::ServiceError;
use crate::services::cuts;
use crate::services::execution_ledger;
use crate::services::lines::{self, LineRef};

/// Per-concept billable suggestion returned by the preview calculation.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConceptSuggestion {
    pub line: LineRef,
    pub concept: String,
    pub contracted: Decimal,
    pub unit_price: Decimal,
    pub executed_total: Decimal,
    pub cut_previously: Decimal,
    pub executed_not_cut: Decimal,
    pub executed_in_period: Decimal,
    pub suggested_quantity: Decimal,
    pub suggested_amount: Decimal,
}

/// Read-only calculator for billable suggestions. Advisory only: the
/// authoritative check runs again inside the cut-creation transaction.
#[derive(Clone)]
pub struct CutPreviewService {
    db: Arc<DbPool>,
}

impl CutPreviewService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Computes one suggestion per line of the order. Side-effect free
    /// and idempotent; may be called arbitrarily often.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn preview(
        &self,
        order_id: Uuid,
        period: Option<(NaiveDate, NaiveDate)>,
    ) -> Result<Vec<ConceptSuggestion>, ServiceError> {
        let db = &*self.db;

        work_order::Entity::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("work order {} not found", order_id)))?;

        let billable = lines::load_billable_lines(db, order_id, false).await?;
        let cut_totals = cuts::nonvoid_cut_totals(db, order_id).await?;

        let mut suggestions = Vec::with_capacity(billable.len());
        for line in billable {
            let executed_total = execution_ledger::executed_total(db, &line.line).await?;
            let cut_previously = cut_totals
                .get(&line.line.id())
                .copied()
                .unwrap_or(Decimal::ZERO);
            let executed_not_cut = (executed_total - cut_previously).max(Decimal::ZERO);
            let executed_in_period = match period {
                Some((start, end)) => {
                    execution_ledger::executed_in_period(db, &line.line, start, end).await?
                }
                None => executed_total,
            };
            let suggested_quantity = executed_in_period
                .min(executed_not_cut)
                .min(line.contracted);
            let suggested_amount = (suggested_quantity * line.unit_price).round_dp(2);

            suggestions.push(ConceptSuggestion {
                line: line.line,
                concept: line.concept,
                contracted: line.contracted,
                unit_price: line.unit_price,
                executed_total,
                cut_previously,
                executed_not_cut,
                executed_in_period,
                suggested_quantity,
                suggested_amount,
            });
        }
        Ok(suggestions)
    }
}
