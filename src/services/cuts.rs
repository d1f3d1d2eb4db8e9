use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::{billing_cut, billing_cut_detail, work_order};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};
use crate::services::child_orders::ChildOrderFactory;
use crate::services::execution_ledger;
use crate::services::lines::{self, BillableLine, LineRef};
use crate::services::notifications::NotificationService;
use crate::services::order_status::{OrderStatusCoordinator, SplitStatus};

/// Attempts at finding a free folio before giving up.
const FOLIO_MAX_ATTEMPTS: u64 = 3;

/// Lifecycle of a billing cut. `draft` exists for imported data; the
/// creation flow goes straight to `ready_to_bill`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize, ToSchema)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CutStatus {
    Draft,
    ReadyToBill,
    Billed,
    Void,
}

/// Legal cut status transitions. `billed` and `void` are terminal.
pub fn is_valid_transition(from: CutStatus, to: CutStatus) -> bool {
    matches!(
        (from, to),
        (CutStatus::Draft, CutStatus::ReadyToBill)
            | (CutStatus::Draft, CutStatus::Void)
            | (CutStatus::ReadyToBill, CutStatus::Billed)
            | (CutStatus::ReadyToBill, CutStatus::Void)
    )
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CutDetailRequest {
    pub line_id: Uuid,
    pub quantity: Decimal,
}

fn default_spawn_child() -> bool {
    true
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateCutRequest {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub details: Vec<CutDetailRequest>,
    /// Create a child order for any unbilled remainder (default true).
    #[serde(default = "default_spawn_child")]
    pub spawn_child: bool,
    pub actor_id: Uuid,
    /// Idempotency key: a resubmission with the same id returns the
    /// already-created cut instead of double-billing.
    pub request_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCutStatusRequest {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ChildOrderRef {
    pub id: Uuid,
    pub folio: String,
    pub split_status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CutDetailResult {
    pub line: LineRef,
    pub concept: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CutResult {
    pub id: Uuid,
    pub folio: String,
    pub order_id: Uuid,
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    pub status: String,
    pub total_amount: Decimal,
    pub created_by: Uuid,
    pub child_order: Option<ChildOrderRef>,
    pub details: Vec<CutDetailResult>,
}

/// Sum of cut quantities per line over all non-void cuts of the order,
/// keyed by line id. Shared by the preview calculator, the validator and
/// the child order factory so all three derive the same aggregates.
pub(crate) async fn nonvoid_cut_totals<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
) -> Result<HashMap<Uuid, Decimal>, ServiceError> {
    let cut_ids: Vec<Uuid> = billing_cut::Entity::find()
        .filter(billing_cut::Column::OrderId.eq(order_id))
        .filter(billing_cut::Column::Status.ne(CutStatus::Void.to_string()))
        .all(conn)
        .await?
        .into_iter()
        .map(|c| c.id)
        .collect();

    let mut totals = HashMap::new();
    if cut_ids.is_empty() {
        return Ok(totals);
    }
    let details = billing_cut_detail::Entity::find()
        .filter(billing_cut_detail::Column::CutId.is_in(cut_ids))
        .all(conn)
        .await?;
    for detail in details {
        if let Some(line_id) = detail.service_line_id.or(detail.order_item_id) {
            *totals.entry(line_id).or_insert(Decimal::ZERO) += detail.quantity;
        }
    }
    Ok(totals)
}

/// Service for creating and querying billing cuts. Creation is the
/// transactional core: validation, persistence, child order and status
/// coordination all commit or roll back together.
#[derive(Clone)]
pub struct CutService {
    db: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    notifications: Arc<NotificationService>,
    coordinator: OrderStatusCoordinator,
}

struct ValidatedDetail {
    line: BillableLine,
    quantity: Decimal,
    amount: Decimal,
}

impl CutService {
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Option<Arc<EventSender>>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            db,
            event_sender,
            notifications,
            coordinator: OrderStatusCoordinator,
        }
    }

    /// Creates a cut against `order_id` inside a single transaction.
    ///
    /// Line rows are locked for the duration so a concurrent cut against
    /// the same order cannot read a stale billed total. Two cuts against
    /// different orders never contend.
    #[instrument(skip(self, request), fields(order_id = %order_id, actor_id = %request.actor_id))]
    pub async fn create_cut(
        &self,
        order_id: Uuid,
        request: CreateCutRequest,
    ) -> Result<CutResult, ServiceError> {
        if request.period_start > request.period_end {
            return Err(ServiceError::InvalidInput(
                "period_start must not be after period_end".to_string(),
            ));
        }

        // Idempotent replay of a duplicate submission.
        if let Some(request_id) = request.request_id {
            if let Some(existing) = billing_cut::Entity::find()
                .filter(billing_cut::Column::RequestId.eq(request_id))
                .one(&*self.db)
                .await?
            {
                info!(cut_id = %existing.id, %request_id, "duplicate cut submission replayed");
                return self.to_result(&*self.db, existing).await;
            }
        }

        let txn = self.db.begin().await?;

        let order = work_order::Entity::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("work order {} not found", order_id)))?;
        if order.split_status == SplitStatus::Canceled.to_string() {
            return Err(ServiceError::InvalidInput(format!(
                "work order {} is canceled",
                order.folio
            )));
        }

        let billable = lines::load_billable_lines(&txn, order_id, true).await?;
        let cut_totals = nonvoid_cut_totals(&txn, order_id).await?;

        let mut validated: Vec<ValidatedDetail> = Vec::new();
        let mut total = Decimal::ZERO;
        for detail in &request.details {
            let line = billable
                .iter()
                .find(|l| l.line.id() == detail.line_id)
                .ok_or_else(|| {
                    ServiceError::InvalidInput(format!(
                        "line {} does not belong to work order {}",
                        detail.line_id, order.folio
                    ))
                })?;
            if detail.quantity <= Decimal::ZERO {
                continue;
            }

            let executed_total = execution_ledger::executed_total(&txn, &line.line).await?;
            let cut_previously = cut_totals
                .get(&line.line.id())
                .copied()
                .unwrap_or(Decimal::ZERO);
            let executed_not_cut = (executed_total - cut_previously).max(Decimal::ZERO);

            if detail.quantity > executed_not_cut {
                return Err(ServiceError::OverCut {
                    concept: line.concept.clone(),
                    requested: detail.quantity,
                    available: executed_not_cut,
                });
            }
            if detail.quantity > line.contracted {
                return Err(ServiceError::OverContract {
                    concept: line.concept.clone(),
                    requested: detail.quantity,
                    contracted: line.contracted,
                });
            }

            let amount = (detail.quantity * line.unit_price).round_dp(2);
            total += amount;
            validated.push(ValidatedDetail {
                line: line.clone(),
                quantity: detail.quantity,
                amount,
            });
        }

        if validated.is_empty() {
            return Err(ServiceError::EmptyCut);
        }

        let folio = next_cut_folio(&txn, &order).await?;
        let now = Utc::now();
        let header = billing_cut::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            folio: Set(folio),
            period_start: Set(request.period_start),
            period_end: Set(request.period_end),
            status: Set(CutStatus::ReadyToBill.to_string()),
            total_amount: Set(total),
            created_by: Set(request.actor_id),
            child_order_id: Set(None),
            request_id: Set(request.request_id),
            created_at: Set(now),
            updated_at: Set(None),
        };
        let header = match header.insert(&txn).await {
            Ok(model) => model,
            Err(e) => {
                return match (e.sql_err(), request.request_id) {
                    // Lost the race on the idempotency key: the winner's
                    // cut is the result of this call.
                    (Some(SqlErr::UniqueConstraintViolation(msg)), Some(request_id))
                        if msg.contains("request_id") =>
                    {
                        txn.rollback().await.ok();
                        let existing = billing_cut::Entity::find()
                            .filter(billing_cut::Column::RequestId.eq(request_id))
                            .one(&*self.db)
                            .await?
                            .ok_or_else(|| {
                                ServiceError::Conflict(
                                    "concurrent duplicate cut submission".to_string(),
                                )
                            })?;
                        self.to_result(&*self.db, existing).await
                    }
                    (Some(SqlErr::UniqueConstraintViolation(_)), _) => Err(ServiceError::Conflict(
                        "could not allocate a unique cut folio".to_string(),
                    )),
                    _ => Err(e.into()),
                };
            }
        };

        for detail in &validated {
            let (service_line_id, order_item_id) = match detail.line.line {
                LineRef::ServiceLine(id) => (Some(id), None),
                LineRef::LegacyItem(id) => (None, Some(id)),
            };
            billing_cut_detail::ActiveModel {
                id: Set(Uuid::new_v4()),
                cut_id: Set(header.id),
                service_line_id: Set(service_line_id),
                order_item_id: Set(order_item_id),
                concept: Set(detail.line.concept.clone()),
                quantity: Set(detail.quantity),
                unit_price: Set(detail.line.unit_price),
                amount: Set(detail.amount),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }

        let child = if request.spawn_child {
            ChildOrderFactory::spawn_remainder_order(&txn, &order, request.actor_id).await?
        } else {
            None
        };
        let remainder_exists = if request.spawn_child {
            child.is_some()
        } else {
            has_positive_remainder(&txn, &billable, order_id).await?
        };

        let header = if let Some(child_order) = &child {
            let mut active: billing_cut::ActiveModel = header.into();
            active.child_order_id = Set(Some(child_order.id));
            active.update(&txn).await?
        } else {
            header
        };

        self.coordinator
            .close_out_cut(&txn, &order, child.is_some(), remainder_exists)
            .await?;

        txn.commit().await?;

        info!(
            cut_id = %header.id,
            folio = %header.folio,
            total = %total,
            child_spawned = child.is_some(),
            "billing cut created"
        );

        self.emit_post_commit(&order, &header, child.as_ref(), remainder_exists)
            .await;

        self.to_result(&*self.db, header).await
    }

    /// Post-commit side effects. Best-effort: failures are logged and
    /// never roll back or fail the committed cut.
    async fn emit_post_commit(
        &self,
        order: &work_order::Model,
        cut: &billing_cut::Model,
        child: Option<&work_order::Model>,
        remainder_exists: bool,
    ) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::CutCreated {
                    cut_id: cut.id,
                    order_id: order.id,
                    total_amount: cut.total_amount,
                })
                .await
            {
                warn!(cut_id = %cut.id, "failed to send cut created event: {}", e);
            }
            if let Some(child_order) = child {
                if let Err(e) = sender
                    .send(Event::ChildOrderSpawned {
                        parent_order_id: order.id,
                        child_order_id: child_order.id,
                    })
                    .await
                {
                    warn!(order_id = %order.id, "failed to send child spawned event: {}", e);
                }
            }
            if !remainder_exists {
                if let Err(e) = sender.send(Event::WorkOrderClosed(order.id)).await {
                    warn!(order_id = %order.id, "failed to send order closed event: {}", e);
                }
            }
        }

        let link = format!("/work-orders/{}/cuts/{}", order.id, cut.id);
        self.notifications
            .notify_role(
                "billing",
                order.site_id,
                "Billing cut created",
                &format!(
                    "Cut {} for work order {} is ready to bill (total {})",
                    cut.folio, order.folio, cut.total_amount
                ),
                Some(link.clone()),
            )
            .await;
        if let Some(team_lead) = order.team_lead_id {
            self.notifications
                .notify_user(
                    team_lead,
                    "Work order cut",
                    &format!("A billing cut was taken on work order {}", order.folio),
                    Some(link),
                )
                .await;
        }
    }

    #[instrument(skip(self), fields(cut_id = %cut_id))]
    pub async fn get_cut(&self, cut_id: Uuid) -> Result<CutResult, ServiceError> {
        let cut = billing_cut::Entity::find_by_id(cut_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("cut {} not found", cut_id)))?;
        self.to_result(&*self.db, cut).await
    }

    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn list_cuts(&self, order_id: Uuid) -> Result<Vec<CutResult>, ServiceError> {
        work_order::Entity::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("work order {} not found", order_id)))?;

        let cuts = billing_cut::Entity::find()
            .filter(billing_cut::Column::OrderId.eq(order_id))
            .order_by_asc(billing_cut::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        futures::future::try_join_all(cuts.into_iter().map(|cut| self.to_result(&*self.db, cut)))
            .await
    }

    /// Applies a status transition to a cut. Anything outside the
    /// transition table is rejected; voiding never reopens the parent
    /// order or removes a spawned child.
    #[instrument(skip(self), fields(cut_id = %cut_id, new_status = %new_status))]
    pub async fn update_status(
        &self,
        cut_id: Uuid,
        new_status: CutStatus,
    ) -> Result<CutResult, ServiceError> {
        let cut = billing_cut::Entity::find_by_id(cut_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("cut {} not found", cut_id)))?;

        let current: CutStatus = cut.status.parse().map_err(|_| {
            ServiceError::InternalError(format!("cut {} has unknown status '{}'", cut.id, cut.status))
        })?;
        if !is_valid_transition(current, new_status) {
            return Err(ServiceError::IllegalTransition {
                from: current.to_string(),
                to: new_status.to_string(),
            });
        }

        let old_status = cut.status.clone();
        let mut active: billing_cut::ActiveModel = cut.into();
        active.status = Set(new_status.to_string());
        active.updated_at = Set(Some(Utc::now()));
        let updated = active.update(&*self.db).await?;

        info!(%old_status, "cut status updated");
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::CutStatusChanged {
                    cut_id,
                    old_status,
                    new_status: new_status.to_string(),
                })
                .await
            {
                warn!(%cut_id, "failed to send cut status event: {}", e);
            }
        }

        self.to_result(&*self.db, updated).await
    }

    /// Assembles the caller-facing view of a cut.
    async fn to_result<C: ConnectionTrait>(
        &self,
        conn: &C,
        cut: billing_cut::Model,
    ) -> Result<CutResult, ServiceError> {
        let details = billing_cut_detail::Entity::find()
            .filter(billing_cut_detail::Column::CutId.eq(cut.id))
            .order_by_asc(billing_cut_detail::Column::CreatedAt)
            .all(conn)
            .await?;

        let child_order = match cut.child_order_id {
            Some(child_id) => work_order::Entity::find_by_id(child_id)
                .one(conn)
                .await?
                .map(|c| ChildOrderRef {
                    id: c.id,
                    folio: c.folio,
                    split_status: c.split_status,
                }),
            None => None,
        };

        let details = details
            .into_iter()
            .filter_map(|d| {
                let line = match (d.service_line_id, d.order_item_id) {
                    (Some(id), _) => Some(LineRef::ServiceLine(id)),
                    (None, Some(id)) => Some(LineRef::LegacyItem(id)),
                    (None, None) => None,
                };
                line.map(|line| CutDetailResult {
                    line,
                    concept: d.concept,
                    quantity: d.quantity,
                    unit_price: d.unit_price,
                    amount: d.amount,
                })
            })
            .collect();

        Ok(CutResult {
            id: cut.id,
            folio: cut.folio,
            order_id: cut.order_id,
            period_start: cut.period_start,
            period_end: cut.period_end,
            status: cut.status,
            total_amount: cut.total_amount,
            created_by: cut.created_by,
            child_order,
            details,
        })
    }
}

/// Next folio for a cut on this order: `<order-folio>-C<seq>`, zero-padded
/// so folios sort by creation order, sequence monotonic per order. The
/// sequence is derived under the caller's line locks; the probe loop skips
/// folios left by historical gaps and the unique index on
/// `billing_cuts.folio` backs the final insert.
async fn next_cut_folio<C: ConnectionTrait>(
    conn: &C,
    order: &work_order::Model,
) -> Result<String, ServiceError> {
    let existing = billing_cut::Entity::find()
        .filter(billing_cut::Column::OrderId.eq(order.id))
        .count(conn)
        .await?;

    for attempt in 0..FOLIO_MAX_ATTEMPTS {
        let candidate = format!("{}-C{:03}", order.folio, existing + 1 + attempt);
        let taken = billing_cut::Entity::find()
            .filter(billing_cut::Column::Folio.eq(&candidate))
            .count(conn)
            .await?;
        if taken == 0 {
            return Ok(candidate);
        }
        warn!(folio = %candidate, "cut folio already taken, retrying");
    }
    Err(ServiceError::Conflict(
        "could not allocate a unique cut folio".to_string(),
    ))
}

/// Whether any line still has contracted quantity not covered by a
/// non-void cut. Used when the caller opted out of spawning a child.
async fn has_positive_remainder<C: ConnectionTrait>(
    conn: &C,
    billable: &[BillableLine],
    order_id: Uuid,
) -> Result<bool, ServiceError> {
    let totals = nonvoid_cut_totals(conn, order_id).await?;
    Ok(billable.iter().any(|line| {
        let cut = totals
            .get(&line.line.id())
            .copied()
            .unwrap_or(Decimal::ZERO);
        line.contracted - cut > Decimal::ZERO
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cut_status_string_round_trip() {
        for status in [
            CutStatus::Draft,
            CutStatus::ReadyToBill,
            CutStatus::Billed,
            CutStatus::Void,
        ] {
            let parsed: CutStatus = status.to_string().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert_eq!(CutStatus::ReadyToBill.to_string(), "ready_to_bill");
    }

    #[test]
    fn transition_table() {
        assert!(is_valid_transition(CutStatus::Draft, CutStatus::ReadyToBill));
        assert!(is_valid_transition(CutStatus::Draft, CutStatus::Void));
        assert!(is_valid_transition(CutStatus::ReadyToBill, CutStatus::Billed));
        assert!(is_valid_transition(CutStatus::ReadyToBill, CutStatus::Void));

        assert!(!is_valid_transition(CutStatus::Billed, CutStatus::Void));
        assert!(!is_valid_transition(CutStatus::Void, CutStatus::ReadyToBill));
        assert!(!is_valid_transition(CutStatus::Billed, CutStatus::ReadyToBill));
        // same-status requests are not a legal transition either
        assert!(!is_valid_transition(CutStatus::ReadyToBill, CutStatus::ReadyToBill));
    }
}
