use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::entities::{order_item, service_line, service_line_item, work_order};
use crate::errors::ServiceError;
use crate::services::cuts;
use crate::services::lines::{self, LineRef};
use crate::services::order_status::{SplitStatus, WorkStatus};

/// Tax rate applied when recomputing order totals (IVA).
const TAX_RATE: Decimal = Decimal::from_parts(16, 0, 0, false, 2);

/// Creates the work order that carries a parent's unbilled remainder
/// forward after a cut.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChildOrderFactory;

impl ChildOrderFactory {
    /// Computes per-line remainders (contracted minus every non-void cut
    /// quantity, including the cut just written in this transaction) and,
    /// when any is positive, creates the child order. Returns `None`
    /// when the parent is fully cut.
    ///
    /// The child's parent pointer always references the top-most
    /// ancestor, so chains stay one level deep.
    #[instrument(skip(conn, parent), fields(parent_id = %parent.id))]
    pub async fn spawn_remainder_order<C: ConnectionTrait>(
        conn: &C,
        parent: &work_order::Model,
        actor_id: Uuid,
    ) -> Result<Option<work_order::Model>, ServiceError> {
        let billable = lines::load_billable_lines(conn, parent.id, false).await?;
        let cut_totals = cuts::nonvoid_cut_totals(conn, parent.id).await?;

        let remainders: Vec<(&lines::BillableLine, Decimal)> = billable
            .iter()
            .filter_map(|line| {
                let cut = cut_totals
                    .get(&line.line.id())
                    .copied()
                    .unwrap_or(Decimal::ZERO);
                let remainder = line.contracted - cut;
                (remainder > Decimal::ZERO).then_some((line, remainder))
            })
            .collect();

        if remainders.is_empty() {
            return Ok(None);
        }

        let root = match parent.parent_order_id {
            Some(root_id) => work_order::Entity::find_by_id(root_id)
                .one(conn)
                .await?
                .ok_or_else(|| {
                    ServiceError::InternalError(format!(
                        "root work order {} of {} not found",
                        root_id, parent.id
                    ))
                })?,
            None => parent.clone(),
        };

        let sibling_count = work_order::Entity::find()
            .filter(work_order::Column::ParentOrderId.eq(root.id))
            .count(conn)
            .await?;
        let split_index = sibling_count as i32 + 1;
        let folio = format!("{}-R{}", root.folio, split_index);

        let now = Utc::now();
        let child_id = Uuid::new_v4();
        let child = work_order::ActiveModel {
            id: Set(child_id),
            folio: Set(folio),
            site_id: Set(parent.site_id),
            area_id: Set(parent.area_id),
            service_type_id: Set(parent.service_type_id),
            team_lead_id: Set(parent.team_lead_id),
            description: Set(Some(format!(
                "Remainder carried over from work order {}",
                parent.folio
            ))),
            status: Set(WorkStatus::Generated.to_string()),
            split_status: Set(SplitStatus::Active.to_string()),
            quality_result: Set(None),
            parent_order_id: Set(Some(root.id)),
            split_index: Set(split_index),
            subtotal: Set(Decimal::ZERO),
            tax: Set(Decimal::ZERO),
            total: Set(Decimal::ZERO),
            created_by: Set(Some(actor_id)),
            created_at: Set(now),
            updated_at: Set(Some(now)),
            version: Set(1),
        }
        .insert(conn)
        .await?;

        let mut subtotal = Decimal::ZERO;
        for (position, (line, remainder)) in remainders.iter().enumerate() {
            match line.line {
                LineRef::ServiceLine(source_line_id) => {
                    let new_line = service_line::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        order_id: Set(child_id),
                        concept: Set(line.concept.clone()),
                        contracted_qty: Set(*remainder),
                        unit_price: Set(line.unit_price),
                        position: Set(position as i32),
                        created_at: Set(now),
                    }
                    .insert(conn)
                    .await?;

                    Self::copy_sub_items(conn, source_line_id, new_line.id, *remainder).await?;
                }
                LineRef::LegacyItem(_) => {
                    order_item::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        order_id: Set(child_id),
                        description: Set(line.concept.clone()),
                        contracted_qty: Set(*remainder),
                        unit_price: Set(line.unit_price),
                        created_at: Set(now),
                    }
                    .insert(conn)
                    .await?;
                }
            }
            subtotal += (*remainder * line.unit_price).round_dp(2);
        }

        let tax = (subtotal * TAX_RATE).round_dp(2);
        let mut active: work_order::ActiveModel = child.into();
        active.subtotal = Set(subtotal);
        active.tax = Set(tax);
        active.total = Set(subtotal + tax);
        let child = active.update(conn).await?;

        info!(
            child_id = %child.id,
            folio = %child.folio,
            lines = remainders.len(),
            "spawned remainder work order"
        );
        Ok(Some(child))
    }

    /// Recreates a line's sub-items on the child, distributing the
    /// remainder proportionally to each sub-item's share of the planned
    /// total.
    async fn copy_sub_items<C: ConnectionTrait>(
        conn: &C,
        source_line_id: Uuid,
        new_line_id: Uuid,
        remainder: Decimal,
    ) -> Result<(), ServiceError> {
        let subs = service_line_item::Entity::find()
            .filter(service_line_item::Column::ServiceLineId.eq(source_line_id))
            .order_by_asc(service_line_item::Column::Position)
            .all(conn)
            .await?;
        if subs.is_empty() {
            return Ok(());
        }

        let planned: Vec<Decimal> = subs.iter().map(|s| s.planned_qty).collect();
        let distributed = distribute_remainder(remainder, &planned);

        let now = Utc::now();
        for (sub, qty) in subs.iter().zip(distributed) {
            if qty <= Decimal::ZERO {
                continue;
            }
            service_line_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                service_line_id: Set(new_line_id),
                description: Set(sub.description.clone()),
                planned_qty: Set(qty),
                position: Set(sub.position),
                created_at: Set(now),
            }
            .insert(conn)
            .await?;
        }
        Ok(())
    }
}

/// Distributes `remainder` across sub-items proportionally to their
/// planned share (evenly when the planned total is zero). Quantities are
/// floored to whole units; the floored shortfall goes to the largest
/// sub-item so the distribution sums to the whole-unit remainder.
pub fn distribute_remainder(remainder: Decimal, planned: &[Decimal]) -> Vec<Decimal> {
    if planned.is_empty() {
        return Vec::new();
    }
    let total: Decimal = planned.iter().copied().sum();
    let count = Decimal::from(planned.len() as u64);

    let raw: Vec<Decimal> = if total.is_zero() {
        planned.iter().map(|_| remainder / count).collect()
    } else {
        planned.iter().map(|p| remainder * *p / total).collect()
    };

    let mut distributed: Vec<Decimal> = raw.iter().map(|q| q.floor()).collect();
    let assigned: Decimal = distributed.iter().copied().sum();
    let leftover = remainder.floor() - assigned;
    if leftover > Decimal::ZERO {
        let mut largest = 0;
        for (i, p) in planned.iter().enumerate() {
            if *p > planned[largest] {
                largest = i;
            }
        }
        distributed[largest] += leftover;
    }
    distributed
}
