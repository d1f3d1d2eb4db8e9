//! Read side of the progress ledger. The entries themselves are written
//! by the progress-reporting subsystem; these are pure aggregates.

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter};

use crate::entities::execution_entry;
use crate::errors::ServiceError;
use crate::services::lines::LineRef;

fn line_condition(line: &LineRef) -> sea_orm::Condition {
    match line {
        LineRef::ServiceLine(id) => {
            sea_orm::Condition::all().add(execution_entry::Column::ServiceLineId.eq(*id))
        }
        LineRef::LegacyItem(id) => {
            sea_orm::Condition::all().add(execution_entry::Column::OrderItemId.eq(*id))
        }
    }
}

/// Total quantity ever reported against the line.
pub async fn executed_total<C: ConnectionTrait>(
    conn: &C,
    line: &LineRef,
) -> Result<Decimal, ServiceError> {
    let entries = execution_entry::Entity::find()
        .filter(line_condition(line))
        .all(conn)
        .await?;
    Ok(entries.iter().map(|e| e.quantity).sum())
}

/// Quantity reported against the line within `[start, end]` (dates,
/// inclusive).
pub async fn executed_in_period<C: ConnectionTrait>(
    conn: &C,
    line: &LineRef,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Decimal, ServiceError> {
    let window_start = start.and_time(NaiveTime::MIN).and_utc();
    let window_end = end
        .succ_opt()
        .unwrap_or(end)
        .and_time(NaiveTime::MIN)
        .and_utc();

    let entries = execution_entry::Entity::find()
        .filter(line_condition(line))
        .filter(execution_entry::Column::ReportedAt.gte(window_start))
        .filter(execution_entry::Column::ReportedAt.lt(window_end))
        .all(conn)
        .await?;
    Ok(entries.iter().map(|e| e.quantity).sum())
}
