use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbBackend, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{order_item, service_line};
use crate::errors::ServiceError;

/// Reference to a billable concept in either of the two line
/// representations. An order has service lines or legacy items, never
/// both; the splitting engine is written once against this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum LineRef {
    ServiceLine(Uuid),
    LegacyItem(Uuid),
}

impl LineRef {
    pub fn id(&self) -> Uuid {
        match self {
            LineRef::ServiceLine(id) | LineRef::LegacyItem(id) => *id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LineRef::ServiceLine(_) => "service_line",
            LineRef::LegacyItem(_) => "order_item",
        }
    }
}

/// Uniform view over a billable line, regardless of representation.
#[derive(Debug, Clone)]
pub struct BillableLine {
    pub line: LineRef,
    pub concept: String,
    pub contracted: Decimal,
    pub unit_price: Decimal,
}

/// Loads all billable lines of an order, auto-detecting which
/// representation it uses. With `lock` the rows are locked for update on
/// Postgres; SQLite serializes writers, so no lock clause is emitted there.
pub async fn load_billable_lines<C: ConnectionTrait>(
    conn: &C,
    order_id: Uuid,
    lock: bool,
) -> Result<Vec<BillableLine>, ServiceError> {
    let lock_rows = lock && conn.get_database_backend() == DbBackend::Postgres;

    let mut query = service_line::Entity::find()
        .filter(service_line::Column::OrderId.eq(order_id))
        .order_by_asc(service_line::Column::Position);
    if lock_rows {
        query = query.lock_exclusive();
    }
    let service_lines = query.all(conn).await?;

    if !service_lines.is_empty() {
        return Ok(service_lines
            .into_iter()
            .map(|l| BillableLine {
                line: LineRef::ServiceLine(l.id),
                concept: l.concept,
                contracted: l.contracted_qty,
                unit_price: l.unit_price,
            })
            .collect());
    }

    let mut query = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .order_by_asc(order_item::Column::CreatedAt);
    if lock_rows {
        query = query.lock_exclusive();
    }
    let items = query.all(conn).await?;

    Ok(items
        .into_iter()
        .map(|i| BillableLine {
            line: LineRef::LegacyItem(i.id),
            concept: i.description,
            contracted: i.contracted_qty,
            unit_price: i.unit_price,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_ref_exposes_id_and_kind() {
        let id = Uuid::new_v4();
        assert_eq!(LineRef::ServiceLine(id).id(), id);
        assert_eq!(LineRef::ServiceLine(id).kind(), "service_line");
        assert_eq!(LineRef::LegacyItem(id).kind(), "order_item");
    }

    #[test]
    fn line_ref_serializes_tagged() {
        let id = Uuid::new_v4();
        let json = serde_json::to_value(LineRef::LegacyItem(id)).unwrap();
        assert_eq!(json["kind"], "legacy_item");
        assert_eq!(json["id"], id.to_string());
    }
}
