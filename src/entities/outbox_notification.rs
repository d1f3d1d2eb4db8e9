use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Queued notification for the outbound gateway. Written best-effort
/// after a cut commits and drained by the outbox worker; a failure here
/// never affects the financial transaction.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "outbox_notifications")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub recipient_role: Option<String>,
    pub site_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
    pub status: String,
    pub attempts: i32,
    pub error_message: Option<String>,
    pub available_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
