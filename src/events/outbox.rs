use std::sync::Arc;

use chrono::{Duration as ChronoDuration, Utc};
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect,
};
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

use crate::entities::outbox_notification::{
    ActiveModel as OutboxActiveModel, Column as OutboxColumn, Entity as OutboxEntity,
    Model as OutboxModel,
};
use crate::errors::ServiceError;
use crate::events::{Event, EventSender};

const MAX_ATTEMPTS: i32 = 8;
const BASE_BACKOFF_SECS: i64 = 2;
const BATCH_SIZE: u64 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutboxStatus {
    Pending,
    Delivered,
    Failed,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => "pending",
            OutboxStatus::Delivered => "delivered",
            OutboxStatus::Failed => "failed",
        }
    }
}

/// Background worker that drains pending notifications and hands them to
/// the in-process event channel (the outbound gateway consumes from there).
pub async fn start_worker(db: Arc<DatabaseConnection>, sender: EventSender, poll_ms: u64) {
    tokio::spawn(async move {
        loop {
            if let Err(e) = drain_once(&db, &sender).await {
                error!("outbox worker error: {}", e);
            }
            sleep(Duration::from_millis(poll_ms)).await;
        }
    });
}

/// Claims one batch of deliverable notifications and dispatches them.
/// Failures schedule a retry with exponential backoff until attempts
/// are exhausted.
pub async fn drain_once(
    db: &DatabaseConnection,
    sender: &EventSender,
) -> Result<usize, ServiceError> {
    let now = Utc::now();
    let batch: Vec<OutboxModel> = OutboxEntity::find()
        .filter(OutboxColumn::Status.eq(OutboxStatus::Pending.as_str()))
        .filter(OutboxColumn::AvailableAt.lte(now))
        .order_by_asc(OutboxColumn::CreatedAt)
        .limit(BATCH_SIZE)
        .all(db)
        .await?;

    let mut dispatched = 0;
    for row in batch {
        let id = row.id;
        let attempts = row.attempts + 1;
        let dispatch_ok = sender.send(Event::NotificationQueued(id)).await.is_ok();

        let mut active: OutboxActiveModel = row.into();
        active.attempts = Set(attempts);
        active.updated_at = Set(Some(Utc::now()));
        if dispatch_ok {
            active.status = Set(OutboxStatus::Delivered.as_str().to_string());
            active.error_message = Set(None);
            dispatched += 1;
        } else if attempts < MAX_ATTEMPTS {
            let backoff = BASE_BACKOFF_SECS.saturating_pow(attempts as u32);
            active.status = Set(OutboxStatus::Pending.as_str().to_string());
            active.available_at = Set(Utc::now() + ChronoDuration::seconds(backoff));
            active.error_message = Set(Some("dispatch failed".to_string()));
        } else {
            active.status = Set(OutboxStatus::Failed.as_str().to_string());
            active.error_message = Set(Some("max attempts exceeded".to_string()));
        }

        if let Err(e) = active.update(db).await {
            warn!("failed updating outbox notification {}: {}", id, e);
        }
    }

    if dispatched > 0 {
        info!("dispatched {} outbox notifications", dispatched);
    }
    Ok(dispatched)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trip() {
        assert_eq!(OutboxStatus::Pending.as_str(), "pending");
        assert_eq!(OutboxStatus::Delivered.as_str(), "delivered");
        assert_eq!(OutboxStatus::Failed.as_str(), "failed");
    }

    #[test]
    fn backoff_grows_exponentially() {
        let first = BASE_BACKOFF_SECS.saturating_pow(1);
        let third = BASE_BACKOFF_SECS.saturating_pow(3);
        assert!(third > first);
    }
}
