use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ActiveValue::Set};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::db::DbPool;
use crate::entities::outbox_notification;
use crate::errors::ServiceError;
use crate::events::outbox::OutboxStatus;

/// Queues notifications for the outbound gateway. Every method is
/// fire-and-forget: a failure is logged and swallowed, never surfaced to
/// the caller, because these run after the financial transaction has
/// committed.
#[derive(Clone)]
pub struct NotificationService {
    db: Arc<DbPool>,
}

impl NotificationService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Notify every user holding `role` at the given site.
    #[instrument(skip(self, message, link))]
    pub async fn notify_role(
        &self,
        role: &str,
        site_id: Uuid,
        title: &str,
        message: &str,
        link: Option<String>,
    ) {
        if let Err(e) = self
            .enqueue(Some(role.to_string()), Some(site_id), None, title, message, link)
            .await
        {
            warn!(role, %site_id, "failed to queue role notification: {}", e);
        }
    }

    /// Notify a single user.
    #[instrument(skip(self, message, link))]
    pub async fn notify_user(&self, user_id: Uuid, title: &str, message: &str, link: Option<String>) {
        if let Err(e) = self
            .enqueue(None, None, Some(user_id), title, message, link)
            .await
        {
            warn!(%user_id, "failed to queue user notification: {}", e);
        }
    }

    async fn enqueue(
        &self,
        recipient_role: Option<String>,
        site_id: Option<Uuid>,
        user_id: Option<Uuid>,
        title: &str,
        message: &str,
        link: Option<String>,
    ) -> Result<(), ServiceError> {
        let now = Utc::now();
        outbox_notification::ActiveModel {
            id: Set(Uuid::new_v4()),
            recipient_role: Set(recipient_role),
            site_id: Set(site_id),
            user_id: Set(user_id),
            title: Set(title.to_string()),
            message: Set(message.to_string()),
            link: Set(link),
            status: Set(OutboxStatus::Pending.as_str().to_string()),
            attempts: Set(0),
            error_message: Set(None),
            available_at: Set(now),
            created_at: Set(now),
            updated_at: Set(None),
        }
        .insert(&*self.db)
        .await?;
        Ok(())
    }
}
