use std::sync::Arc;

use axum::Router;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::cut_preview::CutPreviewService;
use crate::services::cuts::CutService;
use crate::services::notifications::NotificationService;
use crate::services::work_orders::WorkOrderService;
use crate::AppState;

pub mod cuts;
pub mod health;
pub mod work_orders;

/// Container for the service layer, shared by all handlers.
#[derive(Clone)]
pub struct AppServices {
    pub cuts: Arc<CutService>,
    pub previews: Arc<CutPreviewService>,
    pub work_orders: Arc<WorkOrderService>,
    pub notifications: Arc<NotificationService>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let notifications = Arc::new(NotificationService::new(db.clone()));
        let cuts = Arc::new(CutService::new(
            db.clone(),
            Some(event_sender),
            notifications.clone(),
        ));
        let previews = Arc::new(CutPreviewService::new(db.clone()));
        let work_orders = Arc::new(WorkOrderService::new(db));
        Self {
            cuts,
            previews,
            work_orders,
            notifications,
        }
    }
}

/// Builds the full API router.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest(
            "/api/v1/work-orders",
            work_orders::work_orders_router().merge(cuts::order_cuts_router()),
        )
        .nest("/api/v1/cuts", cuts::cuts_router())
        .nest("/health", health::health_router())
}
