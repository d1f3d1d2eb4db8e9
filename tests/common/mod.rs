#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ActiveValue::Set};
use tokio::sync::mpsc;
use uuid::Uuid;

use workorder_billing_api::{
    config::AppConfig,
    db::{self, DbPool},
    entities::{execution_entry, order_item, service_line, service_line_item, work_order},
    events::{self, EventSender},
    handlers::{self, AppServices},
    AppState,
};

/// Test harness backed by an in-memory SQLite database with a single
/// pooled connection.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let pool = db::establish_connection(&cfg)
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");
        let db = Arc::new(pool);

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(db.clone(), Arc::new(event_sender.clone()));
        let state = AppState {
            db,
            config: cfg,
            event_sender,
            services,
        };
        let router = handlers::api_router().with_state(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    pub fn db(&self) -> &DbPool {
        &self.state.db
    }
}

/// Inserts a work order with no lines.
pub async fn seed_work_order(db: &DbPool, folio: &str) -> work_order::Model {
    let now = Utc::now();
    work_order::ActiveModel {
        id: Set(Uuid::new_v4()),
        folio: Set(folio.to_string()),
        site_id: Set(Uuid::new_v4()),
        area_id: Set(Some(Uuid::new_v4())),
        service_type_id: Set(Some(Uuid::new_v4())),
        team_lead_id: Set(Some(Uuid::new_v4())),
        description: Set(Some("Fiber deployment".to_string())),
        status: Set("in_progress".to_string()),
        split_status: Set("active".to_string()),
        quality_result: Set(None),
        parent_order_id: Set(None),
        split_index: Set(0),
        subtotal: Set(Decimal::ZERO),
        tax: Set(Decimal::ZERO),
        total: Set(Decimal::ZERO),
        created_by: Set(Some(Uuid::new_v4())),
        created_at: Set(now),
        updated_at: Set(Some(now)),
        version: Set(1),
    }
    .insert(db)
    .await
    .expect("failed to seed work order")
}

/// Inserts a service line (multi-service representation).
pub async fn seed_service_line(
    db: &DbPool,
    order_id: Uuid,
    concept: &str,
    contracted: Decimal,
    unit_price: Decimal,
) -> service_line::Model {
    service_line::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        concept: Set(concept.to_string()),
        contracted_qty: Set(contracted),
        unit_price: Set(unit_price),
        position: Set(0),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("failed to seed service line")
}

/// Inserts a sub-item under a service line.
pub async fn seed_sub_item(
    db: &DbPool,
    service_line_id: Uuid,
    description: &str,
    planned: Decimal,
    position: i32,
) -> service_line_item::Model {
    service_line_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        service_line_id: Set(service_line_id),
        description: Set(description.to_string()),
        planned_qty: Set(planned),
        position: Set(position),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("failed to seed sub item")
}

/// Inserts a legacy order item.
pub async fn seed_order_item(
    db: &DbPool,
    order_id: Uuid,
    description: &str,
    contracted: Decimal,
    unit_price: Decimal,
) -> order_item::Model {
    order_item::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        description: Set(description.to_string()),
        contracted_qty: Set(contracted),
        unit_price: Set(unit_price),
        created_at: Set(Utc::now()),
    }
    .insert(db)
    .await
    .expect("failed to seed order item")
}

/// Reports executed quantity against a service line.
pub async fn report_execution(
    db: &DbPool,
    order_id: Uuid,
    service_line_id: Uuid,
    quantity: Decimal,
    unit_price: Decimal,
) -> execution_entry::Model {
    report_execution_at(db, order_id, Some(service_line_id), None, quantity, unit_price, Utc::now())
        .await
}

/// Reports executed quantity against a legacy item.
pub async fn report_item_execution(
    db: &DbPool,
    order_id: Uuid,
    order_item_id: Uuid,
    quantity: Decimal,
    unit_price: Decimal,
) -> execution_entry::Model {
    report_execution_at(db, order_id, None, Some(order_item_id), quantity, unit_price, Utc::now())
        .await
}

/// Reports executed quantity with an explicit timestamp.
pub async fn report_execution_at(
    db: &DbPool,
    order_id: Uuid,
    service_line_id: Option<Uuid>,
    order_item_id: Option<Uuid>,
    quantity: Decimal,
    unit_price: Decimal,
    reported_at: chrono::DateTime<Utc>,
) -> execution_entry::Model {
    execution_entry::ActiveModel {
        id: Set(Uuid::new_v4()),
        order_id: Set(order_id),
        service_line_id: Set(service_line_id),
        order_item_id: Set(order_item_id),
        quantity: Set(quantity),
        unit_price_snapshot: Set(unit_price),
        reported_by: Set(Uuid::new_v4()),
        reported_at: Set(reported_at),
        request_id: Set(Uuid::new_v4()),
    }
    .insert(db)
    .await
    .expect("failed to seed execution entry")
}
