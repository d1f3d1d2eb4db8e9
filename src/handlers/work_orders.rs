use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    routing::get,
    Router,
};
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::{ApiResponse, AppState, ListQuery};

pub fn work_orders_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_work_orders))
        .route("/:id", get(get_work_order))
}

/// List work orders, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/work-orders",
    params(ListQuery),
    responses(
        (status = 200, description = "Paginated work orders")
    ),
    tag = "work-orders"
)]
pub async fn list_work_orders(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let response = state
        .services
        .work_orders
        .list_orders(query.page, query.limit)
        .await?;
    Ok(axum::Json(ApiResponse::success(response)))
}

/// Fetch a work order with its billable lines and spawned children.
#[utoipa::path(
    get,
    path = "/api/v1/work-orders/{id}",
    params(("id" = Uuid, Path, description = "Work order id")),
    responses(
        (status = 200, description = "Work order detail"),
        (status = 404, description = "Work order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "work-orders"
)]
pub async fn get_work_order(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let response = state.services.work_orders.get_order(id).await?;
    Ok(axum::Json(ApiResponse::success(response)))
}
