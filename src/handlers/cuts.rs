use axum::{
    extract::{Json, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::errors::ServiceError;
use crate::services::cuts::{CreateCutRequest, CutStatus, UpdateCutStatusRequest};
use crate::{ApiResponse, AppState};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PreviewParams {
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
}

/// Cut routes scoped under a work order.
pub fn order_cuts_router() -> Router<AppState> {
    Router::new()
        .route("/:id/cuts", get(list_cuts).post(create_cut))
        .route("/:id/cuts/preview", get(preview_cut))
}

/// Cut routes addressed by cut id.
pub fn cuts_router() -> Router<AppState> {
    Router::new()
        .route("/:id", get(get_cut))
        .route("/:id/status", put(update_cut_status))
}

/// Preview what is billable on a work order, optionally restricted to a
/// period. Read-only; the authoritative check runs at creation time.
#[utoipa::path(
    get,
    path = "/api/v1/work-orders/{id}/cuts/preview",
    params(
        ("id" = Uuid, Path, description = "Work order id"),
        PreviewParams
    ),
    responses(
        (status = 200, description = "Per-concept billable suggestions"),
        (status = 404, description = "Work order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "cuts"
)]
pub async fn preview_cut(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(params): Query<PreviewParams>,
) -> Result<impl IntoResponse, ServiceError> {
    let period = match (params.period_start, params.period_end) {
        (Some(start), Some(end)) => Some((start, end)),
        (None, None) => None,
        _ => {
            return Err(ServiceError::InvalidInput(
                "period_start and period_end must be supplied together".to_string(),
            ))
        }
    };
    let suggestions = state.services.previews.preview(id, period).await?;
    Ok(axum::Json(ApiResponse::success(suggestions)))
}

/// Create a billing cut against a work order.
#[utoipa::path(
    post,
    path = "/api/v1/work-orders/{id}/cuts",
    params(("id" = Uuid, Path, description = "Work order id")),
    request_body = CreateCutRequest,
    responses(
        (status = 201, description = "Cut created"),
        (status = 404, description = "Work order not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Business validation failure", body = crate::errors::ErrorResponse)
    ),
    tag = "cuts"
)]
pub async fn create_cut(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateCutRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let result = state.services.cuts.create_cut(id, payload).await?;
    Ok((StatusCode::CREATED, axum::Json(ApiResponse::success(result))))
}

/// List all cuts of a work order, oldest first.
#[utoipa::path(
    get,
    path = "/api/v1/work-orders/{id}/cuts",
    params(("id" = Uuid, Path, description = "Work order id")),
    responses(
        (status = 200, description = "Cuts of the order"),
        (status = 404, description = "Work order not found", body = crate::errors::ErrorResponse)
    ),
    tag = "cuts"
)]
pub async fn list_cuts(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let results = state.services.cuts.list_cuts(id).await?;
    Ok(axum::Json(ApiResponse::success(results)))
}

/// Fetch one cut with its detail rows and child order reference.
#[utoipa::path(
    get,
    path = "/api/v1/cuts/{id}",
    params(("id" = Uuid, Path, description = "Cut id")),
    responses(
        (status = 200, description = "Cut detail"),
        (status = 404, description = "Cut not found", body = crate::errors::ErrorResponse)
    ),
    tag = "cuts"
)]
pub async fn get_cut(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let result = state.services.cuts.get_cut(id).await?;
    Ok(axum::Json(ApiResponse::success(result)))
}

/// Transition a cut's status (`ready_to_bill -> billed`, voiding, ...).
#[utoipa::path(
    put,
    path = "/api/v1/cuts/{id}/status",
    params(("id" = Uuid, Path, description = "Cut id")),
    request_body = UpdateCutStatusRequest,
    responses(
        (status = 200, description = "Cut updated"),
        (status = 404, description = "Cut not found", body = crate::errors::ErrorResponse),
        (status = 422, description = "Illegal transition", body = crate::errors::ErrorResponse)
    ),
    tag = "cuts"
)]
pub async fn update_cut_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCutStatusRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let new_status: CutStatus = payload.status.parse().map_err(|_| {
        ServiceError::ValidationError(format!("unknown cut status '{}'", payload.status))
    })?;
    let result = state.services.cuts.update_status(id, new_status).await?;
    Ok(axum::Json(ApiResponse::success(result)))
}
