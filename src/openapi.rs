use utoipa::OpenApi;

use crate::errors::ErrorResponse;
use crate::services::cut_preview::ConceptSuggestion;
use crate::services::lines::LineRef;
use crate::services::cuts::{
    ChildOrderRef, CreateCutRequest, CutDetailRequest, CutDetailResult, CutResult, CutStatus,
    UpdateCutStatusRequest,
};
use crate::services::work_orders::{
    ChildOrderSummary, LineResponse, WorkOrderListResponse, WorkOrderResponse, WorkOrderSummary,
};

/// OpenAPI document for the billing-cut surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Work Order Billing API",
        description = "Partial billing cuts and remainder splitting for work orders"
    ),
    paths(
        crate::handlers::work_orders::list_work_orders,
        crate::handlers::work_orders::get_work_order,
        crate::handlers::cuts::preview_cut,
        crate::handlers::cuts::create_cut,
        crate::handlers::cuts::list_cuts,
        crate::handlers::cuts::get_cut,
        crate::handlers::cuts::update_cut_status,
    ),
    components(schemas(
        ErrorResponse,
        ConceptSuggestion,
        LineRef,
        CreateCutRequest,
        CutDetailRequest,
        CutDetailResult,
        CutResult,
        CutStatus,
        ChildOrderRef,
        UpdateCutStatusRequest,
        WorkOrderResponse,
        WorkOrderSummary,
        WorkOrderListResponse,
        LineResponse,
        ChildOrderSummary,
    )),
    tags(
        (name = "work-orders", description = "Work order queries"),
        (name = "cuts", description = "Partial billing cuts")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_builds() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_string(&doc).expect("serializable document");
        assert!(json.contains("/api/v1/work-orders/{id}/cuts"));
        assert!(json.contains("/api/v1/cuts/{id}/status"));
    }
}
