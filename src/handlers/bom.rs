use axum::{
    extract::{Query, State},
    Json,
};

use super::common::ProductQuery;
use crate::{
    bom::types::{
        BatchSaveResponse, BomStatus, ColorVariationRecord, CommonMaterialRecord,
        CommonMaterialsBatch, FinalizeBomRequest, FinalizeBomResponse, SizeConsumptionRecord,
        SizeConsumptionsBatch, VariationMaterialsBatch,
    },
    handlers::AppState,
    ApiResponse, ApiResult,
};

#[utoipa::path(
    get,
    path = "/api/v1/bom/common-materials",
    summary = "Persisted common materials of a product",
    params(ProductQuery),
    responses(
        (status = 200, description = "Common material rows", body = ApiResponse<Vec<CommonMaterialRecord>>),
    ),
    tag = "bom"
)]
pub async fn list_common_materials(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> ApiResult<Vec<CommonMaterialRecord>> {
    let rows = state.services.bom.common_materials(query.product_id).await?;
    Ok(Json(ApiResponse::success(rows)))
}

#[utoipa::path(
    post,
    path = "/api/v1/bom/common-materials/batch",
    summary = "Replace the common materials of a product",
    request_body = CommonMaterialsBatch,
    responses(
        (status = 200, description = "Batch saved", body = ApiResponse<BatchSaveResponse>),
        (status = 400, description = "Invalid item", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown product or material", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate material", body = crate::errors::ErrorResponse),
    ),
    tag = "bom"
)]
pub async fn save_common_materials(
    State(state): State<AppState>,
    Json(batch): Json<CommonMaterialsBatch>,
) -> ApiResult<BatchSaveResponse> {
    let saved = state.services.bom.save_common_materials(batch).await?;
    Ok(Json(ApiResponse::success(saved)))
}

#[utoipa::path(
    get,
    path = "/api/v1/bom/variation-materials",
    summary = "Persisted per-color materials of a product",
    params(ProductQuery),
    responses(
        (status = 200, description = "Color variation rows", body = ApiResponse<Vec<ColorVariationRecord>>),
    ),
    tag = "bom"
)]
pub async fn list_variation_materials(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> ApiResult<Vec<ColorVariationRecord>> {
    let rows = state
        .services
        .bom
        .variation_materials(query.product_id)
        .await?;
    Ok(Json(ApiResponse::success(rows)))
}

#[utoipa::path(
    post,
    path = "/api/v1/bom/variation-materials/batch",
    summary = "Replace the per-color materials of a product",
    request_body = VariationMaterialsBatch,
    responses(
        (status = 200, description = "Batch saved", body = ApiResponse<BatchSaveResponse>),
        (status = 400, description = "Invalid item", body = crate::errors::ErrorResponse),
        (status = 409, description = "Duplicate category and color", body = crate::errors::ErrorResponse),
    ),
    tag = "bom"
)]
pub async fn save_variation_materials(
    State(state): State<AppState>,
    Json(batch): Json<VariationMaterialsBatch>,
) -> ApiResult<BatchSaveResponse> {
    let saved = state.services.bom.save_variation_materials(batch).await?;
    Ok(Json(ApiResponse::success(saved)))
}

#[utoipa::path(
    get,
    path = "/api/v1/bom/size-consumptions",
    summary = "Persisted per-size quantities of a product",
    params(ProductQuery),
    responses(
        (status = 200, description = "Size consumption rows", body = ApiResponse<Vec<SizeConsumptionRecord>>),
    ),
    tag = "bom"
)]
pub async fn list_size_consumptions(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> ApiResult<Vec<SizeConsumptionRecord>> {
    let rows = state.services.bom.size_consumptions(query.product_id).await?;
    Ok(Json(ApiResponse::success(rows)))
}

#[utoipa::path(
    post,
    path = "/api/v1/bom/size-consumptions/batch",
    summary = "Replace the per-size quantities of a product",
    request_body = SizeConsumptionsBatch,
    responses(
        (status = 200, description = "Batch saved", body = ApiResponse<BatchSaveResponse>),
        (status = 400, description = "Negative quantity or unknown size", body = crate::errors::ErrorResponse),
    ),
    tag = "bom"
)]
pub async fn save_size_consumptions(
    State(state): State<AppState>,
    Json(batch): Json<SizeConsumptionsBatch>,
) -> ApiResult<BatchSaveResponse> {
    let saved = state.services.bom.save_size_consumptions(batch).await?;
    Ok(Json(ApiResponse::success(saved)))
}

#[utoipa::path(
    get,
    path = "/api/v1/bom/status",
    summary = "Whether a product already has a BOM",
    params(ProductQuery),
    responses(
        (status = 200, description = "BOM presence", body = ApiResponse<BomStatus>),
    ),
    tag = "bom"
)]
pub async fn bom_status(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> ApiResult<BomStatus> {
    let status = state.services.bom.status(query.product_id).await?;
    Ok(Json(ApiResponse::success(status)))
}

#[utoipa::path(
    post,
    path = "/api/v1/bom/finalize",
    summary = "Persist all wizard registries atomically",
    request_body = FinalizeBomRequest,
    responses(
        (status = 200, description = "BOM finalized", body = ApiResponse<FinalizeBomResponse>),
        (status = 400, description = "Invalid item; nothing was written", body = crate::errors::ErrorResponse),
        (status = 404, description = "Unknown product, category or material", body = crate::errors::ErrorResponse),
    ),
    tag = "bom"
)]
pub async fn finalize_bom(
    State(state): State<AppState>,
    Json(request): Json<FinalizeBomRequest>,
) -> ApiResult<FinalizeBomResponse> {
    let finalized = state.services.bom.finalize(request).await?;
    Ok(Json(ApiResponse::success(finalized)))
}
