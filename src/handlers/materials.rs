use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::common::MaterialQuery;
use crate::{
    bom::types::{Material, MaterialId},
    errors::ServiceError,
    handlers::AppState,
    services::materials::CreateMaterialInput,
    ApiResponse, ApiResult,
};

#[utoipa::path(
    get,
    path = "/api/v1/materials",
    summary = "List materials",
    params(MaterialQuery),
    responses(
        (status = 200, description = "Materials, optionally limited to one category", body = ApiResponse<Vec<Material>>),
    ),
    tag = "materials"
)]
pub async fn list_materials(
    State(state): State<AppState>,
    Query(query): Query<MaterialQuery>,
) -> ApiResult<Vec<Material>> {
    let materials = state.services.materials.list(query.category_id).await?;
    Ok(Json(ApiResponse::success(materials)))
}

#[utoipa::path(
    get,
    path = "/api/v1/materials/{id}",
    params(("id" = i32, Path, description = "Material id")),
    responses(
        (status = 200, description = "Material found", body = ApiResponse<Material>),
        (status = 404, description = "Material not found", body = crate::errors::ErrorResponse),
    ),
    tag = "materials"
)]
pub async fn get_material(
    State(state): State<AppState>,
    Path(id): Path<MaterialId>,
) -> ApiResult<Material> {
    let material = state.services.materials.get(id).await?;
    Ok(Json(ApiResponse::success(material)))
}

#[utoipa::path(
    post,
    path = "/api/v1/materials",
    request_body = CreateMaterialInput,
    responses(
        (status = 201, description = "Material created", body = ApiResponse<Material>),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse),
    ),
    tag = "materials"
)]
pub async fn create_material(
    State(state): State<AppState>,
    Json(input): Json<CreateMaterialInput>,
) -> Result<(StatusCode, Json<ApiResponse<Material>>), ServiceError> {
    let material = state.services.materials.create(input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(material))))
}
