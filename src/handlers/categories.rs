use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    bom::types::{Category, CategoryId},
    errors::ServiceError,
    handlers::AppState,
    services::categories::CategoryInput,
    ApiResponse, ApiResult,
};

#[utoipa::path(
    get,
    path = "/api/v1/categories",
    summary = "List material categories",
    responses(
        (status = 200, description = "Categories ordered by name", body = ApiResponse<Vec<Category>>,
            headers(("X-Request-Id" = String, description = "Unique request id"))
        ),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "categories"
)]
pub async fn list_categories(State(state): State<AppState>) -> ApiResult<Vec<Category>> {
    let categories = state.services.categories.list().await?;
    Ok(Json(ApiResponse::success(categories)))
}

#[utoipa::path(
    get,
    path = "/api/v1/categories/{id}",
    summary = "Get a material category",
    params(("id" = i32, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category found", body = ApiResponse<Category>),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse),
    ),
    tag = "categories"
)]
pub async fn get_category(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> ApiResult<Category> {
    let category = state.services.categories.get(id).await?;
    Ok(Json(ApiResponse::success(category)))
}

#[utoipa::path(
    post,
    path = "/api/v1/categories",
    summary = "Create a material category",
    description = "A waste percentage greater than zero is required exactly when has_waste is set",
    request_body = CategoryInput,
    responses(
        (status = 201, description = "Category created", body = ApiResponse<Category>),
        (status = 400, description = "Invalid category flags", body = crate::errors::ErrorResponse),
    ),
    tag = "categories"
)]
pub async fn create_category(
    State(state): State<AppState>,
    Json(input): Json<CategoryInput>,
) -> Result<(StatusCode, Json<ApiResponse<Category>>), ServiceError> {
    let category = state.services.categories.create(input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(category))))
}

#[utoipa::path(
    put,
    path = "/api/v1/categories/{id}",
    summary = "Replace a material category",
    params(("id" = i32, Path, description = "Category id")),
    request_body = CategoryInput,
    responses(
        (status = 200, description = "Category updated", body = ApiResponse<Category>),
        (status = 400, description = "Invalid category flags", body = crate::errors::ErrorResponse),
        (status = 404, description = "Category not found", body = crate::errors::ErrorResponse),
    ),
    tag = "categories"
)]
pub async fn update_category(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
    Json(input): Json<CategoryInput>,
) -> ApiResult<Category> {
    let category = state.services.categories.update(id, input).await?;
    Ok(Json(ApiResponse::success(category)))
}
