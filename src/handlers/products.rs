use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    bom::{
        assembler::BomAssembly,
        types::{Product, ProductDescriptor, ProductId, VariantCombination},
    },
    errors::ServiceError,
    handlers::AppState,
    services::products::CreateProductInput,
    ApiResponse, ApiResult,
};

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}",
    params(("id" = i32, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product found", body = ApiResponse<Product>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> ApiResult<Product> {
    let product = state.services.products.get(id).await?;
    Ok(Json(ApiResponse::success(product)))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/combinations",
    summary = "List the size and color variants of a product",
    params(("id" = i32, Path, description = "Product id")),
    responses(
        (status = 200, description = "Variant combinations", body = ApiResponse<Vec<VariantCombination>>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    tag = "products"
)]
pub async fn list_combinations(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> ApiResult<Vec<VariantCombination>> {
    let combinations = state.services.products.combinations(id).await?;
    Ok(Json(ApiResponse::success(combinations)))
}

#[utoipa::path(
    post,
    path = "/api/v1/products",
    summary = "Create a product with its variant combinations",
    request_body = CreateProductInput,
    responses(
        (status = 201, description = "Product created"),
        (status = 409, description = "Duplicate combination", body = crate::errors::ErrorResponse),
    ),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    Json(input): Json<CreateProductInput>,
) -> Result<(StatusCode, Json<ApiResponse<ProductDescriptor>>), ServiceError> {
    let descriptor = state.services.products.create(input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(descriptor))))
}

#[utoipa::path(
    get,
    path = "/api/v1/products/{id}/bom-lines",
    summary = "Assemble the persisted BOM",
    description = "Crosses the saved common, color and size registries with every variant. \
                   Variants that cannot be resolved are listed under `missing`.",
    params(("id" = i32, Path, description = "Product id")),
    responses(
        (status = 200, description = "Assembled lines and missing assignments", body = ApiResponse<BomAssembly>),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    tag = "products"
)]
pub async fn bom_lines(
    State(state): State<AppState>,
    Path(id): Path<ProductId>,
) -> ApiResult<BomAssembly> {
    let assembly = state.services.bom.assemble(id).await?;
    Ok(Json(ApiResponse::success(assembly)))
}
