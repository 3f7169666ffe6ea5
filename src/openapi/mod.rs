use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "StateSet BOM API",
        version = "1.0.0",
        description = r#"
# StateSet Bill of Materials API

Catalog and persistence endpoints behind the BOM configuration wizard.

## Workflow

1. **Common materials**: materials used by every variant of a product, with a base quantity.
2. **Color variations**: one material per color for categories that vary by color.
3. **Size consumptions**: a quantity per size for categories whose consumption varies by size.
4. **Finalize**: persist all three registries in one transaction.

`GET /products/{id}/bom-lines` crosses the persisted registries with every size and
color combination of the product.

## Error Handling

Errors share one body format:

```json
{
  "error": "BAD_REQUEST",
  "message": "waste_percentage greater than zero is required when has_waste is set",
  "request_id": "b7c1...",
  "timestamp": "2024-01-01T00:00:00Z"
}
```
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "categories", description = "Material category catalog"),
        (name = "materials", description = "Material catalog"),
        (name = "products", description = "Products, variants and assembled BOM lines"),
        (name = "bom", description = "Wizard registries and finalization")
    ),
    paths(
        // Catalog
        crate::handlers::categories::list_categories,
        crate::handlers::categories::get_category,
        crate::handlers::categories::create_category,
        crate::handlers::categories::update_category,
        crate::handlers::materials::list_materials,
        crate::handlers::materials::get_material,
        crate::handlers::materials::create_material,
        crate::handlers::products::get_product,
        crate::handlers::products::list_combinations,
        crate::handlers::products::create_product,
        crate::handlers::products::bom_lines,

        // BOM registries
        crate::handlers::bom::list_common_materials,
        crate::handlers::bom::save_common_materials,
        crate::handlers::bom::list_variation_materials,
        crate::handlers::bom::save_variation_materials,
        crate::handlers::bom::list_size_consumptions,
        crate::handlers::bom::save_size_consumptions,
        crate::handlers::bom::bom_status,
        crate::handlers::bom::finalize_bom,
    ),
    components(
        schemas(
            crate::ResponseMeta,
            crate::services::categories::CategoryInput,
            crate::services::materials::CreateMaterialInput,
            crate::services::products::CreateProductInput,
            crate::bom::types::Category,
            crate::bom::types::Material,
            crate::bom::types::Product,
            crate::bom::types::VariantCombination,
            crate::bom::types::CommonMaterialItem,
            crate::bom::types::ColorVariationItem,
            crate::bom::types::SizeConsumptionItem,
            crate::bom::types::CommonMaterialsBatch,
            crate::bom::types::VariationMaterialsBatch,
            crate::bom::types::SizeConsumptionsBatch,
            crate::bom::types::FinalizeBomRequest,
            crate::bom::types::BatchSaveResponse,
            crate::bom::types::FinalizeBomResponse,
            crate::bom::types::BomStatus,
            crate::bom::types::CommonMaterialRecord,
            crate::bom::types::ColorVariationRecord,
            crate::bom::types::SizeConsumptionRecord,
            crate::bom::assembler::BomLine,
            crate::bom::assembler::BomAssembly,
            crate::bom::assembler::MissingAssignmentError,
            crate::bom::assembler::MissingKind,
            crate::bom::behavior::BehaviorMode,
            crate::bom::behavior::QuantityRule,
            crate::bom::behavior::CategoryBehavior,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDocV1;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDocV1::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}
