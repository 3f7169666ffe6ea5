use rust_decimal::Decimal;
use thiserror::Error;

use super::assembler::IncompletenessReport;
use super::gateway::GatewayError;
use super::session::OperationKind;
use super::types::{CategoryId, ColorId, MaterialId, ProductId, UnitId};
use crate::errors::ServiceError;

/// Synchronous input problems, raised before any state changes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationIssue {
    #[error("category name must not be empty")]
    EmptyCategoryName,
    #[error("material_varies_by_color requires has_color")]
    ColorVariationWithoutColor,
    #[error("waste_percentage greater than zero is required when has_waste is set")]
    WastePercentageRequired,
    #[error("waste_percentage must be empty when has_waste is not set")]
    WastePercentageWithoutWaste,
    #[error("a category must be selected")]
    CategoryNotSelected,
    #[error("a material must be selected")]
    MaterialNotSelected,
    #[error("category {category_id} needs a quantity greater than zero")]
    QuantityRequired { category_id: CategoryId },
    #[error("quantity must be greater than zero, got {quantity}")]
    NonPositiveQuantity { quantity: Decimal },
    #[error("quantity must not be negative, got {quantity}")]
    NegativeQuantity { quantity: Decimal },
    #[error("quantity overflows the decimal range")]
    QuantityOverflow,
    #[error("material {material_id} is already part of the common materials")]
    DuplicateMaterial { material_id: MaterialId },
    #[error("material {material_id} does not belong to category {category_id}")]
    MaterialCategoryMismatch {
        material_id: MaterialId,
        category_id: CategoryId,
    },
    #[error("category {category_id} varies by color and is configured per color")]
    ColorVariableInCommonStep { category_id: CategoryId },
    #[error("category {category_id} does not vary by color")]
    NotColorVariable { category_id: CategoryId },
    #[error("color {color_id} is not offered by the product")]
    UnknownColor { color_id: ColorId },
    #[error("size {size_label} is not a column of the consumption matrix")]
    UnknownSize { size_label: String },
    #[error("category {category_id} is not a row of the consumption matrix")]
    UnknownRow { category_id: CategoryId },
    #[error("material {material_id} is consumed in unit {expected}, got unit {found}")]
    UnitMismatch {
        material_id: MaterialId,
        expected: UnitId,
        found: UnitId,
    },
    #[error("material {material_id} takes quantity {expected} in this category, got {found}")]
    QuantityMismatch {
        material_id: MaterialId,
        expected: Decimal,
        found: Decimal,
    },
    #[error("item belongs to product {found}, expected {expected}")]
    ProductMismatch {
        expected: ProductId,
        found: ProductId,
    },
    #[error("{what} {key} appears more than once")]
    DuplicateItem { what: &'static str, key: String },
}

#[derive(Debug, Error)]
pub enum BomError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationIssue),

    #[error("unknown category {0}")]
    UnknownCategory(CategoryId),

    #[error("unknown material {0}")]
    UnknownMaterial(MaterialId),

    #[error("{0} is already in progress")]
    OperationInProgress(OperationKind),

    #[error("BOM is incomplete: {0}")]
    Incomplete(IncompletenessReport),

    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

impl From<BomError> for ServiceError {
    fn from(err: BomError) -> Self {
        match err {
            BomError::Validation(issue @ ValidationIssue::DuplicateMaterial { .. })
            | BomError::Validation(issue @ ValidationIssue::DuplicateItem { .. }) => {
                ServiceError::Conflict(issue.to_string())
            }
            BomError::Validation(issue) => ServiceError::ValidationError(issue.to_string()),
            BomError::UnknownCategory(id) => ServiceError::NotFound(format!("category {}", id)),
            BomError::UnknownMaterial(id) => ServiceError::NotFound(format!("material {}", id)),
            BomError::OperationInProgress(kind) => {
                ServiceError::Conflict(format!("{} is already in progress", kind))
            }
            BomError::Incomplete(report) => ServiceError::Incomplete(report),
            BomError::Gateway(GatewayError::NotFound(what)) => ServiceError::NotFound(what),
            BomError::Gateway(other) => ServiceError::ExternalServiceError(other.to_string()),
        }
    }
}
