use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::error::ValidationIssue;

pub type CategoryId = i32;
pub type MaterialId = i32;
pub type UnitId = i32;
pub type ProductId = i32;
pub type ColorId = i32;
pub type SizeId = i32;

/// Material category and the flags that decide how the wizard treats it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub has_color: bool,
    pub has_size: bool,
    pub quantity_varies_by_size: bool,
    pub material_varies_by_color: bool,
    pub has_waste: bool,
    #[serde(default)]
    pub waste_percentage: Option<Decimal>,
}

impl Category {
    pub fn validate(&self) -> Result<(), ValidationIssue> {
        validate_category_flags(
            &self.name,
            self.has_color,
            self.material_varies_by_color,
            self.has_waste,
            self.waste_percentage,
        )
    }

    /// Waste percentage to apply, `None` when the category carries no waste.
    pub fn effective_waste(&self) -> Option<Decimal> {
        if self.has_waste {
            self.waste_percentage.filter(|w| *w > Decimal::ZERO)
        } else {
            None
        }
    }
}

/// Shared category rules, used both for catalog records and for incoming payloads.
pub fn validate_category_flags(
    name: &str,
    has_color: bool,
    material_varies_by_color: bool,
    has_waste: bool,
    waste_percentage: Option<Decimal>,
) -> Result<(), ValidationIssue> {
    if name.trim().is_empty() {
        return Err(ValidationIssue::EmptyCategoryName);
    }
    if material_varies_by_color && !has_color {
        return Err(ValidationIssue::ColorVariationWithoutColor);
    }
    match (has_waste, waste_percentage) {
        (true, Some(pct)) if pct > Decimal::ZERO => Ok(()),
        (true, _) => Err(ValidationIssue::WastePercentageRequired),
        (false, Some(_)) => Err(ValidationIssue::WastePercentageWithoutWaste),
        (false, None) => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Material {
    pub id: MaterialId,
    pub name: String,
    pub category_id: CategoryId,
    pub purchase_unit_id: UnitId,
    #[serde(default)]
    pub consumption_unit_id: Option<UnitId>,
}

impl Material {
    /// Unit used on BOM lines: the consumption unit, else the purchase unit.
    pub fn consumption_unit(&self) -> UnitId {
        self.consumption_unit_id.unwrap_or(self.purchase_unit_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
}

/// One sellable (size, color) variant of a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct VariantCombination {
    pub size_id: SizeId,
    pub color_id: ColorId,
    pub size_label: String,
    pub color_label: String,
    #[serde(default)]
    pub color_hex: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ColorOption {
    pub color_id: ColorId,
    pub label: String,
    pub hex: Option<String>,
}

/// A product together with all of its variant combinations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductDescriptor {
    pub product: Product,
    pub combinations: Vec<VariantCombination>,
}

impl ProductDescriptor {
    /// Distinct size labels in first-seen order.
    pub fn size_labels(&self) -> Vec<String> {
        let mut labels: Vec<String> = Vec::new();
        for combination in &self.combinations {
            if !labels.contains(&combination.size_label) {
                labels.push(combination.size_label.clone());
            }
        }
        labels
    }

    /// Distinct colors in first-seen order.
    pub fn colors(&self) -> Vec<ColorOption> {
        let mut colors: Vec<ColorOption> = Vec::new();
        for combination in &self.combinations {
            if !colors.iter().any(|c| c.color_id == combination.color_id) {
                colors.push(ColorOption {
                    color_id: combination.color_id,
                    label: combination.color_label.clone(),
                    hex: combination.color_hex.clone(),
                });
            }
        }
        colors
    }

    pub fn has_color(&self, color_id: ColorId) -> bool {
        self.combinations.iter().any(|c| c.color_id == color_id)
    }
}

/// Step-1 registry entry: a material used by every variant of the product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CommonMaterialEntry {
    pub product_id: ProductId,
    pub category_id: CategoryId,
    pub material_id: MaterialId,
    pub unit_id: UnitId,
    pub base_quantity: Decimal,
}

impl CommonMaterialEntry {
    pub fn to_item(&self) -> CommonMaterialItem {
        CommonMaterialItem {
            product_id: self.product_id,
            material_id: self.material_id,
            unit_id: self.unit_id,
            base_quantity: self.base_quantity,
        }
    }
}

// Wire items and batch payloads shared by the API handlers and the gateway.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CommonMaterialItem {
    pub product_id: ProductId,
    pub material_id: MaterialId,
    pub unit_id: UnitId,
    pub base_quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ColorVariationItem {
    pub category_id: CategoryId,
    pub color_id: ColorId,
    pub material_id: MaterialId,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SizeConsumptionItem {
    pub category_id: CategoryId,
    pub size_label: String,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CommonMaterialsBatch {
    #[validate(length(min = 1, max = 100))]
    pub user: String,
    /// Product the batch replaces; inferred from the items when omitted.
    #[serde(default)]
    pub product_id: Option<ProductId>,
    pub items: Vec<CommonMaterialItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct VariationMaterialsBatch {
    #[validate(length(min = 1, max = 100))]
    pub user: String,
    pub product_id: ProductId,
    pub items: Vec<ColorVariationItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct SizeConsumptionsBatch {
    #[validate(length(min = 1, max = 100))]
    pub user: String,
    pub product_id: ProductId,
    pub items: Vec<SizeConsumptionItem>,
}

/// Everything the wizard persists, applied in one transaction.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct FinalizeBomRequest {
    #[validate(length(min = 1, max = 100))]
    pub user: String,
    pub product_id: ProductId,
    pub common_materials: Vec<CommonMaterialItem>,
    pub variation_materials: Vec<ColorVariationItem>,
    pub size_consumptions: Vec<SizeConsumptionItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BatchSaveResponse {
    pub product_id: ProductId,
    pub saved: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FinalizeBomResponse {
    pub product_id: ProductId,
    pub common_materials: usize,
    pub variation_materials: usize,
    pub size_consumptions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BomStatus {
    pub product_id: ProductId,
    pub has_bom: bool,
}

// Persisted rows as returned by the backend.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CommonMaterialRecord {
    pub id: i32,
    pub product_id: ProductId,
    pub category_id: CategoryId,
    pub material_id: MaterialId,
    pub unit_id: UnitId,
    pub base_quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ColorVariationRecord {
    pub id: i32,
    pub product_id: ProductId,
    pub category_id: CategoryId,
    pub color_id: ColorId,
    pub material_id: MaterialId,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SizeConsumptionRecord {
    pub id: i32,
    pub product_id: ProductId,
    pub category_id: CategoryId,
    pub size_label: String,
    pub quantity: Decimal,
}
