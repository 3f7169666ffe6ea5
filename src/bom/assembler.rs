//! Crosses the three wizard registries with a product's variants.
//!
//! Every (variant, line source) pair resolves to either a [`BomLine`] or a
//! [`MissingAssignmentError`]; nothing is defaulted silently.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;
use utoipa::ToSchema;

use super::behavior::{self, QuantityRule};
use super::color_map::ColorVariationMap;
use super::common_registry::CommonMaterialsRegistry;
use super::size_matrix::SizeConsumptionMatrix;
use super::types::{
    Category, CategoryId, ColorId, CommonMaterialEntry, Material, MaterialId, SizeId, UnitId,
    VariantCombination,
};

/// Material requirement of one category for one variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BomLine {
    pub size_id: SizeId,
    pub color_id: ColorId,
    pub size_label: String,
    pub color_label: String,
    pub category_id: CategoryId,
    pub material_id: MaterialId,
    pub unit_id: UnitId,
    pub quantity: Decimal,
    /// Quantity grossed up by the category's waste percentage.
    pub gross_quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MissingKind {
    /// No material chosen for the variant's color.
    ColorMaterial,
    /// No quantity for the variant's size.
    SizeQuantity,
    /// The quantity varies by size but the category is not a matrix row,
    /// e.g. it is left out by the row filter.
    NotInSizeMatrix,
    /// The gross quantity does not fit in a decimal.
    QuantityOverflow,
    /// The referenced material is not in the catalog.
    UnknownMaterial { material_id: MaterialId },
    /// The referenced category is not in the catalog.
    UnknownCategory,
}

#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize, ToSchema)]
#[error("{size_label}/{color_label}: category {category_id} {kind}")]
pub struct MissingAssignmentError {
    pub size_id: SizeId,
    pub color_id: ColorId,
    pub size_label: String,
    pub color_label: String,
    pub category_id: CategoryId,
    pub kind: MissingKind,
}

impl fmt::Display for MissingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissingKind::ColorMaterial => write!(f, "has no material for this color"),
            MissingKind::SizeQuantity => write!(f, "has no quantity for this size"),
            MissingKind::NotInSizeMatrix => {
                write!(f, "varies by size but is not a row of the size matrix")
            }
            MissingKind::QuantityOverflow => write!(f, "has a quantity too large to gross up"),
            MissingKind::UnknownMaterial { material_id } => {
                write!(f, "references unknown material {}", material_id)
            }
            MissingKind::UnknownCategory => write!(f, "is not in the category catalog"),
        }
    }
}

/// Every missing assignment that blocks finalizing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct IncompletenessReport {
    pub missing: Vec<MissingAssignmentError>,
}

impl IncompletenessReport {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty()
    }
}

impl fmt::Display for IncompletenessReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} missing assignment(s)", self.missing.len())?;
        for (i, missing) in self.missing.iter().take(5).enumerate() {
            let sep = if i == 0 { ": " } else { "; " };
            write!(f, "{}{}", sep, missing)?;
        }
        if self.missing.len() > 5 {
            write!(f, "; ...")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BomAssembly {
    pub lines: Vec<BomLine>,
    pub missing: Vec<MissingAssignmentError>,
}

impl BomAssembly {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn lines_for_variant(&self, size_id: SizeId, color_id: ColorId) -> Vec<&BomLine> {
        self.lines
            .iter()
            .filter(|l| l.size_id == size_id && l.color_id == color_id)
            .collect()
    }

    pub fn report(&self) -> IncompletenessReport {
        IncompletenessReport {
            missing: self.missing.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum LineSource<'a> {
    Common(&'a CommonMaterialEntry),
    ColorVariable(CategoryId),
}

/// Read-only view over the catalogs and registries needed to build lines.
pub struct BomAssembler<'a> {
    categories: &'a HashMap<CategoryId, Category>,
    materials: &'a HashMap<MaterialId, Material>,
    common: &'a CommonMaterialsRegistry,
    colors: &'a ColorVariationMap,
    sizes: &'a SizeConsumptionMatrix,
}

impl<'a> BomAssembler<'a> {
    pub fn new(
        categories: &'a HashMap<CategoryId, Category>,
        materials: &'a HashMap<MaterialId, Material>,
        common: &'a CommonMaterialsRegistry,
        colors: &'a ColorVariationMap,
        sizes: &'a SizeConsumptionMatrix,
    ) -> Self {
        Self {
            categories,
            materials,
            common,
            colors,
            sizes,
        }
    }

    fn sources(&self) -> Vec<LineSource<'a>> {
        let mut sources: Vec<LineSource<'a>> = self
            .common
            .entries()
            .iter()
            .map(LineSource::Common)
            .collect();
        sources.extend(
            self.colors
                .category_ids()
                .into_iter()
                .map(LineSource::ColorVariable),
        );
        sources
    }

    /// Lines in variant order; within a variant common entries come first.
    pub fn assemble(&self, combinations: &[VariantCombination]) -> BomAssembly {
        let sources = self.sources();
        let mut assembly = BomAssembly::default();
        for variant in combinations {
            for source in &sources {
                match self.resolve_line(variant, *source) {
                    Ok(line) => assembly.lines.push(line),
                    Err(missing) => assembly.missing.push(missing),
                }
            }
        }
        assembly
    }

    fn resolve_line(
        &self,
        variant: &VariantCombination,
        source: LineSource<'a>,
    ) -> Result<BomLine, MissingAssignmentError> {
        let category_id = match source {
            LineSource::Common(entry) => entry.category_id,
            LineSource::ColorVariable(category_id) => category_id,
        };
        let missing = |kind: MissingKind| MissingAssignmentError {
            size_id: variant.size_id,
            color_id: variant.color_id,
            size_label: variant.size_label.clone(),
            color_label: variant.color_label.clone(),
            category_id,
            kind,
        };

        let category = self
            .categories
            .get(&category_id)
            .ok_or_else(|| missing(MissingKind::UnknownCategory))?;

        let (material_id, unit_id, base_quantity) = match source {
            LineSource::Common(entry) => (entry.material_id, entry.unit_id, entry.base_quantity),
            LineSource::ColorVariable(_) => {
                let material_id = self
                    .colors
                    .material_for(category_id, variant.color_id)
                    .ok_or_else(|| missing(MissingKind::ColorMaterial))?;
                let material = self
                    .materials
                    .get(&material_id)
                    .ok_or_else(|| missing(MissingKind::UnknownMaterial { material_id }))?;
                (
                    material_id,
                    material.consumption_unit(),
                    self.colors.base_quantity(category_id),
                )
            }
        };

        let quantity = match behavior::resolve(category).quantity {
            QuantityRule::Base => base_quantity,
            QuantityRule::PerSize if !self.sizes.has_row(category_id) => {
                return Err(missing(MissingKind::NotInSizeMatrix))
            }
            QuantityRule::PerSize => self
                .sizes
                .quantity(category_id, &variant.size_label)
                .ok_or_else(|| missing(MissingKind::SizeQuantity))?,
        };
        let gross = gross_quantity(quantity, category.effective_waste())
            .ok_or_else(|| missing(MissingKind::QuantityOverflow))?;

        Ok(BomLine {
            size_id: variant.size_id,
            color_id: variant.color_id,
            size_label: variant.size_label.clone(),
            color_label: variant.color_label.clone(),
            category_id,
            material_id,
            unit_id,
            quantity,
            gross_quantity: gross,
        })
    }
}

/// `quantity * (1 + waste / 100)`, normalized. `None` when it overflows.
pub fn gross_quantity(quantity: Decimal, waste_percentage: Option<Decimal>) -> Option<Decimal> {
    match waste_percentage {
        Some(waste) => {
            let factor = (waste / Decimal::ONE_HUNDRED).checked_add(Decimal::ONE)?;
            quantity.checked_mul(factor).map(|q| q.normalize())
        }
        None => Some(quantity),
    }
}
