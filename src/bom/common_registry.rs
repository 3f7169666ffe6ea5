use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::warn;

use super::behavior::{self, BehaviorMode};
use super::error::{BomError, ValidationIssue};
use super::types::{
    Category, CategoryId, CommonMaterialEntry, CommonMaterialItem, CommonMaterialRecord, Material,
    MaterialId, ProductId,
};

/// Step 1: materials shared by every variant of one product.
///
/// Entries stay local until the session saves or finalizes them. The registry
/// never holds two entries for the same material.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommonMaterialsRegistry {
    product_id: ProductId,
    entries: Vec<CommonMaterialEntry>,
}

impl CommonMaterialsRegistry {
    pub fn new(product_id: ProductId) -> Self {
        Self {
            product_id,
            entries: Vec::new(),
        }
    }

    pub fn product_id(&self) -> ProductId {
        self.product_id
    }

    pub fn entries(&self) -> &[CommonMaterialEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_material(&self, material_id: MaterialId) -> bool {
        self.entries.iter().any(|e| e.material_id == material_id)
    }

    pub fn get(&self, material_id: MaterialId) -> Option<&CommonMaterialEntry> {
        self.entries.iter().find(|e| e.material_id == material_id)
    }

    /// Distinct categories with at least one entry, in insertion order.
    pub fn category_ids(&self) -> Vec<CategoryId> {
        let mut ids = Vec::new();
        for entry in &self.entries {
            if !ids.contains(&entry.category_id) {
                ids.push(entry.category_id);
            }
        }
        ids
    }

    /// Validates and appends an entry. Nothing changes when validation fails.
    ///
    /// Size automatic categories ignore `quantity` and store 1.
    pub fn add(
        &mut self,
        category: Option<&Category>,
        material: Option<&Material>,
        quantity: Option<Decimal>,
    ) -> Result<&CommonMaterialEntry, BomError> {
        let category = category.ok_or(ValidationIssue::CategoryNotSelected)?;
        let material = material.ok_or(ValidationIssue::MaterialNotSelected)?;

        if material.category_id != category.id {
            return Err(ValidationIssue::MaterialCategoryMismatch {
                material_id: material.id,
                category_id: category.id,
            }
            .into());
        }

        let base_quantity = match behavior::resolve(category).mode {
            BehaviorMode::ColorVariable => {
                return Err(ValidationIssue::ColorVariableInCommonStep {
                    category_id: category.id,
                }
                .into())
            }
            BehaviorMode::SizeAutomatic => Decimal::ONE,
            BehaviorMode::FixedCommon => match quantity {
                Some(q) if q > Decimal::ZERO => q,
                Some(q) => return Err(ValidationIssue::NonPositiveQuantity { quantity: q }.into()),
                None => {
                    return Err(ValidationIssue::QuantityRequired {
                        category_id: category.id,
                    }
                    .into())
                }
            },
        };

        if self.contains_material(material.id) {
            return Err(ValidationIssue::DuplicateMaterial {
                material_id: material.id,
            }
            .into());
        }

        self.entries.push(CommonMaterialEntry {
            product_id: self.product_id,
            category_id: category.id,
            material_id: material.id,
            unit_id: material.consumption_unit(),
            base_quantity,
        });
        let index = self.entries.len() - 1;
        Ok(&self.entries[index])
    }

    /// Removes the entry locally; the server copy changes on the next save.
    pub fn remove(&mut self, material_id: MaterialId) -> Option<CommonMaterialEntry> {
        let index = self
            .entries
            .iter()
            .position(|e| e.material_id == material_id)?;
        Some(self.entries.remove(index))
    }

    pub fn items(&self) -> Vec<CommonMaterialItem> {
        self.entries.iter().map(CommonMaterialEntry::to_item).collect()
    }

    /// Replaces local entries with persisted rows.
    ///
    /// The category of each row is re-derived from the material catalog when
    /// the material is known; duplicate materials keep the first row.
    pub fn replace_from_records(
        &mut self,
        records: &[CommonMaterialRecord],
        materials: &HashMap<MaterialId, Material>,
    ) {
        let mut entries: Vec<CommonMaterialEntry> = Vec::with_capacity(records.len());
        for record in records {
            if entries.iter().any(|e| e.material_id == record.material_id) {
                warn!(
                    material_id = record.material_id,
                    "skipping duplicate persisted common material"
                );
                continue;
            }
            let category_id = materials
                .get(&record.material_id)
                .map(|m| m.category_id)
                .unwrap_or(record.category_id);
            entries.push(CommonMaterialEntry {
                product_id: self.product_id,
                category_id,
                material_id: record.material_id,
                unit_id: record.unit_id,
                base_quantity: record.base_quantity,
            });
        }
        self.entries = entries;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn category(id: CategoryId, has_color: bool, has_size: bool) -> Category {
        Category {
            id,
            name: format!("cat-{id}"),
            has_color,
            has_size,
            quantity_varies_by_size: has_size,
            material_varies_by_color: has_color,
            has_waste: false,
            waste_percentage: None,
        }
    }

    fn material(id: MaterialId, category_id: CategoryId) -> Material {
        Material {
            id,
            name: format!("mat-{id}"),
            category_id,
            purchase_unit_id: 1,
            consumption_unit_id: Some(2),
        }
    }

    #[test]
    fn adds_fixed_common_entry_with_consumption_unit() {
        let mut registry = CommonMaterialsRegistry::new(7);
        let entry = registry
            .add(
                Some(&category(1, false, false)),
                Some(&material(10, 1)),
                Some(dec!(2.5)),
            )
            .unwrap()
            .clone();
        assert_eq!(
            entry,
            CommonMaterialEntry {
                product_id: 7,
                category_id: 1,
                material_id: 10,
                unit_id: 2,
                base_quantity: dec!(2.5),
            }
        );
    }

    #[test]
    fn size_automatic_defaults_quantity_to_one() {
        let mut registry = CommonMaterialsRegistry::new(7);
        let entry = registry
            .add(Some(&category(2, false, true)), Some(&material(20, 2)), None)
            .unwrap();
        assert_eq!(entry.base_quantity, Decimal::ONE);
    }

    #[test]
    fn rejects_missing_selections_and_quantities() {
        let mut registry = CommonMaterialsRegistry::new(7);
        let fixed = category(1, false, false);
        let mat = material(10, 1);

        assert_matches!(
            registry.add(None, Some(&mat), Some(dec!(1))),
            Err(BomError::Validation(ValidationIssue::CategoryNotSelected))
        );
        assert_matches!(
            registry.add(Some(&fixed), None, Some(dec!(1))),
            Err(BomError::Validation(ValidationIssue::MaterialNotSelected))
        );
        assert_matches!(
            registry.add(Some(&fixed), Some(&mat), None),
            Err(BomError::Validation(ValidationIssue::QuantityRequired { category_id: 1 }))
        );
        assert_matches!(
            registry.add(Some(&fixed), Some(&mat), Some(dec!(0))),
            Err(BomError::Validation(ValidationIssue::NonPositiveQuantity { .. }))
        );
        assert!(registry.is_empty());
    }

    #[test]
    fn rejects_color_variable_and_foreign_materials() {
        let mut registry = CommonMaterialsRegistry::new(7);
        assert_matches!(
            registry.add(
                Some(&category(3, true, false)),
                Some(&material(30, 3)),
                Some(dec!(1))
            ),
            Err(BomError::Validation(ValidationIssue::ColorVariableInCommonStep { .. }))
        );
        assert_matches!(
            registry.add(
                Some(&category(1, false, false)),
                Some(&material(30, 3)),
                Some(dec!(1))
            ),
            Err(BomError::Validation(ValidationIssue::MaterialCategoryMismatch { .. }))
        );
    }

    #[test]
    fn duplicate_material_leaves_registry_unchanged() {
        let mut registry = CommonMaterialsRegistry::new(7);
        let cat = category(1, false, false);
        registry
            .add(Some(&cat), Some(&material(10, 1)), Some(dec!(1)))
            .unwrap();
        let before = registry.clone();

        assert_matches!(
            registry.add(Some(&cat), Some(&material(10, 1)), Some(dec!(4))),
            Err(BomError::Validation(ValidationIssue::DuplicateMaterial { material_id: 10 }))
        );
        assert_eq!(registry, before);
    }

    #[test]
    fn allows_several_materials_in_one_category() {
        let mut registry = CommonMaterialsRegistry::new(7);
        let cat = category(1, false, false);
        registry
            .add(Some(&cat), Some(&material(10, 1)), Some(dec!(1)))
            .unwrap();
        registry
            .add(Some(&cat), Some(&material(11, 1)), Some(dec!(2)))
            .unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.category_ids(), vec![1]);
        assert_eq!(registry.remove(10).map(|e| e.material_id), Some(10));
        assert!(registry.remove(10).is_none());
    }

    #[test]
    fn reload_derives_category_from_material() {
        let mut registry = CommonMaterialsRegistry::new(7);
        let mut catalog = HashMap::new();
        catalog.insert(10, material(10, 4));
        let records = vec![
            CommonMaterialRecord {
                id: 1,
                product_id: 7,
                category_id: 99,
                material_id: 10,
                unit_id: 2,
                base_quantity: dec!(3),
            },
            CommonMaterialRecord {
                id: 2,
                product_id: 7,
                category_id: 99,
                material_id: 10,
                unit_id: 2,
                base_quantity: dec!(5),
            },
        ];
        registry.replace_from_records(&records, &catalog);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.entries()[0].category_id, 4);
        assert_eq!(registry.entries()[0].base_quantity, dec!(3));
    }
}
