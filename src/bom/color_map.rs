use rust_decimal::Decimal;
use std::collections::BTreeMap;

use super::behavior::{self, BehaviorMode};
use super::error::{BomError, ValidationIssue};
use super::types::{
    Category, CategoryId, ColorId, ColorVariationItem, ColorVariationRecord, Material, MaterialId,
};

/// Step 2: one material per (category, color) for color variable categories.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorVariationMap {
    materials: BTreeMap<CategoryId, BTreeMap<ColorId, MaterialId>>,
    /// Explicit base quantities; kept when a category loses its last color.
    base_quantities: BTreeMap<CategoryId, Decimal>,
}

impl ColorVariationMap {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_color_variable(category: &Category) -> Result<(), BomError> {
        if behavior::resolve(category).mode == BehaviorMode::ColorVariable {
            Ok(())
        } else {
            Err(ValidationIssue::NotColorVariable {
                category_id: category.id,
            }
            .into())
        }
    }

    /// Upserts the material for a color, returning the material it replaced.
    pub fn assign(
        &mut self,
        category: &Category,
        color_id: ColorId,
        material: &Material,
    ) -> Result<Option<MaterialId>, BomError> {
        Self::ensure_color_variable(category)?;
        if material.category_id != category.id {
            return Err(ValidationIssue::MaterialCategoryMismatch {
                material_id: material.id,
                category_id: category.id,
            }
            .into());
        }
        Ok(self
            .materials
            .entry(category.id)
            .or_default()
            .insert(color_id, material.id))
    }

    pub fn remove(&mut self, category_id: CategoryId, color_id: ColorId) -> Option<MaterialId> {
        let colors = self.materials.get_mut(&category_id)?;
        let removed = colors.remove(&color_id);
        if colors.is_empty() {
            self.materials.remove(&category_id);
        }
        removed
    }

    /// Quantity used by every color of the category when it does not vary by size.
    pub fn set_base_quantity(
        &mut self,
        category: &Category,
        quantity: Decimal,
    ) -> Result<(), BomError> {
        Self::ensure_color_variable(category)?;
        if quantity <= Decimal::ZERO {
            return Err(ValidationIssue::NonPositiveQuantity { quantity }.into());
        }
        self.base_quantities.insert(category.id, quantity);
        Ok(())
    }

    pub fn material_for(&self, category_id: CategoryId, color_id: ColorId) -> Option<MaterialId> {
        self.materials
            .get(&category_id)
            .and_then(|colors| colors.get(&color_id).copied())
    }

    pub fn base_quantity(&self, category_id: CategoryId) -> Decimal {
        self.base_quantities
            .get(&category_id)
            .copied()
            .unwrap_or(Decimal::ONE)
    }

    /// Categories with at least one color assignment.
    pub fn category_ids(&self) -> Vec<CategoryId> {
        self.materials.keys().copied().collect()
    }

    pub fn contains_category(&self, category_id: CategoryId) -> bool {
        self.materials.contains_key(&category_id)
    }

    /// Assigned colors of one category with their materials.
    pub fn assignments(&self, category_id: CategoryId) -> Vec<(ColorId, MaterialId)> {
        self.materials
            .get(&category_id)
            .map(|colors| colors.iter().map(|(k, v)| (*k, *v)).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.materials.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn items(&self) -> Vec<ColorVariationItem> {
        self.materials
            .iter()
            .flat_map(|(category_id, colors)| {
                let quantity = self.base_quantity(*category_id);
                colors
                    .iter()
                    .map(move |(color_id, material_id)| ColorVariationItem {
                        category_id: *category_id,
                        color_id: *color_id,
                        material_id: *material_id,
                        quantity,
                    })
            })
            .collect()
    }

    /// Rebuilds the map from persisted rows; the last row wins per key.
    pub fn replace_from_records(&mut self, records: &[ColorVariationRecord]) {
        self.materials.clear();
        self.base_quantities.clear();
        for record in records {
            if record.quantity > Decimal::ZERO {
                self.base_quantities
                    .insert(record.category_id, record.quantity);
            }
            self.materials
                .entry(record.category_id)
                .or_default()
                .insert(record.color_id, record.material_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn fabric() -> Category {
        Category {
            id: 2,
            name: "Fabric".into(),
            has_color: true,
            has_size: true,
            quantity_varies_by_size: true,
            material_varies_by_color: true,
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
            consumption_unit_id: None,
        }
    }

    #[test]
    fn assign_is_an_upsert() {
        let mut map = ColorVariationMap::new();
        assert_eq!(map.assign(&fabric(), 1, &material(20, 2)).unwrap(), None);
        assert_eq!(
            map.assign(&fabric(), 1, &material(21, 2)).unwrap(),
            Some(20)
        );
        assert_eq!(map.material_for(2, 1), Some(21));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn rejects_categories_without_color() {
        let mut map = ColorVariationMap::new();
        let mut zipper = fabric();
        zipper.id = 1;
        zipper.has_color = false;
        zipper.material_varies_by_color = false;
        assert_matches!(
            map.assign(&zipper, 1, &material(10, 1)),
            Err(BomError::Validation(ValidationIssue::NotColorVariable { category_id: 1 }))
        );
        assert_matches!(
            map.assign(&fabric(), 1, &material(10, 1)),
            Err(BomError::Validation(ValidationIssue::MaterialCategoryMismatch { .. }))
        );
        assert!(map.is_empty());
    }

    #[test]
    fn base_quantity_defaults_to_one_and_flows_into_items() {
        let mut map = ColorVariationMap::new();
        map.assign(&fabric(), 1, &material(20, 2)).unwrap();
        map.assign(&fabric(), 2, &material(21, 2)).unwrap();
        assert_eq!(map.base_quantity(2), Decimal::ONE);

        map.set_base_quantity(&fabric(), dec!(1.25)).unwrap();
        assert!(map.set_base_quantity(&fabric(), dec!(0)).is_err());

        let items = map.items();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.quantity == dec!(1.25)));
    }

    #[test]
    fn removing_last_color_drops_the_category() {
        let mut map = ColorVariationMap::new();
        map.assign(&fabric(), 1, &material(20, 2)).unwrap();
        assert_eq!(map.remove(2, 1), Some(20));
        assert!(!map.contains_category(2));
        assert_eq!(map.remove(2, 1), None);
    }

    #[test]
    fn base_quantity_survives_removing_the_last_color() {
        let mut map = ColorVariationMap::new();
        map.assign(&fabric(), 1, &material(20, 2)).unwrap();
        map.set_base_quantity(&fabric(), dec!(2.5)).unwrap();
        map.remove(2, 1);
        assert!(!map.contains_category(2));
        assert!(map.items().is_empty());
        assert_eq!(map.base_quantity(2), dec!(2.5));

        map.assign(&fabric(), 2, &material(21, 2)).unwrap();
        assert_eq!(map.items()[0].quantity, dec!(2.5));
    }

    #[test]
    fn reload_restores_assignments_and_base_quantity() {
        let mut map = ColorVariationMap::new();
        map.replace_from_records(&[
            ColorVariationRecord {
                id: 1,
                product_id: 7,
                category_id: 2,
                color_id: 1,
                material_id: 20,
                quantity: dec!(2),
            },
            ColorVariationRecord {
                id: 2,
                product_id: 7,
                category_id: 2,
                color_id: 2,
                material_id: 21,
                quantity: dec!(2),
            },
        ]);
        assert_eq!(map.assignments(2), vec![(1, 20), (2, 21)]);
        assert_eq!(map.base_quantity(2), dec!(2));
    }
}
