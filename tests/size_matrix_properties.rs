//! Property-based tests for the wizard registries.
//!
//! Registries are driven with arbitrary operation sequences and checked
//! against a plain model of what they should contain.

mod common;

use std::collections::{BTreeMap, HashSet};

use proptest::prelude::*;
use rust_decimal::Decimal;
use stateset_bom::bom::{
    size_matrix::{sort_sizes_descending, SizeConsumptionMatrix},
    types::{Category, Material},
    CommonMaterialsRegistry,
};

use common::{category, material};

const SIZES: [&str; 5] = ["XS", "S", "M", "L", "XL"];
const ROWS: [i32; 3] = [1, 2, 3];

fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..5_000, 0u32..3).prop_map(|(units, scale)| Decimal::new(units, scale))
}

fn cell_strategy() -> impl Strategy<Value = (i32, &'static str, Decimal)> {
    (
        prop::sample::select(ROWS.to_vec()),
        prop::sample::select(SIZES.to_vec()),
        quantity_strategy(),
    )
}

fn empty_matrix() -> SizeConsumptionMatrix {
    SizeConsumptionMatrix::new(ROWS.to_vec(), SIZES)
}

fn fixed_catalog() -> (Vec<Category>, Vec<Material>) {
    let categories = vec![category(1, "Buttons"), category(2, "Zippers")];
    let materials = (0..6)
        .map(|i| material(100 + i, 1 + i % 2, &format!("M{}", i)))
        .collect();
    (categories, materials)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn common_registry_never_holds_duplicate_materials(
        attempts in prop::collection::vec((0usize..6, 1i64..50), 0..40)
    ) {
        let (categories, materials) = fixed_catalog();
        let mut registry = CommonMaterialsRegistry::new(7);
        let mut seen = HashSet::new();

        for (index, qty) in attempts {
            let material = &materials[index];
            let category = categories.iter().find(|c| c.id == material.category_id);
            let before = registry.clone();
            let result = registry.add(category, Some(material), Some(Decimal::from(qty)));

            if seen.insert(material.id) {
                prop_assert!(result.is_ok());
            } else {
                prop_assert!(result.is_err());
                prop_assert_eq!(&registry, &before);
            }
        }

        let ids: HashSet<_> = registry.entries().iter().map(|e| e.material_id).collect();
        prop_assert_eq!(ids.len(), registry.len());
        prop_assert_eq!(ids, seen);
    }

    #[test]
    fn fill_all_is_idempotent(
        cells in prop::collection::vec(cell_strategy(), 0..20),
        value in quantity_strategy(),
    ) {
        let mut once = empty_matrix();
        for (row, size, qty) in &cells {
            once.set_cell(*row, size, *qty).unwrap();
        }
        let mut twice = once.clone();

        once.fill_all(value).unwrap();
        twice.fill_all(value).unwrap();
        twice.fill_all(value).unwrap();
        prop_assert_eq!(&once, &twice);

        let expected = if value.is_zero() { 0 } else { ROWS.len() * SIZES.len() };
        prop_assert_eq!(once.completion().filled, expected);
    }

    #[test]
    fn completion_counts_distinct_non_zero_cells(
        cells in prop::collection::vec(cell_strategy(), 0..40)
    ) {
        let mut model: BTreeMap<(i32, &str), Decimal> = BTreeMap::new();
        let mut forward = empty_matrix();
        for (row, size, qty) in &cells {
            forward.set_cell(*row, size, *qty).unwrap();
            model.insert((*row, *size), *qty);
        }
        let filled = model.values().filter(|q| !q.is_zero()).count();
        prop_assert_eq!(forward.completion().filled, filled);
        prop_assert_eq!(forward.completion().total, ROWS.len() * SIZES.len());

        // Same final cell values applied in reverse order.
        let mut reversed = empty_matrix();
        for ((row, size), qty) in model.iter().rev() {
            reversed.set_cell(*row, size, *qty).unwrap();
        }
        prop_assert_eq!(reversed.completion(), forward.completion());
        prop_assert_eq!(reversed.items(), forward.items());
    }

    #[test]
    fn incremental_pattern_matches_column_position(
        base in 0i64..100,
        increment in 0i64..10,
    ) {
        let mut matrix = empty_matrix();
        matrix
            .apply_incremental_pattern(Decimal::from(base), Decimal::from(increment))
            .unwrap();

        for (i, column) in matrix.columns().iter().enumerate() {
            let expected = Decimal::from(base + increment * i as i64);
            for row in ROWS {
                let got = matrix.quantity(row, column).unwrap_or(Decimal::ZERO);
                prop_assert_eq!(got, expected);
            }
        }
    }

    #[test]
    fn size_sort_is_a_descending_permutation(
        labels in prop::collection::vec(
            prop_oneof![
                prop::sample::select(SIZES.to_vec()).prop_map(String::from),
                (1u32..60).prop_map(|n| n.to_string()),
                "[a-z]{1,4}",
            ],
            0..12,
        )
    ) {
        let sorted = sort_sizes_descending(labels.clone());
        let unique: HashSet<_> = labels.iter().cloned().collect();
        prop_assert_eq!(sorted.len(), unique.len());
        prop_assert_eq!(sorted.iter().cloned().collect::<HashSet<_>>(), unique);
        prop_assert_eq!(sort_sizes_descending(sorted.clone()), sorted);
    }
}
