//! Classification of material categories into wizard behaviors.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

use super::types::Category;

/// Where a category's material is chosen.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BehaviorMode {
    /// One material, one fixed quantity, chosen in step 1.
    FixedCommon,
    /// Material chosen in step 1, quantity driven by size.
    SizeAutomatic,
    /// Material chosen per color in step 2.
    ColorVariable,
}

/// Where a category's per-variant quantity comes from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QuantityRule {
    /// The base quantity of the entry applies to every size.
    Base,
    /// The size consumption matrix supplies a quantity per size.
    PerSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CategoryBehavior {
    pub mode: BehaviorMode,
    pub quantity: QuantityRule,
}

impl CategoryBehavior {
    /// Step 1 asks for a quantity only for fixed common categories.
    pub fn requires_step_one_quantity(&self) -> bool {
        self.mode == BehaviorMode::FixedCommon
    }

    pub fn is_common(&self) -> bool {
        self.mode != BehaviorMode::ColorVariable
    }
}

/// Resolves a category's behavior from its flags.
///
/// `has_color` decides the material source and wins over `has_size`;
/// `quantity_varies_by_size` alone decides the quantity source.
pub fn resolve(category: &Category) -> CategoryBehavior {
    let mode = if category.has_color {
        BehaviorMode::ColorVariable
    } else if category.has_size {
        BehaviorMode::SizeAutomatic
    } else {
        BehaviorMode::FixedCommon
    };
    let quantity = if category.quantity_varies_by_size {
        QuantityRule::PerSize
    } else {
        QuantityRule::Base
    };
    CategoryBehavior { mode, quantity }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn category(has_color: bool, has_size: bool, varies_by_size: bool) -> Category {
        Category {
            id: 1,
            name: "Fabric".into(),
            has_color,
            has_size,
            quantity_varies_by_size: varies_by_size,
            material_varies_by_color: has_color,
            has_waste: false,
            waste_percentage: None,
        }
    }

    #[rstest]
    #[case(false, false, false, BehaviorMode::FixedCommon, QuantityRule::Base)]
    #[case(false, true, false, BehaviorMode::SizeAutomatic, QuantityRule::Base)]
    #[case(false, true, true, BehaviorMode::SizeAutomatic, QuantityRule::PerSize)]
    #[case(true, false, false, BehaviorMode::ColorVariable, QuantityRule::Base)]
    #[case(true, true, false, BehaviorMode::ColorVariable, QuantityRule::Base)]
    #[case(true, true, true, BehaviorMode::ColorVariable, QuantityRule::PerSize)]
    #[case(false, false, true, BehaviorMode::FixedCommon, QuantityRule::PerSize)]
    fn resolves_mode_and_quantity_rule(
        #[case] has_color: bool,
        #[case] has_size: bool,
        #[case] varies_by_size: bool,
        #[case] mode: BehaviorMode,
        #[case] quantity: QuantityRule,
    ) {
        let behavior = resolve(&category(has_color, has_size, varies_by_size));
        assert_eq!(behavior, CategoryBehavior { mode, quantity });
    }

    #[test]
    fn only_fixed_common_asks_for_quantity() {
        assert!(resolve(&category(false, false, false)).requires_step_one_quantity());
        assert!(!resolve(&category(false, true, false)).requires_step_one_quantity());
        assert!(!resolve(&category(true, false, false)).is_common());
    }

    #[test]
    fn mode_names_round_trip_through_strings() {
        assert_eq!(BehaviorMode::SizeAutomatic.to_string(), "size_automatic");
        assert_eq!(
            "color_variable".parse::<BehaviorMode>().unwrap(),
            BehaviorMode::ColorVariable
        );
    }
}
