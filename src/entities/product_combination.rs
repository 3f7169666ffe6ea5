use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::bom::types::VariantCombination;

/// Size and color variant of a product, read-only for the BOM wizard.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_combinations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub product_id: i32,
    pub size_id: i32,
    pub color_id: i32,
    pub size_label: String,
    pub color_label: String,
    pub color_hex: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for VariantCombination {
    fn from(model: Model) -> Self {
        VariantCombination {
            size_id: model.size_id,
            color_id: model.color_id,
            size_label: model.size_label,
            color_label: model.color_label,
            color_hex: model.color_hex,
        }
    }
}
