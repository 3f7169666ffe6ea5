pub mod bom_common_material;
pub mod bom_variation_material;
pub mod bom_size_consumption;
pub mod material;
pub mod material_category;
pub mod product;
pub mod product_combination;
