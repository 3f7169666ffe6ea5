use serde::{Deserialize, Serialize};
use utoipa::IntoParams;

use crate::bom::types::{CategoryId, ProductId};

/// `?product_id=` filter shared by the BOM read endpoints.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, IntoParams)]
pub struct ProductQuery {
    pub product_id: ProductId,
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, IntoParams)]
pub struct MaterialQuery {
    pub category_id: Option<CategoryId>,
}
