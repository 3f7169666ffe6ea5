//! In-process [`BomGateway`] backed directly by the services, for running a
//! wizard session next to the database without going through HTTP.

use async_trait::async_trait;

use super::{
    bom::BomService, categories::CategoryService, materials::MaterialService,
    products::ProductService,
};
use crate::{
    bom::{
        gateway::{BomGateway, GatewayError},
        types::{
            BatchSaveResponse, Category, CategoryId, ColorVariationRecord, CommonMaterialRecord,
            CommonMaterialsBatch, FinalizeBomRequest, FinalizeBomResponse, Material, Product,
            ProductId, SizeConsumptionRecord, SizeConsumptionsBatch, VariantCombination,
            VariationMaterialsBatch,
        },
    },
    errors::ServiceError,
};

#[derive(Clone)]
pub struct ServiceBomGateway {
    categories: CategoryService,
    materials: MaterialService,
    products: ProductService,
    bom: BomService,
}

impl ServiceBomGateway {
    pub fn new(
        categories: CategoryService,
        materials: MaterialService,
        products: ProductService,
        bom: BomService,
    ) -> Self {
        Self {
            categories,
            materials,
            products,
            bom,
        }
    }
}

impl From<ServiceError> for GatewayError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::NotFound(what) => GatewayError::NotFound(what),
            other => GatewayError::Status {
                status: other.status_code().as_u16(),
                message: other.response_message(),
            },
        }
    }
}

#[async_trait]
impl BomGateway for ServiceBomGateway {
    async fn fetch_categories(&self) -> Result<Vec<Category>, GatewayError> {
        Ok(self.categories.list().await?)
    }

    async fn fetch_materials(
        &self,
        category_id: Option<CategoryId>,
    ) -> Result<Vec<Material>, GatewayError> {
        Ok(self.materials.list(category_id).await?)
    }

    async fn fetch_product(&self, product_id: ProductId) -> Result<Product, GatewayError> {
        Ok(self.products.get(product_id).await?)
    }

    async fn fetch_combinations(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<VariantCombination>, GatewayError> {
        Ok(self.products.combinations(product_id).await?)
    }

    async fn fetch_common_materials(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<CommonMaterialRecord>, GatewayError> {
        Ok(self.bom.common_materials(product_id).await?)
    }

    async fn fetch_variation_materials(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ColorVariationRecord>, GatewayError> {
        Ok(self.bom.variation_materials(product_id).await?)
    }

    async fn fetch_size_consumptions(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<SizeConsumptionRecord>, GatewayError> {
        Ok(self.bom.size_consumptions(product_id).await?)
    }

    async fn has_bom(&self, product_id: ProductId) -> Result<bool, GatewayError> {
        Ok(self.bom.status(product_id).await?.has_bom)
    }

    async fn save_common_materials(
        &self,
        batch: &CommonMaterialsBatch,
    ) -> Result<BatchSaveResponse, GatewayError> {
        Ok(self.bom.save_common_materials(batch.clone()).await?)
    }

    async fn save_variation_materials(
        &self,
        batch: &VariationMaterialsBatch,
    ) -> Result<BatchSaveResponse, GatewayError> {
        Ok(self.bom.save_variation_materials(batch.clone()).await?)
    }

    async fn save_size_consumptions(
        &self,
        batch: &SizeConsumptionsBatch,
    ) -> Result<BatchSaveResponse, GatewayError> {
        Ok(self.bom.save_size_consumptions(batch.clone()).await?)
    }

    async fn finalize_bom(
        &self,
        request: &FinalizeBomRequest,
    ) -> Result<FinalizeBomResponse, GatewayError> {
        Ok(self.bom.finalize(request.clone()).await?)
    }
}
