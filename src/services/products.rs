use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    bom::types::{Product, ProductDescriptor, ProductId, VariantCombination},
    entities::{
        product::{self, Entity as ProductEntity},
        product_combination::{self, Entity as CombinationEntity},
    },
    errors::ServiceError,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub combinations: Vec<VariantCombination>,
}

#[derive(Clone)]
pub struct ProductService {
    db: Arc<DatabaseConnection>,
}

impl ProductService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: ProductId) -> Result<Product, ServiceError> {
        ProductEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .map(Product::from)
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))
    }

    /// Size/color combinations of a product, ordered by insertion.
    #[instrument(skip(self))]
    pub async fn combinations(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<VariantCombination>, ServiceError> {
        self.get(product_id).await?;
        let rows = CombinationEntity::find()
            .filter(product_combination::Column::ProductId.eq(product_id))
            .order_by_asc(product_combination::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(rows.into_iter().map(VariantCombination::from).collect())
    }

    pub async fn descriptor(&self, product_id: ProductId) -> Result<ProductDescriptor, ServiceError> {
        let (product, combinations) =
            futures::try_join!(self.get(product_id), self.combinations(product_id))?;
        Ok(ProductDescriptor {
            product,
            combinations,
        })
    }

    /// Creates a product together with its variant combinations.
    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: CreateProductInput) -> Result<ProductDescriptor, ServiceError> {
        input.validate()?;

        let mut seen = HashSet::new();
        for combination in &input.combinations {
            if !seen.insert((combination.size_id, combination.color_id)) {
                return Err(ServiceError::Conflict(format!(
                    "combination size {} / color {} appears more than once",
                    combination.size_id, combination.color_id
                )));
            }
        }

        let txn = self.db.begin().await?;
        let product = product::ActiveModel {
            name: Set(input.name),
            code: Set(input.code),
            ..Default::default()
        }
        .insert(&txn)
        .await?;

        let mut combinations = Vec::with_capacity(input.combinations.len());
        for combination in input.combinations {
            let row = product_combination::ActiveModel {
                product_id: Set(product.id),
                size_id: Set(combination.size_id),
                color_id: Set(combination.color_id),
                size_label: Set(combination.size_label),
                color_label: Set(combination.color_label),
                color_hex: Set(combination.color_hex),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            combinations.push(VariantCombination::from(row));
        }
        txn.commit().await?;

        info!(product_id = product.id, variants = combinations.len(), "Product created");
        Ok(ProductDescriptor {
            product: product.into(),
            combinations,
        })
    }
}
