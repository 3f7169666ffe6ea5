use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    bom::types::{CategoryId, Material, MaterialId, UnitId},
    entities::{
        material::{self, Entity as MaterialEntity},
        material_category::Entity as CategoryEntity,
    },
    errors::ServiceError,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateMaterialInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub category_id: CategoryId,
    pub purchase_unit_id: UnitId,
    #[serde(default)]
    pub consumption_unit_id: Option<UnitId>,
}

/// Read side of the material catalog, plus creation for seeding.
#[derive(Clone)]
pub struct MaterialService {
    db: Arc<DatabaseConnection>,
}

impl MaterialService {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn list(&self, category_id: Option<CategoryId>) -> Result<Vec<Material>, ServiceError> {
        let mut query = MaterialEntity::find().order_by_asc(material::Column::Name);
        if let Some(category_id) = category_id {
            query = query.filter(material::Column::CategoryId.eq(category_id));
        }
        let rows = query.all(&*self.db).await?;
        Ok(rows.into_iter().map(Material::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: MaterialId) -> Result<Material, ServiceError> {
        MaterialEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .map(Material::from)
            .ok_or_else(|| ServiceError::NotFound(format!("Material {} not found", id)))
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: CreateMaterialInput) -> Result<Material, ServiceError> {
        input.validate()?;

        if CategoryEntity::find_by_id(input.category_id)
            .one(&*self.db)
            .await?
            .is_none()
        {
            return Err(ServiceError::NotFound(format!(
                "Category {} not found",
                input.category_id
            )));
        }

        let model = material::ActiveModel {
            name: Set(input.name),
            category_id: Set(input.category_id),
            purchase_unit_id: Set(input.purchase_unit_id),
            consumption_unit_id: Set(input.consumption_unit_id),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(material_id = model.id, "Material created");
        Ok(model.into())
    }
}
