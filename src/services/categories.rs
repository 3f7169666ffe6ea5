use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, DatabaseConnection, EntityTrait, QueryOrder,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    bom::{
        error::BomError,
        types::{validate_category_flags, Category, CategoryId},
    },
    entities::material_category::{self, Entity as CategoryEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Payload for creating or replacing a material category.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CategoryInput {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[serde(default)]
    pub has_color: bool,
    #[serde(default)]
    pub has_size: bool,
    #[serde(default)]
    pub quantity_varies_by_size: bool,
    #[serde(default)]
    pub material_varies_by_color: bool,
    #[serde(default)]
    pub has_waste: bool,
    #[serde(default)]
    pub waste_percentage: Option<Decimal>,
}

impl CategoryInput {
    fn check(&self) -> Result<(), ServiceError> {
        self.validate()?;
        validate_category_flags(
            &self.name,
            self.has_color,
            self.material_varies_by_color,
            self.has_waste,
            self.waste_percentage,
        )
        .map_err(|issue| BomError::from(issue).into())
    }
}

#[derive(Clone)]
pub struct CategoryService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl CategoryService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Category>, ServiceError> {
        let rows = CategoryEntity::find()
            .order_by_asc(material_category::Column::Name)
            .all(&*self.db)
            .await?;
        Ok(rows.into_iter().map(Category::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: CategoryId) -> Result<Category, ServiceError> {
        CategoryEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .map(Category::from)
            .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", id)))
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create(&self, input: CategoryInput) -> Result<Category, ServiceError> {
        input.check()?;

        let model = material_category::ActiveModel {
            name: Set(input.name.trim().to_string()),
            has_color: Set(input.has_color),
            has_size: Set(input.has_size),
            quantity_varies_by_size: Set(input.quantity_varies_by_size),
            material_varies_by_color: Set(input.material_varies_by_color),
            has_waste: Set(input.has_waste),
            waste_percentage: Set(input.waste_percentage),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(category_id = model.id, "Material category created");
        self.event_sender
            .send_or_log(Event::CategoryCreated(model.id))
            .await;
        Ok(model.into())
    }

    #[instrument(skip(self, input), fields(name = %input.name))]
    pub async fn update(
        &self,
        id: CategoryId,
        input: CategoryInput,
    ) -> Result<Category, ServiceError> {
        input.check()?;

        let existing = CategoryEntity::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", id)))?;

        let mut active: material_category::ActiveModel = existing.into();
        active.name = Set(input.name.trim().to_string());
        active.has_color = Set(input.has_color);
        active.has_size = Set(input.has_size);
        active.quantity_varies_by_size = Set(input.quantity_varies_by_size);
        active.material_varies_by_color = Set(input.material_varies_by_color);
        active.has_waste = Set(input.has_waste);
        active.waste_percentage = Set(input.waste_percentage);
        let model = active.update(&*self.db).await?;

        info!(category_id = id, "Material category updated");
        self.event_sender
            .send_or_log(Event::CategoryUpdated(id))
            .await;
        Ok(model.into())
    }
}
