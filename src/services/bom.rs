use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::{
    bom::{
        assembler::{BomAssembler, BomAssembly},
        color_map::ColorVariationMap,
        common_registry::CommonMaterialsRegistry,
        error::{BomError, ValidationIssue},
        size_matrix::SizeConsumptionMatrix,
        types::{
            BatchSaveResponse, BomStatus, Category, CategoryId, ColorVariationItem,
            ColorVariationRecord, CommonMaterialItem, CommonMaterialRecord, CommonMaterialsBatch,
            FinalizeBomRequest, FinalizeBomResponse, Material, MaterialId, ProductDescriptor,
            ProductId, SizeConsumptionItem, SizeConsumptionRecord, SizeConsumptionsBatch,
            VariantCombination, VariationMaterialsBatch,
        },
    },
    entities::{
        bom_common_material::{self, Entity as CommonMaterialEntity},
        bom_size_consumption::{self, Entity as SizeConsumptionEntity},
        bom_variation_material::{self, Entity as VariationMaterialEntity},
        material::{self, Entity as MaterialEntity},
        material_category::{self, Entity as CategoryEntity},
        product::Entity as ProductEntity,
        product_combination::{self, Entity as CombinationEntity},
    },
    errors::ServiceError,
    events::{Event, EventSender},
};

/// Persistence of the three wizard registries.
///
/// Every batch replaces the product's rows for its registry inside one
/// transaction. Items are validated with the same registries the wizard uses,
/// so the server rejects anything a session would have rejected locally.
#[derive(Clone)]
pub struct BomService {
    db: Arc<DatabaseConnection>,
    event_sender: Arc<EventSender>,
}

impl BomService {
    pub fn new(db: Arc<DatabaseConnection>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self))]
    pub async fn common_materials(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<CommonMaterialRecord>, ServiceError> {
        let rows = CommonMaterialEntity::find()
            .filter(bom_common_material::Column::ProductId.eq(product_id))
            .order_by_asc(bom_common_material::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(rows.into_iter().map(CommonMaterialRecord::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn variation_materials(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ColorVariationRecord>, ServiceError> {
        let rows = VariationMaterialEntity::find()
            .filter(bom_variation_material::Column::ProductId.eq(product_id))
            .order_by_asc(bom_variation_material::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(rows.into_iter().map(ColorVariationRecord::from).collect())
    }

    #[instrument(skip(self))]
    pub async fn size_consumptions(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<SizeConsumptionRecord>, ServiceError> {
        let rows = SizeConsumptionEntity::find()
            .filter(bom_size_consumption::Column::ProductId.eq(product_id))
            .order_by_asc(bom_size_consumption::Column::Id)
            .all(&*self.db)
            .await?;
        Ok(rows.into_iter().map(SizeConsumptionRecord::from).collect())
    }

    /// A product has a BOM once common or color variation rows exist.
    #[instrument(skip(self))]
    pub async fn status(&self, product_id: ProductId) -> Result<BomStatus, ServiceError> {
        let db = &*self.db;
        let common = CommonMaterialEntity::find()
            .filter(bom_common_material::Column::ProductId.eq(product_id))
            .count(db)
            .await?;
        let variations = VariationMaterialEntity::find()
            .filter(bom_variation_material::Column::ProductId.eq(product_id))
            .count(db)
            .await?;
        Ok(BomStatus {
            product_id,
            has_bom: common > 0 || variations > 0,
        })
    }

    #[instrument(skip(self, batch), fields(items = batch.items.len()))]
    pub async fn save_common_materials(
        &self,
        batch: CommonMaterialsBatch,
    ) -> Result<BatchSaveResponse, ServiceError> {
        batch.validate()?;
        let product_id = resolve_batch_product(batch.product_id, &batch.items)?;

        let txn = self.db.begin().await?;
        let product = load_descriptor(&txn, product_id).await?;
        let saved = replace_common(&txn, &product, &batch.items, &batch.user).await?;
        txn.commit().await?;

        info!(product_id, saved, "Common materials replaced");
        self.event_sender
            .send_or_log(Event::CommonMaterialsSaved {
                product_id,
                count: saved,
                user: batch.user,
            })
            .await;
        Ok(BatchSaveResponse { product_id, saved })
    }

    #[instrument(skip(self, batch), fields(product_id = batch.product_id, items = batch.items.len()))]
    pub async fn save_variation_materials(
        &self,
        batch: VariationMaterialsBatch,
    ) -> Result<BatchSaveResponse, ServiceError> {
        batch.validate()?;
        let product_id = batch.product_id;

        let txn = self.db.begin().await?;
        let product = load_descriptor(&txn, product_id).await?;
        let saved = replace_variations(&txn, &product, &batch.items, &batch.user).await?;
        txn.commit().await?;

        info!(product_id, saved, "Color variation materials replaced");
        self.event_sender
            .send_or_log(Event::VariationMaterialsSaved {
                product_id,
                count: saved,
                user: batch.user,
            })
            .await;
        Ok(BatchSaveResponse { product_id, saved })
    }

    #[instrument(skip(self, batch), fields(product_id = batch.product_id, items = batch.items.len()))]
    pub async fn save_size_consumptions(
        &self,
        batch: SizeConsumptionsBatch,
    ) -> Result<BatchSaveResponse, ServiceError> {
        batch.validate()?;
        let product_id = batch.product_id;

        let txn = self.db.begin().await?;
        let product = load_descriptor(&txn, product_id).await?;
        let saved = replace_sizes(&txn, &product, &batch.items, &batch.user).await?;
        txn.commit().await?;

        info!(product_id, saved, "Size consumptions replaced");
        self.event_sender
            .send_or_log(Event::SizeConsumptionsSaved {
                product_id,
                count: saved,
                user: batch.user,
            })
            .await;
        Ok(BatchSaveResponse { product_id, saved })
    }

    /// Replaces all three registries in one transaction; any invalid item
    /// rolls the whole request back.
    #[instrument(skip(self, request), fields(product_id = request.product_id))]
    pub async fn finalize(
        &self,
        request: FinalizeBomRequest,
    ) -> Result<FinalizeBomResponse, ServiceError> {
        request.validate()?;
        let product_id = request.product_id;
        for item in &request.common_materials {
            if item.product_id != product_id {
                return Err(BomError::from(ValidationIssue::ProductMismatch {
                    expected: product_id,
                    found: item.product_id,
                })
                .into());
            }
        }

        let txn = self.db.begin().await?;
        let product = load_descriptor(&txn, product_id).await?;
        let common_materials =
            replace_common(&txn, &product, &request.common_materials, &request.user).await?;
        let variation_materials =
            replace_variations(&txn, &product, &request.variation_materials, &request.user)
                .await?;
        let size_consumptions =
            replace_sizes(&txn, &product, &request.size_consumptions, &request.user).await?;
        txn.commit().await?;

        info!(
            product_id,
            common_materials, variation_materials, size_consumptions, "BOM finalized"
        );
        self.event_sender
            .send_or_log(Event::BomFinalized {
                product_id,
                user: request.user,
                finalized_at: Utc::now(),
            })
            .await;

        Ok(FinalizeBomResponse {
            product_id,
            common_materials,
            variation_materials,
            size_consumptions,
        })
    }

    /// Assembles the persisted BOM of a product against its combinations.
    #[instrument(skip(self))]
    pub async fn assemble(&self, product_id: ProductId) -> Result<BomAssembly, ServiceError> {
        let db = &*self.db;
        let product = load_descriptor(db, product_id).await?;
        let common_records = self.common_materials(product_id).await?;
        let variation_records = self.variation_materials(product_id).await?;
        let size_records = self.size_consumptions(product_id).await?;

        let categories: HashMap<CategoryId, Category> = CategoryEntity::find()
            .all(db)
            .await?
            .into_iter()
            .map(|m| (m.id, Category::from(m)))
            .collect();
        let material_ids: HashSet<MaterialId> = common_records
            .iter()
            .map(|r| r.material_id)
            .chain(variation_records.iter().map(|r| r.material_id))
            .collect();
        let materials = load_materials(db, material_ids).await?;

        let mut common = CommonMaterialsRegistry::new(product_id);
        common.replace_from_records(&common_records, &materials);
        let mut colors = ColorVariationMap::new();
        colors.replace_from_records(&variation_records);

        let mut rows: Vec<CategoryId> = Vec::new();
        for record in &size_records {
            if !rows.contains(&record.category_id) {
                rows.push(record.category_id);
            }
        }
        let mut sizes = SizeConsumptionMatrix::new(rows, product.size_labels());
        sizes.replace_from_records(&size_records);

        let assembly = BomAssembler::new(&categories, &materials, &common, &colors, &sizes)
            .assemble(&product.combinations);
        if !assembly.is_complete() {
            warn!(
                product_id,
                missing = assembly.missing.len(),
                "Persisted BOM is incomplete"
            );
        }
        Ok(assembly)
    }
}

/// Product of a common materials batch: explicit, else taken from the items.
fn resolve_batch_product(
    explicit: Option<ProductId>,
    items: &[CommonMaterialItem],
) -> Result<ProductId, ServiceError> {
    let product_id = match (explicit, items.first()) {
        (Some(id), _) => id,
        (None, Some(first)) => first.product_id,
        (None, None) => {
            return Err(ServiceError::ValidationError(
                "product_id is required when the batch has no items".to_string(),
            ))
        }
    };
    if let Some(item) = items.iter().find(|i| i.product_id != product_id) {
        return Err(BomError::from(ValidationIssue::ProductMismatch {
            expected: product_id,
            found: item.product_id,
        })
        .into());
    }
    Ok(product_id)
}

async fn load_descriptor<C: ConnectionTrait>(
    db: &C,
    product_id: ProductId,
) -> Result<ProductDescriptor, ServiceError> {
    let product = ProductEntity::find_by_id(product_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;
    let combinations = CombinationEntity::find()
        .filter(product_combination::Column::ProductId.eq(product_id))
        .order_by_asc(product_combination::Column::Id)
        .all(db)
        .await?
        .into_iter()
        .map(VariantCombination::from)
        .collect();
    Ok(ProductDescriptor {
        product: product.into(),
        combinations,
    })
}

async fn load_materials<C: ConnectionTrait>(
    db: &C,
    ids: HashSet<MaterialId>,
) -> Result<HashMap<MaterialId, Material>, ServiceError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(MaterialEntity::find()
        .filter(material::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|m| (m.id, Material::from(m)))
        .collect())
}

async fn load_categories<C: ConnectionTrait>(
    db: &C,
    ids: HashSet<CategoryId>,
) -> Result<HashMap<CategoryId, Category>, ServiceError> {
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(CategoryEntity::find()
        .filter(material_category::Column::Id.is_in(ids))
        .all(db)
        .await?
        .into_iter()
        .map(|m| (m.id, Category::from(m)))
        .collect())
}

fn service_error(err: BomError) -> ServiceError {
    err.into()
}

async fn replace_common(
    txn: &DatabaseTransaction,
    product: &ProductDescriptor,
    items: &[CommonMaterialItem],
    user: &str,
) -> Result<usize, ServiceError> {
    let product_id = product.product.id;
    let materials = load_materials(txn, items.iter().map(|i| i.material_id).collect()).await?;
    let categories =
        load_categories(txn, materials.values().map(|m| m.category_id).collect()).await?;

    let mut registry = CommonMaterialsRegistry::new(product_id);
    for item in items {
        let material = materials
            .get(&item.material_id)
            .ok_or(BomError::UnknownMaterial(item.material_id))
            .map_err(service_error)?;
        let category = categories
            .get(&material.category_id)
            .ok_or(BomError::UnknownCategory(material.category_id))
            .map_err(service_error)?;
        let entry = registry
            .add(Some(category), Some(material), Some(item.base_quantity))
            .map_err(service_error)?;
        if entry.unit_id != item.unit_id {
            return Err(service_error(
                ValidationIssue::UnitMismatch {
                    material_id: item.material_id,
                    expected: entry.unit_id,
                    found: item.unit_id,
                }
                .into(),
            ));
        }
        if entry.base_quantity != item.base_quantity {
            return Err(service_error(
                ValidationIssue::QuantityMismatch {
                    material_id: item.material_id,
                    expected: entry.base_quantity,
                    found: item.base_quantity,
                }
                .into(),
            ));
        }
    }

    CommonMaterialEntity::delete_many()
        .filter(bom_common_material::Column::ProductId.eq(product_id))
        .exec(txn)
        .await?;
    for entry in registry.entries() {
        bom_common_material::ActiveModel {
            product_id: Set(product_id),
            category_id: Set(entry.category_id),
            material_id: Set(entry.material_id),
            unit_id: Set(entry.unit_id),
            base_quantity: Set(entry.base_quantity),
            created_by: Set(user.to_string()),
            ..Default::default()
        }
        .insert(txn)
        .await?;
    }
    Ok(registry.len())
}

async fn replace_variations(
    txn: &DatabaseTransaction,
    product: &ProductDescriptor,
    items: &[ColorVariationItem],
    user: &str,
) -> Result<usize, ServiceError> {
    let product_id = product.product.id;
    let materials = load_materials(txn, items.iter().map(|i| i.material_id).collect()).await?;
    let categories = load_categories(txn, items.iter().map(|i| i.category_id).collect()).await?;

    let mut colors = ColorVariationMap::new();
    for item in items {
        let category = categories
            .get(&item.category_id)
            .ok_or(BomError::UnknownCategory(item.category_id))
            .map_err(service_error)?;
        let material = materials
            .get(&item.material_id)
            .ok_or(BomError::UnknownMaterial(item.material_id))
            .map_err(service_error)?;
        if !product.has_color(item.color_id) {
            return Err(service_error(
                ValidationIssue::UnknownColor {
                    color_id: item.color_id,
                }
                .into(),
            ));
        }
        let replaced = colors
            .assign(category, item.color_id, material)
            .map_err(service_error)?;
        if replaced.is_some() {
            return Err(service_error(
                ValidationIssue::DuplicateItem {
                    what: "category/color",
                    key: format!("{}/{}", item.category_id, item.color_id),
                }
                .into(),
            ));
        }
        colors
            .set_base_quantity(category, item.quantity)
            .map_err(service_error)?;
    }

    VariationMaterialEntity::delete_many()
        .filter(bom_variation_material::Column::ProductId.eq(product_id))
        .exec(txn)
        .await?;
    let rows = colors.items();
    for row in &rows {
        bom_variation_material::ActiveModel {
            product_id: Set(product_id),
            category_id: Set(row.category_id),
            color_id: Set(row.color_id),
            material_id: Set(row.material_id),
            quantity: Set(row.quantity),
            created_by: Set(user.to_string()),
            ..Default::default()
        }
        .insert(txn)
        .await?;
    }
    Ok(rows.len())
}

/// Zero quantities mean "not set" and are not stored.
async fn replace_sizes(
    txn: &DatabaseTransaction,
    product: &ProductDescriptor,
    items: &[SizeConsumptionItem],
    user: &str,
) -> Result<usize, ServiceError> {
    let product_id = product.product.id;
    let categories = load_categories(txn, items.iter().map(|i| i.category_id).collect()).await?;

    let mut rows: Vec<CategoryId> = Vec::new();
    for item in items {
        if !categories.contains_key(&item.category_id) {
            return Err(service_error(BomError::UnknownCategory(item.category_id)));
        }
        if !rows.contains(&item.category_id) {
            rows.push(item.category_id);
        }
    }

    let mut matrix = SizeConsumptionMatrix::new(rows, product.size_labels());
    let mut seen = HashSet::new();
    for item in items {
        if !seen.insert((item.category_id, item.size_label.as_str())) {
            return Err(service_error(
                ValidationIssue::DuplicateItem {
                    what: "category/size",
                    key: format!("{}/{}", item.category_id, item.size_label),
                }
                .into(),
            ));
        }
        matrix
            .set_cell(item.category_id, &item.size_label, item.quantity)
            .map_err(service_error)?;
    }

    SizeConsumptionEntity::delete_many()
        .filter(bom_size_consumption::Column::ProductId.eq(product_id))
        .exec(txn)
        .await?;
    let cells = matrix.items();
    for cell in &cells {
        bom_size_consumption::ActiveModel {
            product_id: Set(product_id),
            category_id: Set(cell.category_id),
            size_label: Set(cell.size_label.clone()),
            quantity: Set(cell.quantity),
            created_by: Set(user.to_string()),
            ..Default::default()
        }
        .insert(txn)
        .await?;
    }
    Ok(cells.len())
}
