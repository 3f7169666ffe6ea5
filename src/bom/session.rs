//! The BOM wizard session.
//!
//! A [`BomWizardSession`] owns everything one wizard run edits: the common
//! materials registry (step 1), the color variation map (step 2) and the size
//! consumption matrix (step 3). It is created for a single product and
//! dropped when the wizard completes or is cancelled.

use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use super::assembler::{BomAssembler, BomAssembly};
use super::behavior::{self, BehaviorMode, CategoryBehavior};
use super::color_map::ColorVariationMap;
use super::common_registry::CommonMaterialsRegistry;
use super::error::{BomError, ValidationIssue};
use super::gateway::BomGateway;
use super::size_matrix::{Completion, SizeConsumptionMatrix, SizeMatrixRowFilter};
use super::types::{
    Category, CategoryId, ColorId, CommonMaterialEntry, CommonMaterialsBatch, FinalizeBomRequest,
    FinalizeBomResponse, Material, MaterialId, ProductDescriptor, ProductId,
};

/// Network operations guarded against double submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OperationKind {
    SaveCommonMaterials,
    Reload,
    Finalize,
}

impl OperationKind {
    fn index(self) -> usize {
        match self {
            OperationKind::SaveCommonMaterials => 0,
            OperationKind::Reload => 1,
            OperationKind::Finalize => 2,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::SaveCommonMaterials => "saving common materials",
            OperationKind::Reload => "reloading the BOM",
            OperationKind::Finalize => "finalizing the BOM",
        };
        f.write_str(name)
    }
}

/// One flag per [`OperationKind`]; clones share the flags.
#[derive(Debug, Clone, Default)]
pub struct InFlightOperations {
    flags: Arc<[AtomicBool; 3]>,
}

impl InFlightOperations {
    pub fn is_running(&self, kind: OperationKind) -> bool {
        self.flags[kind.index()].load(Ordering::Acquire)
    }

    /// Marks `kind` as running until the returned guard is dropped.
    pub fn begin(&self, kind: OperationKind) -> Result<InFlightGuard, BomError> {
        self.flags[kind.index()]
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| BomError::OperationInProgress(kind))?;
        Ok(InFlightGuard {
            flags: Arc::clone(&self.flags),
            index: kind.index(),
        })
    }
}

#[derive(Debug)]
pub struct InFlightGuard {
    flags: Arc<[AtomicBool; 3]>,
    index: usize,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.flags[self.index].store(false, Ordering::Release);
    }
}

#[derive(Debug, Clone)]
pub struct WizardSettings {
    pub user: String,
    pub row_filter: SizeMatrixRowFilter,
}

impl WizardSettings {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            row_filter: SizeMatrixRowFilter::default(),
        }
    }

    pub fn with_row_filter(mut self, row_filter: SizeMatrixRowFilter) -> Self {
        self.row_filter = row_filter;
        self
    }
}

#[derive(Debug, Clone)]
pub struct FinalizeOutcome {
    pub assembly: BomAssembly,
    pub response: FinalizeBomResponse,
    /// False when the BOM was committed but the registries could not be
    /// reloaded afterwards; the local state is still what was sent.
    pub reloaded: bool,
}

pub struct BomWizardSession {
    gateway: Arc<dyn BomGateway>,
    settings: WizardSettings,
    product: ProductDescriptor,
    categories: HashMap<CategoryId, Category>,
    category_order: Vec<CategoryId>,
    materials: HashMap<MaterialId, Material>,
    common: CommonMaterialsRegistry,
    colors: ColorVariationMap,
    sizes: SizeConsumptionMatrix,
    in_flight: InFlightOperations,
}

impl fmt::Debug for BomWizardSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BomWizardSession")
            .field("product_id", &self.product.product.id)
            .field("common", &self.common.len())
            .field("colors", &self.colors.len())
            .field("sizes", &self.sizes.completion())
            .finish()
    }
}

impl BomWizardSession {
    /// Loads catalogs and any persisted BOM for `product_id`.
    #[instrument(skip(gateway, settings), fields(user = %settings.user))]
    pub async fn open(
        gateway: Arc<dyn BomGateway>,
        product_id: ProductId,
        settings: WizardSettings,
    ) -> Result<Self, BomError> {
        let (product, combinations, categories, materials) = futures::try_join!(
            gateway.fetch_product(product_id),
            gateway.fetch_combinations(product_id),
            gateway.fetch_categories(),
            gateway.fetch_materials(None),
        )?;

        let category_order = categories.iter().map(|c| c.id).collect();
        let descriptor = ProductDescriptor {
            product,
            combinations,
        };
        let sizes = SizeConsumptionMatrix::new(Vec::new(), descriptor.size_labels());

        let mut session = Self {
            gateway,
            settings,
            product: descriptor,
            categories: categories.into_iter().map(|c| (c.id, c)).collect(),
            category_order,
            materials: materials.into_iter().map(|m| (m.id, m)).collect(),
            common: CommonMaterialsRegistry::new(product_id),
            colors: ColorVariationMap::new(),
            sizes,
            in_flight: InFlightOperations::default(),
        };
        session.reload().await?;

        info!(
            product_id,
            combinations = session.product.combinations.len(),
            "BOM wizard session opened"
        );
        Ok(session)
    }

    pub fn product(&self) -> &ProductDescriptor {
        &self.product
    }

    pub fn product_id(&self) -> ProductId {
        self.product.product.id
    }

    pub fn user(&self) -> &str {
        &self.settings.user
    }

    /// Shared handle for observing running operations.
    pub fn in_flight(&self) -> InFlightOperations {
        self.in_flight.clone()
    }

    /// Categories in catalog order.
    pub fn categories(&self) -> Vec<&Category> {
        self.category_order
            .iter()
            .filter_map(|id| self.categories.get(id))
            .collect()
    }

    pub fn category(&self, category_id: CategoryId) -> Result<&Category, BomError> {
        self.categories
            .get(&category_id)
            .ok_or(BomError::UnknownCategory(category_id))
    }

    pub fn material(&self, material_id: MaterialId) -> Result<&Material, BomError> {
        self.materials
            .get(&material_id)
            .ok_or(BomError::UnknownMaterial(material_id))
    }

    pub fn behavior(&self, category_id: CategoryId) -> Result<CategoryBehavior, BomError> {
        self.category(category_id).map(behavior::resolve)
    }

    /// Materials selectable for a category.
    pub fn materials_for(&self, category_id: CategoryId) -> Vec<&Material> {
        let mut materials: Vec<&Material> = self
            .materials
            .values()
            .filter(|m| m.category_id == category_id)
            .collect();
        materials.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        materials
    }

    /// Categories offered in step 1.
    pub fn common_categories(&self) -> Vec<&Category> {
        self.categories()
            .into_iter()
            .filter(|c| behavior::resolve(c).is_common())
            .collect()
    }

    /// Categories offered in step 2.
    pub fn color_categories(&self) -> Vec<&Category> {
        self.categories()
            .into_iter()
            .filter(|c| behavior::resolve(c).mode == BehaviorMode::ColorVariable)
            .collect()
    }

    pub fn common(&self) -> &CommonMaterialsRegistry {
        &self.common
    }

    pub fn colors(&self) -> &ColorVariationMap {
        &self.colors
    }

    pub fn sizes(&self) -> &SizeConsumptionMatrix {
        &self.sizes
    }

    // Step 1

    pub fn add_common_material(
        &mut self,
        category_id: Option<CategoryId>,
        material_id: Option<MaterialId>,
        quantity: Option<Decimal>,
    ) -> Result<CommonMaterialEntry, BomError> {
        let category = match category_id {
            Some(id) => Some(
                self.categories
                    .get(&id)
                    .ok_or(BomError::UnknownCategory(id))?,
            ),
            None => None,
        };
        let material = match material_id {
            Some(id) => Some(
                self.materials
                    .get(&id)
                    .ok_or(BomError::UnknownMaterial(id))?,
            ),
            None => None,
        };
        let entry = self.common.add(category, material, quantity)?.clone();
        self.refresh_matrix_rows();
        Ok(entry)
    }

    pub fn remove_common_material(&mut self, material_id: MaterialId) -> Option<CommonMaterialEntry> {
        let removed = self.common.remove(material_id);
        if removed.is_some() {
            self.refresh_matrix_rows();
        }
        removed
    }

    /// Replaces the persisted common materials with the local registry, then
    /// reloads them from the server. Local entries are untouched on failure.
    #[instrument(skip(self), fields(product_id = self.product_id(), items = self.common.len()))]
    pub async fn save_common_materials(&mut self) -> Result<usize, BomError> {
        let _guard = self.in_flight.begin(OperationKind::SaveCommonMaterials)?;
        let batch = CommonMaterialsBatch {
            user: self.settings.user.clone(),
            product_id: Some(self.product_id()),
            items: self.common.items(),
        };

        let saved = self
            .gateway
            .save_common_materials(&batch)
            .await
            .map_err(|e| {
                error!(error = %e, "saving common materials failed");
                BomError::from(e)
            })?;

        let records = self
            .gateway
            .fetch_common_materials(self.product_id())
            .await?;
        self.common.replace_from_records(&records, &self.materials);
        self.refresh_matrix_rows();

        info!(saved = saved.saved, "common materials saved");
        Ok(saved.saved)
    }

    // Step 2

    pub fn assign_color_material(
        &mut self,
        category_id: CategoryId,
        color_id: ColorId,
        material_id: MaterialId,
    ) -> Result<Option<MaterialId>, BomError> {
        if !self.product.has_color(color_id) {
            return Err(ValidationIssue::UnknownColor { color_id }.into());
        }
        let category = self
            .categories
            .get(&category_id)
            .ok_or(BomError::UnknownCategory(category_id))?;
        let material = self
            .materials
            .get(&material_id)
            .ok_or(BomError::UnknownMaterial(material_id))?;
        let previous = self.colors.assign(category, color_id, material)?;
        self.refresh_matrix_rows();
        Ok(previous)
    }

    pub fn remove_color_material(
        &mut self,
        category_id: CategoryId,
        color_id: ColorId,
    ) -> Option<MaterialId> {
        let removed = self.colors.remove(category_id, color_id);
        if removed.is_some() {
            self.refresh_matrix_rows();
        }
        removed
    }

    pub fn set_color_base_quantity(
        &mut self,
        category_id: CategoryId,
        quantity: Decimal,
    ) -> Result<(), BomError> {
        let category = self
            .categories
            .get(&category_id)
            .ok_or(BomError::UnknownCategory(category_id))?;
        self.colors.set_base_quantity(category, quantity)
    }

    // Step 3

    /// Editable matrix; rows and columns are maintained by the session.
    pub fn sizes_mut(&mut self) -> &mut SizeConsumptionMatrix {
        &mut self.sizes
    }

    pub fn completion(&self) -> Completion {
        self.sizes.completion()
    }

    /// Configured categories that pass the row filter, in catalog order.
    fn matrix_rows(&self) -> Vec<CategoryId> {
        let common = self.common.category_ids();
        self.category_order
            .iter()
            .copied()
            .filter(|id| common.contains(id) || self.colors.contains_category(*id))
            .filter(|id| {
                self.categories
                    .get(id)
                    .map(|c| self.settings.row_filter.includes(c))
                    .unwrap_or(false)
            })
            .collect()
    }

    fn refresh_matrix_rows(&mut self) {
        let rows = self.matrix_rows();
        self.sizes.set_rows(rows);
    }

    // Review

    pub fn assemble(&self) -> BomAssembly {
        BomAssembler::new(
            &self.categories,
            &self.materials,
            &self.common,
            &self.colors,
            &self.sizes,
        )
        .assemble(&self.product.combinations)
    }

    /// Reloads all three registries from the server.
    #[instrument(skip(self), fields(product_id = self.product_id()))]
    pub async fn reload(&mut self) -> Result<(), BomError> {
        let _guard = self.in_flight.begin(OperationKind::Reload)?;
        let product_id = self.product_id();
        let (common, variations, sizes) = futures::try_join!(
            self.gateway.fetch_common_materials(product_id),
            self.gateway.fetch_variation_materials(product_id),
            self.gateway.fetch_size_consumptions(product_id),
        )?;

        self.common.replace_from_records(&common, &self.materials);
        self.colors.replace_from_records(&variations);
        self.refresh_matrix_rows();
        self.sizes.replace_from_records(&sizes);
        Ok(())
    }

    /// Persists the whole BOM in one request. Refuses while any variant has a
    /// missing assignment.
    #[instrument(skip(self), fields(product_id = self.product_id()))]
    pub async fn finalize(&mut self) -> Result<FinalizeOutcome, BomError> {
        let _guard = self.in_flight.begin(OperationKind::Finalize)?;

        let assembly = self.assemble();
        if !assembly.is_complete() {
            let report = assembly.report();
            info!(missing = report.missing.len(), "BOM is not complete");
            return Err(BomError::Incomplete(report));
        }

        let request = FinalizeBomRequest {
            user: self.settings.user.clone(),
            product_id: self.product_id(),
            common_materials: self.common.items(),
            variation_materials: self.colors.items(),
            size_consumptions: self.sizes.items(),
        };
        let response = self.gateway.finalize_bom(&request).await.map_err(|e| {
            error!(error = %e, "finalizing BOM failed");
            BomError::from(e)
        })?;
        info!(lines = assembly.lines.len(), "BOM finalized");

        drop(_guard);
        let reloaded = match self.reload().await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "BOM finalized but reloading it failed");
                false
            }
        };
        Ok(FinalizeOutcome {
            assembly,
            response,
            reloaded,
        })
    }
}
