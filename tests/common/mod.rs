#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request},
    Router,
};
use rust_decimal::Decimal;
use serde_json::Value;
use stateset_bom::{
    bom::{
        gateway::{BomGateway, GatewayError},
        types::{
            BatchSaveResponse, Category, CategoryId, ColorVariationRecord, CommonMaterialRecord,
            CommonMaterialsBatch, FinalizeBomRequest, FinalizeBomResponse, Material, Product,
            ProductId, SizeConsumptionRecord, SizeConsumptionsBatch, VariantCombination,
            VariationMaterialsBatch,
        },
    },
    config::AppConfig,
    db::{self, DbConfig},
    events::{self, EventSender},
    services::{
        categories::CategoryInput, materials::CreateMaterialInput, products::CreateProductInput,
    },
    AppState,
};
use tokio::sync::mpsc;
use tower::ServiceExt;

pub const ZIPPER: CategoryId = 1;
pub const FABRIC: CategoryId = 2;
pub const LINING: CategoryId = 3;

pub const ZIPPER_Z: i32 = 10;
pub const FABRIC_RED: i32 = 20;
pub const FABRIC_BLUE: i32 = 21;
pub const LINING_L: i32 = 30;

pub const SIZE_S: i32 = 1;
pub const SIZE_M: i32 = 2;
pub const RED: i32 = 1;
pub const BLUE: i32 = 2;

pub const PRODUCT: ProductId = 100;

pub fn category(id: CategoryId, name: &str) -> Category {
    Category {
        id,
        name: name.to_string(),
        has_color: false,
        has_size: false,
        quantity_varies_by_size: false,
        material_varies_by_color: false,
        has_waste: false,
        waste_percentage: None,
    }
}

/// Zipper is fixed common, Fabric varies by color and size, Lining is size automatic.
pub fn catalog_categories() -> Vec<Category> {
    let zipper = category(ZIPPER, "Zipper");
    let fabric = Category {
        has_color: true,
        has_size: true,
        quantity_varies_by_size: true,
        material_varies_by_color: true,
        ..category(FABRIC, "Fabric")
    };
    let lining = Category {
        has_size: true,
        quantity_varies_by_size: true,
        ..category(LINING, "Lining")
    };
    vec![zipper, fabric, lining]
}

pub fn material(id: i32, category_id: CategoryId, name: &str) -> Material {
    Material {
        id,
        name: name.to_string(),
        category_id,
        purchase_unit_id: 1,
        consumption_unit_id: None,
    }
}

pub fn catalog_materials() -> Vec<Material> {
    vec![
        material(ZIPPER_Z, ZIPPER, "Zipper Z"),
        material(FABRIC_RED, FABRIC, "Fabric-R"),
        material(FABRIC_BLUE, FABRIC, "Fabric-B"),
        material(LINING_L, LINING, "Lining L"),
    ]
}

pub fn combination(size_id: i32, size: &str, color_id: i32, color: &str) -> VariantCombination {
    VariantCombination {
        size_id,
        color_id,
        size_label: size.to_string(),
        color_label: color.to_string(),
        color_hex: None,
    }
}

pub fn tee_combinations() -> Vec<VariantCombination> {
    vec![
        combination(SIZE_S, "S", RED, "Red"),
        combination(SIZE_S, "S", BLUE, "Blue"),
        combination(SIZE_M, "M", RED, "Red"),
        combination(SIZE_M, "M", BLUE, "Blue"),
    ]
}

#[derive(Default)]
struct GatewayState {
    common: Vec<CommonMaterialRecord>,
    variations: Vec<ColorVariationRecord>,
    sizes: Vec<SizeConsumptionRecord>,
    next_id: i32,
}

impl GatewayState {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }
}

/// Fake backend holding one product; saves replace rows and assign fresh ids.
pub struct InMemoryBomGateway {
    categories: Vec<Category>,
    materials: Vec<Material>,
    product: Product,
    combinations: Vec<VariantCombination>,
    state: Mutex<GatewayState>,
    fail_saves: AtomicBool,
    pub save_calls: AtomicUsize,
    pub finalize_calls: AtomicUsize,
}

impl InMemoryBomGateway {
    pub fn new() -> Self {
        Self {
            categories: catalog_categories(),
            materials: catalog_materials(),
            product: Product {
                id: PRODUCT,
                name: "Tee".to_string(),
                code: Some("TEE-01".to_string()),
            },
            combinations: tee_combinations(),
            state: Mutex::new(GatewayState::default()),
            fail_saves: AtomicBool::new(false),
            save_calls: AtomicUsize::new(0),
            finalize_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_categories(mut self, categories: Vec<Category>) -> Self {
        self.categories = categories;
        self
    }

    /// Makes every save and finalize fail with a 500.
    pub fn fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    pub fn common_rows(&self) -> Vec<CommonMaterialRecord> {
        self.state.lock().unwrap().common.clone()
    }

    pub fn variation_rows(&self) -> Vec<ColorVariationRecord> {
        self.state.lock().unwrap().variations.clone()
    }

    pub fn size_rows(&self) -> Vec<SizeConsumptionRecord> {
        self.state.lock().unwrap().sizes.clone()
    }

    fn check_product(&self, product_id: ProductId) -> Result<(), GatewayError> {
        if product_id == self.product.id {
            Ok(())
        } else {
            Err(GatewayError::NotFound(format!("Product {} not found", product_id)))
        }
    }

    fn check_failure(&self) -> Result<(), GatewayError> {
        if self.fail_saves.load(Ordering::SeqCst) {
            Err(GatewayError::Status {
                status: 500,
                message: "Database error".to_string(),
            })
        } else {
            Ok(())
        }
    }

    fn store_common(&self, state: &mut GatewayState, product_id: ProductId, batch: &[stateset_bom::bom::types::CommonMaterialItem]) {
        state.common.clear();
        for item in batch {
            let category_id = self
                .materials
                .iter()
                .find(|m| m.id == item.material_id)
                .map(|m| m.category_id)
                .unwrap_or_default();
            let id = state.next_id();
            state.common.push(CommonMaterialRecord {
                id,
                product_id,
                category_id,
                material_id: item.material_id,
                unit_id: item.unit_id,
                base_quantity: item.base_quantity,
            });
        }
    }
}

#[async_trait]
impl BomGateway for InMemoryBomGateway {
    async fn fetch_categories(&self) -> Result<Vec<Category>, GatewayError> {
        Ok(self.categories.clone())
    }

    async fn fetch_materials(
        &self,
        category_id: Option<CategoryId>,
    ) -> Result<Vec<Material>, GatewayError> {
        Ok(self
            .materials
            .iter()
            .filter(|m| category_id.map_or(true, |c| m.category_id == c))
            .cloned()
            .collect())
    }

    async fn fetch_product(&self, product_id: ProductId) -> Result<Product, GatewayError> {
        self.check_product(product_id)?;
        Ok(self.product.clone())
    }

    async fn fetch_combinations(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<VariantCombination>, GatewayError> {
        self.check_product(product_id)?;
        Ok(self.combinations.clone())
    }

    async fn fetch_common_materials(
        &self,
        _product_id: ProductId,
    ) -> Result<Vec<CommonMaterialRecord>, GatewayError> {
        Ok(self.common_rows())
    }

    async fn fetch_variation_materials(
        &self,
        _product_id: ProductId,
    ) -> Result<Vec<ColorVariationRecord>, GatewayError> {
        Ok(self.variation_rows())
    }

    async fn fetch_size_consumptions(
        &self,
        _product_id: ProductId,
    ) -> Result<Vec<SizeConsumptionRecord>, GatewayError> {
        Ok(self.size_rows())
    }

    async fn has_bom(&self, _product_id: ProductId) -> Result<bool, GatewayError> {
        let state = self.state.lock().unwrap();
        Ok(!state.common.is_empty() || !state.variations.is_empty())
    }

    async fn save_common_materials(
        &self,
        batch: &CommonMaterialsBatch,
    ) -> Result<BatchSaveResponse, GatewayError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        let product_id = batch.product_id.unwrap_or(self.product.id);
        let mut state = self.state.lock().unwrap();
        self.store_common(&mut state, product_id, &batch.items);
        Ok(BatchSaveResponse {
            product_id,
            saved: batch.items.len(),
        })
    }

    async fn save_variation_materials(
        &self,
        batch: &VariationMaterialsBatch,
    ) -> Result<BatchSaveResponse, GatewayError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        let mut state = self.state.lock().unwrap();
        state.variations.clear();
        for item in &batch.items {
            let id = state.next_id();
            state.variations.push(ColorVariationRecord {
                id,
                product_id: batch.product_id,
                category_id: item.category_id,
                color_id: item.color_id,
                material_id: item.material_id,
                quantity: item.quantity,
            });
        }
        Ok(BatchSaveResponse {
            product_id: batch.product_id,
            saved: batch.items.len(),
        })
    }

    async fn save_size_consumptions(
        &self,
        batch: &SizeConsumptionsBatch,
    ) -> Result<BatchSaveResponse, GatewayError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        let mut state = self.state.lock().unwrap();
        state.sizes.clear();
        for item in &batch.items {
            let id = state.next_id();
            state.sizes.push(SizeConsumptionRecord {
                id,
                product_id: batch.product_id,
                category_id: item.category_id,
                size_label: item.size_label.clone(),
                quantity: item.quantity,
            });
        }
        Ok(BatchSaveResponse {
            product_id: batch.product_id,
            saved: batch.items.len(),
        })
    }

    async fn finalize_bom(
        &self,
        request: &FinalizeBomRequest,
    ) -> Result<FinalizeBomResponse, GatewayError> {
        self.finalize_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure()?;
        {
            let mut state = self.state.lock().unwrap();
            self.store_common(&mut state, request.product_id, &request.common_materials);
        }
        self.save_variation_materials(&VariationMaterialsBatch {
            user: request.user.clone(),
            product_id: request.product_id,
            items: request.variation_materials.clone(),
        })
        .await?;
        self.save_size_consumptions(&SizeConsumptionsBatch {
            user: request.user.clone(),
            product_id: request.product_id,
            items: request.size_consumptions.clone(),
        })
        .await?;
        Ok(FinalizeBomResponse {
            product_id: request.product_id,
            common_materials: request.common_materials.len(),
            variation_materials: request.variation_materials.len(),
            size_consumptions: request.size_consumptions.len(),
        })
    }
}

/// Ids of the catalog seeded into a [`TestApp`] database.
#[derive(Debug, Clone, Copy)]
pub struct SeededCatalog {
    pub zipper: CategoryId,
    pub fabric: CategoryId,
    pub lining: CategoryId,
    pub zipper_z: i32,
    pub fabric_red: i32,
    pub fabric_blue: i32,
    pub lining_l: i32,
    pub product: ProductId,
}

/// Application state and router backed by an in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _event_task: tokio::task::JoinHandle<()>,
}

impl TestApp {
    pub async fn new() -> Self {
        let pool = db::establish_connection_with_config(&DbConfig::sqlite_in_memory())
            .await
            .expect("failed to create test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_task = tokio::spawn(events::process_events(event_rx));
        let state = AppState::new(Arc::new(pool), cfg, EventSender::new(event_tx));
        let router = stateset_bom::app_router(state.clone());

        Self {
            router,
            state,
            _event_task: event_task,
        }
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };

        let request = builder.body(body).expect("failed to build request");
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request")
    }

    /// Serves the router on an ephemeral port and returns the `/api/v1` base url.
    pub async fn spawn_server(&self) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind test listener");
        let addr = listener.local_addr().expect("listener has no address");
        let router = self.router.clone();
        tokio::spawn(async move {
            axum::serve(listener, router.into_make_service())
                .await
                .expect("test server failed");
        });
        format!("http://{}/api/v1", addr)
    }

    /// Seeds the Zipper/Fabric/Lining catalog and a Tee in S and M, Red and Blue.
    pub async fn seed_catalog(&self) -> SeededCatalog {
        let categories = &self.state.services.categories;
        let zipper = categories
            .create(CategoryInput {
                name: "Zipper".into(),
                has_color: false,
                has_size: false,
                quantity_varies_by_size: false,
                material_varies_by_color: false,
                has_waste: false,
                waste_percentage: None,
            })
            .await
            .expect("seed zipper");
        let fabric = categories
            .create(CategoryInput {
                name: "Fabric".into(),
                has_color: true,
                has_size: true,
                quantity_varies_by_size: true,
                material_varies_by_color: true,
                has_waste: true,
                waste_percentage: Some(Decimal::new(10, 0)),
            })
            .await
            .expect("seed fabric");
        let lining = categories
            .create(CategoryInput {
                name: "Lining".into(),
                has_color: false,
                has_size: true,
                quantity_varies_by_size: true,
                material_varies_by_color: false,
                has_waste: false,
                waste_percentage: None,
            })
            .await
            .expect("seed lining");

        let materials = &self.state.services.materials;
        let mut material_ids = Vec::new();
        for (name, category_id) in [
            ("Zipper Z", zipper.id),
            ("Fabric-R", fabric.id),
            ("Fabric-B", fabric.id),
            ("Lining L", lining.id),
        ] {
            let created = materials
                .create(CreateMaterialInput {
                    name: name.into(),
                    category_id,
                    purchase_unit_id: 1,
                    consumption_unit_id: Some(2),
                })
                .await
                .expect("seed material");
            material_ids.push(created.id);
        }

        let product = self
            .state
            .services
            .products
            .create(CreateProductInput {
                name: "Tee".into(),
                code: Some("TEE-01".into()),
                combinations: tee_combinations(),
            })
            .await
            .expect("seed product");

        SeededCatalog {
            zipper: zipper.id,
            fabric: fabric.id,
            lining: lining.id,
            zipper_z: material_ids[0],
            fabric_red: material_ids[1],
            fabric_blue: material_ids[2],
            lining_l: material_ids[3],
            product: product.product.id,
        }
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self._event_task.abort();
    }
}

pub async fn read_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    serde_json::from_slice(&bytes).expect("response body is not json")
}
