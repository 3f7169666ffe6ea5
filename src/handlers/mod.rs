pub mod bom;
pub mod categories;
pub mod common;
pub mod materials;
pub mod products;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    bom::BomService, categories::CategoryService, local_gateway::ServiceBomGateway,
    materials::MaterialService, products::ProductService,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub categories: Arc<CategoryService>,
    pub materials: Arc<MaterialService>,
    pub products: Arc<ProductService>,
    pub bom: Arc<BomService>,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self {
            categories: Arc::new(CategoryService::new(db_pool.clone(), event_sender.clone())),
            materials: Arc::new(MaterialService::new(db_pool.clone())),
            products: Arc::new(ProductService::new(db_pool.clone())),
            bom: Arc::new(BomService::new(db_pool, event_sender)),
        }
    }

    /// Gateway that lets a wizard session run in-process against these services.
    pub fn gateway(&self) -> ServiceBomGateway {
        ServiceBomGateway::new(
            (*self.categories).clone(),
            (*self.materials).clone(),
            (*self.products).clone(),
            (*self.bom).clone(),
        )
    }
}
