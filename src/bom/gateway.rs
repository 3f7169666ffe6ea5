//! Collaborators the wizard talks to: catalogs and BOM persistence.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use super::types::{
    BatchSaveResponse, BomStatus, Category, CategoryId, ColorVariationRecord,
    CommonMaterialRecord, CommonMaterialsBatch, FinalizeBomRequest, FinalizeBomResponse, Material,
    Product, ProductId, SizeConsumptionRecord, SizeConsumptionsBatch, VariantCombination,
    VariationMaterialsBatch,
};
use crate::config::BackendConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("request rejected with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

#[async_trait]
pub trait BomGateway: Send + Sync {
    async fn fetch_categories(&self) -> Result<Vec<Category>, GatewayError>;

    async fn fetch_materials(
        &self,
        category_id: Option<CategoryId>,
    ) -> Result<Vec<Material>, GatewayError>;

    async fn fetch_product(&self, product_id: ProductId) -> Result<Product, GatewayError>;

    async fn fetch_combinations(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<VariantCombination>, GatewayError>;

    async fn fetch_common_materials(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<CommonMaterialRecord>, GatewayError>;

    async fn fetch_variation_materials(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ColorVariationRecord>, GatewayError>;

    async fn fetch_size_consumptions(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<SizeConsumptionRecord>, GatewayError>;

    /// True when the product has persisted common or color variation rows.
    async fn has_bom(&self, product_id: ProductId) -> Result<bool, GatewayError>;

    async fn save_common_materials(
        &self,
        batch: &CommonMaterialsBatch,
    ) -> Result<BatchSaveResponse, GatewayError>;

    async fn save_variation_materials(
        &self,
        batch: &VariationMaterialsBatch,
    ) -> Result<BatchSaveResponse, GatewayError>;

    async fn save_size_consumptions(
        &self,
        batch: &SizeConsumptionsBatch,
    ) -> Result<BatchSaveResponse, GatewayError>;

    /// Persists all three registries atomically.
    async fn finalize_bom(
        &self,
        request: &FinalizeBomRequest,
    ) -> Result<FinalizeBomResponse, GatewayError>;
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    success: bool,
    data: Option<T>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// [`BomGateway`] over the REST API.
#[derive(Debug, Clone)]
pub struct HttpBomGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBomGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("stateset-bom/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, GatewayError> {
        Self::new(
            config.base_url.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, GatewayError> {
        let response = self.client.get(self.url(path)).query(query).send().await?;
        Self::decode(response).await
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GatewayError> {
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let message = serde_json::from_slice::<ErrorBody>(&body)
                .map(|b| b.message)
                .unwrap_or_else(|_| String::from_utf8_lossy(&body).into_owned());
            warn!(status = status.as_u16(), %message, "BOM backend rejected request");
            return Err(if status == StatusCode::NOT_FOUND {
                GatewayError::NotFound(message)
            } else {
                GatewayError::Status {
                    status: status.as_u16(),
                    message,
                }
            });
        }

        let envelope: Envelope<T> =
            serde_json::from_slice(&body).map_err(|e| GatewayError::Decode(e.to_string()))?;
        if !envelope.success {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                message: envelope.message.unwrap_or_default(),
            });
        }
        envelope
            .data
            .ok_or_else(|| GatewayError::Decode("response carried no data".to_string()))
    }
}

fn product_query(product_id: ProductId) -> [(&'static str, String); 1] {
    [("product_id", product_id.to_string())]
}

#[async_trait]
impl BomGateway for HttpBomGateway {
    #[instrument(skip(self))]
    async fn fetch_categories(&self) -> Result<Vec<Category>, GatewayError> {
        self.get("categories", &[]).await
    }

    #[instrument(skip(self))]
    async fn fetch_materials(
        &self,
        category_id: Option<CategoryId>,
    ) -> Result<Vec<Material>, GatewayError> {
        let query: Vec<(&str, String)> = category_id
            .map(|id| vec![("category_id", id.to_string())])
            .unwrap_or_default();
        self.get("materials", &query).await
    }

    #[instrument(skip(self))]
    async fn fetch_product(&self, product_id: ProductId) -> Result<Product, GatewayError> {
        self.get(&format!("products/{}", product_id), &[]).await
    }

    #[instrument(skip(self))]
    async fn fetch_combinations(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<VariantCombination>, GatewayError> {
        self.get(&format!("products/{}/combinations", product_id), &[])
            .await
    }

    #[instrument(skip(self))]
    async fn fetch_common_materials(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<CommonMaterialRecord>, GatewayError> {
        self.get("bom/common-materials", &product_query(product_id))
            .await
    }

    #[instrument(skip(self))]
    async fn fetch_variation_materials(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<ColorVariationRecord>, GatewayError> {
        self.get("bom/variation-materials", &product_query(product_id))
            .await
    }

    #[instrument(skip(self))]
    async fn fetch_size_consumptions(
        &self,
        product_id: ProductId,
    ) -> Result<Vec<SizeConsumptionRecord>, GatewayError> {
        self.get("bom/size-consumptions", &product_query(product_id))
            .await
    }

    #[instrument(skip(self))]
    async fn has_bom(&self, product_id: ProductId) -> Result<bool, GatewayError> {
        let status: BomStatus = self.get("bom/status", &product_query(product_id)).await?;
        Ok(status.has_bom)
    }

    #[instrument(skip(self, batch), fields(items = batch.items.len()))]
    async fn save_common_materials(
        &self,
        batch: &CommonMaterialsBatch,
    ) -> Result<BatchSaveResponse, GatewayError> {
        debug!("saving common materials batch");
        self.post("bom/common-materials/batch", batch).await
    }

    #[instrument(skip(self, batch), fields(product_id = batch.product_id, items = batch.items.len()))]
    async fn save_variation_materials(
        &self,
        batch: &VariationMaterialsBatch,
    ) -> Result<BatchSaveResponse, GatewayError> {
        self.post("bom/variation-materials/batch", batch).await
    }

    #[instrument(skip(self, batch), fields(product_id = batch.product_id, items = batch.items.len()))]
    async fn save_size_consumptions(
        &self,
        batch: &SizeConsumptionsBatch,
    ) -> Result<BatchSaveResponse, GatewayError> {
        self.post("bom/size-consumptions/batch", batch).await
    }

    #[instrument(skip(self, request), fields(product_id = request.product_id))]
    async fn finalize_bom(
        &self,
        request: &FinalizeBomRequest,
    ) -> Result<FinalizeBomResponse, GatewayError> {
        self.post("bom/finalize", request).await
    }
}
