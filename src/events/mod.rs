use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::bom::types::{CategoryId, ProductId};

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the channel is closed.
    /// Persisted state is already committed by the time events go out.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "dropping domain event");
        }
    }
}

/// Domain events emitted after BOM state is committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    CategoryCreated(CategoryId),
    CategoryUpdated(CategoryId),
    CommonMaterialsSaved {
        product_id: ProductId,
        count: usize,
        user: String,
    },
    VariationMaterialsSaved {
        product_id: ProductId,
        count: usize,
        user: String,
    },
    SizeConsumptionsSaved {
        product_id: ProductId,
        count: usize,
        user: String,
    },
    BomFinalized {
        product_id: ProductId,
        user: String,
        finalized_at: DateTime<Utc>,
    },
}

pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::CategoryCreated(id) => info!(category_id = id, "material category created"),
            Event::CategoryUpdated(id) => info!(category_id = id, "material category updated"),
            Event::CommonMaterialsSaved {
                product_id,
                count,
                user,
            } => info!(product_id, count, %user, "common materials saved"),
            Event::VariationMaterialsSaved {
                product_id,
                count,
                user,
            } => info!(product_id, count, %user, "color variation materials saved"),
            Event::SizeConsumptionsSaved {
                product_id,
                count,
                user,
            } => info!(product_id, count, %user, "size consumptions saved"),
            Event::BomFinalized {
                product_id,
                user,
                finalized_at,
            } => info!(product_id, %user, %finalized_at, "bill of materials finalized"),
        }
    }

    warn!("Event processing loop has ended");
}
