use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use storefront_core::Money;
use storefront_events::EventEnvelope;
use storefront_products::{Category, ProductEvent, ProductId};

use super::cursor::StreamCursors;
use super::{Projection, ProjectionError};
use crate::read_model::ReadStore;

pub const PRODUCT_AGGREGATE_TYPE: &str = "products.product";

/// Queryable product read model (catalog).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductReadModel {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub quantity: u32,
    pub category: Category,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct ProductCatalogProjection<S>
where
    S: ReadStore<ProductId, ProductReadModel>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> ProductCatalogProjection<S>
where
    S: ReadStore<ProductId, ProductReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, product_id: &ProductId) -> Option<ProductReadModel> {
        self.store.get(product_id)
    }

    /// Every live product, optionally restricted to one category.
    ///
    /// Ordered by name, then id, so listings are stable.
    pub fn list(&self, category: Option<Category>) -> Vec<ProductReadModel> {
        let mut items: Vec<_> = self
            .store
            .list()
            .into_iter()
            .filter(|p| category.is_none_or(|c| p.category == c))
            .collect();
        items.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        items
    }

    fn apply(&self, ev: ProductEvent) {
        match ev {
            ProductEvent::ProductCreated(e) => {
                self.store.upsert(
                    e.product_id,
                    ProductReadModel {
                        id: e.product_id,
                        name: e.name,
                        description: e.description,
                        price: e.price,
                        quantity: e.quantity,
                        category: e.category,
                        image: e.image,
                        created_at: e.occurred_at,
                        updated_at: e.occurred_at,
                    },
                );
            }
            ProductEvent::ProductUpdated(e) => {
                if let Some(mut rm) = self.store.get(&e.product_id) {
                    if let Some(name) = e.name {
                        rm.name = name;
                    }
                    if let Some(description) = e.description {
                        rm.description = description;
                    }
                    if let Some(price) = e.price {
                        rm.price = price;
                    }
                    if let Some(quantity) = e.quantity {
                        rm.quantity = quantity;
                    }
                    if let Some(category) = e.category {
                        rm.category = category;
                    }
                    rm.updated_at = e.occurred_at;
                    self.store.upsert(e.product_id, rm);
                }
            }
            ProductEvent::StockAdjusted(e) => {
                if let Some(mut rm) = self.store.get(&e.product_id) {
                    rm.quantity = e.new_quantity;
                    rm.updated_at = e.occurred_at;
                    self.store.upsert(e.product_id, rm);
                }
            }
            ProductEvent::ImageAttached(e) => {
                if let Some(mut rm) = self.store.get(&e.product_id) {
                    rm.image = Some(e.image);
                    rm.updated_at = e.occurred_at;
                    self.store.upsert(e.product_id, rm);
                }
            }
            ProductEvent::ProductDeleted(e) => {
                self.store.remove(&e.product_id);
            }
        }
    }
}

impl<S> Projection for ProductCatalogProjection<S>
where
    S: ReadStore<ProductId, ProductReadModel>,
{
    fn name(&self) -> &'static str {
        "products.catalog"
    }

    fn aggregate_type(&self) -> &'static str {
        PRODUCT_AGGREGATE_TYPE
    }

    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != PRODUCT_AGGREGATE_TYPE {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();
        if !self.cursors.should_apply(aggregate_id, seq)? {
            return Ok(());
        }

        let ev: ProductEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;

        let product_id = match &ev {
            ProductEvent::ProductCreated(e) => e.product_id,
            ProductEvent::ProductUpdated(e) => e.product_id,
            ProductEvent::StockAdjusted(e) => e.product_id,
            ProductEvent::ImageAttached(e) => e.product_id,
            ProductEvent::ProductDeleted(e) => e.product_id,
        };
        if product_id.0 != aggregate_id {
            return Err(ProjectionError::StreamMismatch(
                "event product_id does not match envelope aggregate_id".to_string(),
            ));
        }

        self.apply(ev);
        self.cursors.advance(aggregate_id, seq);
        tracing::debug!(projection = self.name(), %aggregate_id, seq, event_type = envelope.event_type(), "projection updated");
        Ok(())
    }

    fn reset(&self) {
        self.store.clear();
        self.cursors.clear();
    }
}
