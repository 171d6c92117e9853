use std::sync::Arc;

use serde_json::Value as JsonValue;

use storefront_events::{EventBus, EventEnvelope};

use super::{Projection, ProjectionError};

/// Bus that applies each envelope to the projections of its aggregate type.
///
/// Projections update inside `publish`, so a command's effects are visible
/// to queries as soon as the dispatcher returns.
pub struct ProjectionRouter {
    projections: Vec<Arc<dyn Projection>>,
}

impl ProjectionRouter {
    pub fn new() -> Self {
        Self { projections: Vec::new() }
    }

    pub fn with(mut self, projection: Arc<dyn Projection>) -> Self {
        self.projections.push(projection);
        self
    }

    pub fn route(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        for projection in self
            .projections
            .iter()
            .filter(|p| p.aggregate_type() == envelope.aggregate_type())
        {
            projection.apply_envelope(envelope).inspect_err(|e| {
                tracing::warn!(
                    projection = projection.name(),
                    aggregate_id = %envelope.aggregate_id(),
                    event_type = envelope.event_type(),
                    error = %e,
                    "projection failed"
                );
            })?;
        }
        Ok(())
    }

    /// Reset every projection and replay the given envelopes in stream order.
    pub fn rebuild(
        &self,
        envelopes: impl IntoIterator<Item = EventEnvelope<JsonValue>>,
    ) -> Result<(), ProjectionError> {
        for projection in &self.projections {
            projection.reset();
        }

        let mut envs: Vec<_> = envelopes.into_iter().collect();
        envs.sort_by_key(|e| (e.aggregate_id(), e.sequence_number()));

        for env in &envs {
            self.route(env)?;
        }
        tracing::info!(events = envs.len(), "projections rebuilt");
        Ok(())
    }
}

impl Default for ProjectionRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for ProjectionRouter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProjectionRouter")
            .field("projections", &self.projections.iter().map(|p| p.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl EventBus<EventEnvelope<JsonValue>> for ProjectionRouter {
    type Error = ProjectionError;

    fn publish(&self, message: EventEnvelope<JsonValue>) -> Result<(), Self::Error> {
        self.route(&message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projections::{PRODUCT_AGGREGATE_TYPE, ProductCatalogProjection};
    use crate::read_model::InMemoryReadStore;
    use chrono::Utc;
    use storefront_core::{AggregateId, Money};
    use storefront_products::{Category, ProductCreated, ProductEvent, ProductId, StockAdjusted};
    use storefront_events::Event;

    fn envelope(id: ProductId, seq: u64, ev: &ProductEvent) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(id.0, PRODUCT_AGGREGATE_TYPE, seq, ev.event_type(), serde_json::to_value(ev).unwrap())
    }

    fn created(id: ProductId) -> ProductEvent {
        ProductEvent::ProductCreated(ProductCreated {
            product_id: id,
            name: "Mug".to_string(),
            description: "Stoneware".to_string(),
            price: Money::from_minor(900),
            quantity: 10,
            category: Category::Home,
            image: None,
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn publish_updates_matching_projection_only() {
        let catalog = Arc::new(ProductCatalogProjection::new(InMemoryReadStore::new()));
        let router = ProjectionRouter::new().with(catalog.clone());
        let id = ProductId::new(AggregateId::new());

        router.publish(envelope(id, 1, &created(id))).unwrap();
        assert!(catalog.get(&id).is_some());

        let foreign = EventEnvelope::new(AggregateId::new(), "sales.sale", 1, "sales.sale.registered", serde_json::json!({}));
        router.publish(foreign).unwrap();
        assert_eq!(catalog.list(None).len(), 1);
    }

    #[test]
    fn rebuild_replays_out_of_order_input() {
        let catalog = Arc::new(ProductCatalogProjection::new(InMemoryReadStore::new()));
        let router = ProjectionRouter::new().with(catalog.clone());
        let id = ProductId::new(AggregateId::new());
        let stock = ProductEvent::StockAdjusted(StockAdjusted {
            product_id: id,
            delta: -4,
            new_quantity: 6,
            occurred_at: Utc::now(),
        });

        router
            .rebuild(vec![envelope(id, 2, &stock), envelope(id, 1, &created(id))])
            .unwrap();
        assert_eq!(catalog.get(&id).unwrap().quantity, 6);

        router.rebuild(Vec::new()).unwrap();
        assert!(catalog.get(&id).is_none());
    }
}
