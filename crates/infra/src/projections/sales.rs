use serde_json::Value as JsonValue;

use storefront_core::UserId;
use storefront_events::EventEnvelope;
use storefront_sales::{SaleEvent, SaleId, SaleRecord};

use super::cursor::StreamCursors;
use super::{Projection, ProjectionError};
use crate::read_model::ReadStore;

pub const SALE_AGGREGATE_TYPE: &str = "sales.sale";

/// Registered sales, one [`SaleRecord`] per live sale.
#[derive(Debug)]
pub struct SalesProjection<S>
where
    S: ReadStore<SaleId, SaleRecord>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> SalesProjection<S>
where
    S: ReadStore<SaleId, SaleRecord>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, sale_id: &SaleId) -> Option<SaleRecord> {
        self.store.get(sale_id)
    }

    /// Sales newest first, optionally for a single seller.
    pub fn list(&self, seller: Option<UserId>) -> Vec<SaleRecord> {
        let mut sales: Vec<_> = self
            .store
            .list()
            .into_iter()
            .filter(|s| seller.is_none_or(|u| s.user_id == u))
            .collect();
        sales.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        sales
    }
}

impl<S> Projection for SalesProjection<S>
where
    S: ReadStore<SaleId, SaleRecord>,
{
    fn name(&self) -> &'static str {
        "sales.records"
    }

    fn aggregate_type(&self) -> &'static str {
        SALE_AGGREGATE_TYPE
    }

    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != SALE_AGGREGATE_TYPE {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();
        if !self.cursors.should_apply(aggregate_id, seq)? {
            return Ok(());
        }

        let ev: SaleEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;
        let sale_id = match &ev {
            SaleEvent::Registered(e) => e.sale_id,
            SaleEvent::Deleted(e) => e.sale_id,
        };
        if sale_id.0 != aggregate_id {
            return Err(ProjectionError::StreamMismatch(
                "event sale_id does not match envelope aggregate_id".to_string(),
            ));
        }

        match ev {
            SaleEvent::Registered(e) => {
                self.store.upsert(
                    e.sale_id,
                    SaleRecord {
                        id: e.sale_id,
                        user_id: e.seller,
                        lines: e.lines,
                        total: e.total,
                        commission: e.commission,
                        created_at: e.occurred_at,
                    },
                );
            }
            SaleEvent::Deleted(e) => {
                self.store.remove(&e.sale_id);
            }
        }

        self.cursors.advance(aggregate_id, seq);
        tracing::debug!(projection = self.name(), %aggregate_id, seq, event_type = envelope.event_type(), "projection updated");
        Ok(())
    }

    fn reset(&self) {
        self.store.clear();
        self.cursors.clear();
    }
}
