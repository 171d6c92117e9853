//! Projection implementations (read model builders).
//!
//! Projections consume published envelopes and build query-optimized read
//! models. All projections are:
//! - **Rebuildable**: can be reconstructed from the event streams
//! - **Idempotent**: safe for at-least-once delivery (per-stream cursors)

use serde_json::Value as JsonValue;
use thiserror::Error;

use storefront_events::EventEnvelope;

pub mod cursor;
pub mod lists;
pub mod products;
pub mod router;
pub mod sales;
pub mod users;

pub use cursor::StreamCursors;
pub use lists::{CustomListsProjection, LIST_AGGREGATE_TYPE, ListReadModel};
pub use products::{PRODUCT_AGGREGATE_TYPE, ProductCatalogProjection, ProductReadModel};
pub use router::ProjectionRouter;
pub use sales::{SALE_AGGREGATE_TYPE, SalesProjection};
pub use users::{USER_AGGREGATE_TYPE, UserReadModel, UsersProjection};

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("failed to deserialize event: {0}")]
    Deserialize(String),

    #[error("stream mismatch: {0}")]
    StreamMismatch(String),

    #[error("non-monotonic sequence number (last={last}, found={found})")]
    NonMonotonicSequence { last: u64, found: u64 },

}

/// A read model builder fed by published envelopes.
pub trait Projection: Send + Sync {
    /// Stable name, used in logs.
    fn name(&self) -> &'static str;

    /// Aggregate type whose envelopes this projection consumes.
    fn aggregate_type(&self) -> &'static str;

    /// Apply one envelope. Envelopes for other aggregate types are ignored.
    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError>;

    /// Drop all state so the projection can be rebuilt.
    fn reset(&self);
}
