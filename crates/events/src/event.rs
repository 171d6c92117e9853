use chrono::{DateTime, Utc};

/// A fact emitted by an aggregate.
///
/// `event_type` is stored next to the JSON payload so logs and projections
/// can tell events apart without decoding them.
pub trait Event: Clone + core::fmt::Debug + Send + Sync + 'static {
    /// Dotted name, `<context>.<aggregate>.<fact>` (e.g. `"products.product.created"`).
    fn event_type(&self) -> &'static str;

    /// Payload schema version; bump when a field changes meaning.
    fn version(&self) -> u32;

    fn occurred_at(&self) -> DateTime<Utc>;
}
