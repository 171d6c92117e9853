//! Append-only event log.
//!
//! Every aggregate owns one stream. Appends are checked against the stream
//! version the caller observed; the log also keeps a global commit order so
//! read models can be rebuilt from scratch.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use storefront_core::{AggregateId, ExpectedVersion};
use storefront_events::{Event, EventEnvelope};

pub mod in_memory;

pub use in_memory::InMemoryEventStore;

/// A serialized event waiting to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub event_id: Uuid,
    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,
    pub payload: JsonValue,
}

impl NewEvent {
    pub fn from_event<E>(event: &E) -> Result<Self, EventStoreError>
    where
        E: Event + Serialize,
    {
        let payload = serde_json::to_value(event).map_err(|e| EventStoreError::Serialize(e.to_string()))?;
        Ok(Self {
            event_id: Uuid::now_v7(),
            event_type: event.event_type().to_string(),
            event_version: event.version(),
            occurred_at: event.occurred_at(),
            payload,
        })
    }
}

/// An event as committed to the log.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedEvent {
    /// 1-based position in the whole log.
    pub position: u64,
    pub aggregate_id: AggregateId,
    pub aggregate_type: String,
    /// 1-based position within the aggregate's stream; doubles as its version.
    pub sequence_number: u64,
    pub event_id: Uuid,
    pub event_type: String,
    pub event_version: u32,
    pub occurred_at: DateTime<Utc>,
    pub payload: JsonValue,
}

impl RecordedEvent {
    pub fn to_envelope(&self) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(
            self.aggregate_id,
            self.aggregate_type.clone(),
            self.sequence_number,
            self.event_type.clone(),
            self.payload.clone(),
        )
        .recorded(self.event_id, self.occurred_at)
    }
}

#[derive(Debug, Error)]
pub enum EventStoreError {
    #[error("stream {aggregate_id} is at version {actual}, expected {expected:?}")]
    Concurrency {
        aggregate_id: AggregateId,
        expected: ExpectedVersion,
        actual: u64,
    },

    /// The stream already holds events of another aggregate type.
    #[error("stream {aggregate_id} belongs to '{existing}', not '{attempted}'")]
    AggregateTypeMismatch {
        aggregate_id: AggregateId,
        existing: String,
        attempted: String,
    },

    #[error("failed to serialize event: {0}")]
    Serialize(String),

    #[error("event log unavailable: {0}")]
    Unavailable(String),
}

pub trait EventStore: Send + Sync {
    /// Append a batch to one stream, all or nothing.
    ///
    /// An empty batch is a no-op and returns no events.
    fn append(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        expected: ExpectedVersion,
        events: Vec<NewEvent>,
    ) -> Result<Vec<RecordedEvent>, EventStoreError>;

    /// One stream in sequence order; empty if the aggregate has no events.
    fn read_stream(&self, aggregate_id: AggregateId) -> Result<Vec<RecordedEvent>, EventStoreError>;

    /// Every event in commit order.
    fn read_all(&self) -> Result<Vec<RecordedEvent>, EventStoreError>;
}

impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    fn append(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        expected: ExpectedVersion,
        events: Vec<NewEvent>,
    ) -> Result<Vec<RecordedEvent>, EventStoreError> {
        (**self).append(aggregate_id, aggregate_type, expected, events)
    }

    fn read_stream(&self, aggregate_id: AggregateId) -> Result<Vec<RecordedEvent>, EventStoreError> {
        (**self).read_stream(aggregate_id)
    }

    fn read_all(&self) -> Result<Vec<RecordedEvent>, EventStoreError> {
        (**self).read_all()
    }
}
