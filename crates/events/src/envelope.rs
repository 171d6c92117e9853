use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use storefront_core::AggregateId;

/// A committed event with the stream position it was recorded at.
///
/// `sequence_number` starts at 1 and grows by one per event in the
/// aggregate's stream; read models use it to skip redelivered envelopes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    aggregate_id: AggregateId,
    aggregate_type: String,
    sequence_number: u64,
    event_type: String,
    occurred_at: DateTime<Utc>,
    payload: E,
}

impl<E> EventEnvelope<E> {
    /// Envelope for `payload` at `sequence_number` of the given stream.
    ///
    /// The event id is fresh and `occurred_at` is now; committed events
    /// carry their recorded values via [`EventEnvelope::recorded`].
    pub fn new(
        aggregate_id: AggregateId,
        aggregate_type: impl Into<String>,
        sequence_number: u64,
        event_type: impl Into<String>,
        payload: E,
    ) -> Self {
        Self {
            event_id: Uuid::now_v7(),
            aggregate_id,
            aggregate_type: aggregate_type.into(),
            sequence_number,
            event_type: event_type.into(),
            occurred_at: Utc::now(),
            payload,
        }
    }

    pub fn recorded(mut self, event_id: Uuid, occurred_at: DateTime<Utc>) -> Self {
        self.event_id = event_id;
        self.occurred_at = occurred_at;
        self
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn aggregate_id(&self) -> AggregateId {
        self.aggregate_id
    }

    pub fn aggregate_type(&self) -> &str {
        &self.aggregate_type
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    /// e.g. `"sales.sale.registered"`
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_keeps_stream_position() {
        let id = AggregateId::new();
        let event_id = Uuid::now_v7();
        let at = Utc::now() - chrono::Duration::minutes(5);

        let env = EventEnvelope::new(id, "sales.sale", 2, "sales.sale.deleted", ()).recorded(event_id, at);

        assert_eq!(env.aggregate_id(), id);
        assert_eq!(env.sequence_number(), 2);
        assert_eq!(env.event_type(), "sales.sale.deleted");
        assert_eq!(env.event_id(), event_id);
        assert_eq!(env.occurred_at(), at);
    }
}
