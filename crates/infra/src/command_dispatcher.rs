//! Runs a command against an event-sourced aggregate.
//!
//! The aggregate is rebuilt from its stream, decides, and the resulting
//! events are appended at the version that was read. Only committed events
//! reach the bus, which is where read models get updated.

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use thiserror::Error;

use storefront_core::{Aggregate, AggregateId, DomainError, ExpectedVersion};
use storefront_events::{Event, EventBus, EventEnvelope};

use crate::event_store::{EventStore, EventStoreError, NewEvent, RecordedEvent};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// Another write landed on the stream between load and append.
    #[error("{0}")]
    Concurrency(String),
    /// Duplicate state or not enough stock.
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    InvariantViolation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    /// A stored payload no longer decodes into the aggregate's event type.
    #[error("failed to decode stored event: {0}")]
    Deserialize(String),
    #[error(transparent)]
    Store(EventStoreError),
    /// The events were stored but a read model rejected them.
    #[error("event publication failed: {0}")]
    Publish(String),
}

impl From<EventStoreError> for DispatchError {
    fn from(err: EventStoreError) -> Self {
        match err {
            EventStoreError::Concurrency { .. } => DispatchError::Concurrency(err.to_string()),
            other => DispatchError::Store(other),
        }
    }
}

impl From<DomainError> for DispatchError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => DispatchError::Validation(msg),
            DomainError::InvariantViolation(msg) => DispatchError::InvariantViolation(msg),
            DomainError::Conflict(msg) => DispatchError::Conflict(msg),
            err @ DomainError::InsufficientStock { .. } => DispatchError::Conflict(err.to_string()),
            DomainError::NotFound(what) => DispatchError::NotFound(what),
        }
    }
}

#[derive(Debug)]
pub struct CommandDispatcher<S, B> {
    store: S,
    bus: B,
}

impl<S, B> CommandDispatcher<S, B> {
    pub fn new(store: S, bus: B) -> Self {
        Self { store, bus }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn bus(&self) -> &B {
        &self.bus
    }
}

impl<S, B> CommandDispatcher<S, B>
where
    S: EventStore,
    B: EventBus<EventEnvelope<JsonValue>>,
{
    /// Handle `command` on the aggregate stored under `aggregate_id`.
    ///
    /// `make_aggregate` builds the blank aggregate history is replayed onto.
    /// Returns the committed events; none means the command changed nothing.
    pub fn dispatch<A>(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        command: A::Command,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<Vec<RecordedEvent>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: Event + Serialize + DeserializeOwned,
    {
        let history = self.store.read_stream(aggregate_id)?;
        let version = history.last().map_or(0, |e| e.sequence_number);

        let mut aggregate = make_aggregate(aggregate_id);
        replay(&mut aggregate, &history)?;

        let decided = aggregate.handle(&command)?;
        if decided.is_empty() {
            return Ok(vec![]);
        }

        let batch = decided
            .iter()
            .map(NewEvent::from_event)
            .collect::<Result<Vec<_>, _>>()?;
        let committed = self
            .store
            .append(aggregate_id, aggregate_type, ExpectedVersion::Exact(version), batch)?;

        for recorded in &committed {
            self.bus
                .publish(recorded.to_envelope())
                .map_err(|e| DispatchError::Publish(format!("{e:?}")))?;
        }

        tracing::debug!(
            %aggregate_id,
            aggregate_type,
            version = version + committed.len() as u64,
            events = ?committed.iter().map(|e| e.event_type.as_str()).collect::<Vec<_>>(),
            "command applied"
        );
        Ok(committed)
    }

    /// Rebuild an aggregate without handling a command; `None` for an empty stream.
    pub fn load<A>(
        &self,
        aggregate_id: AggregateId,
        make_aggregate: impl FnOnce(AggregateId) -> A,
    ) -> Result<Option<A>, DispatchError>
    where
        A: Aggregate,
        A::Event: DeserializeOwned,
    {
        let history = self.store.read_stream(aggregate_id)?;
        if history.is_empty() {
            return Ok(None);
        }
        let mut aggregate = make_aggregate(aggregate_id);
        replay(&mut aggregate, &history)?;
        Ok(Some(aggregate))
    }
}

fn replay<A>(aggregate: &mut A, history: &[RecordedEvent]) -> Result<(), DispatchError>
where
    A: Aggregate,
    A::Event: DeserializeOwned,
{
    for recorded in history {
        let ev: A::Event = serde_json::from_value(recorded.payload.clone()).map_err(|e| {
            DispatchError::Deserialize(format!(
                "{} #{} of {}: {e}",
                recorded.event_type, recorded.sequence_number, recorded.aggregate_id
            ))
        })?;
        aggregate.apply(&ev);
    }
    Ok(())
}
