use std::collections::HashMap;
use std::sync::RwLock;

use storefront_core::{AggregateId, ExpectedVersion};

use super::{EventStore, EventStoreError, NewEvent, RecordedEvent};

#[derive(Debug, Default)]
struct Log {
    events: Vec<RecordedEvent>,
    /// Indexes into `events`, per stream, in sequence order.
    streams: HashMap<AggregateId, Vec<usize>>,
}

/// Process-local event log; nothing survives a restart.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    log: RwLock<Log>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.log.read().map(|log| log.events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned<T>(_: T) -> EventStoreError {
    EventStoreError::Unavailable("lock poisoned".to_string())
}

impl EventStore for InMemoryEventStore {
    fn append(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: &str,
        expected: ExpectedVersion,
        events: Vec<NewEvent>,
    ) -> Result<Vec<RecordedEvent>, EventStoreError> {
        if events.is_empty() {
            return Ok(vec![]);
        }

        let mut log = self.log.write().map_err(poisoned)?;
        let Log { events: all, streams } = &mut *log;
        let stream = streams.entry(aggregate_id).or_default();

        let head = stream.last().map(|&i| &all[i]);
        let actual = head.map_or(0, |e| e.sequence_number);
        if !expected.matches(actual) {
            return Err(EventStoreError::Concurrency { aggregate_id, expected, actual });
        }
        if let Some(head) = head {
            if head.aggregate_type != aggregate_type {
                return Err(EventStoreError::AggregateTypeMismatch {
                    aggregate_id,
                    existing: head.aggregate_type.clone(),
                    attempted: aggregate_type.to_string(),
                });
            }
        }

        let mut committed = Vec::with_capacity(events.len());
        for (offset, e) in (1u64..).zip(events) {
            let recorded = RecordedEvent {
                position: all.len() as u64 + 1,
                aggregate_id,
                aggregate_type: aggregate_type.to_string(),
                sequence_number: actual + offset,
                event_id: e.event_id,
                event_type: e.event_type,
                event_version: e.event_version,
                occurred_at: e.occurred_at,
                payload: e.payload,
            };
            stream.push(all.len());
            all.push(recorded.clone());
            committed.push(recorded);
        }
        Ok(committed)
    }

    fn read_stream(&self, aggregate_id: AggregateId) -> Result<Vec<RecordedEvent>, EventStoreError> {
        let log = self.log.read().map_err(poisoned)?;
        Ok(log
            .streams
            .get(&aggregate_id)
            .map(|idx| idx.iter().map(|&i| log.events[i].clone()).collect())
            .unwrap_or_default())
    }

    fn read_all(&self) -> Result<Vec<RecordedEvent>, EventStoreError> {
        Ok(self.log.read().map_err(poisoned)?.events.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn event(kind: &str) -> NewEvent {
        NewEvent {
            event_id: Uuid::now_v7(),
            event_type: kind.to_string(),
            event_version: 1,
            occurred_at: Utc::now(),
            payload: serde_json::json!({ "kind": kind }),
        }
    }

    #[test]
    fn streams_number_independently_and_log_keeps_commit_order() {
        let store = InMemoryEventStore::new();
        let lamp = AggregateId::new();
        let mug = AggregateId::new();

        let first = store
            .append(lamp, "products.product", ExpectedVersion::Exact(0), vec![event("created"), event("stock")])
            .unwrap();
        assert_eq!(first.iter().map(|e| e.sequence_number).collect::<Vec<_>>(), vec![1, 2]);

        let other = store.append(mug, "products.product", ExpectedVersion::Exact(0), vec![event("created")]).unwrap();
        assert_eq!(other[0].sequence_number, 1);
        assert_eq!(other[0].position, 3);

        store.append(lamp, "products.product", ExpectedVersion::Exact(2), vec![event("deleted")]).unwrap();

        let stream = store.read_stream(lamp).unwrap();
        assert_eq!(stream.iter().map(|e| e.sequence_number).collect::<Vec<_>>(), vec![1, 2, 3]);
        let all = store.read_all().unwrap();
        assert_eq!(all.iter().map(|e| e.position).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
        assert_eq!(all[2].aggregate_id, mug);
        assert_eq!(store.len(), 4);
    }

    #[test]
    fn stale_version_appends_nothing() {
        let store = InMemoryEventStore::new();
        let sale = AggregateId::new();
        store.append(sale, "sales.sale", ExpectedVersion::Exact(0), vec![event("registered")]).unwrap();

        let err = store
            .append(sale, "sales.sale", ExpectedVersion::Exact(0), vec![event("registered")])
            .unwrap_err();
        assert!(matches!(err, EventStoreError::Concurrency { actual: 1, .. }));
        assert_eq!(store.read_stream(sale).unwrap().len(), 1);
    }

    #[test]
    fn stream_keeps_its_aggregate_type() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        store.append(id, "lists.list", ExpectedVersion::Any, vec![event("created")]).unwrap();

        let err = store.append(id, "sales.sale", ExpectedVersion::Any, vec![event("registered")]).unwrap_err();
        assert!(matches!(err, EventStoreError::AggregateTypeMismatch { .. }));
    }

    #[test]
    fn empty_batch_and_unknown_stream() {
        let store = InMemoryEventStore::new();
        let id = AggregateId::new();
        assert!(store.append(id, "auth.user", ExpectedVersion::Exact(5), vec![]).unwrap().is_empty());
        assert!(store.read_stream(id).unwrap().is_empty());
        assert!(store.is_empty());
    }
}
