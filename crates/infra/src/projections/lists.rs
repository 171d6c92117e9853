use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use storefront_core::UserId;
use storefront_events::EventEnvelope;
use storefront_lists::{ListEvent, ListId, is_visible_to};
use storefront_products::ProductId;

use super::cursor::StreamCursors;
use super::{Projection, ProjectionError};
use crate::read_model::ReadStore;

pub const LIST_AGGREGATE_TYPE: &str = "lists.list";

/// Queryable custom list read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListReadModel {
    pub id: ListId,
    pub name: String,
    pub description: String,
    pub owner: UserId,
    pub product_ids: Vec<ProductId>,
    pub shared_with: BTreeSet<UserId>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ListReadModel {
    pub fn visible_to(&self, viewer: UserId, viewer_is_admin: bool) -> bool {
        is_visible_to(viewer, viewer_is_admin, self.owner, self.is_public, &self.shared_with)
    }
}

#[derive(Debug)]
pub struct CustomListsProjection<S>
where
    S: ReadStore<ListId, ListReadModel>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> CustomListsProjection<S>
where
    S: ReadStore<ListId, ListReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, list_id: &ListId) -> Option<ListReadModel> {
        self.store.get(list_id)
    }

    /// Lists the viewer may see, newest first.
    pub fn list_visible(&self, viewer: UserId, viewer_is_admin: bool) -> Vec<ListReadModel> {
        let mut lists: Vec<_> = self
            .store
            .list()
            .into_iter()
            .filter(|l| l.visible_to(viewer, viewer_is_admin))
            .collect();
        lists.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        lists
    }

    fn update(&self, list_id: ListId, at: DateTime<Utc>, f: impl FnOnce(&mut ListReadModel)) {
        if let Some(mut rm) = self.store.get(&list_id) {
            f(&mut rm);
            rm.updated_at = at;
            self.store.upsert(list_id, rm);
        }
    }

    fn apply(&self, ev: ListEvent) {
        match ev {
            ListEvent::Created(e) => {
                self.store.upsert(
                    e.list_id,
                    ListReadModel {
                        id: e.list_id,
                        name: e.name,
                        description: e.description,
                        owner: e.owner,
                        product_ids: e.product_ids,
                        shared_with: e.shared_with.into_iter().collect(),
                        is_public: e.is_public,
                        created_at: e.occurred_at,
                        updated_at: e.occurred_at,
                    },
                );
            }
            ListEvent::Updated(e) => self.update(e.list_id, e.occurred_at, |rm| {
                if let Some(name) = e.name {
                    rm.name = name;
                }
                if let Some(description) = e.description {
                    rm.description = description;
                }
                if let Some(is_public) = e.is_public {
                    rm.is_public = is_public;
                }
            }),
            ListEvent::ProductAdded(e) => self.update(e.list_id, e.occurred_at, |rm| {
                if !rm.product_ids.contains(&e.product_id) {
                    rm.product_ids.push(e.product_id);
                }
            }),
            ListEvent::ProductRemoved(e) => self.update(e.list_id, e.occurred_at, |rm| {
                rm.product_ids.retain(|p| *p != e.product_id);
            }),
            ListEvent::Shared(e) => self.update(e.list_id, e.occurred_at, |rm| {
                rm.shared_with.insert(e.user_id);
            }),
            ListEvent::Unshared(e) => self.update(e.list_id, e.occurred_at, |rm| {
                rm.shared_with.remove(&e.user_id);
            }),
            ListEvent::Deleted(e) => {
                self.store.remove(&e.list_id);
            }
        }
    }
}

fn event_list_id(ev: &ListEvent) -> ListId {
    match ev {
        ListEvent::Created(e) => e.list_id,
        ListEvent::Updated(e) => e.list_id,
        ListEvent::ProductAdded(e) => e.list_id,
        ListEvent::ProductRemoved(e) => e.list_id,
        ListEvent::Shared(e) => e.list_id,
        ListEvent::Unshared(e) => e.list_id,
        ListEvent::Deleted(e) => e.list_id,
    }
}

impl<S> Projection for CustomListsProjection<S>
where
    S: ReadStore<ListId, ListReadModel>,
{
    fn name(&self) -> &'static str {
        "lists.custom_lists"
    }

    fn aggregate_type(&self) -> &'static str {
        LIST_AGGREGATE_TYPE
    }

    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != LIST_AGGREGATE_TYPE {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();
        if !self.cursors.should_apply(aggregate_id, seq)? {
            return Ok(());
        }

        let ev: ListEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;
        if event_list_id(&ev).0 != aggregate_id {
            return Err(ProjectionError::StreamMismatch(
                "event list_id does not match envelope aggregate_id".to_string(),
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read_model::InMemoryReadStore;
    use storefront_core::AggregateId;
    use storefront_lists::{ListCreated, ListShared, ProductRemoved};
    use storefront_events::Event;

    fn envelope(id: ListId, seq: u64, ev: &ListEvent) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(id.0, LIST_AGGREGATE_TYPE, seq, ev.event_type(), serde_json::to_value(ev).unwrap())
    }

    fn created(id: ListId, owner: UserId, products: Vec<ProductId>, is_public: bool) -> ListEvent {
        ListEvent::Created(ListCreated {
            list_id: id,
            owner,
            name: "Picks".to_string(),
            description: "Staff picks".to_string(),
            product_ids: products,
            shared_with: vec![],
            is_public,
            occurred_at: Utc::now(),
        })
    }

    #[test]
    fn visibility_follows_sharing() {
        let projection = CustomListsProjection::new(InMemoryReadStore::new());
        let admin = UserId::new();
        let seller = UserId::new();
        let private = ListId::new(AggregateId::new());
        let public = ListId::new(AggregateId::new());

        projection.apply_envelope(&envelope(private, 1, &created(private, admin, vec![], false))).unwrap();
        projection.apply_envelope(&envelope(public, 1, &created(public, admin, vec![], true))).unwrap();

        assert_eq!(projection.list_visible(seller, false).len(), 1);
        assert_eq!(projection.list_visible(admin, true).len(), 2);

        let shared = ListEvent::Shared(ListShared { list_id: private, user_id: seller, occurred_at: Utc::now() });
        projection.apply_envelope(&envelope(private, 2, &shared)).unwrap();
        assert_eq!(projection.list_visible(seller, false).len(), 2);
    }

    #[test]
    fn product_removal_keeps_order() {
        let projection = CustomListsProjection::new(InMemoryReadStore::new());
        let id = ListId::new(AggregateId::new());
        let p: Vec<ProductId> = (0..3).map(|_| ProductId::new(AggregateId::new())).collect();

        projection.apply_envelope(&envelope(id, 1, &created(id, UserId::new(), p.clone(), true))).unwrap();
        let removed = ListEvent::ProductRemoved(ProductRemoved { list_id: id, product_id: p[1], occurred_at: Utc::now() });
        projection.apply_envelope(&envelope(id, 2, &removed)).unwrap();

        assert_eq!(projection.get(&id).unwrap().product_ids, vec![p[0], p[2]]);
    }
}
