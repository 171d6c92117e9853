//! User directory read model built from auth events.
//!
//! Password hashes stay in the event stream; login rehydrates the `User`
//! aggregate to verify credentials.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use storefront_auth::UserEvent;
use storefront_core::UserId;
use storefront_events::EventEnvelope;

use super::cursor::StreamCursors;
use super::{Projection, ProjectionError};
use crate::read_model::ReadStore;

pub const USER_AGGREGATE_TYPE: &str = "auth.user";

/// User read model for queries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserReadModel {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Projection that maintains the user directory.
#[derive(Debug)]
pub struct UsersProjection<S>
where
    S: ReadStore<UserId, UserReadModel>,
{
    store: S,
    cursors: StreamCursors,
}

impl<S> UsersProjection<S>
where
    S: ReadStore<UserId, UserReadModel>,
{
    pub fn new(store: S) -> Self {
        Self {
            store,
            cursors: StreamCursors::new(),
        }
    }

    pub fn get(&self, user_id: &UserId) -> Option<UserReadModel> {
        self.store.get(user_id)
    }

    /// Look a user up by (already normalized) email.
    pub fn find_by_email(&self, email: &str) -> Option<UserReadModel> {
        self.store.list().into_iter().find(|u| u.email == email)
    }

    /// All users ordered by name, then id.
    pub fn list(&self) -> Vec<UserReadModel> {
        let mut users = self.store.list();
        users.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        users
    }

    pub fn admin_count(&self) -> usize {
        self.store.list().iter().filter(|u| u.is_admin).count()
    }

    fn update(&self, user_id: UserId, at: DateTime<Utc>, f: impl FnOnce(&mut UserReadModel)) {
        if let Some(mut model) = self.store.get(&user_id) {
            f(&mut model);
            model.updated_at = at;
            self.store.upsert(user_id, model);
        }
    }
}

impl<S> Projection for UsersProjection<S>
where
    S: ReadStore<UserId, UserReadModel>,
{
    fn name(&self) -> &'static str {
        "auth.users"
    }

    fn aggregate_type(&self) -> &'static str {
        USER_AGGREGATE_TYPE
    }

    fn apply_envelope(&self, envelope: &EventEnvelope<JsonValue>) -> Result<(), ProjectionError> {
        if envelope.aggregate_type() != USER_AGGREGATE_TYPE {
            return Ok(());
        }

        let aggregate_id = envelope.aggregate_id();
        let seq = envelope.sequence_number();
        if !self.cursors.should_apply(aggregate_id, seq)? {
            return Ok(());
        }

        let event: UserEvent = serde_json::from_value(envelope.payload().clone())
            .map_err(|e| ProjectionError::Deserialize(e.to_string()))?;
        let user_id = match &event {
            UserEvent::Registered(e) => e.user_id,
            UserEvent::AdminChanged(e) => e.user_id,
            UserEvent::Renamed(e) => e.user_id,
            UserEvent::Deleted(e) => e.user_id,
        };
        if UserId::from(aggregate_id) != user_id {
            return Err(ProjectionError::StreamMismatch(
                "event user_id does not match envelope aggregate_id".to_string(),
            ));
        }

        match event {
            UserEvent::Registered(e) => {
                self.store.upsert(
                    e.user_id,
                    UserReadModel {
                        id: e.user_id,
                        name: e.name,
                        email: e.email,
                        is_admin: e.is_admin,
                        created_at: e.occurred_at,
                        updated_at: e.occurred_at,
                    },
                );
            }
            UserEvent::AdminChanged(e) => self.update(e.user_id, e.occurred_at, |m| m.is_admin = e.is_admin),
            UserEvent::Renamed(e) => self.update(e.user_id, e.occurred_at, |m| m.name = e.name),
            UserEvent::Deleted(e) => {
                self.store.remove(&e.user_id);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::read_model::InMemoryReadStore;
    use storefront_auth::{UserAdminChanged, UserRegistered};
    use storefront_events::Event;

    fn envelope(user_id: UserId, seq: u64, ev: &UserEvent) -> EventEnvelope<JsonValue> {
        EventEnvelope::new(user_id.into(), USER_AGGREGATE_TYPE, seq, ev.event_type(), serde_json::to_value(ev).unwrap())
    }

    #[test]
    fn registers_and_promotes_users() {
        let projection = UsersProjection::new(InMemoryReadStore::new());
        let id = UserId::new();
        let registered = UserEvent::Registered(UserRegistered {
            user_id: id,
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            password_hash: "hash".to_string(),
            is_admin: false,
            occurred_at: Utc::now(),
        });
        projection.apply_envelope(&envelope(id, 1, &registered)).unwrap();

        let found = projection.find_by_email("ana@example.com").unwrap();
        assert_eq!(found.id, id);
        assert_eq!(projection.admin_count(), 0);

        let promoted = UserEvent::AdminChanged(UserAdminChanged { user_id: id, is_admin: true, occurred_at: Utc::now() });
        projection.apply_envelope(&envelope(id, 2, &promoted)).unwrap();
        assert!(projection.get(&id).unwrap().is_admin);
        assert_eq!(projection.admin_count(), 1);
    }
}
