//! User aggregate for identity management (event-sourced).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{Aggregate, AggregateRoot, DomainError, UserId, require_text};
use storefront_events::Event;

// ─────────────────────────────────────────────────────────────────────────────
// User Aggregate
// ─────────────────────────────────────────────────────────────────────────────

/// User aggregate.
///
/// # Invariants
/// - Name and email are non-blank; email is stored trimmed and lowercased.
/// - The password is only ever held as a PHC hash.
/// - A deleted user rejects every further command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    name: String,
    email: String,
    password_hash: String,
    is_admin: bool,
    version: u64,
    created: bool,
    deleted: bool,
}

impl User {
    /// Create an empty, not-yet-registered aggregate instance for rehydration.
    pub fn empty(id: UserId) -> Self {
        Self {
            id,
            name: String::new(),
            email: String::new(),
            password_hash: String::new(),
            is_admin: false,
            version: 0,
            created: false,
            deleted: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn is_admin(&self) -> bool {
        self.is_admin
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    fn ensure_live(&self) -> Result<(), DomainError> {
        if !self.created || self.deleted {
            return Err(DomainError::not_found("user"));
        }
        Ok(())
    }
}

impl AggregateRoot for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Normalize and sanity-check an email address.
pub fn normalize_email(email: &str) -> Result<String, DomainError> {
    let email = require_text("email", email)?.to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() && !domain.contains('@') => {
            Ok(email)
        }
        _ => Err(DomainError::validation("invalid email format")),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUser {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetAdmin {
    pub user_id: UserId,
    pub is_admin: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameUser {
    pub user_id: UserId,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteUser {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum UserCommand {
    Register(RegisterUser),
    SetAdmin(SetAdmin),
    Rename(RenameUser),
    Delete(DeleteUser),
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRegistered {
    pub user_id: UserId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAdminChanged {
    pub user_id: UserId,
    pub is_admin: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRenamed {
    pub user_id: UserId,
    pub name: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserDeleted {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserEvent {
    Registered(UserRegistered),
    AdminChanged(UserAdminChanged),
    Renamed(UserRenamed),
    Deleted(UserDeleted),
}

impl Event for UserEvent {
    fn event_type(&self) -> &'static str {
        match self {
            UserEvent::Registered(_) => "auth.user.registered",
            UserEvent::AdminChanged(_) => "auth.user.admin_changed",
            UserEvent::Renamed(_) => "auth.user.renamed",
            UserEvent::Deleted(_) => "auth.user.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            UserEvent::Registered(e) => e.occurred_at,
            UserEvent::AdminChanged(e) => e.occurred_at,
            UserEvent::Renamed(e) => e.occurred_at,
            UserEvent::Deleted(e) => e.occurred_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Aggregate Implementation
// ─────────────────────────────────────────────────────────────────────────────

impl Aggregate for User {
    type Command = UserCommand;
    type Event = UserEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            UserEvent::Registered(e) => {
                self.id = e.user_id;
                self.name = e.name.clone();
                self.email = e.email.clone();
                self.password_hash = e.password_hash.clone();
                self.is_admin = e.is_admin;
                self.created = true;
            }
            UserEvent::AdminChanged(e) => self.is_admin = e.is_admin,
            UserEvent::Renamed(e) => self.name = e.name.clone(),
            UserEvent::Deleted(_) => self.deleted = true,
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            UserCommand::Register(cmd) => self.handle_register(cmd),
            UserCommand::SetAdmin(cmd) => self.handle_set_admin(cmd),
            UserCommand::Rename(cmd) => self.handle_rename(cmd),
            UserCommand::Delete(cmd) => self.handle_delete(cmd),
        }
    }
}

impl User {
    fn ensure_user_id(&self, user_id: UserId) -> Result<(), DomainError> {
        if self.id != user_id {
            return Err(DomainError::invariant("user_id mismatch"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterUser) -> Result<Vec<UserEvent>, DomainError> {
        self.ensure_user_id(cmd.user_id)?;
        if self.created {
            return Err(DomainError::conflict("user already exists"));
        }

        let name = require_text("name", &cmd.name)?;
        let email = normalize_email(&cmd.email)?;
        if cmd.password_hash.is_empty() {
            return Err(DomainError::validation("password is required"));
        }

        Ok(vec![UserEvent::Registered(UserRegistered {
            user_id: cmd.user_id,
            name,
            email,
            password_hash: cmd.password_hash.clone(),
            is_admin: cmd.is_admin,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_admin(&self, cmd: &SetAdmin) -> Result<Vec<UserEvent>, DomainError> {
        self.ensure_live()?;
        self.ensure_user_id(cmd.user_id)?;

        if self.is_admin == cmd.is_admin {
            return Ok(vec![]);
        }

        Ok(vec![UserEvent::AdminChanged(UserAdminChanged {
            user_id: cmd.user_id,
            is_admin: cmd.is_admin,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_rename(&self, cmd: &RenameUser) -> Result<Vec<UserEvent>, DomainError> {
        self.ensure_live()?;
        self.ensure_user_id(cmd.user_id)?;

        let name = require_text("name", &cmd.name)?;
        if name == self.name {
            return Ok(vec![]);
        }

        Ok(vec![UserEvent::Renamed(UserRenamed {
            user_id: cmd.user_id,
            name,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteUser) -> Result<Vec<UserEvent>, DomainError> {
        self.ensure_live()?;
        self.ensure_user_id(cmd.user_id)?;

        Ok(vec![UserEvent::Deleted(UserDeleted {
            user_id: cmd.user_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn registered(user_id: UserId, is_admin: bool) -> User {
        let mut user = User::empty(user_id);
        let cmd = UserCommand::Register(RegisterUser {
            user_id,
            name: "  Alice Smith ".to_string(),
            email: " Alice@Example.COM ".to_string(),
            password_hash: "$argon2id$fake".to_string(),
            is_admin,
            occurred_at: Utc::now(),
        });
        for event in user.handle(&cmd).unwrap() {
            user.apply(&event);
        }
        user
    }

    #[test]
    fn register_normalizes_name_and_email() {
        let user = registered(UserId::new(), false);
        assert_eq!(user.name(), "Alice Smith");
        assert_eq!(user.email(), "alice@example.com");
        assert!(!user.is_admin());
        assert_eq!(user.version(), 1);
    }

    #[test]
    fn register_twice_is_a_conflict() {
        let user_id = UserId::new();
        let user = registered(user_id, false);
        let again = UserCommand::Register(RegisterUser {
            user_id,
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "$argon2id$fake".to_string(),
            is_admin: false,
            occurred_at: Utc::now(),
        });
        assert!(matches!(user.handle(&again), Err(DomainError::Conflict(_))));
    }

    #[test]
    fn register_rejects_blank_name_and_bad_email() {
        let user_id = UserId::new();
        let user = User::empty(user_id);
        let base = RegisterUser {
            user_id,
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            password_hash: "$argon2id$fake".to_string(),
            is_admin: false,
            occurred_at: Utc::now(),
        };

        let blank_name = RegisterUser { name: "   ".to_string(), ..base.clone() };
        assert!(matches!(
            user.handle(&UserCommand::Register(blank_name)),
            Err(DomainError::Validation(_))
        ));

        for bad in ["invalid-email", "@example.com", "alice@", "a@b@c"] {
            let cmd = RegisterUser { email: bad.to_string(), ..base.clone() };
            assert!(
                matches!(user.handle(&UserCommand::Register(cmd)), Err(DomainError::Validation(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn set_admin_to_current_value_is_a_no_op() {
        let user_id = UserId::new();
        let user = registered(user_id, true);
        let events = user
            .handle(&UserCommand::SetAdmin(SetAdmin {
                user_id,
                is_admin: true,
                occurred_at: Utc::now(),
            }))
            .unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn promote_then_delete() {
        let user_id = UserId::new();
        let mut user = registered(user_id, false);

        for e in user
            .handle(&UserCommand::SetAdmin(SetAdmin { user_id, is_admin: true, occurred_at: Utc::now() }))
            .unwrap()
        {
            user.apply(&e);
        }
        assert!(user.is_admin());

        for e in user
            .handle(&UserCommand::Delete(DeleteUser { user_id, occurred_at: Utc::now() }))
            .unwrap()
        {
            user.apply(&e);
        }
        assert!(user.is_deleted());

        let rename = UserCommand::Rename(RenameUser {
            user_id,
            name: "Bob".to_string(),
            occurred_at: Utc::now(),
        });
        assert_eq!(user.handle(&rename), Err(DomainError::NotFound("user")));
    }

    #[test]
    fn commands_on_unregistered_user_are_not_found() {
        let user_id = UserId::new();
        let user = User::empty(user_id);
        let cmd = UserCommand::Delete(DeleteUser { user_id, occurred_at: Utc::now() });
        assert_eq!(user.handle(&cmd), Err(DomainError::NotFound("user")));
    }
}
