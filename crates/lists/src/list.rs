use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{Aggregate, AggregateId, AggregateRoot, DomainError, UserId, require_text};
use storefront_events::Event;
use storefront_products::ProductId;

/// Custom list identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListId(pub AggregateId);

impl ListId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ListId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Whether a viewer may see a list.
///
/// Admins see everything; others see public lists, lists shared with them, and
/// lists they own.
pub fn is_visible_to(
    viewer: UserId,
    viewer_is_admin: bool,
    owner: UserId,
    is_public: bool,
    shared_with: &BTreeSet<UserId>,
) -> bool {
    viewer_is_admin || is_public || owner == viewer || shared_with.contains(&viewer)
}

/// Aggregate root: CustomList.
///
/// # Invariants
/// - `product_ids` keeps insertion order and never holds duplicates.
/// - `shared_with` never contains the owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomList {
    id: ListId,
    name: String,
    description: String,
    owner: Option<UserId>,
    product_ids: Vec<ProductId>,
    shared_with: BTreeSet<UserId>,
    is_public: bool,
    version: u64,
    created: bool,
    deleted: bool,
}

impl CustomList {
    pub fn empty(id: ListId) -> Self {
        Self {
            id,
            name: String::new(),
            description: String::new(),
            owner: None,
            product_ids: Vec::new(),
            shared_with: BTreeSet::new(),
            is_public: false,
            version: 0,
            created: false,
            deleted: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn owner(&self) -> Option<UserId> {
        self.owner
    }

    pub fn product_ids(&self) -> &[ProductId] {
        &self.product_ids
    }

    pub fn shared_with(&self) -> &BTreeSet<UserId> {
        &self.shared_with
    }

    pub fn is_public(&self) -> bool {
        self.is_public
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}

impl AggregateRoot for CustomList {
    type Id = ListId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateList {
    pub list_id: ListId,
    pub owner: UserId,
    pub name: String,
    pub description: String,
    pub product_ids: Vec<ProductId>,
    pub shared_with: Vec<UserId>,
    pub is_public: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateList {
    pub list_id: ListId,
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddProduct {
    pub list_id: ListId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveProduct {
    pub list_id: ListId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareWith {
    pub list_id: ListId,
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unshare {
    pub list_id: ListId,
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteList {
    pub list_id: ListId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListCommand {
    Create(CreateList),
    Update(UpdateList),
    AddProduct(AddProduct),
    RemoveProduct(RemoveProduct),
    Share(ShareWith),
    Unshare(Unshare),
    Delete(DeleteList),
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListCreated {
    pub list_id: ListId,
    pub owner: UserId,
    pub name: String,
    pub description: String,
    pub product_ids: Vec<ProductId>,
    pub shared_with: Vec<UserId>,
    pub is_public: bool,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListUpdated {
    pub list_id: ListId,
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_public: Option<bool>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductAdded {
    pub list_id: ListId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRemoved {
    pub list_id: ListId,
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListShared {
    pub list_id: ListId,
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListUnshared {
    pub list_id: ListId,
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListDeleted {
    pub list_id: ListId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ListEvent {
    Created(ListCreated),
    Updated(ListUpdated),
    ProductAdded(ProductAdded),
    ProductRemoved(ProductRemoved),
    Shared(ListShared),
    Unshared(ListUnshared),
    Deleted(ListDeleted),
}

impl Event for ListEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ListEvent::Created(_) => "lists.list.created",
            ListEvent::Updated(_) => "lists.list.updated",
            ListEvent::ProductAdded(_) => "lists.list.product_added",
            ListEvent::ProductRemoved(_) => "lists.list.product_removed",
            ListEvent::Shared(_) => "lists.list.shared",
            ListEvent::Unshared(_) => "lists.list.unshared",
            ListEvent::Deleted(_) => "lists.list.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ListEvent::Created(e) => e.occurred_at,
            ListEvent::Updated(e) => e.occurred_at,
            ListEvent::ProductAdded(e) => e.occurred_at,
            ListEvent::ProductRemoved(e) => e.occurred_at,
            ListEvent::Shared(e) => e.occurred_at,
            ListEvent::Unshared(e) => e.occurred_at,
            ListEvent::Deleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for CustomList {
    type Command = ListCommand;
    type Event = ListEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ListEvent::Created(e) => {
                self.id = e.list_id;
                self.owner = Some(e.owner);
                self.name = e.name.clone();
                self.description = e.description.clone();
                self.product_ids = e.product_ids.clone();
                self.shared_with = e.shared_with.iter().copied().collect();
                self.is_public = e.is_public;
                self.created = true;
            }
            ListEvent::Updated(e) => {
                if let Some(name) = &e.name {
                    self.name = name.clone();
                }
                if let Some(description) = &e.description {
                    self.description = description.clone();
                }
                if let Some(is_public) = e.is_public {
                    self.is_public = is_public;
                }
            }
            ListEvent::ProductAdded(e) => self.product_ids.push(e.product_id),
            ListEvent::ProductRemoved(e) => self.product_ids.retain(|p| *p != e.product_id),
            ListEvent::Shared(e) => {
                self.shared_with.insert(e.user_id);
            }
            ListEvent::Unshared(e) => {
                self.shared_with.remove(&e.user_id);
            }
            ListEvent::Deleted(_) => self.deleted = true,
        }
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ListCommand::Create(cmd) => self.handle_create(cmd),
            ListCommand::Update(cmd) => self.handle_update(cmd),
            ListCommand::AddProduct(cmd) => self.handle_add_product(cmd),
            ListCommand::RemoveProduct(cmd) => self.handle_remove_product(cmd),
            ListCommand::Share(cmd) => self.handle_share(cmd),
            ListCommand::Unshare(cmd) => self.handle_unshare(cmd),
            ListCommand::Delete(cmd) => self.handle_delete(cmd),
        }
    }
}

impl CustomList {
    fn ensure_list_id(&self, list_id: ListId) -> Result<(), DomainError> {
        if self.id != list_id {
            return Err(DomainError::invariant("list_id mismatch"));
        }
        Ok(())
    }

    fn ensure_live(&self, list_id: ListId) -> Result<(), DomainError> {
        if !self.created || self.deleted {
            return Err(DomainError::not_found("list"));
        }
        self.ensure_list_id(list_id)
    }

    fn handle_create(&self, cmd: &CreateList) -> Result<Vec<ListEvent>, DomainError> {
        self.ensure_list_id(cmd.list_id)?;
        if self.created {
            return Err(DomainError::conflict("list already exists"));
        }

        let name = require_text("name", &cmd.name)?;
        let description = require_text("description", &cmd.description)?;

        let mut product_ids = Vec::with_capacity(cmd.product_ids.len());
        for id in &cmd.product_ids {
            if !product_ids.contains(id) {
                product_ids.push(*id);
            }
        }
        let shared_with: BTreeSet<UserId> = cmd
            .shared_with
            .iter()
            .copied()
            .filter(|u| *u != cmd.owner)
            .collect();

        Ok(vec![ListEvent::Created(ListCreated {
            list_id: cmd.list_id,
            owner: cmd.owner,
            name,
            description,
            product_ids,
            shared_with: shared_with.into_iter().collect(),
            is_public: cmd.is_public,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateList) -> Result<Vec<ListEvent>, DomainError> {
        self.ensure_live(cmd.list_id)?;

        if cmd.name.is_none() && cmd.description.is_none() && cmd.is_public.is_none() {
            return Err(DomainError::validation("nothing to update"));
        }

        let name = cmd
            .name
            .as_deref()
            .map(|n| require_text("name", n))
            .transpose()?
            .filter(|n| *n != self.name);
        let description = cmd
            .description
            .as_deref()
            .map(|d| require_text("description", d))
            .transpose()?
            .filter(|d| *d != self.description);
        let is_public = cmd.is_public.filter(|p| *p != self.is_public);

        if name.is_none() && description.is_none() && is_public.is_none() {
            return Ok(vec![]);
        }

        Ok(vec![ListEvent::Updated(ListUpdated {
            list_id: cmd.list_id,
            name,
            description,
            is_public,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_product(&self, cmd: &AddProduct) -> Result<Vec<ListEvent>, DomainError> {
        self.ensure_live(cmd.list_id)?;
        if self.product_ids.contains(&cmd.product_id) {
            return Ok(vec![]);
        }
        Ok(vec![ListEvent::ProductAdded(ProductAdded {
            list_id: cmd.list_id,
            product_id: cmd.product_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_product(&self, cmd: &RemoveProduct) -> Result<Vec<ListEvent>, DomainError> {
        self.ensure_live(cmd.list_id)?;
        if !self.product_ids.contains(&cmd.product_id) {
            return Err(DomainError::not_found("product in list"));
        }
        Ok(vec![ListEvent::ProductRemoved(ProductRemoved {
            list_id: cmd.list_id,
            product_id: cmd.product_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_share(&self, cmd: &ShareWith) -> Result<Vec<ListEvent>, DomainError> {
        self.ensure_live(cmd.list_id)?;
        if self.owner == Some(cmd.user_id) {
            return Err(DomainError::validation("cannot share a list with its owner"));
        }
        if self.shared_with.contains(&cmd.user_id) {
            return Ok(vec![]);
        }
        Ok(vec![ListEvent::Shared(ListShared {
            list_id: cmd.list_id,
            user_id: cmd.user_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_unshare(&self, cmd: &Unshare) -> Result<Vec<ListEvent>, DomainError> {
        self.ensure_live(cmd.list_id)?;
        if !self.shared_with.contains(&cmd.user_id) {
            return Err(DomainError::not_found("share"));
        }
        Ok(vec![ListEvent::Unshared(ListUnshared {
            list_id: cmd.list_id,
            user_id: cmd.user_id,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteList) -> Result<Vec<ListEvent>, DomainError> {
        self.ensure_live(cmd.list_id)?;
        Ok(vec![ListEvent::Deleted(ListDeleted {
            list_id: cmd.list_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
