use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{Aggregate, AggregateId, AggregateRoot, DomainError, Money, require_text};
use storefront_events::Event;

use crate::Category;

/// Product identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub AggregateId);

impl ProductId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for ProductId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: Product.
///
/// # Invariants
/// - `name` and `description` are non-blank, `price` is positive.
/// - `quantity` (stock) never goes below zero.
/// - A deleted product rejects every further command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    id: ProductId,
    name: String,
    description: String,
    price: Money,
    quantity: u32,
    category: Category,
    image: Option<String>,
    version: u64,
    created: bool,
    deleted: bool,
}

impl Product {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: ProductId) -> Self {
        Self {
            id,
            name: String::new(),
            description: String::new(),
            price: Money::ZERO,
            quantity: 0,
            category: Category::Other,
            image: None,
            version: 0,
            created: false,
            deleted: false,
        }
    }

    pub fn id_typed(&self) -> ProductId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn price(&self) -> Money {
        self.price
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Whether `units` can be sold from current stock.
    pub fn can_sell(&self, units: u32) -> bool {
        self.created && !self.deleted && units <= self.quantity
    }
}

impl AggregateRoot for Product {
    type Id = ProductId;

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
pub struct CreateProduct {
    pub product_id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub quantity: u32,
    pub category: Category,
    pub image: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Partial update; `None` leaves a field untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProduct {
    pub product_id: ProductId,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub quantity: Option<u32>,
    pub category: Option<Category>,
    pub occurred_at: DateTime<Utc>,
}

/// Signed stock change (negative when units are sold).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustStock {
    pub product_id: ProductId,
    pub delta: i64,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachImage {
    pub product_id: ProductId,
    pub image: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteProduct {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductCommand {
    CreateProduct(CreateProduct),
    UpdateProduct(UpdateProduct),
    AdjustStock(AdjustStock),
    AttachImage(AttachImage),
    DeleteProduct(DeleteProduct),
}

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCreated {
    pub product_id: ProductId,
    pub name: String,
    pub description: String,
    pub price: Money,
    pub quantity: u32,
    pub category: Category,
    pub image: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Carries only the fields that actually changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductUpdated {
    pub product_id: ProductId,
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub quantity: Option<u32>,
    pub category: Option<Category>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjusted {
    pub product_id: ProductId,
    pub delta: i64,
    pub new_quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAttached {
    pub product_id: ProductId,
    pub image: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDeleted {
    pub product_id: ProductId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductEvent {
    ProductCreated(ProductCreated),
    ProductUpdated(ProductUpdated),
    StockAdjusted(StockAdjusted),
    ImageAttached(ImageAttached),
    ProductDeleted(ProductDeleted),
}

impl Event for ProductEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ProductEvent::ProductCreated(_) => "products.product.created",
            ProductEvent::ProductUpdated(_) => "products.product.updated",
            ProductEvent::StockAdjusted(_) => "products.product.stock_adjusted",
            ProductEvent::ImageAttached(_) => "products.product.image_attached",
            ProductEvent::ProductDeleted(_) => "products.product.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            ProductEvent::ProductCreated(e) => e.occurred_at,
            ProductEvent::ProductUpdated(e) => e.occurred_at,
            ProductEvent::StockAdjusted(e) => e.occurred_at,
            ProductEvent::ImageAttached(e) => e.occurred_at,
            ProductEvent::ProductDeleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Product {
    type Command = ProductCommand;
    type Event = ProductEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            ProductEvent::ProductCreated(e) => {
                self.id = e.product_id;
                self.name = e.name.clone();
                self.description = e.description.clone();
                self.price = e.price;
                self.quantity = e.quantity;
                self.category = e.category;
                self.image = e.image.clone();
                self.created = true;
            }
            ProductEvent::ProductUpdated(e) => {
                if let Some(name) = &e.name {
                    self.name = name.clone();
                }
                if let Some(description) = &e.description {
                    self.description = description.clone();
                }
                if let Some(price) = e.price {
                    self.price = price;
                }
                if let Some(quantity) = e.quantity {
                    self.quantity = quantity;
                }
                if let Some(category) = e.category {
                    self.category = category;
                }
            }
            ProductEvent::StockAdjusted(e) => self.quantity = e.new_quantity,
            ProductEvent::ImageAttached(e) => self.image = Some(e.image.clone()),
            ProductEvent::ProductDeleted(_) => self.deleted = true,
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            ProductCommand::CreateProduct(cmd) => self.handle_create(cmd),
            ProductCommand::UpdateProduct(cmd) => self.handle_update(cmd),
            ProductCommand::AdjustStock(cmd) => self.handle_adjust_stock(cmd),
            ProductCommand::AttachImage(cmd) => self.handle_attach_image(cmd),
            ProductCommand::DeleteProduct(cmd) => self.handle_delete(cmd),
        }
    }
}

fn require_positive_price(price: Money) -> Result<Money, DomainError> {
    if price == Money::ZERO {
        return Err(DomainError::validation("price must be greater than zero"));
    }
    Ok(price)
}

impl Product {
    fn ensure_product_id(&self, product_id: ProductId) -> Result<(), DomainError> {
        if self.id != product_id {
            return Err(DomainError::invariant("product_id mismatch"));
        }
        Ok(())
    }

    fn ensure_live(&self) -> Result<(), DomainError> {
        if !self.created || self.deleted {
            return Err(DomainError::not_found("product"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_product_id(cmd.product_id)?;
        if self.created {
            return Err(DomainError::conflict("product already exists"));
        }

        let name = require_text("name", &cmd.name)?;
        let description = require_text("description", &cmd.description)?;
        let price = require_positive_price(cmd.price)?;

        Ok(vec![ProductEvent::ProductCreated(ProductCreated {
            product_id: cmd.product_id,
            name,
            description,
            price,
            quantity: cmd.quantity,
            category: cmd.category,
            image: cmd.image.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_live()?;
        self.ensure_product_id(cmd.product_id)?;

        if cmd.name.is_none()
            && cmd.description.is_none()
            && cmd.price.is_none()
            && cmd.quantity.is_none()
            && cmd.category.is_none()
        {
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
        let price = cmd
            .price
            .map(require_positive_price)
            .transpose()?
            .filter(|p| *p != self.price);
        let quantity = cmd.quantity.filter(|q| *q != self.quantity);
        let category = cmd.category.filter(|c| *c != self.category);

        if name.is_none()
            && description.is_none()
            && price.is_none()
            && quantity.is_none()
            && category.is_none()
        {
            return Ok(vec![]);
        }

        Ok(vec![ProductEvent::ProductUpdated(ProductUpdated {
            product_id: cmd.product_id,
            name,
            description,
            price,
            quantity,
            category,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_adjust_stock(&self, cmd: &AdjustStock) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_live()?;
        self.ensure_product_id(cmd.product_id)?;

        if cmd.delta == 0 {
            return Err(DomainError::validation("stock delta must be non-zero"));
        }

        let next = i64::from(self.quantity)
            .checked_add(cmd.delta)
            .ok_or_else(|| DomainError::validation("stock quantity overflow"))?;
        if next < 0 {
            return Err(DomainError::InsufficientStock {
                product: self.name.clone(),
                available: self.quantity,
                requested: cmd.delta.unsigned_abs(),
            });
        }
        let new_quantity =
            u32::try_from(next).map_err(|_| DomainError::validation("stock quantity overflow"))?;

        Ok(vec![ProductEvent::StockAdjusted(StockAdjusted {
            product_id: cmd.product_id,
            delta: cmd.delta,
            new_quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_attach_image(&self, cmd: &AttachImage) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_live()?;
        self.ensure_product_id(cmd.product_id)?;

        let image = require_text("image", &cmd.image)?;
        Ok(vec![ProductEvent::ImageAttached(ImageAttached {
            product_id: cmd.product_id,
            image,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteProduct) -> Result<Vec<ProductEvent>, DomainError> {
        self.ensure_live()?;
        self.ensure_product_id(cmd.product_id)?;

        Ok(vec![ProductEvent::ProductDeleted(ProductDeleted {
            product_id: cmd.product_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
