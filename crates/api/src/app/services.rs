//! Service wiring: event store, projection router, dispatcher, read models.
//!
//! Everything lives in memory; a restart starts from an empty store (plus
//! the bootstrap administrator, if configured).

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, MutexGuard};

use storefront_auth::{
    Hs256Jwt, JwtClaims, JwtCodec, RegisterUser, Role, User, UserCommand, hash_password,
    normalize_email, verify_password,
};
use storefront_core::{Aggregate, AggregateId, DomainError, UserId};
use storefront_infra::{
    command_dispatcher::{CommandDispatcher, DispatchError},
    event_store::{EventStore, InMemoryEventStore, RecordedEvent},
    images::ImageStore,
    projections::{
        CustomListsProjection, ListReadModel, PRODUCT_AGGREGATE_TYPE, ProductCatalogProjection,
        ProductReadModel, ProjectionRouter, SALE_AGGREGATE_TYPE, SalesProjection, USER_AGGREGATE_TYPE,
        UserReadModel, UsersProjection,
    },
    read_model::InMemoryReadStore,
};
use storefront_lists::ListId;
use storefront_products::{AdjustStock, Product, ProductCommand, ProductId};
use storefront_sales::{RegisterSale, Sale, SaleCommand, SaleId, SaleLine, SaleRecord};

use crate::app::errors::ApiError;
use crate::config::{ApiConfig, BootstrapAdmin};

type Dispatcher = CommandDispatcher<Arc<InMemoryEventStore>, Arc<ProjectionRouter>>;

pub type Catalog = ProductCatalogProjection<InMemoryReadStore<ProductId, ProductReadModel>>;
pub type Lists = CustomListsProjection<InMemoryReadStore<ListId, ListReadModel>>;
pub type Sales = SalesProjection<InMemoryReadStore<SaleId, SaleRecord>>;
pub type Users = UsersProjection<InMemoryReadStore<UserId, UserReadModel>>;

/// Token plus the user it was issued for; returned by register and login.
#[derive(Debug, Clone, Serialize)]
pub struct AuthSession {
    pub token: String,
    pub user: UserReadModel,
}

pub struct AppServices {
    dispatcher: Dispatcher,
    products: Arc<Catalog>,
    lists: Arc<Lists>,
    sales: Arc<Sales>,
    users: Arc<Users>,
    images: ImageStore,
    jwt: Arc<dyn JwtCodec>,
    config: ApiConfig,
    /// Serializes check-then-act sequences (email uniqueness, stock checks).
    write_lock: Mutex<()>,
}

impl AppServices {
    pub fn new(config: ApiConfig) -> Self {
        let products = Arc::new(Catalog::new(InMemoryReadStore::new()));
        let lists = Arc::new(Lists::new(InMemoryReadStore::new()));
        let sales = Arc::new(Sales::new(InMemoryReadStore::new()));
        let users = Arc::new(Users::new(InMemoryReadStore::new()));

        let router = ProjectionRouter::new()
            .with(products.clone())
            .with(lists.clone())
            .with(sales.clone())
            .with(users.clone());

        let jwt: Arc<dyn JwtCodec> = Arc::new(Hs256Jwt::new(config.jwt_secret.as_bytes()));

        Self {
            dispatcher: CommandDispatcher::new(Arc::new(InMemoryEventStore::new()), Arc::new(router)),
            products,
            lists,
            sales,
            users,
            images: ImageStore::new(),
            jwt,
            config,
            write_lock: Mutex::new(()),
        }
    }

    pub fn products(&self) -> &Catalog {
        &self.products
    }

    pub fn lists(&self) -> &Lists {
        &self.lists
    }

    pub fn sales(&self) -> &Sales {
        &self.sales
    }

    pub fn users(&self) -> &Users {
        &self.users
    }

    pub fn images(&self) -> &ImageStore {
        &self.images
    }

    pub fn jwt(&self) -> &dyn JwtCodec {
        self.jwt.as_ref()
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    pub async fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }

    pub fn dispatch<A>(
        &self,
        aggregate_id: AggregateId,
        aggregate_type: &'static str,
        command: A::Command,
        make: impl FnOnce(AggregateId) -> A,
    ) -> Result<Vec<RecordedEvent>, DispatchError>
    where
        A: Aggregate<Error = DomainError>,
        A::Event: storefront_events::Event + Serialize + DeserializeOwned,
    {
        self.dispatcher.dispatch(aggregate_id, aggregate_type, command, make)
    }

    pub fn issue_session(&self, user: UserReadModel) -> Result<AuthSession, ApiError> {
        let claims = JwtClaims::new(
            user.id,
            user.name.clone(),
            Role::for_user(user.is_admin),
            Utc::now(),
            self.config.token_ttl(),
        );
        let token = self.jwt.issue(&claims)?;
        Ok(AuthSession { token, user })
    }

    /// Register a new account. Emails are unique case-insensitively.
    pub async fn register_user(
        &self,
        name: &str,
        email: &str,
        password: &str,
        is_admin: bool,
    ) -> Result<UserReadModel, ApiError> {
        let email = normalize_email(email)?;
        let password_hash = hash_password(password)?;

        let _guard = self.lock_writes().await;
        if self.users.find_by_email(&email).is_some() {
            return Err(ApiError::Conflict(format!("email {email} is already registered")));
        }

        let user_id = UserId::new();
        self.dispatch::<User>(
            user_id.into(),
            USER_AGGREGATE_TYPE,
            UserCommand::Register(RegisterUser {
                user_id,
                name: name.to_string(),
                email,
                password_hash,
                is_admin,
                occurred_at: Utc::now(),
            }),
            |id| User::empty(id.into()),
        )?;

        tracing::info!(%user_id, is_admin, "user registered");
        self.users
            .get(&user_id)
            .ok_or_else(|| ApiError::Internal("registered user missing from directory".to_string()))
    }

    /// Check credentials. Every failure reads the same to the caller.
    pub fn authenticate(&self, email: &str, password: &str) -> Result<UserReadModel, ApiError> {
        let rejected = || ApiError::Unauthorized("invalid email or password".to_string());

        let email = normalize_email(email).map_err(|_| rejected())?;
        let user = self.users.find_by_email(&email).ok_or_else(rejected)?;
        let account = self
            .dispatcher
            .load(user.id.into(), |id| User::empty(id.into()))?
            .filter(|u| !u.is_deleted())
            .ok_or_else(rejected)?;

        if !verify_password(password, account.password_hash()) {
            tracing::warn!(user_id = %user.id, "failed login");
            return Err(rejected());
        }
        Ok(user)
    }

    /// Create the configured administrator unless the email is already taken.
    pub async fn bootstrap_admin(&self, admin: &BootstrapAdmin) -> Result<(), ApiError> {
        let email = normalize_email(&admin.email)?;
        if self.users.find_by_email(&email).is_some() {
            tracing::info!(%email, "bootstrap admin already present");
            return Ok(());
        }
        self.register_user(&admin.name, &email, &admin.password, true).await?;
        tracing::info!(%email, "bootstrap admin created");
        Ok(())
    }

    pub fn adjust_stock(&self, product_id: ProductId, delta: i64) -> Result<(), ApiError> {
        self.dispatch::<Product>(
            product_id.0,
            PRODUCT_AGGREGATE_TYPE,
            ProductCommand::AdjustStock(AdjustStock { product_id, delta, occurred_at: Utc::now() }),
            |id| Product::empty(ProductId::new(id)),
        )?;
        Ok(())
    }

    /// Register a sale for `seller` and take the sold units out of stock.
    ///
    /// Unit prices come from the catalog. Repeated products are merged. If
    /// any step fails, stock already taken is put back.
    pub async fn register_sale(
        &self,
        seller: UserId,
        items: &[(ProductId, u32)],
    ) -> Result<SaleRecord, ApiError> {
        if items.is_empty() {
            return Err(ApiError::validation("a sale needs at least one item"));
        }

        let mut wanted: Vec<(ProductId, u32)> = Vec::with_capacity(items.len());
        for &(product_id, quantity) in items {
            if quantity == 0 {
                return Err(ApiError::validation("quantity must be positive"));
            }
            match wanted.iter_mut().find(|(p, _)| *p == product_id) {
                Some((_, q)) => {
                    *q = q.checked_add(quantity).ok_or_else(|| ApiError::validation("quantity overflow"))?;
                }
                None => wanted.push((product_id, quantity)),
            }
        }

        let _guard = self.lock_writes().await;

        let mut lines = Vec::with_capacity(wanted.len());
        for (product_id, quantity) in wanted {
            let product = self
                .products
                .get(&product_id)
                .ok_or_else(|| ApiError::NotFound(format!("product {product_id} not found")))?;
            if product.quantity < quantity {
                return Err(ApiError::Conflict(format!(
                    "insufficient stock for {}: {} available, {} requested",
                    product.name, product.quantity, quantity
                )));
            }
            lines.push(SaleLine { product_id, quantity, unit_price: product.price });
        }

        let mut taken: Vec<&SaleLine> = Vec::with_capacity(lines.len());
        for line in &lines {
            if let Err(e) = self.adjust_stock(line.product_id, -i64::from(line.quantity)) {
                self.restore_stock(&taken);
                return Err(e);
            }
            taken.push(line);
        }

        let sale_id = SaleId::new(AggregateId::new());
        let registered = self.dispatch::<Sale>(
            sale_id.0,
            SALE_AGGREGATE_TYPE,
            SaleCommand::Register(RegisterSale {
                sale_id,
                seller,
                lines: lines.clone(),
                policy: self.config.commission,
                occurred_at: Utc::now(),
            }),
            |id| Sale::empty(SaleId::new(id)),
        );
        if let Err(e) = registered {
            self.restore_stock(&taken);
            return Err(e.into());
        }

        let record = self
            .sales
            .get(&sale_id)
            .ok_or_else(|| ApiError::Internal("registered sale missing from read model".to_string()))?;
        tracing::info!(%sale_id, %seller, total = %record.total, commission = %record.commission, "sale registered");
        Ok(record)
    }

    /// Drop every read model and replay the whole event log into them.
    pub async fn rebuild_read_models(&self) -> Result<usize, ApiError> {
        let _guard = self.lock_writes().await;
        let log = self
            .dispatcher
            .store()
            .read_all()
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        let events = log.len();
        self.dispatcher
            .bus()
            .rebuild(log.iter().map(RecordedEvent::to_envelope))
            .map_err(|e| ApiError::Internal(e.to_string()))?;
        Ok(events)
    }

    fn restore_stock(&self, lines: &[&SaleLine]) {
        for line in lines {
            if let Err(e) = self.adjust_stock(line.product_id, i64::from(line.quantity)) {
                tracing::error!(product_id = %line.product_id, error = %e, "failed to restore stock");
            }
        }
    }
}
