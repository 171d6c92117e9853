//! Sale registration cart.

use std::sync::Arc;

use tokio::sync::watch;

use storefront_products::ProductId;

use crate::api::StorefrontApi;
use crate::types::{Sale, SaleItem};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaleCartState {
    pub items: Vec<SaleItem>,
    /// Set while a sale is being registered; further submits are refused.
    pub submitting: bool,
    pub last_sale: Option<Sale>,
    pub error: Option<String>,
}

pub struct SaleCart {
    api: Arc<dyn StorefrontApi>,
    state: watch::Sender<SaleCartState>,
}

impl SaleCart {
    pub fn new(api: Arc<dyn StorefrontApi>) -> Self {
        let (state, _) = watch::channel(SaleCartState::default());
        Self { api, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<SaleCartState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SaleCartState {
        self.state.borrow().clone()
    }

    /// Add units of a product; repeated products accumulate on one line.
    pub fn add(&self, product_id: ProductId, quantity: u32) {
        if quantity == 0 {
            return;
        }
        self.state.send_modify(|s| {
            match s.items.iter_mut().find(|i| i.product_id == product_id) {
                Some(item) => item.quantity = item.quantity.saturating_add(quantity),
                None => s.items.push(SaleItem { product_id, quantity }),
            }
        });
    }

    pub fn remove(&self, product_id: ProductId) {
        self.state.send_modify(|s| s.items.retain(|i| i.product_id != product_id));
    }

    /// Register the cart as a sale. Returns `None` if the cart is empty, a
    /// submission is already running, or the server refused the sale.
    pub async fn submit(&self) -> Option<Sale> {
        let mut items = Vec::new();
        let started = self.state.send_if_modified(|s| {
            if s.submitting || s.items.is_empty() {
                return false;
            }
            s.submitting = true;
            s.error = None;
            items = s.items.clone();
            true
        });
        if !started {
            return None;
        }

        let result = self.api.register_sale(items).await;
        let mut registered = None;
        self.state.send_modify(|s| {
            s.submitting = false;
            match result {
                Ok(sale) => {
                    s.items.clear();
                    s.last_sale = Some(sale.clone());
                    registered = Some(sale);
                }
                Err(e) => s.error = Some(e.to_string()),
            }
        });
        registered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockStorefrontApi;
    use crate::error::ClientError;
    use crate::views::fixtures::{product, sale};
    use storefront_core::UserId;

    #[tokio::test]
    async fn repeated_products_share_a_line() {
        let api = MockStorefrontApi::new();
        let cart = SaleCart::new(Arc::new(api));
        let lamp = product("Lamp", 4_000, 5);

        cart.add(lamp.id, 1);
        cart.add(lamp.id, 2);
        cart.add(lamp.id, 0);

        assert_eq!(cart.snapshot().items, vec![SaleItem { product_id: lamp.id, quantity: 3 }]);
        cart.remove(lamp.id);
        assert!(cart.snapshot().items.is_empty());
    }

    #[tokio::test]
    async fn submit_clears_cart_on_success() {
        let lamp = product("Lamp", 4_000, 5);
        let registered = sale(UserId::new(), vec![(lamp.id, 2, 4_000)]);
        let returned = registered.clone();

        let mut api = MockStorefrontApi::new();
        api.expect_register_sale()
            .withf(move |items| items.len() == 1 && items[0].quantity == 2)
            .times(1)
            .returning(move |_| Ok(returned.clone()));

        let cart = SaleCart::new(Arc::new(api));
        cart.add(lamp.id, 2);

        assert_eq!(cart.submit().await, Some(registered.clone()));
        let state = cart.snapshot();
        assert!(state.items.is_empty());
        assert!(!state.submitting);
        assert_eq!(state.last_sale, Some(registered));
    }

    #[tokio::test]
    async fn busy_cart_refuses_second_submit() {
        let mut api = MockStorefrontApi::new();
        api.expect_register_sale().times(0);

        let cart = SaleCart::new(Arc::new(api));
        cart.add(product("Lamp", 4_000, 5).id, 1);
        cart.state.send_modify(|s| s.submitting = true);

        assert_eq!(cart.submit().await, None);
        assert_eq!(cart.snapshot().items.len(), 1);
    }

    #[tokio::test]
    async fn refused_sale_keeps_items_and_reports() {
        let mut api = MockStorefrontApi::new();
        api.expect_register_sale().returning(|_| {
            Err(ClientError::Api {
                status: 409,
                code: "conflict".to_string(),
                message: "insufficient stock for Lamp: 1 available, 2 requested".to_string(),
            })
        });

        let cart = SaleCart::new(Arc::new(api));
        cart.add(product("Lamp", 4_000, 1).id, 2);

        assert_eq!(cart.submit().await, None);
        let state = cart.snapshot();
        assert_eq!(state.items.len(), 1);
        assert!(state.error.unwrap().starts_with("insufficient stock"));
    }
}
