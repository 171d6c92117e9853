use std::sync::Arc;

use tokio::sync::watch;

use storefront_products::{Category, ProductId};

use crate::api::StorefrontApi;
use crate::types::Product;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductListState {
    pub items: Vec<Product>,
    pub category: Option<Category>,
    pub loading: bool,
    /// Product currently being deleted; other deletes are refused meanwhile.
    pub deleting: Option<ProductId>,
    pub error: Option<String>,
}

pub struct ProductListView {
    api: Arc<dyn StorefrontApi>,
    state: watch::Sender<ProductListState>,
}

impl ProductListView {
    pub fn new(api: Arc<dyn StorefrontApi>) -> Self {
        let (state, _) = watch::channel(ProductListState::default());
        Self { api, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<ProductListState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ProductListState {
        self.state.borrow().clone()
    }

    /// Fetch products for the current category filter.
    pub async fn load(&self) {
        let category = self.state.borrow().category;
        self.state.send_modify(|s| {
            s.loading = true;
            s.error = None;
        });

        let result = self.api.list_products(category).await;
        self.state.send_modify(|s| {
            s.loading = false;
            match result {
                Ok(items) => s.items = items,
                Err(e) => s.error = Some(e.to_string()),
            }
        });
    }

    pub async fn set_category(&self, category: Option<Category>) {
        self.state.send_modify(|s| s.category = category);
        self.load().await;
    }

    /// Delete a product. Returns `false` when another delete is still running.
    pub async fn delete(&self, id: ProductId) -> bool {
        let started = self.state.send_if_modified(|s| {
            if s.deleting.is_some() {
                return false;
            }
            s.deleting = Some(id);
            s.error = None;
            true
        });
        if !started {
            return false;
        }

        let result = self.api.delete_product(id).await;
        self.state.send_modify(|s| {
            s.deleting = None;
            match result {
                Ok(()) => s.items.retain(|p| p.id != id),
                Err(e) => s.error = Some(e.to_string()),
            }
        });
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockStorefrontApi;
    use crate::error::ClientError;
    use crate::views::fixtures::product;

    #[tokio::test]
    async fn load_yields_every_returned_product() {
        let products = vec![product("Lamp", 4_000, 2), product("Mug", 800, 10), product("Rug", 9_900, 1)];
        let returned = products.clone();

        let mut api = MockStorefrontApi::new();
        api.expect_list_products()
            .times(1)
            .returning(move |_| Ok(returned.clone()));

        let view = ProductListView::new(Arc::new(api));
        view.load().await;

        let state = view.snapshot();
        assert_eq!(state.items.len(), 3);
        assert_eq!(state.items, products);
        assert!(!state.loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn category_filter_is_sent_to_the_api() {
        let mut api = MockStorefrontApi::new();
        api.expect_list_products()
            .withf(|category| *category == Some(Category::Food))
            .times(1)
            .returning(|_| Ok(vec![]));

        let view = ProductListView::new(Arc::new(api));
        view.set_category(Some(Category::Food)).await;
        assert_eq!(view.snapshot().category, Some(Category::Food));
    }

    #[tokio::test]
    async fn failed_load_keeps_items_and_shows_error() {
        let mut api = MockStorefrontApi::new();
        api.expect_list_products().returning(|_| Err(ClientError::Unauthorized));

        let view = ProductListView::new(Arc::new(api));
        view.load().await;

        let state = view.snapshot();
        assert!(state.items.is_empty());
        assert_eq!(state.error.as_deref(), Some("your session has expired, please log in again"));
    }

    #[tokio::test]
    async fn delete_removes_item_and_refuses_overlap() {
        let lamp = product("Lamp", 4_000, 2);
        let mug = product("Mug", 800, 10);
        let listed = vec![lamp.clone(), mug.clone()];

        let mut api = MockStorefrontApi::new();
        api.expect_list_products().returning(move |_| Ok(listed.clone()));
        api.expect_delete_product().times(1).returning(|_| Ok(()));

        let view = ProductListView::new(Arc::new(api));
        view.load().await;

        // Simulate a delete already in flight.
        view.state.send_modify(|s| s.deleting = Some(mug.id));
        assert!(!view.delete(lamp.id).await);
        view.state.send_modify(|s| s.deleting = None);

        assert!(view.delete(lamp.id).await);
        let state = view.snapshot();
        assert_eq!(state.items, vec![mug]);
        assert!(state.deleting.is_none());
    }
}
