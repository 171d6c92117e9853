use std::sync::Arc;

use tokio::sync::watch;

use storefront_core::UserId;
use storefront_sales::SalesSummary;

use crate::api::StorefrontApi;
use crate::types::Sale;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SalesSummaryState {
    /// Seller the view is scoped to; `None` means every seller the caller may see.
    pub user: Option<UserId>,
    pub sales: Vec<Sale>,
    pub summary: SalesSummary,
    pub loading: bool,
    pub error: Option<String>,
}

/// Sales history plus totals and commission per seller.
///
/// Totals are aggregated from the fetched sales so the table and the
/// numbers above it always agree.
pub struct SalesSummaryView {
    api: Arc<dyn StorefrontApi>,
    state: watch::Sender<SalesSummaryState>,
}

impl SalesSummaryView {
    pub fn new(api: Arc<dyn StorefrontApi>) -> Self {
        let (state, _) = watch::channel(SalesSummaryState::default());
        Self { api, state }
    }

    pub fn subscribe(&self) -> watch::Receiver<SalesSummaryState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> SalesSummaryState {
        self.state.borrow().clone()
    }

    pub async fn load(&self, user: Option<UserId>) {
        self.state.send_modify(|s| {
            s.user = user;
            s.loading = true;
            s.error = None;
        });
        let result = self.api.list_sales(user).await;
        self.state.send_modify(|s| {
            // A newer load for another seller owns the state now.
            if s.user != user {
                return;
            }
            s.loading = false;
            match result {
                Ok(sales) => {
                    s.summary = SalesSummary::from_records(&sales);
                    s.sales = sales;
                }
                Err(e) => s.error = Some(e.to_string()),
            }
        });
    }

    /// Delete a sale (admin only server-side) and drop it from the totals.
    pub async fn delete(&self, sale: &Sale) -> bool {
        match self.api.delete_sale(sale.id).await {
            Ok(()) => {
                self.state.send_modify(|s| {
                    s.sales.retain(|x| x.id != sale.id);
                    s.summary = SalesSummary::from_records(&s.sales);
                });
                true
            }
            Err(e) => {
                self.state.send_modify(|s| s.error = Some(e.to_string()));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockStorefrontApi;
    use crate::error::ClientError;
    use crate::views::fixtures::{product, sale};
    use storefront_core::Money;

    #[tokio::test]
    async fn totals_count_each_sale_once() {
        let seller = UserId::new();
        let lamp = product("Lamp", 700, 10);
        // Same product twice in one sale, and the same sale returned twice.
        let doubled = sale(seller, vec![(lamp.id, 1, 700), (lamp.id, 1, 700)]);
        let other = sale(seller, vec![(lamp.id, 1, 1_000)]);
        let fetched = vec![doubled.clone(), other, doubled];

        let mut api = MockStorefrontApi::new();
        api.expect_list_sales()
            .withf(move |user| *user == Some(seller))
            .returning(move |_| Ok(fetched.clone()));

        let view = SalesSummaryView::new(Arc::new(api));
        view.load(Some(seller)).await;

        let state = view.snapshot();
        assert!(!state.loading);
        assert_eq!(state.summary.sale_count, 2);
        assert_eq!(state.summary.units, 3);
        assert_eq!(state.summary.total, Money::from_minor(2_400));
        assert_eq!(state.summary.commission, Money::from_minor(720));
        assert_eq!(state.summary.for_user(seller).map(|r| r.sale_count), Some(2));
    }

    #[tokio::test]
    async fn delete_recomputes_totals() {
        let seller = UserId::new();
        let lamp = product("Lamp", 1_000, 10);
        let first = sale(seller, vec![(lamp.id, 1, 1_000)]);
        let second = sale(seller, vec![(lamp.id, 2, 1_000)]);
        let fetched = vec![first.clone(), second];

        let mut api = MockStorefrontApi::new();
        api.expect_list_sales().returning(move |_| Ok(fetched.clone()));
        api.expect_delete_sale().times(1).returning(|_| Ok(()));

        let view = SalesSummaryView::new(Arc::new(api));
        view.load(None).await;
        assert_eq!(view.snapshot().summary.total, Money::from_minor(3_000));

        assert!(view.delete(&first).await);
        let state = view.snapshot();
        assert_eq!(state.sales.len(), 1);
        assert_eq!(state.summary.total, Money::from_minor(2_000));
        assert_eq!(state.summary.commission, Money::from_minor(600));
    }

    #[tokio::test]
    async fn forbidden_scope_reports_error() {
        let mut api = MockStorefrontApi::new();
        api.expect_list_sales().returning(|_| {
            Err(ClientError::Api {
                status: 403,
                code: "forbidden".to_string(),
                message: "sellers can only view their own sales".to_string(),
            })
        });

        let view = SalesSummaryView::new(Arc::new(api));
        view.load(Some(UserId::new())).await;

        let state = view.snapshot();
        assert!(state.sales.is_empty());
        assert_eq!(state.summary, SalesSummary::default());
        assert!(state.error.is_some());
    }
}
