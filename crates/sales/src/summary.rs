//! Sales aggregation by seller.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{Money, UserId};

use crate::sale::{SaleId, SaleLine};

/// A registered sale as read back from the sales read model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRecord {
    pub id: SaleId,
    pub user_id: UserId,
    pub lines: Vec<SaleLine>,
    pub total: Money,
    pub commission: Money,
    pub created_at: DateTime<Utc>,
}

impl SaleRecord {
    pub fn units(&self) -> u64 {
        self.lines.iter().map(|l| u64::from(l.quantity)).sum()
    }
}

/// One seller's row in a [`SalesSummary`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSalesSummary {
    pub user_id: UserId,
    pub sale_count: u64,
    pub units: u64,
    pub total: Money,
    pub commission: Money,
}

impl UserSalesSummary {
    fn empty(user_id: UserId) -> Self {
        Self {
            user_id,
            sale_count: 0,
            units: 0,
            total: Money::ZERO,
            commission: Money::ZERO,
        }
    }
}

/// Totals across a set of sales plus a breakdown per seller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesSummary {
    pub sale_count: u64,
    pub units: u64,
    pub total: Money,
    pub commission: Money,
    /// Ordered by total descending, then user id.
    pub by_user: Vec<UserSalesSummary>,
}

impl SalesSummary {
    /// Aggregate sale records.
    ///
    /// Each sale id counts once. Amounts come from the sale's own `total` and
    /// `commission`; lines only contribute unit counts.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a SaleRecord>,
    {
        let mut seen: HashSet<SaleId> = HashSet::new();
        let mut per_user: BTreeMap<UserId, UserSalesSummary> = BTreeMap::new();

        for record in records {
            if !seen.insert(record.id) {
                continue;
            }
            let row = per_user
                .entry(record.user_id)
                .or_insert_with(|| UserSalesSummary::empty(record.user_id));
            row.sale_count += 1;
            row.units = row.units.saturating_add(record.units());
            row.total = [row.total, record.total].into_iter().sum();
            row.commission = [row.commission, record.commission].into_iter().sum();
        }

        let mut by_user: Vec<UserSalesSummary> = per_user.into_values().collect();
        by_user.sort_by(|a, b| b.total.cmp(&a.total).then(a.user_id.cmp(&b.user_id)));

        Self {
            sale_count: by_user.iter().map(|r| r.sale_count).sum(),
            units: by_user.iter().map(|r| r.units).fold(0, u64::saturating_add),
            total: by_user.iter().map(|r| r.total).sum(),
            commission: by_user.iter().map(|r| r.commission).sum(),
            by_user,
        }
    }

    pub fn for_user(&self, user_id: UserId) -> Option<&UserSalesSummary> {
        self.by_user.iter().find(|r| r.user_id == user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_core::AggregateId;
    use storefront_products::ProductId;

    fn record(user_id: UserId, lines: Vec<(ProductId, u32, u64)>, total: u64, commission: u64) -> SaleRecord {
        SaleRecord {
            id: SaleId::new(AggregateId::new()),
            user_id,
            lines: lines
                .into_iter()
                .map(|(product_id, quantity, price)| SaleLine {
                    product_id,
                    quantity,
                    unit_price: Money::from_minor(price),
                })
                .collect(),
            total: Money::from_minor(total),
            commission: Money::from_minor(commission),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn empty_input_gives_zero_summary() {
        let summary = SalesSummary::from_records(&Vec::<SaleRecord>::new());
        assert_eq!(summary, SalesSummary::default());
    }

    #[test]
    fn sums_total_and_commission_per_user() {
        let alice = UserId::new();
        let bob = UserId::new();
        let p = ProductId::new(AggregateId::new());
        let records = vec![
            record(alice, vec![(p, 1, 1_000)], 1_000, 300),
            record(bob, vec![(p, 5, 1_000)], 5_000, 1_500),
            record(alice, vec![(p, 2, 1_000)], 2_000, 600),
        ];

        let summary = SalesSummary::from_records(&records);

        assert_eq!(summary.sale_count, 3);
        assert_eq!(summary.units, 8);
        assert_eq!(summary.total, Money::from_minor(8_000));
        assert_eq!(summary.commission, Money::from_minor(2_400));

        assert_eq!(summary.by_user[0].user_id, bob);
        let a = summary.for_user(alice).unwrap();
        assert_eq!(a.sale_count, 2);
        assert_eq!(a.total, Money::from_minor(3_000));
        assert_eq!(a.commission, Money::from_minor(900));
    }

    #[test]
    fn amounts_come_from_the_sale_not_its_lines() {
        // Two lines for the same product in one sale must not double the total.
        let user = UserId::new();
        let p = ProductId::new(AggregateId::new());
        let records = vec![record(user, vec![(p, 1, 700), (p, 1, 700)], 1_400, 420)];

        let summary = SalesSummary::from_records(&records);
        assert_eq!(summary.total, Money::from_minor(1_400));
        assert_eq!(summary.commission, Money::from_minor(420));
        assert_eq!(summary.units, 2);
    }

    #[test]
    fn repeated_sale_ids_count_once() {
        let user = UserId::new();
        let p = ProductId::new(AggregateId::new());
        let r = record(user, vec![(p, 1, 500)], 500, 150);
        let records = vec![r.clone(), r];

        let summary = SalesSummary::from_records(&records);
        assert_eq!(summary.sale_count, 1);
        assert_eq!(summary.total, Money::from_minor(500));
    }

    #[test]
    fn record_json_shape() {
        let user = UserId::new();
        let p = ProductId::new(AggregateId::new());
        let r = record(user, vec![(p, 2, 250)], 500, 150);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["total"], 500);
        assert_eq!(json["commission"], 150);
        assert_eq!(json["user_id"], user.to_string());
        assert_eq!(json["lines"][0]["quantity"], 2);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: per-user rows add up to the grand totals.
            #[test]
            fn rows_add_up(amounts in proptest::collection::vec((0usize..3, 1u64..1_000_000), 0..30)) {
                let users = [UserId::new(), UserId::new(), UserId::new()];
                let p = ProductId::new(AggregateId::new());
                let records: Vec<SaleRecord> = amounts
                    .iter()
                    .map(|(u, total)| record(users[*u], vec![(p, 1, *total)], *total, total * 3 / 10))
                    .collect();

                let summary = SalesSummary::from_records(&records);

                let row_total: Money = summary.by_user.iter().map(|r| r.total).sum();
                let row_sales: u64 = summary.by_user.iter().map(|r| r.sale_count).sum();
                prop_assert_eq!(row_total, summary.total);
                prop_assert_eq!(row_sales, records.len() as u64);
                prop_assert!(summary.by_user.windows(2).all(|w| w[0].total >= w[1].total));
            }
        }
    }
}
