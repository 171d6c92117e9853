use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use storefront_core::{Aggregate, AggregateId, AggregateRoot, DomainError, Money, UserId};
use storefront_events::Event;
use storefront_products::ProductId;

use crate::commission::CommissionPolicy;

/// Sale identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SaleId(pub AggregateId);

impl SaleId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for SaleId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Sale line: product, quantity, unit price at the time of sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleLine {
    pub product_id: ProductId,
    pub quantity: u32,
    pub unit_price: Money,
}

impl SaleLine {
    pub fn amount(&self) -> Result<Money, DomainError> {
        self.unit_price.checked_mul(u64::from(self.quantity))
    }
}

/// Aggregate root: Sale.
///
/// A sale is registered once with all of its lines and never edited; it can
/// only be deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sale {
    id: SaleId,
    seller: Option<UserId>,
    lines: Vec<SaleLine>,
    total: Money,
    commission: Money,
    created_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
    deleted: bool,
}

impl Sale {
    /// Create an empty, not-yet-registered aggregate instance for rehydration.
    pub fn empty(id: SaleId) -> Self {
        Self {
            id,
            seller: None,
            lines: Vec::new(),
            total: Money::ZERO,
            commission: Money::ZERO,
            created_at: None,
            version: 0,
            created: false,
            deleted: false,
        }
    }

    pub fn id_typed(&self) -> SaleId {
        self.id
    }

    pub fn seller(&self) -> Option<UserId> {
        self.seller
    }

    pub fn lines(&self) -> &[SaleLine] {
        &self.lines
    }

    pub fn total(&self) -> Money {
        self.total
    }

    pub fn commission(&self) -> Money {
        self.commission
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }
}

impl AggregateRoot for Sale {
    type Id = SaleId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: RegisterSale.
///
/// Lines carry catalog prices resolved by the caller; repeated products are
/// merged into one line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterSale {
    pub sale_id: SaleId,
    pub seller: UserId,
    pub lines: Vec<SaleLine>,
    pub policy: CommissionPolicy,
    pub occurred_at: DateTime<Utc>,
}

/// Command: DeleteSale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteSale {
    pub sale_id: SaleId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleCommand {
    Register(RegisterSale),
    Delete(DeleteSale),
}

/// Event: SaleRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRegistered {
    pub sale_id: SaleId,
    pub seller: UserId,
    pub lines: Vec<SaleLine>,
    pub total: Money,
    pub commission: Money,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SaleDeleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleDeleted {
    pub sale_id: SaleId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleEvent {
    Registered(SaleRegistered),
    Deleted(SaleDeleted),
}

impl Event for SaleEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SaleEvent::Registered(_) => "sales.sale.registered",
            SaleEvent::Deleted(_) => "sales.sale.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SaleEvent::Registered(e) => e.occurred_at,
            SaleEvent::Deleted(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Sale {
    type Command = SaleCommand;
    type Event = SaleEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SaleEvent::Registered(e) => {
                self.id = e.sale_id;
                self.seller = Some(e.seller);
                self.lines = e.lines.clone();
                self.total = e.total;
                self.commission = e.commission;
                self.created_at = Some(e.occurred_at);
                self.created = true;
            }
            SaleEvent::Deleted(_) => {
                self.deleted = true;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            SaleCommand::Register(cmd) => self.handle_register(cmd),
            SaleCommand::Delete(cmd) => self.handle_delete(cmd),
        }
    }
}

/// Merge repeated products, keeping first-seen order.
fn merge_lines(lines: &[SaleLine]) -> Result<Vec<SaleLine>, DomainError> {
    let mut merged: Vec<SaleLine> = Vec::with_capacity(lines.len());
    for line in lines {
        if line.quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        if line.unit_price == Money::ZERO {
            return Err(DomainError::validation("unit_price must be positive"));
        }
        match merged.iter_mut().find(|l| l.product_id == line.product_id) {
            Some(existing) => {
                if existing.unit_price != line.unit_price {
                    return Err(DomainError::invariant(format!(
                        "conflicting unit prices for product {}",
                        line.product_id
                    )));
                }
                existing.quantity = existing
                    .quantity
                    .checked_add(line.quantity)
                    .ok_or_else(|| DomainError::validation("quantity overflow"))?;
            }
            None => merged.push(line.clone()),
        }
    }
    Ok(merged)
}

impl Sale {
    fn ensure_sale_id(&self, sale_id: SaleId) -> Result<(), DomainError> {
        if self.id != sale_id {
            return Err(DomainError::invariant("sale_id mismatch"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterSale) -> Result<Vec<SaleEvent>, DomainError> {
        self.ensure_sale_id(cmd.sale_id)?;
        if self.created {
            return Err(DomainError::conflict("sale already exists"));
        }
        if cmd.lines.is_empty() {
            return Err(DomainError::validation("a sale needs at least one item"));
        }

        let lines = merge_lines(&cmd.lines)?;
        let total = lines
            .iter()
            .try_fold(Money::ZERO, |acc, line| acc.checked_add(line.amount()?))?;
        let commission = cmd.policy.commission_on(total);

        Ok(vec![SaleEvent::Registered(SaleRegistered {
            sale_id: cmd.sale_id,
            seller: cmd.seller,
            lines,
            total,
            commission,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_delete(&self, cmd: &DeleteSale) -> Result<Vec<SaleEvent>, DomainError> {
        if !self.created || self.deleted {
            return Err(DomainError::not_found("sale"));
        }
        self.ensure_sale_id(cmd.sale_id)?;

        Ok(vec![SaleEvent::Deleted(SaleDeleted {
            sale_id: cmd.sale_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(product_id: ProductId, quantity: u32, unit_price: u64) -> SaleLine {
        SaleLine {
            product_id,
            quantity,
            unit_price: Money::from_minor(unit_price),
        }
    }

    fn register(sale_id: SaleId, lines: Vec<SaleLine>) -> SaleCommand {
        SaleCommand::Register(RegisterSale {
            sale_id,
            seller: UserId::new(),
            lines,
            policy: CommissionPolicy::default(),
            occurred_at: Utc::now(),
        })
    }

    fn registered(sale_id: SaleId, lines: Vec<SaleLine>) -> Sale {
        let mut sale = Sale::empty(sale_id);
        for event in sale.handle(&register(sale_id, lines)).unwrap() {
            sale.apply(&event);
        }
        sale
    }

    #[test]
    fn register_computes_total_and_commission() {
        let sale_id = SaleId::new(AggregateId::new());
        let a = ProductId::new(AggregateId::new());
        let b = ProductId::new(AggregateId::new());

        let sale = registered(sale_id, vec![line(a, 2, 1_000), line(b, 1, 550)]);

        assert_eq!(sale.total(), Money::from_minor(2_550));
        assert_eq!(sale.commission(), Money::from_minor(765));
        assert_eq!(sale.version(), 1);
        assert!(sale.seller().is_some());
    }

    #[test]
    fn duplicate_products_are_merged() {
        let sale_id = SaleId::new(AggregateId::new());
        let a = ProductId::new(AggregateId::new());

        let sale = registered(sale_id, vec![line(a, 2, 300), line(a, 3, 300)]);

        assert_eq!(sale.lines(), &[line(a, 5, 300)]);
        assert_eq!(sale.total(), Money::from_minor(1_500));
    }

    #[test]
    fn conflicting_prices_for_one_product_are_rejected() {
        let sale_id = SaleId::new(AggregateId::new());
        let a = ProductId::new(AggregateId::new());
        let sale = Sale::empty(sale_id);

        let err = sale
            .handle(&register(sale_id, vec![line(a, 1, 300), line(a, 1, 301)]))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
    }

    #[test]
    fn empty_or_zero_quantity_sales_are_rejected() {
        let sale_id = SaleId::new(AggregateId::new());
        let sale = Sale::empty(sale_id);

        assert!(matches!(
            sale.handle(&register(sale_id, vec![])),
            Err(DomainError::Validation(_))
        ));
        let a = ProductId::new(AggregateId::new());
        assert!(matches!(
            sale.handle(&register(sale_id, vec![line(a, 0, 100)])),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn a_sale_cannot_be_registered_twice() {
        let sale_id = SaleId::new(AggregateId::new());
        let a = ProductId::new(AggregateId::new());
        let sale = registered(sale_id, vec![line(a, 1, 100)]);

        let err = sale.handle(&register(sale_id, vec![line(a, 1, 100)])).unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[test]
    fn delete_marks_deleted_and_is_not_repeatable() {
        let sale_id = SaleId::new(AggregateId::new());
        let a = ProductId::new(AggregateId::new());
        let mut sale = registered(sale_id, vec![line(a, 1, 100)]);

        let cmd = SaleCommand::Delete(DeleteSale { sale_id, occurred_at: Utc::now() });
        for event in sale.handle(&cmd).unwrap() {
            sale.apply(&event);
        }
        assert!(sale.is_deleted());
        assert_eq!(sale.handle(&cmd), Err(DomainError::NotFound("sale")));
    }

    #[test]
    fn deleting_an_unknown_sale_is_not_found() {
        let sale_id = SaleId::new(AggregateId::new());
        let sale = Sale::empty(sale_id);
        let cmd = SaleCommand::Delete(DeleteSale { sale_id, occurred_at: Utc::now() });
        assert_eq!(sale.handle(&cmd), Err(DomainError::NotFound("sale")));
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: total is Σ quantity × unit_price and commission is derived from it.
            #[test]
            fn total_matches_lines(items in proptest::collection::vec((1u32..50, 1u64..100_000), 1..10)) {
                let sale_id = SaleId::new(AggregateId::new());
                let lines: Vec<SaleLine> = items
                    .iter()
                    .map(|(q, p)| line(ProductId::new(AggregateId::new()), *q, *p))
                    .collect();
                let expected: u64 = items.iter().map(|(q, p)| u64::from(*q) * p).sum();

                let sale = registered(sale_id, lines);

                prop_assert_eq!(sale.total(), Money::from_minor(expected));
                prop_assert_eq!(sale.commission(), CommissionPolicy::default().commission_on(sale.total()));
            }
        }
    }
}
