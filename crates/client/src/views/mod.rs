//! Per-screen view models.
//!
//! Each view keeps its state in a `watch` channel: callers read a snapshot
//! or subscribe to changes, and async actions update it as they progress.
//! Concurrent actions on one view resolve as "last response wins", except
//! where a busy flag turns a second submission away.

use std::sync::atomic::{AtomicBool, Ordering};

pub mod custom_lists;
pub mod product_edit;
pub mod product_form;
pub mod product_list;
pub mod sale_cart;
pub mod sales_summary;

pub use custom_lists::{CustomListsState, CustomListsView};
pub use product_edit::ProductEditForm;
pub use product_form::{ProductForm, parse_price};
pub use product_list::{ProductListState, ProductListView};
pub use sale_cart::{SaleCart, SaleCartState};
pub use sales_summary::{SalesSummaryState, SalesSummaryView};

/// Single-flight flag for form submissions.
#[derive(Debug, Default)]
pub(crate) struct BusyFlag(AtomicBool);

impl BusyFlag {
    pub(crate) fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `None` while another submission holds the flag.
    pub(crate) fn try_acquire(&self) -> Option<BusyGuard<'_>> {
        (!self.0.swap(true, Ordering::SeqCst)).then_some(BusyGuard(&self.0))
    }
}

/// Clears the flag when dropped, so a cancelled or panicking submit does
/// not leave the form stuck.
pub(crate) struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
