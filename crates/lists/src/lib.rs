//! Custom product lists (event-sourced).
//!
//! A custom list is a named, optionally shared subset of the catalog curated by
//! an administrator.

pub mod list;

pub use list::{
    AddProduct, CreateList, CustomList, DeleteList, ListCommand, ListCreated, ListDeleted,
    ListEvent, ListId, ListShared, ListUnshared, ListUpdated, ProductAdded, ProductRemoved,
    RemoveProduct, ShareWith, Unshare, UpdateList, is_visible_to,
};
