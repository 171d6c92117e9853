//! Infrastructure layer: event storage, command dispatch, read models,
//! projections, and uploaded image storage.

pub mod command_dispatcher;
pub mod event_store;
pub mod images;
pub mod projections;
pub mod read_model;
