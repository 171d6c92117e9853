//! Domain events and the envelope they travel in once committed.

pub mod bus;
pub mod envelope;
pub mod event;

pub use bus::EventBus;
pub use envelope::EventEnvelope;
pub use event::Event;
