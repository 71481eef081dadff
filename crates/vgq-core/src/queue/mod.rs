//! Job queue: durable store, coordinator state machine, broadcast events.

pub mod coordinator;
pub mod events;
pub mod store;
pub mod types;

pub use coordinator::{
    validate_link, Coordinator, CoordinatorConfig, CredentialCheck, Submission, SubmitError,
};
pub use events::QueueEvent;
pub use store::JobStore;
pub use types::*;
