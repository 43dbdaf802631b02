//! Server-side session registry and the per-conversation context store.

pub mod registry;
pub mod store;

pub use registry::{Session, SessionRegistry, SessionSummary};
pub use store::{ContextPersistence, ContextStore, FilePersistence, NoopPersistence};
