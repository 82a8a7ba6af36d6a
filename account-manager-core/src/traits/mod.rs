//! Storage and UI collaborator abstractions

mod interaction;
mod persistence_backend;

pub use interaction::{AccountPicker, LogNotifier, UserNotifier};
pub use persistence_backend::{InMemoryBackend, PersistenceBackend};
