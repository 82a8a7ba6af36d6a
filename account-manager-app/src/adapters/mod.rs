//! Platform-agnostic persistence backends for the account store.

mod document;
mod json_file;

#[cfg(feature = "keyring-store")]
mod keyring_backend;

pub use document::{DocumentBackend, DocumentMedium};
pub use json_file::{JsonFile, JsonFileBackend};

#[cfg(feature = "keyring-store")]
pub use keyring_backend::{KeyringBackend, KeyringEntry};
