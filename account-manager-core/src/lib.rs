//! Account Manager Core Library
//!
//! Provides the account store behind the account manager bridge:
//! - Account CRUD keyed by `(name, type)`
//! - Token lifecycle (get / set / invalidate) with bounded, cancellable round-trips
//! - Account picker coordination
//! - A request dispatcher mapping method calls to store operations
//!
//! Storage and UI are abstracted through traits, so the same core runs over
//! the system keyring, a JSON file, or an in-memory fake in tests.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod services;
pub mod traits;
pub mod types;

#[cfg(test)]
mod test_utils;

// Re-export common types
pub use config::StoreConfig;
pub use dispatch::{MethodCall, Reply, RequestDispatcher};
pub use error::{CoreError, CoreResult};
pub use services::{AccountStore, InteractiveContext};
pub use traits::{AccountPicker, InMemoryBackend, PersistenceBackend, UserNotifier};
