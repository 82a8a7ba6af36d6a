//! Platform-agnostic application bootstrap for Account Manager.
//!
//! Provides `AppState` (store + dispatcher container), `AppStateBuilder`
//! (backend injection) and config loading shared by every frontend.

pub mod adapters;

use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;

use account_manager_core::error::{CoreError, CoreResult};
use account_manager_core::traits::PersistenceBackend;
use account_manager_core::{AccountStore, InteractiveContext, RequestDispatcher, StoreConfig};

/// Platform-agnostic application state.
///
/// Every frontend constructs this once at startup via `AppStateBuilder`,
/// then binds its interactive context when a UI surface becomes available.
pub struct AppState {
    /// The account store
    pub store: Arc<AccountStore>,
    /// Method-call dispatcher over `store`
    pub dispatcher: Arc<RequestDispatcher>,
}

impl AppState {
    /// Attach the frontend's picker and notifier.
    pub async fn attach(&self, context: InteractiveContext) {
        self.store.bind(context).await;
        log::info!("Interactive context attached");
    }

    /// Detach the frontend. In-flight results are discarded.
    pub async fn detach(&self) {
        self.store.unbind().await;
        log::info!("Interactive context detached");
    }
}

/// Builder for constructing `AppState` with a platform-specific backend.
///
/// # Required
/// - `backend` — where accounts are persisted
///
/// # Optional
/// - `config` — defaults to `StoreConfig::default()`
pub struct AppStateBuilder {
    backend: Option<Arc<dyn PersistenceBackend>>,
    config: Option<StoreConfig>,
}

impl AppStateBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            backend: None,
            config: None,
        }
    }

    #[must_use]
    pub fn backend(mut self, backend: Arc<dyn PersistenceBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    #[must_use]
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Build the `AppState`.
    ///
    /// # Errors
    /// Returns `CoreError::InvalidArgument` if the backend is missing.
    pub fn build(self) -> CoreResult<AppState> {
        let backend = self
            .backend
            .ok_or_else(|| CoreError::InvalidArgument("backend is required".to_string()))?;
        let config = self.config.unwrap_or_default();
        log::debug!("Building app state with {config:?}");

        let store = Arc::new(AccountStore::new(backend, config));
        let dispatcher = Arc::new(RequestDispatcher::new(Arc::clone(&store)));

        Ok(AppState { store, dispatcher })
    }
}

impl Default for AppStateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Load a `StoreConfig` from a JSON file.
///
/// A missing file yields the defaults; fields absent from the file keep
/// their default values.
///
/// # Errors
/// Returns `CoreError::StorageError` if the file cannot be read and
/// `CoreError::SerializationError` if it is not valid config JSON.
pub async fn load_config(path: &Path) -> CoreResult<StoreConfig> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            log::info!("No config at {}, using defaults", path.display());
            return Ok(StoreConfig::default());
        }
        Err(e) => {
            return Err(CoreError::StorageError(format!(
                "failed to read {}: {e}",
                path.display()
            )))
        }
    };
    let config: StoreConfig = serde_json::from_str(&raw)?;
    log::info!("Loaded config from {}", path.display());
    Ok(config)
}
