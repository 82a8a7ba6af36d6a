//! Keyring-based account storage.
//!
//! Uses the system keychain (macOS Keychain, Windows Credential Manager,
//! Linux Secret Service) via the `keyring` crate. All accounts live in a
//! single entry as one JSON document.

use async_trait::async_trait;
use keyring::Entry;

use account_manager_core::error::{CoreError, CoreResult};

use super::document::{DocumentBackend, DocumentMedium};

const SERVICE_NAME: &str = "account-manager";
const ACCOUNTS_KEY: &str = "all-accounts";

/// Accounts persisted in the system keychain.
pub type KeyringBackend = DocumentBackend<KeyringEntry>;

/// The keychain entry holding the account document.
pub struct KeyringEntry {
    service: String,
}

impl KeyringEntry {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    /// Entry under a custom keychain service name.
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(service: &str) -> CoreResult<Entry> {
        Entry::new(service, ACCOUNTS_KEY).map_err(|e| CoreError::StorageError(e.to_string()))
    }

    fn read_sync(service: &str) -> CoreResult<Option<String>> {
        match Self::entry(service)?.get_password() {
            Ok(json) => Ok(Some(json)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(CoreError::StorageError(e.to_string())),
        }
    }

    fn write_sync(service: &str, json: &str) -> CoreResult<()> {
        Self::entry(service)?
            .set_password(json)
            .map_err(|e| CoreError::StorageError(e.to_string()))
    }
}

impl Default for KeyringEntry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentMedium for KeyringEntry {
    async fn read(&self) -> CoreResult<Option<String>> {
        let service = self.service.clone();
        tokio::task::spawn_blocking(move || {
            log::debug!("Loading accounts from Keychain");
            Self::read_sync(&service)
        })
        .await
        .map_err(|e| CoreError::StorageError(format!("Task join error: {e}")))?
    }

    async fn write(&self, json: &str) -> CoreResult<()> {
        let service = self.service.clone();
        let json = json.to_string();
        tokio::task::spawn_blocking(move || Self::write_sync(&service, &json))
            .await
            .map_err(|e| CoreError::StorageError(format!("Task join error: {e}")))?
    }
}

impl KeyringBackend {
    pub fn new() -> Self {
        Self::with_medium(KeyringEntry::new())
    }
}

impl Default for KeyringBackend {
    fn default() -> Self {
        Self::new()
    }
}
