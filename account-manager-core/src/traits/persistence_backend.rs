//! Persistence backend abstract Trait

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::CoreResult;
use crate::types::{AccountKey, AccountRecord, UserData};

/// Durable per-account storage with token refresh/invalidation
///
/// Platform implementation:
/// - Desktop: `KeyringBackend` (keyring crate)
/// - Mobile / CLI: `JsonFileBackend` (JSON file in the app data directory)
/// - Tests and ephemeral sessions: `InMemoryBackend`
#[async_trait]
pub trait PersistenceBackend: Send + Sync {
    /// Add an account explicitly
    ///
    /// # Returns
    /// * `Ok(true)` - the account was written
    /// * `Ok(false)` - the backend refused the write (e.g. the key already exists)
    async fn put(
        &self,
        key: &AccountKey,
        token: Option<&str>,
        user_data: &UserData,
    ) -> CoreResult<bool>;

    /// Get the stored token of an account
    async fn get_token(&self, key: &AccountKey) -> CoreResult<Option<String>>;

    /// Replace (or clear, with `None`) the stored token of an account
    async fn set_token(&self, key: &AccountKey, token: Option<&str>) -> CoreResult<()>;

    /// Read one user-data field
    async fn get_user_data(&self, key: &AccountKey, field: &str) -> CoreResult<Option<String>>;

    /// Write one user-data field; `None` removes it
    async fn set_user_data(
        &self,
        key: &AccountKey,
        field: &str,
        value: Option<&str>,
    ) -> CoreResult<()>;

    /// Delete an account, returning whether it existed
    async fn delete(&self, key: &AccountKey) -> CoreResult<bool>;

    /// List accounts of one type, in enumeration order
    async fn list_by_type(&self, account_type: &str) -> CoreResult<Vec<AccountKey>>;

    /// List every account, in enumeration order
    async fn list_all(&self) -> CoreResult<Vec<AccountKey>>;

    /// Tell the backend a token must not be handed out again
    async fn invalidate(&self, account_type: &str, token: &str) -> CoreResult<()>;

    /// Obtain a current token, refreshing it if the backend supports that
    ///
    /// `timeout` is the bound the caller will wait; the store enforces it independently.
    async fn refresh_token(&self, key: &AccountKey, timeout: Duration)
        -> CoreResult<Option<String>>;
}

/// In-memory persistence backend
///
/// Keeps insertion order, so enumeration is deterministic. Refresh hands back
/// the stored token and invalidation clears matching tokens of the type.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    entries: Arc<RwLock<Vec<(AccountKey, AccountRecord)>>>,
}

impl InMemoryBackend {
    /// Create an empty backend
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clone of the stored record for `key`
    pub async fn record(&self, key: &AccountKey) -> Option<AccountRecord> {
        self.entries
            .read()
            .await
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, record)| record.clone())
    }
}

#[async_trait]
impl PersistenceBackend for InMemoryBackend {
    async fn put(
        &self,
        key: &AccountKey,
        token: Option<&str>,
        user_data: &UserData,
    ) -> CoreResult<bool> {
        let mut entries = self.entries.write().await;
        if entries.iter().any(|(k, _)| k == key) {
            return Ok(false);
        }
        entries.push((
            key.clone(),
            AccountRecord {
                token: token.map(str::to_string),
                user_data: user_data.clone(),
            },
        ));
        Ok(true)
    }

    async fn get_token(&self, key: &AccountKey) -> CoreResult<Option<String>> {
        Ok(self.record(key).await.and_then(|record| record.token))
    }

    async fn set_token(&self, key: &AccountKey, token: Option<&str>) -> CoreResult<()> {
        let mut entries = self.entries.write().await;
        if let Some((_, record)) = entries.iter_mut().find(|(k, _)| k == key) {
            record.token = token.map(str::to_string);
        }
        Ok(())
    }

    async fn get_user_data(&self, key: &AccountKey, field: &str) -> CoreResult<Option<String>> {
        Ok(self
            .record(key)
            .await
            .and_then(|record| record.user_data.get(field).cloned()))
    }

    async fn set_user_data(
        &self,
        key: &AccountKey,
        field: &str,
        value: Option<&str>,
    ) -> CoreResult<()> {
        let mut entries = self.entries.write().await;
        if let Some((_, record)) = entries.iter_mut().find(|(k, _)| k == key) {
            match value {
                Some(v) => {
                    record.user_data.insert(field.to_string(), v.to_string());
                }
                None => {
                    record.user_data.remove(field);
                }
            }
        }
        Ok(())
    }

    async fn delete(&self, key: &AccountKey) -> CoreResult<bool> {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|(k, _)| k != key);
        Ok(entries.len() != before)
    }

    async fn list_by_type(&self, account_type: &str) -> CoreResult<Vec<AccountKey>> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .filter(|(k, _)| k.account_type == account_type)
            .map(|(k, _)| k.clone())
            .collect())
    }

    async fn list_all(&self) -> CoreResult<Vec<AccountKey>> {
        Ok(self
            .entries
            .read()
            .await
            .iter()
            .map(|(k, _)| k.clone())
            .collect())
    }

    async fn invalidate(&self, account_type: &str, token: &str) -> CoreResult<()> {
        let mut entries = self.entries.write().await;
        for (key, record) in entries.iter_mut() {
            if key.account_type == account_type && record.token.as_deref() == Some(token) {
                record.token = None;
            }
        }
        Ok(())
    }

    async fn refresh_token(
        &self,
        key: &AccountKey,
        _timeout: Duration,
    ) -> CoreResult<Option<String>> {
        self.get_token(key).await
    }
}
