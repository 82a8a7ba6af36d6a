//! Single-document persistence backend.
//!
//! All accounts are kept in one JSON document, cached in memory after the
//! first read and written back in full on every change. The document lives
//! in a [`DocumentMedium`]: a file, the system keychain, ...

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::RwLock;

use account_manager_core::error::{CoreError, CoreResult};
use account_manager_core::traits::PersistenceBackend;
use account_manager_core::types::{AccountKey, AccountRecord, UserData};

const DOCUMENT_VERSION: u32 = 1;

/// Where the serialized document is kept.
#[async_trait]
pub trait DocumentMedium: Send + Sync {
    /// Raw document, `None` if nothing has been written yet.
    async fn read(&self) -> CoreResult<Option<String>>;

    async fn write(&self, json: &str) -> CoreResult<()>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredAccount {
    name: String,
    #[serde(rename = "type")]
    account_type: String,
    #[serde(flatten)]
    record: AccountRecord,
}

impl StoredAccount {
    fn matches(&self, key: &AccountKey) -> bool {
        self.name == key.name && self.account_type == key.account_type
    }

    fn key(&self) -> AccountKey {
        AccountKey::new(self.name.clone(), self.account_type.clone())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AccountDocument {
    version: u32,
    #[serde(default)]
    accounts: Vec<StoredAccount>,
}

impl Default for AccountDocument {
    fn default() -> Self {
        Self {
            version: DOCUMENT_VERSION,
            accounts: Vec::new(),
        }
    }
}

impl AccountDocument {
    fn parse(raw: Option<&str>) -> CoreResult<Self> {
        match raw.map(str::trim) {
            None | Some("") => Ok(Self::default()),
            Some(json) => {
                let document: Self = serde_json::from_str(json)?;
                if document.version > DOCUMENT_VERSION {
                    return Err(CoreError::StorageError(format!(
                        "unsupported account document version {}",
                        document.version
                    )));
                }
                Ok(document)
            }
        }
    }

    fn find_mut(&mut self, key: &AccountKey) -> Option<&mut AccountRecord> {
        self.accounts
            .iter_mut()
            .find(|a| a.matches(key))
            .map(|a| &mut a.record)
    }

    fn find(&self, key: &AccountKey) -> Option<&AccountRecord> {
        self.accounts
            .iter()
            .find(|a| a.matches(key))
            .map(|a| &a.record)
    }
}

/// Persistence backend over one JSON document.
pub struct DocumentBackend<M> {
    medium: M,
    cache: RwLock<Option<AccountDocument>>,
}

impl<M: DocumentMedium> DocumentBackend<M> {
    pub fn with_medium(medium: M) -> Self {
        Self {
            medium,
            cache: RwLock::new(None),
        }
    }

    async fn load(&self) -> CoreResult<AccountDocument> {
        let raw = self.medium.read().await?;
        let document = AccountDocument::parse(raw.as_deref())?;
        log::info!("Loaded {} accounts", document.accounts.len());
        Ok(document)
    }

    async fn read<T>(&self, f: impl FnOnce(&AccountDocument) -> T) -> CoreResult<T> {
        {
            let cache = self.cache.read().await;
            if let Some(ref document) = *cache {
                return Ok(f(document));
            }
        }

        let mut cache = self.cache.write().await;
        if cache.is_none() {
            *cache = Some(self.load().await?);
        }
        match *cache {
            Some(ref document) => Ok(f(document)),
            None => Err(CoreError::StorageError("account cache unavailable".to_string())),
        }
    }

    /// Apply `f` and persist the document when it reports a change.
    ///
    /// The cache is only replaced once the write succeeded.
    async fn mutate<T>(&self, f: impl FnOnce(&mut AccountDocument) -> (T, bool)) -> CoreResult<T> {
        let mut cache = self.cache.write().await;
        let mut document = match cache.as_ref() {
            Some(document) => document.clone(),
            None => self.load().await?,
        };

        let (value, changed) = f(&mut document);
        if changed {
            let json = serde_json::to_string_pretty(&document)?;
            self.medium.write(&json).await?;
            log::debug!("Persisted {} accounts", document.accounts.len());
        }
        *cache = Some(document);
        Ok(value)
    }
}

#[async_trait]
impl<M: DocumentMedium> PersistenceBackend for DocumentBackend<M> {
    async fn put(
        &self,
        key: &AccountKey,
        token: Option<&str>,
        user_data: &UserData,
    ) -> CoreResult<bool> {
        self.mutate(|document| {
            if document.find(key).is_some() {
                return (false, false);
            }
            document.accounts.push(StoredAccount {
                name: key.name.clone(),
                account_type: key.account_type.clone(),
                record: AccountRecord {
                    token: token.map(str::to_string),
                    user_data: user_data.clone(),
                },
            });
            (true, true)
        })
        .await
    }

    async fn get_token(&self, key: &AccountKey) -> CoreResult<Option<String>> {
        self.read(|document| document.find(key).and_then(|r| r.token.clone()))
            .await
    }

    async fn set_token(&self, key: &AccountKey, token: Option<&str>) -> CoreResult<()> {
        self.mutate(|document| match document.find_mut(key) {
            Some(record) => {
                record.token = token.map(str::to_string);
                ((), true)
            }
            None => ((), false),
        })
        .await
    }

    async fn get_user_data(&self, key: &AccountKey, field: &str) -> CoreResult<Option<String>> {
        self.read(|document| {
            document
                .find(key)
                .and_then(|r| r.user_data.get(field).cloned())
        })
        .await
    }

    async fn set_user_data(
        &self,
        key: &AccountKey,
        field: &str,
        value: Option<&str>,
    ) -> CoreResult<()> {
        self.mutate(|document| match document.find_mut(key) {
            Some(record) => {
                match value {
                    Some(v) => {
                        record.user_data.insert(field.to_string(), v.to_string());
                    }
                    None => {
                        record.user_data.remove(field);
                    }
                }
                ((), true)
            }
            None => ((), false),
        })
        .await
    }

    async fn delete(&self, key: &AccountKey) -> CoreResult<bool> {
        self.mutate(|document| {
            let before = document.accounts.len();
            document.accounts.retain(|a| !a.matches(key));
            let removed = document.accounts.len() != before;
            (removed, removed)
        })
        .await
    }

    async fn list_by_type(&self, account_type: &str) -> CoreResult<Vec<AccountKey>> {
        self.read(|document| {
            document
                .accounts
                .iter()
                .filter(|a| a.account_type == account_type)
                .map(StoredAccount::key)
                .collect()
        })
        .await
    }

    async fn list_all(&self) -> CoreResult<Vec<AccountKey>> {
        self.read(|document| document.accounts.iter().map(StoredAccount::key).collect())
            .await
    }

    async fn invalidate(&self, account_type: &str, token: &str) -> CoreResult<()> {
        self.mutate(|document| {
            let mut changed = false;
            for account in &mut document.accounts {
                if account.account_type == account_type
                    && account.record.token.as_deref() == Some(token)
                {
                    account.record.token = None;
                    changed = true;
                }
            }
            ((), changed)
        })
        .await
    }

    // No upstream issuer: the stored token is the current one.
    async fn refresh_token(
        &self,
        key: &AccountKey,
        _timeout: Duration,
    ) -> CoreResult<Option<String>> {
        self.get_token(key).await
    }
}
