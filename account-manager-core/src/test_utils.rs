//! 测试辅助模块
//!
//! Mock collaborators and factory helpers shared by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{RwLock, Semaphore};

use crate::config::StoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::services::{AccountStore, InteractiveContext};
use crate::traits::{AccountPicker, InMemoryBackend, PersistenceBackend, UserNotifier};
use crate::types::{AccountKey, AddAccountRequest, PickedAccount, UserData, USER_DATA_TOKEN_SAVED};

// ===== MockBackend =====

/// In-memory backend with call counting and per-account fault injection.
///
/// Faults are keyed by account name.
pub struct MockBackend {
    inner: InMemoryBackend,
    refresh_calls: AtomicUsize,
    invalidated: RwLock<Vec<(String, String)>>,
    reject_put: RwLock<bool>,
    hang_refresh: RwLock<HashSet<String>>,
    fail_refresh: RwLock<HashSet<String>>,
    rotated: RwLock<HashMap<String, String>>,
    refuse_delete: RwLock<HashSet<String>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            inner: InMemoryBackend::new(),
            refresh_calls: AtomicUsize::new(0),
            invalidated: RwLock::new(Vec::new()),
            reject_put: RwLock::new(false),
            hang_refresh: RwLock::new(HashSet::new()),
            fail_refresh: RwLock::new(HashSet::new()),
            rotated: RwLock::new(HashMap::new()),
            refuse_delete: RwLock::new(HashSet::new()),
        }
    }

    /// Store an account directly, bypassing the store.
    pub async fn seed(&self, key: &AccountKey, token: Option<&str>) {
        let mut user_data = UserData::new();
        if let Some(token) = token {
            user_data.insert(USER_DATA_TOKEN_SAVED.to_string(), token.to_string());
        }
        let _ = self.inner.put(key, token, &user_data).await;
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub async fn invalidated(&self) -> Vec<(String, String)> {
        self.invalidated.read().await.clone()
    }

    pub async fn set_reject_put(&self, reject: bool) {
        *self.reject_put.write().await = reject;
    }

    /// `refresh_token` for this account never completes.
    pub async fn hang_refresh_for(&self, name: &str) {
        self.hang_refresh.write().await.insert(name.to_string());
    }

    /// `refresh_token` for this account fails with a storage error.
    pub async fn fail_refresh_for(&self, name: &str) {
        self.fail_refresh.write().await.insert(name.to_string());
    }

    /// `refresh_token` for this account hands out `token` instead of the stored one.
    pub async fn rotate_on_refresh(&self, name: &str, token: &str) {
        self.rotated
            .write()
            .await
            .insert(name.to_string(), token.to_string());
    }

    /// `delete` for this account reports `false` and keeps it.
    pub async fn refuse_delete_for(&self, name: &str) {
        self.refuse_delete.write().await.insert(name.to_string());
    }
}

#[async_trait]
impl PersistenceBackend for MockBackend {
    async fn put(
        &self,
        key: &AccountKey,
        token: Option<&str>,
        user_data: &UserData,
    ) -> CoreResult<bool> {
        if *self.reject_put.read().await {
            return Ok(false);
        }
        self.inner.put(key, token, user_data).await
    }

    async fn get_token(&self, key: &AccountKey) -> CoreResult<Option<String>> {
        self.inner.get_token(key).await
    }

    async fn set_token(&self, key: &AccountKey, token: Option<&str>) -> CoreResult<()> {
        self.inner.set_token(key, token).await
    }

    async fn get_user_data(&self, key: &AccountKey, field: &str) -> CoreResult<Option<String>> {
        self.inner.get_user_data(key, field).await
    }

    async fn set_user_data(
        &self,
        key: &AccountKey,
        field: &str,
        value: Option<&str>,
    ) -> CoreResult<()> {
        self.inner.set_user_data(key, field, value).await
    }

    async fn delete(&self, key: &AccountKey) -> CoreResult<bool> {
        if self.refuse_delete.read().await.contains(&key.name) {
            return Ok(false);
        }
        self.inner.delete(key).await
    }

    async fn list_by_type(&self, account_type: &str) -> CoreResult<Vec<AccountKey>> {
        self.inner.list_by_type(account_type).await
    }

    async fn list_all(&self) -> CoreResult<Vec<AccountKey>> {
        self.inner.list_all().await
    }

    async fn invalidate(&self, account_type: &str, token: &str) -> CoreResult<()> {
        self.invalidated
            .write()
            .await
            .push((account_type.to_string(), token.to_string()));
        self.inner.invalidate(account_type, token).await
    }

    async fn refresh_token(
        &self,
        key: &AccountKey,
        timeout: Duration,
    ) -> CoreResult<Option<String>> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        if self.hang_refresh.read().await.contains(&key.name) {
            std::future::pending::<()>().await;
        }
        if self.fail_refresh.read().await.contains(&key.name) {
            return Err(CoreError::StorageError(format!("refresh failed for {key}")));
        }
        if let Some(token) = self.rotated.read().await.get(&key.name) {
            return Ok(Some(token.clone()));
        }
        self.inner.refresh_token(key, timeout).await
    }
}

// ===== MockPicker =====

/// Picker that blocks until `release` is called, then resolves with a fixed selection.
pub struct MockPicker {
    selection: Option<PickedAccount>,
    gate: Semaphore,
    launches: AtomicUsize,
}

impl MockPicker {
    pub fn selecting(selection: PickedAccount) -> Self {
        Self {
            selection: Some(selection),
            gate: Semaphore::new(0),
            launches: AtomicUsize::new(0),
        }
    }

    pub fn dismissing() -> Self {
        Self {
            selection: None,
            gate: Semaphore::new(0),
            launches: AtomicUsize::new(0),
        }
    }

    /// Let one pending (or the next) launch complete.
    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AccountPicker for MockPicker {
    async fn launch_picker(&self) -> CoreResult<Option<PickedAccount>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        self.gate
            .acquire()
            .await
            .map_err(|_| CoreError::Cancelled)?
            .forget();
        Ok(self.selection.clone())
    }
}

// ===== RecordingNotifier =====

pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
        }
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }
}

impl UserNotifier for RecordingNotifier {
    fn notify_failure(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}

// ===== 工厂方法 =====

/// Store over a fresh `MockBackend`, bound to a dismissing picker.
pub async fn bound_store() -> (AccountStore, Arc<MockBackend>, Arc<RecordingNotifier>) {
    let backend = Arc::new(MockBackend::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let store = AccountStore::new(backend.clone(), StoreConfig::default());
    store
        .bind(InteractiveContext::new(
            Arc::new(MockPicker::dismissing()),
            notifier.clone(),
        ))
        .await;
    (store, backend, notifier)
}

/// `AddAccountRequest` with a `free` plan.
pub fn test_request(name: &str, account_type: &str, token: &str) -> AddAccountRequest {
    AddAccountRequest {
        name: name.to_string(),
        account_type: account_type.to_string(),
        token: Some(token.to_string()),
        plan: Some("free".to_string()),
        type_label: None,
    }
}
