//! Account store
//!
//! Owns the account collection behind a [`PersistenceBackend`] and manages
//! the token lifecycle. Soft conditions (no bound context, no account of the
//! requested type) degrade to `false` / `None` / empty here; hard failures
//! come back as [`CoreError`] so callers can tell a timeout from a refusal.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;

use crate::config::StoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::traits::PersistenceBackend;
use crate::types::{
    AccountKey, AccountSnapshot, AddAccountRequest, PickerEvent, USER_DATA_PLAN,
    USER_DATA_TOKEN_SAVED, USER_DATA_TYPE_LABEL,
};

use super::context::{BoundContext, InteractiveContext};
use super::key_lock::KeyLocks;
use super::picker::PickerCoordinator;

/// Multi-account credential store
pub struct AccountStore {
    backend: Arc<dyn PersistenceBackend>,
    config: StoreConfig,
    context: RwLock<Option<BoundContext>>,
    locks: KeyLocks,
    picker: PickerCoordinator,
}

impl AccountStore {
    /// Create a store over `backend`; it starts unbound.
    #[must_use]
    pub fn new(backend: Arc<dyn PersistenceBackend>, config: StoreConfig) -> Self {
        let picker = PickerCoordinator::new(config.picker_event_capacity);
        Self {
            backend,
            config,
            context: RwLock::new(None),
            locks: KeyLocks::default(),
            picker,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ===== Context lifecycle =====

    /// Attach an interactive context, replacing (and cancelling) the previous one.
    pub async fn bind(&self, context: InteractiveContext) {
        let previous = self
            .context
            .write()
            .await
            .replace(BoundContext::new(context));
        if let Some(previous) = previous {
            log::info!("Interactive context replaced");
            previous.cancel.cancel();
            self.picker.cancel().await;
        } else {
            log::info!("Interactive context bound");
        }
    }

    /// Detach the interactive context. Pending token operations and pickers
    /// started under it are discarded.
    pub async fn unbind(&self) {
        if let Some(previous) = self.context.write().await.take() {
            previous.cancel.cancel();
            self.picker.cancel().await;
            log::info!("Interactive context unbound");
        }
    }

    pub async fn is_bound(&self) -> bool {
        self.context.read().await.is_some()
    }

    async fn active_context(&self, operation: &str) -> Option<BoundContext> {
        let bound = self.context.read().await.clone();
        if bound.is_none() {
            CoreError::NoActiveContext.log(operation);
        }
        bound
    }

    // ===== CRUD operations =====

    /// Create an account keyed by `(name, type)`.
    ///
    /// An existing key is rejected with [`CoreError::DuplicateKey`]; a write the
    /// backend refuses is [`CoreError::BackendRejected`]. Both are also shown to
    /// the user through the context's notifier.
    pub async fn add_account(&self, request: AddAccountRequest) -> CoreResult<bool> {
        let Some(bound) = self.active_context("addAccount").await else {
            return Ok(false);
        };

        match self.insert_account(&request).await {
            Ok(()) => Ok(true),
            Err(e) => {
                bound.context.notifier.notify_failure(&e.to_string());
                Err(e)
            }
        }
    }

    async fn insert_account(&self, request: &AddAccountRequest) -> CoreResult<()> {
        request.validate()?;
        let key = request.key();

        let _guard = self.locks.lock(&key).await;
        if self.exists(&key).await? {
            return Err(CoreError::DuplicateKey {
                name: key.name,
                account_type: key.account_type,
            });
        }

        let accepted = self
            .backend
            .put(&key, request.token.as_deref(), &request.user_data())
            .await?;
        if !accepted {
            return Err(CoreError::BackendRejected(format!(
                "account {key} was not stored"
            )));
        }

        log::info!("Account added: {key}");
        Ok(())
    }

    /// List all accounts in the backend's enumeration order.
    ///
    /// Each account is read under its key lock; one removed concurrently is
    /// left out rather than reported with empty fields.
    pub async fn list_accounts(&self) -> CoreResult<Vec<AccountSnapshot>> {
        if self.active_context("getAccounts").await.is_none() {
            return Ok(Vec::new());
        }

        let keys = self.backend.list_all().await?;
        let mut accounts = Vec::with_capacity(keys.len());
        for key in keys {
            // Skip accounts removed between the listing and this read.
            let _guard = self.locks.lock(&key).await;
            if !self.exists(&key).await? {
                log::debug!("Account {key} vanished while listing");
                continue;
            }
            let token = self.backend.get_token(&key).await?;
            let plan = self.backend.get_user_data(&key, USER_DATA_PLAN).await?;
            let type_label = self
                .backend
                .get_user_data(&key, USER_DATA_TYPE_LABEL)
                .await?;
            accounts.push(AccountSnapshot {
                name: key.name,
                account_type: key.account_type,
                token,
                plan,
                type_label,
            });
        }
        Ok(accounts)
    }

    /// Remove every account of `account_type`.
    ///
    /// Each account's live token is invalidated upstream before the account is
    /// deleted; a failed refresh falls back to the locally stored token and
    /// does not stop the delete. Returns `true` iff at least one account
    /// matched and every matched account was deleted.
    pub async fn remove_account(&self, account_type: &str) -> CoreResult<bool> {
        let Some(bound) = self.active_context("removeAccount").await else {
            return Ok(false);
        };
        let keys = self.matching_accounts(account_type).await?;
        if keys.is_empty() {
            return Ok(false);
        }

        let timeout = self.config.remove_timeout();
        let results = join_all(
            keys.iter()
                .map(|key| self.remove_one(key, timeout, &bound.cancel)),
        )
        .await;
        Self::ensure_not_cancelled(&bound)?;

        let mut all_removed = true;
        for result in results {
            all_removed &= result?;
        }
        log::info!(
            "Removed {} account(s) of type {account_type}: {}",
            keys.len(),
            if all_removed { "all deleted" } else { "some remained" }
        );
        Ok(all_removed)
    }

    async fn remove_one(
        &self,
        key: &AccountKey,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> CoreResult<bool> {
        let refreshed = self.live_token_or_none(key, timeout, cancel).await?;

        let _guard = self.locks.lock(key).await;
        let stored = self.backend.get_token(key).await?;
        for token in distinct_tokens(refreshed, stored) {
            self.backend.invalidate(&key.account_type, &token).await?;
        }

        let removed = self.backend.delete(key).await?;
        if removed {
            log::info!("Account removed: {key}");
        } else {
            log::warn!("Backend did not delete account {key}");
        }
        Ok(removed)
    }

    // ===== Token operations =====

    /// Invalidate the tokens of every account of `account_type`.
    ///
    /// Returns `false` without any token round-trip when nothing matches.
    /// For each match the live token (and the stored one, if different) is
    /// invalidated upstream, then the stored token and `token_saved` are cleared.
    pub async fn invalidate_auth_token(&self, account_type: &str) -> CoreResult<bool> {
        let Some(bound) = self.active_context("invalidateAuthToken").await else {
            return Ok(false);
        };
        let keys = self.matching_accounts(account_type).await?;
        if keys.is_empty() {
            return Ok(false);
        }

        let timeout = self.config.token_timeout();
        let results = join_all(
            keys.iter()
                .map(|key| self.invalidate_one(key, timeout, &bound.cancel)),
        )
        .await;
        Self::ensure_not_cancelled(&bound)?;

        results.into_iter().collect::<CoreResult<Vec<()>>>()?;
        Ok(true)
    }

    async fn invalidate_one(
        &self,
        key: &AccountKey,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> CoreResult<()> {
        let refresh = self.fetch_token(key, timeout, cancel).await;
        let (refreshed, refresh_error) = match refresh {
            Ok(token) => (token, None),
            Err(CoreError::Cancelled) => return Err(CoreError::Cancelled),
            Err(e) => {
                log::warn!("Token refresh for {key} failed, using stored token: {e}");
                (None, Some(e))
            }
        };

        // From here on the upstream invalidation and the local clear belong together.
        let _guard = self.locks.lock(key).await;
        let stored = self.backend.get_token(key).await?;
        let tokens = distinct_tokens(refreshed, stored);
        if tokens.is_empty() {
            if let Some(e) = refresh_error {
                return Err(e);
            }
        }
        for token in &tokens {
            self.backend.invalidate(&key.account_type, token).await?;
        }

        self.backend.set_token(key, None).await?;
        self.backend
            .set_user_data(key, USER_DATA_TOKEN_SAVED, None)
            .await?;
        log::info!("Token invalidated for {key}");
        Ok(())
    }

    /// Replace the token of every account of `account_type` with `new_token`,
    /// keeping `token_saved` in step. Returns `false` when no account was
    /// updated.
    pub async fn set_auth_token(&self, account_type: &str, new_token: &str) -> CoreResult<bool> {
        if self.active_context("setRefreshToken").await.is_none() {
            return Ok(false);
        }
        let keys = self.matching_accounts(account_type).await?;
        if keys.is_empty() {
            return Ok(false);
        }

        let results = join_all(keys.iter().map(|key| self.set_one(key, new_token))).await;
        let mut any_updated = false;
        for result in results {
            any_updated |= result?;
        }
        Ok(any_updated)
    }

    async fn set_one(&self, key: &AccountKey, new_token: &str) -> CoreResult<bool> {
        let _guard = self.locks.lock(key).await;
        // The key may have been removed while we waited for the lock.
        if !self.exists(key).await? {
            log::warn!("Account {key} disappeared before its token could be set");
            return Ok(false);
        }
        self.backend.set_token(key, Some(new_token)).await?;
        self.backend
            .set_user_data(key, USER_DATA_TOKEN_SAVED, Some(new_token))
            .await?;
        log::info!("Token updated for {key}");
        Ok(true)
    }

    /// Current token for `account_type`.
    ///
    /// Every matching account is asked for its token (the backend may refresh
    /// it). The first non-empty token in enumeration order wins; differing
    /// tokens across accounts are logged as ambiguous. When no token is found
    /// and a round-trip failed, the first failure is returned.
    pub async fn get_auth_token(&self, account_type: &str) -> CoreResult<Option<String>> {
        let Some(bound) = self.active_context("getAuthToken").await else {
            return Ok(None);
        };
        let keys = self.matching_accounts(account_type).await?;
        if keys.is_empty() {
            return Ok(None);
        }

        let timeout = self.config.token_timeout();
        let results = join_all(
            keys.iter()
                .map(|key| self.fetch_token(key, timeout, &bound.cancel)),
        )
        .await;
        Self::ensure_not_cancelled(&bound)?;

        let mut chosen: Option<String> = None;
        let mut first_error: Option<CoreError> = None;
        for (key, result) in keys.iter().zip(results) {
            match result {
                Ok(Some(token)) => match &chosen {
                    None => chosen = Some(token),
                    Some(current) if *current != token => log::warn!(
                        "Accounts of type {account_type} hold different tokens; ignoring the one of {key}"
                    ),
                    Some(_) => {}
                },
                Ok(None) => {}
                Err(e) => {
                    log::warn!("Token fetch for {key} failed: {e}");
                    first_error.get_or_insert(e);
                }
            }
        }

        match (chosen, first_error) {
            (Some(token), _) => Ok(Some(token)),
            (None, Some(e)) => Err(e),
            (None, None) => Ok(None),
        }
    }

    // ===== Picker =====

    /// Start the external account picker.
    ///
    /// Returns `false` when no context is bound. Otherwise the selection (or
    /// `None` on dismissal) arrives later as a [`PickerEvent`].
    pub async fn request_account_picker(&self) -> bool {
        let Some(bound) = self.active_context("peekAccounts").await else {
            return false;
        };
        let session_id = self.picker.launch(&bound).await;
        log::info!("Picker session {session_id} started");
        true
    }

    /// Cancel the pending picker session; it will never emit.
    pub async fn cancel_account_picker(&self) -> bool {
        self.picker.cancel().await
    }

    pub async fn is_picker_pending(&self) -> bool {
        self.picker.is_pending().await
    }

    /// Subscribe to picker completions.
    pub fn subscribe_picker_events(&self) -> broadcast::Receiver<PickerEvent> {
        self.picker.subscribe()
    }

    // ===== Helpers =====

    async fn exists(&self, key: &AccountKey) -> CoreResult<bool> {
        Ok(self
            .backend
            .list_by_type(&key.account_type)
            .await?
            .contains(key))
    }

    async fn matching_accounts(&self, account_type: &str) -> CoreResult<Vec<AccountKey>> {
        let keys = self.backend.list_by_type(account_type).await?;
        if keys.is_empty() {
            log::debug!("{}", CoreError::NoMatchingAccount(account_type.to_string()));
        }
        Ok(keys)
    }

    /// One bounded, cancellable token round-trip. Empty tokens count as absent.
    async fn fetch_token(
        &self,
        key: &AccountKey,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> CoreResult<Option<String>> {
        let bounded = tokio::time::timeout(timeout, self.backend.refresh_token(key, timeout));
        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(CoreError::Cancelled),
            outcome = bounded => match outcome {
                Ok(result) => result.map(|token| token.filter(|t| !t.is_empty())),
                Err(_) => Err(CoreError::BackendTimeout {
                    account: key.to_string(),
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                }),
            },
        }
    }

    /// Like `fetch_token`, but a failed round-trip is logged and treated as "no live token".
    async fn live_token_or_none(
        &self,
        key: &AccountKey,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> CoreResult<Option<String>> {
        match self.fetch_token(key, timeout, cancel).await {
            Err(CoreError::Cancelled) => Err(CoreError::Cancelled),
            Err(e) => {
                log::warn!("Token refresh for {key} failed, using stored token: {e}");
                Ok(None)
            }
            ok => ok,
        }
    }

    fn ensure_not_cancelled(bound: &BoundContext) -> CoreResult<()> {
        if bound.cancel.is_cancelled() {
            Err(CoreError::Cancelled)
        } else {
            Ok(())
        }
    }
}

fn distinct_tokens(first: Option<String>, second: Option<String>) -> Vec<String> {
    let mut tokens: Vec<String> = first.into_iter().filter(|t| !t.is_empty()).collect();
    if let Some(token) = second.filter(|t| !t.is_empty()) {
        if !tokens.contains(&token) {
            tokens.push(token);
        }
    }
    tokens
}
