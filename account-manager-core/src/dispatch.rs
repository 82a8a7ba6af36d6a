//! Request dispatcher
//!
//! Routes a method name plus an argument map to the [`AccountStore`] and turns
//! every outcome into the value the host expects. Errors never cross this
//! boundary: each one is logged and recovered into the operation's failure
//! value (`false` / `null` / `[]`).

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CoreError, CoreResult};
use crate::services::AccountStore;
use crate::types::{AccountSnapshot, AddAccountRequest, PickerEvent};

pub const ADD_ACCOUNT: &str = "addAccount";
pub const GET_ACCOUNTS: &str = "getAccounts";
pub const PEEK_ACCOUNTS: &str = "peekAccounts";
pub const REMOVE_ACCOUNT: &str = "removeAccount";
pub const INVALIDATE_AUTH_TOKEN: &str = "invalidateAuthToken";
pub const SET_REFRESH_TOKEN: &str = "setRefreshToken";
pub const GET_AUTH_TOKEN: &str = "getAuthToken";
/// Host-bound notification carrying a picker result
pub const ON_ACCOUNT_PICKED: &str = "onAccountPicked";

/// A method-style request (or notification) on the channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub args: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, args: Value) -> Self {
        Self {
            method: method.into(),
            args,
        }
    }

    /// The `onAccountPicked` notification for a picker event.
    #[must_use]
    pub fn account_picked(event: &PickerEvent) -> Self {
        let args = event
            .selection
            .as_ref()
            .and_then(|picked| serde_json::to_value(picked).ok())
            .unwrap_or(Value::Null);
        Self::new(ON_ACCOUNT_PICKED, args)
    }
}

/// Outcome of one dispatched call
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Operation finished; the value is its (possibly degraded) result
    Success(Value),
    /// The method is unknown
    NotImplemented,
    /// The interactive context went away before completion; no reply is due
    Discarded,
}

// ===== Wire arguments =====

#[derive(Debug, Deserialize)]
struct AddAccountArgs {
    account_name: String,
    package_name: String,
    account_token: Option<String>,
    account_plan: Option<String>,
    /// Human readable type label
    account_type: Option<String>,
}

impl From<AddAccountArgs> for AddAccountRequest {
    fn from(args: AddAccountArgs) -> Self {
        Self {
            name: args.account_name,
            account_type: args.package_name,
            token: args.account_token,
            plan: args.account_plan,
            type_label: args.account_type,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AccountTypeArgs {
    package_name: String,
}

#[derive(Debug, Deserialize)]
struct SetRefreshTokenArgs {
    package_name: String,
    account_refresh_token: String,
}

/// Account record as the host sees it
#[derive(Debug, Serialize)]
struct WireAccount {
    account_name: String,
    package_name: String,
    account_token: Option<String>,
    account_plan: Option<String>,
    account_type: Option<String>,
}

impl From<AccountSnapshot> for WireAccount {
    fn from(account: AccountSnapshot) -> Self {
        Self {
            account_name: account.name,
            package_name: account.account_type,
            account_token: account.token,
            account_plan: account.plan,
            account_type: account.type_label,
        }
    }
}

fn parse_args<T: DeserializeOwned>(args: &Value) -> CoreResult<T> {
    serde_json::from_value(args.clone()).map_err(|e| CoreError::InvalidArgument(e.to_string()))
}

/// Maps method calls onto [`AccountStore`] operations
pub struct RequestDispatcher {
    store: Arc<AccountStore>,
}

impl RequestDispatcher {
    #[must_use]
    pub fn new(store: Arc<AccountStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<AccountStore> {
        &self.store
    }

    pub async fn dispatch(&self, call: &MethodCall) -> Reply {
        log::debug!("Dispatching {}", call.method);
        match call.method.as_str() {
            ADD_ACCOUNT => {
                let result = match parse_args::<AddAccountArgs>(&call.args) {
                    Ok(args) => self.store.add_account(args.into()).await,
                    Err(e) => Err(e),
                };
                recover(ADD_ACCOUNT, result, Value::Bool(false))
            }
            GET_ACCOUNTS => {
                let result = self.store.list_accounts().await.map(|accounts| {
                    accounts
                        .into_iter()
                        .map(WireAccount::from)
                        .collect::<Vec<_>>()
                });
                recover(GET_ACCOUNTS, result, Value::Array(Vec::new()))
            }
            PEEK_ACCOUNTS => Reply::Success(Value::Bool(self.store.request_account_picker().await)),
            REMOVE_ACCOUNT => {
                let result = match parse_args::<AccountTypeArgs>(&call.args) {
                    Ok(args) => self.store.remove_account(&args.package_name).await,
                    Err(e) => Err(e),
                };
                recover(REMOVE_ACCOUNT, result, Value::Bool(false))
            }
            INVALIDATE_AUTH_TOKEN => {
                let result = match parse_args::<AccountTypeArgs>(&call.args) {
                    Ok(args) => self.store.invalidate_auth_token(&args.package_name).await,
                    Err(e) => Err(e),
                };
                recover(INVALIDATE_AUTH_TOKEN, result, Value::Bool(false))
            }
            SET_REFRESH_TOKEN => {
                let result = match parse_args::<SetRefreshTokenArgs>(&call.args) {
                    Ok(args) => {
                        self.store
                            .set_auth_token(&args.package_name, &args.account_refresh_token)
                            .await
                    }
                    Err(e) => Err(e),
                };
                recover(SET_REFRESH_TOKEN, result, Value::Bool(false))
            }
            GET_AUTH_TOKEN => {
                let result = match parse_args::<AccountTypeArgs>(&call.args) {
                    Ok(args) => self.store.get_auth_token(&args.package_name).await,
                    Err(e) => Err(e),
                };
                recover(GET_AUTH_TOKEN, result, Value::Null)
            }
            other => {
                CoreError::UnknownMethod(other.to_string()).log("dispatch");
                Reply::NotImplemented
            }
        }
    }
}

fn recover<T: Serialize>(method: &str, result: CoreResult<T>, fallback: Value) -> Reply {
    match result {
        Ok(value) => match serde_json::to_value(value) {
            Ok(value) => Reply::Success(value),
            Err(e) => {
                CoreError::from(e).log(method);
                Reply::Success(fallback)
            }
        },
        Err(CoreError::Cancelled) => {
            log::debug!("{method}: context torn down, result discarded");
            Reply::Discarded
        }
        Err(e) => {
            e.log(method);
            Reply::Success(fallback)
        }
    }
}
