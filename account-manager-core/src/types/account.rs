//! 账户相关类型定义

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// User-data key holding the account plan
pub const USER_DATA_PLAN: &str = "account_plan";
/// User-data key holding the human readable account type label
pub const USER_DATA_TYPE_LABEL: &str = "account_type_label";
/// User-data key mirroring the last token written through add/set
pub const USER_DATA_TOKEN_SAVED: &str = "token_saved";

/// Auxiliary per-account key/value metadata
pub type UserData = HashMap<String, String>;

/// Unique account identity: the `(name, type)` pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountKey {
    /// Account name
    pub name: String,
    /// Account type (the owning service / package)
    #[serde(rename = "type")]
    pub account_type: String,
}

impl AccountKey {
    pub fn new(name: impl Into<String>, account_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            account_type: account_type.into(),
        }
    }
}

impl fmt::Display for AccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.account_type)
    }
}

/// Immutable view of one stored account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    /// Account name
    pub name: String,
    /// Account type
    #[serde(rename = "type")]
    pub account_type: String,
    /// Stored token
    pub token: Option<String>,
    /// `account_plan` user-data
    pub plan: Option<String>,
    /// `account_type_label` user-data
    pub type_label: Option<String>,
}

/// What a persistence backend keeps per account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountRecord {
    /// Stored token
    pub token: Option<String>,
    /// User-data fields
    #[serde(default)]
    pub user_data: UserData,
}

impl AccountSnapshot {
    #[must_use]
    pub fn key(&self) -> AccountKey {
        AccountKey::new(self.name.clone(), self.account_type.clone())
    }
}

/// Create account request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddAccountRequest {
    /// Account name
    pub name: String,
    /// Account type
    #[serde(rename = "type")]
    pub account_type: String,
    /// Initial token (optional)
    pub token: Option<String>,
    /// Account plan (optional)
    pub plan: Option<String>,
    /// Account type label (optional)
    pub type_label: Option<String>,
}

impl AddAccountRequest {
    #[must_use]
    pub fn key(&self) -> AccountKey {
        AccountKey::new(self.name.clone(), self.account_type.clone())
    }

    /// Reject requests whose key parts are blank.
    pub fn validate(&self) -> CoreResult<()> {
        if self.name.trim().is_empty() {
            return Err(CoreError::InvalidArgument(
                "account name must not be empty".to_string(),
            ));
        }
        if self.account_type.trim().is_empty() {
            return Err(CoreError::InvalidArgument(
                "account type must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// User-data written alongside the token.
    ///
    /// `token_saved` always mirrors `token`; absent optional fields are left out.
    #[must_use]
    pub fn user_data(&self) -> UserData {
        let mut data = UserData::new();
        if let Some(plan) = &self.plan {
            data.insert(USER_DATA_PLAN.to_string(), plan.clone());
        }
        if let Some(label) = &self.type_label {
            data.insert(USER_DATA_TYPE_LABEL.to_string(), label.clone());
        }
        if let Some(token) = &self.token {
            data.insert(USER_DATA_TOKEN_SAVED.to_string(), token.clone());
        }
        data
    }
}
