//! Unified error type definition

use serde::Serialize;
use thiserror::Error;

/// Core layer error type
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", content = "details")]
pub enum CoreError {
    /// No interactive context is bound to the store
    #[error("No active interactive context")]
    NoActiveContext,

    /// No account of the requested type exists
    #[error("No account matches type: {0}")]
    NoMatchingAccount(String),

    /// An account with the same (name, type) already exists
    #[error("Account already exists: {name} ({account_type})")]
    DuplicateKey { name: String, account_type: String },

    /// A token round-trip exceeded its bound
    #[error("Backend timed out after {timeout_ms} ms for account: {account}")]
    BackendTimeout { account: String, timeout_ms: u64 },

    /// The persistence backend refused a write
    #[error("Backend rejected write: {0}")]
    BackendRejected(String),

    /// Storage layer error
    #[error("Storage error: {0}")]
    StorageError(String),

    /// serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Request arguments are missing or malformed
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Dispatcher received a method it does not know
    #[error("Unknown method: {0}")]
    UnknownMethod(String),

    /// The owning interactive context was torn down before completion
    #[error("Operation cancelled")]
    Cancelled,
}

impl CoreError {
    /// Whether it is expected behavior (user input, resource does not exist, etc.) is used for log classification.
    ///
    /// Level `warn` should be used when returning `true` and level `error` when returning `false`.
    /// **Please update this method simultaneously when new variants are added.**
    #[must_use]
    pub fn is_expected(&self) -> bool {
        match self {
            Self::NoActiveContext
            | Self::NoMatchingAccount(_)
            | Self::DuplicateKey { .. }
            | Self::InvalidArgument(_)
            | Self::UnknownMethod(_)
            | Self::Cancelled => true,
            Self::BackendTimeout { .. }
            | Self::BackendRejected(_)
            | Self::StorageError(_)
            | Self::SerializationError(_) => false,
        }
    }

    /// Log this error at the level implied by [`CoreError::is_expected`].
    pub fn log(&self, operation: &str) {
        if self.is_expected() {
            log::warn!("{operation}: {self}");
        } else {
            log::error!("{operation}: {self}");
        }
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError(err.to_string())
    }
}

/// Core layer Result type alias
pub type CoreResult<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_conditions_are_expected() {
        assert!(CoreError::NoActiveContext.is_expected());
        assert!(CoreError::NoMatchingAccount("svcA".to_string()).is_expected());
        assert!(CoreError::Cancelled.is_expected());
    }

    #[test]
    fn backend_faults_are_not_expected() {
        let timeout = CoreError::BackendTimeout {
            account: "alice".to_string(),
            timeout_ms: 5000,
        };
        assert!(!timeout.is_expected());
        assert!(!CoreError::BackendRejected("full".to_string()).is_expected());
    }

    #[test]
    fn serializes_with_code_tag() {
        let err = CoreError::DuplicateKey {
            name: "bob".to_string(),
            account_type: "svcA".to_string(),
        };
        let json = serde_json::to_value(&err).unwrap();
        assert_eq!(json["code"], "DuplicateKey");
        assert_eq!(json["details"]["name"], "bob");
    }
}
