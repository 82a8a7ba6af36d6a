//! Store configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default bound for token round-trips (get / invalidate)
pub const DEFAULT_TOKEN_TIMEOUT_MS: u64 = 5_000;
/// Default bound for the token round-trip that precedes account removal
pub const DEFAULT_REMOVE_TIMEOUT_MS: u64 = 2_000;

/// Tunables of the account store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StoreConfig {
    /// Bound (ms) for `refresh_token` in get / invalidate
    pub token_timeout_ms: u64,
    /// Bound (ms) for `refresh_token` before removal
    pub remove_timeout_ms: u64,
    /// Capacity of the picker event channel
    pub picker_event_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            token_timeout_ms: DEFAULT_TOKEN_TIMEOUT_MS,
            remove_timeout_ms: DEFAULT_REMOVE_TIMEOUT_MS,
            picker_event_capacity: 16,
        }
    }
}

impl StoreConfig {
    #[must_use]
    pub fn token_timeout(&self) -> Duration {
        Duration::from_millis(self.token_timeout_ms)
    }

    #[must_use]
    pub fn remove_timeout(&self) -> Duration {
        Duration::from_millis(self.remove_timeout_ms)
    }
}
