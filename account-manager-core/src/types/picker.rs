//! Account picker types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Account chosen in the picker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickedAccount {
    #[serde(rename = "NAME")]
    pub name: String,
    #[serde(rename = "TYPE")]
    pub account_type: String,
}

/// One-shot completion of a picker session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickerEvent {
    /// Session that produced the event
    pub session_id: Uuid,
    /// `None` when the user dismissed the picker
    pub selection: Option<PickedAccount>,
}
