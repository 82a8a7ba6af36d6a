//! Line protocol spoken over stdin / stdout.
//!
//! Every line is one JSON object. Host-to-bridge lines carry a `method` and
//! optional `args`; lines with an `id` are requests and get exactly one
//! response with the same `id` (unless the result was discarded), lines
//! without one are notifications. Bridge-to-host lines are responses or
//! notifications shaped the same way.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use account_manager_core::MethodCall;

/// Host answer to a `launchPicker` notification
pub const PICKER_RESULT: &str = "pickerResult";
/// Host regained an interactive surface
pub const ATTACH: &str = "attach";
/// Host lost its interactive surface
pub const DETACH: &str = "detach";

/// Ask the host to show its account chooser
pub const LAUNCH_PICKER: &str = "launchPicker";
/// Ask the host to show a short failure message
pub const SHOW_TOAST: &str = "showToast";

/// Error string sent for unknown methods
pub const NOT_IMPLEMENTED: &str = "notImplemented";

/// One host-to-bridge line
#[derive(Debug, Clone, Deserialize)]
pub struct Inbound {
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub args: Value,
}

impl Inbound {
    pub fn parse(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }

    pub fn into_call(self) -> MethodCall {
        MethodCall::new(self.method, self.args)
    }
}

/// One bridge-to-host line
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Outbound {
    Result { id: Value, result: Value },
    Error { id: Value, error: String },
    Notification(MethodCall),
}

impl Outbound {
    pub fn notification(method: &str, args: Value) -> Self {
        Self::Notification(MethodCall::new(method, args))
    }

    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
