//! Interactive collaborators backed by the host on the other end of stdio.

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot, Mutex};

use account_manager_core::error::{CoreError, CoreResult};
use account_manager_core::traits::{AccountPicker, UserNotifier};
use account_manager_core::types::PickedAccount;

use crate::protocol::{Outbound, LAUNCH_PICKER, SHOW_TOAST};

pub type OutboundSender = mpsc::UnboundedSender<Outbound>;

/// Picker that asks the host to show its chooser and waits for `pickerResult`.
pub struct HostPicker {
    outbound: OutboundSender,
    pending: Mutex<Option<oneshot::Sender<Option<PickedAccount>>>>,
}

impl HostPicker {
    pub fn new(outbound: OutboundSender) -> Self {
        Self {
            outbound,
            pending: Mutex::new(None),
        }
    }

    /// Deliver the host's answer. `args` is `{"NAME", "TYPE"}` or `null`.
    ///
    /// Returns `false` when no chooser was waiting.
    pub async fn resolve(&self, args: &Value) -> bool {
        let selection = if args.is_null() {
            None
        } else {
            match serde_json::from_value::<PickedAccount>(args.clone()) {
                Ok(picked) => Some(picked),
                Err(e) => {
                    log::warn!("Malformed picker result, treating as dismissal: {e}");
                    None
                }
            }
        };

        match self.pending.lock().await.take() {
            Some(waiter) => waiter.send(selection).is_ok(),
            None => {
                log::debug!("Picker result with no chooser waiting");
                false
            }
        }
    }
}

#[async_trait]
impl AccountPicker for HostPicker {
    async fn launch_picker(&self) -> CoreResult<Option<PickedAccount>> {
        let (tx, rx) = oneshot::channel();
        *self.pending.lock().await = Some(tx);

        self.outbound
            .send(Outbound::notification(LAUNCH_PICKER, Value::Null))
            .map_err(|_| CoreError::Cancelled)?;

        // Sender dropped: a newer launch took its place.
        rx.await.map_err(|_| CoreError::Cancelled)
    }
}

/// Notifier that forwards failures to the host as `showToast`.
pub struct HostNotifier {
    outbound: OutboundSender,
}

impl HostNotifier {
    pub fn new(outbound: OutboundSender) -> Self {
        Self { outbound }
    }
}

impl UserNotifier for HostNotifier {
    fn notify_failure(&self, message: &str) {
        if self
            .outbound
            .send(Outbound::notification(
                SHOW_TOAST,
                json!({ "message": message }),
            ))
            .is_err()
        {
            log::warn!("Host gone, dropping notification: {message}");
        }
    }
}
