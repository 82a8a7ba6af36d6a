//! UI collaborator traits

use async_trait::async_trait;

use crate::error::CoreResult;
use crate::types::PickedAccount;

/// External account chooser
///
/// Implementations drive whatever UI the host has and resolve once the user
/// picks an account (`Some`) or dismisses the chooser (`None`).
#[async_trait]
pub trait AccountPicker: Send + Sync {
    async fn launch_picker(&self) -> CoreResult<Option<PickedAccount>>;
}

/// User-visible failure notifications (toasts, banners, ...)
pub trait UserNotifier: Send + Sync {
    fn notify_failure(&self, message: &str);
}

/// Notifier that only writes to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl UserNotifier for LogNotifier {
    fn notify_failure(&self, message: &str) {
        log::warn!("User notification: {message}");
    }
}
