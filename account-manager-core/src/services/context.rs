//! Interactive context binding
//!
//! Replaces the host's nullable "current activity" with explicit `bind` /
//! `unbind` calls. Every binding owns a cancellation token; unbinding cancels
//! it so work started under that binding can be discarded.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::traits::{AccountPicker, UserNotifier};

/// UI collaborators available while an interactive session is attached
#[derive(Clone)]
pub struct InteractiveContext {
    pub(crate) picker: Arc<dyn AccountPicker>,
    pub(crate) notifier: Arc<dyn UserNotifier>,
}

impl InteractiveContext {
    #[must_use]
    pub fn new(picker: Arc<dyn AccountPicker>, notifier: Arc<dyn UserNotifier>) -> Self {
        Self { picker, notifier }
    }
}

/// A context together with the token that dies with its binding
#[derive(Clone)]
pub(crate) struct BoundContext {
    pub(crate) context: InteractiveContext,
    pub(crate) cancel: CancellationToken,
}

impl BoundContext {
    pub(crate) fn new(context: InteractiveContext) -> Self {
        Self {
            context,
            cancel: CancellationToken::new(),
        }
    }
}
