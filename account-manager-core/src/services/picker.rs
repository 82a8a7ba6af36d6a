//! Account picker coordination
//!
//! At most one picker session is live at a time. A session emits exactly one
//! [`PickerEvent`] unless it is cancelled, superseded, or its context is
//! unbound first, in which case it emits nothing.

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::types::PickerEvent;

use super::context::BoundContext;

struct PickerSession {
    id: Uuid,
    cancel: CancellationToken,
}

pub(crate) struct PickerCoordinator {
    events: broadcast::Sender<PickerEvent>,
    session: Arc<Mutex<Option<PickerSession>>>,
}

impl PickerCoordinator {
    pub(crate) fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            events,
            session: Arc::new(Mutex::new(None)),
        }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<PickerEvent> {
        self.events.subscribe()
    }

    /// Start a session under `bound`, superseding any pending one.
    pub(crate) async fn launch(&self, bound: &BoundContext) -> Uuid {
        let session_id = Uuid::new_v4();
        let cancel = bound.cancel.child_token();

        {
            let mut slot = self.session.lock().await;
            if let Some(previous) = slot.replace(PickerSession {
                id: session_id,
                cancel: cancel.clone(),
            }) {
                log::info!("Picker session {} superseded by {session_id}", previous.id);
                previous.cancel.cancel();
            }
        }

        let picker = Arc::clone(&bound.context.picker);
        let session = Arc::clone(&self.session);
        let events = self.events.clone();

        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                result = picker.launch_picker() => Some(result),
            };
            let Some(result) = outcome else {
                log::debug!("Picker session {session_id} cancelled before completion");
                let mut slot = session.lock().await;
                if slot.as_ref().is_some_and(|s| s.id == session_id) {
                    *slot = None;
                }
                return;
            };

            let selection = result.unwrap_or_else(|e| {
                e.log("Account picker");
                None
            });

            // Emit under the session lock so a concurrent cancel either wins
            // completely or observes the session already finished.
            let mut slot = session.lock().await;
            let is_current = slot
                .as_ref()
                .is_some_and(|s| s.id == session_id && !s.cancel.is_cancelled());
            if !is_current {
                log::debug!("Dropping stale result of picker session {session_id}");
                return;
            }
            *slot = None;

            if events
                .send(PickerEvent {
                    session_id,
                    selection,
                })
                .is_err()
            {
                log::debug!("Picker session {session_id} completed with no subscribers");
            }
        });

        session_id
    }

    /// Cancel the pending session, if any.
    pub(crate) async fn cancel(&self) -> bool {
        match self.session.lock().await.take() {
            Some(session) => {
                log::info!("Picker session {} cancelled", session.id);
                session.cancel.cancel();
                true
            }
            None => false,
        }
    }

    pub(crate) async fn is_pending(&self) -> bool {
        self.session.lock().await.is_some()
    }
}
