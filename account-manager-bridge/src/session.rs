//! One host connection: routes inbound lines to the dispatcher and forwards
//! picker events back to the host.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;

use account_manager_app::AppState;
use account_manager_core::{InteractiveContext, MethodCall, Reply};

use crate::host::{HostNotifier, HostPicker, OutboundSender};
use crate::protocol::{Inbound, Outbound, ATTACH, DETACH, NOT_IMPLEMENTED, PICKER_RESULT};

pub struct Session {
    state: AppState,
    picker: Arc<HostPicker>,
    notifier: Arc<HostNotifier>,
    outbound: OutboundSender,
}

impl Session {
    /// Attach the host and start forwarding picker events.
    pub async fn start(state: AppState, outbound: OutboundSender) -> Arc<Self> {
        let session = Arc::new(Self {
            picker: Arc::new(HostPicker::new(outbound.clone())),
            notifier: Arc::new(HostNotifier::new(outbound.clone())),
            state,
            outbound,
        });
        session.attach().await;
        session.spawn_picker_forwarder();
        session
    }

    async fn attach(&self) {
        self.state
            .attach(InteractiveContext::new(
                self.picker.clone(),
                self.notifier.clone(),
            ))
            .await;
    }

    /// Host went away; pending results are discarded.
    pub async fn detach(&self) {
        self.state.detach().await;
    }

    fn spawn_picker_forwarder(&self) {
        let mut events = self.state.store.subscribe_picker_events();
        let outbound = self.outbound.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(event) => {
                        log::info!("Picker session {} completed", event.session_id);
                        let call = MethodCall::account_picked(&event);
                        if outbound.send(Outbound::Notification(call)).is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        log::warn!("Dropped {skipped} picker events");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            log::debug!("Picker event forwarder stopped");
        });
    }

    /// Handle one inbound line.
    pub async fn handle_line(self: &Arc<Self>, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        let inbound = match Inbound::parse(line) {
            Ok(inbound) => inbound,
            Err(e) => {
                log::warn!("Ignoring malformed line: {e}");
                return;
            }
        };

        match (inbound.id.clone(), inbound.method.as_str()) {
            (None, PICKER_RESULT) => {
                self.picker.resolve(&inbound.args).await;
            }
            (None, ATTACH) => self.attach().await,
            (None, DETACH) => self.detach().await,
            (None, other) => log::warn!("Ignoring unknown notification {other}"),
            (Some(id), _) => {
                let session = Arc::clone(self);
                tokio::spawn(async move {
                    session.respond(id, inbound.into_call()).await;
                });
            }
        }
    }

    async fn respond(&self, id: Value, call: MethodCall) {
        let outbound = match self.state.dispatcher.dispatch(&call).await {
            Reply::Success(result) => Outbound::Result { id, result },
            Reply::NotImplemented => Outbound::Error {
                id,
                error: NOT_IMPLEMENTED.to_string(),
            },
            Reply::Discarded => {
                log::debug!("{} discarded, no reply sent", call.method);
                return;
            }
        };
        if self.outbound.send(outbound).is_err() {
            log::warn!("Host gone, dropping reply to {}", call.method);
        }
    }
}
