// ── Session dispatcher ──
//
// The single owner of the property cache, the request tracker, and the
// socket writer. Listener events and control messages from the session
// façade are handled one at a time on this task, so no other task ever
// touches session state directly.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use pulse_api::protocol::{IMAGE_SOURCE_LIST, PROPERTY_GET, PROPERTY_SUBSCRIBE};
use pulse_api::transport::write_request;
use pulse_api::{Envelope, ListenerEvent, ListenerHandle};

use crate::command::{Reply, RequestTracker};
use crate::error::CoreError;
use crate::model::ConnectionState;
use crate::model::property::SOURCE_LIST;
use crate::store::{PowerTransition, PropertyCache};

/// An established, handshaken connection.
pub(crate) struct Link {
    pub writer: OwnedWriteHalf,
    pub listener: ListenerHandle,
}

/// Messages from the session façade to the dispatcher.
pub(crate) enum Control {
    /// Take ownership of a freshly handshaken connection.
    Attach { link: Link, tracker: RequestTracker },
    /// Allocate an id, track it, and write the request.
    Request {
        method: String,
        params: Value,
        /// Receives the result if the caller wants to await it.
        reply: Option<Reply>,
        /// Receives the id once written, or why it could not be.
        written: oneshot::Sender<Result<u64, CoreError>>,
    },
    /// Is the current link still usable? Tears a dead one down.
    CheckLink { reply: oneshot::Sender<bool> },
    /// Tear the link down.
    Detach {
        reason: &'static str,
        done: oneshot::Sender<()>,
    },
}

pub(crate) struct Dispatcher {
    cache: PropertyCache,
    tracker: RequestTracker,
    link: Option<Link>,
    state: Arc<watch::Sender<ConnectionState>>,
    control: mpsc::Receiver<Control>,
    cancel: CancellationToken,
    /// Upper bound on a single request write. A peer that stops reading
    /// must not park the dispatcher.
    write_timeout: Duration,
}

impl Dispatcher {
    pub(crate) fn new(
        cache: PropertyCache,
        state: Arc<watch::Sender<ConnectionState>>,
        control: mpsc::Receiver<Control>,
        cancel: CancellationToken,
        write_timeout: Duration,
    ) -> Self {
        Self {
            cache,
            tracker: RequestTracker::new(),
            link: None,
            state,
            control,
            cancel,
            write_timeout,
        }
    }

    pub(crate) async fn run(mut self) {
        loop {
            tokio::select! {
                biased;
                () = self.cancel.cancelled() => break,
                control = self.control.recv() => match control {
                    Some(control) => self.handle_control(control).await,
                    None => break,
                },
                event = next_event(&mut self.link) => self.handle_event(event),
            }
        }
        self.teardown("session shut down");
        debug!("dispatcher stopped");
    }

    // ── Control messages ─────────────────────────────────────────────

    async fn handle_control(&mut self, control: Control) {
        match control {
            Control::Attach { link, tracker } => {
                if self.link.is_some() {
                    self.teardown("replaced by a new connection");
                }
                self.tracker = tracker;
                self.link = Some(link);
            }
            Control::Request {
                method,
                params,
                reply,
                written,
            } => {
                let result = self.write(method, &params, reply).await;
                // Issuer gave up waiting.
                let _ = written.send(result);
            }
            Control::CheckLink { reply } => {
                let alive = self
                    .link
                    .as_ref()
                    .is_some_and(|link| !link.listener.is_finished());
                if !alive && self.link.is_some() {
                    self.teardown("listener stopped");
                }
                let _ = reply.send(alive);
            }
            Control::Detach { reason, done } => {
                self.teardown(reason);
                let _ = done.send(());
            }
        }
    }

    async fn write(
        &mut self,
        method: String,
        params: &Value,
        reply: Option<Reply>,
    ) -> Result<u64, CoreError> {
        let Some(link) = self.link.as_mut() else {
            return Err(CoreError::Disconnected);
        };

        let id = self.tracker.next_id();
        let sent = tokio::time::timeout(
            self.write_timeout,
            write_request(&mut link.writer, &method, params, id),
        )
        .await;
        match sent {
            Ok(Ok(())) => {
                debug!(id, method = %method, "request sent");
                match reply {
                    Some(reply) => self.tracker.track_with_reply(id, method, reply),
                    None => self.tracker.track(id, method),
                }
                Ok(id)
            }
            Ok(Err(e)) => {
                warn!(id, method = %method, error = %e, "request write failed");
                self.teardown("write failed");
                Err(e.into())
            }
            Err(_) => {
                warn!(id, method = %method, timeout = ?self.write_timeout, "request write stalled");
                self.teardown("write timed out");
                Err(CoreError::Timeout {
                    timeout_secs: self.write_timeout.as_secs(),
                })
            }
        }
    }

    // ── Listener events ──────────────────────────────────────────────

    fn handle_event(&mut self, event: Option<ListenerEvent>) {
        match event {
            Some(ListenerEvent::Message(envelope)) => self.handle_message(envelope),
            Some(ListenerEvent::Closed) | None => self.teardown("connection closed by projector"),
            Some(ListenerEvent::Failed(e)) => {
                warn!(error = %e, "read failed");
                self.teardown("read failed");
            }
        }
    }

    fn handle_message(&mut self, envelope: Envelope) {
        if let Some(id) = envelope.id {
            self.handle_response(id, envelope);
        } else if envelope.is_property_changed() {
            let mut updates = Map::new();
            for properties in envelope.changed_properties() {
                updates.extend(properties.clone());
            }
            if !updates.is_empty() {
                self.apply(&updates);
            }
        } else {
            trace!(method = ?envelope.method, "ignoring unsolicited message");
        }
    }

    fn handle_response(&mut self, id: u64, envelope: Envelope) {
        let Some(request) = self.tracker.resolve(id) else {
            debug!(id, "response for unknown or discarded request");
            return;
        };

        if let Some(err) = envelope.rpc_error() {
            warn!(id, method = %request.method, code = err.code, message = %err.message, "request rejected");
            request.complete(Err(CoreError::Rejected {
                code: err.code,
                message: err.message,
            }));
            return;
        }
        if !envelope.is_result() {
            debug!(id, method = %request.method, "ignoring reply that is not a result");
            request.complete(Err(CoreError::Protocol {
                message: format!("reply to request {id} is not a JSON-RPC 2.0 result"),
            }));
            return;
        }

        let result = envelope.result.unwrap_or(Value::Null);
        match request.method.as_str() {
            PROPERTY_SUBSCRIBE => self.promote(),
            PROPERTY_GET => match result.as_object() {
                Some(updates) => self.apply(updates),
                None => debug!(id, "property.get result is not an object"),
            },
            IMAGE_SOURCE_LIST => self.cache.store_verbatim(SOURCE_LIST, result.clone()),
            _ => {}
        }
        request.complete(Ok(result));
    }

    // ── State transitions ────────────────────────────────────────────

    /// Subscription acknowledged: the handshake is complete.
    fn promote(&self) {
        let next = if self.cache.is_asleep() {
            ConnectionState::Sleeping
        } else {
            ConnectionState::Online
        };
        info!(state = %next, "projector session established");
        self.state.send_replace(next);
    }

    fn apply(&mut self, updates: &Map<String, Value>) {
        let outcome = self.cache.apply(updates);
        let current = *self.state.borrow();

        match (outcome.transition, current) {
            (Some(PowerTransition::Asleep), ConnectionState::Online) => {
                info!("projector entering eco standby");
                self.state.send_replace(ConnectionState::Sleeping);
            }
            (Some(PowerTransition::Awake), ConnectionState::Sleeping) => {
                info!("projector left eco standby");
                self.state.send_replace(ConnectionState::Online);
            }
            _ => {}
        }
    }

    /// Drop the link and, if anything was live, discard pending requests
    /// and publish the empty snapshot.
    fn teardown(&mut self, reason: &str) {
        if let Some(link) = self.link.take() {
            link.listener.shutdown();
        }

        let previous = self.state.send_replace(ConnectionState::Disconnected);
        let dropped = self.tracker.clear();
        if previous.is_connected() || !self.cache.is_empty() {
            self.cache.clear();
        }
        if previous != ConnectionState::Disconnected {
            info!(reason, dropped, "projector session disconnected");
        }
    }
}

/// Next listener event, or never when there is no link.
async fn next_event(link: &mut Option<Link>) -> Option<ListenerEvent> {
    match link {
        Some(link) => link.listener.recv().await,
        None => std::future::pending().await,
    }
}
