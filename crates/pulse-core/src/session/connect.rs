// ── Connection management ──
//
// Wake, handshake, and the request path from the façade into the
// dispatcher. Everything that opens a socket runs under `connect_lock`,
// so racing callers never open two connections.

use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use pulse_api::protocol::{
    IMAGE_SOURCE_LIST, PROPERTY_GET, PROPERTY_SUBSCRIBE, SYSTEM_POWERON, requires_wake,
};
use pulse_api::transport::{read_response, write_request};
use pulse_api::{ListenerHandle, wol};

use super::SessionInner;
use super::dispatch::{Control, Link};
use crate::command::{Command, Reply, RequestTracker};
use crate::config::SessionConfig;
use crate::error::CoreError;
use crate::model::property::{IDENTITY, SUBSCRIBED};
use crate::model::{ConnectionState, DeviceIdentity};

/// Id of the identity probe, always the first request on a connection.
const PROBE_ID: u64 = 1;

impl SessionInner {
    // ── Dispatcher plumbing ──────────────────────────────────────────

    async fn send(&self, control: Control) -> Result<(), CoreError> {
        self.control
            .send(control)
            .await
            .map_err(|_| CoreError::Internal("session dispatcher has stopped".into()))
    }

    /// Write one request on the live link. Returns its id.
    pub(super) async fn submit(
        &self,
        method: &str,
        params: Value,
        reply: Option<Reply>,
    ) -> Result<u64, CoreError> {
        let (written, id) = oneshot::channel();
        self.send(Control::Request {
            method: method.to_owned(),
            params,
            reply,
            written,
        })
        .await?;
        id.await.map_err(|_| CoreError::Disconnected)?
    }

    async fn link_alive(&self) -> bool {
        let (reply, alive) = oneshot::channel();
        if self.send(Control::CheckLink { reply }).await.is_err() {
            return false;
        }
        alive.await.unwrap_or(false)
    }

    pub(super) async fn detach(&self, reason: &'static str) {
        let (done, finished) = oneshot::channel();
        if self.send(Control::Detach { reason, done }).await.is_ok() {
            let _ = finished.await;
        }
    }

    // ── Connect ──────────────────────────────────────────────────────

    /// Make sure a handshaken link exists, opening one if needed.
    pub(super) async fn ensure_connected(&self) -> Result<(), CoreError> {
        let _guard = self.connect_lock.lock().await;

        if self.state().is_connected() && self.link_alive().await {
            return Ok(());
        }
        self.handshake().await
    }

    async fn handshake(&self) -> Result<(), CoreError> {
        self.state.send_replace(ConnectionState::Connecting);
        info!(host = %self.config.host, port = self.config.port, "connecting to projector");

        match self.establish().await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(error = %e, "connect sequence failed");
                self.detach("handshake failed").await;
                Err(e)
            }
        }
    }

    async fn establish(&self) -> Result<(), CoreError> {
        let (stream, identity) = probe(&self.config).await?;
        info!(%identity, "projector identified");
        self.identity.store(Some(Arc::new(identity)));

        let (reader, writer) = stream.into_split();
        let listener = ListenerHandle::spawn(reader, self.cancel.child_token());
        self.send(Control::Attach {
            link: Link { writer, listener },
            tracker: RequestTracker::starting_after(PROBE_ID),
        })
        .await?;

        let (reply, ack) = oneshot::channel();
        self.submit(PROPERTY_SUBSCRIBE, json!({"property": SUBSCRIBED}), Some(reply))
            .await?;
        await_reply(ack, self.config.login_timeout).await?;

        self.submit(PROPERTY_GET, json!({"property": SUBSCRIBED}), None)
            .await?;
        self.submit(IMAGE_SOURCE_LIST, json!([]), None).await?;

        if self.deferred_power_on.swap(false, Ordering::SeqCst) {
            info!("replaying deferred power-on");
            self.submit(SYSTEM_POWERON, Command::PowerOn.params(), None)
                .await?;
        }
        Ok(())
    }

    // ── Wake ─────────────────────────────────────────────────────────

    /// Broadcast a wake packet ahead of `method` if the projector is not
    /// online and `method` needs it. Returns `true` when a power-on was
    /// deferred until the next completed handshake.
    pub(super) async fn wake_if_needed(&self, method: &str) -> bool {
        if !requires_wake(method) || self.state() == ConnectionState::Online {
            return false;
        }
        if !self.wake().await {
            return false;
        }

        let defer = method == SYSTEM_POWERON;
        if defer {
            self.deferred_power_on.store(true, Ordering::SeqCst);
            debug!("power-on deferred until the projector completes a handshake");
        }
        defer
    }

    /// Send the magic packet. `false` when there is no MAC to wake.
    async fn wake(&self) -> bool {
        let Some(mac) = self.config.mac else {
            debug!("no MAC address configured, skipping wake-on-LAN");
            return false;
        };
        // The connect attempt that follows reports the real failure.
        if let Err(e) = wol::wake(mac, self.config.wake_target).await {
            warn!(error = %e, "wake-on-LAN failed");
        }
        true
    }

    // ── Test ─────────────────────────────────────────────────────────

    /// Probe the projector on a throwaway socket.
    pub(super) async fn test_connection(&self) -> Result<DeviceIdentity, CoreError> {
        let _guard = self.connect_lock.lock().await;

        if self.state() != ConnectionState::Online {
            self.wake().await;
        }
        if self.state().is_connected() && self.link_alive().await {
            if let Some(identity) = self.identity.load_full() {
                return Ok((*identity).clone());
            }
        }

        let (stream, identity) = probe(&self.config).await?;
        drop(stream);
        debug!(%identity, "test connection succeeded");
        Ok(identity)
    }
}

/// Open a socket and read model and serial number as request 1.
async fn probe(config: &SessionConfig) -> Result<(TcpStream, DeviceIdentity), CoreError> {
    let transport = config.transport();
    let mut stream = transport.connect(&config.host).await?;

    write_request(
        &mut stream,
        PROPERTY_GET,
        &json!({"property": IDENTITY}),
        PROBE_ID,
    )
    .await?;
    let reply = read_response(&mut stream, PROBE_ID, transport.login_timeout).await?;

    let identity = reply
        .result
        .as_ref()
        .and_then(DeviceIdentity::from_probe)
        .ok_or_else(|| CoreError::Protocol {
            message: "identity probe returned no serial number".into(),
        })?;
    Ok((stream, identity))
}

/// Wait for an awaited request's result, bounded by `timeout`.
pub(super) async fn await_reply(
    rx: oneshot::Receiver<Result<Value, CoreError>>,
    timeout: Duration,
) -> Result<Value, CoreError> {
    match tokio::time::timeout(timeout, rx).await {
        Ok(Ok(result)) => result,
        Ok(Err(_)) => Err(CoreError::Disconnected),
        Err(_) => Err(CoreError::Timeout {
            timeout_secs: timeout.as_secs(),
        }),
    }
}
