// ── DeviceSession ──
//
// Public façade over one projector connection. Cheaply cloneable;
// every clone talks to the same dispatcher task.

mod connect;
mod dispatch;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwapOption;
use serde_json::Value;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::command::Command;
use crate::config::SessionConfig;
use crate::error::CoreError;
use crate::model::property::{POLLED, SENSORS};
use crate::model::{ConnectionState, DeviceIdentity, Snapshot};
use crate::store::PropertyCache;
use crate::stream::SnapshotStream;

use self::connect::await_reply;
use self::dispatch::{Control, Dispatcher};

const CONTROL_CHANNEL_SIZE: usize = 64;

/// Values of the power property that count as "on".
const POWERED_STATES: &[&str] = &["on", "conditioning"];

/// How `send_command` disposed of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Written to the projector under this request id.
    Sent { id: u64 },
    /// A deferred power-on was replayed by the handshake this command
    /// triggered.
    Replayed,
    /// The projector was woken but is not reachable yet; the power-on
    /// goes out after the next successful handshake.
    Deferred,
}

/// A stateful session with one Barco Pulse projector.
///
/// Construction spawns the dispatcher but does not connect. The first
/// command (or an explicit [`ensure_connected`](Self::ensure_connected))
/// opens the socket and performs the handshake. Must be created inside a
/// Tokio runtime.
#[derive(Clone)]
pub struct DeviceSession {
    inner: Arc<SessionInner>,
}

pub(crate) struct SessionInner {
    config: SessionConfig,
    control: mpsc::Sender<Control>,
    state: Arc<watch::Sender<ConnectionState>>,
    latest: watch::Receiver<Arc<Snapshot>>,
    updates: broadcast::Sender<Arc<Snapshot>>,
    identity: ArcSwapOption<DeviceIdentity>,
    deferred_power_on: AtomicBool,
    connect_lock: Mutex<()>,
    cancel: CancellationToken,
}

impl SessionInner {
    fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl DeviceSession {
    pub fn new(config: SessionConfig) -> Self {
        let cache = PropertyCache::new(config.sleep.clone());
        let latest = cache.subscribe();
        let updates = cache.updates_sender();
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        let state = Arc::new(state);
        let (control_tx, control_rx) = mpsc::channel(CONTROL_CHANNEL_SIZE);
        let cancel = CancellationToken::new();

        let dispatcher = Dispatcher::new(
            cache,
            Arc::clone(&state),
            control_rx,
            cancel.clone(),
            config.login_timeout,
        );
        tokio::spawn(dispatcher.run());

        Self {
            inner: Arc::new(SessionInner {
                config,
                control: control_tx,
                state,
                latest,
                updates,
                identity: ArcSwapOption::empty(),
                deferred_power_on: AtomicBool::new(false),
                connect_lock: Mutex::new(()),
                cancel,
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    // ── Connection lifecycle ─────────────────────────────────────────

    /// Connect and handshake unless a live link already exists.
    pub async fn ensure_connected(&self) -> Result<(), CoreError> {
        self.inner.ensure_connected().await
    }

    /// Probe the projector without touching the live session.
    ///
    /// Wakes the projector if a MAC is configured, then reads model and
    /// serial number on a separate socket that is closed straight away.
    /// Never moves the session to `Online`.
    pub async fn test_connection(&self) -> Result<DeviceIdentity, CoreError> {
        self.inner.test_connection().await
    }

    /// Close the link. Pending requests are dropped and subscribers see
    /// one empty snapshot.
    pub async fn disconnect(&self) {
        let _guard = self.inner.connect_lock.lock().await;
        self.inner.detach("disconnect requested").await;
        debug!("disconnected");
    }

    /// Stop the dispatcher. The session is unusable afterwards.
    pub fn shutdown(&self) {
        self.inner.cancel.cancel();
    }

    /// One-shot: connect, run closure, disconnect.
    pub async fn oneshot<F, Fut, T>(config: SessionConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(DeviceSession) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let session = DeviceSession::new(config);
        session.ensure_connected().await?;
        let result = f(session.clone()).await;
        session.disconnect().await;
        session.shutdown();
        result
    }

    // ── State observation ────────────────────────────────────────────

    pub fn state(&self) -> ConnectionState {
        self.inner.state()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// `true` only while handshaken and not in eco standby.
    pub fn is_online(&self) -> bool {
        self.state() == ConnectionState::Online
    }

    pub fn identity(&self) -> Option<Arc<DeviceIdentity>> {
        self.inner.identity.load_full()
    }

    /// `"Barco:{serial}"` once a handshake has identified the projector.
    pub fn device_id(&self) -> Option<String> {
        self.identity().map(|identity| identity.device_id())
    }

    // ── Property access ──────────────────────────────────────────────

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.inner.latest.borrow().clone()
    }

    /// Latest-value subscription; may skip intermediate snapshots.
    pub fn subscribe(&self) -> SnapshotStream {
        SnapshotStream::new(self.inner.latest.clone())
    }

    /// Every published snapshot, one per cache mutation.
    pub fn updates(&self) -> broadcast::Receiver<Arc<Snapshot>> {
        self.inner.updates.subscribe()
    }

    pub fn is_cached(&self, key: &str) -> bool {
        self.snapshot().contains(key)
    }

    pub fn sensor_value(&self, key: &str) -> Option<Value> {
        self.snapshot().get(key).cloned()
    }

    /// Keys consumers can bind sensors to.
    pub fn sensors(&self) -> &'static [&'static str] {
        SENSORS
    }

    /// `true` when the configured power property reads `on` or
    /// `conditioning`.
    pub fn is_on(&self) -> bool {
        self.snapshot()
            .str(self.inner.config.power_property.path())
            .is_some_and(|state| POWERED_STATES.contains(&state))
    }

    pub fn source_list(&self) -> Vec<String> {
        self.snapshot().source_list()
    }

    pub fn current_source(&self) -> Option<String> {
        self.snapshot().current_source().map(str::to_owned)
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Wake if needed, connect if needed, then write the request.
    ///
    /// Returns once the request is on the wire; the response is handled
    /// by the dispatcher.
    pub async fn send_command(&self, method: &str, params: Value) -> Result<Delivery, CoreError> {
        let deferred = self.inner.wake_if_needed(method).await;

        match self.inner.ensure_connected().await {
            Ok(()) => {}
            Err(e) if deferred && e.is_unreachable() => {
                info!(error = %e, "projector not reachable yet, power-on stays deferred");
                return Ok(Delivery::Deferred);
            }
            Err(e) => return Err(e),
        }

        if deferred && !self.inner.deferred_power_on.swap(false, Ordering::SeqCst) {
            return Ok(Delivery::Replayed);
        }

        let id = self.inner.submit(method, params, None).await?;
        Ok(Delivery::Sent { id })
    }

    /// Issue a request and wait for its result, bounded by the login
    /// timeout.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, CoreError> {
        self.inner.ensure_connected().await?;

        let (reply, result) = oneshot::channel();
        self.inner.submit(method, params, Some(reply)).await?;
        await_reply(result, self.inner.config.login_timeout).await
    }

    pub async fn execute(&self, command: Command) -> Result<Delivery, CoreError> {
        self.send_command(command.method(), command.params()).await
    }

    /// Per-poll refresh: re-read state and target state only.
    pub async fn update_data(&self) -> Result<Delivery, CoreError> {
        self.execute(Command::GetProperties {
            properties: POLLED.iter().map(|p| (*p).to_owned()).collect(),
        })
        .await
    }

    pub async fn turn_on(&self) -> Result<Delivery, CoreError> {
        self.execute(Command::PowerOn).await
    }

    pub async fn turn_off(&self) -> Result<Delivery, CoreError> {
        self.execute(Command::PowerOff).await
    }

    pub async fn go_to_ready(&self) -> Result<Delivery, CoreError> {
        self.execute(Command::GoToReady).await
    }

    pub async fn select_source(&self, name: impl Into<String>) -> Result<Delivery, CoreError> {
        self.execute(Command::SelectSource { name: name.into() })
            .await
    }
}
