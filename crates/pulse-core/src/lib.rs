//! Session layer between `pulse-api` and consumers (CLI, home-automation
//! bridges).
//!
//! This crate owns the connection lifecycle, property cache, and state
//! machine for one Barco Pulse projector:
//!
//! - **[`DeviceSession`]**: Cloneable façade. Commands go through the wake
//!   path and [`ensure_connected()`](DeviceSession::ensure_connected), which
//!   performs the identity probe, subscription, and bulk fetch.
//!   [`DeviceSession::oneshot()`] wraps a single connect/run/disconnect cycle
//!   for CLI invocations.
//!
//! - **[`PropertyCache`]**: Latest value per property after per-property
//!   conversion (Fahrenheit temperatures, decomposed HDMI signal and output
//!   size, derived `illumination`/`laser` flags). Owned by the session's
//!   dispatcher task; consumers read published [`Snapshot`]s.
//!
//! - **[`SnapshotStream`]**: Subscription handle exposing
//!   `current()` / `latest()` / `changed()`. [`DeviceSession::updates()`]
//!   yields exactly one snapshot per cache mutation, including the empty one
//!   published when the link drops.
//!
//! - **[`Command`]**: Typed device operations mapped to JSON-RPC method and
//!   params.
//!
//! - **[`ConnectionState`]**: `Disconnected → Connecting → Online ⇄
//!   Sleeping → Disconnected`, observable through a `watch` channel.

pub mod command;
pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod session;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, RequestTracker};
pub use config::{SessionConfig, SleepDetection, StateProperty};
pub use error::CoreError;
pub use session::{Delivery, DeviceSession};
pub use store::PropertyCache;
pub use stream::SnapshotStream;

pub use model::{ConnectionState, DeviceIdentity, MacAddress, Snapshot};
