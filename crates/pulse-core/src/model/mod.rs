// ── Domain model ──
//
// Session-facing types: who the projector is, which state the
// connection is in, and the property snapshot consumers read.

pub mod identity;
pub mod property;
pub mod snapshot;
pub mod state;

// ── Re-exports ──────────────────────────────────────────────────────

pub use identity::DeviceIdentity;
pub use pulse_api::MacAddress;
pub use snapshot::Snapshot;
pub use state::ConnectionState;
