// ── Property store ──
//
// Latest value per property with push-based change notification.

mod cache;

pub use cache::{ApplyOutcome, PowerTransition, PropertyCache};
