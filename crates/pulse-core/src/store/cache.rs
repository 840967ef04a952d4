// ── Property cache ──
//
// Single-owner storage for converted property values. Every mutation
// rebuilds the snapshot and pushes it to both the `watch` channel
// (latest value) and the `broadcast` channel (one item per mutation).

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::{broadcast, watch};

use crate::config::SleepDetection;
use crate::convert;
use crate::model::Snapshot;

const UPDATES_CAPACITY: usize = 64;

/// Power-state edge detected while applying an update batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerTransition {
    /// A watched property changed to the sleep value.
    Asleep,
    /// A watched property changed away from the sleep value.
    Awake,
}

/// What a single `apply` did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Raw properties whose rule succeeded.
    pub applied: usize,
    /// Raw properties whose value did not fit their rule.
    pub failed: Vec<String>,
    pub transition: Option<PowerTransition>,
}

/// Latest converted value per property.
///
/// Owned by the session dispatcher; consumers only see the published
/// `Snapshot`s.
pub struct PropertyCache {
    values: BTreeMap<String, Value>,
    sleep: SleepDetection,
    latest: watch::Sender<Arc<Snapshot>>,
    updates: broadcast::Sender<Arc<Snapshot>>,
}

impl PropertyCache {
    pub fn new(sleep: SleepDetection) -> Self {
        let (latest, _) = watch::channel(Arc::new(Snapshot::default()));
        let (updates, _) = broadcast::channel(UPDATES_CAPACITY);
        Self {
            values: BTreeMap::new(),
            sleep,
            latest,
            updates,
        }
    }

    /// Convert and store a batch of raw `property → value` updates.
    ///
    /// A property whose value does not fit its rule is logged and
    /// skipped; the rest of the batch still lands and is published as
    /// one snapshot.
    pub fn apply(&mut self, updates: &Map<String, Value>) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::default();

        for (property, value) in updates {
            let previous = self
                .sleep
                .watches(property)
                .then(|| self.values.get(property).cloned())
                .flatten();

            match convert::apply_into(&mut self.values, property, value) {
                Ok(_) => {
                    outcome.applied += 1;
                    if let Some(edge) = self.edge(property, previous.as_ref(), value) {
                        // Asleep wins over Awake within one batch.
                        if outcome.transition != Some(PowerTransition::Asleep) {
                            outcome.transition = Some(edge);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "skipping property update");
                    outcome.failed.push(property.clone());
                }
            }
        }

        // Still asleep while any other watched property holds the value.
        if outcome.transition == Some(PowerTransition::Awake) && self.is_asleep() {
            outcome.transition = None;
        }

        if outcome.applied > 0 {
            self.publish();
        }
        outcome
    }

    /// Store a value under `key` without running conversion rules.
    pub fn store_verbatim(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
        self.publish();
    }

    /// Drop every value and publish the empty snapshot exactly once.
    pub fn clear(&mut self) {
        self.values.clear();
        self.publish();
    }

    /// `true` when a watched property currently holds the sleep value.
    pub fn is_asleep(&self) -> bool {
        self.sleep.properties.iter().any(|p| {
            self.values
                .get(p.path())
                .is_some_and(|v| self.sleep.is_sleep_value(v))
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// The last published snapshot (cheap `Arc` clone).
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.latest.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Snapshot>> {
        self.latest.subscribe()
    }

    pub fn updates(&self) -> broadcast::Receiver<Arc<Snapshot>> {
        self.updates.subscribe()
    }

    /// Sender half, so subscribers can be created after the cache has
    /// moved onto the dispatcher task.
    pub(crate) fn updates_sender(&self) -> broadcast::Sender<Arc<Snapshot>> {
        self.updates.clone()
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn edge(
        &self,
        property: &str,
        previous: Option<&Value>,
        current: &Value,
    ) -> Option<PowerTransition> {
        if !self.sleep.watches(property) || previous == Some(current) {
            return None;
        }
        let was_asleep = previous.is_some_and(|v| self.sleep.is_sleep_value(v));
        match (was_asleep, self.sleep.is_sleep_value(current)) {
            (false, true) => Some(PowerTransition::Asleep),
            (true, false) => Some(PowerTransition::Awake),
            _ => None,
        }
    }

    fn publish(&self) {
        let snapshot = Arc::new(Snapshot::new(self.values.clone(), Utc::now()));
        // `send_replace` updates unconditionally, even with zero receivers.
        self.latest.send_replace(Arc::clone(&snapshot));
        // No subscribers is not an error.
        let _ = self.updates.send(snapshot);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::config::StateProperty;
    use crate::model::property::{
        HDMI_SIGNAL, INLET_TEMPERATURE, INPUT_ACTIVE, INPUT_SIGNAL, SYSTEM_STATE,
        SYSTEM_TARGETSTATE,
    };

    fn batch(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn apply_stores_converted_values() {
        let mut cache = PropertyCache::new(SleepDetection::default());
        let outcome = cache.apply(&batch(json!({
            INLET_TEMPERATURE: 100,
            HDMI_SIGNAL: {"active": true, "name": "HDMI1"},
        })));

        assert_eq!(outcome.applied, 2);
        let snap = cache.snapshot();
        assert_eq!(snap.f64(INLET_TEMPERATURE), Some(212.0));
        assert_eq!(snap.bool(INPUT_ACTIVE), Some(true));
        assert_eq!(snap.str(INPUT_SIGNAL), Some("HDMI1"));
        assert!(!snap.contains(HDMI_SIGNAL));
    }

    #[test]
    fn bad_value_does_not_block_the_batch() {
        let mut cache = PropertyCache::new(SleepDetection::default());
        let mut updates = cache.updates();

        let outcome = cache.apply(&batch(json!({
            HDMI_SIGNAL: "garbage",
            SYSTEM_STATE: "on",
        })));

        assert_eq!(outcome.applied, 1);
        assert_eq!(outcome.failed, vec![HDMI_SIGNAL.to_owned()]);
        assert_eq!(updates.try_recv().unwrap().str(SYSTEM_STATE), Some("on"));
        assert!(updates.try_recv().is_err());
    }

    #[test]
    fn all_failed_batch_publishes_nothing() {
        let mut cache = PropertyCache::new(SleepDetection::default());
        let mut updates = cache.updates();
        cache.apply(&batch(json!({ INLET_TEMPERATURE: "warm" })));
        assert!(updates.try_recv().is_err());
        assert!(cache.is_empty());
    }

    #[test]
    fn change_to_eco_is_asleep() {
        let mut cache = PropertyCache::new(SleepDetection::default());
        cache.apply(&batch(json!({ SYSTEM_STATE: "on" })));

        let outcome = cache.apply(&batch(json!({ SYSTEM_STATE: "eco" })));
        assert_eq!(outcome.transition, Some(PowerTransition::Asleep));
        assert!(cache.is_asleep());
    }

    #[test]
    fn repeated_eco_does_not_fire_again() {
        let mut cache = PropertyCache::new(SleepDetection::default());
        cache.apply(&batch(json!({ SYSTEM_STATE: "eco" })));
        let outcome = cache.apply(&batch(json!({ SYSTEM_STATE: "eco" })));
        assert_eq!(outcome.transition, None);
    }

    #[test]
    fn non_eco_change_has_no_transition() {
        let mut cache = PropertyCache::new(SleepDetection::default());
        cache.apply(&batch(json!({ SYSTEM_STATE: "standby" })));
        let outcome = cache.apply(&batch(json!({ SYSTEM_STATE: "on" })));
        assert_eq!(outcome.transition, None);
    }

    #[test]
    fn leaving_eco_is_awake() {
        let mut cache = PropertyCache::new(SleepDetection::default());
        cache.apply(&batch(json!({ SYSTEM_TARGETSTATE: "eco" })));
        let outcome = cache.apply(&batch(json!({ SYSTEM_TARGETSTATE: "on" })));
        assert_eq!(outcome.transition, Some(PowerTransition::Awake));
        assert!(!cache.is_asleep());
    }

    #[test]
    fn awake_waits_for_every_watched_property() {
        let mut cache = PropertyCache::new(SleepDetection::default());
        cache.apply(&batch(json!({ SYSTEM_STATE: "eco", SYSTEM_TARGETSTATE: "eco" })));

        let outcome = cache.apply(&batch(json!({ SYSTEM_TARGETSTATE: "on" })));
        assert_eq!(outcome.transition, None);
        assert!(cache.is_asleep());

        let outcome = cache.apply(&batch(json!({ SYSTEM_STATE: "on" })));
        assert_eq!(outcome.transition, Some(PowerTransition::Awake));
        assert!(!cache.is_asleep());
    }

    #[test]
    fn unwatched_property_is_ignored_by_sleep_detection() {
        let sleep = SleepDetection {
            properties: vec![StateProperty::TargetState],
            value: "eco".into(),
        };
        let mut cache = PropertyCache::new(sleep);
        let outcome = cache.apply(&batch(json!({ SYSTEM_STATE: "eco" })));
        assert_eq!(outcome.transition, None);
        assert!(!cache.is_asleep());
    }

    #[test]
    fn clear_publishes_one_empty_snapshot() {
        let mut cache = PropertyCache::new(SleepDetection::default());
        cache.apply(&batch(json!({ SYSTEM_STATE: "on" })));
        let mut updates = cache.updates();

        cache.clear();

        assert!(updates.try_recv().unwrap().is_empty());
        assert!(updates.try_recv().is_err());
        assert!(cache.snapshot().is_empty());
    }

    #[test]
    fn store_verbatim_skips_rules() {
        let mut cache = PropertyCache::new(SleepDetection::default());
        cache.store_verbatim(HDMI_SIGNAL, json!({"active": false}));
        assert_eq!(cache.snapshot().get(HDMI_SIGNAL), Some(&json!({"active": false})));
    }

    #[tokio::test]
    async fn watch_subscribers_see_latest() {
        let mut cache = PropertyCache::new(SleepDetection::default());
        let mut rx = cache.subscribe();
        cache.apply(&batch(json!({ SYSTEM_TARGETSTATE: "on" })));
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().str(SYSTEM_TARGETSTATE), Some("on"));
    }
}
