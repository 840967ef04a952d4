//! `pulse watch`: stream state and property changes until Ctrl-C.
//!
//! Acts as its own poller: every tick calls `update_data`, which also
//! reconnects after the projector drops the link.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

use pulse_core::{ConnectionState, DeviceSession, Snapshot};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum WatchEvent {
    State {
        at: DateTime<Utc>,
        state: ConnectionState,
    },
    Property {
        at: DateTime<Utc>,
        property: String,
        value: Value,
    },
    /// The link dropped and the cache was emptied.
    Cleared { at: DateTime<Utc> },
}

/// Events describing how `next` differs from `previous`.
fn diff(previous: &Snapshot, next: &Snapshot) -> Vec<WatchEvent> {
    let at = next.updated_at().unwrap_or_else(Utc::now);
    if next.is_empty() {
        return if previous.is_empty() {
            Vec::new()
        } else {
            vec![WatchEvent::Cleared { at }]
        };
    }

    next.iter()
        .filter(|(key, value)| previous.get(key) != Some(*value))
        .map(|(key, value)| WatchEvent::Property {
            at,
            property: key.to_owned(),
            value: value.clone(),
        })
        .collect()
}

fn render(event: &WatchEvent, format: &OutputFormat, color: bool) -> String {
    match format {
        OutputFormat::Json | OutputFormat::JsonCompact => {
            serde_json::to_string(event).unwrap_or_default()
        }
        OutputFormat::Yaml => serde_yaml::to_string(event)
            .map(|doc| format!("---\n{}", doc.trim_end()))
            .unwrap_or_default(),
        OutputFormat::Table | OutputFormat::Plain => match event {
            WatchEvent::State { at, state } => format!(
                "{}  state  {}",
                at.format("%H:%M:%S"),
                output::paint_state(*state, color)
            ),
            WatchEvent::Property {
                at,
                property,
                value,
            } => format!("{}  {property}  {}", at.format("%H:%M:%S"), output::cell(value)),
            WatchEvent::Cleared { at } => format!("{}  cache cleared", at.format("%H:%M:%S")),
        },
    }
}

pub async fn handle(
    session: &DeviceSession,
    args: &WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let emit = |event: WatchEvent| {
        output::print_output(&render(&event, &global.output, color), global.quiet);
    };

    let mut updates = session.updates();
    let mut states = session.subscribe_state();
    let mut previous = Arc::new(Snapshot::default());
    let mut ticker = tokio::time::interval(Duration::from_secs(args.interval.max(1)));

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("interrupted, closing session");
                break;
            }
            _ = ticker.tick() => {
                if let Err(e) = session.update_data().await {
                    if !e.is_unreachable() {
                        return Err(e.into());
                    }
                    info!(error = %e, "projector unreachable, retrying next tick");
                }
            }
            changed = states.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *states.borrow_and_update();
                emit(WatchEvent::State { at: Utc::now(), state });
            }
            update = updates.recv() => match update {
                Ok(snapshot) => {
                    for event in diff(&previous, &snapshot) {
                        emit(event);
                    }
                    previous = snapshot;
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "watch fell behind, some changes were not shown");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pulse_core::{PropertyCache, SleepDetection};
    use serde_json::json;

    use super::*;

    fn snapshot_of(cache: &mut PropertyCache, updates: &Value) -> Arc<Snapshot> {
        cache.apply(updates.as_object().unwrap());
        cache.snapshot()
    }

    #[test]
    fn diff_reports_only_changed_properties() {
        let mut cache = PropertyCache::new(SleepDetection::default());
        let first = snapshot_of(
            &mut cache,
            &json!({"system.state": "on", "image.window.main.source": "HDMI 1"}),
        );
        let second = snapshot_of(
            &mut cache,
            &json!({"image.window.main.source": "DisplayPort 1"}),
        );

        let events = diff(&first, &second);
        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            WatchEvent::Property { property, value, .. }
                if property == "image.window.main.source" && value == &json!("DisplayPort 1")
        ));
    }

    #[test]
    fn emptied_cache_is_one_cleared_event() {
        let mut cache = PropertyCache::new(SleepDetection::default());
        let full = snapshot_of(&mut cache, &json!({"system.state": "on"}));
        cache.clear();
        let empty = cache.snapshot();

        let events = diff(&full, &empty);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], WatchEvent::Cleared { .. }));
        assert!(diff(&empty, &empty).is_empty());
    }

    #[test]
    fn plain_lines_carry_property_and_value() {
        let event = WatchEvent::Property {
            at: DateTime::parse_from_rfc3339("2026-10-15T12:30:05Z")
                .unwrap()
                .with_timezone(&Utc),
            property: "system.state".into(),
            value: json!("eco"),
        };
        assert_eq!(
            render(&event, &OutputFormat::Plain, false),
            "12:30:05  system.state  eco"
        );
        assert_eq!(
            render(&event, &OutputFormat::JsonCompact, false),
            r#"{"event":"property","at":"2026-10-15T12:30:05Z","property":"system.state","value":"eco"}"#
        );
    }
}
