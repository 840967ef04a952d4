//! Device handlers: connectivity test, status, source list.

use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;

use pulse_core::model::property::{SOURCE_LIST, SYSTEM_STATE};
use pulse_core::{ConnectionState, CoreError, DeviceSession, SessionConfig};

use crate::cli::GlobalOpts;
use crate::commands::util;
use crate::error::CliError;
use crate::output;

// ── Test ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct TestView {
    host: String,
    device_id: String,
    vendor: String,
    model: Option<String>,
    serial: String,
}

pub async fn test(session: &DeviceSession, global: &GlobalOpts) -> Result<(), CliError> {
    let identity = session.test_connection().await?;
    let view = TestView {
        host: session.config().host.clone(),
        device_id: identity.device_id(),
        vendor: identity.vendor.clone(),
        model: identity.model.clone(),
        serial: identity.serial.clone(),
    };

    let out = output::render_single(
        &global.output,
        &view,
        |v| {
            format!(
                "✓ {identity} reachable at {}\n  Device ID: {}",
                v.host, v.device_id
            )
        },
        |v| v.device_id.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Status ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct StatusView {
    host: String,
    state: ConnectionState,
    device_id: Option<String>,
    model: Option<String>,
    power: bool,
    source: Option<String>,
    sensors: BTreeMap<String, Value>,
    updated_at: Option<DateTime<Utc>>,
}

async fn gather_status(session: DeviceSession) -> Result<StatusView, CoreError> {
    util::wait_for_key(&session, SYSTEM_STATE, session.config().login_timeout).await;

    let snapshot = session.snapshot();
    let sensors = session
        .sensors()
        .iter()
        .filter_map(|key| snapshot.get(key).map(|v| ((*key).to_owned(), v.clone())))
        .collect();
    let identity = session.identity();

    Ok(StatusView {
        host: session.config().host.clone(),
        state: session.state(),
        device_id: session.device_id(),
        model: identity.and_then(|i| i.model.clone()),
        power: session.is_on(),
        source: session.current_source(),
        sensors,
        updated_at: snapshot.updated_at(),
    })
}

fn status_detail(view: &StatusView, color: bool) -> String {
    let mut out = String::new();
    let dash = || "-".to_owned();

    let _ = writeln!(out, "{:<12}{}", "Host", view.host);
    let _ = writeln!(out, "{:<12}{}", "Device", view.device_id.clone().unwrap_or_else(dash));
    let _ = writeln!(out, "{:<12}{}", "Model", view.model.clone().unwrap_or_else(dash));
    let _ = writeln!(out, "{:<12}{}", "State", output::paint_state(view.state, color));
    let _ = writeln!(out, "{:<12}{}", "Power", if view.power { "on" } else { "off" });
    let _ = writeln!(out, "{:<12}{}", "Source", view.source.clone().unwrap_or_else(dash));

    if !view.sensors.is_empty() {
        let _ = writeln!(out, "\nSensors");
        let width = view.sensors.keys().map(String::len).max().unwrap_or(0);
        for (key, value) in &view.sensors {
            let _ = writeln!(out, "  {key:<width$}  {}", output::cell(value));
        }
    }
    out.trim_end().to_owned()
}

pub async fn status(config: SessionConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let view = DeviceSession::oneshot(config, gather_status).await?;
    let color = output::should_color(&global.color);

    let out = output::render_single(
        &global.output,
        &view,
        |v| status_detail(v, color),
        |v| v.state.to_string(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Sources ─────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct SourceEntry {
    name: String,
    active: bool,
}

#[derive(Tabled)]
struct SourceRow {
    #[tabled(rename = "")]
    marker: &'static str,
    #[tabled(rename = "Source")]
    name: String,
}

async fn gather_sources(session: DeviceSession) -> Result<Vec<SourceEntry>, CoreError> {
    util::wait_for_key(&session, SOURCE_LIST, session.config().login_timeout).await;

    let current = session.current_source();
    Ok(session
        .source_list()
        .into_iter()
        .map(|name| SourceEntry {
            active: current.as_deref() == Some(name.as_str()),
            name,
        })
        .collect())
}

pub async fn sources(config: SessionConfig, global: &GlobalOpts) -> Result<(), CliError> {
    let entries = DeviceSession::oneshot(config, gather_sources).await?;

    let out = output::render_list(
        &global.output,
        &entries,
        |e| SourceRow {
            marker: if e.active { "●" } else { "" },
            name: e.name.clone(),
        },
        |e| e.name.clone(),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}
