//! Property and raw-request handlers.

use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;

use pulse_core::{Command, CoreError, DeviceSession, SessionConfig};

use crate::cli::{GetArgs, GlobalOpts, SendArgs, SetArgs};
use crate::commands::util::{self, DeliveryView};
use crate::error::CliError;
use crate::output;

/// Issue `command` on a fresh connection and wait for its result.
async fn call_once(config: SessionConfig, command: Command) -> Result<Value, CoreError> {
    DeviceSession::oneshot(config, |session| async move {
        session.call(command.method(), command.params()).await
    })
    .await
}

fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

// ── Get ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct PropertyEntry {
    property: String,
    value: Value,
}

#[derive(Tabled)]
struct PropertyRow {
    #[tabled(rename = "Property")]
    property: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Flatten a `property.get` result. Multi-property reads come back as
/// an object keyed by path; anything else belongs to the single
/// requested property.
fn entries(requested: &[String], result: Value) -> Vec<PropertyEntry> {
    match result {
        Value::Object(map) => map
            .into_iter()
            .map(|(property, value)| PropertyEntry { property, value })
            .collect(),
        value => vec![PropertyEntry {
            property: requested.join(","),
            value,
        }],
    }
}

pub async fn get(config: SessionConfig, args: GetArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let command = Command::GetProperties {
        properties: args.properties.clone(),
    };
    let result = call_once(config, command).await?;
    let rows = entries(&args.properties, result);

    let out = output::render_list(
        &global.output,
        &rows,
        |e| PropertyRow {
            property: e.property.clone(),
            value: output::cell(&e.value),
        },
        |e| output::cell(&e.value),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Set ─────────────────────────────────────────────────────────────

pub async fn set(config: SessionConfig, args: SetArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let value = util::parse_value(&args.value);
    let command = Command::SetProperty {
        property: args.property.clone(),
        value: value.clone(),
    };
    call_once(config, command).await?;

    let entry = PropertyEntry {
        property: args.property,
        value,
    };
    let out = output::render_single(
        &global.output,
        &entry,
        |e| format!("✓ {} set to {}", e.property, output::cell(&e.value)),
        |e| output::cell(&e.value),
    );
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Send ────────────────────────────────────────────────────────────

/// Raw request, waiting for the projector's reply.
pub async fn call(config: SessionConfig, args: SendArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let params = util::parse_params(args.params.as_deref())?;
    let result = call_once(
        config,
        Command::Raw {
            method: args.method,
            params,
        },
    )
    .await?;

    let out = output::render_single(&global.output, &result, pretty, output::cell);
    output::print_output(&out, global.quiet);
    Ok(())
}

/// Raw request, fire-and-forget through the wake path.
pub async fn send(session: &DeviceSession, args: SendArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let params = util::parse_params(args.params.as_deref())?;
    let delivery = session
        .execute(Command::Raw {
            method: args.method.clone(),
            params,
        })
        .await?;

    let view = DeliveryView::new(args.method, delivery);
    let out = output::render_single(&global.output, &view, DeliveryView::message, |v| {
        v.id.map_or_else(|| v.status.to_owned(), |id| id.to_string())
    });
    output::print_output(&out, global.quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn object_results_flatten_to_entries() {
        let requested = vec!["system.state".to_owned(), "system.targetstate".to_owned()];
        let rows = entries(
            &requested,
            json!({"system.state": "on", "system.targetstate": "on"}),
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].property, "system.state");
    }

    #[test]
    fn scalar_result_belongs_to_the_request() {
        let rows = entries(&["system.state".to_owned()], json!("eco"));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].property, "system.state");
        assert_eq!(rows[0].value, json!("eco"));
    }
}
