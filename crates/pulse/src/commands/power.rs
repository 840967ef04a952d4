//! Power and source-selection handlers.
//!
//! These go through `send_command`, so a sleeping projector is woken
//! first when a MAC address is configured.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use pulse_core::model::property::SOURCE_LIST;
use pulse_core::{Delivery, DeviceSession};

use crate::cli::{GlobalOpts, OnArgs, SourceArgs};
use crate::commands::util::{self, DeliveryView};
use crate::error::CliError;
use crate::output;

/// Pause between connect attempts while a woken projector boots.
const WAKE_RETRY_INTERVAL: Duration = Duration::from_secs(5);

fn report(action: &str, delivery: Delivery, global: &GlobalOpts) {
    let view = DeliveryView::new(action, delivery);
    let out = output::render_single(&global.output, &view, DeliveryView::message, |v| {
        v.status.to_owned()
    });
    output::print_output(&out, global.quiet);
}

// ── Power ───────────────────────────────────────────────────────────

pub async fn on(session: &DeviceSession, args: &OnArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let delivery = match session.turn_on().await? {
        Delivery::Deferred if args.wait > 0 => {
            wait_for_replay(session, Duration::from_secs(args.wait)).await?
        }
        other => other,
    };
    report("power on", delivery, global);
    Ok(())
}

/// Keep reconnecting until the handshake replays the deferred power-on
/// or `budget` runs out.
async fn wait_for_replay(session: &DeviceSession, budget: Duration) -> Result<Delivery, CliError> {
    info!(budget_secs = budget.as_secs(), "waiting for projector to finish booting");
    let deadline = Instant::now() + budget;

    loop {
        tokio::time::sleep(WAKE_RETRY_INTERVAL).await;
        match session.ensure_connected().await {
            Ok(()) => return Ok(Delivery::Replayed),
            Err(e) if e.is_unreachable() && Instant::now() < deadline => {
                debug!(error = %e, "projector not answering yet");
            }
            Err(e) if e.is_unreachable() => return Ok(Delivery::Deferred),
            Err(e) => return Err(e.into()),
        }
    }
}

pub async fn off(session: &DeviceSession, global: &GlobalOpts) -> Result<(), CliError> {
    let delivery = session.turn_off().await?;
    report("power off", delivery, global);
    Ok(())
}

pub async fn ready(session: &DeviceSession, global: &GlobalOpts) -> Result<(), CliError> {
    let delivery = session.go_to_ready().await?;
    report("go to ready", delivery, global);
    Ok(())
}

// ── Source ──────────────────────────────────────────────────────────

pub async fn select_source(
    session: &DeviceSession,
    args: SourceArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    session.ensure_connected().await?;

    // Reject unknown names when the projector has told us what it has.
    if util::wait_for_key(session, SOURCE_LIST, session.config().login_timeout).await
        && !session.source_list().contains(&args.name)
    {
        return Err(CliError::NotFound {
            resource_type: "source".into(),
            identifier: args.name,
            list_command: "sources".into(),
        });
    }

    let delivery = session.select_source(args.name.clone()).await?;
    report(&format!("source '{}'", args.name), delivery, global);
    Ok(())
}
