//! Command dispatch: bridges CLI args -> session calls -> output formatting.

pub mod config_cmd;
pub mod device;
pub mod power;
pub mod property;
pub mod util;
pub mod watch;

use pulse_core::{DeviceSession, SessionConfig};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a projector-bound command to the appropriate handler.
///
/// Read-only commands run inside [`DeviceSession::oneshot`]. Commands
/// that may need to wake the projector drive the session themselves and
/// close it afterwards.
pub async fn dispatch(
    cmd: Command,
    config: SessionConfig,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Status => device::status(config, global).await,
        Command::Sources => device::sources(config, global).await,
        Command::Get(args) => property::get(config, args, global).await,
        Command::Set(args) => property::set(config, args, global).await,
        Command::Send(args) if !args.no_reply => property::call(config, args, global).await,

        cmd => {
            let session = DeviceSession::new(config);
            let result = match cmd {
                Command::Test => device::test(&session, global).await,
                Command::On(args) => power::on(&session, &args, global).await,
                Command::Off => power::off(&session, global).await,
                Command::Ready => power::ready(&session, global).await,
                Command::Source(args) => power::select_source(&session, args, global).await,
                Command::Send(args) => property::send(&session, args, global).await,
                Command::Watch(args) => watch::handle(&session, &args, global).await,
                // Handled above, or before dispatch for Config and Completions
                Command::Status
                | Command::Sources
                | Command::Get(_)
                | Command::Set(_)
                | Command::Config(_)
                | Command::Completions(_) => unreachable!(),
            };
            util::close(&session).await;
            result
        }
    }
}
