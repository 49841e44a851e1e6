//! Command dispatch: bridges CLI args -> config + lifecycle -> output formatting.

pub mod check;
pub mod dump;
pub mod run;
pub mod units;
pub mod util;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a command to its handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    match cmd {
        Command::Run(args) => run::handle(&args, global).await,
        Command::Dump => dump::handle(global),
        Command::Check(args) => check::handle(&args, global).await,
        Command::Units => units::handle(global),
        // Completions are handled before dispatch
        Command::Completions(_) => Ok(()),
    }
}
