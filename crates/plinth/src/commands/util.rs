//! Shared helpers for command handlers.

use std::path::PathBuf;

use plinth_config::ConfigFile;
use plinth_core::{ConfigSnapshot, Host, LifecycleError, Reconciliation, UnitRegistry};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Resolve the config path from the global flags and load it.
pub fn load_config(global: &GlobalOpts) -> Result<(PathBuf, ConfigFile), CliError> {
    let path = plinth_config::config_path(global.config.as_deref());
    let config = plinth_config::load(&path).map_err(|err| CliError::config(path.clone(), err))?;
    Ok((path, config))
}

/// Every unit this binary knows about.
pub fn registry() -> Result<UnitRegistry, CliError> {
    plinth_units::builtin_registry().map_err(CliError::Registry)
}

/// Convert a lifecycle error, naming the units `registry` offers.
pub fn lifecycle_error(err: LifecycleError, registry: &UnitRegistry) -> CliError {
    CliError::lifecycle(err, &registry.names())
}

/// Reconcile on the blocking pool; unit initialization may block.
pub async fn apply(host: &Host, snapshot: ConfigSnapshot) -> Result<Reconciliation, CliError> {
    let task_host = host.clone();
    tokio::task::spawn_blocking(move || task_host.apply(&snapshot))
        .await?
        .map_err(|err| lifecycle_error(err, host.registry()))
}

/// Shut every unit down on the blocking pool and report failures.
pub async fn shutdown(host: &Host) -> Result<(), CliError> {
    let task_host = host.clone();
    let errors = tokio::task::spawn_blocking(move || task_host.shutdown()).await?;
    for err in &errors {
        tracing::warn!(unit = %err.unit(), error = %err, "unit failed to shut down");
    }
    Ok(())
}

/// Collapse per-unit failures into one error.
pub fn unit_failures(outcome: &Reconciliation) -> Option<CliError> {
    if outcome.is_clean() {
        return None;
    }
    let summary = outcome
        .errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ");
    Some(CliError::UnitFailures {
        count: outcome.errors.len(),
        summary,
    })
}
