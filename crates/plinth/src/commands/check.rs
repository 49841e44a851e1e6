//! `plinth check`: resolve the requested units and show the start order.
//!
//! With `--init`, every unit in the order is also initialized in a
//! throwaway host and shut down again.

use serde::Serialize;
use tabled::Tabled;

use plinth_core::{Host, Reconciliation, resolve_graph};

use crate::cli::{CheckArgs, GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Debug, Serialize)]
struct CheckEntry {
    position: usize,
    name: String,
    dependencies: Vec<String>,
    /// Listed in the config, as opposed to pulled in as a dependency.
    requested: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<String>,
}

#[derive(Tabled)]
struct CheckRow {
    #[tabled(rename = "#")]
    position: usize,
    #[tabled(rename = "Unit")]
    name: String,
    #[tabled(rename = "Depends On")]
    dependencies: String,
    #[tabled(rename = "Requested")]
    requested: String,
    #[tabled(rename = "Status")]
    status: String,
}

pub async fn handle(args: &CheckArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (_, config) = util::load_config(global)?;
    let registry = util::registry()?;

    let graph = resolve_graph(&registry, &config.units)
        .map_err(|err| util::lifecycle_error(err, &registry))?;

    let mut entries: Vec<CheckEntry> = graph
        .order()
        .iter()
        .enumerate()
        .map(|(idx, name)| CheckEntry {
            position: idx + 1,
            name: name.clone(),
            dependencies: graph.dependencies_of(name).to_vec(),
            requested: config.units.contains(name),
            status: None,
        })
        .collect();

    let failures = if args.init {
        let host = Host::new(registry);
        let outcome = util::apply(&host, config.snapshot()).await?;
        util::shutdown(&host).await?;
        record_status(&mut entries, &outcome);
        util::unit_failures(&outcome)
    } else {
        None
    };

    let rendered = output::render_list(
        global.output.unwrap_or(OutputFormat::Table),
        &entries,
        |e| CheckRow {
            position: e.position,
            name: e.name.clone(),
            dependencies: output::join_or_dash(&e.dependencies),
            requested: if e.requested { "yes" } else { "no" }.into(),
            status: e.status.clone().unwrap_or_else(|| "-".into()),
        },
        |e| e.name.clone(),
    )?;
    output::print_output(&rendered)?;

    failures.map_or(Ok(()), Err)
}

fn record_status(entries: &mut [CheckEntry], outcome: &Reconciliation) {
    for entry in entries {
        let error = outcome.errors.iter().find(|e| e.unit() == entry.name);
        entry.status = Some(match error {
            Some(err) if err.is_init() => "failed".into(),
            Some(_) => "shutdown failed".into(),
            None => "ok".into(),
        });
    }
}
