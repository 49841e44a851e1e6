//! `plinth units`: list registered units.

use serde::Serialize;
use tabled::Tabled;

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

#[derive(Debug, Serialize)]
struct UnitEntry {
    name: String,
    dependencies: Vec<String>,
}

#[derive(Tabled)]
struct UnitRow {
    #[tabled(rename = "Unit")]
    name: String,
    #[tabled(rename = "Depends On")]
    dependencies: String,
}

pub fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let registry = util::registry()?;

    let mut entries = Vec::with_capacity(registry.len());
    for name in registry.names() {
        // Throwaway instance: construction never initializes.
        let unit = registry
            .construct(name)
            .map_err(|err| util::lifecycle_error(err, &registry))?;
        entries.push(UnitEntry {
            name: name.to_owned(),
            dependencies: unit.dependencies(),
        });
    }

    let rendered = output::render_list(
        global.output.unwrap_or(OutputFormat::Table),
        &entries,
        |e| UnitRow {
            name: e.name.clone(),
            dependencies: output::join_or_dash(&e.dependencies),
        },
        |e| e.name.clone(),
    )?;
    output::print_output(&rendered)
}
