//! `plinth dump`: print the loaded, environment-expanded configuration.

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

pub fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let (_, config) = util::load_config(global)?;

    let rendered = match global.output.unwrap_or(OutputFormat::Json) {
        OutputFormat::Json => output::render_json(&config, false)?,
        OutputFormat::JsonCompact => output::render_json(&config, true)?,
        OutputFormat::Yaml => output::render_yaml(&config)?,
        other @ (OutputFormat::Table | OutputFormat::Plain) => {
            return Err(CliError::Validation {
                field: "--output".into(),
                reason: format!("dump prints json, json-compact, or yaml, not {other:?}"),
            });
        }
    };
    output::print_output(&rendered)
}
