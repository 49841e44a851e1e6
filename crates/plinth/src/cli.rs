//! Clap derive structures for the `plinth` CLI.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// plinth -- host for hot-reconfigurable units
#[derive(Debug, Parser)]
#[command(
    name = "plinth",
    version,
    about = "Run pluggable units from a config file, reconfiguring them live",
    long_about = "Resolves the units a config file asks for, starts them in dependency order,\n\
        serves their routes over HTTP, and reconciles the running set whenever the\n\
        file changes.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Config file (default: plinth.yaml in the working directory)
    #[arg(long, short = 'c', env = "PLINTH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format (each command picks its own default)
    #[arg(long, short = 'o', global = true)]
    pub output: Option<OutputFormat>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

// ── Output Enum ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one unit name per line (scripting)
    Plain,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the requested units, serve their routes, and follow config changes
    Run(RunArgs),

    /// Print the resolved, environment-expanded configuration without starting anything
    Dump,

    /// Resolve the requested units and show the start order
    Check(CheckArgs),

    /// List registered units and their dependencies
    #[command(alias = "ls")]
    Units,

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Listen address (overrides server.listen)
    #[arg(long, short = 'l')]
    pub listen: Option<SocketAddr>,

    /// Do not watch the config file for changes
    #[arg(long)]
    pub no_watch: bool,
}

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Also initialize every unit, then shut them down again
    #[arg(long)]
    pub init: bool,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
