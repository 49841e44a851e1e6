//! CLI error types with miette diagnostics.
//!
//! Maps config and lifecycle errors into user-facing errors with help text
//! and a distinct exit code per failure class.

use std::net::SocketAddr;
use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use plinth_config::ConfigError;
use plinth_core::LifecycleError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const CONFIG: i32 = 3;
    pub const DEPENDENCY: i32 = 4;
    pub const UNIT: i32 = 5;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Configuration ────────────────────────────────────────────────

    #[error("Configuration file not found: {}", .path.display())]
    #[diagnostic(
        code(plinth::no_config),
        help(
            "Pass --config <FILE>, set PLINTH_CONFIG, or create plinth.yaml in the\n\
             working directory."
        )
    )]
    NoConfig { path: PathBuf },

    #[error("Invalid configuration in {}", .path.display())]
    #[diagnostic(code(plinth::config))]
    Config {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },

    // ── Dependencies ─────────────────────────────────────────────────

    #[error("Unknown unit '{name}'{required_by}")]
    #[diagnostic(
        code(plinth::unknown_unit),
        help("Registered units: {available}\nRun: plinth units")
    )]
    UnknownUnit {
        name: String,
        /// Pre-rendered " (required by 'x')" suffix, or empty.
        required_by: String,
        available: String,
    },

    #[error("Cyclic dependency: {path}")]
    #[diagnostic(
        code(plinth::cycle),
        help("Break the cycle by removing one of the dependencies along the path.")
    )]
    Cycle { path: String },

    #[error(transparent)]
    #[diagnostic(code(plinth::registry))]
    Registry(LifecycleError),

    // ── Units ────────────────────────────────────────────────────────

    #[error("{count} unit(s) failed: {summary}")]
    #[diagnostic(
        code(plinth::unit_failed),
        help("Rerun with -v for each unit's initialization log.")
    )]
    UnitFailures { count: usize, summary: String },

    // ── Usage ────────────────────────────────────────────────────────

    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(plinth::validation))]
    Validation { field: String, reason: String },

    // ── Runtime ──────────────────────────────────────────────────────

    #[error("Could not listen on {addr}")]
    #[diagnostic(
        code(plinth::bind),
        help("Is another process using the port? Override with --listen or server.listen.")
    )]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("Background task failed: {0}")]
    #[diagnostic(code(plinth::task))]
    Task(#[from] tokio::task::JoinError),

    // ── IO / Serialization ───────────────────────────────────────────

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Could not render JSON: {0}")]
    #[diagnostic(code(plinth::json))]
    Json(#[from] serde_json::Error),

    #[error("Could not render YAML: {0}")]
    #[diagnostic(code(plinth::yaml))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NoConfig { .. } | Self::Config { .. } => exit_code::CONFIG,
            Self::UnknownUnit { .. } | Self::Cycle { .. } | Self::Registry(_) => {
                exit_code::DEPENDENCY
            }
            Self::UnitFailures { .. } => exit_code::UNIT,
            Self::Validation { .. } => exit_code::USAGE,
            Self::Bind { .. } | Self::Task(_) | Self::Io(_) | Self::Json(_) | Self::Yaml(_) => {
                exit_code::GENERAL
            }
        }
    }

    /// Wrap a config loading error for the file at `path`.
    pub fn config(path: PathBuf, err: ConfigError) -> Self {
        match err {
            ConfigError::NotFound { path } => Self::NoConfig { path },
            source => Self::Config { path, source },
        }
    }

    /// Wrap a lifecycle error, listing the registered units for context.
    pub fn lifecycle(err: LifecycleError, available: &[&str]) -> Self {
        match err {
            LifecycleError::UnknownUnit { name, required_by } => Self::UnknownUnit {
                name,
                required_by: required_by
                    .map(|by| format!(" (required by '{by}')"))
                    .unwrap_or_default(),
                available: available.join(", "),
            },
            LifecycleError::CyclicDependency { path } => Self::Cycle {
                path: path.join(" -> "),
            },
            other @ LifecycleError::DuplicateUnit { .. } => Self::Registry(other),
        }
    }
}
