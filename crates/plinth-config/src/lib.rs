//! Configuration for plinth hosts.
//!
//! A YAML (or TOML) file lists the units to run, a configuration block per
//! unit, and the server settings. Loading layers built-in defaults, the
//! file, and `PLINTH_`-prefixed environment variables, then expands
//! `${VAR}` / `${VAR:default}` placeholders inside every unit block.

mod expand;

use std::collections::BTreeMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml, Yaml},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use plinth_core::{ConfigSnapshot, UnitConfig};

pub use expand::{expand_str, expand_str_with, expand_value_with};

/// Environment variable naming the config file when `--config` is absent.
pub const CONFIG_ENV: &str = "PLINTH_CONFIG";
/// Prefix for environment overrides; nested keys are separated by `__`.
pub const ENV_PREFIX: &str = "PLINTH_";
pub const DEFAULT_CONFIG_FILE: &str = "plinth.yaml";
/// `APP_ENV=dev` turns dev mode on regardless of the file.
pub const APP_ENV: &str = "APP_ENV";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {}", .path.display())]
    NotFound { path: PathBuf },

    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── Config structs ──────────────────────────────────────────────────

/// Top-level configuration file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ConfigFile {
    /// Units to run, in the order listed.
    #[serde(default, alias = "modules")]
    pub units: Vec<String>,

    /// Per-unit configuration blocks.
    #[serde(default)]
    pub configs: BTreeMap<String, UnitConfig>,

    #[serde(default)]
    pub server: ServerSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServerSettings {
    /// Address the HTTP dispatcher binds.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,

    /// How often the config file is polled for changes.
    #[serde(default = "default_watch_interval_ms")]
    pub watch_interval_ms: u64,

    /// Expose the route listing endpoint.
    #[serde(default)]
    pub dev: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            watch_interval_ms: default_watch_interval_ms(),
            dev: false,
        }
    }
}

impl ServerSettings {
    pub fn watch_interval(&self) -> Duration {
        Duration::from_millis(self.watch_interval_ms)
    }
}

fn default_listen() -> SocketAddr {
    SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8080))
}
fn default_watch_interval_ms() -> u64 {
    500
}

impl ConfigFile {
    /// The snapshot a reconciliation consumes.
    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            units: self.units.clone(),
            configs: self
                .configs
                .iter()
                .map(|(name, config)| (name.clone(), config.clone()))
                .collect(),
        }
    }

    /// Dev mode is on when the file says so or `APP_ENV=dev`.
    pub fn dev_mode(&self) -> bool {
        self.dev_mode_with(|key| std::env::var(key).ok())
    }

    pub fn dev_mode_with<F>(&self, lookup: F) -> bool
    where
        F: Fn(&str) -> Option<String>,
    {
        self.server.dev || lookup(APP_ENV).is_some_and(|v| v == "dev")
    }

    /// Expand placeholders in every unit block.
    pub fn expand_with<F>(&mut self, lookup: &F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for config in self.configs.values_mut() {
            for value in config.values_mut() {
                expand_value_with(value, lookup);
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.watch_interval_ms == 0 {
            return Err(ConfigError::Validation {
                field: "server.watch_interval_ms".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if let Some(bad) = self.units.iter().find(|u| u.trim().is_empty() || u.trim() != *u) {
            return Err(ConfigError::Validation {
                field: "units".into(),
                reason: format!("invalid unit name {bad:?}"),
            });
        }
        for name in self.configs.keys() {
            if !self.units.contains(name) {
                // Still handed over if the unit is pulled in as a dependency.
                debug!(unit = %name, "configuration block for a unit not listed in `units`");
            }
        }
        Ok(())
    }
}

// ── Config file path ────────────────────────────────────────────────

/// `explicit`, else `$PLINTH_CONFIG`, else `plinth.yaml` in the working directory.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    config_path_with(explicit, |key| std::env::var(key).ok())
}

pub fn config_path_with<F>(explicit: Option<&Path>, lookup: F) -> PathBuf
where
    F: Fn(&str) -> Option<String>,
{
    explicit.map_or_else(
        || {
            lookup(CONFIG_ENV)
                .filter(|p| !p.is_empty())
                .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), PathBuf::from)
        },
        Path::to_path_buf,
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// On-disk syntax, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Yaml,
    Toml,
}

impl FileFormat {
    /// `.toml` is TOML; anything else is read as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::Toml,
            _ => Self::Yaml,
        }
    }
}

/// Load, expand, and validate the config at `path`.
pub fn load(path: &Path) -> Result<ConfigFile, ConfigError> {
    load_with(path, |key| std::env::var(key).ok())
}

/// Like [`load`], resolving placeholders through `lookup`.
///
/// `PLINTH_*` overrides are still read from the process environment.
pub fn load_with<F>(path: &Path, lookup: F) -> Result<ConfigFile, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if !path.is_file() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let format = FileFormat::from_path(path);
    let figment = Figment::new().merge(Serialized::default("server", ServerSettings::default()));
    let figment = match format {
        FileFormat::Yaml => figment.merge(Yaml::file_exact(path)),
        FileFormat::Toml => figment.merge(Toml::file_exact(path)),
    };
    let figment = figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["config"]).split("__"));

    let mut config: ConfigFile = figment.extract()?;
    config.expand_with(&lookup);
    config.validate()?;

    let unresolved = unresolved_placeholders(&config);
    if !unresolved.is_empty() {
        warn!(?unresolved, "placeholders without a value or default were left as-is");
    }

    debug!(
        path = %path.display(),
        ?format,
        units = ?config.units,
        "loaded configuration"
    );
    Ok(config)
}

/// Unit blocks whose values still contain a `${...}` reference.
fn unresolved_placeholders(config: &ConfigFile) -> Vec<String> {
    fn has_placeholder(value: &Value) -> bool {
        match value {
            Value::String(s) => s.contains("${"),
            Value::Array(items) => items.iter().any(has_placeholder),
            Value::Object(map) => map.values().any(has_placeholder),
            Value::Null | Value::Bool(_) | Value::Number(_) => false,
        }
    }

    config
        .configs
        .iter()
        .flat_map(|(unit, block)| {
            block
                .iter()
                .filter(|(_, value)| has_placeholder(value))
                .map(move |(key, _)| format!("{unit}.{key}"))
        })
        .collect()
}
