// ── Requested configuration snapshot ──

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::unit::UnitConfig;

/// One fully-parsed configuration: which units to run and their settings.
///
/// Immutable once built; each reconciliation consumes exactly one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    /// Requested unit names, in the order the caller listed them.
    #[serde(default, alias = "modules")]
    pub units: Vec<String>,

    /// Per-unit configuration blocks keyed by unit name.
    #[serde(default)]
    pub configs: HashMap<String, UnitConfig>,
}

impl ConfigSnapshot {
    pub fn new<I, S>(units: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            units: units.into_iter().map(Into::into).collect(),
            configs: HashMap::new(),
        }
    }

    /// Attach a configuration block for `unit`.
    pub fn with_config(mut self, unit: impl Into<String>, config: UnitConfig) -> Self {
        self.configs.insert(unit.into(), config);
        self
    }

    /// The block for `unit`, or an empty mapping when none was declared.
    pub fn config_for(&self, unit: &str) -> UnitConfig {
        self.configs.get(unit).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn missing_block_is_empty() {
        let snapshot = ConfigSnapshot::new(["user"]);
        assert!(snapshot.config_for("user").is_empty());
    }

    #[test]
    fn accepts_modules_alias() {
        let snapshot: ConfigSnapshot = serde_json::from_value(json!({
            "modules": ["user", "order"],
            "configs": { "order": { "dsn": "memory://test" } }
        }))
        .unwrap();

        assert_eq!(snapshot.units, vec!["user", "order"]);
        assert_eq!(
            snapshot.config_for("order").get("dsn"),
            Some(&json!("memory://test"))
        );
    }
}
