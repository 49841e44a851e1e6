// ── Unit contract ──
//
// Implemented by every pluggable component. Construction is inert:
// the resolver builds throwaway instances purely to read
// `dependencies()`, so only `initialize` may have side effects.

use serde_json::{Map, Value};

use crate::error::BoxError;
use crate::surface::RouteTableBuilder;

/// Per-unit configuration block, already environment-expanded.
pub type UnitConfig = Map<String, Value>;

/// A named, pluggable component managed by the lifecycle manager.
pub trait Unit: Send + Sync {
    /// Names of the units this one needs running first.
    ///
    /// Must be a pure query: it is called on instances that are never
    /// initialized.
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Acquire resources and read configuration. May block.
    fn initialize(&mut self, config: UnitConfig) -> Result<(), BoxError>;

    /// Register this unit's routes into the table under construction.
    fn publish(&self, routes: &mut RouteTableBuilder);

    /// Release resources.
    ///
    /// Must tolerate being called after a failed `initialize` and must be
    /// idempotent.
    fn shutdown(&mut self) -> Result<(), BoxError>;
}

/// Read a string setting, falling back to `default` when the key is absent
/// or not a string.
pub fn config_str(config: &UnitConfig, key: &str, default: &str) -> String {
    config
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_owned()
}
