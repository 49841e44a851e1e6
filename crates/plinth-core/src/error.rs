// ── Core error types ──
//
// Two tiers: `LifecycleError` is fatal to a reconciliation attempt and is
// raised before the active set is touched. `UnitError` describes a single
// unit's failure and is collected alongside a still-valid route table.

use thiserror::Error;

/// Boxed error returned by unit implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Fatal errors: the reconciliation is aborted and nothing changes.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("unknown unit '{name}'{}", required_by_suffix(.required_by.as_deref()))]
    UnknownUnit {
        name: String,
        /// The unit whose dependency declaration named `name`, if any.
        required_by: Option<String>,
    },

    #[error("cyclic dependency: {}", .path.join(" -> "))]
    CyclicDependency {
        /// The cycle in traversal order; first and last entries are equal.
        path: Vec<String>,
    },

    #[error("unit '{name}' is already registered")]
    DuplicateUnit { name: String },
}

fn required_by_suffix(required_by: Option<&str>) -> String {
    required_by
        .map(|by| format!(" (required by '{by}')"))
        .unwrap_or_default()
}

impl LifecycleError {
    pub(crate) fn unknown(name: &str, required_by: Option<&str>) -> Self {
        Self::UnknownUnit {
            name: name.to_owned(),
            required_by: required_by.map(str::to_owned),
        }
    }
}

/// A single unit's failure. Never aborts a reconciliation.
#[derive(Debug, Error)]
pub enum UnitError {
    #[error("unit '{name}' failed to initialize: {source}")]
    Init {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("unit '{name}' failed to shut down: {source}")]
    Shutdown {
        name: String,
        #[source]
        source: BoxError,
    },
}

impl UnitError {
    /// Name of the unit that failed.
    pub fn unit(&self) -> &str {
        match self {
            Self::Init { name, .. } | Self::Shutdown { name, .. } => name,
        }
    }

    pub fn is_init(&self) -> bool {
        matches!(self, Self::Init { .. })
    }
}
