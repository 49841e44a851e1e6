// ── Lifecycle manager ──
//
// Owns every live unit. A reconciliation holds the state lock for its
// whole duration, so reconciliations never overlap; a second caller
// simply waits its turn. Nothing here touches the published route
// table: the caller decides when to publish what `reconcile` returns.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::{LifecycleError, UnitError};
use crate::registry::UnitRegistry;
use crate::resolve::{DependencyGraph, resolve_graph};
use crate::snapshot::ConfigSnapshot;
use crate::surface::{RouteTable, RouteTableBuilder};
use crate::unit::{Unit, UnitConfig};

/// A live unit plus the configuration it was initialized with.
struct ActiveUnit {
    unit: Box<dyn Unit>,
    config: UnitConfig,
}

/// Live units keyed by name, kept in dependency order.
type ActiveSet = IndexMap<String, ActiveUnit>;

// ── Reports ─────────────────────────────────────────────────────────

/// Outcome of a reconciliation that got past dependency resolution.
#[derive(Debug)]
pub struct Reconciliation {
    /// Route table built from every unit now active.
    pub routes: Arc<RouteTable>,
    /// Units now active, in dependency order.
    pub active: Vec<String>,
    pub started: Vec<String>,
    pub kept: Vec<String>,
    /// Units shut down, in the order they were stopped.
    pub stopped: Vec<String>,
    /// Per-unit init and shutdown failures. Never fatal.
    pub errors: Vec<UnitError>,
}

impl Reconciliation {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Units that were requested but did not start.
    pub fn failed_to_start(&self) -> Vec<&str> {
        self.errors
            .iter()
            .filter(|e| e.is_init())
            .map(UnitError::unit)
            .collect()
    }
}

/// What a reconciliation would do, computed without touching any unit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    /// Full resolved start order.
    pub order: Vec<String>,
    pub start: Vec<String>,
    pub keep: Vec<String>,
    /// Units to shut down, in shutdown order.
    pub stop: Vec<String>,
}

impl Plan {
    pub fn is_noop(&self) -> bool {
        self.start.is_empty() && self.stop.is_empty()
    }
}

// ── UnitManager ─────────────────────────────────────────────────────

pub struct UnitManager {
    registry: Arc<UnitRegistry>,
    active: Mutex<ActiveSet>,
}

impl UnitManager {
    pub fn new(registry: Arc<UnitRegistry>) -> Self {
        Self {
            registry,
            active: Mutex::new(ActiveSet::new()),
        }
    }

    pub fn registry(&self) -> &UnitRegistry {
        &self.registry
    }

    /// Names of the live units, in dependency order.
    pub fn active_units(&self) -> Vec<String> {
        self.active.lock().keys().cloned().collect()
    }

    /// Compute the start / keep / stop sets for `snapshot` without acting.
    pub fn plan(&self, snapshot: &ConfigSnapshot) -> Result<Plan, LifecycleError> {
        let graph = resolve_graph(&self.registry, &snapshot.units)?;
        let active = self.active.lock();

        let (keep, start): (Vec<String>, Vec<String>) = graph
            .order()
            .iter()
            .cloned()
            .partition(|name| active.contains_key(name));
        let stop = active
            .keys()
            .rev()
            .filter(|name| !graph.contains(name))
            .cloned()
            .collect();

        Ok(Plan {
            order: graph.into_order(),
            start,
            keep,
            stop,
        })
    }

    /// Bring the live units in line with `snapshot`.
    ///
    /// Resolution failures abort before any unit is touched. Otherwise:
    /// units already running are kept as-is, missing ones are initialized
    /// in dependency order, units no longer needed are shut down in
    /// reverse dependency order, and a fresh route table is built from
    /// whatever is now active. Individual unit failures are collected in
    /// [`Reconciliation::errors`].
    ///
    /// A running unit is never re-initialized because its configuration
    /// block changed; the change only takes effect once the unit has been
    /// removed and requested again.
    pub fn reconcile(&self, snapshot: &ConfigSnapshot) -> Result<Reconciliation, LifecycleError> {
        let mut active = self.active.lock();

        let graph = resolve_graph(&self.registry, &snapshot.units)?;

        let mut staging = Staging {
            previous: std::mem::take(&mut *active),
            next: ActiveSet::with_capacity(graph.len()),
            active: &mut *active,
        };
        let mut started = Vec::new();
        let mut kept = Vec::new();
        let mut errors = Vec::new();

        for name in graph.order() {
            let config = snapshot.config_for(name);

            if let Some(existing) = staging.previous.shift_remove(name) {
                if existing.config != config {
                    warn!(
                        unit = %name,
                        "configuration changed for running unit; keeping original settings"
                    );
                }
                kept.push(name.clone());
                staging.next.insert(name.clone(), existing);
                continue;
            }

            if let Err(err) = dependencies_active(&graph, name, &staging.next) {
                warn!(unit = %name, error = %err, "unit not started");
                errors.push(err);
                continue;
            }

            match self.start(name, config) {
                Ok(unit) => {
                    started.push(name.clone());
                    staging.next.insert(name.clone(), unit);
                }
                Err(err) => errors.push(err),
            }
        }

        // Whatever is left in `previous` is no longer wanted. It is still in
        // the old dependency order, so stop it back to front.
        let mut stopped = Vec::with_capacity(staging.previous.len());
        while let Some((name, unit)) = staging.previous.pop() {
            if let Err(err) = stop(&name, unit) {
                errors.push(err);
            }
            stopped.push(name);
        }

        let routes = Arc::new(build_routes(&staging.next));
        let active_names: Vec<String> = staging.next.keys().cloned().collect();
        staging.commit();

        info!(
            active = active_names.len(),
            started = started.len(),
            stopped = stopped.len(),
            failed = errors.len(),
            routes = routes.len(),
            "reconciliation complete"
        );

        Ok(Reconciliation {
            routes,
            active: active_names,
            started,
            kept,
            stopped,
            errors,
        })
    }

    /// Stop every live unit, dependents first.
    ///
    /// Units leave the active set one at a time, so a unit that panics
    /// while stopping does not take the rest of the set with it.
    pub fn shutdown_all(&self) -> Vec<UnitError> {
        let mut active = self.active.lock();
        let mut errors = Vec::new();
        while let Some((name, unit)) = active.pop() {
            if let Err(err) = stop(&name, unit) {
                errors.push(err);
            }
        }
        errors
    }

    fn start(&self, name: &str, config: UnitConfig) -> Result<ActiveUnit, UnitError> {
        let mut unit = self
            .registry
            .construct(name)
            .map_err(|err| UnitError::Init {
                name: name.to_owned(),
                source: Box::new(err),
            })?;

        match unit.initialize(config.clone()) {
            Ok(()) => {
                info!(unit = %name, "started unit");
                Ok(ActiveUnit { unit, config })
            }
            Err(source) => {
                warn!(unit = %name, error = %source, "unit failed to initialize");
                // Release anything acquired before the failure.
                if let Err(err) = unit.shutdown() {
                    debug!(unit = %name, error = %err, "cleanup after failed init also failed");
                }
                Err(UnitError::Init {
                    name: name.to_owned(),
                    source,
                })
            }
        }
    }
}

impl fmt::Debug for UnitManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitManager")
            .field("registry", &self.registry)
            .field("active", &self.active_units())
            .finish()
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// In-flight reconciliation state.
///
/// If unit code panics mid-reconcile, dropping this puts every unit it
/// still owns back into the active set, so none is lost without a
/// shutdown and none is initialized twice later.
struct Staging<'a> {
    active: &'a mut ActiveSet,
    previous: ActiveSet,
    next: ActiveSet,
}

impl Staging<'_> {
    fn commit(mut self) {
        debug_assert!(self.previous.is_empty());
        *self.active = std::mem::take(&mut self.next);
    }
}

impl Drop for Staging<'_> {
    fn drop(&mut self) {
        if self.next.is_empty() && self.previous.is_empty() {
            return;
        }
        warn!("reconciliation interrupted; restoring live units");
        let mut restored = std::mem::take(&mut self.next);
        restored.extend(self.previous.drain(..));
        self.active.extend(restored);
    }
}

/// Every declared dependency of `name` must already be in `next`.
fn dependencies_active(
    graph: &DependencyGraph,
    name: &str,
    next: &ActiveSet,
) -> Result<(), UnitError> {
    match graph
        .dependencies_of(name)
        .iter()
        .find(|dep| !next.contains_key(dep.as_str()))
    {
        Some(missing) => Err(UnitError::Init {
            name: name.to_owned(),
            source: format!("dependency '{missing}' is not active").into(),
        }),
        None => Ok(()),
    }
}

fn stop(name: &str, mut active: ActiveUnit) -> Result<(), UnitError> {
    match active.unit.shutdown() {
        Ok(()) => {
            info!(unit = %name, "stopped unit");
            Ok(())
        }
        Err(source) => {
            warn!(unit = %name, error = %source, "unit failed to shut down");
            Err(UnitError::Shutdown {
                name: name.to_owned(),
                source,
            })
        }
    }
}

fn build_routes(active: &ActiveSet) -> RouteTable {
    let mut builder = RouteTableBuilder::new();
    for (name, entry) in active {
        builder.scope(name);
        entry.unit.publish(&mut builder);
    }
    builder.build()
}
