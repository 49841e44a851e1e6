// ── Host: manager + publisher ──
//
// The single entry point collaborators drive. A successful reconcile is
// published immediately; a fatal one leaves the previous table serving.
// Reconcile and publish happen under one lock, so the served table always
// belongs to the most recent reconciliation.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::warn;

use crate::error::{LifecycleError, UnitError};
use crate::manager::{Plan, Reconciliation, UnitManager};
use crate::publish::{Published, SurfacePublisher};
use crate::registry::UnitRegistry;
use crate::snapshot::ConfigSnapshot;
use crate::surface::RouteTable;

/// Cheaply cloneable handle over the manager and the published table.
#[derive(Clone, Debug)]
pub struct Host {
    inner: Arc<HostInner>,
}

#[derive(Debug)]
struct HostInner {
    manager: UnitManager,
    publisher: SurfacePublisher,
    /// Held across a state change and its publish.
    commit: Mutex<()>,
}

impl Host {
    pub fn new(registry: UnitRegistry) -> Self {
        Self {
            inner: Arc::new(HostInner {
                manager: UnitManager::new(Arc::new(registry)),
                publisher: SurfacePublisher::new(),
                commit: Mutex::new(()),
            }),
        }
    }

    /// Reconcile against `snapshot` and publish the resulting table.
    pub fn apply(&self, snapshot: &ConfigSnapshot) -> Result<Reconciliation, LifecycleError> {
        let _commit = self.inner.commit.lock();
        let outcome = self.inner.manager.reconcile(snapshot).inspect_err(|err| {
            warn!(error = %err, "reconciliation rejected; previous routes remain active");
        })?;
        self.inner.publisher.publish(Arc::clone(&outcome.routes));
        Ok(outcome)
    }

    pub fn plan(&self, snapshot: &ConfigSnapshot) -> Result<Plan, LifecycleError> {
        self.inner.manager.plan(snapshot)
    }

    /// Stop every unit and publish an empty table.
    pub fn shutdown(&self) -> Vec<UnitError> {
        let _commit = self.inner.commit.lock();
        let errors = self.inner.manager.shutdown_all();
        self.inner.publisher.publish(Arc::new(RouteTable::empty()));
        errors
    }

    /// The table requests should be dispatched against right now.
    pub fn current(&self) -> Arc<RouteTable> {
        self.inner.publisher.current()
    }

    /// The current table and its revision, read together.
    pub fn published(&self) -> Arc<Published> {
        self.inner.publisher.published()
    }

    pub fn revision(&self) -> u64 {
        self.inner.publisher.revision()
    }

    pub fn active_units(&self) -> Vec<String> {
        self.inner.manager.active_units()
    }

    pub fn registry(&self) -> &UnitRegistry {
        self.inner.manager.registry()
    }
}
