// ── Unit factory registry ──
//
// Static name -> constructor table. Populated once at startup, read-only
// afterwards; shared between the resolver and the manager via `Arc`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::error::LifecycleError;
use crate::unit::Unit;

/// Produces a fresh, uninitialized unit instance.
pub type UnitFactory = Arc<dyn Fn() -> Box<dyn Unit> + Send + Sync>;

#[derive(Default, Clone)]
pub struct UnitRegistry {
    factories: HashMap<String, UnitFactory>,
}

impl UnitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under `name`. Names are case-sensitive and unique.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<(), LifecycleError>
    where
        F: Fn() -> Box<dyn Unit> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(LifecycleError::DuplicateUnit { name });
        }
        self.factories.insert(name, Arc::new(factory));
        Ok(())
    }

    pub fn lookup(&self, name: &str) -> Result<&UnitFactory, LifecycleError> {
        self.factories
            .get(name)
            .ok_or_else(|| LifecycleError::unknown(name, None))
    }

    /// Build a fresh instance. Construction never initializes.
    pub fn construct(&self, name: &str) -> Result<Box<dyn Unit>, LifecycleError> {
        self.lookup(name).map(|factory| factory())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

impl fmt::Debug for UnitRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitRegistry")
            .field("units", &self.names())
            .finish()
    }
}
