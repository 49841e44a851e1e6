//! Unit lifecycle management for hot-reconfigurable services.
//!
//! A *unit* is a named, pluggable component that declares its
//! dependencies, initializes from a configuration block, registers routes,
//! and shuts down. This crate decides which units run and in what order:
//!
//! - **[`UnitRegistry`]**: static name -> factory table.
//! - **[`resolve()`]**: depth-first topological ordering with cycle and
//!   unknown-name detection.
//! - **[`UnitManager`]**: owns the live units and reconciles them against
//!   each new [`ConfigSnapshot`], starting, keeping, and stopping units in
//!   dependency order and building a fresh [`RouteTable`].
//! - **[`SurfacePublisher`]**: lock-free single slot holding the route
//!   table that concurrent requests dispatch against.
//! - **[`Host`]**: the manager and publisher wired together.
//!
//! The crate does no networking, file access, or environment lookups.

pub mod error;
pub mod host;
pub mod manager;
pub mod publish;
pub mod registry;
pub mod resolve;
pub mod snapshot;
pub mod surface;
pub mod unit;

// ── Primary re-exports ──────────────────────────────────────────────
pub use error::{BoxError, LifecycleError, UnitError};
pub use host::Host;
pub use manager::{Plan, Reconciliation, UnitManager};
pub use publish::{Published, SurfacePublisher};
pub use registry::{UnitFactory, UnitRegistry};
pub use resolve::{DependencyGraph, resolve, resolve_graph};
pub use snapshot::ConfigSnapshot;
pub use surface::{Handler, Reply, Route, RouteInfo, RouteRequest, RouteTable, RouteTableBuilder};
pub use unit::{Unit, UnitConfig, config_str};

// Handlers build replies with these.
pub use http::{Method, StatusCode};
