// ── Route table (the capability surface) ──
//
// Built once per reconciliation by letting each active unit register its
// routes in dependency order, then frozen. Readers only ever see a
// finished `RouteTable` behind an `Arc`.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use http::{Method, StatusCode};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::warn;

// ── Request / reply ─────────────────────────────────────────────────

/// An inbound request, reduced to what a unit handler may inspect.
#[derive(Debug, Clone)]
pub struct RouteRequest {
    pub method: Method,
    pub path: String,
    pub query: Option<String>,
}

impl RouteRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
        }
    }

    /// Look up a single `key=value` pair in the raw query string.
    pub fn query_param(&self, key: &str) -> Option<&str> {
        self.query
            .as_deref()?
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find_map(|(k, v)| (k == key).then_some(v))
    }
}

/// A handler's response: status plus JSON body.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Value,
}

impl Reply {
    pub fn ok(body: Value) -> Self {
        Self {
            status: StatusCode::OK,
            body,
        }
    }

    pub fn with_status(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }

    /// `{"msg": ...}` with 200, the shape every built-in unit answers with.
    pub fn message(msg: impl Into<String>) -> Self {
        Self::ok(json!({ "msg": msg.into() }))
    }

    pub fn not_found(path: &str) -> Self {
        Self::with_status(
            StatusCode::NOT_FOUND,
            json!({ "error": "not found", "path": path }),
        )
    }
}

pub type Handler = Arc<dyn Fn(&RouteRequest) -> Reply + Send + Sync>;

// ── Route ───────────────────────────────────────────────────────────

/// A registered route and the unit that owns it.
#[derive(Clone)]
pub struct Route {
    pub method: Method,
    pub path: String,
    pub unit: String,
    handler: Handler,
}

impl Route {
    pub fn call(&self, request: &RouteRequest) -> Reply {
        (self.handler)(request)
    }

    pub fn info(&self) -> RouteInfo {
        RouteInfo {
            method: self.method.to_string(),
            path: self.path.clone(),
            unit: self.unit.clone(),
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("unit", &self.unit)
            .finish_non_exhaustive()
    }
}

/// Serializable description of a route, for listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteInfo {
    pub method: String,
    pub path: String,
    pub unit: String,
}

// ── RouteTable ──────────────────────────────────────────────────────

/// Immutable route table. Cheap to share: hand out `Arc<RouteTable>`.
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
    index: HashMap<Method, HashMap<String, usize>>,
}

impl RouteTable {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn lookup(&self, method: &Method, path: &str) -> Option<&Route> {
        let idx = *self.index.get(method)?.get(path)?;
        self.routes.get(idx)
    }

    /// Route the request, or `None` when nothing matches.
    pub fn dispatch(&self, request: &RouteRequest) -> Option<Reply> {
        self.lookup(&request.method, &request.path)
            .map(|route| route.call(request))
    }

    /// Routes in registration order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn describe(&self) -> Vec<RouteInfo> {
        self.routes.iter().map(Route::info).collect()
    }

    /// Units that contributed at least one route, in registration order.
    pub fn units(&self) -> Vec<&str> {
        let mut seen: Vec<&str> = Vec::new();
        for route in &self.routes {
            if !seen.contains(&route.unit.as_str()) {
                seen.push(&route.unit);
            }
        }
        seen
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

// ── Builder ─────────────────────────────────────────────────────────

/// Collects routes while units publish. Every route is attributed to the
/// unit currently publishing.
pub struct RouteTableBuilder {
    table: RouteTable,
    unit: String,
}

impl RouteTableBuilder {
    pub fn new() -> Self {
        Self {
            table: RouteTable::default(),
            unit: String::new(),
        }
    }

    /// Attribute subsequent registrations to `unit`.
    pub fn scope(&mut self, unit: &str) -> &mut Self {
        unit.clone_into(&mut self.unit);
        self
    }

    /// Register a route. A duplicate `(method, path)` keeps the first owner.
    pub fn route<F>(&mut self, method: Method, path: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&RouteRequest) -> Reply + Send + Sync + 'static,
    {
        let path = path.into();
        let by_path = self.table.index.entry(method.clone()).or_default();

        if let Some(&existing) = by_path.get(&path) {
            let owner = self
                .table
                .routes
                .get(existing)
                .map_or("<unknown>", |r| r.unit.as_str());
            warn!(
                %method,
                path = %path,
                owner,
                unit = %self.unit,
                "duplicate route ignored"
            );
            return self;
        }

        by_path.insert(path.clone(), self.table.routes.len());
        self.table.routes.push(Route {
            method,
            path,
            unit: self.unit.clone(),
            handler: Arc::new(handler),
        });
        self
    }

    pub fn get<F>(&mut self, path: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&RouteRequest) -> Reply + Send + Sync + 'static,
    {
        self.route(Method::GET, path, handler)
    }

    pub fn post<F>(&mut self, path: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&RouteRequest) -> Reply + Send + Sync + 'static,
    {
        self.route(Method::POST, path, handler)
    }

    pub fn build(self) -> RouteTable {
        self.table
    }
}

impl Default for RouteTableBuilder {
    fn default() -> Self {
        Self::new()
    }
}
