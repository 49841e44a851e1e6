// ── Dependency resolution ──
//
// Depth-first walk over the graph implied by each unit's declared
// dependencies, driven by an explicit stack so chain depth is bounded by
// memory rather than the thread stack. Produces a topological order where ties between
// independent units follow first-discovery order, so the result is
// predictable from the caller's input order rather than from names.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::error::LifecycleError;
use crate::registry::UnitRegistry;

/// Resolved start order plus each unit's declared dependencies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    order: Vec<String>,
    dependencies: HashMap<String, Vec<String>>,
}

impl DependencyGraph {
    /// Units in start order: every unit after all of its dependencies.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    pub fn into_order(self) -> Vec<String> {
        self.order
    }

    pub fn dependencies_of(&self, name: &str) -> &[String] {
        self.dependencies.get(name).map_or(&[], Vec::as_slice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.dependencies.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Resolve `requested` into a start order.
pub fn resolve<S: AsRef<str>>(
    registry: &UnitRegistry,
    requested: &[S],
) -> Result<Vec<String>, LifecycleError> {
    resolve_graph(registry, requested).map(DependencyGraph::into_order)
}

/// Resolve `requested`, keeping the dependency edges alongside the order.
///
/// Fails with [`LifecycleError::UnknownUnit`] for any name without a
/// factory and with [`LifecycleError::CyclicDependency`] when a cycle is
/// reachable. No partial result is ever returned.
pub fn resolve_graph<S: AsRef<str>>(
    registry: &UnitRegistry,
    requested: &[S],
) -> Result<DependencyGraph, LifecycleError> {
    let mut walk = Walk {
        registry,
        done: HashSet::new(),
        on_path: HashSet::new(),
        path: Vec::new(),
        graph: DependencyGraph::default(),
    };

    for name in requested {
        walk.visit(name.as_ref())?;
    }

    debug!(order = ?walk.graph.order, "resolved unit order");
    Ok(walk.graph)
}

/// A unit whose dependencies are being walked.
struct Frame {
    name: String,
    dependencies: Vec<String>,
    next: usize,
}

struct Walk<'r> {
    registry: &'r UnitRegistry,
    done: HashSet<String>,
    /// Units on the current path, used for cycle reporting.
    path: Vec<Frame>,
    on_path: HashSet<String>,
    graph: DependencyGraph,
}

impl Walk<'_> {
    fn visit(&mut self, root: &str) -> Result<(), LifecycleError> {
        self.enter(root, None)?;

        loop {
            let Some(frame) = self.path.last_mut() else {
                return Ok(());
            };
            if let Some(dep) = frame.dependencies.get(frame.next).cloned() {
                frame.next += 1;
                let parent = frame.name.clone();
                self.enter(&dep, Some(&parent))?;
                continue;
            }
            if let Some(frame) = self.path.pop() {
                self.finish(frame);
            }
        }
    }

    fn enter(&mut self, name: &str, required_by: Option<&str>) -> Result<(), LifecycleError> {
        if self.done.contains(name) {
            return Ok(());
        }

        if self.on_path.contains(name) {
            let start = self.path.iter().position(|f| f.name == name).unwrap_or(0);
            let mut path: Vec<String> = self.path[start..].iter().map(|f| f.name.clone()).collect();
            path.push(name.to_owned());
            return Err(LifecycleError::CyclicDependency { path });
        }

        let factory = self
            .registry
            .lookup(name)
            .map_err(|_| LifecycleError::unknown(name, required_by))?;

        // Throwaway instance: only the declaration is read, it is never initialized.
        let dependencies = factory().dependencies();

        self.on_path.insert(name.to_owned());
        self.path.push(Frame {
            name: name.to_owned(),
            dependencies,
            next: 0,
        });
        Ok(())
    }

    fn finish(&mut self, frame: Frame) {
        self.on_path.remove(&frame.name);
        self.done.insert(frame.name.clone());
        self.graph.order.push(frame.name.clone());
        self.graph.dependencies.insert(frame.name, frame.dependencies);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;
    use crate::error::BoxError;
    use crate::surface::RouteTableBuilder;
    use crate::unit::{Unit, UnitConfig};

    /// Declares dependencies and counts initializations.
    struct Declared {
        deps: Vec<String>,
        inits: Arc<AtomicUsize>,
    }

    impl Unit for Declared {
        fn dependencies(&self) -> Vec<String> {
            self.deps.clone()
        }
        fn initialize(&mut self, _config: UnitConfig) -> Result<(), BoxError> {
            self.inits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn publish(&self, _routes: &mut RouteTableBuilder) {}
        fn shutdown(&mut self) -> Result<(), BoxError> {
            Ok(())
        }
    }

    fn registry(edges: &[(&str, &[&str])]) -> (UnitRegistry, Arc<AtomicUsize>) {
        let inits = Arc::new(AtomicUsize::new(0));
        let mut registry = UnitRegistry::new();
        for (name, deps) in edges {
            let deps: Vec<String> = deps.iter().map(|d| (*d).to_owned()).collect();
            let inits = Arc::clone(&inits);
            registry
                .register(*name, move || {
                    Box::new(Declared {
                        deps: deps.clone(),
                        inits: Arc::clone(&inits),
                    })
                })
                .unwrap();
        }
        (registry, inits)
    }

    #[test]
    fn dependency_comes_first() {
        let (reg, _) = registry(&[("auth", &[]), ("order", &["auth"])]);
        assert_eq!(resolve(&reg, &["order"]).unwrap(), vec!["auth", "order"]);
    }

    #[test]
    fn diamond_dependency_appears_once() {
        let (reg, _) = registry(&[
            ("db", &[]),
            ("auth", &["db"]),
            ("billing", &["db"]),
            ("order", &["auth", "billing"]),
        ]);
        assert_eq!(
            resolve(&reg, &["order"]).unwrap(),
            vec!["db", "auth", "billing", "order"]
        );
    }

    #[test]
    fn ties_follow_input_order_not_names() {
        let (reg, _) = registry(&[("zeta", &[]), ("alpha", &[]), ("mid", &[])]);
        assert_eq!(
            resolve(&reg, &["zeta", "alpha", "mid"]).unwrap(),
            vec!["zeta", "alpha", "mid"]
        );
        assert_eq!(
            resolve(&reg, &["mid", "zeta", "alpha"]).unwrap(),
            vec!["mid", "zeta", "alpha"]
        );
    }

    #[test]
    fn requested_names_already_covered_are_not_repeated() {
        let (reg, _) = registry(&[("user", &[]), ("auth", &[]), ("order", &["auth"])]);
        assert_eq!(
            resolve(&reg, &["order", "user", "auth", "order"]).unwrap(),
            vec!["auth", "order", "user"]
        );
    }

    #[test]
    fn empty_request_resolves_to_nothing() {
        let (reg, _) = registry(&[("user", &[])]);
        let empty: [&str; 0] = [];
        assert!(resolve(&reg, &empty).unwrap().is_empty());
    }

    #[test]
    fn unknown_requested_unit() {
        let (reg, _) = registry(&[("user", &[])]);
        let err = resolve(&reg, &["user", "billing"]).unwrap_err();
        match err {
            LifecycleError::UnknownUnit { name, required_by } => {
                assert_eq!(name, "billing");
                assert_eq!(required_by, None);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unknown_dependency_names_dependent() {
        let (reg, _) = registry(&[("order", &["auth"])]);
        let err = resolve(&reg, &["order"]).unwrap_err();
        match err {
            LifecycleError::UnknownUnit { name, required_by } => {
                assert_eq!(name, "auth");
                assert_eq!(required_by.as_deref(), Some("order"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn cycle_reports_path() {
        let (reg, _) = registry(&[("a", &["b"]), ("b", &["c"]), ("c", &["a"])]);
        let err = resolve(&reg, &["a"]).unwrap_err();
        match err {
            LifecycleError::CyclicDependency { path } => {
                assert_eq!(path, vec!["a", "b", "c", "a"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn cycle_path_excludes_acyclic_prefix() {
        let (reg, _) = registry(&[("root", &["a"]), ("a", &["b"]), ("b", &["a"])]);
        let err = resolve(&reg, &["root"]).unwrap_err();
        assert!(matches!(
            err,
            LifecycleError::CyclicDependency { ref path } if path == &["a", "b", "a"]
        ));
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let (reg, _) = registry(&[("loop", &["loop"])]);
        assert!(matches!(
            resolve(&reg, &["loop"]),
            Err(LifecycleError::CyclicDependency { .. })
        ));
    }

    #[test]
    fn resolution_never_initializes() {
        let (reg, inits) = registry(&[("auth", &[]), ("order", &["auth"])]);
        resolve(&reg, &["order", "auth"]).unwrap();
        assert_eq!(inits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn graph_exposes_edges() {
        let (reg, _) = registry(&[("auth", &[]), ("order", &["auth"])]);
        let graph = resolve_graph(&reg, &["order"]).unwrap();
        assert_eq!(graph.dependencies_of("order"), ["auth".to_owned()]);
        assert!(graph.dependencies_of("auth").is_empty());
        assert!(graph.contains("auth"));
        assert!(!graph.contains("user"));
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn very_deep_chain_resolves() {
        const DEPTH: usize = 100_000;
        let mut registry = UnitRegistry::new();
        for i in 0..DEPTH {
            let deps: Vec<String> = if i + 1 < DEPTH {
                vec![format!("u{}", i + 1)]
            } else {
                Vec::new()
            };
            registry
                .register(format!("u{i}"), move || {
                    Box::new(Declared {
                        deps: deps.clone(),
                        inits: Arc::new(AtomicUsize::new(0)),
                    })
                })
                .unwrap();
        }

        let order = resolve(&registry, &["u0"]).unwrap();
        assert_eq!(order.len(), DEPTH);
        assert_eq!(order.first().map(String::as_str), Some("u99999"));
        assert_eq!(order.last().map(String::as_str), Some("u0"));
    }

    // ── Property tests ──────────────────────────────────────────────

    const NODES: usize = 8;

    fn node(i: usize) -> String {
        format!("n{i}")
    }

    /// Node `i` may only depend on nodes `j < i`, so the graph is acyclic.
    fn dag_registry(adjacency: &[Vec<bool>]) -> UnitRegistry {
        let mut registry = UnitRegistry::new();
        for (i, row) in adjacency.iter().enumerate() {
            let deps: Vec<String> = row
                .iter()
                .enumerate()
                .filter(|(j, edge)| *j < i && **edge)
                .map(|(j, _)| node(j))
                .collect();
            registry
                .register(node(i), move || {
                    Box::new(Declared {
                        deps: deps.clone(),
                        inits: Arc::new(AtomicUsize::new(0)),
                    })
                })
                .unwrap();
        }
        registry
    }

    proptest! {
        #[test]
        fn acyclic_order_respects_every_edge(
            adjacency in prop::collection::vec(prop::collection::vec(any::<bool>(), NODES), NODES),
            requested in prop::collection::vec(0..NODES, 0..6),
        ) {
            let registry = dag_registry(&adjacency);
            let requested: Vec<String> = requested.into_iter().map(node).collect();
            let graph = resolve_graph(&registry, &requested).unwrap();
            let order = graph.order();

            let position = |name: &str| order.iter().position(|n| n == name);

            for name in &requested {
                prop_assert!(position(name).is_some(), "{name} missing from {order:?}");
            }
            for (idx, name) in order.iter().enumerate() {
                for dep in graph.dependencies_of(name) {
                    let dep_idx = position(dep).unwrap();
                    prop_assert!(dep_idx < idx, "{dep} must precede {name} in {order:?}");
                }
            }
            let unique: HashSet<&String> = order.iter().collect();
            prop_assert_eq!(unique.len(), order.len());
        }

        #[test]
        fn reachable_cycle_always_fails(len in 1..NODES, start in 0..NODES) {
            // Ring: n0 -> n1 -> ... -> n{len-1} -> n0.
            let mut registry = UnitRegistry::new();
            for i in 0..len {
                let next = node((i + 1) % len);
                registry
                    .register(node(i), move || {
                        Box::new(Declared {
                            deps: vec![next.clone()],
                            inits: Arc::new(AtomicUsize::new(0)),
                        })
                    })
                    .unwrap();
            }
            let start = node(start % len);
            let result = resolve(&registry, &[start]);
            prop_assert!(
                matches!(result, Err(LifecycleError::CyclicDependency { .. })),
                "expected a cycle error, got {result:?}"
            );
        }
    }
}
