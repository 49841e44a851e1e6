// ── Route table publisher ──
//
// Single-slot store for the current route table. Readers load an `Arc`
// without locking; a publish swaps the pointer wholesale, so a reader
// holds either the previous complete table or the next one, never a mix.
// Superseded tables stay alive until their last reader drops them.

use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::info;

use crate::surface::RouteTable;

/// A published table together with the revision it was published at.
#[derive(Debug)]
pub struct Published {
    pub revision: u64,
    pub table: Arc<RouteTable>,
}

pub struct SurfacePublisher {
    current: ArcSwap<Published>,
}

impl SurfacePublisher {
    /// Starts out serving an empty table at revision 0.
    pub fn new() -> Self {
        Self {
            current: ArcSwap::from_pointee(Published {
                revision: 0,
                table: Arc::new(RouteTable::empty()),
            }),
        }
    }

    /// Replace the current table. Returns the new revision.
    ///
    /// The revision travels in the swapped value, so a reader never pairs
    /// a table with another publish's revision number.
    pub fn publish(&self, table: Arc<RouteTable>) -> u64 {
        let routes = table.len();
        let previous = self.current.rcu(|prev| Published {
            revision: prev.revision + 1,
            table: Arc::clone(&table),
        });
        let revision = previous.revision + 1;
        info!(revision, routes, "published route table");
        revision
    }

    /// The most recently published table and its revision, read together.
    pub fn published(&self) -> Arc<Published> {
        self.current.load_full()
    }

    /// The most recently published table.
    pub fn current(&self) -> Arc<RouteTable> {
        Arc::clone(&self.current.load().table)
    }

    /// Number of publishes so far.
    pub fn revision(&self) -> u64 {
        self.current.load().revision
    }
}

impl Default for SurfacePublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SurfacePublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfacePublisher")
            .field("revision", &self.revision())
            .field("routes", &self.current.load().table.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use http::Method;

    use super::*;
    use crate::surface::{Reply, RouteTableBuilder};

    fn table(paths: &[&str]) -> Arc<RouteTable> {
        let mut builder = RouteTableBuilder::new();
        builder.scope("test");
        for path in paths {
            builder.get(*path, |_| Reply::message("ok"));
        }
        Arc::new(builder.build())
    }

    #[test]
    fn starts_empty() {
        let publisher = SurfacePublisher::new();
        assert!(publisher.current().is_empty());
        assert_eq!(publisher.revision(), 0);
    }

    #[test]
    fn publish_replaces_and_bumps_revision() {
        let publisher = SurfacePublisher::new();
        assert_eq!(publisher.publish(table(&["/a"])), 1);
        assert_eq!(publisher.publish(table(&["/b", "/c"])), 2);

        let current = publisher.current();
        assert_eq!(current.len(), 2);
        assert!(current.lookup(&Method::GET, "/a").is_none());
        assert_eq!(publisher.revision(), 2);
    }

    #[test]
    fn held_snapshot_survives_publish() {
        let publisher = SurfacePublisher::new();
        publisher.publish(table(&["/old"]));
        let held = publisher.current();

        publisher.publish(table(&["/new"]));

        assert!(held.lookup(&Method::GET, "/old").is_some());
        assert!(publisher.current().lookup(&Method::GET, "/old").is_none());
    }

    #[test]
    fn revision_is_read_with_its_table() {
        let publisher = SurfacePublisher::new();
        publisher.publish(table(&["/a"]));
        publisher.publish(table(&["/b", "/c"]));

        let published = publisher.published();
        assert_eq!(published.revision, 2);
        assert_eq!(published.table.len(), 2);
    }

    #[test]
    fn concurrent_publishes_get_distinct_revisions() {
        let publisher = SurfacePublisher::new();
        let revisions: Vec<u64> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| scope.spawn(|| publisher.publish(table(&["/x"]))))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let mut sorted = revisions.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (1..=8).collect::<Vec<u64>>());
        assert_eq!(publisher.revision(), 8);
    }
}
