//! Read-side cache of the materialized tree.
//!
//! # Blocking Lock Usage
//!
//! Uses `parking_lot::RwLock` for the cached tree because:
//! 1. Reads and writes only clone or replace an `Arc`
//! 2. Lock is never held across `.await` points
//! 3. Invalidation runs on the merge worker and must not wait

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use nestsync_core::effects::{NestedSetStore, TreeUpdateListener};
use nestsync_core::{build, Node, NodeId, TreeNode};
use parking_lot::RwLock;
use tracing::{debug, error, trace};

use crate::errors::SyncError;

/// Lazily built view of the last successfully merged tree.
///
/// "Tree updated" signals drop the cached tree; the next reader rebuilds it
/// from the store. Readers never observe a partially merged tree because the
/// store commits merges atomically.
pub struct TreeReadModel {
    store: Arc<dyn NestedSetStore>,
    cached: RwLock<Option<Arc<TreeNode>>>,
    generation: AtomicU64,
}

impl TreeReadModel {
    /// Create an empty cache over `store`
    pub fn new(store: Arc<dyn NestedSetStore>) -> Self {
        Self {
            store,
            cached: RwLock::new(None),
            generation: AtomicU64::new(0),
        }
    }

    /// The current tree, or `None` when nothing has been merged yet.
    ///
    /// A stored node set that fails validation is reported and treated as
    /// absent.
    pub async fn tree(&self) -> Result<Option<Arc<TreeNode>>, SyncError> {
        let cached = self.cached.read().clone();
        if let Some(tree) = cached {
            return Ok(Some(tree));
        }

        let generation = self.generation.load(Ordering::SeqCst);
        let nodes = self.store.load_current_nodes().await?;
        if nodes.is_empty() {
            return Ok(None);
        }

        let tree = match build(nodes) {
            Ok(tree) => Arc::new(tree),
            Err(reason) => {
                error!(%reason, "Materialized node set is not a valid tree");
                return Ok(None);
            }
        };

        // an invalidation during the load makes this tree stale
        let mut cached = self.cached.write();
        if self.generation.load(Ordering::SeqCst) == generation {
            *cached = Some(Arc::clone(&tree));
            debug!(nodes = tree.size(), "Cached materialized tree");
            trace!("Materialized tree:\n{tree}");
        }
        Ok(Some(tree))
    }

    /// A single materialized node.
    pub async fn node(&self, id: NodeId) -> Result<Option<Node>, SyncError> {
        let cached = self.cached.read().clone();
        if let Some(tree) = cached {
            return Ok(tree.find(id).map(|subtree| subtree.node().clone()));
        }
        Ok(self.store.load_node(id).await?)
    }

    /// Drop the cached tree
    pub fn invalidate(&self) {
        let mut cached = self.cached.write();
        self.generation.fetch_add(1, Ordering::SeqCst);
        *cached = None;
    }

    /// Whether a tree is cached
    pub fn is_cached(&self) -> bool {
        self.cached.read().is_some()
    }
}

impl TreeUpdateListener for TreeReadModel {
    fn on_tree_updated(&self) {
        self.invalidate();
    }
}

impl std::fmt::Debug for TreeReadModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeReadModel")
            .field("cached", &self.is_cached())
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .finish()
    }
}
