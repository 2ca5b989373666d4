//! Construction-time wiring of the synchronization components.
//!
//! ```text
//! LogWriter ──log updated──> NotificationSquasher ──> LogMergeEngine ──tree updated──> TreeReadModel
//! ```

use std::sync::Arc;

use nestsync_core::effects::{NestedSetStore, TaskSpawner};
use tracing::info;

use crate::config::SyncConfig;
use crate::engine::LogMergeEngine;
use crate::errors::SyncError;
use crate::log_writer::LogWriter;
use crate::read_model::TreeReadModel;
use crate::squasher::NotificationSquasher;

/// A running log-to-tree synchronization.
#[derive(Debug)]
pub struct SyncPipeline {
    config: SyncConfig,
    engine: Arc<LogMergeEngine>,
    squasher: Arc<NotificationSquasher>,
    writer: LogWriter,
    read_model: Arc<TreeReadModel>,
}

impl SyncPipeline {
    /// Wire the components over `store` and start the merge worker on `spawner`.
    ///
    /// One merge is requested right away so entries logged before startup
    /// are picked up without waiting for the next write.
    pub fn start(
        config: SyncConfig,
        store: Arc<dyn NestedSetStore>,
        spawner: &dyn TaskSpawner,
    ) -> Result<Self, SyncError> {
        config.validate()?;

        let read_model = Arc::new(TreeReadModel::new(Arc::clone(&store)));
        let engine = Arc::new(
            LogMergeEngine::new(Arc::clone(&store), &config).with_tree_listener(read_model.clone()),
        );
        let squasher = Arc::new(NotificationSquasher::start(
            engine.clone(),
            spawner,
            config.shutdown_grace(),
        ));
        let writer = LogWriter::new(store).with_listener(squasher.clone());

        info!(
            stream = %config.log_stream,
            grace_ms = config.shutdown_grace_ms,
            "Nested set sync pipeline started"
        );
        squasher.notify();

        Ok(Self {
            config,
            engine,
            squasher,
            writer,
            read_model,
        })
    }

    /// Entry point for captured snapshots
    pub fn writer(&self) -> &LogWriter {
        &self.writer
    }

    /// Cached view of the merged tree
    pub fn read_model(&self) -> &Arc<TreeReadModel> {
        &self.read_model
    }

    /// Merge notification handle
    pub fn squasher(&self) -> &Arc<NotificationSquasher> {
        &self.squasher
    }

    /// The merge engine
    pub fn engine(&self) -> &Arc<LogMergeEngine> {
        &self.engine
    }

    /// Configuration in effect
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Stop merging; waits at most the configured grace period.
    pub async fn shutdown(&self) {
        self.squasher.shutdown().await;
        info!(stream = %self.config.log_stream, "Nested set sync pipeline stopped");
    }
}
