//! Collaborator interfaces (no implementations).

pub mod signals;
pub mod store;
pub mod task;

pub use signals::{LogUpdateListener, TreeUpdateListener};
pub use store::{NestedSetStore, StoreBatch};
pub use task::{CancellationToken, TaskSpawner};
