//! Nested set tree reconstruction.
//!
//! ```text
//! flat Vec<Node> (any order) ──build()──> TreeNode (root, children by left)
//!                                  │
//!                                  └──> TreeError (all-or-nothing)
//! ```

mod builder;
mod node;

pub use builder::build;
pub use node::{PreOrder, TreeNode};
