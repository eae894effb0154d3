//! Domain layer: the document model and its conversions
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod builder;
pub mod entities;
pub mod error;
pub mod order;
pub mod writer;

pub use arena::{Branch, NodeData, Scope, TreeArena, TreeNode};
pub use builder::{import, TreeBuilder};
pub use entities::*;
pub use error::{DomainError, DomainResult};
pub use order::compare_names;
pub use writer::{export, export_subtree, XML_DECLARATION};
