//! Node model: files, folders and their names.

pub mod name;
pub mod node;

pub use name::normalize_name;
pub use node::{FileNode, FolderNode, Node, NodeKind};
