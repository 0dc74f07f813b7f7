//! Node Store
//!
//! Arena of nodes keyed by id. Children and parents refer to each other by id
//! only, so the tree has no ownership cycles. The store checks that referenced
//! ids exist and nothing more; tree rules belong to the engine.

pub mod persistence;

use crate::error::FsError;
use crate::tree::Node;
use crate::types::NodeId;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq)]
pub struct NodeStore {
    nodes: BTreeMap<NodeId, Node>,
    root: NodeId,
}

impl NodeStore {
    /// Create a store holding only the root folder.
    pub fn with_root(root: Node) -> Self {
        let root_id = root.id;
        let mut nodes = BTreeMap::new();
        nodes.insert(root_id, root);
        Self {
            nodes,
            root: root_id,
        }
    }

    /// Rebuild a store from a flat map without any checks.
    pub(crate) fn from_parts(nodes: BTreeMap<NodeId, Node>, root: NodeId) -> Self {
        Self { nodes, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn get_or_error(&self, id: &NodeId) -> Result<&Node, FsError> {
        self.nodes.get(id).ok_or(FsError::NotFound(*id))
    }

    pub(crate) fn get_mut(&mut self, id: &NodeId) -> Result<&mut Node, FsError> {
        self.nodes.get_mut(id).ok_or(FsError::NotFound(*id))
    }

    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NodeId, &Node)> {
        self.nodes.iter()
    }

    pub fn nodes(&self) -> &BTreeMap<NodeId, Node> {
        &self.nodes
    }

    pub(crate) fn insert(&mut self, node: Node) -> Result<(), FsError> {
        if self.nodes.contains_key(&node.id) {
            return Err(FsError::InvalidOperation(format!(
                "node id {} is already in use",
                node.id
            )));
        }
        self.nodes.insert(node.id, node);
        Ok(())
    }

    pub(crate) fn remove(&mut self, id: &NodeId) -> Option<Node> {
        self.nodes.remove(id)
    }

    /// Add `child` to `parent`'s child set. Both must exist and `parent` must be a folder.
    pub(crate) fn attach_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), FsError> {
        if !self.nodes.contains_key(&child) {
            return Err(FsError::NotFound(child));
        }
        let folder = self
            .get_mut(&parent)?
            .as_folder_mut()
            .ok_or_else(|| FsError::InvalidOperation(format!("{} is not a folder", parent)))?;
        folder.children.insert(child);
        Ok(())
    }

    /// Drop `child` from `parent`'s child set; returns whether it was present.
    pub(crate) fn detach_child(&mut self, parent: NodeId, child: NodeId) -> Result<bool, FsError> {
        let folder = self
            .get_mut(&parent)?
            .as_folder_mut()
            .ok_or_else(|| FsError::InvalidOperation(format!("{} is not a folder", parent)))?;
        Ok(folder.children.remove(&child))
    }

    /// Child of `parent` whose name equals `name`, if any.
    pub fn child_named(&self, parent: &NodeId, name: &str) -> Option<&Node> {
        let parent = self.nodes.get(parent)?;
        parent
            .children()
            .filter_map(|id| self.nodes.get(&id))
            .find(|child| child.name == name)
    }

    /// Ids of `id` and all its descendants, depth-first pre-order.
    ///
    /// Each id is visited once, so a corrupt child cycle cannot loop forever.
    pub fn subtree(&self, id: &NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut seen = BTreeSet::new();
        let mut stack = vec![*id];
        while let Some(current) = stack.pop() {
            if !seen.insert(current) {
                continue;
            }
            let Some(node) = self.nodes.get(&current) else {
                continue;
            };
            out.push(current);
            let mut children: Vec<NodeId> = node.children().collect();
            children.reverse();
            stack.extend(children);
        }
        out
    }
}
