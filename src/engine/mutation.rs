//! Create, delete, rename and update-content transitions.

use super::FileSystem;
use crate::alloc::{self, AllocationMethod};
use crate::error::FsError;
use crate::tree::{normalize_name, FileNode, Node, NodeKind};
use crate::types::{BlockIndex, NodeId};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Folder,
    File,
}

/// Parameters of a create operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRequest {
    pub parent: NodeId,
    pub name: String,
    pub kind: EntryKind,
    /// Files only; absent means empty
    #[serde(default)]
    pub content: Option<Vec<u8>>,
    /// Files only; absent means contiguous
    #[serde(default)]
    pub allocation_method: Option<AllocationMethod>,
}

impl CreateRequest {
    pub fn folder(parent: NodeId, name: impl Into<String>) -> Self {
        Self {
            parent,
            name: name.into(),
            kind: EntryKind::Folder,
            content: None,
            allocation_method: None,
        }
    }

    pub fn file(parent: NodeId, name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        Self {
            parent,
            name: name.into(),
            kind: EntryKind::File,
            content: Some(content.into()),
            allocation_method: None,
        }
    }

    pub fn with_method(mut self, method: AllocationMethod) -> Self {
        self.allocation_method = Some(method);
        self
    }
}

impl FileSystem {
    /// Add a file or folder under an existing folder.
    ///
    /// Files are allocated before anything is committed; an allocation
    /// failure rejects the whole create.
    pub fn create(&self, request: &CreateRequest) -> Result<(Self, NodeId), FsError> {
        let name = normalize_name(&request.name)?;
        let parent = self.store.get_or_error(&request.parent)?;
        if !parent.is_folder() {
            return Err(FsError::InvalidOperation(format!(
                "cannot create \"{}\" inside file \"{}\"",
                name, parent.name
            )));
        }
        if self.store.child_named(&request.parent, &name).is_some() {
            return Err(FsError::NameConflict(name));
        }

        let file = match request.kind {
            EntryKind::Folder => {
                if request.content.is_some() || request.allocation_method.is_some() {
                    return Err(FsError::InvalidOperation(
                        "folders take no content or allocation method".to_string(),
                    ));
                }
                None
            }
            EntryKind::File => {
                let content = request.content.clone().unwrap_or_default();
                let method = request.allocation_method.unwrap_or_default();
                let allocation = alloc::allocate(&self.disk, content.len(), method)?;
                Some(FileNode::new(content, method, allocation))
            }
        };

        let mut next = self.clone();
        let id = next.fresh_id(&name)?;
        let now = Utc::now();
        let node = match file {
            Some(file) => {
                next.disk.reserve(file.owned_blocks());
                Node::file(id, name, request.parent, file, now)
            }
            None => Node::folder(id, name, Some(request.parent), now),
        };
        info!(
            node = %id,
            parent = %request.parent,
            name = %node.name,
            kind = node.kind_label(),
            blocks = ?node.as_file().map(|f| f.owned_blocks()),
            "created"
        );
        next.store.insert(node)?;
        next.store.attach_child(request.parent, id)?;
        next.store.get_mut(&request.parent)?.modified_at = now;
        Ok((next, id))
    }

    /// Remove a node and its whole subtree, freeing every block the subtree owns.
    ///
    /// The walk only reads; removal happens on the new version once the full
    /// set of nodes and blocks is known.
    pub fn delete(&self, id: NodeId) -> Result<Self, FsError> {
        let node = self.store.get_or_error(&id)?;
        let Some(parent) = node.parent else {
            return Err(FsError::InvalidOperation(
                "the root folder cannot be deleted".to_string(),
            ));
        };

        let doomed = self.store.subtree(&id);
        let mut to_free: BTreeSet<BlockIndex> = BTreeSet::new();
        for doomed_id in &doomed {
            if let Some(file) = self.store.get(doomed_id).and_then(Node::as_file) {
                to_free.extend(file.owned_blocks());
            }
        }

        let mut next = self.clone();
        for doomed_id in &doomed {
            next.store.remove(doomed_id);
        }
        next.store.detach_child(parent, id)?;
        next.store.get_mut(&parent)?.modified_at = Utc::now();
        next.disk.release(&to_free);
        let removed: BTreeSet<NodeId> = doomed.into_iter().collect();
        next.nav.forget(&removed, parent);

        info!(
            node = %id,
            removed_nodes = removed.len(),
            freed_blocks = to_free.len(),
            "deleted"
        );
        Ok(next)
    }

    /// Rename a node; renaming to its current name is allowed.
    pub fn rename(&self, id: NodeId, new_name: &str) -> Result<Self, FsError> {
        let name = normalize_name(new_name)?;
        let node = self.store.get_or_error(&id)?;
        if let Some(parent) = node.parent {
            if let Some(existing) = self.store.child_named(&parent, &name) {
                if existing.id != id {
                    return Err(FsError::NameConflict(name));
                }
            }
        }

        let mut next = self.clone();
        let node = next.store.get_mut(&id)?;
        info!(node = %id, from = %node.name, to = %name, "renamed");
        node.name = name;
        node.modified_at = Utc::now();
        Ok(next)
    }

    /// Replace a file's content and re-lay it out on disk.
    ///
    /// The old blocks are released first so the new layout may reuse them.
    /// If the new layout does not fit, the previous version stands unchanged.
    pub fn update_content(
        &self,
        id: NodeId,
        content: &[u8],
        method: Option<AllocationMethod>,
    ) -> Result<Self, FsError> {
        let node = self.store.get_or_error(&id)?;
        let file = node.as_file().ok_or_else(|| {
            FsError::InvalidOperation(format!(
                "\"{}\" is a folder; only files have content",
                node.name
            ))
        })?;
        let method = method.unwrap_or(file.allocation_method);

        let mut disk = self.disk.clone();
        disk.release(&file.owned_blocks());
        let allocation = alloc::allocate(&disk, content.len(), method)?;
        disk.reserve(allocation.owned_blocks());

        let mut next = self.clone();
        next.disk = disk;
        let node = next.store.get_mut(&id)?;
        let file = FileNode::new(content.to_vec(), method, allocation);
        info!(
            node = %id,
            size = file.size,
            %method,
            blocks = ?file.owned_blocks(),
            "content updated"
        );
        node.kind = NodeKind::File(file);
        node.modified_at = Utc::now();
        Ok(next)
    }
}
